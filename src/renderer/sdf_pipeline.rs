//! SDF-based WebGPU render pipeline
//!
//! Renders the entire scene in the fragment shader using signed distance
//! fields over the read-only entity snapshot: bricks, paddle, balls, falling
//! power-ups and laser shots.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::consts::*;
use crate::sim::{BrickKind, GamePhase, GameState};

/// Maximum number of balls supported
const MAX_BALLS: usize = 8;
/// Maximum number of bricks
const MAX_BRICKS: usize = 128;
/// Maximum falling power-ups
const MAX_POWERUPS: usize = 16;
/// Maximum laser shots in flight
const MAX_LASERS: usize = 32;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    resolution: [f32; 2], // offset 0 - canvas pixels
    world: [f32; 2],      // offset 8 - playfield size in world units
    time: f32,            // offset 16
    ball_count: u32,      // offset 20
    brick_count: u32,     // offset 24
    powerup_count: u32,   // offset 28
    laser_count: u32,     // offset 32
    phase: u32,           // offset 36 - dims the board outside active play
    paddle_flags: u32,    // offset 40 - bit0 sticky, bit1 laser
    _pad: u32,            // pad to 48 bytes
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PaddleUniform {
    pos: [f32; 2],  // center
    size: [f32; 2], // full extents
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BallData {
    pos: [f32; 2],
    radius: f32,
    speed: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BrickData {
    pos: [f32; 2],  // center
    size: [f32; 2], // full extents
    kind: u32,      // 0=Normal, 1=MultiHit, 2=Unbreakable
    row: u32,       // for the classic row color bands
    hp: u32,        // damaged multi-hit bricks render darker
    _pad: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PowerupData {
    pos: [f32; 2],
    kind: u32, // matches PowerUpKind order
    size: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct LaserData {
    pos: [f32; 2],  // center
    size: [f32; 2], // full extents
}

// ============================================================================
// SDF RENDER STATE
// ============================================================================

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    // Uniform/storage buffers
    globals_buffer: wgpu::Buffer,
    paddle_buffer: wgpu::Buffer,
    balls_buffer: wgpu::Buffer,
    bricks_buffer: wgpu::Buffer,
    powerups_buffer: wgpu::Buffer,
    lasers_buffer: wgpu::Buffer,

    bind_group: wgpu::BindGroup,

    pub size: (u32, u32),
    start_time: f64,
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Self {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sdf-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sdf_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sdf_shader.wgsl").into()),
        });

        // Create buffers
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&Globals {
                resolution: [width as f32, height as f32],
                world: [SCREEN_WIDTH, SCREEN_HEIGHT],
                time: 0.0,
                ball_count: 0,
                brick_count: 0,
                powerup_count: 0,
                laser_count: 0,
                phase: 0,
                paddle_flags: 0,
                _pad: 0,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let paddle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("paddle"),
            contents: bytemuck::bytes_of(&PaddleUniform {
                pos: [SCREEN_WIDTH / 2.0, SCREEN_HEIGHT - PADDLE_Y_OFFSET],
                size: [PADDLE_WIDTH, PADDLE_HEIGHT],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let balls_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("balls"),
            size: (std::mem::size_of::<BallData>() * MAX_BALLS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bricks_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bricks"),
            size: (std::mem::size_of::<BrickData>() * MAX_BRICKS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let powerups_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("powerups"),
            size: (std::mem::size_of::<PowerupData>() * MAX_POWERUPS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lasers_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lasers"),
            size: (std::mem::size_of::<LaserData>() * MAX_LASERS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Bind group layout
        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sdf_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                storage_entry(2),
                storage_entry(3),
                storage_entry(4),
                storage_entry(5),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sdf_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: paddle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: balls_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: bricks_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: powerups_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: lasers_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sdf_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sdf_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[], // No vertex buffers - fullscreen triangle
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            paddle_buffer,
            balls_buffer,
            bricks_buffer,
            powerups_buffer,
            lasers_buffer,
            bind_group,
            size: (width, height),
            start_time: 0.0,
        }
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn set_start_time(&mut self, time: f64) {
        self.start_time = time;
    }

    /// Update GPU buffers from the game state and render
    pub fn render(&mut self, state: &GameState, time: f64) -> Result<(), wgpu::SurfaceError> {
        // time is ms since page load from requestAnimationFrame
        let elapsed = ((time - self.start_time) / 1000.0) as f32;

        let ball_count = state.balls.len().min(MAX_BALLS) as u32;
        let brick_count = state.bricks.len().min(MAX_BRICKS) as u32;
        let powerup_count = state.powerups.len().min(MAX_POWERUPS) as u32;
        let laser_count = state.lasers.len().min(MAX_LASERS) as u32;

        let phase = match state.phase {
            GamePhase::Menu => 0,
            GamePhase::Playing => 1,
            GamePhase::Paused => 2,
            GamePhase::GameOver => 3,
            GamePhase::Victory => 4,
        };
        let mut paddle_flags = 0u32;
        if state.effects.sticky_active() {
            paddle_flags |= 1;
        }
        if state.effects.laser_active() {
            paddle_flags |= 2;
        }

        let globals = Globals {
            resolution: [self.size.0 as f32, self.size.1 as f32],
            world: [state.config.screen_width, state.config.screen_height],
            time: elapsed,
            ball_count,
            brick_count,
            powerup_count,
            laser_count,
            phase,
            paddle_flags,
            _pad: 0,
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let paddle_rect = state.paddle.rect();
        let paddle = PaddleUniform {
            pos: [paddle_rect.center().x, paddle_rect.center().y],
            size: [paddle_rect.w, paddle_rect.h],
        };
        self.queue
            .write_buffer(&self.paddle_buffer, 0, bytemuck::bytes_of(&paddle));

        let mut balls_data = [BallData {
            pos: [0.0; 2],
            radius: 0.0,
            speed: 0.0,
        }; MAX_BALLS];
        for (i, ball) in state.balls.iter().take(MAX_BALLS).enumerate() {
            balls_data[i] = BallData {
                pos: [ball.pos.x, ball.pos.y],
                radius: ball.radius,
                speed: ball.vel.length(),
            };
        }
        self.queue
            .write_buffer(&self.balls_buffer, 0, bytemuck::cast_slice(&balls_data));

        let mut bricks_data = [BrickData {
            pos: [0.0; 2],
            size: [0.0; 2],
            kind: 0,
            row: 0,
            hp: 0,
            _pad: 0,
        }; MAX_BRICKS];
        for (i, brick) in state.bricks.iter().take(MAX_BRICKS).enumerate() {
            let kind = match brick.kind {
                BrickKind::Normal => 0,
                BrickKind::MultiHit => 1,
                BrickKind::Unbreakable => 2,
            };
            bricks_data[i] = BrickData {
                pos: [brick.rect.center().x, brick.rect.center().y],
                size: [brick.rect.w, brick.rect.h],
                kind,
                row: brick.row,
                hp: brick.hp,
                _pad: 0,
            };
        }
        self.queue
            .write_buffer(&self.bricks_buffer, 0, bytemuck::cast_slice(&bricks_data));

        let mut powerups_data = [PowerupData {
            pos: [0.0; 2],
            kind: 0,
            size: 0.0,
        }; MAX_POWERUPS];
        for (i, powerup) in state.powerups.iter().take(MAX_POWERUPS).enumerate() {
            powerups_data[i] = PowerupData {
                pos: [powerup.pos.x, powerup.pos.y],
                kind: powerup.kind as u32,
                size: powerup.size,
            };
        }
        self.queue.write_buffer(
            &self.powerups_buffer,
            0,
            bytemuck::cast_slice(&powerups_data),
        );

        let mut lasers_data = [LaserData {
            pos: [0.0; 2],
            size: [0.0; 2],
        }; MAX_LASERS];
        for (i, laser) in state.lasers.iter().take(MAX_LASERS).enumerate() {
            let rect = laser.rect();
            lasers_data[i] = LaserData {
                pos: [rect.center().x, rect.center().y],
                size: [rect.w, rect.h],
            };
        }
        self.queue
            .write_buffer(&self.lasers_buffer, 0, bytemuck::cast_slice(&lasers_data));

        // Render
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sdf_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sdf_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
