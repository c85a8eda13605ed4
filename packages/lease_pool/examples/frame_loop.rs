//! Simulates a few frames of a renderer that leases instance buffers and render targets.
//!
//! Particle counts vary from frame to frame. The batched pool rounds them so that most frames
//! reuse the buffers of earlier frames, and the per-frame render targets come from the
//! thread's default pool registry.
//!
//! Pool activity is logged at debug level. Pool statistics and the `nm` report are printed at
//! the end.

use std::convert::Infallible;
use std::num::NonZero;

use lease_pool::{
    BatchedPool, BufferDescriptor, BufferTarget, Pool, PoolRegistry, TextureDescriptor,
    TextureFormat,
};
use nm::Report;

/// Stand-in for a GPU buffer.
struct GpuBuffer {
    bytes: Vec<u8>,
}

/// Stand-in for a GPU texture.
struct GpuTexture {
    texels: Vec<u32>,
}

const PARTICLE_STRIDE: usize = 32;
const FRAME_PARTICLE_COUNTS: &[usize] = &[100, 120, 90, 260, 240, 130, 100, 0, 510, 60];

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let particles = BatchedPool::<BufferDescriptor, GpuBuffer>::builder()
        .name("particles")
        .base_size(NonZero::new(64).unwrap())
        .batch_size(128)
        .create(|descriptor: &BufferDescriptor| {
            Ok::<_, Infallible>(GpuBuffer {
                bytes: vec![0; descriptor.byte_size().unwrap_or(0)],
            })
        })
        .release(|_buffer: &GpuBuffer| {})
        .build()
        .unwrap();

    let registry = PoolRegistry::current();
    registry.register(
        Pool::<TextureDescriptor, GpuTexture>::builder()
            .name("render targets")
            .create(|descriptor: &TextureDescriptor| {
                let texels = u64::from(descriptor.width)
                    .checked_mul(u64::from(descriptor.height))
                    .and_then(|texels| usize::try_from(texels).ok())
                    .unwrap_or(0);
                Ok::<_, Infallible>(GpuTexture {
                    texels: vec![0; texels],
                })
            })
            .release(|_texture: &GpuTexture| {})
            .build()
            .unwrap(),
    );

    let target = TextureDescriptor::new(320, 180, TextureFormat::Rgba16Float);

    let mut instances = particles
        .rent(&BufferDescriptor::new(0, PARTICLE_STRIDE, BufferTarget::Structured))
        .unwrap();

    for (frame, &count) in FRAME_PARTICLE_COUNTS.iter().enumerate() {
        if !instances.ensure_batch_size(count).unwrap() {
            instances.resize(count).unwrap();
        }

        let color = registry
            .rent::<TextureDescriptor, GpuTexture>(target)
            .unwrap();

        println!(
            "frame {frame}: {count} particles in a {} byte buffer, {} texels of color target",
            instances.resource().unwrap().bytes.len(),
            color.resource().unwrap().texels.len(),
        );

        // `color` goes back to its pool at the end of each frame.
    }

    drop(instances);

    println!("particle pool: {}", particles.stats());
    println!(
        "render target pool: {}",
        registry
            .get::<TextureDescriptor, GpuTexture>()
            .unwrap()
            .stats()
    );

    let released = particles
        .clear_unused()
        .saturating_add(registry.clear_unused_all());
    println!("released {released} idle resources");

    let report = Report::collect();
    println!("{report}");
}
