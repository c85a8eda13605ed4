//! Descriptors for the resource families leased by a typical render loop.

use crate::BatchedDescriptor;

/// How a GPU buffer is bound by the shaders that use it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum BufferTarget {
    /// A structured buffer of `stride`-sized elements. This is the default.
    #[default]
    Structured,

    /// A byte-addressable buffer.
    Raw,

    /// A structured buffer with a hidden append/consume counter.
    Append,

    /// A buffer holding arguments for indirect draw or dispatch calls.
    IndirectArguments,

    /// A buffer bound as vertex input.
    Vertex,

    /// A buffer bound as index input.
    Index,
}

/// Describes a GPU buffer of `count` elements of `stride` bytes each.
///
/// The element count is the batching dimension: a [`BatchedPool`][crate::BatchedPool] rounds
/// it so that buffers of similar length share a free list.
///
/// # Example
///
/// ```rust
/// use lease_pool::{BatchedDescriptor, BufferDescriptor, BufferTarget};
///
/// let descriptor = BufferDescriptor::new(100, 16, BufferTarget::Structured);
///
/// assert_eq!(descriptor.count(), 100);
/// assert_eq!(descriptor.byte_size(), Some(1600));
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct BufferDescriptor {
    /// Number of elements in the buffer.
    pub count: usize,

    /// Size of one element in bytes.
    pub stride: usize,

    /// How the buffer is bound.
    pub target: BufferTarget,
}

impl BufferDescriptor {
    /// Creates a descriptor for a buffer of `count` elements of `stride` bytes each.
    #[must_use]
    pub fn new(count: usize, stride: usize, target: BufferTarget) -> Self {
        Self {
            count,
            stride,
            target,
        }
    }

    /// Returns the total size of the buffer in bytes, or `None` if it does not fit in `usize`.
    #[must_use]
    pub fn byte_size(&self) -> Option<usize> {
        self.count.checked_mul(self.stride)
    }
}

impl BatchedDescriptor for BufferDescriptor {
    fn count(&self) -> usize {
        self.count
    }

    fn with_count(&self, count: usize) -> Self {
        Self { count, ..*self }
    }
}

/// The lifetime class of the allocator that backs a native array.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Allocator {
    /// Scratch memory that is only valid within the current frame.
    Temp,

    /// Scratch memory that may be handed to jobs spanning a few frames.
    TempJob,

    /// Memory with no lifetime restriction. This is the default.
    #[default]
    Persistent,
}

/// Describes a native (unmanaged) array of `length` elements.
///
/// # Example
///
/// ```rust
/// use lease_pool::{Allocator, ArrayDescriptor, BatchedDescriptor};
///
/// let descriptor = ArrayDescriptor::new(10, Allocator::TempJob);
/// let resized = descriptor.with_count(32);
///
/// assert_eq!(resized.length, 32);
/// assert_eq!(resized.allocator, Allocator::TempJob);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct ArrayDescriptor {
    /// Number of elements in the array.
    pub length: usize,

    /// Allocator that owns the array memory.
    pub allocator: Allocator,
}

impl ArrayDescriptor {
    /// Creates a descriptor for an array of `length` elements.
    #[must_use]
    pub fn new(length: usize, allocator: Allocator) -> Self {
        Self { length, allocator }
    }
}

impl BatchedDescriptor for ArrayDescriptor {
    fn count(&self) -> usize {
        self.length
    }

    fn with_count(&self, count: usize) -> Self {
        Self {
            length: count,
            ..*self
        }
    }
}

/// Pixel format of a texture.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized. This is the default.
    #[default]
    Rgba8Unorm,

    /// 16-bit float RGBA.
    Rgba16Float,

    /// Single channel 32-bit float.
    R32Float,

    /// Two channel 32-bit float.
    Rg32Float,

    /// 32-bit float depth.
    Depth32Float,
}

/// Describes a 2D texture.
///
/// Textures are not batched: every field takes part in the key as is.
///
/// # Example
///
/// ```rust
/// use lease_pool::{TextureDescriptor, TextureFormat};
///
/// let descriptor = TextureDescriptor::new(1920, 1080, TextureFormat::Rgba16Float)
///     .with_mip_levels(4)
///     .with_random_write(true);
///
/// assert_eq!(descriptor.mip_levels, 4);
/// assert!(descriptor.random_write);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Pixel format.
    pub format: TextureFormat,

    /// Number of mip levels, at least 1.
    pub mip_levels: u32,

    /// Whether compute shaders may write to the texture.
    pub random_write: bool,
}

impl TextureDescriptor {
    /// Creates a descriptor for a single-mip, read-only texture.
    #[must_use]
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            mip_levels: 1,
            random_write: false,
        }
    }

    /// Returns a copy of this descriptor with the given number of mip levels.
    ///
    /// A value of zero is clamped to 1.
    #[must_use]
    pub fn with_mip_levels(self, mip_levels: u32) -> Self {
        Self {
            mip_levels: mip_levels.max(1),
            ..self
        }
    }

    /// Returns a copy of this descriptor with random write access enabled or disabled.
    #[must_use]
    pub fn with_random_write(self, random_write: bool) -> Self {
        Self {
            random_write,
            ..self
        }
    }
}
