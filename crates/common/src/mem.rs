//! Reference-counted byte buffers and the pools that back them.

mod buffer;
mod pool;

pub use buffer::{Buffer, BufferSlice, SliceBuf};
pub use pool::{default_buffer_pool, BufferPool, NopBufferPool, TieredBufferPool};

/// Payloads smaller than this are cheaper to allocate than to borrow from a pool.
pub const BUFFER_POOLING_THRESHOLD: usize = 1 << 10;

pub fn is_below_buffer_pooling_threshold(size: usize) -> bool {
    size < BUFFER_POOLING_THRESHOLD
}
