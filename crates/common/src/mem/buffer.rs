use std::{fmt, slice::Iter, sync::Arc};

use bytes::{Buf, Bytes};

use super::BufferPool;

/// An immutable chunk of bytes that remembers where its storage came from.
///
/// Cloning takes another reference to the same storage. Storage borrowed from
/// a [`BufferPool`] goes back to that pool when the last reference is dropped.
#[derive(Clone)]
pub struct Buffer {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Slice(Bytes),
    Pooled(Arc<Pooled>),
}

struct Pooled {
    data: Vec<u8>,
    len: usize,
    pool: Arc<dyn BufferPool>,
}

impl Drop for Pooled {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.data))
    }
}

impl Buffer {
    /// Wraps `data` borrowed from `pool`; only the first `len` bytes are visible.
    pub fn pooled(data: Vec<u8>, len: usize, pool: Arc<dyn BufferPool>) -> Self {
        assert!(len <= data.len(), "pooled buffer shorter than its length");
        Self {
            inner: Inner::Pooled(Arc::new(Pooled { data, len, pool })),
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            Inner::Slice(bytes) => bytes.len(),
            Inner::Pooled(pooled) => pooled.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.inner, Inner::Pooled(_))
    }

    pub fn read_only_data(&self) -> &[u8] {
        match &self.inner {
            Inner::Slice(bytes) => &bytes[..],
            Inner::Pooled(pooled) => &pooled.data[..pooled.len],
        }
    }

    /// Drops this reference, returning pooled storage if it was the last one.
    pub fn free(self) {}
}

impl From<Bytes> for Buffer {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Slice(bytes),
        }
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Bytes::from(data).into()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.read_only_data()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

/// One logical payload spread over one or more [`Buffer`]s.
#[derive(Debug, Clone, Default)]
pub struct BufferSlice(Vec<Buffer>);

impl BufferSlice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, buf: Buffer) {
        self.0.push(buf)
    }

    /// Total number of bytes across all chunks.
    pub fn len(&self) -> usize {
        self.0.iter().map(Buffer::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Buffer::is_empty)
    }

    pub fn chunk_count(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, Buffer> {
        self.0.iter()
    }

    /// Copies every chunk into one freshly allocated vector.
    pub fn materialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for buf in &self.0 {
            out.extend_from_slice(buf.read_only_data());
        }
        out
    }

    /// Returns the payload as one contiguous buffer.
    ///
    /// A single chunk is shared rather than copied. Otherwise the chunks are
    /// copied into storage borrowed from `pool`, which the returned buffer
    /// releases when dropped.
    pub fn materialize_to_buffer(&self, pool: &Arc<dyn BufferPool>) -> Buffer {
        if let [single] = self.0.as_slice() {
            return single.clone();
        }
        let len = self.len();
        if len == 0 {
            return Buffer::from(Bytes::new());
        }
        let mut data = pool.get(len);
        let mut offset = 0;
        for buf in &self.0 {
            let chunk = buf.read_only_data();
            data[offset..offset + chunk.len()].copy_from_slice(chunk);
            offset += chunk.len();
        }
        Buffer::pooled(data, len, pool.clone())
    }

    /// A [`Buf`] view over the chunks, for streaming decoders.
    pub fn as_buf(&self) -> SliceBuf<'_> {
        SliceBuf::new(&self.0)
    }

    pub fn free(self) {}
}

impl From<Buffer> for BufferSlice {
    fn from(buf: Buffer) -> Self {
        Self(vec![buf])
    }
}

impl FromIterator<Buffer> for BufferSlice {
    fn from_iter<T: IntoIterator<Item = Buffer>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BufferSlice {
    type Item = &'a Buffer;
    type IntoIter = Iter<'a, Buffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SliceBuf<'a> {
    chunks: &'a [Buffer],
    offset: usize,
    remaining: usize,
}

impl<'a> SliceBuf<'a> {
    fn new(chunks: &'a [Buffer]) -> Self {
        let mut buf = Self {
            chunks,
            offset: 0,
            remaining: chunks.iter().map(Buffer::len).sum(),
        };
        buf.skip_exhausted();
        buf
    }

    fn skip_exhausted(&mut self) {
        while let Some(first) = self.chunks.first() {
            if self.offset < first.len() {
                break;
            }
            self.chunks = &self.chunks[1..];
            self.offset = 0;
        }
    }
}

impl Buf for SliceBuf<'_> {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn chunk(&self) -> &[u8] {
        match self.chunks.first() {
            Some(first) => &first.read_only_data()[self.offset..],
            None => &[],
        }
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining,
            "cannot advance past the end of a buffer slice"
        );
        self.remaining -= cnt;
        while cnt > 0 {
            let step = cnt.min(self.chunks[0].len() - self.offset);
            self.offset += step;
            cnt -= step;
            self.skip_exhausted();
        }
    }
}
