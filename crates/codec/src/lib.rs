#![forbid(unsafe_code)]

//! A [`Codec`] that encodes messages through their [`FastPath`] when they have
//! one and hands everything else to a fallback codec.

use std::sync::Arc;

use fastcodec_common::{
    codec::{
        self, Codec, FastPath, FastPathDecodeSnafu, FastPathEncodeSnafu, Message, Registry,
        ShortWriteSnafu,
    },
    mem::{self, Buffer, BufferPool, BufferSlice},
};
use snafu::{ensure, Location, OptionExt, ResultExt, Snafu};
use tracing::{debug, trace};

/// Name this codec registers under, replacing the bincode fallback.
pub const NAME: &str = codec::bincode::NAME;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("no fallback codec registered under {name}"))]
    FallbackMissing {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub struct FastCodec {
    fallback: Arc<dyn Codec>,
    pool: Arc<dyn BufferPool>,
}

impl FastCodec {
    pub fn new(fallback: Arc<dyn Codec>) -> Self {
        Self {
            fallback,
            pool: mem::default_buffer_pool(),
        }
    }

    /// Uses `pool` instead of the process-wide default.
    pub fn with_pool(mut self, pool: Arc<dyn BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn fallback(&self) -> &Arc<dyn Codec> {
        &self.fallback
    }

    fn marshal_fast(&self, msg: &dyn FastPath) -> Result<BufferSlice, codec::Error> {
        let size = msg.encoded_len();
        if mem::is_below_buffer_pooling_threshold(size) {
            trace!(size, "encoding into transient buffer");
            let mut buf = vec![0; size];
            encode_exact(msg, &mut buf)?;
            return Ok(Buffer::from(buf).into());
        }

        trace!(size, "encoding into pooled buffer");
        let mut buf = self.pool.get(size);
        if let Err(e) = encode_exact(msg, &mut buf[..size]) {
            debug!(size, "fast path encode failed, releasing pooled buffer");
            self.pool.put(buf);
            return Err(e);
        }
        Ok(Buffer::pooled(buf, size, self.pool.clone()).into())
    }
}

fn encode_exact(msg: &dyn FastPath, buf: &mut [u8]) -> Result<(), codec::Error> {
    let written = msg.encode_to_sized(buf).context(FastPathEncodeSnafu)?;
    ensure!(
        written == buf.len(),
        ShortWriteSnafu {
            expected: buf.len(),
            written,
        }
    );
    Ok(())
}

impl Codec for FastCodec {
    #[tracing::instrument(skip_all)]
    fn marshal(&self, msg: &dyn Message) -> Result<BufferSlice, codec::Error> {
        match msg.fast_path() {
            Some(fast) => self.marshal_fast(fast),
            None => self.fallback.marshal(msg),
        }
    }

    #[tracing::instrument(skip_all, fields(len = data.len()))]
    fn unmarshal(&self, data: &BufferSlice, msg: &mut dyn Message) -> Result<(), codec::Error> {
        match msg.fast_path_mut() {
            Some(fast) => {
                // released on drop, whatever decode_from returns
                let buf = data.materialize_to_buffer(&self.pool);
                fast.decode_from(buf.read_only_data())
                    .context(FastPathDecodeSnafu)
            }
            None => self.fallback.unmarshal(data, msg),
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Wraps the codec registered under [`NAME`] in a [`FastCodec`] and registers
/// that in its place. Returns the wrapped fallback.
pub fn install(registry: &Registry) -> Result<Arc<dyn Codec>, Error> {
    registry
        .wrap(NAME, |fallback| -> Arc<dyn Codec> {
            Arc::new(FastCodec::new(fallback))
        })
        .context(FallbackMissingSnafu { name: NAME })
}
