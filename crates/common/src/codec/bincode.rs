use bincode::Options;
use bytes::{Buf, BufMut, BytesMut};
use snafu::ResultExt;

use super::{BincodeSnafu, Codec, ErasedSnafu, Error, Message};
use crate::mem::{Buffer, BufferSlice};

pub const NAME: &str = "bincode";

/// Fallback codec for any [`Message`], using bincode's fixed-int encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bincode;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

impl Codec for Bincode {
    #[tracing::instrument(skip_all)]
    fn marshal(&self, msg: &dyn Message) -> Result<BufferSlice, Error> {
        let item = msg.as_serialize();
        let size = options().serialized_size(item).context(BincodeSnafu)?;
        let mut buf = BytesMut::with_capacity(size as usize);
        options()
            .serialize_into((&mut buf).writer(), item)
            .context(BincodeSnafu)?;
        Ok(Buffer::from(buf.freeze()).into())
    }

    #[tracing::instrument(skip_all)]
    fn unmarshal(&self, data: &BufferSlice, msg: &mut dyn Message) -> Result<(), Error> {
        let mut de = bincode::Deserializer::with_reader(data.as_buf().reader(), options());
        msg.merge_from(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .context(ErasedSnafu)
    }

    fn name(&self) -> &str {
        NAME
    }
}
