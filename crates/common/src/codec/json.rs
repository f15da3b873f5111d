use bytes::{Buf, BufMut, BytesMut};
use snafu::ResultExt;

use super::{Codec, ErasedSnafu, Error, JsonSnafu, Message};
use crate::mem::{Buffer, BufferSlice};

pub const NAME: &str = "json";

#[derive(Debug, Default, Clone, Copy)]
pub struct Json;

impl Codec for Json {
    #[tracing::instrument(skip_all)]
    fn marshal(&self, msg: &dyn Message) -> Result<BufferSlice, Error> {
        let mut buf = BytesMut::new();
        serde_json::to_writer((&mut buf).writer(), msg.as_serialize()).context(JsonSnafu)?;
        Ok(Buffer::from(buf.freeze()).into())
    }

    #[tracing::instrument(skip_all)]
    fn unmarshal(&self, data: &BufferSlice, msg: &mut dyn Message) -> Result<(), Error> {
        let mut de = serde_json::Deserializer::from_reader(data.as_buf().reader());
        msg.merge_from(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .context(ErasedSnafu)?;
        de.end().context(JsonSnafu)
    }

    fn name(&self) -> &str {
        NAME
    }
}
