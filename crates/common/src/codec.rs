pub mod bincode;
pub mod json;
mod registry;

pub use erased_serde;
pub use registry::Registry;

use snafu::{Location, Snafu};

use crate::{error::BoxError, mem::BufferSlice};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("fast path encode error"))]
    FastPathEncode {
        source: BoxError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("fast path decode error"))]
    FastPathDecode {
        source: BoxError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("fast path encoder wrote {written} bytes, expected {expected}"))]
    ShortWrite {
        expected: usize,
        written: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("bincode error"))]
    Bincode {
        source: ::bincode::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("json error"))]
    Json {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("message serde error"))]
    Erased {
        source: erased_serde::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Reflection-free serialization a message type may opt into.
pub trait FastPath {
    /// Exact number of bytes [`FastPath::encode_to_sized`] writes. Must be pure.
    fn encoded_len(&self) -> usize;

    /// Encodes into `buf`, which is exactly [`FastPath::encoded_len`] bytes long.
    /// Returns the number of bytes written.
    fn encode_to_sized(&self, buf: &mut [u8]) -> Result<usize, BoxError>;

    /// Replaces `self` with the message encoded in `data`.
    fn decode_from(&mut self, data: &[u8]) -> Result<(), BoxError>;
}

/// A value the RPC layer hands to a [`Codec`].
///
/// Every message has a serde view used by the fallback codecs. Types that
/// implement [`FastPath`] also expose it here; see [`impl_message!`](crate::impl_message).
pub trait Message: Send + Sync + 'static {
    fn as_serialize(&self) -> &dyn erased_serde::Serialize;

    fn merge_from(
        &mut self,
        de: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error>;

    fn fast_path(&self) -> Option<&dyn FastPath> {
        None
    }

    fn fast_path_mut(&mut self) -> Option<&mut dyn FastPath> {
        None
    }
}

pub trait Codec: Send + Sync + 'static {
    fn marshal(&self, msg: &dyn Message) -> Result<BufferSlice, Error>;

    fn unmarshal(&self, data: &BufferSlice, msg: &mut dyn Message) -> Result<(), Error>;

    /// Content subtype this codec is registered under.
    fn name(&self) -> &str;
}

/// Implements [`Message`] for a serde type.
///
/// `impl_message!(T)` gives a fallback-only message, `impl_message!(T, fast_path)`
/// also routes the fast path to `T`'s [`FastPath`] impl.
#[macro_export]
macro_rules! impl_message {
    (@serde) => {
        fn as_serialize(&self) -> &dyn $crate::codec::erased_serde::Serialize {
            self
        }

        fn merge_from(
            &mut self,
            de: &mut dyn $crate::codec::erased_serde::Deserializer<'_>,
        ) -> ::std::result::Result<(), $crate::codec::erased_serde::Error> {
            *self = $crate::codec::erased_serde::deserialize(de)?;
            Ok(())
        }
    };
    ($ty: ty, fast_path) => {
        impl $crate::codec::Message for $ty {
            $crate::impl_message!(@serde);

            fn fast_path(&self) -> Option<&dyn $crate::codec::FastPath> {
                Some(self)
            }

            fn fast_path_mut(&mut self) -> Option<&mut dyn $crate::codec::FastPath> {
                Some(self)
            }
        }
    };
    ($ty: ty) => {
        impl $crate::codec::Message for $ty {
            $crate::impl_message!(@serde);
        }
    };
}
