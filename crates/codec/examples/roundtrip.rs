use fastcodec::FastCodec;
use fastcodec_common::{
    codec::{Codec, FastPath, Registry},
    error::BoxError,
    impl_message,
};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Frame {
    seq: u32,
    body: Vec<u8>,
}

impl FastPath for Frame {
    fn encoded_len(&self) -> usize {
        4 + self.body.len()
    }

    fn encode_to_sized(&self, buf: &mut [u8]) -> Result<usize, BoxError> {
        buf[..4].copy_from_slice(&self.seq.to_be_bytes());
        buf[4..].copy_from_slice(&self.body);
        Ok(buf.len())
    }

    fn decode_from(&mut self, data: &[u8]) -> Result<(), BoxError> {
        let (seq, body) = data
            .split_first_chunk::<4>()
            .ok_or("frame shorter than its header")?;
        self.seq = u32::from_be_bytes(*seq);
        self.body = body.to_vec();
        Ok(())
    }
}

impl_message!(Frame, fast_path);

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Status {
    healthy: bool,
    detail: String,
}

impl_message!(Status);

#[snafu::report]
fn main() -> Result<(), fastcodec::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .and_then(
                    filter::targets::Targets::new()
                        .with_target("fastcodec", Level::TRACE)
                        .with_target("fastcodec_common", Level::DEBUG),
                ),
        )
        .init();

    let registry = Registry::with_defaults();
    fastcodec::install(&registry)?;
    let codec = registry
        .get(fastcodec::NAME)
        .expect("install registers the codec");

    for size in [16, 4096] {
        let frame = Frame {
            seq: size as u32,
            body: vec![7; size],
        };
        let data = codec.marshal(&frame).expect("marshal frame");
        let mut decoded = Frame::default();
        codec.unmarshal(&data, &mut decoded).expect("unmarshal frame");
        assert_eq!(decoded, frame);
        println!(
            "frame of {} bytes: pooled = {}",
            data.len(),
            data.iter().any(|buf| buf.is_pooled())
        );
    }

    let status = Status {
        healthy: true,
        detail: "ok".to_string(),
    };
    let data = codec.marshal(&status).expect("marshal status");
    println!("status through fallback: {} bytes", data.len());

    let standalone = FastCodec::new(codec);
    println!("{} wraps {}", standalone.name(), standalone.fallback().name());
    Ok(())
}
