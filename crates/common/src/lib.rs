#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod mem;
