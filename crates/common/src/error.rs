/// Error type reported by fast-path message implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
