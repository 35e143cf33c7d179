#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    #[error("key must be exactly two hex digits (got '{0}')")]
    BadKey(String),

    #[error("capacity must be at least 1")]
    CapacityZero,

    #[error("delay-ms must be in range 0..=5000 (got {0})")]
    DelayOutOfRange(u64),

    #[error("mode must be 'auto' or 'manual' (got '{0}')")]
    BadMode(String),
}
