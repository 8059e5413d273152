//! Error taxonomy shared by every probe and data source.
//!
//! `Warmup` is deliberately absent here: it is a successful outcome carried by
//! [`Sampled`], not a failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnoopError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnoopError {
    /// Malformed input to a core call. Never retried automatically.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An external data source could not be read during this call.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Building a per-core result failed to allocate.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl SnoopError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

impl From<std::io::Error> for SnoopError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<std::collections::TryReserveError> for SnoopError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory(err.to_string())
    }
}

/// Outcome of a stateful sampling call.
///
/// `Warmup` means no usable result exists yet; the caller should wait one
/// sampling interval and call again. Probe state is intact either way.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampled<T> {
    Warmup,
    Ready(T),
}

impl<T> Sampled<T> {
    pub fn is_warmup(&self) -> bool {
        matches!(self, Self::Warmup)
    }

    /// The ready value, or `None` while warming up.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Warmup => None,
            Self::Ready(v) => Some(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sampled<U> {
        match self {
            Self::Warmup => Sampled::Warmup,
            Self::Ready(v) => Sampled::Ready(f(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_category() {
        let e = SnoopError::unavailable("host_processor_info failed");
        assert_eq!(e.to_string(), "source unavailable: host_processor_info failed");
        let e = SnoopError::invalid("zero cores");
        assert!(e.to_string().starts_with("invalid argument"));
    }

    #[test]
    fn io_errors_map_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no /proc/stat");
        assert!(matches!(SnoopError::from(io), SnoopError::Unavailable(_)));
    }

    #[test]
    fn sampled_helpers() {
        let w: Sampled<u32> = Sampled::Warmup;
        assert!(w.is_warmup());
        assert_eq!(w.ready(), None);
        let r = Sampled::Ready(2).map(|v| v * 3);
        assert_eq!(r, Sampled::Ready(6));
        assert_eq!(r.ready(), Some(6));
    }
}
