pub mod backoff;
pub mod error;
pub mod normalizer;
pub mod source;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;
