//! The byte-level send primitive supplied by the caller.
//!
//! HTTP, TLS and authentication live behind this trait. Implementations
//! perform one blocking round trip per call with no retry.

use crate::error::TransportError;
use std::sync::Arc;

pub trait Transport {
    /// POST one request envelope and return the raw response body.
    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).post(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).post(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).post(request)
    }
}

/// Transport backed by a closure.
pub struct FnTransport<F>(F);

impl<F> Transport for FnTransport<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, TransportError>,
{
    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (self.0)(request)
    }
}

/// Wrap a closure as a [`Transport`].
pub fn from_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, TransportError>,
{
    FnTransport(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_transport() {
        let echo = from_fn(|req: &[u8]| Ok(req.to_vec()));
        assert_eq!(echo.post(b"ping").unwrap(), b"ping");
    }

    #[test]
    fn test_boxed_transport() {
        let failing: Box<dyn Transport> =
            Box::new(from_fn(|_: &[u8]| Err(TransportError::Other("refused".into()))));
        assert_eq!(failing.post(b"x").unwrap_err().to_string(), "refused");
    }

    #[test]
    fn test_shared_transport() {
        let shared = Arc::new(from_fn(|_: &[u8]| Ok(b"pong".to_vec())));
        let by_ref = &shared;
        assert_eq!(by_ref.post(b"ping").unwrap(), b"pong");
    }
}
