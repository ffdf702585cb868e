// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Request-shaped calls through a breaker.
//!
//! A [`Requester`] is anything that can send an [`http::Request`] and hand back an
//! [`http::Response`]. [`Breaker::send`] guards a single send with the breaker:
//!
//! ```rust
//! use sluice::Breaker;
//! use sluice::http::Requester;
//! # use tick::Clock;
//!
//! struct Loopback;
//!
//! impl Requester<String> for Loopback {
//!     type Body = String;
//!     type Error = std::io::Error;
//!
//!     fn send(&self, request: http::Request<String>) -> Result<http::Response<String>, Self::Error> {
//!         Ok(http::Response::new(request.into_body()))
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let clock = Clock::new_frozen();
//! let breaker = Breaker::builder("loopback", &clock).build()?;
//! let response = breaker.send(&Loopback, http::Request::new("ping".to_string()))?;
//! assert_eq!(response.body(), "ping");
//! # Ok(())
//! # }
//! ```
//!
//! The breaker does not look at status codes on its own. Use [`Breaker::send_classified`]
//! to count, for example, server errors as failures.

use http::{Request, Response};

use crate::{Breaker, ExecuteError, Outcome};

/// Sends a request and returns the response, or fails to deliver it.
pub trait Requester<B> {
    /// Body type of the responses.
    type Body;

    /// Transport error type.
    type Error;

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns an error when no response could be obtained.
    fn send(&self, request: Request<B>) -> Result<Response<Self::Body>, Self::Error>;
}

impl<B, R: Requester<B> + ?Sized> Requester<B> for &R {
    type Body = R::Body;
    type Error = R::Error;

    fn send(&self, request: Request<B>) -> Result<Response<Self::Body>, Self::Error> {
        (**self).send(request)
    }
}

impl Breaker {
    /// Sends `request` through `requester` if the breaker admits it.
    ///
    /// Only transport errors count as failures; every response counts as a success.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::RequestDropped`] without sending when the breaker refuses the
    /// call, or [`ExecuteError::Operation`] with the requester's error.
    pub fn send<B, R>(&self, requester: &R, request: Request<B>) -> Result<Response<R::Body>, ExecuteError<R::Error>>
    where
        R: Requester<B> + ?Sized,
    {
        self.execute(|| requester.send(request))
    }

    /// Like [`send`](Self::send), but responses for which `is_failure` returns `true` count as
    /// failures too. The response is still returned to the caller.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn send_classified<B, R>(
        &self,
        requester: &R,
        request: Request<B>,
        is_failure: impl FnOnce(&Response<R::Body>) -> bool,
    ) -> Result<Response<R::Body>, ExecuteError<R::Error>>
    where
        R: Requester<B> + ?Sized,
    {
        self.execute_with(
            || requester.send(request),
            |result| match result {
                Ok(response) => Outcome::from(is_failure(response)),
                Err(_) => Outcome::Failure,
            },
        )
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;
    use tick::Clock;

    use super::*;
    use crate::{CircuitState, DropReason};

    #[derive(Debug, Default)]
    struct StatusRequester {
        status: StatusCode,
        sent: AtomicUsize,
    }

    impl Requester<()> for StatusRequester {
        type Body = ();
        type Error = std::io::Error;

        fn send(&self, _request: Request<()>) -> Result<Response<()>, Self::Error> {
            self.sent.fetch_add(1, Ordering::Relaxed);
            let mut response = Response::new(());
            *response.status_mut() = self.status;
            Ok(response)
        }
    }

    struct Unreachable;

    impl Requester<()> for Unreachable {
        type Body = ();
        type Error = std::io::Error;

        fn send(&self, _request: Request<()>) -> Result<Response<()>, Self::Error> {
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
        }
    }

    fn breaker() -> Breaker {
        Breaker::builder("http", &Clock::new_frozen()).build().unwrap()
    }

    #[test]
    fn send_counts_only_transport_errors() {
        let breaker = breaker();
        let requester = StatusRequester {
            status: StatusCode::SERVICE_UNAVAILABLE,
            ..StatusRequester::default()
        };

        let response = breaker.send(&requester, Request::new(())).unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(breaker.snapshot().total_failures(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn transport_error_trips() {
        let breaker = breaker();

        let error = breaker.send(&Unreachable, Request::new(())).unwrap_err();

        assert_eq!(
            error.into_operation().map(|error| error.kind()),
            Some(std::io::ErrorKind::ConnectionRefused)
        );
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn send_classified_counts_server_errors() {
        let breaker = breaker();
        let requester = StatusRequester {
            status: StatusCode::BAD_GATEWAY,
            ..StatusRequester::default()
        };

        let response = breaker
            .send_classified(&requester, Request::new(()), |response| response.status().is_server_error())
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(breaker.state(), CircuitState::Open);

        let error = breaker
            .send_classified(&requester, Request::new(()), |response| response.status().is_server_error())
            .unwrap_err();
        assert_eq!(error.drop_reason(), Some(DropReason::Open));
        assert_eq!(requester.sent.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn requester_by_reference() {
        let breaker = breaker();
        let requester = StatusRequester::default();

        breaker.send(&&requester, Request::new(())).unwrap();

        assert_eq!(requester.sent.load(Ordering::Relaxed), 1);
    }
}
