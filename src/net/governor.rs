//! Concurrency governor.
//!
//! # Responsibilities
//! - Hold a fixed pool of admission tokens
//! - Make requests wait (FIFO) for a token instead of failing
//! - Track how many requests are in flight
//!
//! # Design Decisions
//! - Built on a tokio semaphore, which queues waiters fairly
//! - Acceptance of connections is left to the transport; only request
//!   processing is bounded
//! - The token is shared through request extensions so work that outlives
//!   the response future (a routine on the blocking pool whose client went
//!   away) keeps holding it until it returns

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::DispatchError;
use crate::observability::metrics;

/// Fixed-size pool of admission tokens.
#[derive(Debug, Clone)]
pub struct Governor {
    permits: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Proof of admission. Dropping it releases the token.
#[derive(Debug)]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        let now = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_in_flight(now);
    }
}

impl Governor {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a token.
    ///
    /// Only fails once the governor has been closed for shutdown.
    pub async fn admit(&self) -> Result<AdmissionToken, DispatchError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::Unavailable)?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_in_flight(now);

        Ok(AdmissionToken {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stop admitting; waiting and future requests get 503.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Tokens not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Shared handle on an admission token, found in request extensions.
///
/// The token is released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct AdmissionLease(Arc<AdmissionToken>);

/// Axum middleware holding a token for the rest of the pipeline.
pub async fn admission_middleware(
    State(governor): State<Governor>,
    mut request: Request,
    next: Next,
) -> Response {
    let lease = match governor.admit().await {
        Ok(token) => AdmissionLease(Arc::new(token)),
        Err(err) => return err.into_response(),
    };
    request.extensions_mut().insert(lease.clone());

    let response = next.run(request).await;
    drop(lease);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tokens_are_counted() {
        let governor = Governor::new(2);
        let a = governor.admit().await.unwrap();
        let b = governor.admit().await.unwrap();
        assert_eq!(governor.in_flight(), 2);
        assert_eq!(governor.available(), 0);

        drop(a);
        assert_eq!(governor.in_flight(), 1);
        assert_eq!(governor.available(), 1);
        drop(b);
        assert_eq!(governor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waits_instead_of_rejecting() {
        let governor = Governor::new(1);
        let held = governor.admit().await.unwrap();

        let waiter = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.admit().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let admitted = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(admitted.is_ok());
    }

    #[tokio::test]
    async fn test_lease_holds_token_until_last_clone() {
        let governor = Governor::new(1);
        let lease = AdmissionLease(Arc::new(governor.admit().await.unwrap()));
        let worker = lease.clone();

        drop(lease);
        assert_eq!(governor.in_flight(), 1);
        assert_eq!(governor.available(), 0);

        drop(worker);
        assert_eq!(governor.in_flight(), 0);
        assert_eq!(governor.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_governor_is_unavailable() {
        let governor = Governor::new(1);
        governor.close();
        assert!(matches!(governor.admit().await, Err(DispatchError::Unavailable)));
    }
}
