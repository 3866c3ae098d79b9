//! Retry of units of work that lost a concurrent bed update.
//!
//! A [`OccupancyError::BedUpdateConflict`] means nothing was committed, so
//! re-running the whole unit of work from a fresh read is safe. It is
//! retried once; a second conflict is returned to the caller.

use std::future::Future;

use crate::error::OccupancyError;

/// How many times a conflicting unit of work is re-run.
pub const CONFLICT_RETRIES: usize = 1;

/// Run `op`, re-running it after a conflict up to [`CONFLICT_RETRIES`]
/// times.
pub async fn retry_on_conflict<T, F, Fut>(operation: &str, mut op: F) -> Result<T, OccupancyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OccupancyError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_conflict() && attempt < CONFLICT_RETRIES => {
                attempt += 1;
                tracing::warn!(operation, attempt, error = %e, "retrying after conflict");
            }
            result => return result,
        }
    }
}

/// Blocking counterpart of [`retry_on_conflict`].
pub fn retry_on_conflict_blocking<T>(
    operation: &str,
    mut op: impl FnMut() -> Result<T, OccupancyError>,
) -> Result<T, OccupancyError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_conflict() && attempt < CONFLICT_RETRIES => {
                attempt += 1;
                tracing::warn!(operation, attempt, error = %e, "retrying after conflict");
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_core::BedId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn conflict() -> OccupancyError {
        OccupancyError::BedUpdateConflict { bed: BedId::new() }
    }

    #[tokio::test]
    async fn conflict_is_retried_exactly_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_on_conflict("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conflict()) }
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let calls = AtomicUsize::new(0);
        let result = retry_on_conflict("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(conflict())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_on_conflict("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(OccupancyError::Storage("down".into())) }
        })
        .await;
        assert!(matches!(result, Err(OccupancyError::Storage(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blocking_variant_matches() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict_blocking("test", || {
            calls += 1;
            Err(conflict())
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
