//! Bounded retry for filesystem operations
//!
//! Renames and in-place rewrites under the archive tree occasionally fail
//! from transient contention (indexers, antivirus, network filesystems).
//! Those operations are retried a fixed number of times with no delay;
//! network operations are never retried and fail fast.

use crate::error::{Error, Result};

/// Attempts used for rename and metadata-rewrite operations.
pub const WRITE_ATTEMPTS: u32 = 5;

/// Run `op` up to `attempts` times, returning the first success.
///
/// Exhausting the attempts yields [`Error::RetriesExhausted`] carrying the
/// final underlying IO error; `operation` names the call site in the error.
pub fn with_retries<T, F>(operation: &'static str, attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> std::io::Result<T>,
{
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(
                    operation,
                    attempt,
                    attempts,
                    error = %e,
                    "Transient filesystem failure"
                );
                last_err = Some(e);
            }
        }
    }

    Err(Error::RetriesExhausted {
        operation,
        attempts,
        source: last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "no attempts made")
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_success() {
        let mut calls = 0;
        let result = with_retries("noop", WRITE_ATTEMPTS, || {
            calls += 1;
            Ok::<_, std::io::Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let mut calls = 0;
        let result = with_retries("flaky", WRITE_ATTEMPTS, || {
            calls += 1;
            if calls < 3 {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "busy"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_exhaustion_reports_operation_and_attempts() {
        let mut calls = 0;
        let result: Result<()> = with_retries("rename", WRITE_ATTEMPTS, || {
            calls += 1;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "busy"))
        });

        assert_eq!(calls, WRITE_ATTEMPTS);
        match result {
            Err(Error::RetriesExhausted {
                operation,
                attempts,
                ..
            }) => {
                assert_eq!(operation, "rename");
                assert_eq!(attempts, WRITE_ATTEMPTS);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
