//! Fail-soft helpers for skippable remote actions
//!
//! A soft failure is logged and turned into `None`, so the calling state
//! machine can fall through to its safe default and keep making progress.
//!
//! DO NOT use fail-soft for:
//! - The initial profile check (fatal by contract)
//! - Claims, which need to distinguish "already claimed" from failure

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run an action whose failure the caller can skip past
///
/// # Usage
///
/// ```no_run
/// use kombat_core::fail_soft::fail_soft;
/// use kombat_core::Result;
///
/// async fn find_opponent() -> Result<Option<String>> {
///     Ok(Some("rook".to_string()))
/// }
///
/// async fn example() {
///     // None if the call failed, Some(None) if there was simply no opponent
///     let opponent = fail_soft("find_opponent", || find_opponent()).await.flatten();
/// }
/// ```
pub async fn fail_soft<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-soft): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KombatError;

    #[tokio::test]
    async fn test_fail_soft_success() {
        let result = fail_soft("test_op", || async { Ok::<_, KombatError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_soft_failure() {
        let result = fail_soft("test_op", || async {
            Err::<i32, _>(KombatError::Http("connection reset".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fail_soft_nested_option() {
        let result = fail_soft("find", || async { Ok::<Option<u8>, KombatError>(None) }).await;
        assert_eq!(result, Some(None));
        assert_eq!(result.flatten(), None);
    }

    #[tokio::test]
    async fn test_fail_soft_runs_closure_once() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result = fail_soft("counted", || async {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err::<(), _>(KombatError::Other("nope".into()))
        })
        .await;

        assert!(result.is_none());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
