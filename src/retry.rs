//! Retry/backoff helper: wraps a fallible async call with
//! bounded retries, classifying transient vs fatal errors via
//! [`crate::error::ThermostatError::is_retryable`]. Every driver capability
//! call in this crate is `async`, so this is a hand-rolled `tokio::time::sleep`
//! loop rather than the `retry` crate (which only retries synchronous
//! closures) — see DESIGN.md.

use std::future::Future;
use std::time::Duration;

use crate::alert::AlertSink;
use crate::error::{Result, ThermostatError};

/// Outcome of [`execute_with_retries`], distinguishing a first-try success
/// (no alert — a retry that never fired isn't worth an operator's
/// attention) from a mitigated one (emits a success alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    SucceededFirstTry,
    SucceededAfterRetry { attempts: u32 },
}

/// Call `f`, retrying up to `max_attempts` total tries with `delay` between
/// attempts when the error is retryable. On final failure, emits an
/// informational alert noting the trial count and surfaces the error. On
/// success after at least one retry, emits a mitigation-success alert;
/// a first-try success emits nothing.
pub async fn execute_with_retries<F, Fut, T>(
    zone_id: &str,
    operation_name: &str,
    max_attempts: u32,
    delay: Duration,
    alert_sink: &dyn AlertSink,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<ThermostatError> = None;
    for attempt in 1..=max_attempts {
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    alert_sink
                        .send_alert(
                            &format!("[mitigated] {operation_name} on zone {zone_id}"),
                            &format!("{operation_name} succeeded on attempt {attempt} of {max_attempts}."),
                        )
                        .await;
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() || attempt == max_attempts {
                    last_err = Some(err);
                    break;
                }
                log::warn!("{operation_name} on zone {zone_id} failed (attempt {attempt}/{max_attempts}): {err}");
                tokio::time::sleep(delay).await;
                last_err = Some(err);
            }
        }
    }

    let err = last_err.expect("loop always assigns last_err before exhausting attempts");
    alert_sink
        .send_alert(
            &format!("[failed] {operation_name} on zone {zone_id}"),
            &format!("{operation_name} failed after {max_attempts} attempt(s): {err}"),
        )
        .await;
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::NullAlertSink;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try_without_retry() {
        let calls = AtomicU32::new(0);
        let sink = NullAlertSink;
        let result = execute_with_retries("0", "refresh", 3, Duration::from_millis(1), &sink, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ThermostatError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let sink = NullAlertSink;
        let result = execute_with_retries("0", "refresh", 3, Duration::from_millis(1), &sink, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ThermostatError::TransientNetwork { zone_id: "0".into(), message: "timeout".into() })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_error_is_never_retried() {
        let calls = AtomicU32::new(0);
        let sink = NullAlertSink;
        let result: Result<()> = execute_with_retries("0", "refresh", 5, Duration::from_millis(1), &sink, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ThermostatError::AuthError { zone_id: "0".into(), message: "bad creds".into() }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_final_error() {
        let sink = NullAlertSink;
        let result: Result<()> = execute_with_retries("0", "refresh", 2, Duration::from_millis(1), &sink, || async {
            Err(ThermostatError::TransientNetwork { zone_id: "0".into(), message: "still down".into() })
        })
        .await;
        assert!(result.unwrap_err().is_retryable());
    }
}
