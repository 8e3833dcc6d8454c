//! Shared exponential backoff for the two call sites that retry against the
//! store: schema upload (§4.8 "may return HTTP 200 with an embedded 'not
//! ready' error") and transaction-conflict retry on commit. One helper
//! instead of duplicating the loop twice, following
//! `original_source/cli/badger/graph/dgraph.py`'s retry shape.

use std::time::Duration;

const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Calls `attempt` up to `MAX_ATTEMPTS` times. `attempt` returns `Ok(T)` on
/// success, `Err(Retry(e))` to sleep-and-retry, or `Err(Abort(e))` to stop
/// immediately. Delay grows linearly with the attempt number, matching the
/// original's `retry_delay * (attempt + 1)`.
pub async fn with_backoff<T, E, F, Fut>(mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Outcome<T, E>>,
{
    for n in 0..MAX_ATTEMPTS {
        match attempt(n).await {
            Outcome::Done(result) => return result,
            Outcome::Retry(err) => {
                if n + 1 == MAX_ATTEMPTS {
                    return Err(err);
                }
                tracing::warn!(attempt = n + 1, max = MAX_ATTEMPTS, "retrying after transient store error");
                tokio::time::sleep(BASE_DELAY * (n + 1)).await;
            }
        }
    }
    unreachable!("loop always returns by the last attempt")
}

pub enum Outcome<T, E> {
    Done(Result<T, E>),
    Retry(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_without_retrying_when_first_attempt_is_done() {
        let mut calls = 0;
        let result: Result<i32, &str> = with_backoff(|_n| {
            calls += 1;
            async { Outcome::Done(Ok(7)) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retries_until_done_then_stops() {
        let mut calls = 0;
        let result: Result<i32, &str> = with_backoff(|n| {
            calls += 1;
            async move { if n < 2 { Outcome::Retry("not ready") } else { Outcome::Done(Ok(42)) } }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<i32, &str> = with_backoff(|_n| {
            calls += 1;
            async { Outcome::Retry("still not ready") }
        })
        .await;
        assert_eq!(result, Err("still not ready"));
        assert_eq!(calls, MAX_ATTEMPTS);
    }
}
