//! Bridge from façade futures to completion callbacks.
//!
//! Callback consumers hand over a future and an `FnOnce`; the callback runs exactly
//! once on a runtime worker, with the future's result or, if the future panicked,
//! an [`ErrorKind::Internal`] envelope.

use crate::core::error::{ErrorKind, FirebaseError, FirebaseResult};
use std::any::Any;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs `future` on `handle` and delivers its outcome to `completion`.
///
/// The returned handle resolves after the completion has run.
///
/// The exactly-once guarantee holds while the runtime behind `handle` is alive. If it
/// shuts down before the operation finishes, the tasks are dropped and `completion`
/// never runs.
pub fn dispatch<T, F, C>(handle: &Handle, future: F, completion: C) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = FirebaseResult<T>> + Send + 'static,
    C: FnOnce(FirebaseResult<T>) + Send + 'static,
{
    let operation = handle.spawn(future);
    handle.spawn(async move {
        let result = match operation.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                log::warn!("Operation panicked: {}", message);
                Err(FirebaseError::new(
                    ErrorKind::Internal,
                    format!("Operation panicked: {}", message),
                ))
            }
            Err(_) => Err(FirebaseError::new(ErrorKind::Internal, "Operation was cancelled")),
        };
        completion(result);
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    async fn run<F>(future: F) -> (usize, Option<FirebaseResult<u32>>)
    where
        F: Future<Output = FirebaseResult<u32>> + Send + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = Arc::new(Mutex::new(None));
        let (calls_in, outcome_in) = (calls.clone(), outcome.clone());

        dispatch(&Handle::current(), future, move |result| {
            calls_in.fetch_add(1, Ordering::SeqCst);
            *outcome_in.lock().unwrap() = Some(result);
        })
        .await
        .unwrap();

        let outcome = outcome.lock().unwrap().take();
        (calls.load(Ordering::SeqCst), outcome)
    }

    #[tokio::test]
    async fn test_success_completes_once() {
        let (calls, outcome) = run(async { Ok(7) }).await;
        assert_eq!(calls, 1);
        assert_eq!(outcome, Some(Ok(7)));
    }

    #[tokio::test]
    async fn test_failure_completes_once() {
        let error = FirebaseError::new(ErrorKind::PermissionDenied, "denied").with_code(17);
        let expected = error.clone();
        let (calls, outcome) = run(async move { Err(error) }).await;
        assert_eq!(calls, 1);
        assert_eq!(outcome, Some(Err(expected)));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let (calls, outcome) = run(async {
            if calls_panic() {
                panic!("boom");
            }
            Ok(1)
        })
        .await;
        assert_eq!(calls, 1);
        let error = outcome.unwrap().unwrap_err();
        assert_eq!(error.kind, ErrorKind::Internal);
        assert!(error.message.contains("boom"));
    }

    fn calls_panic() -> bool {
        true
    }
}
