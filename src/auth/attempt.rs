//! At-most-once completion for login attempts.
//!
//! A login races against a watchdog timer and user cancellation. Whichever
//! finishes first settles the attempt through a [`CompletionGuard`]; every later
//! signal is discarded so UI state is never updated twice.

use super::{
    error::{AuthError, TransportError, TransportKind},
    module::{AuthModule, LoginOutcome, LoginStep},
    params::{ExternalCompletion, LoginParameters},
};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{oneshot, Notify},
    time::sleep,
};
use tracing::{debug, warn};

pub const WATCHDOG_DOMAIN: &str = "watchdog";

/// Runs the wrapped callback at most once, no matter how many times `fire` is
/// called or from how many threads.
pub struct CompletionGuard<F> {
    callback: Mutex<Option<F>>,
}

impl<F> CompletionGuard<F> {
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
        }
    }

    /// Invokes the callback if nobody has yet. Returns whether this call won.
    pub fn fire<T>(&self, value: T) -> bool
    where
        F: FnOnce(T),
    {
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.callback.lock().is_none()
    }
}

/// Cloneable cancellation signal shared between the caller and an attempt.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Races `work` against `timeout` and `cancel`; the first to finish wins.
///
/// # Errors
///
/// Returns a timed-out [`AuthError::Network`] when the watchdog fires first and
/// [`AuthError::Cancelled`] when the caller cancels first.
pub async fn settle<W, T>(work: W, timeout: Duration, cancel: &Cancellation) -> Result<T, AuthError>
where
    W: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let guard = Arc::new(CompletionGuard::new(move |result: Result<T, AuthError>| {
        let _ = sender.send(result);
    }));

    let worker = {
        let guard = Arc::clone(&guard);
        tokio::spawn(async move {
            let value = work.await;
            if !guard.fire(Ok(value)) {
                debug!("attempt finished after it was already settled");
            }
        })
    };

    let watchdog = {
        let guard = Arc::clone(&guard);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = sleep(timeout) => {
                    let err = AuthError::Network(TransportError::of_kind(
                        WATCHDOG_DOMAIN,
                        TransportKind::TimedOut,
                        format!("no response within {timeout:?}"),
                    ));
                    if guard.fire(Err(err)) {
                        warn!("attempt timed out after {:?}", timeout);
                    }
                }
                () = cancel.cancelled() => {
                    if guard.fire(Err(AuthError::Cancelled)) {
                        debug!("attempt cancelled");
                    }
                }
            }
        })
    };

    let result = receiver.await.unwrap_or(Err(AuthError::Cancelled));

    watchdog.abort();
    if result.is_err() {
        worker.abort();
    }

    result
}

/// Runs `module.login` under the watchdog.
///
/// Only the network exchange is raced. The session and the module state are
/// committed after the exchange has won, so an exchange that finishes after the
/// watchdog leaves nothing behind.
///
/// # Errors
///
/// See [`settle`].
pub async fn attempt_login(
    module: Arc<AuthModule>,
    params: LoginParameters,
    timeout: Duration,
    cancel: &Cancellation,
) -> Result<LoginStep, AuthError> {
    module.begin_login();
    let worker = Arc::clone(&module);
    match settle(async move { worker.run_login(&params).await }, timeout, cancel).await {
        Ok(attempt) => Ok(module.commit_step(attempt)),
        Err(err) => {
            module.abandon();
            Err(err)
        }
    }
}

/// Runs `module.finish_login` under the watchdog, committing the same way as
/// [`attempt_login`].
///
/// # Errors
///
/// See [`settle`].
pub async fn attempt_finish_login(
    module: Arc<AuthModule>,
    completion: ExternalCompletion,
    timeout: Duration,
    cancel: &Cancellation,
) -> Result<LoginOutcome, AuthError> {
    if let Err(outcome) = module.begin_finish() {
        return Ok(outcome);
    }
    let worker = Arc::clone(&module);
    match settle(
        async move { worker.run_finish(completion).await },
        timeout,
        cancel,
    )
    .await
    {
        Ok(attempt) => Ok(module.commit_outcome(attempt)),
        Err(err) => {
            module.abandon();
            Err(err)
        }
    }
}
