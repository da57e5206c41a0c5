//! One-shot readiness signal for collaborators initialized at startup.
//!
//! The host creates a pair, hands [`Ready`] to whoever needs the collaborators
//! and calls [`Resolver::resolve`] once they are initialized. `resolve`
//! consumes the resolver, so the signal fires at most once.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error("resolver dropped before collaborators were ready")]
    Abandoned,
}

#[must_use]
pub fn channel<T>() -> (Resolver<T>, Ready<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, Ready { rx })
}

#[derive(Debug)]
pub struct Resolver<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        self.tx.send_replace(Some(Arc::new(value)));
    }
}

#[derive(Debug)]
pub struct Ready<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Clone for Ready<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> Ready<T> {
    /// Wait until the value is resolved.
    ///
    /// # Errors
    ///
    /// Returns `ReadinessError::Abandoned` if the resolver is dropped without resolving.
    pub async fn wait(&self) -> Result<Arc<T>, ReadinessError> {
        let mut rx = self.rx.clone();
        let resolved = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ReadinessError::Abandoned)?;
        let value = resolved.clone();
        drop(resolved);
        value.ok_or(ReadinessError::Abandoned)
    }

    /// The resolved value, if any, without waiting.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }
}
