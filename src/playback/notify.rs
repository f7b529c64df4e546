use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Out-of-band "a child exited" notification.
///
/// The SIGCHLD listener only raises the flag and wakes the accept loop; the
/// loop decides what to do with it at the top of its next iteration.
#[derive(Debug, Clone, Default)]
pub struct ChildExitFlag {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    raised: AtomicBool,
    wake: Notify,
}

impl ChildExitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    /// Read and clear the flag.
    pub fn take(&self) -> bool {
        self.inner.raised.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
    }

    /// Resolves after the next `raise`, or immediately if a wake-up is pending.
    pub async fn notified(&self) {
        self.inner.wake.notified().await;
    }

    /// Forward SIGCHLD into this flag for the lifetime of the runtime.
    pub fn listen(&self) -> std::io::Result<JoinHandle<()>> {
        let mut children = signal(SignalKind::child())?;
        let flag = self.clone();
        Ok(tokio::spawn(async move {
            while children.recv().await.is_some() {
                flag.raise();
            }
        }))
    }
}
