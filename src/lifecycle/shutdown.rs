//! Process-wide stop flag.
//!
//! One `Shutdown` owns the flag; every server or task that must stop takes a
//! `ShutdownListener`. The flag is sticky: a listener created after the
//! trigger resolves immediately.

use tokio::sync::watch;

/// Owner of the stop flag.
#[derive(Clone)]
pub struct Shutdown {
    flag: watch::Sender<bool>,
}

/// Waiting side of a [`Shutdown`].
pub struct ShutdownListener {
    flag: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            flag: self.flag.subscribe(),
        }
    }

    /// Raise the flag. Repeated calls are no-ops.
    pub fn trigger(&self) {
        self.flag.send_if_modified(|stopped| !std::mem::replace(stopped, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.flag.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolves once the flag is raised or every `Shutdown` handle is dropped.
    pub async fn wait(mut self) {
        let _ = self.flag.wait_for(|stopped| *stopped).await;
    }
}
