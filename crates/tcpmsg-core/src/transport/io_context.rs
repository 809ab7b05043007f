//! The I/O context: one background thread driving one tokio runtime.
//!
//! # Why a dedicated thread? (for beginners)
//!
//! The engines expose a plain synchronous API: the application calls
//! `connect`, `send`, `update` from its own thread whenever it likes.  All
//! the actual socket work happens asynchronously on a single background
//! thread that owns a *current-thread* tokio runtime.  Because every read,
//! write, connect, and close for every connection of an engine runs on that
//! one thread, no two operations ever race on the same socket handle.
//!
//! Other threads never touch sockets directly.  They either:
//!
//! - **post** work with [`IoContext::post`] (fire and forget), or
//! - **run** work with [`IoContext::run`], which posts a future and blocks the
//!   calling thread until its result comes back over a std channel.
//!
//! Stopping the context drops the runtime, which cancels every outstanding
//! task and closes every socket those tasks own.

use std::future::Future;
use std::sync::mpsc;
use std::thread;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::transport::error::NetError;

/// A running I/O runtime and the thread that drives it.
pub struct IoContext {
    name: String,
    handle: Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl IoContext {
    /// Builds the runtime and spawns the thread that drives it until
    /// [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Runtime`] if the runtime or the thread cannot be
    /// created.
    pub fn start(name: &str) -> Result<Self, NetError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(NetError::Runtime)?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(async {
                    // Either an explicit stop or the sender being dropped ends the loop.
                    let _ = shutdown_rx.await;
                });
                drop(runtime);
            })
            .map_err(NetError::Runtime)?;

        debug!("I/O context '{name}' started");
        Ok(Self {
            name: name.to_string(),
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Handle used to spawn tasks onto this context from any thread.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns `true` until [`stop`](Self::stop) has been called.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Schedules `work` on the I/O thread without waiting for it.
    ///
    /// Work posted after the context stopped is dropped unexecuted.
    pub fn post<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(work);
    }

    /// Schedules `work` on the I/O thread and blocks until it completes.
    ///
    /// Must not be called from the I/O thread itself, which would wait on
    /// its own result forever.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::RuntimeStopped`] if the context shut down before
    /// `work` produced a value.
    pub fn run<F>(&self, work: F) -> Result<F::Output, NetError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.handle.spawn(async move {
            let _ = tx.send(work.await);
        });
        rx.recv().map_err(|_| NetError::RuntimeStopped)
    }

    /// Stops the runtime and joins the I/O thread.  Idempotent.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("I/O context '{}' thread panicked", self.name);
            } else {
                debug!("I/O context '{}' stopped", self.name);
            }
        }
    }
}

impl Drop for IoContext {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
