use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use crate::error::{HookError, HookResult};

/// Blocking unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Asynchronous unit of work.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Executes network and decode work away from the UI-owning thread.
pub trait BackgroundPool: Send + Sync {
    /// Runs a blocking job. Never blocks the caller.
    fn submit(&self, job: Job) -> HookResult<()>;

    /// Runs an asynchronous task.
    fn spawn(&self, task: Task) -> HookResult<()>;
}

/// Posts work to the single thread allowed to mutate views.
pub trait UiDispatcher: Send + Sync {
    fn post(&self, job: Job) -> HookResult<()>;
}

/// Background pool on a tokio runtime, bounded to `max_concurrent` jobs at a time.
#[derive(Clone)]
pub struct TokioPool {
    handle: Handle,
    permits: Arc<Semaphore>,
}

impl TokioPool {
    pub fn new(handle: Handle, max_concurrent: usize) -> Self {
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Pool on the runtime the caller is running in.
    pub fn current(max_concurrent: usize) -> HookResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| HookError::dispatch(format!("no tokio runtime available: {}", e)))?;
        Ok(Self::new(handle, max_concurrent))
    }

    /// Jobs submitted afterwards are refused; queued jobs are dropped without running.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.permits.is_closed()
    }

    fn ensure_open(&self) -> HookResult<()> {
        if self.is_shutdown() {
            return Err(HookError::dispatch("background pool is shut down"));
        }
        Ok(())
    }
}

impl BackgroundPool for TokioPool {
    fn submit(&self, job: Job) -> HookResult<()> {
        self.ensure_open()?;
        let permits = self.permits.clone();
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                log::error!("Background job failed: {}", e);
            }
        });
        Ok(())
    }

    fn spawn(&self, task: Task) -> HookResult<()> {
        self.ensure_open()?;
        let permits = self.permits.clone();
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        });
        Ok(())
    }
}

/// Dispatcher side of the UI queue. Cloneable, usable from any thread.
#[derive(Clone)]
pub struct UiThread {
    sender: mpsc::UnboundedSender<Job>,
}

/// Consumer side of the UI queue, owned by the UI thread.
pub struct UiLoop {
    receiver: mpsc::UnboundedReceiver<Job>,
}

pub fn ui_channel() -> (UiThread, UiLoop) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (UiThread { sender }, UiLoop { receiver })
}

impl UiDispatcher for UiThread {
    fn post(&self, job: Job) -> HookResult<()> {
        self.sender.send(job)
            .map_err(|_| HookError::dispatch("UI loop is gone"))
    }
}

impl UiLoop {
    /// Runs jobs in posting order until every [`UiThread`] is dropped.
    /// Blocks the calling thread; must not be called from async code.
    pub fn run(mut self) {
        while let Some(job) = self.receiver.blocking_recv() {
            job();
        }
    }

    /// Runs the jobs already queued and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one job and runs it.
    pub async fn run_next_timeout(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(job)) => {
                job();
                true
            }
            _ => false,
        }
    }
}
