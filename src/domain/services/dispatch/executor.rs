//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Key Methods       |
// |--------------------|---------------------------------------------------|-------------------|
// | TaskExecutor       | Accepts fire-and-forget tasks                     | submit            |
// | ThreadPoolExecutor | N worker threads draining an unbounded queue      | new, shutdown     |
// | TokioExecutor      | spawn_blocking on a runtime handle                | new, current      |
// | InlineExecutor     | Runs on the caller, records failures              | errors            |
//--------------------------------------------------------------------------------------------------

use std::fmt;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use super::{DispatchError, DispatchResult};

/// A unit of asynchronous delivery work.
pub type Task = Box<dyn FnOnce() -> DispatchResult<()> + Send + 'static>;

/// Runs tasks somewhere other than the caller's stack, without reporting back.
///
/// A failing task is never returned to whoever submitted it. Executors log the
/// failure at error level instead.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: Task);
}

fn report(error: &DispatchError) {
    error!(error = %error, "Asynchronous delivery failed");
}

/// Fixed pool of worker threads fed by an unbounded queue.
///
/// There is no backpressure and no cancellation. Dropping the executor closes the
/// queue and joins the workers once they have drained it.
pub struct ThreadPoolExecutor {
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl ThreadPoolExecutor {
    /// Starts `size` workers. A size of zero is raised to one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = unbounded::<Task>();
        let workers = (0..size)
            .map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("grid-dispatch-{index}"))
                    .spawn(move || run_worker(index, receiver))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(err) => {
                    error!(error = %err, "Failed to spawn dispatch worker");
                    None
                }
            })
            .collect::<Vec<_>>();
        info!(workers = workers.len(), "Started dispatch thread pool");
        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Closes the queue and waits for the workers to finish what is queued.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);
        for worker in self.workers.lock().drain(..) {
            if worker.join().is_err() {
                error!("Dispatch worker panicked");
            }
        }
        info!("Dispatch thread pool stopped");
    }
}

fn run_worker(index: usize, receiver: Receiver<Task>) {
    debug!(worker = index, "Dispatch worker started");
    while let Ok(task) = receiver.recv() {
        if let Err(err) = task() {
            report(&err);
        }
    }
    debug!(worker = index, "Dispatch worker stopped");
}

impl TaskExecutor for ThreadPoolExecutor {
    fn submit(&self, task: Task) {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(task).is_err() {
                    error!("Dispatch queue closed, task dropped");
                }
            }
            None => error!("Dispatch thread pool is shut down, task dropped"),
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolExecutor").field("size", &self.size).finish()
    }
}

/// Submits tasks to a tokio runtime as blocking work, since callbacks are
/// ordinary synchronous functions.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl TaskExecutor for TokioExecutor {
    fn submit(&self, task: Task) {
        self.handle.spawn_blocking(move || {
            if let Err(err) = task() {
                report(&err);
            }
        });
    }
}

/// Runs each task on the submitting thread and keeps every error.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    errors: Mutex<Vec<DispatchError>>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors raised by the tasks run so far.
    pub fn errors(&self) -> Vec<DispatchError> {
        self.errors.lock().clone()
    }
}

impl TaskExecutor for InlineExecutor {
    fn submit(&self, task: Task) {
        if let Err(err) = task() {
            report(&err);
            self.errors.lock().push(err);
        }
    }
}
