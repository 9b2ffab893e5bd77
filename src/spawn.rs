use std::future::Future;
use tokio::task::JoinHandle;

/// Spawn a task onto the runtime, discarding its handle.
pub fn spawn<F>(f: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(f);
}

/// Spawn a task and keep a handle for aborting it later.
pub fn spawn_with_handle<F>(f: F) -> TaskHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    TaskHandle(tokio::spawn(f))
}

/// A handle to a spawned task.
pub struct TaskHandle<T>(JoinHandle<T>);

impl<T> TaskHandle<T> {
    pub fn abort(&mut self) {
        self.0.abort();
    }
}
