use std::future::Future;

use tokio_util::task::TaskTracker;

/// Registry of supervised background tasks.
///
/// The post-response notification pipelines run here so their failures never
/// reach an already-acknowledged caller. The process must drain the registry
/// before exit, otherwise in-flight notifications are dropped on shutdown.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn a supervised task. The future must log its own failures;
    /// nothing is propagated to the spawner.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(fut);
    }

    /// Stop accepting new tasks and wait for in-flight ones to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
