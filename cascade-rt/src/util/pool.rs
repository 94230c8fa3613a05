//! A bounded pool for concurrent I/O tasks.

// Layer 1: Standard library imports
use std::future::Future;
use std::io;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

// Layer 3: Internal module imports
// (none)

/// All task failures collected by a pool run.
#[derive(Error, Debug)]
#[error("{} errors were raised: {}", errors.len(), format_errors(errors))]
pub struct PoolError {
    pub errors: Vec<io::Error>,
}

fn format_errors(errors: &[io::Error]) -> String {
    errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A task pool that runs at most `max_workers` I/O tasks concurrently.
///
/// `submit` suspends once the pool is saturated and resumes when a worker
/// slot frees up, so producers cannot outrun the writers.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() {
/// use cascade_rt::util::BoundedTaskPool;
///
/// let mut pool = BoundedTaskPool::new(5);
/// pool.submit(async { tokio::fs::write("/tmp/artifact", b"data").await }).await;
/// pool.join().await.unwrap();
/// # }
/// ```
pub struct BoundedTaskPool {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<Result<(), io::Error>>,
}

impl BoundedTaskPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            tasks: JoinSet::new(),
        }
    }

    /// Number of submitted tasks that have not been reaped yet.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn a task, waiting for a free worker slot first.
    pub async fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), io::Error>> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            // the semaphore is never closed while the pool is alive
            return;
        };
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
    }

    /// Await every outstanding task; failures are aggregated.
    pub async fn join(&mut self) -> Result<(), PoolError> {
        let mut errors = Vec::new();
        while let Some(outcome) = self.tasks.join_next().await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => errors.push(error),
                Err(join_error) => errors.push(io::Error::other(join_error)),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PoolError { errors })
        }
    }
}
