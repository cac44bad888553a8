//! Worker threads for asynchronous asset loads

use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};

use super::AssetError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of loader threads fed from one job channel
pub struct LoaderPool {
    workers: Vec<thread::JoinHandle<()>>,
    sender: Option<Sender<Job>>,
}

impl LoaderPool {
    /// Spawn `size` worker threads
    pub fn new(size: usize) -> Result<Self, AssetError> {
        let (sender, receiver) = unbounded::<Job>();
        let workers = (0..size)
            .map(|id| spawn_worker(id, receiver.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Started {} asset loader threads", size);
        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job for the next free worker
    pub fn execute<F>(&self, f: F) -> Result<(), AssetError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(AssetError::ShutDown)?;
        sender.send(Box::new(f)).map_err(|_| AssetError::ShutDown)
    }

    /// Stop accepting jobs. Workers finish the job they are running and
    /// exit once the queue is drained; they are not joined.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_some() {
            debug!("Asset loader pool shutting down ({} workers)", self.workers.len());
        }
        self.workers.clear();
    }
}

impl Drop for LoaderPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(id: usize, receiver: Receiver<Job>) -> Result<thread::JoinHandle<()>, AssetError> {
    let handle = thread::Builder::new()
        .name(format!("asset-loader-{id}"))
        .spawn(move || {
            while let Ok(job) = receiver.recv() {
                trace!("asset-loader-{} picked up a job", id);
                job();
            }
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_jobs_run_on_workers() {
        let pool = LoaderPool::new(2).unwrap();
        let (tx, rx) = unbounded();
        for i in 0..4 {
            let tx = tx.clone();
            pool.execute(move || tx.send(i).unwrap()).unwrap();
        }

        let mut results: Vec<i32> = (0..4).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_execute_after_shutdown_fails() {
        let mut pool = LoaderPool::new(1).unwrap();
        pool.shutdown();
        assert!(matches!(pool.execute(|| {}), Err(AssetError::ShutDown)));
    }
}
