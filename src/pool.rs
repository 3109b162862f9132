//! A small fixed-size worker pool draining one shared FIFO queue.
//!
//! Tasks are boxed closures consumed exactly once by whichever worker
//! dequeues them; submitting returns a [`TaskHandle`] that later yields the
//! task's result.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    signal: Condvar,
}

struct Worker {
    exit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Handle to one submitted task.
pub struct TaskHandle<T> {
    result: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the task completes and take its result.
    ///
    /// Returns `None` when the task was discarded by a hard stop before a
    /// worker picked it up.
    pub fn wait(self) -> Option<T> {
        self.result.recv().ok()
    }
}

/// A bounded set of long-lived threads executing submitted closures in FIFO
/// order.
///
/// Dropping the pool performs a graceful stop: every queued task still runs
/// before the workers are joined.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
    stopped: bool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                draining: false,
            }),
            signal: Condvar::new(),
        });
        let mut pool = Self {
            shared,
            workers: Vec::new(),
            stopped: false,
        };
        pool.spawn_workers(workers);
        pool
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task and wake one idle worker. Never blocks.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            // The receiver may be gone when the caller stopped collecting.
            let _ = tx.send(task());
        });

        {
            let mut state = self.shared.state.lock().unwrap();
            state.jobs.push_back(job);
        }
        self.shared.signal.notify_one();

        TaskHandle { result: rx }
    }

    /// Change the worker count. Growing spawns idle workers; shrinking flags
    /// the excess workers to exit after their current task and detaches them.
    #[allow(dead_code)]
    pub fn resize(&mut self, workers: usize) {
        if self.stopped {
            return;
        }
        if workers > self.workers.len() {
            self.spawn_workers(workers - self.workers.len());
        } else {
            let excess = self.workers.split_off(workers);
            for worker in &excess {
                worker.exit.store(true, Ordering::Release);
            }
            self.shared.signal.notify_all();
            // Dropping the join handles detaches the flagged workers.
        }
    }

    /// Run every queued task to completion, then join all workers.
    pub fn shutdown(mut self) {
        self.stop(true);
    }

    /// Discard queued-but-unstarted tasks, let running tasks finish, then
    /// join all workers.
    #[allow(dead_code)]
    pub fn shutdown_now(mut self) {
        self.stop(false);
    }

    fn spawn_workers(&mut self, count: usize) {
        for _ in 0..count {
            let shared = Arc::clone(&self.shared);
            let exit = Arc::new(AtomicBool::new(false));
            let worker_exit = Arc::clone(&exit);
            let handle = std::thread::spawn(move || worker_loop(shared, worker_exit));
            self.workers.push(Worker {
                exit,
                handle: Some(handle),
            });
        }
    }

    fn stop(&mut self, drain: bool) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        {
            let mut state = self.shared.state.lock().unwrap();
            state.draining = true;
            if !drain {
                state.jobs.clear();
                for worker in &self.workers {
                    worker.exit.store(true, Ordering::Release);
                }
            }
        }
        self.shared.signal.notify_all();

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        self.workers.clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop(true);
    }
}

fn worker_loop(shared: Arc<Shared>, exit: Arc<AtomicBool>) {
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if exit.load(Ordering::Acquire) {
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                if state.draining {
                    return;
                }
                state = shared.signal.wait(state).unwrap();
            }
        };

        job();

        // A shrink or hard stop flagged this worker while it was busy.
        if exit.load(Ordering::Acquire) {
            return;
        }
    }
}
