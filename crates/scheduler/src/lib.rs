//! `rivet-scheduler` provides the small thread pool the CLI uses to
//! open and map every input file concurrently before the linking
//! pipeline (which is strictly single-threaded) starts.
//!
//! The moving parts: a [`ThreadPool`] owns _n_ [`Worker`]s, each of
//! which owns a thread running its own asynchronous executor. Jobs
//! travel from the pool to the workers over one unbounded
//! multi-producer multi-consumer channel; whichever worker is idle
//! receives the next job and spawns it detached. There is no work
//! stealing and no fairness guarantee — the pool is tailored to "run a
//! handful of independent I/O jobs and collect the results", nothing
//! more.

use std::{
    cmp,
    future::Future,
    io,
    num::NonZeroUsize,
    pin::Pin,
    thread::{self, JoinHandle},
};

use async_channel::{unbounded, Receiver, SendError, Sender};
use async_executor::Executor;
use futures_lite::future::block_on;

/// Type alias for a job, i.e. what a [`Worker`] will execute.
pub type Job<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A pool of threads executing `Future`s.
pub struct ThreadPool<T> {
    _workers: Vec<Worker>,
    sender: Sender<Job<T>>,
}

impl<T> ThreadPool<T>
where
    T: Send + 'static,
{
    /// Create a pool of at most `desired_pool_size` threads.
    ///
    /// Threads are created eagerly; they are ready when the
    /// constructor returns. The size is clamped between 1 and
    /// [`std::thread::available_parallelism`] — the host environment
    /// (VMs, container orchestrators) decides how much parallelism a
    /// process gets, and asking for more buys nothing.
    pub fn new(desired_pool_size: NonZeroUsize) -> Result<Self, io::Error> {
        let pool_size = cmp::min(desired_pool_size, thread::available_parallelism()?).get();

        let (sender, receiver) = unbounded::<Job<T>>();

        let mut workers = Vec::with_capacity(pool_size);
        for nth in 0..pool_size {
            workers.push(Worker::new(nth, receiver.clone())?);
        }

        Ok(Self { _workers: workers, sender })
    }

    /// Send a `Future` to whichever worker is free to take it.
    pub fn execute<F>(&self, work: F) -> Result<(), SendError<Job<T>>>
    where
        F: Future<Output = T> + Send + 'static,
    {
        block_on(self.sender.send(Box::pin(work)))
    }
}

/// A worker owns one thread and executes the jobs it receives.
struct Worker {
    _thread_handle: JoinHandle<()>,
}

impl Worker {
    fn new<T>(worker_id: usize, receiver: Receiver<Job<T>>) -> Result<Self, io::Error>
    where
        T: Send + 'static,
    {
        let thread_handle = thread::Builder::new()
            .name(format!("{prefix}-worker-{worker_id}", prefix = env!("CARGO_PKG_NAME")))
            .spawn(move || {
                let executor = Executor::new();

                block_on(executor.run(async {
                    while let Ok(received_future) = receiver.recv().await {
                        executor.spawn(received_future).detach();
                    }
                }))
            })?;

        Ok(Self { _thread_handle: thread_handle })
    }
}
