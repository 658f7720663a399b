#![forbid(unsafe_code)]

//! Schedulers: "run this callback on execution context X".
//!
//! The runtime owns no event loop. Notifications are handed to an injected
//! [`Scheduler`], which either runs them inline ([`ImmediateScheduler`]) or
//! marshals them onto a target context ([`ContextScheduler`]).
//!
//! # Context scheduling
//!
//! A context is a thread that drains a task queue. The host either pumps it
//! from its own loop:
//!
//! ```ignore
//! let (scheduler, pump) = ContextScheduler::for_current_thread("gui");
//! // hand `scheduler` to providers and buses, then each frame:
//! pump.run_pending();
//! ```
//!
//! or lets a [`ContextThread`] own a dedicated thread that pumps until shut
//! down.
//!
//! # Invariants
//!
//! 1. A task scheduled from the context thread itself runs synchronously.
//! 2. A task scheduled from any other thread runs on the context thread, in
//!    submission order relative to other tasks from that thread.
//! 3. Once the pump is dropped (or the context thread stopped), `schedule`
//!    returns [`SchedulerUnavailable`] instead of queuing.
//!
//! # Failure Modes
//!
//! - Task panics inside a pump: caught and logged at `error`; the context keeps
//!   running.
//! - Tasks queued after a stop request but before the pump observed it are
//!   discarded with the queue.

use std::io;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::{SchedulerUnavailable, panic_detail};

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Shared, dynamically-dispatched scheduler handle.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// Marshals callbacks onto an execution context.
pub trait Scheduler: Send + Sync {
    /// Run `task` on this scheduler's context. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// [`SchedulerUnavailable`] if the target context has shut down. Callers
    /// drop the notification; they never propagate this to publishers.
    fn schedule(&self, task: Task) -> Result<(), SchedulerUnavailable>;

    /// Context name, for logs.
    fn name(&self) -> &str;
}

/// Runs every task synchronously on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    #[must_use]
    pub fn shared() -> SharedScheduler {
        Arc::new(Self)
    }
}

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) -> Result<(), SchedulerUnavailable> {
        task();
        Ok(())
    }

    fn name(&self) -> &str {
        "immediate"
    }
}

enum Job {
    Run(Task),
    Stop,
}

/// Context-affine scheduler bound to one thread.
///
/// Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct ContextScheduler {
    name: Arc<str>,
    thread: ThreadId,
    tx: mpsc::Sender<Job>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for ContextScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextScheduler")
            .field("name", &self.name)
            .field("thread", &self.thread)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ContextScheduler {
    /// Bind a new context to the calling thread.
    ///
    /// The returned pump must stay on this thread; the host drains it.
    #[must_use]
    pub fn for_current_thread(name: impl Into<Arc<str>>) -> (Self, ContextPump) {
        let name = name.into();
        let (tx, rx) = mpsc::channel();
        let open = Arc::new(AtomicBool::new(true));
        tracing::debug!(context = %name, "context opened");
        let scheduler = Self {
            name: Arc::clone(&name),
            thread: thread::current().id(),
            tx,
            open: Arc::clone(&open),
        };
        let pump = ContextPump {
            name,
            rx,
            open,
            _thread_bound: PhantomData,
        };
        (scheduler, pump)
    }

    /// Whether the calling thread is this scheduler's context.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Whether the context still accepts work.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn shared(&self) -> SharedScheduler {
        Arc::new(self.clone())
    }

    fn unavailable(&self) -> SchedulerUnavailable {
        SchedulerUnavailable::new(Arc::clone(&self.name))
    }
}

impl Scheduler for ContextScheduler {
    fn schedule(&self, task: Task) -> Result<(), SchedulerUnavailable> {
        if !self.is_open() {
            return Err(self.unavailable());
        }
        if self.is_current() {
            task();
            return Ok(());
        }
        self.tx
            .send(Job::Run(task))
            .map_err(|_| self.unavailable())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Receiving end of a context queue. Not `Send`: it drains on the thread
/// that created it.
///
/// Dropping the pump closes the context.
pub struct ContextPump {
    name: Arc<str>,
    rx: mpsc::Receiver<Job>,
    open: Arc<AtomicBool>,
    _thread_bound: PhantomData<Rc<()>>,
}

impl std::fmt::Debug for ContextPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPump")
            .field("name", &self.name)
            .field("open", &self.open.load(Ordering::Acquire))
            .finish()
    }
}

impl ContextPump {
    /// Run every task currently queued, without blocking.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            match job {
                Job::Run(task) => {
                    self.run(task);
                    ran += 1;
                }
                Job::Stop => {
                    self.close();
                    break;
                }
            }
        }
        ran
    }

    /// Block running tasks until a stop request arrives or every scheduler
    /// handle is gone.
    pub fn run_until_stopped(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.recv() {
            match job {
                Job::Run(task) => {
                    self.run(task);
                    ran += 1;
                }
                Job::Stop => {
                    self.close();
                    break;
                }
            }
        }
        ran
    }

    /// Run tasks as they arrive for at most `timeout`.
    pub fn run_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(Job::Run(task)) => {
                    self.run(task);
                    ran += 1;
                }
                Ok(Job::Stop) => {
                    self.close();
                    break;
                }
                Err(_) => break,
            }
        }
        ran
    }

    fn run(&self, task: Task) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!(
                context = %self.name,
                panic = %panic_detail(payload.as_ref()),
                "scheduled task panicked"
            );
        }
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(context = %self.name, "context closed");
        }
    }
}

impl Drop for ContextPump {
    fn drop(&mut self) {
        self.close();
    }
}

/// A dedicated thread running a context pump.
///
/// Dropping the handle stops the thread and joins it.
pub struct ContextThread {
    scheduler: ContextScheduler,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ContextThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextThread")
            .field("scheduler", &self.scheduler)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl ContextThread {
    /// Spawn a thread named `name` and bind a context to it.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread, or the thread exits before
    /// its context is ready.
    pub fn spawn(name: impl Into<Arc<str>>) -> io::Result<Self> {
        let name = name.into();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let context_name = Arc::clone(&name);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let (scheduler, pump) = ContextScheduler::for_current_thread(context_name);
                if ready_tx.send(scheduler).is_err() {
                    return;
                }
                let ran = pump.run_until_stopped();
                tracing::debug!(context = %pump.name, tasks = ran, "context thread exiting");
            })?;
        let scheduler = ready_rx
            .recv()
            .map_err(|_| io::Error::other(format!("context thread `{name}` exited early")))?;
        Ok(Self {
            scheduler,
            handle: Some(handle),
        })
    }

    /// A handle to this thread's context.
    #[must_use]
    pub fn scheduler(&self) -> ContextScheduler {
        self.scheduler.clone()
    }

    #[must_use]
    pub fn shared(&self) -> SharedScheduler {
        self.scheduler.shared()
    }

    /// Stop the context after already-queued tasks, then join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.scheduler.tx.send(Job::Stop).is_err() {
            tracing::debug!(context = %self.scheduler.name, "context already gone");
        }
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!(context = %self.scheduler.name, "context thread panicked");
        }
    }
}

impl Drop for ContextThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn immediate_runs_inline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        ImmediateScheduler
            .schedule(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn context_runs_inline_on_own_thread() {
        let (scheduler, _pump) = ContextScheduler::for_current_thread("local");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        scheduler
            .schedule(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1, "same-thread task runs synchronously");
    }

    #[test]
    fn context_queues_from_other_threads() {
        let (scheduler, pump) = ContextScheduler::for_current_thread("local");
        let order = Arc::new(Mutex::new(Vec::new()));
        let worker = {
            let scheduler = scheduler.clone();
            let order = Arc::clone(&order);
            thread::spawn(move || {
                for i in 0..3 {
                    let order = Arc::clone(&order);
                    scheduler
                        .schedule(Box::new(move || order.lock().unwrap().push(i)))
                        .unwrap();
                }
            })
        };
        worker.join().unwrap();
        assert!(order.lock().unwrap().is_empty(), "nothing runs until pumped");
        assert_eq!(pump.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn dropped_pump_makes_scheduler_unavailable() {
        let (scheduler, pump) = ContextScheduler::for_current_thread("gone");
        drop(pump);
        assert!(!scheduler.is_open());
        let err = scheduler.schedule(Box::new(|| {})).unwrap_err();
        assert_eq!(err.context(), "gone");
    }

    #[test]
    fn pump_survives_panicking_task() {
        let (scheduler, pump) = ContextScheduler::for_current_thread("local");
        let hits = Arc::new(AtomicUsize::new(0));
        let remote = scheduler.clone();
        let h = Arc::clone(&hits);
        thread::spawn(move || {
            remote.schedule(Box::new(|| panic!("bad task"))).unwrap();
            remote
                .schedule(Box::new(move || {
                    h.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(pump.run_pending(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_open());
    }

    #[test]
    fn context_thread_runs_tasks_off_caller_thread() {
        let context = ContextThread::spawn("worker-ctx").unwrap();
        let scheduler = context.scheduler();
        let (tx, rx) = mpsc::channel();
        scheduler
            .schedule(Box::new(move || {
                let name = thread::current().name().map(str::to_owned);
                tx.send(name).unwrap();
            }))
            .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("worker-ctx"));
        assert!(!scheduler.is_current());
        context.shutdown();
    }

    #[test]
    fn shutdown_context_rejects_work() {
        let context = ContextThread::spawn("short-lived").unwrap();
        let scheduler = context.scheduler();
        context.shutdown();
        assert!(!scheduler.is_open());
        assert!(scheduler.schedule(Box::new(|| {})).is_err());
    }

    #[test]
    fn run_for_returns_after_timeout() {
        let (_scheduler, pump) = ContextScheduler::for_current_thread("idle");
        let started = Instant::now();
        assert_eq!(pump.run_for(Duration::from_millis(20)), 0);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
