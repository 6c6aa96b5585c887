use std::{
    io,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, OnceLock,
    },
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{error::Throwable, internal, object::ObjectRef};

pub const NORMAL_PRIORITY: i32 = 5;

/// The runtime's view of a thread: a name, a native handle and, once bootstrap has made one,
/// the managed `java/lang/Thread` object that mirrors it.
#[derive(Debug)]
pub struct JavaThread {
    name: String,
    native_handle: i64,
    peer: OnceLock<ObjectRef>,
}

impl JavaThread {
    pub fn new(name: impl Into<String>) -> Self {
        static NEXT_HANDLE: AtomicI64 = AtomicI64::new(1);

        Self {
            name: name.into(),
            native_handle: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            peer: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A process-unique number handed out when the control block is made.
    ///
    /// It is not an OS thread id. Bootstrap stores it in the peer's `eetop` field so the
    /// managed thread has a non-zero handle, and nothing maps it back to a native thread.
    pub fn native_handle(&self) -> i64 {
        self.native_handle
    }

    pub fn peer(&self) -> Option<&ObjectRef> {
        self.peer.get()
    }

    pub fn attach_peer(&self, peer: ObjectRef) -> Result<(), Throwable> {
        self.peer
            .set(peer)
            .map_err(|_| internal!("thread {} already has a peer", self.name))
    }
}

/// Counts the threads launched through it that are still running.
pub struct Threads {
    running: Mutex<usize>,
}

struct RunningGuard(Arc<Threads>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        *self.0.running.lock() -= 1;
    }
}

impl Threads {
    pub fn new() -> Self {
        Self {
            running: Mutex::new(0),
        }
    }

    /// Spawns a named native thread. It counts as running until `body` returns or unwinds.
    pub fn launch<F, T>(self: &Arc<Self>, name: impl Into<String>, body: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        *self.running.lock() += 1;
        let guard = RunningGuard(Arc::clone(self));

        debug!("Launching thread {}", name);
        thread::Builder::new().name(name).spawn(move || {
            let _guard = guard;
            body()
        })
    }

    pub fn running_count(&self) -> usize {
        *self.running.lock()
    }

    /// Blocks until every launched thread has finished.
    pub fn wait_for_all(&self) {
        while self.running_count() > 0 {
            thread::yield_now();
        }
    }
}
