//! Worker thread management and CPU affinity
//!
//! Named worker threads, optionally pinned to a CPU core, joined automatically
//! when dropped.

use crate::pool::{PoolError, PoolResult};
use core_affinity::CoreId;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Managed thread wrapper for pool workers
///
/// Joins the underlying thread when dropped.
#[derive(Debug)]
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    /// Get the thread name
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Join the thread, waiting for it to complete
    ///
    /// If the thread has already been joined, this is a no-op.
    pub fn join(mut self) -> thread::Result<()> {
        self.join_inner()
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn join_inner(&mut self) -> thread::Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if self.join_inner().is_err() {
            warn!(thread = %self.thread_name, "worker thread panicked");
        }
    }
}

/// Thread builder with CPU affinity and naming support
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    affinity: Option<CoreId>,
    name: Option<String>,
}

impl ThreadBuilder {
    /// Create a new thread builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set CPU core affinity
    ///
    /// # Errors
    /// Returns `PoolError::InvalidCore` if the core is not available on this system
    pub fn pin_at_core(mut self, core_id: usize) -> PoolResult<Self> {
        validate_core_id(core_id)?;
        self.affinity = Some(CoreId { id: core_id });
        Ok(self)
    }

    /// Set thread name
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Spawn a thread with the configured settings
    ///
    /// # Errors
    /// Returns `PoolError::Spawn` if the OS refuses to create the thread
    pub fn spawn<F>(self, f: F) -> PoolResult<ManagedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = self.name.unwrap_or_else(|| "workring-thread".to_string());
        let affinity = self.affinity;

        let name_for_closure = thread_name.clone();
        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                set_affinity_if_defined(affinity, &name_for_closure);
                f();
            })
            .map_err(PoolError::Spawn)?;

        Ok(ManagedThread::new(join_handle, thread_name))
    }
}

/// Validate that a CPU core ID is available on the system
pub(crate) fn validate_core_id(core_id: usize) -> PoolResult<()> {
    let available = get_available_cores();
    if available.contains(&core_id) {
        Ok(())
    } else {
        Err(PoolError::InvalidCore {
            core: core_id,
            available,
        })
    }
}

fn set_affinity_if_defined(affinity: Option<CoreId>, thread_name: &str) {
    if let Some(core_id) = affinity {
        if core_affinity::set_for_current(core_id) {
            debug!(thread = thread_name, core = core_id.id, "pinned thread to CPU core");
        } else {
            warn!(thread = thread_name, core = core_id.id, "could not pin thread to CPU core");
        }
    }
}

/// Get available CPU core IDs
pub fn get_available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .iter()
        .map(|core| core.id)
        .collect()
}
