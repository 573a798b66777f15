//! Real-time setup for the hub loop thread.
//!
//! With the `rt` feature the loop thread locks all memory pages and switches
//! itself to `SCHED_FIFO`. Without it both steps are no-ops, which is what
//! tests and simulation runs use.

use thiserror::Error;

/// Default `SCHED_FIFO` priority of the loop thread.
pub const DEFAULT_RT_PRIORITY: i32 = 80;

/// Real-time setup failure. The loop keeps running without RT guarantees.
#[derive(Debug, Error)]
pub enum RtError {
    /// A setup syscall failed.
    #[error("RT setup error: {0}")]
    Setup(String),
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), RtError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| RtError::Setup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), RtError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), RtError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param for the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(RtError::Setup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), RtError> {
    Ok(())
}

/// Lock memory and raise the calling thread to `SCHED_FIFO` at `priority`.
pub fn rt_setup(priority: i32) -> Result<(), RtError> {
    rt_mlockall()?;
    rt_set_scheduler(priority)
}

/// Detect if the calling thread runs under a real-time scheduling policy.
pub fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: querying the calling thread's policy has no preconditions.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
