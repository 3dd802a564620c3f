// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-platform child termination for the cancellation path.
//!
//! POSIX sends SIGTERM, gives the child a short grace period, then SIGKILL
//! if it is still alive. Windows has no portable "ask nicely" signal, so
//! termination there is immediate.

use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL on POSIX. Windows termination
/// has no grace period (see SPEC_FULL.md's resolved Open Question).
const POSIX_GRACE: Duration = Duration::from_secs(2);

/// Ask a child to terminate and wait (bounded) for it to actually exit.
pub(crate) async fn terminate(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        terminate_unix(child).await;
    }
    #[cfg(windows)]
    {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(unix)]
async fn terminate_unix(child: &mut tokio::process::Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(raw_pid) = child.id() else {
        // Already reaped.
        return;
    };
    let pid = Pid::from_raw(raw_pid as i32);

    if signal::kill(pid, Signal::SIGTERM).is_err() {
        // Process already gone; nothing left to do.
        return;
    }

    tokio::select! {
        _ = child.wait() => {}
        _ = tokio::time::sleep(POSIX_GRACE) => {
            let _ = signal::kill(pid, Signal::SIGKILL);
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
#[path = "termination_tests.rs"]
mod tests;
