use tokio::process::{Child, Command};

/// Put the child in its own process group so signals reach the whole tree.
pub(crate) fn isolate_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        command.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Ask the child (and its process group) to exit.
#[cfg(unix)]
pub(crate) fn request_terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGTERM) {
        tracing::debug!(pgid, error = %err, "SIGTERM to process group failed");
    }
}

#[cfg(not(unix))]
pub(crate) fn request_terminate(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        tracing::debug!(error = %err, "terminate request failed");
    }
}

/// Kill the child (and its process group) and reap it.
pub(crate) async fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    if let Err(err) = child.kill().await {
        tracing::debug!(error = %err, "kill failed; process may already be gone");
    }
}
