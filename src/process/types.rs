use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exit code reported when a run was force-killed or ended by a signal.
pub const TERMINATED_EXIT_CODE: i32 = -1;

/// Supervisor lifecycle: `Idle → Starting → Running → (Stopping | Exited) → Idle`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Localized status lines emitted by the supervisor itself.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// One execution of a command. Becomes immutable history once finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRun {
    pub id: u64,
    pub command: String,
    pub pid: Option<u32>,
    pub running: bool,
    /// stdout/stderr lines in arrival order.
    pub lines: Vec<String>,
    pub exit_code: Option<i32>,
    pub forced: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessRun {
    pub(crate) fn started(id: u64, command: String, pid: Option<u32>) -> Self {
        Self {
            id,
            command,
            pid,
            running: true,
            lines: Vec::new(),
            exit_code: None,
            forced: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Timing knobs for the supervisor worker.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// How long a stopped process gets to exit before it is killed.
    pub grace_period: Duration,
    /// How long to wait for output readers after the process exits.
    pub drain_timeout: Duration,
    pub event_capacity: usize,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(3),
            drain_timeout: Duration::from_secs(2),
            event_capacity: 1_024,
        }
    }
}

impl From<&crate::config::ProcessConfig> for SupervisorOptions {
    fn from(config: &crate::config::ProcessConfig) -> Self {
        Self {
            grace_period: Duration::from_millis(config.stop_grace_ms),
            drain_timeout: Duration::from_millis(config.output_drain_ms),
            event_capacity: config.event_capacity.max(1),
        }
    }
}
