use super::types::{OutputStream, ProcessState};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Notifications published by the command supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessEvent {
    StateChanged {
        state: ProcessState,
    },
    Started {
        run_id: u64,
        pid: Option<u32>,
        command: String,
    },
    Output {
        run_id: Option<u64>,
        stream: OutputStream,
        line: String,
    },
    Exited {
        run_id: u64,
        code: i32,
        forced: bool,
    },
    Error {
        run_id: Option<u64>,
        message: String,
    },
}

pub type EventSender = broadcast::Sender<ProcessEvent>;
pub type EventReceiver = broadcast::Receiver<ProcessEvent>;

/// Create a broadcast event bus with the given capacity.
pub fn event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}
