pub mod events;
mod signal;
pub mod supervisor;
pub mod types;

pub use events::{EventReceiver, EventSender, ProcessEvent, event_bus};
pub use supervisor::CommandSupervisor;
pub use types::{
    OutputLine, OutputStream, ProcessRun, ProcessState, SupervisorOptions, TERMINATED_EXIT_CODE,
};
