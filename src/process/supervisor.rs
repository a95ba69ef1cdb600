use super::events::{EventReceiver, EventSender, ProcessEvent, event_bus};
use super::signal;
use super::types::{
    OutputLine, OutputStream, ProcessRun, ProcessState, SupervisorOptions, TERMINATED_EXIT_CODE,
};
use crate::error::ProcessError;
use crate::i18n::Localizer;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

enum Control {
    Run { command: String, working_dir: PathBuf },
    Stop,
    Settle(oneshot::Sender<()>),
}

/// State shared between the handle, the worker and the output readers.
struct Shared {
    output: Mutex<Vec<OutputLine>>,
    /// Lines since the latest run started; what a payload reports.
    log: Mutex<Vec<String>>,
    last_run: Mutex<Option<ProcessRun>>,
    events: EventSender,
    localizer: Localizer,
}

impl Shared {
    fn push_line(&self, run_id: Option<u64>, stream: OutputStream, text: String) {
        if stream != OutputStream::System {
            let mut last = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(run) = last.as_mut().filter(|run| Some(run.id) == run_id) {
                run.lines.push(text.clone());
            }
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.clone());
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(OutputLine {
                stream,
                text: text.clone(),
            });
        let _ = self.events.send(ProcessEvent::Output {
            run_id,
            stream,
            line: text,
        });
    }

    fn reset_log(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn begin_run(&self, run: ProcessRun) {
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(run);
    }

    fn finish_run(&self, run_id: u64, code: i32, forced: bool) {
        let mut last = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = last.as_mut().filter(|run| run.id == run_id) {
            run.running = false;
            run.exit_code = Some(code);
            run.forced = forced;
            run.finished_at = Some(chrono::Utc::now());
        }
    }
}

/// Runs at most one shell command at a time on a background worker.
///
/// Control requests are queued and applied in order, so a second `run`
/// while a command is active stops the first run completely before the next
/// one starts. Output is appended to a buffer that persists across runs;
/// a separate log holds only the lines of the latest run.
#[derive(Clone)]
pub struct CommandSupervisor {
    shared: Arc<Shared>,
    control: mpsc::UnboundedSender<Control>,
    state: watch::Receiver<ProcessState>,
}

impl CommandSupervisor {
    /// Start the worker task. Must be called from within a tokio runtime.
    pub fn spawn(localizer: Localizer, options: SupervisorOptions) -> Self {
        let (events, _) = event_bus(options.event_capacity);
        let shared = Arc::new(Shared {
            output: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            last_run: Mutex::new(None),
            events,
            localizer,
        });
        let (control, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ProcessState::Idle);

        let worker = Worker {
            shared: Arc::clone(&shared),
            control_rx,
            state_tx,
            options,
            next_run_id: 1,
        };
        tokio::spawn(worker.run());

        Self {
            shared,
            control,
            state,
        }
    }

    /// Queue `command` to run in `working_dir`, replacing any active run.
    pub fn run(&self, command: &str, working_dir: &Path) -> Result<(), ProcessError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        self.control
            .send(Control::Run {
                command: command.to_string(),
                working_dir: working_dir.to_path_buf(),
            })
            .map_err(|_| ProcessError::SupervisorClosed)
    }

    /// Request termination of the active run. No-op when idle.
    pub fn stop(&self) {
        if self.control.send(Control::Stop).is_err() {
            tracing::debug!("stop requested after supervisor shut down");
        }
    }

    /// Wait until every control request queued so far has been applied.
    pub async fn settle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.control.send(Control::Settle(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Wait until the supervisor is idle, including natural process exit.
    pub async fn wait_idle(&self) {
        self.settle().await;
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == ProcessState::Idle).await;
    }

    /// Stop any active run and wait for the supervisor to become idle.
    pub async fn shutdown(&self) {
        self.stop();
        self.wait_idle().await;
    }

    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ProcessState> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            ProcessState::Starting | ProcessState::Running | ProcessState::Stopping
        )
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// The most recent run, finished or not.
    #[must_use]
    pub fn last_run(&self) -> Option<ProcessRun> {
        self.shared
            .last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn output(&self) -> Vec<OutputLine> {
        self.shared
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The output buffer as newline-joined text.
    #[must_use]
    pub fn output_text(&self) -> String {
        self.shared
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines recorded since the latest run started, newline-joined.
    #[must_use]
    pub fn log_text(&self) -> String {
        self.shared
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .join("\n")
    }

    /// Drop the run log while keeping the displayed output.
    pub fn reset_log(&self) {
        self.shared.reset_log();
    }

    /// Empty both the displayed output and the run log.
    pub fn clear_output(&self) {
        self.shared
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.shared.reset_log();
    }

    /// Append a status line that did not come from a process.
    pub fn append_notice(&self, text: impl Into<String>) {
        self.shared.push_line(None, OutputStream::System, text.into());
    }
}

struct ActiveRun {
    id: u64,
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

enum Wake {
    Control(Option<Control>),
    Exited(io::Result<ExitStatus>),
}

struct Worker {
    shared: Arc<Shared>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    state_tx: watch::Sender<ProcessState>,
    options: SupervisorOptions,
    next_run_id: u64,
}

impl Worker {
    async fn run(mut self) {
        let mut active: Option<ActiveRun> = None;
        loop {
            let wake = match active.as_mut() {
                Some(run) => tokio::select! {
                    msg = self.control_rx.recv() => Wake::Control(msg),
                    status = run.child.wait() => Wake::Exited(status),
                },
                None => Wake::Control(self.control_rx.recv().await),
            };

            match wake {
                Wake::Exited(status) => {
                    if let Some(run) = active.take() {
                        self.finish(run, status, false).await;
                    }
                }
                Wake::Control(Some(Control::Run {
                    command,
                    working_dir,
                })) => {
                    if let Some(run) = active.take() {
                        self.terminate(run).await;
                    }
                    active = self.start(command, &working_dir);
                }
                Wake::Control(Some(Control::Stop)) => {
                    if let Some(run) = active.take() {
                        self.terminate(run).await;
                    }
                }
                Wake::Control(Some(Control::Settle(done))) => {
                    let _ = done.send(());
                }
                Wake::Control(None) => {
                    if let Some(run) = active.take() {
                        self.terminate(run).await;
                    }
                    tracing::debug!("command supervisor stopped");
                    return;
                }
            }
        }
    }

    fn set_state(&self, state: ProcessState) {
        self.state_tx.send_replace(state);
        let _ = self.shared.events.send(ProcessEvent::StateChanged { state });
        tracing::debug!(%state, "process state changed");
    }

    fn start(&mut self, command: String, working_dir: &Path) -> Option<ActiveRun> {
        self.set_state(ProcessState::Starting);
        self.shared.reset_log();
        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let banner = self
            .shared
            .localizer
            .message("command_running", &[("command", &command)]);
        self.shared
            .push_line(Some(run_id), OutputStream::System, banner);

        let mut cmd = shell_command(&command);
        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        signal::isolate_process_group(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let detail = source.to_string();
                let err = ProcessError::Spawn {
                    command: command.clone(),
                    source,
                };
                tracing::warn!(run_id, error = %err, "command failed to start");
                let line = self
                    .shared
                    .localizer
                    .message("command_error", &[("error", &detail)]);
                self.shared.push_line(Some(run_id), OutputStream::System, line);
                let _ = self.shared.events.send(ProcessEvent::Error {
                    run_id: Some(run_id),
                    message: err.to_string(),
                });
                self.set_state(ProcessState::Idle);
                return None;
            }
        };

        let pid = child.id();
        self.shared
            .begin_run(ProcessRun::started(run_id, command.clone(), pid));

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump_lines(
                stdout,
                OutputStream::Stdout,
                run_id,
                Arc::clone(&self.shared),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump_lines(
                stderr,
                OutputStream::Stderr,
                run_id,
                Arc::clone(&self.shared),
            )));
        }

        tracing::info!(run_id, ?pid, command = %command, "command started");
        let _ = self.shared.events.send(ProcessEvent::Started {
            run_id,
            pid,
            command,
        });
        self.set_state(ProcessState::Running);

        Some(ActiveRun {
            id: run_id,
            child,
            readers,
        })
    }

    async fn terminate(&mut self, mut run: ActiveRun) {
        self.set_state(ProcessState::Stopping);
        signal::request_terminate(&mut run.child);

        let (status, forced) =
            match tokio::time::timeout(self.options.grace_period, run.child.wait()).await {
                Ok(status) => (status, false),
                Err(_) => {
                    tracing::warn!(
                        run_id = run.id,
                        grace_ms = self.options.grace_period.as_millis(),
                        "command ignored termination request; killing"
                    );
                    signal::force_kill(&mut run.child).await;
                    (run.child.wait().await, true)
                }
            };
        self.finish(run, status, forced).await;
    }

    async fn finish(&mut self, mut run: ActiveRun, status: io::Result<ExitStatus>, forced: bool) {
        for reader in &mut run.readers {
            if tokio::time::timeout(self.options.drain_timeout, &mut *reader)
                .await
                .is_err()
            {
                reader.abort();
                tracing::debug!(run_id = run.id, "output reader did not drain in time");
            }
        }

        let code = match status {
            Ok(status) if !forced => status.code().unwrap_or(TERMINATED_EXIT_CODE),
            Ok(_) => TERMINATED_EXIT_CODE,
            Err(err) => {
                tracing::warn!(run_id = run.id, error = %err, "failed to collect exit status");
                TERMINATED_EXIT_CODE
            }
        };

        self.set_state(ProcessState::Exited);
        let line = self
            .shared
            .localizer
            .message("process_exited", &[("code", &code.to_string())]);
        self.shared.push_line(Some(run.id), OutputStream::System, line);
        self.shared.finish_run(run.id, code, forced);
        let _ = self.shared.events.send(ProcessEvent::Exited {
            run_id: run.id,
            code,
            forced,
        });
        tracing::info!(run_id = run.id, code, forced, "command exited");
        self.set_state(ProcessState::Idle);
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

async fn pump_lines<R>(reader: R, stream: OutputStream, run_id: u64, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']).to_string();
                shared.push_line(Some(run_id), stream, line);
            }
            Err(err) => {
                tracing::debug!(run_id, %stream, error = %err, "output stream closed");
                break;
            }
        }
    }
}
