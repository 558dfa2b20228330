//! Pi-hole service access — status probe and enable/disable control.
//!
//! The service is driven through its command-line interface. Every invocation
//! is bounded by [`COMMAND_TIMEOUT`] so a wedged `pihole` process cannot stall
//! the reconciliation loop.

use std::fmt;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Case-insensitive marker in `pihole status` output when blocking is on.
pub const ENABLED_MARKER: &str = "pi-hole blocking is enabled";

/// Case-insensitive marker in `pihole status` output when blocking is off.
pub const DISABLED_MARKER: &str = "pi-hole blocking is disabled";

/// Upper bound for a single `pihole` invocation.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval when waiting for a child process to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

// ── Error type ──

/// Service invocation errors.
#[derive(Debug)]
pub enum ServiceError {
    /// The command could not be started (missing binary, permissions).
    Spawn(io::Error),
    /// The command did not exit within the timeout and was killed.
    TimedOut(Duration),
    /// The command exited unsuccessfully.
    Failed { status: ExitStatus, stderr: String },
    /// Status output contained neither the enabled nor the disabled marker.
    Unrecognized(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Spawn(e) => write!(f, "Failed to run pihole: {e}"),
            ServiceError::TimedOut(t) => write!(f, "pihole timed out after {t:?}"),
            ServiceError::Failed { status, stderr } => {
                if stderr.is_empty() {
                    write!(f, "pihole exited with {status}")
                } else {
                    write!(f, "pihole exited with {status}: {stderr}")
                }
            }
            ServiceError::Unrecognized(out) => {
                write!(f, "Unrecognized status output: {out:?}")
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

// ── State ──

/// Blocking state of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Enabled,
    Disabled,
}

impl ServiceState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            ServiceState::Enabled
        } else {
            ServiceState::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == ServiceState::Enabled
    }

    /// The opposite state — the target of a toggle.
    pub fn toggled(self) -> Self {
        match self {
            ServiceState::Enabled => ServiceState::Disabled,
            ServiceState::Disabled => ServiceState::Enabled,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Enabled => write!(f, "enabled"),
            ServiceState::Disabled => write!(f, "disabled"),
        }
    }
}

/// Classify `pihole status` output.
///
/// Matching is case-insensitive. The enabled marker wins if both appear.
pub fn classify_status(output: &str) -> Option<ServiceState> {
    let lower = output.to_lowercase();
    if lower.contains(ENABLED_MARKER) {
        Some(ServiceState::Enabled)
    } else if lower.contains(DISABLED_MARKER) {
        Some(ServiceState::Disabled)
    } else {
        None
    }
}

// ── Traits ──

/// Reads the current service state.
pub trait StatusProbe {
    /// Query the service, reporting why the state could not be determined.
    fn query(&self) -> Result<ServiceState>;

    /// Query the service, degrading any failure to `Disabled`.
    ///
    /// Never reports blocking as enabled unless the service said so.
    fn probe(&self) -> ServiceState {
        match self.query() {
            Ok(state) => state,
            Err(e) => {
                log::warn!("status probe failed, assuming disabled: {e}");
                ServiceState::Disabled
            }
        }
    }
}

/// Changes the service state.
pub trait ServiceController {
    /// Issue the enable or disable command.
    ///
    /// `Ok` only means the command ran; callers re-probe for the real state.
    fn command(&self, enabled: bool) -> Result<()>;

    /// Issue the command and log (rather than return) any failure.
    fn set_enabled(&self, enabled: bool) {
        if let Err(e) = self.command(enabled) {
            let verb = if enabled { "enable" } else { "disable" };
            log::warn!("{verb} command failed: {e}");
        }
    }
}

// ── pihole CLI backend ──

/// Talks to Pi-hole through the `pihole` executable.
#[derive(Debug, Clone)]
pub struct PiholeCli {
    program: String,
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl Default for PiholeCli {
    fn default() -> Self {
        Self::new()
    }
}

impl PiholeCli {
    /// Use `pihole` from `PATH` with the default timeout.
    pub fn new() -> Self {
        Self::with_command("pihole", Vec::<String>::new())
    }

    /// Use an arbitrary program; `prefix_args` go before the subcommand.
    pub fn with_command<S: Into<String>>(
        program: impl Into<String>,
        prefix_args: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            program: program.into(),
            prefix_args: prefix_args.into_iter().map(Into::into).collect(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, subcommand: &str) -> Result<Output> {
        log::debug!("running {} {subcommand}", self.program);
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args).arg(subcommand);
        let output = run_with_timeout(&mut cmd, self.timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                ServiceError::TimedOut(self.timeout)
            } else {
                ServiceError::Spawn(e)
            }
        })?;
        if !output.status.success() {
            return Err(ServiceError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl StatusProbe for PiholeCli {
    fn query(&self) -> Result<ServiceState> {
        let output = self.run("status")?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        classify_status(&stdout).ok_or_else(|| ServiceError::Unrecognized(stdout.trim().into()))
    }
}

impl ServiceController for PiholeCli {
    fn command(&self, enabled: bool) -> Result<()> {
        self.run(if enabled { "enable" } else { "disable" })
            .map(|_| ())
    }
}

/// Run a command with captured output. Kills the process if it exceeds the deadline.
///
/// Both pipes are drained on helper threads while waiting, so a child with
/// more output than the pipe buffer can still run to completion.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Output {
                status,
                stdout: collect(stdout),
                stderr: collect(stderr),
            });
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait(); // reap zombie
            // Readers are left detached; a grandchild may still hold the pipes.
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out after {timeout:?}"),
            ));
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::debug!("reading child output failed: {e}");
        }
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

// ── Test stub ──

/// In-memory service for unit and integration tests.
///
/// Clones share state, so a test can keep a handle while the loop owns another.
pub mod stub {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Inner {
        state: ServiceState,
        fail_queries: bool,
        ignore_commands: bool,
        queries: usize,
        commands: Vec<bool>,
    }

    #[derive(Debug, Clone)]
    pub struct StubService {
        inner: Arc<Mutex<Inner>>,
    }

    impl StubService {
        pub fn new(initial: ServiceState) -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner {
                    state: initial,
                    fail_queries: false,
                    ignore_commands: false,
                    queries: 0,
                    commands: Vec::new(),
                })),
            }
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
            self.inner.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Change the state as another actor (web UI, cron) would.
        pub fn set_external(&self, state: ServiceState) {
            self.lock().state = state;
        }

        /// The true state, bypassing query failure simulation.
        pub fn actual(&self) -> ServiceState {
            self.lock().state
        }

        /// Make every query fail until reset.
        pub fn fail_queries(&self, fail: bool) {
            self.lock().fail_queries = fail;
        }

        /// Accept commands but leave the state unchanged.
        pub fn ignore_commands(&self, ignore: bool) {
            self.lock().ignore_commands = ignore;
        }

        pub fn query_count(&self) -> usize {
            self.lock().queries
        }

        /// Targets of every command issued, in order.
        pub fn commands(&self) -> Vec<bool> {
            self.lock().commands.clone()
        }
    }

    impl StatusProbe for StubService {
        fn query(&self) -> Result<ServiceState> {
            let mut inner = self.lock();
            inner.queries += 1;
            if inner.fail_queries {
                return Err(ServiceError::Unrecognized("stub failure".into()));
            }
            Ok(inner.state)
        }
    }

    impl ServiceController for StubService {
        fn command(&self, enabled: bool) -> Result<()> {
            let mut inner = self.lock();
            inner.commands.push(enabled);
            if !inner.ignore_commands {
                inner.state = ServiceState::from_enabled(enabled);
            }
            Ok(())
        }
    }
}
