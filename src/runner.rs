//! Running external tools.
//!
//! Every call to `stepman` or `envman` is described by an [`Invocation`] and
//! executed by a [`ToolRunner`]. The runner only reports what the child did;
//! [`run_checked`] turns a non-zero exit into an [`InvocationError`] whose
//! details depend on the [`OutputMode`].

use crate::error::InvocationError;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// stdout and stderr go straight to the caller's streams.
    #[default]
    Inherited,
    /// stdout and stderr are captured interleaved into one text.
    Combined,
    /// stdout and stderr are captured into separate texts.
    Split,
    /// Streams are inherited and only the exit code matters; a non-zero
    /// exit is a result, not an error.
    ExitCodeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// Written verbatim to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    pub mode: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            mode: OutputMode::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Human readable form for logs. Not meant to be fed to a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("{:?}", arg));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// What a finished child left behind.
///
/// In [`OutputMode::Combined`] the merged stream is in `stdout` and `stderr`
/// is empty. Nothing is captured for the inheriting modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub trait ToolRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// Returns `Ok` whenever the child ran, whatever its exit code; `Err` only
    /// when it could not be started, fed or awaited.
    fn run(&self, invocation: &Invocation) -> Result<InvocationOutput, InvocationError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<InvocationOutput, InvocationError> {
        (**self).run(invocation)
    }
}

impl<T: ToolRunner + ?Sized> ToolRunner for Arc<T> {
    fn run(&self, invocation: &Invocation) -> Result<InvocationOutput, InvocationError> {
        (**self).run(invocation)
    }
}

/// Runs the invocation and maps a failed exit to [`InvocationError::Failed`].
///
/// The error carries no details in [`OutputMode::Inherited`] (the output was
/// already shown), the merged text in [`OutputMode::Combined`] and the stderr
/// text in [`OutputMode::Split`].
pub fn run_checked<R: ToolRunner + ?Sized>(
    runner: &R,
    invocation: &Invocation,
) -> Result<InvocationOutput, InvocationError> {
    tracing::debug!("Executing: {}", invocation.command_line());

    let output = runner.run(invocation)?;
    if output.success() || invocation.mode == OutputMode::ExitCodeOnly {
        return Ok(output);
    }

    tracing::debug!(
        "{} exited with {:?}",
        invocation.program,
        output.exit_code
    );
    let details = match invocation.mode {
        OutputMode::Inherited | OutputMode::ExitCodeOnly => None,
        OutputMode::Combined => Some(output.stdout),
        OutputMode::Split => Some(output.stderr),
    }
    .filter(|text| !text.trim().is_empty());
    Err(InvocationError::Failed {
        program: invocation.program.clone(),
        code: output.exit_code,
        details,
    })
}

/// Spawns real child processes. The program is resolved through `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<InvocationOutput, InvocationError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        match invocation.mode {
            OutputMode::Inherited | OutputMode::ExitCodeOnly => {
                cmd.stdin(stdin_for(invocation, Stdio::inherit()));
                let mut child = spawn(&mut cmd, invocation)?;
                let feeder = feed_stdin(&mut child, invocation);
                let status = settle(child.wait(), feeder, invocation)?;
                Ok(InvocationOutput {
                    exit_code: status.code(),
                    ..InvocationOutput::default()
                })
            }
            OutputMode::Combined => {
                // Both streams share one file description, so writes land in
                // the order the child made them.
                let mut sink =
                    tempfile::tempfile().map_err(|source| capture_error(invocation, source))?;
                let out = sink
                    .try_clone()
                    .map_err(|source| capture_error(invocation, source))?;
                let err = sink
                    .try_clone()
                    .map_err(|source| capture_error(invocation, source))?;
                cmd.stdin(stdin_for(invocation, Stdio::null()))
                    .stdout(Stdio::from(out))
                    .stderr(Stdio::from(err));

                let mut child = spawn(&mut cmd, invocation)?;
                drop(cmd);
                let feeder = feed_stdin(&mut child, invocation);
                let status = settle(child.wait(), feeder, invocation)?;

                let mut merged = Vec::new();
                sink.seek(SeekFrom::Start(0))
                    .and_then(|_| sink.read_to_end(&mut merged))
                    .map_err(|source| capture_error(invocation, source))?;

                Ok(InvocationOutput {
                    exit_code: status.code(),
                    stdout: String::from_utf8_lossy(&merged).into_owned(),
                    stderr: String::new(),
                })
            }
            OutputMode::Split => {
                cmd.stdin(stdin_for(invocation, Stdio::null()))
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());

                let mut child = spawn(&mut cmd, invocation)?;
                let feeder = feed_stdin(&mut child, invocation);
                let output = settle(child.wait_with_output(), feeder, invocation)?;

                Ok(InvocationOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        }
    }
}

fn stdin_for(invocation: &Invocation, otherwise: Stdio) -> Stdio {
    if invocation.stdin.is_some() {
        Stdio::piped()
    } else {
        otherwise
    }
}

fn spawn(cmd: &mut Command, invocation: &Invocation) -> Result<Child, InvocationError> {
    cmd.spawn().map_err(|source| InvocationError::Spawn {
        program: invocation.program.clone(),
        source,
    })
}

fn capture_error(invocation: &Invocation, source: io::Error) -> InvocationError {
    InvocationError::Capture {
        program: invocation.program.clone(),
        source,
    }
}

/// Writes the stdin payload from a separate thread so a child that fills its
/// output pipes before reading stdin cannot deadlock us.
fn feed_stdin(child: &mut Child, invocation: &Invocation) -> Option<JoinHandle<io::Result<()>>> {
    let payload = invocation.stdin.clone()?;
    let mut stdin = child.stdin.take()?;
    Some(std::thread::spawn(move || {
        let result = stdin.write_all(payload.as_bytes());
        drop(stdin);
        match result {
            // The child is free to exit without reading its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }))
}

/// Joins the stdin writer before reporting how waiting on the child went.
fn settle<T>(
    waited: io::Result<T>,
    feeder: Option<JoinHandle<io::Result<()>>>,
    invocation: &Invocation,
) -> Result<T, InvocationError> {
    let fed = join_feeder(feeder, invocation);
    let value = waited.map_err(|source| capture_error(invocation, source))?;
    fed?;
    Ok(value)
}

fn join_feeder(
    feeder: Option<JoinHandle<io::Result<()>>>,
    invocation: &Invocation,
) -> Result<(), InvocationError> {
    let Some(feeder) = feeder else {
        return Ok(());
    };
    let result = feeder
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
    result.map_err(|source| InvocationError::Stdin {
        program: invocation.program.clone(),
        source,
    })
}

/// Records invocations and replays queued results instead of spawning anything.
///
/// With an empty queue every invocation succeeds with exit code 0 and no output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    invocations: Mutex<Vec<Invocation>>,
    responses: Mutex<VecDeque<Result<InvocationOutput, InvocationError>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&self, output: InvocationOutput) -> &Self {
        lock(&self.responses).push_back(Ok(output));
        self
    }

    pub fn push_error(&self, error: InvocationError) -> &Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    pub fn last_invocation(&self) -> Option<Invocation> {
        lock(&self.invocations).last().cloned()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<InvocationOutput, InvocationError> {
        lock(&self.invocations).push(invocation.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(InvocationOutput::exited(0)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
