//! Typed calls into the `envman` environment manager.
//!
//! Every call except [`Envman::init`] names the envstore file explicitly with
//! `--path`. The envstore's format belongs to `envman`; values go in and JSON
//! comes out untouched.

use crate::error::InvocationError;
use crate::runner::{run_checked, Invocation, OutputMode, ToolRunner};
use crate::types::LogLevel;
use std::path::Path;

pub const DEFAULT_PROGRAM: &str = "envman";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Let `envman` expand `$VAR` references inside the value.
    pub expand: bool,
    pub skip_if_empty: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            expand: true,
            skip_if_empty: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envman<R> {
    runner: R,
    log_level: LogLevel,
    program: String,
}

impl<R: ToolRunner> Envman<R> {
    pub fn new(runner: R, log_level: LogLevel) -> Self {
        Self::with_program(runner, log_level, DEFAULT_PROGRAM)
    }

    pub fn with_program(runner: R, log_level: LogLevel, program: impl Into<String>) -> Self {
        Self {
            runner,
            log_level,
            program: program.into(),
        }
    }

    /// Initializes the envstore at `envman`'s default location.
    pub fn init(&self) -> Result<(), InvocationError> {
        let invocation = self.base().arg("init");
        run_checked(&self.runner, &invocation)?;
        Ok(())
    }

    /// Initializes an empty envstore at `envstore`, clearing any previous content.
    pub fn init_at_path(&self, envstore: &Path) -> Result<(), InvocationError> {
        let invocation = self.with_store(envstore).args(["init", "--clear"]);
        run_checked(&self.runner, &invocation)?;
        Ok(())
    }

    /// Appends `key` to the envstore.
    ///
    /// The value is piped through stdin rather than passed as an argument so
    /// it can be arbitrarily long and contain anything.
    pub fn add(
        &self,
        envstore: &Path,
        key: &str,
        value: &str,
        options: AddOptions,
    ) -> Result<(), InvocationError> {
        let mut invocation = self
            .with_store(envstore)
            .args(["add", "--key", key, "--append"]);
        if !options.expand {
            invocation = invocation.arg("--no-expand");
        }
        if options.skip_if_empty {
            invocation = invocation.arg("--skip-if-empty");
        }

        run_checked(&self.runner, &invocation.stdin(value))?;
        Ok(())
    }

    pub fn clear(&self, envstore: &Path) -> Result<(), InvocationError> {
        let invocation = self
            .with_store(envstore)
            .arg("clear")
            .mode(OutputMode::Combined);

        match run_checked(&self.runner, &invocation) {
            Ok(_) => Ok(()),
            Err(err) => {
                let output = err.details().map(str::trim).unwrap_or_default();
                let message = if err.exit_code().is_some() && !output.is_empty() {
                    output.to_string()
                } else {
                    err.to_string()
                };
                Err(InvocationError::EnvstoreClear {
                    path: envstore.to_path_buf(),
                    message,
                })
            }
        }
    }

    /// Runs `command` with the envstore's variables applied, from `work_dir`.
    ///
    /// Returns the exit code of `command` itself. An `Err` means `envman`
    /// could not be run at all, or was killed before reporting a code.
    pub fn run<S: AsRef<str>>(
        &self,
        envstore: &Path,
        work_dir: &Path,
        command: &[S],
    ) -> Result<i32, InvocationError> {
        let invocation = self
            .with_store(envstore)
            .arg("run")
            .args(command.iter().map(|part| part.as_ref()))
            .current_dir(work_dir)
            .mode(OutputMode::ExitCodeOnly);

        let output = run_checked(&self.runner, &invocation)?;
        output.exit_code.ok_or_else(|| InvocationError::Failed {
            program: self.program.clone(),
            code: None,
            details: None,
        })
    }

    /// The envstore as JSON, with values expanded.
    pub fn print_json(&self, envstore: &Path) -> Result<String, InvocationError> {
        let invocation = self
            .with_store(envstore)
            .args(["print", "--format", "json", "--expand"])
            .mode(OutputMode::Split);
        Ok(run_checked(&self.runner, &invocation)?.stdout)
    }

    fn base(&self) -> Invocation {
        Invocation::new(&self.program).args(["--loglevel", self.log_level.as_str()])
    }

    fn with_store(&self, envstore: &Path) -> Invocation {
        self.base().arg("--path").arg(envstore.as_os_str())
    }
}
