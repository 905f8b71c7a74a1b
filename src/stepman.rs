//! Typed calls into the `stepman` step manager.

use crate::error::InvocationError;
use crate::runner::{run_checked, Invocation, OutputMode, ToolRunner};
use crate::types::{LogLevel, StepInfoFormat};
use std::path::Path;

pub const DEFAULT_PROGRAM: &str = "stepman";

/// Where `step-info` should look a step up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource<'a> {
    /// A step from a step library collection.
    Library {
        collection: &'a str,
        id: &'a str,
        version: &'a str,
    },
    /// A `step.yml` on the local filesystem.
    Local { step_yml: &'a Path },
}

#[derive(Debug, Clone)]
pub struct Stepman<R> {
    runner: R,
    log_level: LogLevel,
    program: String,
}

impl<R: ToolRunner> Stepman<R> {
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

    pub fn setup(&self, collection: &str) -> Result<(), InvocationError> {
        let invocation = self
            .command()
            .args(["setup", "--collection", collection]);
        self.fire(invocation)
    }

    /// Copies the step's source to `dir` and its `step.yml` to `copy_yml`.
    pub fn activate(
        &self,
        collection: &str,
        step_id: &str,
        step_version: &str,
        dir: &Path,
        copy_yml: &Path,
    ) -> Result<(), InvocationError> {
        let invocation = self
            .command()
            .args(["activate", "--collection", collection])
            .args(["--id", step_id, "--version", step_version])
            .arg("--path")
            .arg(dir.as_os_str())
            .arg("--copyyml")
            .arg(copy_yml.as_os_str());
        self.fire(invocation)
    }

    pub fn update(&self, collection: &str) -> Result<(), InvocationError> {
        let invocation = self
            .command()
            .args(["update", "--collection", collection]);
        self.fire(invocation)
    }

    /// Raw output is captured with stderr merged in; JSON output is stdout only.
    pub fn step_info(
        &self,
        source: StepSource<'_>,
        format: StepInfoFormat,
    ) -> Result<String, InvocationError> {
        let invocation = self.command().arg("step-info");
        let invocation = match source {
            StepSource::Library {
                collection,
                id,
                version,
            } => invocation.args([
                "--collection",
                collection,
                "--id",
                id,
                "--version",
                version,
            ]),
            StepSource::Local { step_yml } => {
                invocation.arg("--step-yml").arg(step_yml.as_os_str())
            }
        };
        self.capture(invocation, format)
    }

    pub fn step_list(
        &self,
        collection: &str,
        format: StepInfoFormat,
    ) -> Result<String, InvocationError> {
        let invocation = self
            .command()
            .args(["step-list", "--collection", collection]);
        self.capture(invocation, format)
    }

    pub fn share(&self) -> Result<(), InvocationError> {
        self.fire(self.share_command([]))
    }

    pub fn share_audit(&self) -> Result<(), InvocationError> {
        self.fire(self.share_command(["audit"]))
    }

    pub fn share_start(&self, collection: &str) -> Result<(), InvocationError> {
        self.fire(self.share_command(["start", "--collection", collection]))
    }

    pub fn share_create(&self, tag: &str, git: &str, step_id: &str) -> Result<(), InvocationError> {
        self.fire(self.share_command([
            "create", "--tag", tag, "--git", git, "--stepid", step_id,
        ]))
    }

    pub fn share_finish(&self) -> Result<(), InvocationError> {
        self.fire(self.share_command(["finish"]))
    }

    fn base(&self) -> Invocation {
        Invocation::new(&self.program).args(["--loglevel", self.log_level.as_str()])
    }

    fn command(&self) -> Invocation {
        self.base().arg("--debug")
    }

    fn share_command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        self.base().arg("share").args(args).arg("--toolmode")
    }

    fn fire(&self, invocation: Invocation) -> Result<(), InvocationError> {
        run_checked(&self.runner, &invocation.mode(OutputMode::Inherited))?;
        Ok(())
    }

    fn capture(
        &self,
        invocation: Invocation,
        format: StepInfoFormat,
    ) -> Result<String, InvocationError> {
        let mode = match format {
            StepInfoFormat::Raw => OutputMode::Combined,
            StepInfoFormat::Json => OutputMode::Split,
        };
        let invocation = invocation.args(["--format", format.as_str()]).mode(mode);
        Ok(run_checked(&self.runner, &invocation)?.stdout)
    }
}
