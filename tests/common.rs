use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Not every test binary uses every helper.
#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
    pub tools_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config").join("config.json");
        let tools_dir = temp_dir.path().join("tools");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_toolshed"));

        Self {
            temp_dir,
            config_path,
            tools_dir,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("TOOLSHED_CONFIG", &self.config_path);
        cmd.env("TOOLSHED_TOOLS_DIR", &self.tools_dir);
        cmd.env_remove("TOOLSHED_STEPMAN");
        cmd.env_remove("TOOLSHED_ENVMAN");
        cmd.env_remove("TOOLSHED_LOG_LEVEL");
        cmd.env_remove("RUST_LOG");
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("XDG_DATA_HOME", self.temp_dir.path().join("data"));
        cmd.env("XDG_CONFIG_HOME", self.temp_dir.path().join("xdg-config"));
        cmd
    }

    /// Writes an executable shell script standing in for `stepman` or `envman`.
    #[cfg(unix)]
    pub fn fake_tool(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.temp_dir.path().join("fake-bin");
        fs::create_dir_all(&dir).expect("Failed to create fake bin dir");
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", script)).expect("Failed to write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod fake tool");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
