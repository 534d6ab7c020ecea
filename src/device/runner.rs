//! External process execution

use crate::core::error::{Result, RunnerError};
use std::process::Command;

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-zero exit into a device error naming the command
    pub fn check(self, program: &str, args: &[&str]) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".into());
        Err(RunnerError::Device(format!(
            "`{} {}` exited with {}: {}",
            program,
            args.join(" "),
            code,
            self.stderr.trim()
        )))
    }
}

/// Runs external programs; replaced by a recording fake in tests
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Like `run`, but writes `input` to the child's stdin
    fn run_with_input(&self, program: &str, args: &[&str], input: &[u8]) -> Result<CommandOutput>;

    /// Whether `program` can be found on PATH
    fn is_available(&self, program: &str) -> bool;
}

/// Runs commands on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!("Running {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| RunnerError::Device(format!("Failed to run {}: {}", program, e)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &[u8]) -> Result<CommandOutput> {
        use std::io::Write;
        use std::process::Stdio;

        tracing::debug!("Running {} {} with {} bytes of input", program, args.join(" "), input.len());
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::Device(format!("Failed to run {}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input)?;
        }
        let output = child.wait_with_output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every command and replays scripted outputs in order
    #[derive(Default)]
    pub struct FakeRunner {
        pub calls: Mutex<Vec<String>>,
        pub outputs: Mutex<VecDeque<CommandOutput>>,
        pub missing: Vec<String>,
    }

    impl FakeRunner {
        pub fn with_outputs(outputs: Vec<CommandOutput>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into()),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", program, args.join(" ")));
            Ok(self
                .outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| CommandOutput::ok("")))
        }

        fn run_with_input(&self, program: &str, args: &[&str], _input: &[u8]) -> Result<CommandOutput> {
            self.run(program, args)
        }

        fn is_available(&self, program: &str) -> bool {
            !self.missing.iter().any(|m| m == program)
        }
    }
}
