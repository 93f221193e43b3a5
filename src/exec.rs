//! Command execution backend
//!
//! The controller drives external tools (`mount`, `modprobe`, `shutdown`, ...)
//! through this trait so the state machines stay testable without root or
//! real hardware.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// Executes an external command and reports whether it exited successfully.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, returning `Ok(true)` on a zero exit status,
    /// `Ok(false)` on a non-zero one, and `Err` when the command could not be
    /// spawned at all.
    async fn run(&self, program: &str, args: &[String]) -> Result<bool>;
}

/// Real command runner backed by `tokio::process`.
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<bool> {
        debug!("running command: {} {}", program, args.join(" "));

        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await?;

        if !status.success() {
            debug!("command {} exited with {}", program, status);
        }
        Ok(status.success())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::CommandRunner;
    use crate::error::Result;

    /// Records every invocation and returns scripted exit statuses.
    pub(crate) struct MockCommandRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        failing: Mutex<HashSet<String>>,
    }

    impl MockCommandRunner {
        pub(crate) fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
            }
        }

        /// Make every future invocation of `program` exit non-zero.
        pub(crate) fn fail_program(&self, program: &str) {
            self.failing.lock().unwrap().insert(program.to_string());
        }

        pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        /// Program names in invocation order.
        pub(crate) fn programs(&self) -> Vec<String> {
            self.calls().into_iter().map(|(p, _)| p).collect()
        }

        pub(crate) fn count_for(&self, program: &str) -> usize {
            self.calls().iter().filter(|(p, _)| p == program).count()
        }

        pub(crate) fn clear(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl CommandRunner for MockCommandRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<bool> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            Ok(!self.failing.lock().unwrap().contains(program))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_zero_exit_as_success() {
        let runner = SystemCommandRunner::new();
        assert!(runner.run("true", &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_reports_nonzero_exit_as_failure() {
        let runner = SystemCommandRunner::new();
        assert!(!runner.run("false", &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let runner = SystemCommandRunner::new();
        assert!(runner
            .run("/nonexistent/emucd-test-binary", &[])
            .await
            .is_err());
    }
}
