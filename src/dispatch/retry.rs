//! Retry rules for the distributed backend.

use crate::config::Config;
use crate::driver::BackendRun;
use std::time::Duration;

/// How one backend run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// The console could not reach its coordinator and no project started.
    ConnectionFailed,
    Failed,
}

/// Attempt and connection-retry limits for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Outer attempts; outputs are purged between them.
    pub attempts: u32,
    /// Connection retries allowed across the whole dispatch.
    pub connection_retries: u32,
    pub connection_retry_wait: Duration,
    pub transient_exit_codes: Vec<i32>,
    /// Output text proving that real work began.
    pub work_began_marker: String,
}

impl RetryPolicy {
    /// Two attempts when retries are allowed, otherwise one.
    pub fn from_config(config: &Config, allow_retries: bool) -> Self {
        Self {
            attempts: if allow_retries { 2 } else { 1 },
            connection_retries: config.connection_retries,
            connection_retry_wait: config.connection_retry_wait(),
            transient_exit_codes: config.transient_exit_codes.clone(),
            work_began_marker: config.work_began_marker.clone(),
        }
    }

    pub fn classify(&self, run: &BackendRun) -> RunOutcome {
        if run.exit_code == 0 {
            RunOutcome::Succeeded
        } else if self.transient_exit_codes.contains(&run.exit_code)
            && !run.output.contains(&self.work_began_marker)
        {
            RunOutcome::ConnectionFailed
        } else {
            RunOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(exit_code: i32, output: &str) -> BackendRun {
        BackendRun {
            exit_code,
            output: output.to_string(),
            log_path: None,
        }
    }

    #[test]
    fn attempts_follow_allow_retries() {
        assert_eq!(RetryPolicy::from_config(&Config::default(), true).attempts, 2);
        assert_eq!(RetryPolicy::from_config(&Config::default(), false).attempts, 1);
    }

    #[test]
    fn policy_takes_limits_from_config() {
        let config = Config {
            connection_retries: 7,
            connection_retry_wait_seconds: 3,
            ..Config::default()
        };
        let policy = RetryPolicy::from_config(&config, false);

        assert_eq!(policy.connection_retries, 7);
        assert_eq!(policy.connection_retry_wait, Duration::from_secs(3));
        assert_eq!(policy.transient_exit_codes, vec![2, 4]);
        assert_eq!(policy.work_began_marker, "------Project:");
    }

    #[test]
    fn classify_exit_codes() {
        let policy = RetryPolicy::from_config(&Config::default(), true);

        assert_eq!(policy.classify(&run(0, "")), RunOutcome::Succeeded);
        assert_eq!(
            policy.classify(&run(2, "Failed to connect")),
            RunOutcome::ConnectionFailed
        );
        assert_eq!(policy.classify(&run(4, "")), RunOutcome::ConnectionFailed);
        assert_eq!(policy.classify(&run(1, "")), RunOutcome::Failed);
        assert_eq!(policy.classify(&run(3, "")), RunOutcome::Failed);
    }

    #[test]
    fn transient_code_after_work_began_is_a_failure() {
        let policy = RetryPolicy::from_config(&Config::default(), true);
        let output = "------Project: Env_0\nerror C2065: undeclared identifier";

        assert_eq!(policy.classify(&run(4, output)), RunOutcome::Failed);
    }
}
