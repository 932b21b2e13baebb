//! Error types shared by the task runner and its agents.

use std::time::Duration;
use thiserror::Error;

/// Broad failure category of a task run.
///
/// Each category maps to its own process exit code so that a parent process
/// can tell a bad configuration apart from an unreachable endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Network,
    RemoteService,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Exit code reported by the `phone-task` binary for this category.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Unknown => 1,
            ErrorKind::Config => 2,
            ErrorKind::Network => 3,
            ErrorKind::RemoteService => 4,
            ErrorKind::Timeout => 124,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Network => "network",
            ErrorKind::RemoteService => "remote-service",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Task execution errors.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Remote service error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RemoteService {
        status: Option<u16>,
        message: String,
    },
    #[error("Task timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("Agent failed{}: {message}", .code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    Agent {
        code: Option<i32>,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        RunnerError::Config(msg.into())
    }

    /// Create an agent failure without an exit code.
    pub fn agent(msg: impl Into<String>) -> Self {
        RunnerError::Agent {
            code: None,
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::Config(_) => ErrorKind::Config,
            RunnerError::Network(_) => ErrorKind::Network,
            RunnerError::RemoteService { .. } => ErrorKind::RemoteService,
            RunnerError::Timeout(_) => ErrorKind::Timeout,
            RunnerError::Agent { .. } | RunnerError::Io(_) => ErrorKind::Unknown,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

/// HTTP failures: a response status is a remote service error, anything else
/// (including reqwest's own request timeout) is a network error. `Timeout` is
/// kept for the agent's wall-clock limit.
impl From<reqwest::Error> for RunnerError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RunnerError::RemoteService {
                status: Some(status.as_u16()),
                message: err.to_string(),
            },
            None => RunnerError::Network(err.to_string()),
        }
    }
}

/// Result alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::Config,
            ErrorKind::Network,
            ErrorKind::RemoteService,
            ErrorKind::Timeout,
            ErrorKind::Unknown,
        ];
        let codes: HashSet<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(RunnerError::config("x").kind(), ErrorKind::Config);
        assert_eq!(RunnerError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(
            RunnerError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(RunnerError::agent("boom").kind(), ErrorKind::Unknown);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(RunnerError::from(io).exit_code(), 1);
    }

    #[test]
    fn test_display_includes_status_and_code() {
        let err = RunnerError::RemoteService {
            status: Some(401),
            message: "unauthorized".into(),
        };
        assert_eq!(err.to_string(), "Remote service error (HTTP 401): unauthorized");

        let err = RunnerError::Agent {
            code: Some(3),
            message: "crashed".into(),
        };
        assert_eq!(err.to_string(), "Agent failed (exit code 3): crashed");
        assert_eq!(RunnerError::agent("crashed").to_string(), "Agent failed: crashed");
    }

    #[tokio::test]
    async fn test_reqwest_timeout_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = client
            .get(format!("http://{}/models", addr))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(RunnerError::from(err).kind(), ErrorKind::Network);
    }
}
