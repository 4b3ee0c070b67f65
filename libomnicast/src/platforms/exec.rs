//! Exec publisher: bridge to external command-line platform clients
//!
//! Platform HTTP clients live outside this crate. `ExecPublisher` runs a
//! user-configured command per platform, writes the adapted content as JSON
//! to its stdin, and reads the platform post id from its stdout.
//!
//! Exit code contract for publish commands:
//! - `0` - success, stdout carries the platform post id
//! - `2` - authentication failure (not retried)
//! - `3` - content rejected by the platform (not retried)
//! - `4` - rate limited (retried)
//! - anything else - treated as a network/transport failure (retried)

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PublisherError, Result};
use crate::platforms::Publisher;
use crate::types::{AdaptedContent, Platform};

pub struct ExecPublisher {
    platform: Platform,
    command: String,
}

impl ExecPublisher {
    pub fn new(platform: Platform, command: impl Into<String>) -> Self {
        Self {
            platform,
            command: command.into(),
        }
    }

    fn classify_exit(&self, code: Option<i32>, stderr: &str) -> PublisherError {
        let detail = format!(
            "{} publish command exited with {:?}: {}",
            self.platform,
            code,
            stderr.trim()
        );
        match code {
            Some(2) => PublisherError::Auth(detail),
            Some(3) => PublisherError::Validation(detail),
            Some(4) => PublisherError::RateLimit(detail),
            _ => PublisherError::Network(detail),
        }
    }
}

#[async_trait]
impl Publisher for ExecPublisher {
    async fn publish(&self, content: &AdaptedContent) -> Result<String> {
        debug!("Running publish command for {}: {}", self.platform, self.command);

        let payload = serde_json::to_vec(content)
            .map_err(|e| PublisherError::Validation(format!("Failed to encode content: {}", e)))?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PublisherError::Network(format!(
                    "Failed to spawn publish command for {}: {}",
                    self.platform, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| {
                PublisherError::Network(format!("Failed to write content to command: {}", e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            PublisherError::Network(format!("Publish command did not complete: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.classify_exit(output.status.code(), &stderr).into());
        }

        let post_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if post_id.is_empty() {
            return Err(PublisherError::Network(format!(
                "{} publish command produced no post id",
                self.platform
            ))
            .into());
        }

        Ok(post_id)
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}
