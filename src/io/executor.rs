//! Command execution capability
//!
//! Recognized sequence commands are dispatched here. The rig build logs
//! them instead of injecting real key events.

use crate::domain::types::CommandId;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Executes a recognized gaze command
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: CommandId) -> Result<()>;
}

/// Executor that records commands in the log only
pub struct LoggingExecutor;

#[async_trait]
impl CommandExecutor for LoggingExecutor {
    async fn execute(&self, command: CommandId) -> Result<()> {
        info!(command = %command, "command_executed");
        Ok(())
    }
}
