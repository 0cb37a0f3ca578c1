//! MCP notification types sent from server to client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::JsonRpcNotification;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessageParams {
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

/// Syslog severities, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelParams {
    pub level: LogLevel,
}

impl JsonRpcNotification {
    /// Build a `notifications/message` log notification.
    pub fn log(level: LogLevel, logger: &str, data: Value) -> Self {
        let params = LogMessageParams {
            level,
            logger: Some(logger.to_string()),
            data,
        };
        Self::new(
            "notifications/message".to_string(),
            serde_json::to_value(params).ok(),
        )
    }
}
