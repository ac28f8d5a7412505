//! Notification sinks — where reminders are delivered.

use async_trait::async_trait;
use intouch_core::{
    config::NotifyConfig,
    error::IntouchError,
    traits::{Notification, NotificationSink},
};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

/// Writes notifications to the log and stdout.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), IntouchError> {
        info!(
            "notify #{} [{}] {}: {}",
            notification.id, notification.group_id, notification.title, notification.body
        );
        if notification.is_summary {
            println!("{} ({})", notification.title, notification.body);
        } else {
            println!(
                "{}: {} -> {}",
                notification.title, notification.body, notification.target_uri
            );
        }
        Ok(())
    }
}

/// Runs an external notifier as `<program> [args...] <title> <body>`.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Parse a whitespace-separated command line. Returns `None` when empty.
    pub fn new(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl NotificationSink for CommandSink {
    fn name(&self) -> &str {
        &self.program
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), IntouchError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&notification.title)
            .arg(&notification.body)
            .output()
            .await
            .map_err(|e| IntouchError::Notify(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IntouchError::Notify(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        debug!("notify: {} delivered #{}", self.program, notification.id);
        Ok(())
    }
}

/// Pick the sink configured in `[notify]`.
pub fn build_sink(config: &NotifyConfig) -> Arc<dyn NotificationSink> {
    match CommandSink::new(&config.command) {
        Some(sink) => {
            info!("notify: delivering through {}", sink.program);
            Arc::new(sink)
        }
        None => Arc::new(LogSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification {
            id: 0,
            title: "Reach out to Ana".into(),
            body: "It's been a while.".into(),
            target_uri: "sms:111".into(),
            group_id: "intouch".into(),
            is_summary: false,
        }
    }

    #[test]
    fn test_command_sink_parsing() {
        assert!(CommandSink::new("").is_none());
        assert!(CommandSink::new("   ").is_none());
        let sink = CommandSink::new("notify-send -a intouch").unwrap();
        assert_eq!(sink.name(), "notify-send");
        assert_eq!(sink.args, vec!["-a".to_string(), "intouch".to_string()]);
    }

    #[test]
    fn test_build_sink_defaults_to_log() {
        let sink = build_sink(&NotifyConfig::default());
        assert_eq!(sink.name(), "log");
    }

    #[tokio::test]
    async fn test_log_sink_delivers() {
        assert!(LogSink.deliver(&notification()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_sink_success_and_failure() {
        let ok = CommandSink::new("true").unwrap();
        assert!(ok.deliver(&notification()).await.is_ok());

        let failing = CommandSink::new("false").unwrap();
        assert!(matches!(
            failing.deliver(&notification()).await,
            Err(IntouchError::Notify(_))
        ));

        let missing = CommandSink::new("__intouch_no_such_notifier__").unwrap();
        assert!(missing.deliver(&notification()).await.is_err());
    }
}
