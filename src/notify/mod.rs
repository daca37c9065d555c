pub mod format;
pub mod telegram;

use anyhow::Result;

/// Outbound channel. The core only cares whether delivery succeeded.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fallback when no channel is configured: messages go to the log only.
/// Delivery always succeeds, so milestones are still marked.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, text: &str) -> Result<()> {
        tracing::info!(target: "notify", chars = text.chars().count(), "{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
