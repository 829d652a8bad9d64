use anyhow::{anyhow, Result};
use async_trait::async_trait;

// =============================================================================
// ChatModel Trait
// =============================================================================

/// A chat-completion model: system instructions plus user content in, one
/// free-text completion out. Every model-facing component is written against
/// this seam so tests can script replies without network access.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

// =============================================================================
// UnconfiguredModel
// =============================================================================

/// Stand-in for when no inference API key is configured. Every call fails,
/// which sends callers down their existing degrade branches instead of
/// crashing the process.
pub struct UnconfiguredModel;

#[async_trait]
impl ChatModel for UnconfiguredModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(anyhow!("Inference credentials not configured"))
    }
}
