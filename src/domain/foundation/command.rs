//! Who ran a fee operation, and why.
//!
//! Mutating handlers take a [`CommandMetadata`] next to the command. Every
//! history row written by that command copies its actor, reason, source and
//! correlation id, so one batch can be traced as a unit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ```ignore
/// let metadata = CommandMetadata::new("treasurer@club")
///     .with_reason("category price change")
///     .with_source("cli");
///
/// handler.handle(cmd, metadata).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Staff member or system process executing the command.
    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,

    /// Shared by every history row of one command.
    correlation_id: String,

    /// Entry point, e.g. "cli" or "scheduler".
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Metadata for `actor` with a fresh correlation id.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            reason: None,
            correlation_id: Uuid::new_v4().to_string(),
            source: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Reuses an id issued upstream instead of the generated one.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn correlation_id(&self) -> String {
        self.correlation_id.clone()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
impl CommandMetadata {
    pub fn test_fixture() -> Self {
        Self::new("test-treasurer")
            .with_correlation_id("test-correlation-id")
            .with_source("test")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_actor_only() {
        let metadata = CommandMetadata::new("treasurer");

        assert_eq!(metadata.actor, "treasurer");
        assert!(metadata.reason().is_none());
        assert!(metadata.source().is_none());
    }

    #[test]
    fn builder_chain_sets_all_fields() {
        let metadata = CommandMetadata::new("treasurer")
            .with_reason("category price change")
            .with_correlation_id("corr-123")
            .with_source("api");

        assert_eq!(metadata.reason(), Some("category price change"));
        assert_eq!(metadata.correlation_id(), "corr-123");
        assert_eq!(metadata.source(), Some("api"));
    }

    #[test]
    fn generated_correlation_id_is_stable() {
        let metadata = CommandMetadata::new("system");
        assert!(!metadata.correlation_id().is_empty());
        assert_eq!(metadata.correlation_id(), metadata.correlation_id());
        assert_ne!(
            metadata.correlation_id(),
            CommandMetadata::new("system").correlation_id()
        );
    }

    #[test]
    fn serialization_skips_unset_optionals() {
        let json = serde_json::to_string(&CommandMetadata::new("system")).unwrap();

        assert!(json.contains("actor"));
        assert!(json.contains("correlation_id"));
        assert!(!json.contains("reason"));
        assert!(!json.contains("source"));
    }
}
