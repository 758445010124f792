//! Commit identifier
//!
//! Identifiers are opaque strings handed over by the version control tool. In practice
//! they are 40 hex characters, but the graph engine never relies on that.
//!
//! ## Format
//!
//! - Full: whatever the tool produced (e.g., "abc123...def")
//! - Short: first 6 characters (e.g., "abc123")

use crate::artifacts::objects::{SHORT_ID_LENGTH, UNCOMMITTED_ID};
use serde::{Deserialize, Serialize};

/// Commit identifier
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Parse a commit identifier
    ///
    /// # Arguments
    ///
    /// * `id` - Non-empty identifier without whitespace
    ///
    /// # Returns
    ///
    /// The identifier or an error when it is empty or contains whitespace
    pub fn try_parse(id: impl Into<String>) -> anyhow::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            anyhow::bail!("commit id cannot be empty");
        }
        if id.chars().any(char::is_whitespace) {
            anyhow::bail!("invalid commit id: {:?}", id);
        }
        Ok(Self(id))
    }

    /// Identifier of the virtual row describing uncommitted changes
    pub fn uncommitted() -> Self {
        Self(UNCOMMITTED_ID.to_string())
    }

    pub fn is_uncommitted(&self) -> bool {
        self.0 == UNCOMMITTED_ID
    }

    /// Get abbreviated form of the commit id
    ///
    /// # Returns
    ///
    /// First 6 characters, or the whole id when it is shorter
    pub fn to_short_id(&self) -> String {
        self.0.chars().take(SHORT_ID_LENGTH).collect()
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    #[test]
    fn short_id_of_a_tiny_id_is_the_id_itself() {
        let id = CommitId::try_parse("c1").unwrap();
        assert_eq!(id.to_short_id(), "c1");
    }

    #[test]
    fn uncommitted_id_is_forty_zeros() {
        let id = CommitId::uncommitted();
        assert!(id.is_uncommitted());
        assert_eq!(id.as_ref().len(), 40);
        assert_eq!(id.to_short_id(), "000000");
    }

    #[test]
    fn empty_or_spaced_ids_are_rejected() {
        assert!(CommitId::try_parse("").is_err());
        assert!(CommitId::try_parse("ab cd").is_err());
    }

    proptest! {
        #[test]
        fn short_id_is_a_prefix(id in "[0-9a-f]{6,40}") {
            let commit_id = CommitId::try_parse(id.clone()).unwrap();
            assert!(id.starts_with(&commit_id.to_short_id()));
            assert_eq!(commit_id.to_short_id().len(), 6);
        }
    }
}
