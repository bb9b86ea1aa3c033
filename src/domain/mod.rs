//! Pure production-domain logic: closed status vocabularies, transition
//! guards, material requirement math, scheduling and document numbering.
//!
//! Nothing in here performs I/O. Services load records, ask this layer
//! whether a transition is legal and what it produces, then persist.

pub mod batch;
pub mod calculator;
pub mod delivery;
pub mod inventory;
pub mod issue;
pub mod numbering;
pub mod production;
pub mod schedule;

pub use batch::BatchStatus;
pub use calculator::{MaterialRequirements, MaterialShortfall, WindowLine};
pub use delivery::DeliveryStatus;
pub use inventory::{MaterialType, MovementDirection};
pub use issue::{IssueImpact, IssueSeverity, IssueStatus, IssueType};
pub use production::{Priority, ProductionStatus, SourceType};

/// A requested state change that the current status does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} {entity} in status {from}")]
pub struct IllegalTransition {
    pub entity: &'static str,
    pub action: String,
    pub from: String,
}

impl IllegalTransition {
    pub fn new(entity: &'static str, action: impl Into<String>, from: impl ToString) -> Self {
        Self {
            entity,
            action: action.into(),
            from: from.to_string(),
        }
    }
}

/// Deserializes a closed vocabulary through its alias table. Legacy spellings
/// are accepted on input; serialization always writes the canonical name.
pub(crate) fn deserialize_alias<'de, D, T>(
    deserializer: D,
    resolve: fn(&str) -> Option<T>,
    vocabulary: &'static str,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = String::deserialize(deserializer)?;
    resolve(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown {} `{}`", vocabulary, raw)))
}
