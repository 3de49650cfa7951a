// Team Node - the persistent legal/managerial entity
//
// A node survives renamings: "Team Sky" and "Ineos Grenadiers" are two eras
// of the same node. Nodes are dissolved (never deleted) when merged or split
// away, so historical lineage edges stay resolvable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// No professional team predates organized racing in this model.
pub const MIN_FOUNDING_YEAR: i32 = 1900;

/// Persistent managerial entity that survives name changes.
///
/// Identity: UUID (never changes)
/// Lifespan: founding_year..=dissolution_year (open-ended while active)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamNode {
    /// Stable identity (UUID) - NEVER changes
    pub id: String,

    pub founding_year: i32,

    /// None = still active. Set when the node is merged or split away.
    pub dissolution_year: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamNode {
    pub fn new(founding_year: i32) -> Self {
        let now = Utc::now();
        TeamNode {
            id: uuid::Uuid::new_v4().to_string(),
            founding_year,
            dissolution_year: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_dissolved(&self) -> bool {
        self.dissolution_year.is_some()
    }

    /// Whether the node existed (founded, not yet dissolved) in a given season.
    pub fn active_in(&self, year: i32) -> bool {
        year >= self.founding_year && self.dissolution_year.map_or(true, |d| year <= d)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_active() {
        let node = TeamNode::new(2000);
        assert!(!node.is_dissolved());
        assert!(node.active_in(2000));
        assert!(node.active_in(2050));
        assert!(!node.active_in(1999));
    }

    #[test]
    fn test_dissolved_node_lifespan() {
        let mut node = TeamNode::new(2000);
        node.dissolution_year = Some(2010);
        assert!(node.is_dissolved());
        assert!(node.active_in(2010));
        assert!(!node.active_in(2011));
    }
}
