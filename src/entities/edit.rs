// Edit - proposed mutation with an audit trail
//
// Edits are never deleted. Status moves PENDING -> APPROVED or
// PENDING -> REJECTED, both terminal; trusted/admin submissions are created
// directly as APPROVED. The payload is a closed tagged variant so dispatch
// is an exhaustive match, not dynamic lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::era::{MetadataChanges, Tier};

// ============================================================================
// EDIT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditStatus {
    Pending,
    Approved,
    Rejected,
}

impl EditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EditStatus::Pending => "PENDING",
            EditStatus::Approved => "APPROVED",
            EditStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<EditStatus> {
        match value {
            "PENDING" => Some(EditStatus::Pending),
            "APPROVED" => Some(EditStatus::Approved),
            "REJECTED" => Some(EditStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != EditStatus::Pending
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// New team descriptor inside a split request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeamSpec {
    pub name: String,
    pub tier: Tier,
}

/// Fold several source nodes into one new team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub source_node_ids: Vec<String>,
    pub merge_year: i32,
    pub new_team_name: String,
    pub new_team_tier: Tier,
}

/// Fan one source node out into several new teams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub source_node_id: String,
    pub split_year: i32,
    pub new_teams: Vec<NewTeamSpec>,
}

/// The proposed mutation itself. One apply routine per variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EditPayload {
    Metadata {
        era_id: String,
        changes: MetadataChanges,
    },
    Merge(MergeRequest),
    Split(SplitRequest),
}

/// Discriminant stored alongside the serialized payload so the moderation
/// queue can be filtered without deserializing every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    Metadata,
    Merge,
    Split,
}

impl EditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EditKind::Metadata => "METADATA",
            EditKind::Merge => "MERGE",
            EditKind::Split => "SPLIT",
        }
    }

    pub fn parse(value: &str) -> Option<EditKind> {
        match value {
            "METADATA" => Some(EditKind::Metadata),
            "MERGE" => Some(EditKind::Merge),
            "SPLIT" => Some(EditKind::Split),
            _ => None,
        }
    }
}

impl EditPayload {
    pub fn kind(&self) -> EditKind {
        match self {
            EditPayload::Metadata { .. } => EditKind::Metadata,
            EditPayload::Merge(_) => EditKind::Merge,
            EditPayload::Split(_) => EditKind::Split,
        }
    }

    /// Era this edit targets, when it targets one directly.
    pub fn target_era_id(&self) -> Option<&str> {
        match self {
            EditPayload::Metadata { era_id, .. } => Some(era_id),
            _ => None,
        }
    }

    /// Node this edit targets, when it targets one directly.
    pub fn target_node_id(&self) -> Option<&str> {
        match self {
            EditPayload::Split(req) => Some(&req.source_node_id),
            _ => None,
        }
    }
}

// ============================================================================
// EDIT RECORD
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    pub id: String,
    pub user_id: String,
    pub payload: EditPayload,
    pub reason: String,
    pub status: EditStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Edit {
    pub fn new(user_id: &str, payload: EditPayload, reason: &str) -> Self {
        Edit {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            payload,
            reason: reason.to_string(),
            status: EditStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: Utc::now(),
        }
    }
}

/// What the workflow hands back to the submitting or reviewing caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutcome {
    pub edit_id: String,
    pub status: EditStatus,
    pub message: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_terminal() {
        assert!(!EditStatus::Pending.is_terminal());
        assert!(EditStatus::Approved.is_terminal());
        assert!(EditStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_payload_kind_and_targets() {
        let payload = EditPayload::Metadata {
            era_id: "era-1".to_string(),
            changes: MetadataChanges::default(),
        };
        assert_eq!(payload.kind(), EditKind::Metadata);
        assert_eq!(payload.target_era_id(), Some("era-1"));
        assert_eq!(payload.target_node_id(), None);

        let split = EditPayload::Split(SplitRequest {
            source_node_id: "node-1".to_string(),
            split_year: 2020,
            new_teams: vec![],
        });
        assert_eq!(split.kind(), EditKind::Split);
        assert_eq!(split.target_node_id(), Some("node-1"));
    }

    #[test]
    fn test_payload_json_round_trip() {
        let payload = EditPayload::Merge(MergeRequest {
            source_node_ids: vec!["a".to_string(), "b".to_string()],
            merge_year: 2013,
            new_team_name: "United Team".to_string(),
            new_team_tier: Tier::WorldTour,
        });
        let json = serde_json::to_string(&payload).unwrap();
        let back: EditPayload = serde_json::from_str(&json).unwrap();
        match back {
            EditPayload::Merge(req) => {
                assert_eq!(req.source_node_ids.len(), 2);
                assert_eq!(req.new_team_name, "United Team");
            }
            _ => panic!("wrong variant"),
        }
    }
}
