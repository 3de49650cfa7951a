// Lineage Event - directed, dated edge between team nodes
//
// Records how identity flows between nodes: plain legal transfer, spiritual
// succession (no legal continuity), merge (many -> one), split (one -> many).
// A merge/split is fundamentally multi-edge but is authored one edge at a
// time; the lineage engine canonicalizes the group afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// EVENT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 1-to-1 legal continuity (license transfer, rebrand across nodes).
    LegalTransfer,
    /// Successor claims the heritage without legal continuity.
    SpiritualSuccession,
    /// Many predecessors fold into one successor.
    Merge,
    /// One predecessor fans out into many successors.
    Split,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::LegalTransfer => "LEGAL_TRANSFER",
            EventType::SpiritualSuccession => "SPIRITUAL_SUCCESSION",
            EventType::Merge => "MERGE",
            EventType::Split => "SPLIT",
        }
    }

    pub fn parse(value: &str) -> Option<EventType> {
        match value {
            "LEGAL_TRANSFER" => Some(EventType::LegalTransfer),
            "SPIRITUAL_SUCCESSION" => Some(EventType::SpiritualSuccession),
            "MERGE" => Some(EventType::Merge),
            "SPLIT" => Some(EventType::Split),
            _ => None,
        }
    }
}

// ============================================================================
// LINEAGE EVENT
// ============================================================================

/// Directed, dated edge between at most two nodes. At least one endpoint is
/// always set and the endpoints always differ. Only the type and notes are
/// ever mutated, and only by canonicalization right after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEvent {
    pub id: String,
    pub previous_node_id: Option<String>,
    pub next_node_id: Option<String>,
    pub event_year: i32,
    pub event_type: EventType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LineageEvent {
    pub fn new(
        previous_node_id: Option<&str>,
        next_node_id: Option<&str>,
        event_year: i32,
        event_type: EventType,
        notes: Option<String>,
    ) -> Self {
        LineageEvent {
            id: uuid::Uuid::new_v4().to_string(),
            previous_node_id: previous_node_id.map(str::to_string),
            next_node_id: next_node_id.map(str::to_string),
            event_year,
            event_type,
            notes,
            created_at: Utc::now(),
        }
    }

    /// Both endpoints present: the edge can be drawn in a projection.
    pub fn is_fully_bound(&self) -> bool {
        self.previous_node_id.is_some() && self.next_node_id.is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================
