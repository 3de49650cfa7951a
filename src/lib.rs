// Team Lineage - Core Library
// Historical identity graph for sports franchises: nodes survive rebrands,
// eras carry each season's registered identity, lineage events connect
// predecessor teams to successors across merges and splits.

pub mod entities;
pub mod error;
pub mod ingest;
pub mod lineage;
pub mod moderation;
pub mod store;
pub mod timeline;

// Re-export commonly used types
pub use entities::{
    Edit, EditKind, EditOutcome, EditPayload, EditStatus, EventType, LineageEvent,
    MergeRequest, MetadataChanges, NewTeamSpec, SplitRequest, SponsorBrand, SponsorLink,
    SponsorMaster, TeamEra, TeamNode, Tier, User, UserRole,
};
pub use error::{DomainError, Result};
pub use ingest::{upsert_era, upsert_roster, IngestOutcome, IngestReport, ScrapedTeam};
pub use lineage::{LineageChain, LineageEngine};
pub use moderation::{ModerationStats, ModerationWorkflow};
pub use store::GraphStore;
pub use timeline::{
    content_hash, Projection, ProjectionKey, TimelineCache, TimelineGraph, TimelineProjector,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
