// Entity Models
// "Identity persists, values change": a TeamNode is the stable identity that
// survives rebrands; each TeamEra is a season-scoped value of that identity.

pub mod edit;
pub mod era;
pub mod lineage;
pub mod node;
pub mod sponsor;
pub mod user;

pub use edit::{
    Edit, EditKind, EditOutcome, EditPayload, EditStatus, MergeRequest, NewTeamSpec, SplitRequest,
};
pub use era::{MetadataChanges, TeamEra, Tier, MAX_SEASON_YEAR, MIN_SEASON_YEAR};
pub use lineage::{EventType, LineageEvent};
pub use node::{TeamNode, MIN_FOUNDING_YEAR};
pub use sponsor::{SponsorBrand, SponsorLink, SponsorMaster};
pub use user::{User, UserRole, PROMOTION_THRESHOLD};
