// Team Era - a season-scoped snapshot of a node's public identity
//
// The (node, season_year) pair is unique: a team registers exactly one
// identity per season. Eras flagged as manual overrides are human-curated
// and must never be silently overwritten by automated ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

pub const MIN_SEASON_YEAR: i32 = 1900;
pub const MAX_SEASON_YEAR: i32 = 2100;

// ============================================================================
// TIER
// ============================================================================

/// Competitive tier of a registered team. Closed set; stored as its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Top division (WorldTour)
    WorldTour,
    /// Second division (ProTeam)
    ProTeam,
    /// Third division (Continental)
    Continental,
}

impl Tier {
    pub fn level(self) -> i32 {
        match self {
            Tier::WorldTour => 1,
            Tier::ProTeam => 2,
            Tier::Continental => 3,
        }
    }

    pub fn from_level(level: i32) -> Option<Tier> {
        match level {
            1 => Some(Tier::WorldTour),
            2 => Some(Tier::ProTeam),
            3 => Some(Tier::Continental),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::WorldTour => "WorldTour",
            Tier::ProTeam => "ProTeam",
            Tier::Continental => "Continental",
        }
    }
}

// ============================================================================
// TEAM ERA
// ============================================================================

/// One season's registered identity of a [`super::TeamNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEra {
    pub id: String,
    pub node_id: String,
    pub season_year: i32,

    /// Registered name for this season (non-empty, trimmed).
    pub registered_name: String,

    /// Federation code: exactly 3 uppercase ASCII letters when present.
    pub uci_code: Option<String>,

    pub tier: Option<Tier>,

    /// Provenance tag: which scraper/curator produced this row.
    pub source_origin: Option<String>,

    /// Human-curated flag. Once set, automated ingestion must not touch
    /// this era.
    pub is_manual_override: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamEra {
    pub fn new(
        node_id: &str,
        season_year: i32,
        registered_name: &str,
        uci_code: Option<String>,
        tier: Option<Tier>,
        source_origin: Option<String>,
        is_manual_override: bool,
    ) -> Self {
        let now = Utc::now();
        TeamEra {
            id: uuid::Uuid::new_v4().to_string(),
            node_id: node_id.to_string(),
            season_year,
            registered_name: registered_name.trim().to_string(),
            uci_code,
            tier,
            source_origin,
            is_manual_override,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// FIELD VALIDATION
// ============================================================================

pub(crate) fn validate_season_year(year: i32) -> Result<()> {
    if !(MIN_SEASON_YEAR..=MAX_SEASON_YEAR).contains(&year) {
        return Err(DomainError::invalid(
            "season_year",
            format!("must be between {} and {}", MIN_SEASON_YEAR, MAX_SEASON_YEAR),
        ));
    }
    Ok(())
}

pub(crate) fn validate_registered_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid("registered_name", "cannot be empty"));
    }
    Ok(trimmed)
}

pub(crate) fn validate_uci_code(code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(DomainError::invalid(
            "uci_code",
            "must be exactly 3 uppercase letters",
        ));
    }
    Ok(())
}

// ============================================================================
// METADATA CHANGES
// ============================================================================

/// Field-level change set carried by a metadata edit. Only the set fields
/// are applied; an all-empty change set is rejected at submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataChanges {
    pub registered_name: Option<String>,
    pub uci_code: Option<String>,
    pub tier: Option<Tier>,
}

impl MetadataChanges {
    pub fn is_empty(&self) -> bool {
        self.registered_name.is_none() && self.uci_code.is_none() && self.tier.is_none()
    }

    /// Validate every field that is present.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.registered_name {
            validate_registered_name(name)?;
        }
        if let Some(code) = &self.uci_code {
            validate_uci_code(code)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
