// Sponsor entities - master company, brand names, and per-era links
//
// SponsorMaster is the legal parent company; SponsorBrand is a name it
// sponsors under. A TeamSponsorLink attaches a brand to one era with a rank
// (1 = primary) and a jersey prominence percentage. Per era: ranks unique,
// brands unique, prominence sum capped at 100.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Legal parent company behind one or more sponsor brands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorMaster {
    pub id: String,
    pub legal_name: String,
    pub industry_sector: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SponsorMaster {
    pub fn new(legal_name: &str, industry_sector: Option<String>) -> Self {
        SponsorMaster {
            id: uuid::Uuid::new_v4().to_string(),
            legal_name: legal_name.trim().to_string(),
            industry_sector,
            created_at: Utc::now(),
        }
    }
}

/// Brand name under a sponsor master, with a default jersey color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorBrand {
    pub id: String,
    pub master_id: String,
    pub brand_name: String,
    /// `#RRGGBB`
    pub default_hex_color: String,
    pub created_at: DateTime<Utc>,
}

impl SponsorBrand {
    pub fn new(master_id: &str, brand_name: &str, default_hex_color: &str) -> Self {
        SponsorBrand {
            id: uuid::Uuid::new_v4().to_string(),
            master_id: master_id.to_string(),
            brand_name: brand_name.trim().to_string(),
            default_hex_color: default_hex_color.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Association between a team era and a sponsor brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorLink {
    pub id: String,
    pub era_id: String,
    pub brand_id: String,
    /// Ranking position, 1 = primary sponsor. Unique per era.
    pub rank_order: i32,
    /// Share of jersey prominence, 1-100. Per-era sum must stay <= 100.
    pub prominence_percent: i32,
    pub created_at: DateTime<Utc>,
}

impl SponsorLink {
    pub fn new(era_id: &str, brand_id: &str, rank_order: i32, prominence_percent: i32) -> Self {
        SponsorLink {
            id: uuid::Uuid::new_v4().to_string(),
            era_id: era_id.to_string(),
            brand_id: brand_id.to_string(),
            rank_order,
            prominence_percent,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// FIELD VALIDATION
// ============================================================================

pub(crate) fn validate_hex_color(value: &str) -> Result<()> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(DomainError::invalid(
            "default_hex_color",
            format!("invalid hex color format: {}. Must be #RRGGBB format", value),
        ));
    }
    Ok(())
}

pub(crate) fn validate_rank_order(rank: i32) -> Result<()> {
    if rank < 1 {
        return Err(DomainError::invalid("rank_order", "must be >= 1"));
    }
    Ok(())
}

pub(crate) fn validate_prominence(percent: i32) -> Result<()> {
    if !(1..=100).contains(&percent) {
        return Err(DomainError::invalid(
            "prominence_percent",
            "must be between 1 and 100",
        ));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
