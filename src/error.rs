// Domain error taxonomy
// Every failure the core can produce maps to a stable machine-readable kind
// plus a human-readable detail string. Validation errors are raised before
// any write; apply-time errors during review roll the whole transaction back.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing node/era/brand/edit/user lookup.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique-constraint violation (era year, sponsor rank/brand, legal name).
    #[error("duplicate {what}")]
    Duplicate { what: String },

    /// Out-of-range or malformed field value.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Lineage event with neither endpoint set.
    #[error("at least one of previous_id or next_id must be set")]
    MissingEndpoint,

    /// Lineage event pointing a node at itself.
    #[error("cannot create circular lineage event")]
    CircularReference,

    /// Event year outside the lifespan of a connected node.
    #[error("timeline violation: {0}")]
    TimelineViolation(String),

    /// MERGE without a successor, SPLIT without an origin.
    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    /// Merge/split source has no era registered in the operation year.
    #[error("team not active: {0}")]
    TeamNotActive(String),

    /// Sponsor prominence for an era would exceed 100%.
    #[error("adding {requested}% would exceed 100% total prominence (current total: {current}%)")]
    ProminenceExceeded { current: i64, requested: i64 },

    /// Role/ban gate rejected the operation before any record was created.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Review-time application error; the review transaction was rolled back
    /// and the edit remains pending.
    #[error("failed to apply edit: {0}")]
    ApplyFailure(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn duplicate(what: impl Into<String>) -> Self {
        DomainError::Duplicate { what: what.into() }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable error code, independent of the Display text.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::Duplicate { .. } => "duplicate",
            DomainError::InvalidField { .. } => "invalid_field",
            DomainError::MissingEndpoint => "missing_endpoint",
            DomainError::CircularReference => "circular_reference",
            DomainError::TimelineViolation(_) => "timeline_violation",
            DomainError::InvalidEventType(_) => "invalid_event_type",
            DomainError::TeamNotActive(_) => "team_not_active",
            DomainError::ProminenceExceeded { .. } => "prominence_exceeded",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::ApplyFailure(_) => "apply_failure",
            DomainError::Storage(_) => "storage_error",
            DomainError::Serialization(_) => "serialization_error",
        }
    }
}

/// Map a SQLite constraint violation to `Duplicate`, everything else to
/// `Storage`. The store pre-checks uniqueness, so this only fires when a
/// concurrent write slips between the check and the insert.
pub(crate) fn constraint_to_duplicate(err: rusqlite::Error, what: &str) -> DomainError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DomainError::duplicate(what)
        }
        _ => DomainError::Storage(err),
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

// ============================================================================
// TESTS
// ============================================================================
