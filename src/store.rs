// GraphStore - transactional entity store over SQLite
//
// Holds nodes, eras, sponsors, lineage events, edits and users. Invariants
// are enforced twice: as ordered pre-checks here (so callers get a typed
// domain error) and as schema constraints (so a concurrent write that slips
// past a pre-check still cannot corrupt state).
//
// Multi-statement operations run inside a single transaction. `*_raw`
// variants execute without opening a transaction so the moderation workflow
// and lineage engine can compose them inside their own transaction; the
// public wrappers open the transaction, commit, and invalidate the timeline
// cache.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::entities::era::{validate_registered_name, validate_season_year, validate_uci_code};
use crate::entities::sponsor::{validate_hex_color, validate_prominence, validate_rank_order};
use crate::entities::{
    Edit, EditPayload, EditStatus, EventType, LineageEvent, MetadataChanges, SponsorBrand,
    SponsorLink, SponsorMaster, TeamEra, TeamNode, Tier, User, UserRole, MIN_FOUNDING_YEAR,
};
use crate::error::{constraint_to_duplicate, DomainError, Result};
use crate::timeline::TimelineCache;

pub struct GraphStore {
    conn: Connection,
    cache: Arc<TimelineCache>,
}

impl GraphStore {
    /// Open (or create) a store backed by a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // WAL for crash recovery on file-backed stores
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and ephemeral tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        setup_schema(&conn)?;
        Ok(GraphStore {
            conn,
            cache: Arc::new(TimelineCache::default()),
        })
    }

    /// Shared timeline cache. Exposed so operators can invalidate manually
    /// and so the projector can read through it.
    pub fn cache(&self) -> &Arc<TimelineCache> {
        &self.cache
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Called at the end of every successful mutating transaction. A commit
    /// that skipped this would serve stale projections, so mutation wrappers
    /// must not return before it runs.
    pub(crate) fn invalidate_timeline(&self) {
        self.cache.invalidate_all();
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub fn create_user(&self, display_name: &str, role: UserRole) -> Result<User> {
        let user = User::new(display_name, role);
        self.conn.execute(
            "INSERT INTO users (id, display_name, role, approved_edits_count, is_banned, banned_reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.display_name,
                user.role.as_str(),
                user.approved_edits_count,
                user.is_banned as i32,
                user.banned_reason,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, display_name, role, approved_edits_count, is_banned, banned_reason, created_at
                 FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    pub fn set_user_ban(&self, id: &str, banned: bool, reason: Option<&str>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET is_banned = ?2, banned_reason = ?3 WHERE id = ?1",
            params![id, banned as i32, reason],
        )?;
        if changed == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    /// Increment the approved-edit counter, returning the new count.
    pub(crate) fn bump_approved_count_raw(&self, user_id: &str) -> Result<i64> {
        let changed = self.conn.execute(
            "UPDATE users SET approved_edits_count = approved_edits_count + 1 WHERE id = ?1",
            params![user_id],
        )?;
        if changed == 0 {
            return Err(DomainError::not_found("user", user_id));
        }
        let count = self.conn.query_row(
            "SELECT approved_edits_count FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub(crate) fn set_user_role_raw(&self, user_id: &str, role: UserRole) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    // ========================================================================
    // NODES
    // ========================================================================

    pub fn create_node(&self, founding_year: i32) -> Result<TeamNode> {
        let tx = self.conn.unchecked_transaction()?;
        let node = self.create_node_raw(founding_year)?;
        tx.commit()?;
        self.invalidate_timeline();
        Ok(node)
    }

    pub(crate) fn create_node_raw(&self, founding_year: i32) -> Result<TeamNode> {
        if founding_year < MIN_FOUNDING_YEAR {
            return Err(DomainError::invalid(
                "founding_year",
                format!("must be >= {}", MIN_FOUNDING_YEAR),
            ));
        }
        let node = TeamNode::new(founding_year);
        self.conn.execute(
            "INSERT INTO team_node (id, founding_year, dissolution_year, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                node.id,
                node.founding_year,
                node.dissolution_year,
                node.created_at.to_rfc3339(),
                node.updated_at.to_rfc3339(),
            ],
        )?;
        debug!(node_id = %node.id, founding_year, "created team node");
        Ok(node)
    }

    pub fn get_node(&self, id: &str) -> Result<TeamNode> {
        self.conn
            .query_row(
                "SELECT id, founding_year, dissolution_year, created_at, updated_at
                 FROM team_node WHERE id = ?1",
                params![id],
                row_to_node,
            )
            .optional()?
            .ok_or_else(|| DomainError::not_found("node", id))
    }

    /// Node together with its eras in season order.
    pub fn node_with_eras(&self, id: &str) -> Result<(TeamNode, Vec<TeamEra>)> {
        let node = self.get_node(id)?;
        let eras = self.eras_for_node(id)?;
        Ok((node, eras))
    }

    pub fn all_nodes(&self) -> Result<Vec<TeamNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, founding_year, dissolution_year, created_at, updated_at FROM team_node",
        )?;
        let nodes = stmt
            .query_map([], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    /// Set the dissolution year. A node is dissolved when merged or split
    /// away; it is never physically removed while referenced.
    pub fn dissolve_node(&self, id: &str, year: i32) -> Result<TeamNode> {
        let tx = self.conn.unchecked_transaction()?;
        let node = self.dissolve_node_raw(id, year)?;
        tx.commit()?;
        self.invalidate_timeline();
        Ok(node)
    }

    pub(crate) fn dissolve_node_raw(&self, id: &str, year: i32) -> Result<TeamNode> {
        let mut node = self.get_node(id)?;
        if year < node.founding_year {
            return Err(DomainError::invalid(
                "dissolution_year",
                format!("cannot precede founding year {}", node.founding_year),
            ));
        }
        let now = Utc::now();
        self.conn.execute(
            "UPDATE team_node SET dissolution_year = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, year, now.to_rfc3339()],
        )?;
        node.dissolution_year = Some(year);
        node.updated_at = now;
        debug!(node_id = %id, year, "dissolved team node");
        Ok(node)
    }

    // ========================================================================
    // ERAS
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn create_era(
        &self,
        node_id: &str,
        season_year: i32,
        registered_name: &str,
        uci_code: Option<&str>,
        tier: Option<Tier>,
        source_origin: Option<&str>,
        is_manual_override: bool,
    ) -> Result<TeamEra> {
        let tx = self.conn.unchecked_transaction()?;
        let era = self.create_era_raw(
            node_id,
            season_year,
            registered_name,
            uci_code,
            tier,
            source_origin,
            is_manual_override,
        )?;
        tx.commit()?;
        self.invalidate_timeline();
        Ok(era)
    }

    /// Ordered precondition chain: field shape, node existence, duplicate
    /// (node, season) check, then the insert.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_era_raw(
        &self,
        node_id: &str,
        season_year: i32,
        registered_name: &str,
        uci_code: Option<&str>,
        tier: Option<Tier>,
        source_origin: Option<&str>,
        is_manual_override: bool,
    ) -> Result<TeamEra> {
        validate_season_year(season_year)?;
        let name = validate_registered_name(registered_name)?;
        if let Some(code) = uci_code {
            validate_uci_code(code)?;
        }
        self.get_node(node_id)?;
        if self.era_for_node_year(node_id, season_year)?.is_some() {
            return Err(DomainError::duplicate(format!(
                "era for node {} and year {}",
                node_id, season_year
            )));
        }

        let era = TeamEra::new(
            node_id,
            season_year,
            name,
            uci_code.map(str::to_string),
            tier,
            source_origin.map(str::to_string),
            is_manual_override,
        );
        self.conn
            .execute(
                "INSERT INTO team_era (id, node_id, season_year, registered_name, uci_code,
                                       tier_level, source_origin, is_manual_override, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    era.id,
                    era.node_id,
                    era.season_year,
                    era.registered_name,
                    era.uci_code,
                    era.tier.map(Tier::level),
                    era.source_origin,
                    era.is_manual_override as i32,
                    era.created_at.to_rfc3339(),
                    era.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| constraint_to_duplicate(e, "era for node and season year"))?;
        debug!(era_id = %era.id, node_id, season_year, name = %era.registered_name, "created era");
        Ok(era)
    }

    pub fn get_era(&self, id: &str) -> Result<TeamEra> {
        self.conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_ERA), params![id], row_to_era)
            .optional()?
            .ok_or_else(|| DomainError::not_found("era", id))
    }

    pub fn eras_for_node(&self, node_id: &str) -> Result<Vec<TeamEra>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE node_id = ?1 ORDER BY season_year", SELECT_ERA))?;
        let eras = stmt
            .query_map(params![node_id], row_to_era)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(eras)
    }

    pub fn eras_by_year(&self, year: i32) -> Result<Vec<TeamEra>> {
        validate_season_year(year)?;
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE season_year = ?1 ORDER BY registered_name",
            SELECT_ERA
        ))?;
        let eras = stmt
            .query_map(params![year], row_to_era)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(eras)
    }

    pub fn era_for_node_year(&self, node_id: &str, year: i32) -> Result<Option<TeamEra>> {
        let era = self
            .conn
            .query_row(
                &format!("{} WHERE node_id = ?1 AND season_year = ?2", SELECT_ERA),
                params![node_id, year],
                row_to_era,
            )
            .optional()?;
        Ok(era)
    }

    /// Lookup used by ingestion: an era registered under this exact name in
    /// this season, if any.
    pub fn find_era_by_name_year(&self, name: &str, year: i32) -> Result<Option<TeamEra>> {
        let era = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE registered_name = ?1 AND season_year = ?2",
                    SELECT_ERA
                ),
                params![name.trim(), year],
                row_to_era,
            )
            .optional()?;
        Ok(era)
    }

    /// Apply a curated change set. Pins provenance to the acting user and
    /// sets the manual-override flag so later ingestion leaves the era alone.
    pub(crate) fn apply_era_changes_raw(
        &self,
        era_id: &str,
        changes: &MetadataChanges,
        editor_user_id: &str,
    ) -> Result<TeamEra> {
        changes.validate()?;
        let mut era = self.get_era(era_id)?;

        if let Some(name) = &changes.registered_name {
            era.registered_name = name.trim().to_string();
        }
        if let Some(code) = &changes.uci_code {
            era.uci_code = Some(code.clone());
        }
        if let Some(tier) = changes.tier {
            era.tier = Some(tier);
        }
        era.is_manual_override = true;
        era.source_origin = Some(format!("user_{}", editor_user_id));
        era.updated_at = Utc::now();

        self.conn.execute(
            "UPDATE team_era
             SET registered_name = ?2, uci_code = ?3, tier_level = ?4,
                 source_origin = ?5, is_manual_override = 1, updated_at = ?6
             WHERE id = ?1",
            params![
                era.id,
                era.registered_name,
                era.uci_code,
                era.tier.map(Tier::level),
                era.source_origin,
                era.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(era)
    }

    /// Ingestion-side update: refreshes scraped fields without touching the
    /// manual-override flag. Callers must check that flag first.
    pub(crate) fn refresh_era_from_ingest_raw(
        &self,
        era_id: &str,
        uci_code: Option<&str>,
        tier: Option<Tier>,
        source_origin: &str,
    ) -> Result<TeamEra> {
        let mut era = self.get_era(era_id)?;
        if let Some(code) = uci_code {
            validate_uci_code(code)?;
            era.uci_code = Some(code.to_string());
        }
        if let Some(tier) = tier {
            era.tier = Some(tier);
        }
        era.source_origin = Some(source_origin.to_string());
        era.updated_at = Utc::now();
        self.conn.execute(
            "UPDATE team_era
             SET uci_code = ?2, tier_level = ?3, source_origin = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                era.id,
                era.uci_code,
                era.tier.map(Tier::level),
                era.source_origin,
                era.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(era)
    }

    // ========================================================================
    // SPONSORS
    // ========================================================================

    pub fn create_sponsor_master(
        &self,
        legal_name: &str,
        industry_sector: Option<&str>,
    ) -> Result<SponsorMaster> {
        let name = legal_name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("legal_name", "cannot be empty"));
        }
        let master = SponsorMaster::new(name, industry_sector.map(str::to_string));
        self.conn
            .execute(
                "INSERT INTO sponsor_master (id, legal_name, industry_sector, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    master.id,
                    master.legal_name,
                    master.industry_sector,
                    master.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| constraint_to_duplicate(e, "sponsor legal name"))?;
        Ok(master)
    }

    pub fn create_sponsor_brand(
        &self,
        master_id: &str,
        brand_name: &str,
        default_hex_color: &str,
    ) -> Result<SponsorBrand> {
        let name = brand_name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("brand_name", "cannot be empty"));
        }
        validate_hex_color(default_hex_color)?;
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sponsor_master WHERE id = ?1",
                params![master_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DomainError::not_found("sponsor master", master_id));
        }
        let brand = SponsorBrand::new(master_id, name, default_hex_color);
        self.conn
            .execute(
                "INSERT INTO sponsor_brand (id, master_id, brand_name, default_hex_color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    brand.id,
                    brand.master_id,
                    brand.brand_name,
                    brand.default_hex_color,
                    brand.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| constraint_to_duplicate(e, "brand name under master"))?;
        Ok(brand)
    }

    pub fn get_brand(&self, id: &str) -> Result<SponsorBrand> {
        self.conn
            .query_row(
                "SELECT id, master_id, brand_name, default_hex_color, created_at
                 FROM sponsor_brand WHERE id = ?1",
                params![id],
                row_to_brand,
            )
            .optional()?
            .ok_or_else(|| DomainError::not_found("brand", id))
    }

    /// Attach a brand to an era. Precondition chain: field ranges, era and
    /// brand existence, rank uniqueness, brand uniqueness, prominence cap.
    pub fn link_sponsor(
        &self,
        era_id: &str,
        brand_id: &str,
        rank_order: i32,
        prominence_percent: i32,
    ) -> Result<SponsorLink> {
        validate_rank_order(rank_order)?;
        validate_prominence(prominence_percent)?;

        let tx = self.conn.unchecked_transaction()?;
        self.get_era(era_id)?;
        self.get_brand(brand_id)?;

        let rank_taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM team_sponsor_link WHERE era_id = ?1 AND rank_order = ?2",
                params![era_id, rank_order],
                |row| row.get(0),
            )
            .optional()?;
        if rank_taken.is_some() {
            return Err(DomainError::duplicate(format!(
                "rank order {} for this era",
                rank_order
            )));
        }

        let brand_linked: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM team_sponsor_link WHERE era_id = ?1 AND brand_id = ?2",
                params![era_id, brand_id],
                |row| row.get(0),
            )
            .optional()?;
        if brand_linked.is_some() {
            return Err(DomainError::duplicate("brand for this era".to_string()));
        }

        let current = self.sponsor_total(era_id)?;
        if current + prominence_percent as i64 > 100 {
            return Err(DomainError::ProminenceExceeded {
                current,
                requested: prominence_percent as i64,
            });
        }

        let link = SponsorLink::new(era_id, brand_id, rank_order, prominence_percent);
        self.conn
            .execute(
                "INSERT INTO team_sponsor_link (id, era_id, brand_id, rank_order, prominence_percent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    link.id,
                    link.era_id,
                    link.brand_id,
                    link.rank_order,
                    link.prominence_percent,
                    link.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| constraint_to_duplicate(e, "sponsor link"))?;
        tx.commit()?;
        self.invalidate_timeline();
        Ok(link)
    }

    /// Current prominence sum for an era (0 when unlinked).
    pub fn sponsor_total(&self, era_id: &str) -> Result<i64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(prominence_percent), 0) FROM team_sponsor_link WHERE era_id = ?1",
            params![era_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Sponsor links for an era with their brands, ordered by rank.
    pub fn sponsor_links_for_era(&self, era_id: &str) -> Result<Vec<(SponsorLink, SponsorBrand)>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.era_id, l.brand_id, l.rank_order, l.prominence_percent, l.created_at,
                    b.id, b.master_id, b.brand_name, b.default_hex_color, b.created_at
             FROM team_sponsor_link l
             JOIN sponsor_brand b ON b.id = l.brand_id
             WHERE l.era_id = ?1
             ORDER BY l.rank_order",
        )?;
        let rows = stmt
            .query_map(params![era_id], |row| {
                let link = SponsorLink {
                    id: row.get(0)?,
                    era_id: row.get(1)?,
                    brand_id: row.get(2)?,
                    rank_order: row.get(3)?,
                    prominence_percent: row.get(4)?,
                    created_at: parse_timestamp(5, row.get(5)?)?,
                };
                let brand = SponsorBrand {
                    id: row.get(6)?,
                    master_id: row.get(7)?,
                    brand_name: row.get(8)?,
                    default_hex_color: row.get(9)?,
                    created_at: parse_timestamp(10, row.get(10)?)?,
                };
                Ok((link, brand))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========================================================================
    // LINEAGE EVENTS
    // ========================================================================

    pub(crate) fn insert_event_raw(&self, event: &LineageEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO lineage_event (id, previous_node_id, next_node_id, event_year, event_type, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.previous_node_id,
                event.next_node_id,
                event.event_year,
                event.event_type.as_str(),
                event.notes,
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub(crate) fn update_event_raw(
        &self,
        id: &str,
        event_type: EventType,
        notes: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE lineage_event SET event_type = ?2, notes = ?3 WHERE id = ?1",
            params![id, event_type.as_str(), notes],
        )?;
        Ok(())
    }

    pub fn get_event(&self, id: &str) -> Result<LineageEvent> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_EVENT),
                params![id],
                row_to_event,
            )
            .optional()?
            .ok_or_else(|| DomainError::not_found("lineage event", id))
    }

    /// All events in a merge/split sibling group: same year, same type, same
    /// pivot node (successor for MERGE, origin for SPLIT).
    pub(crate) fn events_in_group_raw(
        &self,
        year: i32,
        event_type: EventType,
        pivot_node_id: &str,
    ) -> Result<Vec<LineageEvent>> {
        let column = match event_type {
            EventType::Merge => "next_node_id",
            EventType::Split => "previous_node_id",
            _ => return Ok(Vec::new()),
        };
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE event_year = ?1 AND event_type = ?2 AND {} = ?3 ORDER BY created_at, id",
            SELECT_EVENT, column
        ))?;
        let events = stmt
            .query_map(
                params![year, event_type.as_str(), pivot_node_id],
                row_to_event,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn events_in_range(&self, start_year: i32, end_year: i32) -> Result<Vec<LineageEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE event_year >= ?1 AND event_year <= ?2",
            SELECT_EVENT
        ))?;
        let events = stmt
            .query_map(params![start_year, end_year], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Incoming (node as successor) and outgoing (node as predecessor) events.
    pub fn events_for_node(&self, node_id: &str) -> Result<(Vec<LineageEvent>, Vec<LineageEvent>)> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE next_node_id = ?1", SELECT_EVENT))?;
        let incoming = stmt
            .query_map(params![node_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE previous_node_id = ?1", SELECT_EVENT))?;
        let outgoing = stmt
            .query_map(params![node_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((incoming, outgoing))
    }

    // ========================================================================
    // EDITS
    // ========================================================================

    pub(crate) fn insert_edit_raw(&self, edit: &Edit) -> Result<()> {
        let changes = serde_json::to_string(&edit.payload)?;
        self.conn.execute(
            "INSERT INTO edits (id, user_id, edit_type, target_era_id, target_node_id, changes,
                                reason, status, reviewed_by, reviewed_at, review_notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                edit.id,
                edit.user_id,
                edit.payload.kind().as_str(),
                edit.payload.target_era_id(),
                edit.payload.target_node_id(),
                changes,
                edit.reason,
                edit.status.as_str(),
                edit.reviewed_by,
                edit.reviewed_at.map(|t| t.to_rfc3339()),
                edit.review_notes,
                edit.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_edit(&self, id: &str) -> Result<Edit> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_EDIT),
                params![id],
                row_to_edit,
            )
            .optional()?
            .ok_or_else(|| DomainError::not_found("edit", id))
    }

    pub fn pending_edits(&self) -> Result<Vec<Edit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE status = 'PENDING' ORDER BY created_at, id",
            SELECT_EDIT
        ))?;
        let edits = stmt
            .query_map([], row_to_edit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edits)
    }

    pub(crate) fn mark_edit_reviewed_raw(
        &self,
        edit_id: &str,
        status: EditStatus,
        reviewer_id: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE edits SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, review_notes = ?5
             WHERE id = ?1",
            params![
                edit_id,
                status.as_str(),
                reviewer_id,
                Utc::now().to_rfc3339(),
                notes,
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

fn setup_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            approved_edits_count INTEGER NOT NULL DEFAULT 0,
            is_banned INTEGER NOT NULL DEFAULT 0,
            banned_reason TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS team_node (
            id TEXT PRIMARY KEY,
            founding_year INTEGER NOT NULL CHECK (founding_year >= 1900),
            dissolution_year INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS team_era (
            id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL REFERENCES team_node(id) ON DELETE CASCADE,
            season_year INTEGER NOT NULL CHECK (season_year BETWEEN 1900 AND 2100),
            registered_name TEXT NOT NULL,
            uci_code TEXT,
            tier_level INTEGER,
            source_origin TEXT,
            is_manual_override INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (node_id, season_year)
        );

        CREATE TABLE IF NOT EXISTS sponsor_master (
            id TEXT PRIMARY KEY,
            legal_name TEXT NOT NULL UNIQUE,
            industry_sector TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sponsor_brand (
            id TEXT PRIMARY KEY,
            master_id TEXT NOT NULL REFERENCES sponsor_master(id) ON DELETE CASCADE,
            brand_name TEXT NOT NULL,
            default_hex_color TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (master_id, brand_name)
        );

        CREATE TABLE IF NOT EXISTS team_sponsor_link (
            id TEXT PRIMARY KEY,
            era_id TEXT NOT NULL REFERENCES team_era(id) ON DELETE CASCADE,
            brand_id TEXT NOT NULL REFERENCES sponsor_brand(id),
            rank_order INTEGER NOT NULL CHECK (rank_order >= 1),
            prominence_percent INTEGER NOT NULL CHECK (prominence_percent BETWEEN 1 AND 100),
            created_at TEXT NOT NULL,
            UNIQUE (era_id, rank_order),
            UNIQUE (era_id, brand_id)
        );

        CREATE TABLE IF NOT EXISTS lineage_event (
            id TEXT PRIMARY KEY,
            previous_node_id TEXT REFERENCES team_node(id) ON DELETE CASCADE,
            next_node_id TEXT REFERENCES team_node(id) ON DELETE CASCADE,
            event_year INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            CHECK (previous_node_id IS NOT NULL OR next_node_id IS NOT NULL),
            CHECK (previous_node_id IS NULL OR next_node_id IS NULL
                   OR previous_node_id <> next_node_id)
        );

        CREATE TABLE IF NOT EXISTS edits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            edit_type TEXT NOT NULL,
            target_era_id TEXT,
            target_node_id TEXT,
            changes TEXT NOT NULL,
            reason TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            reviewed_by TEXT,
            reviewed_at TEXT,
            review_notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_era_node ON team_era(node_id);
        CREATE INDEX IF NOT EXISTS idx_era_year ON team_era(season_year);
        CREATE INDEX IF NOT EXISTS idx_event_prev ON lineage_event(previous_node_id);
        CREATE INDEX IF NOT EXISTS idx_event_next ON lineage_event(next_node_id);
        CREATE INDEX IF NOT EXISTS idx_event_year ON lineage_event(event_year);
        CREATE INDEX IF NOT EXISTS idx_edits_status ON edits(status);
        CREATE INDEX IF NOT EXISTS idx_sponsor_link_era ON team_sponsor_link(era_id);",
    )?;
    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const SELECT_ERA: &str = "SELECT id, node_id, season_year, registered_name, uci_code, tier_level,
                                 source_origin, is_manual_override, created_at, updated_at
                          FROM team_era";

const SELECT_EVENT: &str = "SELECT id, previous_node_id, next_node_id, event_year, event_type, notes, created_at
                            FROM lineage_event";

const SELECT_EDIT: &str = "SELECT id, user_id, changes, reason, status, reviewed_by, reviewed_at,
                                  review_notes, created_at
                           FROM edits";

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn bad_value(idx: usize, detail: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, detail.into())
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<TeamNode> {
    Ok(TeamNode {
        id: row.get(0)?,
        founding_year: row.get(1)?,
        dissolution_year: row.get(2)?,
        created_at: parse_timestamp(3, row.get(3)?)?,
        updated_at: parse_timestamp(4, row.get(4)?)?,
    })
}

fn row_to_era(row: &Row<'_>) -> rusqlite::Result<TeamEra> {
    let tier = match row.get::<_, Option<i32>>(5)? {
        Some(level) => Some(
            Tier::from_level(level)
                .ok_or_else(|| bad_value(5, format!("unknown tier level {}", level)))?,
        ),
        None => None,
    };
    Ok(TeamEra {
        id: row.get(0)?,
        node_id: row.get(1)?,
        season_year: row.get(2)?,
        registered_name: row.get(3)?,
        uci_code: row.get(4)?,
        tier,
        source_origin: row.get(6)?,
        is_manual_override: row.get::<_, i32>(7)? != 0,
        created_at: parse_timestamp(8, row.get(8)?)?,
        updated_at: parse_timestamp(9, row.get(9)?)?,
    })
}

fn row_to_brand(row: &Row<'_>) -> rusqlite::Result<SponsorBrand> {
    Ok(SponsorBrand {
        id: row.get(0)?,
        master_id: row.get(1)?,
        brand_name: row.get(2)?,
        default_hex_color: row.get(3)?,
        created_at: parse_timestamp(4, row.get(4)?)?,
    })
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<LineageEvent> {
    let type_str: String = row.get(4)?;
    let event_type = EventType::parse(&type_str)
        .ok_or_else(|| bad_value(4, format!("unknown event type {}", type_str)))?;
    Ok(LineageEvent {
        id: row.get(0)?,
        previous_node_id: row.get(1)?,
        next_node_id: row.get(2)?,
        event_year: row.get(3)?,
        event_type,
        notes: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(2)?;
    let role = UserRole::parse(&role_str)
        .ok_or_else(|| bad_value(2, format!("unknown role {}", role_str)))?;
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        role,
        approved_edits_count: row.get(3)?,
        is_banned: row.get::<_, i32>(4)? != 0,
        banned_reason: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
    })
}

fn row_to_edit(row: &Row<'_>) -> rusqlite::Result<Edit> {
    let changes: String = row.get(2)?;
    let payload: EditPayload = serde_json::from_str(&changes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let status_str: String = row.get(4)?;
    let status = EditStatus::parse(&status_str)
        .ok_or_else(|| bad_value(4, format!("unknown edit status {}", status_str)))?;
    let reviewed_at = match row.get::<_, Option<String>>(6)? {
        Some(value) => Some(parse_timestamp(6, value)?),
        None => None,
    };
    Ok(Edit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        payload,
        reason: row.get(3)?,
        status,
        reviewed_by: row.get(5)?,
        reviewed_at,
        review_notes: row.get(7)?,
        created_at: parse_timestamp(8, row.get(8)?)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
