// ModerationWorkflow - trust-gated edit lifecycle
//
// Every proposed mutation becomes an Edit record (audit trail, never
// deleted). Trusted users and admins apply immediately: the edit is created
// APPROVED and the structural change, the approval counter bump, and the
// edit row all commit in one transaction. New users queue: the edit is
// created PENDING and nothing else changes. Guests and banned users are
// rejected before any record exists.
//
// Admin review dispatches on the payload variant; an apply failure rolls the
// whole review transaction back and leaves the edit PENDING.

use std::collections::BTreeMap;

use rusqlite::params;
use serde::Serialize;
use tracing::{error, info};

use crate::entities::{
    Edit, EditOutcome, EditPayload, EditStatus, EventType, LineageEvent, MergeRequest,
    SplitRequest, TeamNode, UserRole, PROMOTION_THRESHOLD,
};
use crate::entities::era::{validate_registered_name, validate_season_year};
use crate::error::{DomainError, Result};
use crate::lineage::LineageEngine;
use crate::store::GraphStore;

/// A merge folds 2 to 5 teams; a split fans out into 2 to 5.
const MIN_LEGS: usize = 2;
const MAX_LEGS: usize = 5;

const REJECTION_DEFAULT_NOTES: &str = "Edit rejected by moderator";

pub struct ModerationWorkflow<'a> {
    store: &'a GraphStore,
}

impl<'a> ModerationWorkflow<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        ModerationWorkflow { store }
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Submit a proposed edit on behalf of an actor. The actor's current
    /// role and ban flag decide the initial status.
    pub fn submit(
        &self,
        actor_id: &str,
        payload: EditPayload,
        reason: &str,
    ) -> Result<EditOutcome> {
        let actor = self.store.get_user(actor_id)?;
        if !actor.can_edit() {
            return Err(DomainError::Forbidden(
                "user is not allowed to edit".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(DomainError::invalid("reason", "cannot be empty"));
        }
        self.validate_payload(&payload)?;

        let mut edit = Edit::new(&actor.id, payload, reason.trim());

        if actor.auto_approves() {
            let tx = self.store.conn().unchecked_transaction()?;
            self.apply_payload_raw(&edit.payload, &edit.user_id)?;
            edit.status = EditStatus::Approved;
            edit.reviewed_by = Some(actor.id.clone());
            edit.reviewed_at = Some(chrono::Utc::now());
            self.store.insert_edit_raw(&edit)?;
            let promoted = self.record_approval_raw(&edit.user_id)?;
            tx.commit()?;
            self.store.invalidate_timeline();

            info!(edit_id = %edit.id, user_id = %actor.id, "edit auto-approved and applied");
            let message = if promoted {
                "Edit approved and user promoted to Trusted User".to_string()
            } else {
                "Edit approved and applied immediately".to_string()
            };
            Ok(EditOutcome {
                edit_id: edit.id,
                status: EditStatus::Approved,
                message,
            })
        } else {
            self.store.insert_edit_raw(&edit)?;
            info!(edit_id = %edit.id, user_id = %actor.id, "edit queued for moderation");
            Ok(EditOutcome {
                edit_id: edit.id,
                status: EditStatus::Pending,
                message: "Edit submitted for moderation".to_string(),
            })
        }
    }

    fn validate_payload(&self, payload: &EditPayload) -> Result<()> {
        match payload {
            EditPayload::Metadata { era_id, changes } => {
                if changes.is_empty() {
                    return Err(DomainError::invalid("changes", "no changes specified"));
                }
                changes.validate()?;
                self.store.get_era(era_id)?;
            }
            EditPayload::Merge(req) => {
                if !(MIN_LEGS..=MAX_LEGS).contains(&req.source_node_ids.len()) {
                    return Err(DomainError::invalid(
                        "source_node_ids",
                        format!("a merge requires {} to {} source teams", MIN_LEGS, MAX_LEGS),
                    ));
                }
                validate_season_year(req.merge_year)?;
                validate_registered_name(&req.new_team_name)?;
                for node_id in &req.source_node_ids {
                    self.store.get_node(node_id)?;
                }
            }
            EditPayload::Split(req) => {
                if !(MIN_LEGS..=MAX_LEGS).contains(&req.new_teams.len()) {
                    return Err(DomainError::invalid(
                        "new_teams",
                        format!("a split requires {} to {} new teams", MIN_LEGS, MAX_LEGS),
                    ));
                }
                validate_season_year(req.split_year)?;
                for team in &req.new_teams {
                    validate_registered_name(&team.name)?;
                }
                self.store.get_node(&req.source_node_id)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // REVIEW
    // ========================================================================

    /// Review a pending edit. Admin only. On approve the structural change,
    /// the status transition and the promotion side effect share one
    /// transaction; if the apply fails everything rolls back and the edit
    /// remains pending.
    pub fn review(
        &self,
        admin_id: &str,
        edit_id: &str,
        approve: bool,
        notes: Option<&str>,
    ) -> Result<EditOutcome> {
        let admin = self.store.get_user(admin_id)?;
        if !admin.is_admin() {
            return Err(DomainError::Forbidden(
                "only administrators may review edits".to_string(),
            ));
        }
        let edit = self.store.get_edit(edit_id)?;
        if edit.status.is_terminal() {
            return Err(DomainError::invalid("status", "edit has already been reviewed"));
        }

        if approve {
            let tx = self.store.conn().unchecked_transaction()?;
            if let Err(apply_err) = self.apply_payload_raw(&edit.payload, &edit.user_id) {
                drop(tx); // rollback
                error!(edit_id = %edit.id, error = %apply_err, "failed to apply edit");
                return Err(DomainError::ApplyFailure(apply_err.to_string()));
            }
            let promoted = self.record_approval_raw(&edit.user_id)?;
            self.store
                .mark_edit_reviewed_raw(&edit.id, EditStatus::Approved, &admin.id, notes)?;
            tx.commit()?;
            self.store.invalidate_timeline();

            info!(edit_id = %edit.id, admin_id = %admin.id, "edit approved");
            let message = if promoted {
                "Edit approved and user promoted to Trusted User".to_string()
            } else {
                "Edit approved and applied".to_string()
            };
            Ok(EditOutcome {
                edit_id: edit.id,
                status: EditStatus::Approved,
                message,
            })
        } else {
            let notes = notes.unwrap_or(REJECTION_DEFAULT_NOTES);
            self.store
                .mark_edit_reviewed_raw(&edit.id, EditStatus::Rejected, &admin.id, Some(notes))?;
            info!(edit_id = %edit.id, admin_id = %admin.id, notes, "edit rejected");
            Ok(EditOutcome {
                edit_id: edit.id,
                status: EditStatus::Rejected,
                message: "Edit rejected".to_string(),
            })
        }
    }

    /// Bump the submitter's approval counter; promote a new user to trusted
    /// on the approval that crosses the threshold.
    fn record_approval_raw(&self, user_id: &str) -> Result<bool> {
        let count = self.store.bump_approved_count_raw(user_id)?;
        let user = self.store.get_user(user_id)?;
        if user.role == UserRole::New && count >= PROMOTION_THRESHOLD {
            self.store.set_user_role_raw(user_id, UserRole::Trusted)?;
            info!(user_id = %user_id, count, "user promoted to trusted");
            return Ok(true);
        }
        Ok(false)
    }

    // ========================================================================
    // APPLY ROUTINES (one per payload variant)
    // ========================================================================

    fn apply_payload_raw(&self, payload: &EditPayload, submitter_id: &str) -> Result<()> {
        match payload {
            EditPayload::Metadata { era_id, changes } => {
                let era = self
                    .store
                    .apply_era_changes_raw(era_id, changes, submitter_id)?;
                info!(era_id = %era.id, user_id = %submitter_id, "metadata edit applied");
                Ok(())
            }
            EditPayload::Merge(req) => self.apply_merge_raw(req).map(|_| ()),
            EditPayload::Split(req) => self.apply_split_raw(req).map(|_| ()),
        }
    }

    /// Dissolve every source at the merge year, create the unified node with
    /// its first era, and draw one MERGE edge per source. Canonicalization
    /// runs once after the last leg so the group is judged at full size.
    fn apply_merge_raw(&self, req: &MergeRequest) -> Result<TeamNode> {
        for node_id in &req.source_node_ids {
            self.store.get_node(node_id)?;
            if self
                .store
                .era_for_node_year(node_id, req.merge_year)?
                .is_none()
            {
                return Err(DomainError::TeamNotActive(format!(
                    "node {} has no era registered in {}",
                    node_id, req.merge_year
                )));
            }
        }
        for node_id in &req.source_node_ids {
            self.store.dissolve_node_raw(node_id, req.merge_year)?;
        }
        let new_node = self.store.create_node_raw(req.merge_year)?;
        self.store.create_era_raw(
            &new_node.id,
            req.merge_year,
            &req.new_team_name,
            None,
            Some(req.new_team_tier),
            Some("merge_event"),
            false,
        )?;
        for node_id in &req.source_node_ids {
            let event = LineageEvent::new(
                Some(node_id),
                Some(&new_node.id),
                req.merge_year,
                EventType::Merge,
                None,
            );
            self.store.insert_event_raw(&event)?;
        }
        LineageEngine::new(self.store).canonicalize_group_raw(
            req.merge_year,
            EventType::Merge,
            &new_node.id,
        )?;
        info!(
            new_node_id = %new_node.id,
            year = req.merge_year,
            sources = req.source_node_ids.len(),
            "merge applied"
        );
        Ok(new_node)
    }

    /// Dissolve the source at the split year and fan out one new node, era
    /// and SPLIT edge per target descriptor.
    fn apply_split_raw(&self, req: &SplitRequest) -> Result<Vec<TeamNode>> {
        self.store.get_node(&req.source_node_id)?;
        if self
            .store
            .era_for_node_year(&req.source_node_id, req.split_year)?
            .is_none()
        {
            return Err(DomainError::TeamNotActive(format!(
                "node {} has no era registered in {}",
                req.source_node_id, req.split_year
            )));
        }
        self.store
            .dissolve_node_raw(&req.source_node_id, req.split_year)?;

        let mut new_nodes = Vec::with_capacity(req.new_teams.len());
        for team in &req.new_teams {
            let node = self.store.create_node_raw(req.split_year)?;
            self.store.create_era_raw(
                &node.id,
                req.split_year,
                &team.name,
                None,
                Some(team.tier),
                Some("split_event"),
                false,
            )?;
            let event = LineageEvent::new(
                Some(&req.source_node_id),
                Some(&node.id),
                req.split_year,
                EventType::Split,
                None,
            );
            self.store.insert_event_raw(&event)?;
            new_nodes.push(node);
        }
        LineageEngine::new(self.store).canonicalize_group_raw(
            req.split_year,
            EventType::Split,
            &req.source_node_id,
        )?;
        info!(
            source_node_id = %req.source_node_id,
            year = req.split_year,
            targets = new_nodes.len(),
            "split applied"
        );
        Ok(new_nodes)
    }

    // ========================================================================
    // QUEUE INSPECTION
    // ========================================================================

    pub fn pending_edits(&self) -> Result<Vec<Edit>> {
        self.store.pending_edits()
    }

    pub fn stats(&self) -> Result<ModerationStats> {
        let conn = self.store.conn();
        let pending_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM edits WHERE status = 'PENDING'",
            [],
            |row| row.get(0),
        )?;
        let approved_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM edits
             WHERE status = 'APPROVED' AND reviewed_at IS NOT NULL
               AND date(reviewed_at) = date('now')",
            [],
            |row| row.get(0),
        )?;
        let rejected_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM edits
             WHERE status = 'REJECTED' AND reviewed_at IS NOT NULL
               AND date(reviewed_at) = date('now')",
            [],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT edit_type, COUNT(*) FROM edits WHERE status = 'PENDING' GROUP BY edit_type",
        )?;
        let pending_by_type = stmt
            .query_map(params![], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<BTreeMap<String, i64>>>()?;
        Ok(ModerationStats {
            pending_count,
            approved_today,
            rejected_today,
            pending_by_type,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModerationStats {
    pub pending_count: i64,
    pub approved_today: i64,
    pub rejected_today: i64,
    pub pending_by_type: BTreeMap<String, i64>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MetadataChanges, NewTeamSpec, Tier};
    use crate::store::GraphStore;

    fn store() -> GraphStore {
        GraphStore::open_in_memory().unwrap()
    }

    fn seed_team(store: &GraphStore, year: i32, name: &str) -> (String, String) {
        let node = store.create_node(year).unwrap();
        let era = store
            .create_era(&node.id, year, name, None, Some(Tier::WorldTour), None, false)
            .unwrap();
        (node.id, era.id)
    }

    fn rename_payload(era_id: &str, name: &str) -> EditPayload {
        EditPayload::Metadata {
            era_id: era_id.to_string(),
            changes: MetadataChanges {
                registered_name: Some(name.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_guest_and_banned_are_forbidden() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Team");
        let workflow = ModerationWorkflow::new(&store);

        let guest = store.create_user("guest", UserRole::Guest).unwrap();
        let err = workflow
            .submit(&guest.id, rename_payload(&era_id, "X"), "why")
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let banned = store.create_user("banned", UserRole::Trusted).unwrap();
        store.set_user_ban(&banned.id, true, None).unwrap();
        let err = workflow
            .submit(&banned.id, rename_payload(&era_id, "X"), "why")
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        // No audit record was created for either attempt.
        assert!(workflow.pending_edits().unwrap().is_empty());
    }

    #[test]
    fn test_new_user_edit_queues_without_applying() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Old Name");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();

        let outcome = workflow
            .submit(&user.id, rename_payload(&era_id, "New Name"), "typo fix")
            .unwrap();
        assert_eq!(outcome.status, EditStatus::Pending);

        let era = store.get_era(&era_id).unwrap();
        assert_eq!(era.registered_name, "Old Name");
        assert!(!era.is_manual_override);
        assert_eq!(workflow.pending_edits().unwrap().len(), 1);
    }

    #[test]
    fn test_trusted_user_edit_applies_immediately() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Old Name");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("vet", UserRole::Trusted).unwrap();

        let outcome = workflow
            .submit(&user.id, rename_payload(&era_id, "New Name"), "rebrand")
            .unwrap();
        assert_eq!(outcome.status, EditStatus::Approved);

        let era = store.get_era(&era_id).unwrap();
        assert_eq!(era.registered_name, "New Name");
        assert!(era.is_manual_override);
        assert_eq!(
            era.source_origin.as_deref(),
            Some(format!("user_{}", user.id).as_str())
        );
        assert_eq!(store.get_user(&user.id).unwrap().approved_edits_count, 1);
    }

    #[test]
    fn test_empty_change_set_rejected() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Team");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("u", UserRole::Trusted).unwrap();
        let payload = EditPayload::Metadata {
            era_id,
            changes: MetadataChanges::default(),
        };
        let err = workflow.submit(&user.id, payload, "noop").unwrap_err();
        assert_eq!(err.kind(), "invalid_field");
    }

    #[test]
    fn test_review_approve_applies_and_counts() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Old Name");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let outcome = workflow
            .submit(&user.id, rename_payload(&era_id, "New Name"), "fix")
            .unwrap();
        let review = workflow
            .review(&admin.id, &outcome.edit_id, true, None)
            .unwrap();
        assert_eq!(review.status, EditStatus::Approved);

        assert_eq!(store.get_era(&era_id).unwrap().registered_name, "New Name");
        assert_eq!(store.get_user(&user.id).unwrap().approved_edits_count, 1);
        let edit = store.get_edit(&outcome.edit_id).unwrap();
        assert_eq!(edit.status, EditStatus::Approved);
        assert_eq!(edit.reviewed_by.as_deref(), Some(admin.id.as_str()));
    }

    #[test]
    fn test_review_reject_leaves_target_untouched() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Old Name");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let outcome = workflow
            .submit(&user.id, rename_payload(&era_id, "Vandalism"), "hm")
            .unwrap();
        let review = workflow
            .review(&admin.id, &outcome.edit_id, false, None)
            .unwrap();
        assert_eq!(review.status, EditStatus::Rejected);

        assert_eq!(store.get_era(&era_id).unwrap().registered_name, "Old Name");
        let edit = store.get_edit(&outcome.edit_id).unwrap();
        assert_eq!(edit.status, EditStatus::Rejected);
        assert_eq!(
            edit.review_notes.as_deref(),
            Some("Edit rejected by moderator")
        );
        // Approval counter untouched on rejection.
        assert_eq!(store.get_user(&user.id).unwrap().approved_edits_count, 0);
    }

    #[test]
    fn test_review_requires_admin_and_pending_status() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Team");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let trusted = store.create_user("vet", UserRole::Trusted).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let outcome = workflow
            .submit(&user.id, rename_payload(&era_id, "X"), "r")
            .unwrap();
        let err = workflow
            .review(&trusted.id, &outcome.edit_id, true, None)
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        workflow
            .review(&admin.id, &outcome.edit_id, true, None)
            .unwrap();
        let err = workflow
            .review(&admin.id, &outcome.edit_id, false, None)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_field");
    }

    #[test]
    fn test_promotion_exactly_at_threshold() {
        let store = store();
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        for i in 0..5 {
            let (_, era_id) = seed_team(&store, 2010 + i, &format!("Team {}", i));
            let outcome = workflow
                .submit(&user.id, rename_payload(&era_id, "Renamed"), "fix")
                .unwrap();
            let review = workflow
                .review(&admin.id, &outcome.edit_id, true, None)
                .unwrap();
            let refreshed = store.get_user(&user.id).unwrap();
            if i < 4 {
                assert_eq!(refreshed.role, UserRole::New);
                assert_eq!(review.message, "Edit approved and applied");
            } else {
                assert_eq!(refreshed.role, UserRole::Trusted);
                assert_eq!(
                    review.message,
                    "Edit approved and user promoted to Trusted User"
                );
            }
        }
    }

    #[test]
    fn test_merge_dissolves_sources_and_links_new_node() {
        let store = store();
        let (node_a, _) = seed_team(&store, 2013, "Team A");
        let (node_b, _) = seed_team(&store, 2013, "Team B");
        let workflow = ModerationWorkflow::new(&store);
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let payload = EditPayload::Merge(MergeRequest {
            source_node_ids: vec![node_a.clone(), node_b.clone()],
            merge_year: 2013,
            new_team_name: "United Team".to_string(),
            new_team_tier: Tier::WorldTour,
        });
        let outcome = workflow.submit(&admin.id, payload, "merger").unwrap();
        assert_eq!(outcome.status, EditStatus::Approved);

        assert_eq!(store.get_node(&node_a).unwrap().dissolution_year, Some(2013));
        assert_eq!(store.get_node(&node_b).unwrap().dissolution_year, Some(2013));

        let merged: Vec<_> = store
            .all_nodes()
            .unwrap()
            .into_iter()
            .filter(|n| n.id != node_a && n.id != node_b)
            .collect();
        assert_eq!(merged.len(), 1);
        let new_node = &merged[0];
        assert_eq!(new_node.founding_year, 2013);

        let eras = store.eras_for_node(&new_node.id).unwrap();
        assert_eq!(eras.len(), 1);
        assert_eq!(eras[0].registered_name, "United Team");
        assert_eq!(eras[0].tier, Some(Tier::WorldTour));

        let events = store.events_in_range(2013, 2013).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == EventType::Merge));
        assert!(events
            .iter()
            .all(|e| e.next_node_id.as_deref() == Some(new_node.id.as_str())));
    }

    #[test]
    fn test_split_fans_out() {
        let store = store();
        let (source, _) = seed_team(&store, 2015, "Mother Team");
        let workflow = ModerationWorkflow::new(&store);
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let payload = EditPayload::Split(SplitRequest {
            source_node_id: source.clone(),
            split_year: 2015,
            new_teams: vec![
                NewTeamSpec {
                    name: "North Wing".to_string(),
                    tier: Tier::ProTeam,
                },
                NewTeamSpec {
                    name: "South Wing".to_string(),
                    tier: Tier::Continental,
                },
            ],
        });
        workflow.submit(&admin.id, payload, "split up").unwrap();

        assert_eq!(store.get_node(&source).unwrap().dissolution_year, Some(2015));
        let events = store.events_in_range(2015, 2015).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == EventType::Split));
        assert!(events
            .iter()
            .all(|e| e.previous_node_id.as_deref() == Some(source.as_str())));
    }

    #[test]
    fn test_merge_requires_active_sources() {
        let store = store();
        let (node_a, _) = seed_team(&store, 2013, "Team A");
        // Node B exists but has no era registered in the merge year.
        let node_b = store.create_node(2013).unwrap();
        let workflow = ModerationWorkflow::new(&store);
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let payload = EditPayload::Merge(MergeRequest {
            source_node_ids: vec![node_a.clone(), node_b.id.clone()],
            merge_year: 2013,
            new_team_name: "United".to_string(),
            new_team_tier: Tier::WorldTour,
        });
        let err = workflow.submit(&admin.id, payload, "merger").unwrap_err();
        assert_eq!(err.kind(), "team_not_active");
        // Nothing was dissolved.
        assert_eq!(store.get_node(&node_a).unwrap().dissolution_year, None);
    }

    #[test]
    fn test_review_apply_failure_rolls_back_and_stays_pending() {
        let store = store();
        let (node_a, _) = seed_team(&store, 2013, "Team A");
        let node_b = store.create_node(2013).unwrap();
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        // Queued merge whose second source is not active in the merge year.
        let payload = EditPayload::Merge(MergeRequest {
            source_node_ids: vec![node_a.clone(), node_b.id.clone()],
            merge_year: 2013,
            new_team_name: "United".to_string(),
            new_team_tier: Tier::WorldTour,
        });
        let outcome = workflow.submit(&user.id, payload, "merger").unwrap();
        assert_eq!(outcome.status, EditStatus::Pending);

        let err = workflow
            .review(&admin.id, &outcome.edit_id, true, None)
            .unwrap_err();
        assert_eq!(err.kind(), "apply_failure");

        // Rolled back: edit still pending, nothing dissolved, no count bump.
        let edit = store.get_edit(&outcome.edit_id).unwrap();
        assert_eq!(edit.status, EditStatus::Pending);
        assert_eq!(store.get_node(&node_a).unwrap().dissolution_year, None);
        assert_eq!(store.get_user(&user.id).unwrap().approved_edits_count, 0);
    }

    #[test]
    fn test_merge_leg_bounds() {
        let store = store();
        let (node_a, _) = seed_team(&store, 2013, "Team A");
        let workflow = ModerationWorkflow::new(&store);
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let payload = EditPayload::Merge(MergeRequest {
            source_node_ids: vec![node_a],
            merge_year: 2013,
            new_team_name: "Solo".to_string(),
            new_team_tier: Tier::WorldTour,
        });
        let err = workflow.submit(&admin.id, payload, "merger").unwrap_err();
        assert_eq!(err.kind(), "invalid_field");
    }

    #[test]
    fn test_stats_counts_queue() {
        let store = store();
        let (_, era_id) = seed_team(&store, 2010, "Team");
        let workflow = ModerationWorkflow::new(&store);
        let user = store.create_user("newbie", UserRole::New).unwrap();
        let admin = store.create_user("admin", UserRole::Admin).unwrap();

        let first = workflow
            .submit(&user.id, rename_payload(&era_id, "A"), "r")
            .unwrap();
        workflow
            .submit(&user.id, rename_payload(&era_id, "B"), "r")
            .unwrap();
        workflow.review(&admin.id, &first.edit_id, false, None).unwrap();

        let stats = workflow.stats().unwrap();
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.rejected_today, 1);
        assert_eq!(stats.approved_today, 0);
        assert_eq!(stats.pending_by_type.get("METADATA"), Some(&1));
    }
}
