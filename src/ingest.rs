// Ingestion - folding scraped season rosters into the graph
//
// Scraped rows are matched to existing eras by (registered name, season).
// A match refreshes the scraped fields unless a human curated the era, in
// which case the row is skipped; no match founds a new node with the scraped
// season as its first era. Ingestion never dissolves nodes or draws lineage
// edges, that is curation work.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::{TeamEra, Tier};
use crate::error::Result;
use crate::store::GraphStore;

/// One row from a season roster scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedTeam {
    pub name: String,
    pub season_year: i32,
    pub uci_code: Option<String>,
    pub tier: Option<Tier>,
    /// Provenance tag, e.g. the scraper name.
    pub source: String,
}

/// What happened to a single scraped row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IngestOutcome {
    /// A new node was founded with this season as its first era.
    Created,
    /// An existing era was refreshed with the scraped fields.
    Refreshed,
    /// The matching era is human-curated; the row was left alone.
    SkippedManualOverride,
}

/// Upsert one scraped row. Returns the resulting era together with what was
/// done to it.
pub fn upsert_era(store: &GraphStore, scraped: &ScrapedTeam) -> Result<(TeamEra, IngestOutcome)> {
    if let Some(existing) = store.find_era_by_name_year(&scraped.name, scraped.season_year)? {
        if existing.is_manual_override {
            debug!(
                era_id = %existing.id,
                name = %existing.registered_name,
                "skipping manually curated era"
            );
            return Ok((existing, IngestOutcome::SkippedManualOverride));
        }
        let tx = store.conn().unchecked_transaction()?;
        let era = store.refresh_era_from_ingest_raw(
            &existing.id,
            scraped.uci_code.as_deref(),
            scraped.tier,
            &scraped.source,
        )?;
        tx.commit()?;
        store.invalidate_timeline();
        debug!(era_id = %era.id, season = scraped.season_year, "refreshed era from scrape");
        return Ok((era, IngestOutcome::Refreshed));
    }

    let tx = store.conn().unchecked_transaction()?;
    let node = store.create_node_raw(scraped.season_year)?;
    let era = store.create_era_raw(
        &node.id,
        scraped.season_year,
        &scraped.name,
        scraped.uci_code.as_deref(),
        scraped.tier,
        Some(&scraped.source),
        false,
    )?;
    tx.commit()?;
    store.invalidate_timeline();
    info!(
        node_id = %node.id,
        era_id = %era.id,
        season = scraped.season_year,
        name = %era.registered_name,
        "founded new node from scrape"
    );
    Ok((era, IngestOutcome::Created))
}

/// Upsert a whole scraped roster, returning per-outcome counts.
pub fn upsert_roster(store: &GraphStore, rows: &[ScrapedTeam]) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    for row in rows {
        match upsert_era(store, row)? {
            (_, IngestOutcome::Created) => report.created += 1,
            (_, IngestOutcome::Refreshed) => report.refreshed += 1,
            (_, IngestOutcome::SkippedManualOverride) => report.skipped += 1,
        }
    }
    info!(
        created = report.created,
        refreshed = report.refreshed,
        skipped = report.skipped,
        "roster ingestion complete"
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub created: usize,
    pub refreshed: usize,
    pub skipped: usize,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EditPayload, MetadataChanges, UserRole};
    use crate::moderation::ModerationWorkflow;

    fn scraped(name: &str, year: i32, source: &str) -> ScrapedTeam {
        ScrapedTeam {
            name: name.to_string(),
            season_year: year,
            uci_code: Some("SKY".to_string()),
            tier: Some(Tier::WorldTour),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_unknown_team_founds_node() {
        let store = GraphStore::open_in_memory().unwrap();
        let (era, outcome) = upsert_era(&store, &scraped("Team Sky", 2010, "pcs_2010")).unwrap();
        assert_eq!(outcome, IngestOutcome::Created);
        assert_eq!(era.season_year, 2010);
        assert_eq!(era.source_origin.as_deref(), Some("pcs_2010"));

        let node = store.get_node(&era.node_id).unwrap();
        assert_eq!(node.founding_year, 2010);
    }

    #[test]
    fn test_known_team_is_refreshed() {
        let store = GraphStore::open_in_memory().unwrap();
        let (first, _) = upsert_era(
            &store,
            &ScrapedTeam {
                name: "Team Sky".to_string(),
                season_year: 2010,
                uci_code: None,
                tier: None,
                source: "pcs_2010".to_string(),
            },
        )
        .unwrap();

        let (second, outcome) =
            upsert_era(&store, &scraped("Team Sky", 2010, "uci_2010")).unwrap();
        assert_eq!(outcome, IngestOutcome::Refreshed);
        assert_eq!(second.id, first.id);
        assert_eq!(second.uci_code.as_deref(), Some("SKY"));
        assert_eq!(second.tier, Some(Tier::WorldTour));
        assert_eq!(second.source_origin.as_deref(), Some("uci_2010"));
        // Refresh does not fabricate a second node.
        assert_eq!(store.all_nodes().unwrap().len(), 1);
    }

    #[test]
    fn test_manual_override_is_left_alone() {
        let store = GraphStore::open_in_memory().unwrap();
        let (era, _) = upsert_era(&store, &scraped("Team Sky", 2010, "pcs_2010")).unwrap();

        // A trusted user curates the era.
        let user = store.create_user("curator", UserRole::Trusted).unwrap();
        let workflow = ModerationWorkflow::new(&store);
        workflow
            .submit(
                &user.id,
                EditPayload::Metadata {
                    era_id: era.id.clone(),
                    changes: MetadataChanges {
                        registered_name: Some("Team Sky Pro Cycling".to_string()),
                        ..Default::default()
                    },
                },
                "official name",
            )
            .unwrap();

        let (kept, outcome) = upsert_era(
            &store,
            &ScrapedTeam {
                name: "Team Sky Pro Cycling".to_string(),
                season_year: 2010,
                uci_code: Some("ABC".to_string()),
                tier: Some(Tier::Continental),
                source: "late_scrape".to_string(),
            },
        )
        .unwrap();
        assert_eq!(outcome, IngestOutcome::SkippedManualOverride);
        assert_eq!(kept.registered_name, "Team Sky Pro Cycling");
        // Curated fields survive the scrape.
        assert_ne!(kept.uci_code.as_deref(), Some("ABC"));
        assert_ne!(kept.tier, Some(Tier::Continental));
    }

    #[test]
    fn test_roster_report_counts() {
        let store = GraphStore::open_in_memory().unwrap();
        upsert_era(&store, &scraped("Team Sky", 2010, "seed")).unwrap();

        let rows = vec![
            scraped("Team Sky", 2010, "pcs_2010"),
            ScrapedTeam {
                name: "Garmin".to_string(),
                season_year: 2010,
                uci_code: None,
                tier: Some(Tier::WorldTour),
                source: "pcs_2010".to_string(),
            },
        ];
        let report = upsert_roster(&store, &rows).unwrap();
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
    }
}
