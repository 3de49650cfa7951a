// TimelineProjector - deterministic read-only graph over a year window
//
// Produces nodes (with nested eras and jersey sponsor composition), directed
// links, and summary metadata. Ordering is fully deterministic regardless of
// storage iteration order, so the canonical JSON form hashes into a stable
// content hash usable for conditional reads.
//
// Results are cached per exact argument tuple with a bounded TTL. Every
// successful structural mutation clears the whole cache: correctness over
// hit rate.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::entities::era::validate_season_year;
use crate::entities::Tier;
use crate::error::Result;
use crate::store::GraphStore;

// ============================================================================
// GRAPH VIEW TYPES
// ============================================================================

/// One sponsor's share of an era's jersey, ordered by rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorSlice {
    pub brand: String,
    pub color: String,
    pub prominence: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraView {
    pub year: i32,
    pub name: String,
    pub tier: Option<i32>,
    pub sponsors: Vec<SponsorSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub founding_year: i32,
    pub dissolution_year: Option<i32>,
    pub eras: Vec<EraView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkView {
    pub source: String,
    pub target: String,
    pub year: i32,
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMeta {
    pub year_range: [i32; 2],
    pub node_count: usize,
    pub link_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineGraph {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub meta: GraphMeta,
}

/// A projection plus its content hash, with a flag telling whether it was
/// served from cache.
#[derive(Debug, Clone)]
pub struct Projection {
    pub graph: TimelineGraph,
    pub content_hash: String,
    pub from_cache: bool,
}

// ============================================================================
// CACHE
// ============================================================================

/// Exact argument tuple a projection was built for. The tier filter is
/// normalized (sorted, deduplicated) so equivalent filters share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionKey {
    pub start_year: i32,
    pub end_year: i32,
    pub include_dissolved: bool,
    pub tier_levels: Vec<i32>,
}

impl ProjectionKey {
    fn new(start_year: i32, end_year: i32, include_dissolved: bool, tiers: &[Tier]) -> Self {
        let mut tier_levels: Vec<i32> = tiers.iter().map(|t| t.level()).collect();
        tier_levels.sort_unstable();
        tier_levels.dedup();
        ProjectionKey {
            start_year,
            end_year,
            include_dissolved,
            tier_levels,
        }
    }
}

struct CacheEntry {
    graph: TimelineGraph,
    content_hash: String,
    stored_at: Instant,
}

/// Process-wide projection cache. Created at process start, cleared on every
/// write, never persisted. Reads share the RwLock read side; invalidation
/// takes the write side and is visible to every subsequent reader.
pub struct TimelineCache {
    entries: RwLock<HashMap<ProjectionKey, CacheEntry>>,
    ttl: Duration,
}

impl TimelineCache {
    pub fn new(ttl: Duration) -> Self {
        TimelineCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drop every cached projection. Exposed for operational use; also the
    /// hook every successful mutation runs.
    pub fn invalidate_all(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    fn get(&self, key: &ProjectionKey) -> Option<(TimelineGraph, String)> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some((entry.graph.clone(), entry.content_hash.clone()))
    }

    fn put(&self, key: ProjectionKey, graph: TimelineGraph, content_hash: String) {
        self.entries.write().unwrap().insert(
            key,
            CacheEntry {
                graph,
                content_hash,
                stored_at: Instant::now(),
            },
        );
    }
}

impl Default for TimelineCache {
    fn default() -> Self {
        // 5 minutes: long enough to absorb read bursts, short enough that a
        // missed invalidation (which would be a bug) cannot linger all day.
        TimelineCache::new(Duration::from_secs(300))
    }
}

// ============================================================================
// PROJECTOR
// ============================================================================

pub struct TimelineProjector<'a> {
    store: &'a GraphStore,
}

impl<'a> TimelineProjector<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        TimelineProjector { store }
    }

    /// Build the projection, bypassing the cache.
    ///
    /// A node is included when it has at least one era inside the year window
    /// matching the tier filter (empty filter = all tiers). Dissolved nodes
    /// are dropped when `include_dissolved` is false and their dissolution
    /// falls inside or before the window end.
    pub fn project(
        &self,
        start_year: i32,
        end_year: i32,
        include_dissolved: bool,
        tier_filter: &[Tier],
    ) -> Result<TimelineGraph> {
        validate_season_year(start_year)?;
        validate_season_year(end_year)?;

        let mut nodes = Vec::new();

        for node in self.store.all_nodes()? {
            if !include_dissolved && node.dissolution_year.map_or(false, |d| d <= end_year) {
                continue;
            }
            let mut eras: Vec<EraView> = Vec::new();
            for era in self.store.eras_for_node(&node.id)? {
                let in_window = era.season_year >= start_year && era.season_year <= end_year;
                let tier_ok = tier_filter.is_empty()
                    || era.tier.map_or(false, |t| tier_filter.contains(&t));
                if !(in_window && tier_ok) {
                    continue;
                }
                let sponsors = self
                    .store
                    .sponsor_links_for_era(&era.id)?
                    .into_iter()
                    .map(|(link, brand)| SponsorSlice {
                        brand: brand.brand_name,
                        color: brand.default_hex_color,
                        prominence: link.prominence_percent,
                    })
                    .collect();
                eras.push(EraView {
                    year: era.season_year,
                    name: era.registered_name,
                    tier: era.tier.map(Tier::level),
                    sponsors,
                });
            }
            if eras.is_empty() {
                continue;
            }
            // (year, name) for a stable tie-break
            eras.sort_by(|a, b| (a.year, a.name.as_str()).cmp(&(b.year, b.name.as_str())));
            nodes.push(NodeView {
                id: node.id,
                founding_year: node.founding_year,
                dissolution_year: node.dissolution_year,
                eras,
            });
        }
        nodes.sort_by(|a, b| {
            (a.founding_year, a.id.as_str()).cmp(&(b.founding_year, b.id.as_str()))
        });

        let mut links: Vec<LinkView> = self
            .store
            .events_in_range(start_year, end_year)?
            .into_iter()
            .filter(|event| event.is_fully_bound())
            .map(|event| LinkView {
                source: event.previous_node_id.unwrap_or_default(),
                target: event.next_node_id.unwrap_or_default(),
                year: event.event_year,
                event_type: event.event_type.as_str().to_string(),
            })
            .collect();
        links.sort_by(|a, b| {
            (a.year, a.source.as_str(), a.target.as_str(), a.event_type.as_str()).cmp(&(
                b.year,
                b.source.as_str(),
                b.target.as_str(),
                b.event_type.as_str(),
            ))
        });

        let meta = GraphMeta {
            year_range: [start_year, end_year],
            node_count: nodes.len(),
            link_count: links.len(),
        };
        Ok(TimelineGraph { nodes, links, meta })
    }

    /// Cached projection with content hash for conditional-read semantics.
    pub fn project_cached(
        &self,
        start_year: i32,
        end_year: i32,
        include_dissolved: bool,
        tier_filter: &[Tier],
    ) -> Result<Projection> {
        let key = ProjectionKey::new(start_year, end_year, include_dissolved, tier_filter);
        if let Some((graph, content_hash)) = self.store.cache().get(&key) {
            debug!(?key, "timeline cache hit");
            return Ok(Projection {
                graph,
                content_hash,
                from_cache: true,
            });
        }

        let graph = self.project(start_year, end_year, include_dissolved, tier_filter)?;
        let content_hash = content_hash(&graph)?;
        self.store
            .cache()
            .put(key, graph.clone(), content_hash.clone());
        Ok(Projection {
            graph,
            content_hash,
            from_cache: false,
        })
    }
}

/// Weak ETag over the canonical compact JSON form. Stable across repeated
/// calls on unchanged data because the projection's ordering is stable.
pub fn content_hash(graph: &TimelineGraph) -> Result<String> {
    let canonical = serde_json::to_string(graph)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("W/\"{:x}\"", hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================
