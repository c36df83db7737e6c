use std::collections::{HashMap, HashSet};

use assetmerge_core::{AssetId, AssetPatch, AssetRecord, AssetStore, DedupConfig, ScoreWeights};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{DedupError, Result};
use crate::grouping::{DuplicateFinder, DuplicateGroup, GroupStrategy};
use crate::merge::merge;
use crate::relink::relink;
use crate::scoring::score_with;
use crate::selector::select_with;

/// What one deduplication pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub groups_found: usize,
    pub groups_merged: usize,
    pub groups_skipped: usize,
    /// Survivors that absorbed a group.
    pub assets_merged: usize,
    pub assets_removed: usize,
    pub fields_changed: usize,
    pub dependents_relinked: usize,
    pub remaining_assets: usize,
    /// First failures only; see `error_count` for the total.
    pub errors: Vec<String>,
    pub error_count: usize,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    fn record_error(&mut self, message: String, limit: usize) {
        self.error_count += 1;
        if self.errors.len() < limit {
            self.errors.push(message);
        }
    }
}

/// A merge the executor would perform, without touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMerge {
    pub strategy: GroupStrategy,
    pub key: String,
    pub survivor_id: AssetId,
    pub survivor_score: u32,
    pub loser_ids: Vec<AssetId>,
}

#[derive(Debug, Default)]
struct GroupOutcome {
    removed: usize,
    fields_changed: usize,
    relinked: usize,
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    finder: DuplicateFinder,
    weights: ScoreWeights,
    max_reported_errors: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            finder: DuplicateFinder::default(),
            weights: ScoreWeights::default(),
            max_reported_errors: 10,
        }
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DedupConfig) -> Result<Self> {
        Ok(Self::new()
            .with_finder(DuplicateFinder::from_config(config)?)
            .with_weights(config.weights)
            .with_max_reported_errors(config.max_reported_errors))
    }

    pub fn with_finder(mut self, finder: DuplicateFinder) -> Self {
        self.finder = finder;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_reported_errors(mut self, limit: usize) -> Self {
        self.max_reported_errors = limit;
        self
    }

    /// Merge every duplicate group in `store`, one transaction per group.
    ///
    /// A group that fails with a recoverable error is rolled back and
    /// reported; its members stay eligible for later groups. A fatal error
    /// aborts the run, leaving already committed groups in place.
    pub fn run<S: AssetStore>(&self, store: &S) -> Result<RunSummary> {
        store.verify_schema()?;
        let records = store.list_all()?;
        let by_id: HashMap<AssetId, &AssetRecord> = records.iter().map(|r| (r.id, r)).collect();
        let groups = self.finder.group(&records);

        let mut summary = RunSummary {
            groups_found: groups.len(),
            ..Default::default()
        };
        info!(assets = records.len(), groups = groups.len(), "starting deduplication");

        let mut processed: HashSet<AssetId> = HashSet::new();
        for group in &groups {
            if group.member_ids.iter().any(|id| processed.contains(id)) {
                debug!(strategy = %group.strategy, key = %group.key, "group skipped, member already merged");
                summary.groups_skipped += 1;
                continue;
            }

            let members: Vec<AssetRecord> = group
                .member_ids
                .iter()
                .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
                .collect();

            match store.with_transaction(|| self.merge_group(store, &members)) {
                Ok(outcome) => {
                    processed.extend(group.member_ids.iter().copied());
                    summary.groups_merged += 1;
                    summary.assets_merged += 1;
                    summary.assets_removed += outcome.removed;
                    summary.fields_changed += outcome.fields_changed;
                    summary.dependents_relinked += outcome.relinked;
                }
                Err(err) if err.is_fatal() => {
                    error!(strategy = %group.strategy, key = %group.key, error = %err, "aborting run");
                    return Err(err);
                }
                Err(err) => {
                    warn!(strategy = %group.strategy, key = %group.key, error = %err, "group rolled back");
                    summary.record_error(describe_failure(group, &err), self.max_reported_errors);
                }
            }
        }

        summary.remaining_assets = records.len() - summary.assets_removed;
        info!(
            merged = summary.groups_merged,
            skipped = summary.groups_skipped,
            removed = summary.assets_removed,
            errors = summary.error_count,
            "deduplication finished"
        );
        Ok(summary)
    }

    /// Dry run over a snapshot: the merges `run` would attempt, in order.
    pub fn plan(&self, records: &[AssetRecord]) -> Vec<PlannedMerge> {
        let by_id: HashMap<AssetId, &AssetRecord> = records.iter().map(|r| (r.id, r)).collect();
        let mut processed: HashSet<AssetId> = HashSet::new();
        let mut planned = Vec::new();

        for group in self.finder.group(records) {
            if group.member_ids.iter().any(|id| processed.contains(id)) {
                continue;
            }
            let members: Vec<AssetRecord> = group
                .member_ids
                .iter()
                .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
                .collect();
            let Some(survivor) = select_with(&members, &self.weights) else {
                continue;
            };

            processed.extend(group.member_ids.iter().copied());
            planned.push(PlannedMerge {
                survivor_id: survivor.id,
                survivor_score: score_with(survivor, &self.weights),
                loser_ids: group
                    .member_ids
                    .iter()
                    .copied()
                    .filter(|id| *id != survivor.id)
                    .collect(),
                strategy: group.strategy,
                key: group.key,
            });
        }
        planned
    }

    fn merge_group<S: AssetStore>(&self, store: &S, members: &[AssetRecord]) -> Result<GroupOutcome> {
        let survivor = select_with(members, &self.weights).ok_or(DedupError::EmptyGroup)?;
        debug!(
            survivor = survivor.id,
            score = score_with(survivor, &self.weights),
            members = members.len(),
            "survivor chosen"
        );

        let mut outcome = GroupOutcome::default();
        let mut merged = survivor.clone();
        let losers: Vec<&AssetRecord> = members.iter().filter(|m| m.id != survivor.id).collect();

        for loser in &losers {
            let step = merge(&merged, loser);
            merged = step.record;
            outcome.fields_changed += step.fields_changed;
            outcome.relinked += relink(store, loser.id, survivor.id)?;
        }

        let patch = AssetPatch::between(survivor, &merged);
        if !patch.is_empty() {
            store.update_fields(survivor.id, &patch)?;
        }

        for loser in &losers {
            if store.delete_by_id(loser.id)? {
                outcome.removed += 1;
            }
        }

        debug!(
            survivor = survivor.id,
            removed = outcome.removed,
            fields_changed = outcome.fields_changed,
            relinked = outcome.relinked,
            "group merged"
        );
        Ok(outcome)
    }
}

fn describe_failure(group: &DuplicateGroup, err: &DedupError) -> String {
    format!(
        "{} '{}' {:?}: {}",
        group.strategy, group.key, group.member_ids, err
    )
}
