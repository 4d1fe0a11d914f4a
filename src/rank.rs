use anyhow::{Context, Result};
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::engine::ScoreEngine;
use crate::report::RelationshipReport;
use crate::snapshot::AccountSnapshot;

#[derive(Debug)]
pub struct RankedCandidate {
    pub username: String,
    pub report: RelationshipReport,
}

pub fn resolve_workers(max_workers: Option<usize>) -> usize {
    max_workers.unwrap_or_else(|| {
        let cpu_count = num_cpus::get();
        std::cmp::min(cpu_count, 8)
    })
}

/// Scores `target` against every candidate in parallel, closest first.
/// Candidates sharing the target's username are skipped.
pub fn rank_candidates(
    engine: &ScoreEngine,
    target: &AccountSnapshot,
    candidates: &[AccountSnapshot],
    max_workers: Option<usize>,
) -> Result<Vec<RankedCandidate>> {
    let start_time = Instant::now();
    let workers = resolve_workers(max_workers);
    info!(
        action = "start",
        component = "ranking",
        target = target.username(),
        candidate_count = candidates.len(),
        worker_count = workers,
        "Ranking candidates"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build ranking thread pool")?;

    let mut ranked: Vec<RankedCandidate> = pool.install(|| {
        candidates
            .par_iter()
            .filter(|c| c.username() != target.username())
            .map(|candidate| RankedCandidate {
                username: candidate.username().to_string(),
                report: engine.analyze(target, candidate),
            })
            .collect()
    });

    ranked.sort_by(|a, b| {
        b.report
            .total_score
            .total_cmp(&a.report.total_score)
            .then_with(|| a.username.cmp(&b.username))
    });

    info!(
        action = "complete",
        component = "ranking",
        ranked = ranked.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Ranking completed"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, followers: &[&str]) -> AccountSnapshot {
        let mut snapshot = AccountSnapshot::default();
        snapshot.profile.username = username.to_string();
        snapshot.followers = followers.iter().map(|s| s.to_string()).collect();
        snapshot
    }

    #[test]
    fn ranks_closest_candidates_first() {
        let target = account("target", &["a", "b", "c", "d"]);
        let candidates = vec![
            account("stranger", &["z"]),
            account("friend", &["a", "b", "c", "d"]),
            account("acquaintance", &["a"]),
            account("target", &["a", "b", "c", "d"]),
        ];

        let ranked = rank_candidates(&ScoreEngine::new(), &target, &candidates, Some(2)).unwrap();
        let order: Vec<&str> = ranked.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(order, vec!["friend", "acquaintance", "stranger"]);
    }

    #[test]
    fn default_worker_count_is_capped() {
        let workers = resolve_workers(None);
        assert!(workers >= 1 && workers <= 8);
        assert_eq!(resolve_workers(Some(3)), 3);
    }
}
