use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::args::{Args, Command};
use crate::cache::{SnapshotStore, SqliteSnapshotStore};
use crate::engine::{ScoreEngine, DISPLAY_SCALE, MUTUAL_SAMPLE_SIZE};
use crate::rank::{rank_candidates, RankedCandidate};
use crate::report::{AnalysisOutcome, RelationshipReport};
use crate::snapshot::{read_raw_snapshot, AccountSnapshot, Post};
use crate::source::{CachedSource, DirectorySource, SnapshotSource};
use crate::utils::{format_number, format_optional, ttl_duration};

const RECENT_POSTS: usize = 5;

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub username: String,
    pub full_name: String,
    pub followers_count: Option<u64>,
    pub following_count: Option<u64>,
    pub posts_count: Option<u64>,
    pub is_private: bool,
}

impl From<&AccountSnapshot> for ProfileSummary {
    fn from(snapshot: &AccountSnapshot) -> Self {
        let profile = &snapshot.profile;
        ProfileSummary {
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            followers_count: profile.followers_count,
            following_count: profile.following_count,
            posts_count: profile.posts_count,
            is_private: profile.is_private,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PairAnalysis {
    pub user1: ProfileSummary,
    pub user2: ProfileSummary,
    pub analysis: RelationshipReport,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserOverview<'a> {
    pub profile: &'a crate::snapshot::Profile,
    pub followers_sample: Vec<&'a str>,
    pub following_sample: Vec<&'a str>,
    pub recent_posts: &'a [Post],
}

/// Builds the snapshot source for this run: the data directory, fronted by
/// the SQLite cache when one is configured.
pub fn build_source(args: &Args) -> Result<Box<dyn SnapshotSource>> {
    let directory = DirectorySource::new(&args.data_dir);
    match &args.cache {
        Some(path) => {
            let store = SqliteSnapshotStore::open(path, ttl_duration(args.ttl_hours)?)?;
            Ok(Box::new(CachedSource::new(directory, store)))
        }
        None => Ok(Box::new(directory)),
    }
}

pub fn run(args: &Args) -> Result<()> {
    let engine = ScoreEngine::new();

    match &args.command {
        Command::Analyze { user1, user2 } => {
            let source = build_source(args)?;
            let result = analyze_users(&engine, source.as_ref(), user1.trim(), user2.trim())?;
            if args.json {
                print_json(&result)?;
            } else {
                print_pair_analysis(&result);
            }
        }
        Command::Compare { file1, file2 } => {
            let raw1 = read_raw_snapshot(file1)?;
            let raw2 = read_raw_snapshot(file2)?;
            let outcome = engine.analyze_raw(raw1, raw2);
            if args.json {
                print_json(&outcome)?;
            }
            match outcome {
                AnalysisOutcome::Report(report) if !args.json => print_report(&report),
                AnalysisOutcome::Report(_) => {}
                AnalysisOutcome::Failed { error } => anyhow::bail!("Analysis failed: {}", error),
            }
        }
        Command::User { username } => {
            let source = build_source(args)?;
            let snapshot = fetch_required(source.as_ref(), username.trim())?;
            let overview = user_overview(&snapshot);
            if args.json {
                print_json(&overview)?;
            } else {
                print_user_overview(&overview);
            }
        }
        Command::Rank {
            target,
            candidates,
            top,
            workers,
        } => {
            let ranked = rank_users(args, &engine, target.trim(), candidates, *workers)?;
            let shown = top.unwrap_or(ranked.len()).min(ranked.len());
            if args.json {
                let rows: Vec<_> = ranked[..shown]
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "username": r.username,
                            "total_score": r.report.total_score,
                            "relationship_level": r.report.relationship_level,
                        })
                    })
                    .collect();
                print_json(&rows)?;
            } else {
                print_ranking(target.trim(), &ranked[..shown]);
            }
        }
        Command::ClearCache => {
            let path = args
                .cache
                .as_deref()
                .context("clear-cache requires --cache <DB>")?;
            let store = SqliteSnapshotStore::open(path, ttl_duration(args.ttl_hours)?)?;
            let removed = store.clear()?;
            if args.json {
                print_json(&serde_json::json!({ "removed": removed }))?;
            } else {
                println!("Removed {} cached snapshots", format_number(removed as u64));
            }
        }
    }

    Ok(())
}

fn fetch_required(source: &dyn SnapshotSource, username: &str) -> Result<AccountSnapshot> {
    source
        .fetch(username)
        .with_context(|| format!("Failed to collect data for {}", username))?
        .with_context(|| {
            format!("User '{}' not found or their data could not be collected", username)
        })
}

pub fn analyze_users(
    engine: &ScoreEngine,
    source: &dyn SnapshotSource,
    user1: &str,
    user2: &str,
) -> Result<PairAnalysis> {
    let start_time = Instant::now();
    info!(action = "start", component = "pair_analysis", user1, user2, "Starting relationship analysis");

    let snapshot1 = fetch_required(source, user1)?;
    let snapshot2 = fetch_required(source, user2)?;
    let analysis = engine.analyze(&snapshot1, &snapshot2);

    info!(
        action = "complete",
        component = "pair_analysis",
        total_score = analysis.total_score,
        duration_ms = start_time.elapsed().as_millis(),
        "Relationship analysis finished"
    );

    Ok(PairAnalysis {
        user1: ProfileSummary::from(&snapshot1),
        user2: ProfileSummary::from(&snapshot2),
        analysis,
        timestamp: Utc::now(),
    })
}

fn sorted_sample(items: &std::collections::HashSet<String>) -> Vec<&str> {
    let mut sample: Vec<&str> = items.iter().map(String::as_str).collect();
    sample.sort_unstable();
    sample.truncate(MUTUAL_SAMPLE_SIZE);
    sample
}

pub fn user_overview(snapshot: &AccountSnapshot) -> UserOverview<'_> {
    UserOverview {
        profile: &snapshot.profile,
        followers_sample: sorted_sample(&snapshot.followers),
        following_sample: sorted_sample(&snapshot.following),
        recent_posts: &snapshot.posts[..snapshot.posts.len().min(RECENT_POSTS)],
    }
}

fn rank_users(
    args: &Args,
    engine: &ScoreEngine,
    target: &str,
    candidates: &[String],
    workers: Option<usize>,
) -> Result<Vec<RankedCandidate>> {
    let source = build_source(args)?;
    let target_snapshot = fetch_required(source.as_ref(), target)?;

    let snapshots = if candidates.is_empty() {
        // Unreadable files in the data directory are skipped, not fatal.
        let mut snapshots = Vec::new();
        for name in DirectorySource::new(&args.data_dir).usernames()? {
            if name == target {
                continue;
            }
            match fetch_required(source.as_ref(), &name) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(action = "skip", component = "ranking", username = %name, error = %e, "Skipping unreadable candidate")
                }
            }
        }
        snapshots
    } else {
        candidates
            .iter()
            .map(|c| c.trim())
            .filter(|name| *name != target)
            .map(|name| fetch_required(source.as_ref(), name))
            .collect::<Result<Vec<_>>>()?
    };

    rank_candidates(engine, &target_snapshot, &snapshots, workers)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_profile_line(label: &str, summary: &ProfileSummary) {
    println!(
        "{}: @{} ({}) - {} followers, {} following, {} posts{}",
        label,
        summary.username,
        summary.full_name,
        format_optional(summary.followers_count),
        format_optional(summary.following_count),
        format_optional(summary.posts_count),
        if summary.is_private { ", private" } else { "" }
    );
}

pub fn print_pair_analysis(result: &PairAnalysis) {
    println!("\n--- Relationship Analysis ---");
    print_profile_line("User 1", &result.user1);
    print_profile_line("User 2", &result.user2);
    print_report(&result.analysis);
}

pub fn print_report(report: &RelationshipReport) {
    println!(
        "\nTotal score: {:.3}/{:.1} ({})",
        report.total_score, DISPLAY_SCALE, report.relationship_level
    );

    println!("\nDetailed scores:");
    for (name, score) in report.detailed_scores.entries() {
        println!("- {}: {:.3}", name, score);
    }

    let connections = &report.mutual_connections;
    println!(
        "\nMutual followers ({}): {}",
        format_number(connections.mutual_followers_count as u64),
        connections.mutual_followers.join(", ")
    );
    println!(
        "Mutual following ({}): {}",
        format_number(connections.mutual_following_count as u64),
        connections.mutual_following.join(", ")
    );

    println!("\n{}", report.analysis_summary);
}

fn print_user_overview(overview: &UserOverview) {
    let profile = overview.profile;
    println!("\n--- @{} ---", profile.username);
    if !profile.full_name.is_empty() {
        println!("Name: {}", profile.full_name);
    }
    if !profile.biography.is_empty() {
        println!("Bio: {}", profile.biography);
    }
    println!(
        "Followers: {}, Following: {}, Posts: {}",
        format_optional(profile.followers_count),
        format_optional(profile.following_count),
        format_optional(profile.posts_count)
    );
    if let Some(category) = &profile.business_category {
        println!("Business category: {}", category);
    }

    println!("\nFollowers sample: {}", overview.followers_sample.join(", "));
    println!("Following sample: {}", overview.following_sample.join(", "));

    println!("\nRecent posts: {}", overview.recent_posts.len());
    for post in overview.recent_posts {
        let mut hashtags: Vec<&str> = post.hashtags.iter().map(String::as_str).collect();
        hashtags.sort_unstable();
        println!(
            "- {} [{}]",
            post.location.as_deref().unwrap_or("no location"),
            hashtags.join(" ")
        );
    }
}

fn print_ranking(target: &str, ranked: &[RankedCandidate]) {
    println!("\nClosest accounts to @{}:", target);
    for (position, candidate) in ranked.iter().enumerate() {
        println!(
            "{}. @{}: {:.3} ({})",
            position + 1,
            candidate.username,
            candidate.report.total_score,
            candidate.report.relationship_level
        );
    }
}
