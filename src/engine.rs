use std::collections::HashSet;
use tracing::{info, warn};

use crate::report::{
    AnalysisOutcome, DetailedScores, MutualConnections, RelationshipLevel, RelationshipReport,
};
use crate::scoring;
use crate::snapshot::{AccountSnapshot, RawSnapshot};

pub const DISPLAY_SCALE: f64 = 3.0;
pub const MUTUAL_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub mutual_followers: f64,
    pub mutual_following: f64,
    pub profile_similarity: f64,
    pub content_similarity: f64,
    pub interaction_indicators: f64,
}

impl Weights {
    pub const STANDARD: Weights = Weights {
        mutual_followers: 0.30,
        mutual_following: 0.25,
        profile_similarity: 0.20,
        content_similarity: 0.15,
        interaction_indicators: 0.10,
    };

    pub fn sum(&self) -> f64 {
        self.mutual_followers
            + self.mutual_following
            + self.profile_similarity
            + self.content_similarity
            + self.interaction_indicators
    }

    pub fn apply(&self, scores: &DetailedScores) -> f64 {
        scores.mutual_followers * self.mutual_followers
            + scores.mutual_following * self.mutual_following
            + scores.profile_similarity * self.profile_similarity
            + scores.content_similarity * self.content_similarity
            + scores.interaction_indicators * self.interaction_indicators
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights::STANDARD
    }
}

/// Scores the relationship between two account snapshots.
///
/// The engine holds nothing but its weight table, so a single instance can be
/// shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    weights: Weights,
}

impl ScoreEngine {
    pub fn new() -> Self {
        ScoreEngine::default()
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn detailed_scores(
        &self,
        user1: &AccountSnapshot,
        user2: &AccountSnapshot,
    ) -> DetailedScores {
        DetailedScores {
            mutual_followers: scoring::mutual_followers_score(user1, user2),
            mutual_following: scoring::mutual_following_score(user1, user2),
            profile_similarity: scoring::profile_similarity(&user1.profile, &user2.profile),
            content_similarity: scoring::content_similarity(&user1.posts, &user2.posts),
            interaction_indicators: scoring::interaction_indicators(user1, user2),
        }
    }

    pub fn analyze(&self, user1: &AccountSnapshot, user2: &AccountSnapshot) -> RelationshipReport {
        let scores = self.detailed_scores(user1, user2);
        let total_score = self.weights.apply(&scores);
        let relationship_level = classify(total_score);
        let mutual_connections = mutual_connections(user1, user2);
        let analysis_summary = summarize(user1, user2, total_score, &mutual_connections);

        info!(
            action = "complete",
            component = "relationship_analysis",
            user1 = user1.username(),
            user2 = user2.username(),
            total_score,
            level = relationship_level.label(),
            "Relationship analysis completed"
        );

        RelationshipReport {
            total_score: round3(total_score),
            relationship_level,
            detailed_scores: DetailedScores {
                mutual_followers: round3(scores.mutual_followers),
                mutual_following: round3(scores.mutual_following),
                profile_similarity: round3(scores.profile_similarity),
                content_similarity: round3(scores.content_similarity),
                interaction_indicators: round3(scores.interaction_indicators),
            },
            mutual_connections,
            analysis_summary,
        }
    }

    /// Normalizes both raw snapshots and scores them. Snapshots that cannot
    /// be normalized produce [`AnalysisOutcome::Failed`] instead of an error.
    pub fn analyze_raw(&self, user1: RawSnapshot, user2: RawSnapshot) -> AnalysisOutcome {
        let normalized = AccountSnapshot::try_from(user1)
            .and_then(|a| AccountSnapshot::try_from(user2).map(|b| (a, b)));

        match normalized {
            Ok((a, b)) => AnalysisOutcome::Report(self.analyze(&a, &b)),
            Err(e) => {
                warn!(action = "normalize", component = "relationship_analysis", error = %e, "Relationship analysis failed");
                AnalysisOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub fn classify(score: f64) -> RelationshipLevel {
    if score >= 2.5 {
        RelationshipLevel::VeryClose
    } else if score >= 2.0 {
        RelationshipLevel::Close
    } else if score >= 1.5 {
        RelationshipLevel::SomewhatAcquainted
    } else if score >= 1.0 {
        RelationshipLevel::SlightlyConnected
    } else if score >= 0.5 {
        RelationshipLevel::FaintConnection
    } else {
        RelationshipLevel::AlmostNoConnection
    }
}

/// Sorted so the sample is the same on every run.
fn sample(set1: &HashSet<String>, set2: &HashSet<String>) -> (Vec<String>, usize) {
    let mut shared: Vec<String> = set1.intersection(set2).cloned().collect();
    let count = shared.len();
    shared.sort_unstable();
    shared.truncate(MUTUAL_SAMPLE_SIZE);
    (shared, count)
}

pub fn mutual_connections(user1: &AccountSnapshot, user2: &AccountSnapshot) -> MutualConnections {
    let (mutual_followers, mutual_followers_count) = sample(&user1.followers, &user2.followers);
    let (mutual_following, mutual_following_count) = sample(&user1.following, &user2.following);

    MutualConnections {
        mutual_followers,
        mutual_followers_count,
        mutual_following,
        mutual_following_count,
    }
}

fn display_name(snapshot: &AccountSnapshot, fallback: &'static str) -> String {
    match snapshot.username() {
        "" => fallback.to_string(),
        name => name.to_string(),
    }
}

pub fn summarize(
    user1: &AccountSnapshot,
    user2: &AccountSnapshot,
    total_score: f64,
    connections: &MutualConnections,
) -> String {
    let name1 = display_name(user1, "User1");
    let name2 = display_name(user2, "User2");

    let mut summary = format!(
        "Relationship analysis for {} and {}:\n\
         - Overall closeness score: {:.2}/{:.1}\n\
         - Relationship level: {}\n\
         - Mutual followers: {}\n\
         - Mutual following: {}",
        name1,
        name2,
        total_score,
        DISPLAY_SCALE,
        classify(total_score),
        connections.mutual_followers_count,
        connections.mutual_following_count,
    );

    if connections.mutual_followers_count > 0 || connections.mutual_following_count > 0 {
        summary.push_str("\n\nKey connection factors:");
    }
    if connections.mutual_followers_count > 0 {
        summary.push_str(&format!(
            "\n- {} shared followers suggest they belong to the same community",
            connections.mutual_followers_count
        ));
    }
    if connections.mutual_following_count > 0 {
        summary.push_str(&format!(
            "\n- Following {} of the same accounts points to similar interests",
            connections.mutual_following_count
        ));
    }

    summary
}

pub fn analyze_relationship(user1: RawSnapshot, user2: RawSnapshot) -> AnalysisOutcome {
    ScoreEngine::new().analyze_raw(user1, user2)
}

/// Mean of the mutual-followers and mutual-following scores.
pub fn follow_score(user1: &AccountSnapshot, user2: &AccountSnapshot) -> f64 {
    (scoring::mutual_followers_score(user1, user2) + scoring::mutual_following_score(user1, user2))
        / 2.0
}

/// Rounded total score, or 0.0 when the analysis fails.
pub fn total_score(user1: RawSnapshot, user2: RawSnapshot) -> f64 {
    match analyze_relationship(user1, user2) {
        AnalysisOutcome::Report(report) => report.total_score,
        AnalysisOutcome::Failed { .. } => 0.0,
    }
}
