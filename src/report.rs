use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationshipLevel {
    AlmostNoConnection,
    FaintConnection,
    SlightlyConnected,
    SomewhatAcquainted,
    Close,
    VeryClose,
}

impl RelationshipLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipLevel::VeryClose => "very close relationship",
            RelationshipLevel::Close => "close relationship",
            RelationshipLevel::SomewhatAcquainted => "somewhat acquainted",
            RelationshipLevel::SlightlyConnected => "slightly connected",
            RelationshipLevel::FaintConnection => "faint connection",
            RelationshipLevel::AlmostNoConnection => "almost no connection",
        }
    }
}

impl fmt::Display for RelationshipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RelationshipLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedScores {
    pub mutual_followers: f64,
    pub mutual_following: f64,
    pub profile_similarity: f64,
    pub content_similarity: f64,
    pub interaction_indicators: f64,
}

impl DetailedScores {
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("mutual_followers", self.mutual_followers),
            ("mutual_following", self.mutual_following),
            ("profile_similarity", self.profile_similarity),
            ("content_similarity", self.content_similarity),
            ("interaction_indicators", self.interaction_indicators),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutualConnections {
    pub mutual_followers: Vec<String>,
    pub mutual_followers_count: usize,
    pub mutual_following: Vec<String>,
    pub mutual_following_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipReport {
    pub total_score: f64,
    pub relationship_level: RelationshipLevel,
    pub detailed_scores: DetailedScores,
    pub mutual_connections: MutualConnections,
    pub analysis_summary: String,
}

/// Result of scoring a pair of snapshots. A failed analysis carries only the
/// error message and serializes as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Report(RelationshipReport),
    Failed { error: String },
}

impl AnalysisOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }

    pub fn into_result(self) -> anyhow::Result<RelationshipReport> {
        match self {
            AnalysisOutcome::Report(report) => Ok(report),
            AnalysisOutcome::Failed { error } => anyhow::bail!("Analysis failed: {}", error),
        }
    }
}
