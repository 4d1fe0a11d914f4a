use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Profile fields as they arrive on the wire. Every key may be missing, null,
/// or of the wrong type; none of them can fail a snapshot.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawProfile {
    pub username: Option<Value>,
    pub full_name: Option<Value>,
    pub biography: Option<Value>,
    pub followers_count: Option<Value>,
    pub followers: Option<Value>,
    pub following_count: Option<Value>,
    pub followees: Option<Value>,
    pub posts_count: Option<Value>,
    pub is_private: Option<Value>,
    pub is_verified: Option<Value>,
    pub is_business: Option<Value>,
    pub business_account: Option<Value>,
    pub business_category: Option<Value>,
}

fn text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn count(value: &Option<Value>) -> Option<u64> {
    value.as_ref().and_then(Value::as_u64)
}

fn flag(value: &Option<Value>) -> Option<bool> {
    value.as_ref().and_then(Value::as_bool)
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawPost {
    pub hashtags: Option<Vec<String>>,
    pub mentions: Option<Vec<String>>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawSnapshot {
    pub profile: Option<RawProfile>,
    pub followers: Option<Vec<String>>,
    pub following: Option<Vec<String>>,
    pub posts: Option<Vec<RawPost>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub username: String,
    pub full_name: String,
    pub biography: String,
    pub followers_count: Option<u64>,
    pub following_count: Option<u64>,
    pub posts_count: Option<u64>,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_business: bool,
    pub business_category: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Post {
    pub hashtags: HashSet<String>,
    pub mentions: HashSet<String>,
    pub location: Option<String>,
}

/// A point-in-time bundle of one account's public data, with every optional
/// field already defaulted. Posts are kept most-recent-first.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub profile: Profile,
    pub followers: HashSet<String>,
    pub following: HashSet<String>,
    pub posts: Vec<Post>,
}

impl From<RawProfile> for Profile {
    fn from(raw: RawProfile) -> Self {
        Profile {
            followers_count: count(&raw.followers_count).or_else(|| count(&raw.followers)),
            following_count: count(&raw.following_count).or_else(|| count(&raw.followees)),
            posts_count: count(&raw.posts_count),
            is_private: flag(&raw.is_private).unwrap_or(false),
            is_verified: flag(&raw.is_verified).unwrap_or(false),
            is_business: flag(&raw.is_business)
                .or_else(|| flag(&raw.business_account))
                .unwrap_or(false),
            business_category: Some(text(raw.business_category)).filter(|c| !c.is_empty()),
            username: text(raw.username),
            full_name: text(raw.full_name),
            biography: text(raw.biography),
        }
    }
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Post {
            hashtags: raw.hashtags.unwrap_or_default().into_iter().collect(),
            mentions: raw.mentions.unwrap_or_default().into_iter().collect(),
            location: raw.location.filter(|l| !l.is_empty()),
        }
    }
}

impl TryFrom<RawSnapshot> for AccountSnapshot {
    type Error = anyhow::Error;

    fn try_from(raw: RawSnapshot) -> Result<Self> {
        let profile = match raw.profile {
            Some(profile) => Profile::from(profile),
            None => anyhow::bail!("snapshot is missing the profile mapping"),
        };

        Ok(AccountSnapshot {
            profile,
            followers: raw.followers.unwrap_or_default().into_iter().collect(),
            following: raw.following.unwrap_or_default().into_iter().collect(),
            posts: raw
                .posts
                .unwrap_or_default()
                .into_iter()
                .map(Post::from)
                .collect(),
        })
    }
}

impl AccountSnapshot {
    pub fn username(&self) -> &str {
        &self.profile.username
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json).context("Invalid snapshot JSON")?;
        AccountSnapshot::try_from(raw)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize snapshot")
    }
}

pub fn read_raw_snapshot(path: &Path) -> Result<RawSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid snapshot JSON in {:?}", path))
}
