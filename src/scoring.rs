use std::collections::HashSet;
use tracing::warn;

use crate::snapshot::{AccountSnapshot, Post, Profile};
use crate::text::{common_keywords, text_similarity};

pub const MUTUAL_FOLLOWERS_CEILING: f64 = 2.0;
pub const MUTUAL_FOLLOWING_CEILING: f64 = 2.5;
pub const PROFILE_SIMILARITY_CEILING: f64 = 3.0;
pub const CONTENT_SIMILARITY_CEILING: f64 = 3.0;
pub const INTERACTION_CEILING: f64 = 2.0;

/// Clamps a category score to `[0, ceiling]`. Non-finite values collapse to 0.
fn bounded(category: &'static str, score: f64, ceiling: f64) -> f64 {
    if !score.is_finite() {
        warn!(
            action = "score",
            component = category,
            "Non-finite score, falling back to zero"
        );
        return 0.0;
    }
    score.clamp(0.0, ceiling)
}

pub fn mutual_followers_score(user1: &AccountSnapshot, user2: &AccountSnapshot) -> f64 {
    if user1.followers.is_empty() || user2.followers.is_empty() {
        return 0.0;
    }

    let mutual_count = user1.followers.intersection(&user2.followers).count();
    let score = match mutual_count {
        0 => 0.0,
        1..=5 => mutual_count as f64 * 0.2,
        6..=20 => 1.0 + (mutual_count - 5) as f64 * 0.05,
        _ => 1.75 + ((mutual_count - 20) as f64).log10(),
    };
    bounded("mutual_followers", score, MUTUAL_FOLLOWERS_CEILING)
}

pub fn mutual_following_score(user1: &AccountSnapshot, user2: &AccountSnapshot) -> f64 {
    if user1.following.is_empty() || user2.following.is_empty() {
        return 0.0;
    }

    let mutual_count = user1.following.intersection(&user2.following).count();
    let score = match mutual_count {
        0 => 0.0,
        1..=10 => mutual_count as f64 * 0.15,
        11..=50 => 1.5 + (mutual_count - 10) as f64 * 0.025,
        _ => 2.5 + ((mutual_count - 50) as f64).log10(),
    };
    bounded("mutual_following", score, MUTUAL_FOLLOWING_CEILING)
}

pub fn profile_similarity(profile1: &Profile, profile2: &Profile) -> f64 {
    let mut score = 0.0;

    let name1 = profile1.full_name.to_lowercase();
    let name2 = profile2.full_name.to_lowercase();
    if !name1.is_empty() && !name2.is_empty() {
        score += text_similarity(&name1, &name2) * 0.3;
    }

    let bio1 = profile1.biography.to_lowercase();
    let bio2 = profile2.biography.to_lowercase();
    if !bio1.is_empty() && !bio2.is_empty() {
        score += text_similarity(&bio1, &bio2) * 0.4;
        score += (common_keywords(&bio1, &bio2).len() as f64 * 0.1).min(0.5);
    }

    if profile1.is_business && profile2.is_business {
        score += 0.2;
    }
    if profile1.is_verified && profile2.is_verified {
        score += 0.1;
    }

    bounded("profile_similarity", score, PROFILE_SIMILARITY_CEILING)
}

fn overlap_ratio(set1: &HashSet<&str>, set2: &HashSet<&str>) -> f64 {
    let common = set1.intersection(set2).count();
    common as f64 / set1.len().max(set2.len()) as f64
}

fn hashtags(posts: &[Post]) -> HashSet<&str> {
    posts
        .iter()
        .flat_map(|p| p.hashtags.iter().map(String::as_str))
        .collect()
}

fn mentions(posts: &[Post]) -> HashSet<&str> {
    posts
        .iter()
        .flat_map(|p| p.mentions.iter().map(String::as_str))
        .collect()
}

fn locations(posts: &[Post]) -> HashSet<&str> {
    posts.iter().filter_map(|p| p.location.as_deref()).collect()
}

pub fn content_similarity(posts1: &[Post], posts2: &[Post]) -> f64 {
    if posts1.is_empty() || posts2.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    let (hashtags1, hashtags2) = (hashtags(posts1), hashtags(posts2));
    if !hashtags1.is_empty() && !hashtags2.is_empty() {
        score += overlap_ratio(&hashtags1, &hashtags2) * 1.5;
    }

    let (mentions1, mentions2) = (mentions(posts1), mentions(posts2));
    if !mentions1.is_empty() && !mentions2.is_empty() {
        score += overlap_ratio(&mentions1, &mentions2) * 2.0;
    }

    let (locations1, locations2) = (locations(posts1), locations(posts2));
    if !locations1.is_empty() && !locations2.is_empty() {
        let shared = locations1.intersection(&locations2).count();
        score += shared as f64 * 0.5;
    }

    bounded("content_similarity", score, CONTENT_SIMILARITY_CEILING)
}

/// One point per post in which either account mentions the other by username.
pub fn interaction_indicators(user1: &AccountSnapshot, user2: &AccountSnapshot) -> f64 {
    let mentions_of = |posts: &[Post], username: &str| -> usize {
        if username.is_empty() {
            return 0;
        }
        posts.iter().filter(|p| p.mentions.contains(username)).count()
    };

    let score = mentions_of(&user1.posts, user2.username()) as f64
        + mentions_of(&user2.posts, user1.username()) as f64;
    bounded("interaction_indicators", score, INTERACTION_CEILING)
}
