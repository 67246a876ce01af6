//! Input validation and synonym resolution for CLI input.
//!
//! Provides O(1) synonym maps so users can type natural words for statuses,
//! types, and priorities. Three-tier resolution: exact match → synonym
//! lookup → error with suggestion.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::model::{IssueStatus, IssueType, LinkType, Priority};

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, IssueStatus>> = LazyLock::new(|| {
    [
        ("open", IssueStatus::Todo),
        ("new", IssueStatus::Todo),
        ("ready", IssueStatus::Todo),
        ("wip", IssueStatus::InProgress),
        ("doing", IssueStatus::InProgress),
        ("started", IssueStatus::InProgress),
        ("review", IssueStatus::InReview),
        ("reviewing", IssueStatus::InReview),
        ("closed", IssueStatus::Done),
        ("complete", IssueStatus::Done),
        ("completed", IssueStatus::Done),
        ("resolved", IssueStatus::Done),
        ("canceled", IssueStatus::Cancelled),
        ("wontfix", IssueStatus::Cancelled),
    ]
    .into_iter()
    .collect()
});

pub static TYPE_SYNONYMS: LazyLock<HashMap<&str, IssueType>> = LazyLock::new(|| {
    [
        ("feature", IssueType::Story),
        ("enhancement", IssueType::Story),
        ("defect", IssueType::Bug),
        ("chore", IssueType::Task),
        ("ticket", IssueType::Task),
        ("research", IssueType::Spike),
        ("investigation", IssueType::Spike),
        ("adr", IssueType::Decision),
        ("initiative", IssueType::Epic),
    ]
    .into_iter()
    .collect()
});

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, Priority>> = LazyLock::new(|| {
    [
        ("p0", Priority::Critical),
        ("urgent", Priority::Critical),
        ("blocker", Priority::Critical),
        ("p1", Priority::High),
        ("important", Priority::High),
        ("p2", Priority::Medium),
        ("normal", Priority::Medium),
        ("p3", Priority::Low),
        ("minor", Priority::Low),
        ("trivial", Priority::Low),
    ]
    .into_iter()
    .collect()
});

/// Normalize a status string via exact match or synonym lookup.
///
/// Returns the canonical status, or an error with the original input
/// and an optional suggestion.
pub fn normalize_status(input: &str) -> Result<IssueStatus, (String, Option<String>)> {
    let lower = input.trim().to_lowercase().replace(['-', ' '], "_");

    // Tier 1: exact match
    if let Ok(status) = lower.parse::<IssueStatus>() {
        return Ok(status);
    }

    // Tier 2: synonym lookup
    if let Some(&status) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Ok(status);
    }

    // Tier 3: find closest suggestion
    let names: Vec<&str> = IssueStatus::ALL.iter().map(IssueStatus::as_str).collect();
    Err((input.to_string(), find_closest_match(&lower, &names)))
}

/// Normalize an issue type string via exact match or synonym lookup.
pub fn normalize_type(input: &str) -> Result<IssueType, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Ok(t) = lower.parse::<IssueType>() {
        return Ok(t);
    }

    if let Some(&t) = TYPE_SYNONYMS.get(lower.as_str()) {
        return Ok(t);
    }

    let names: Vec<&str> = IssueType::ALL.iter().map(IssueType::as_str).collect();
    Err((input.to_string(), find_closest_match(&lower, &names)))
}

/// Normalize a priority from a name, synonym, or P-notation (P0-P3).
pub fn normalize_priority(input: &str) -> Result<Priority, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Ok(p) = lower.parse::<Priority>() {
        return Ok(p);
    }

    if let Some(&p) = PRIORITY_SYNONYMS.get(lower.as_str()) {
        return Ok(p);
    }

    Err((
        input.to_string(),
        Some("Use critical, high, medium, low, or P0-P3".to_string()),
    ))
}

/// Parse a link type, accepting dashes or spaces in place of underscores.
pub fn normalize_link_type(input: &str) -> Result<LinkType, (String, Option<String>)> {
    let lower = input.trim().to_lowercase().replace(['-', ' '], "_");

    if let Ok(t) = lower.parse::<LinkType>() {
        return Ok(t);
    }

    let names: Vec<&str> = LinkType::ALL.iter().map(LinkType::as_str).collect();
    Err((input.to_string(), find_closest_match(&lower, &names)))
}

/// Whether `key` is a valid project key: 2-10 uppercase ASCII letters or
/// digits, starting with a letter.
#[must_use]
pub fn is_valid_project_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (2..=10).contains(&key.len())
        && first.is_ascii_uppercase()
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Split a tracking id like `ENG-12` into its project key and number.
#[must_use]
pub fn parse_tracking_id(id: &str) -> Option<(&str, u64)> {
    let (key, number) = id.rsplit_once('-')?;
    let n = number.parse().ok()?;
    is_valid_project_key(key).then_some((key, n))
}

/// Find the closest valid value within edit distance 3.
fn find_closest_match(input: &str, valid: &[&str]) -> Option<String> {
    valid
        .iter()
        .map(|v| (levenshtein_distance(input, v), *v))
        .filter(|(dist, _)| *dist <= 3)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, v)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find existing tracking ids similar to the searched one.
///
/// Returns up to `max` suggestions with edit distance ≤ 2,
/// sorted by distance then alphabetically.
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 2)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}
