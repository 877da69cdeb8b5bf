use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

use crate::error::{Result, StarHistoryError};

/// Timestamps of the star events on one page, oldest first.
pub type PageResult = Vec<DateTime<Utc>>;

/// One point of the star growth timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarRecord {
    #[serde(rename = "date")]
    pub period: String,
    pub stars: u64,
}

/// Ordered, distinct, 1-based page numbers to request.
///
/// Plans produced by [`crate::planner::plan_pages`] always start at page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pages: Vec<u32>,
}

impl PagePlan {
    pub fn from_pages(pages: Vec<u32>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[u32] {
        &self.pages
    }
}

impl Deref for PagePlan {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.pages
    }
}

/// A repository identifier of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoName {
    full_name: String,
    split: usize,
}

impl RepoName {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() != 2 || !parts.iter().all(|part| is_valid_segment(part)) {
            return Err(StarHistoryError::InvalidRepoName(format!(
                "expected owner/name, got {:?}",
                input
            )));
        }

        Ok(RepoName {
            full_name: trimmed.to_string(),
            split: parts[0].len(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.full_name[..self.split]
    }

    pub fn name(&self) -> &str {
        &self.full_name[self.split + 1..]
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}

/// Owner and repository names are limited to ASCII letters, digits, `.`, `_`
/// and `-`, and may not be `.` or `..`.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Response body of the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoHistory {
    pub total_stars: u64,
    pub logo_url: String,
    pub data: Vec<StarRecord>,
    pub name: String,
}

/// Response body for errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
