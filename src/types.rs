use chrono::{DateTime, Utc};
use serde::Deserialize;

// GitHub API response structures
#[derive(Debug, Deserialize)]
pub struct GitHubRepo {
    pub full_name: Option<String>,
    pub stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct GitHubOwner {
    pub avatar_url: String,
}

/// One entry of the stargazers listing when requested with the
/// `application/vnd.github.v3.star+json` media type.
#[derive(Debug, Deserialize)]
pub struct Stargazer {
    pub starred_at: DateTime<Utc>,
}
