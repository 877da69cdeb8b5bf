use crate::error::{Result, StarHistoryError};
use crate::fetch::StarSource;
use crate::models::{PageResult, RepoName};
use crate::types::{GitHubOwner, GitHubRepo, Stargazer};
use chrono::DateTime;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";
const PER_PAGE: u32 = 30;
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";

/// Build the shared HTTP client used for all upstream requests.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!("star-history-server/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// What a failed response was asking for, used to word not-found errors.
#[derive(Debug, Clone, Copy)]
enum Resource<'a> {
    User(&'a str),
    Repository(&'a str),
}

pub struct GitHubClient {
    client: Client,
    base_url: Url,
    authorization: Option<String>,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(30))?;
        Self::with_client(client, API_BASE_URL, Some(token))
    }

    /// Client against `base_url` reusing an existing connection pool.
    ///
    /// `token` may be a bare token or a full `Authorization` value such as
    /// `Bearer abc`; bare tokens are sent as bearer credentials.
    pub fn with_client(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StarHistoryError::Validation(format!(
                "API base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(GitHubClient {
            client,
            base_url,
            authorization: token.and_then(|t| authorization_value(&t)),
        })
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StarHistoryError::Validation(format!(
                    "API base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn make_request(&self, url: Url, accept: &str, resource: Resource<'_>) -> Result<Response> {
        debug!(%url, "GitHub request");

        let mut request = self.client.get(url).header(ACCEPT, accept);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(classify_status(status, response.headers(), resource))
    }

    pub async fn get_repository_info(&self, repo: &RepoName) -> Result<GitHubRepo> {
        let url = self.endpoint(&["repos", repo.owner(), repo.name()])?;
        let response = self
            .make_request(url, STAR_MEDIA_TYPE, Resource::Repository(repo.full_name()))
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn get_owner(&self, owner: &str) -> Result<GitHubOwner> {
        let url = self.endpoint(&["users", owner])?;
        let response = self
            .make_request(url, JSON_MEDIA_TYPE, Resource::User(owner))
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn stargazers_url(&self, repo: &RepoName, page: Option<u32>) -> Result<Url> {
        let mut url = self.endpoint(&["repos", repo.owner(), repo.name(), "stargazers"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &PER_PAGE.to_string());
            if let Some(page) = page {
                query.append_pair("page", &page.to_string());
            }
        }
        Ok(url)
    }

    pub async fn get_page_count(&self, repo: &RepoName) -> Result<u32> {
        let url = self.stargazers_url(repo, None)?;
        let response = self
            .make_request(url, JSON_MEDIA_TYPE, Resource::Repository(repo.full_name()))
            .await?;

        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .and_then(last_page_from_link);

        match last_page {
            Some(pages) => Ok(pages),
            None => {
                debug!(repo = %repo, "No pagination link, assuming a single page");
                Ok(1)
            }
        }
    }

    /// Fetch a page of stargazer timestamps for a repository
    pub async fn fetch_stargazers_page(&self, repo: &RepoName, page: u32) -> Result<PageResult> {
        let url = self.stargazers_url(repo, Some(page))?;
        let response = self
            .make_request(url, STAR_MEDIA_TYPE, Resource::Repository(repo.full_name()))
            .await?;

        let body = response.bytes().await?;
        let stargazers: Vec<Stargazer> = serde_json::from_slice(&body)?;
        Ok(stargazers.into_iter().map(|s| s.starred_at).collect())
    }
}

impl StarSource for GitHubClient {
    fn fetch_logo_url<'a>(&'a self, owner: &'a str) -> BoxFuture<'a, Result<String>> {
        async move { Ok(self.get_owner(owner).await?.avatar_url) }.boxed()
    }

    fn fetch_total_star_count<'a>(&'a self, repo: &'a RepoName) -> BoxFuture<'a, Result<u64>> {
        async move {
            let info = self.get_repository_info(repo).await?;
            if info.stargazers_count == 0 {
                return Err(StarHistoryError::NotFound(format!(
                    "repo {} does not have any stars",
                    repo
                )));
            }
            Ok(info.stargazers_count)
        }
        .boxed()
    }

    fn fetch_page_count<'a>(&'a self, repo: &'a RepoName) -> BoxFuture<'a, Result<u32>> {
        self.get_page_count(repo).boxed()
    }

    fn fetch_page<'a>(&'a self, repo: &'a RepoName, page: u32) -> BoxFuture<'a, Result<PageResult>> {
        self.fetch_stargazers_page(repo, page).boxed()
    }
}

/// Normalise a caller supplied credential into an `Authorization` header value.
///
/// Blank input yields `None`. Values that already carry a scheme are kept as is.
pub fn authorization_value(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let has_scheme = token
        .split_once(' ')
        .map(|(scheme, rest)| !rest.trim().is_empty() && !scheme.is_empty())
        .unwrap_or(false);
    if has_scheme {
        Some(token.to_string())
    } else {
        Some(format!("Bearer {}", token))
    }
}

fn classify_status(status: StatusCode, headers: &HeaderMap, resource: Resource<'_>) -> StarHistoryError {
    match status {
        StatusCode::UNAUTHORIZED => StarHistoryError::AuthError("Bad credentials".to_string()),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            let reset = headers
                .get("X-RateLimit-Reset")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));
            warn!(status = status.as_u16(), "GitHub rate limit hit");
            match reset {
                Some(reset_at) => StarHistoryError::RateLimitExceeded(format!(
                    "rate limit exceeded, resets at {}",
                    reset_at.to_rfc3339()
                )),
                None => StarHistoryError::RateLimitExceeded("rate limit exceeded".to_string()),
            }
        }
        StatusCode::NOT_FOUND => match resource {
            Resource::User(owner) => StarHistoryError::NotFound(format!("user {} not found", owner)),
            Resource::Repository(repo) => {
                StarHistoryError::NotFound(format!("repository {} not found", repo))
            }
        },
        status if status.is_server_error() => StarHistoryError::ServerError("server error".to_string()),
        status => StarHistoryError::ServerError(format!("unexpected error: {}", status)),
    }
}

/// Extract the `page` query parameter of the `rel="last"` entry of a `Link` header.
pub fn last_page_from_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_last = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"last\"" || param == "rel=last"
        });
        if !is_last {
            return None;
        }

        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<u32>().ok())
    })
}
