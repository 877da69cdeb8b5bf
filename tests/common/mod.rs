#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::json;
use star_history_server::error::{Result, StarHistoryError};
use star_history_server::fetch::StarSource;
use star_history_server::models::{PageResult, RepoName};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

/// `count` star events one day apart, starting at `start`.
pub fn daily_events(start: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    (0..count)
        .map(|i| start + ChronoDuration::days(i as i64))
        .collect()
}

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// How the fake answers one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    RateLimited,
    Unauthorized,
    Server,
    /// The fetch task panics instead of returning.
    Panic,
}

impl Failure {
    pub fn into_error(self, page: u32) -> StarHistoryError {
        match self {
            Failure::NotFound => StarHistoryError::NotFound(format!("page {} not found", page)),
            Failure::RateLimited => {
                StarHistoryError::RateLimitExceeded("rate limit exceeded".to_string())
            }
            Failure::Unauthorized => StarHistoryError::AuthError("Bad credentials".to_string()),
            Failure::Server => StarHistoryError::ServerError("server error".to_string()),
            Failure::Panic => panic!("fetching page {} panicked", page),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub events: Vec<DateTime<Utc>>,
    pub delay: Duration,
    pub failure: Option<Failure>,
}

/// In-memory [`StarSource`] recording how it was called.
pub struct FakeSource {
    pub logo_url: String,
    pub total_stars: u64,
    pub total_pages: u32,
    pub pages: HashMap<u32, FakePage>,
    pub barrier: Option<Arc<Barrier>>,
    pub page_calls: AtomicUsize,
    pub completed: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new(total_stars: u64, total_pages: u32) -> Self {
        FakeSource {
            logo_url: "https://avatars.example/acme.png".to_string(),
            total_stars,
            total_pages,
            pages: HashMap::new(),
            barrier: None,
            page_calls: AtomicUsize::new(0),
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(mut self, page: u32, events: Vec<DateTime<Utc>>, delay_ms: u64) -> Self {
        self.pages.insert(
            page,
            FakePage {
                events,
                delay: Duration::from_millis(delay_ms),
                failure: None,
            },
        );
        self
    }

    pub fn with_failing_page(mut self, page: u32, failure: Failure, delay_ms: u64) -> Self {
        self.pages.insert(
            page,
            FakePage {
                events: Vec::new(),
                delay: Duration::from_millis(delay_ms),
                failure: Some(failure),
            },
        );
        self
    }

    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn completion_order(&self) -> Vec<u32> {
        self.completed.lock().unwrap().clone()
    }
}

impl StarSource for FakeSource {
    fn fetch_logo_url<'a>(&'a self, _owner: &'a str) -> BoxFuture<'a, Result<String>> {
        async move { Ok(self.logo_url.clone()) }.boxed()
    }

    fn fetch_total_star_count<'a>(&'a self, repo: &'a RepoName) -> BoxFuture<'a, Result<u64>> {
        async move {
            if self.total_stars == 0 {
                return Err(StarHistoryError::NotFound(format!(
                    "repo {} does not have any stars",
                    repo
                )));
            }
            Ok(self.total_stars)
        }
        .boxed()
    }

    fn fetch_page_count<'a>(&'a self, _repo: &'a RepoName) -> BoxFuture<'a, Result<u32>> {
        async move { Ok(self.total_pages) }.boxed()
    }

    fn fetch_page<'a>(&'a self, _repo: &'a RepoName, page: u32) -> BoxFuture<'a, Result<PageResult>> {
        async move {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }

            let entry = self.pages.get(&page).cloned().unwrap_or(FakePage {
                events: Vec::new(),
                delay: Duration::ZERO,
                failure: None,
            });
            tokio::time::sleep(entry.delay).await;
            self.completed.lock().unwrap().push(page);

            match entry.failure {
                Some(failure) => Err(failure.into_error(page)),
                None => Ok(entry.events),
            }
        }
        .boxed()
    }
}

// A fake GitHub REST API served from an in-process axum server.
//
// Repositories (owner is anything except "ghost", which does not exist):
// - `rocket`: 70 stars over 3 pages, one star per day from 2022-01-01
// - `solo`: 5 stars on a single page without a Link header
// - `empty`: zero stars
// - `limited`: 403 with a rate limit reset header
// - `private`: 401
// - `broken`: 500
// - `flaky`: like `rocket`, but page 2 is rate limited

const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Clone, Default)]
struct FakeGitHubState {
    requests: Arc<AtomicUsize>,
}

pub struct FakeGitHub {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
}

impl FakeGitHub {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub async fn spawn_fake_github() -> FakeGitHub {
    let state = FakeGitHubState::default();
    let requests = Arc::clone(&state.requests);

    let app = Router::new()
        .route("/users/:owner", get(fake_user))
        .route("/repos/:owner/:name", get(fake_repo))
        .route("/repos/:owner/:name/stargazers", get(fake_stargazers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeGitHub {
        base_url: format!("http://{}", addr),
        requests,
    }
}

fn error_response(name: &str) -> Option<Response> {
    match name {
        "limited" => {
            let mut response = (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "API rate limit exceeded" })),
            )
                .into_response();
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            response
                .headers_mut()
                .insert("X-RateLimit-Reset", HeaderValue::from_static("1700000000"));
            Some(response)
        }
        "private" => Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Bad credentials" })),
            )
                .into_response(),
        ),
        "broken" => Some(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        _ => None,
    }
}

fn star_count(name: &str) -> Option<u64> {
    match name {
        "rocket" | "flaky" => Some(70),
        "solo" => Some(5),
        "empty" => Some(0),
        _ => None,
    }
}

async fn fake_user(State(state): State<FakeGitHubState>, Path(owner): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if owner == "ghost" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    }
    Json(json!({
        "login": owner,
        "avatar_url": format!("https://avatars.example/{}.png", owner),
    }))
    .into_response()
}

async fn fake_repo(
    State(state): State<FakeGitHubState>,
    Path((owner, name)): Path<(String, String)>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = error_response(&name) {
        return response;
    }
    match star_count(&name) {
        Some(count) => Json(json!({
            "full_name": format!("{}/{}", owner, name),
            "stargazers_count": count,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}

async fn fake_stargazers(
    State(state): State<FakeGitHubState>,
    Path((_owner, name)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = error_response(&name) {
        return response;
    }
    let Some(total) = star_count(&name) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    };

    let per_page = u64::from(query.per_page.unwrap_or(30));
    let page = u64::from(query.page.unwrap_or(1));
    if name == "flaky" && page == 2 && query.page.is_some() {
        return error_response("limited").unwrap();
    }

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);
    let with_timestamps = headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .map(|accept| accept == STAR_MEDIA_TYPE)
        .unwrap_or(false);

    let base = utc(2022, 1, 1);
    let body: Vec<serde_json::Value> = (start..end)
        .map(|i| {
            let user = json!({ "login": format!("user{}", i), "id": i });
            if with_timestamps {
                json!({
                    "starred_at": (base + ChronoDuration::days(i as i64)).to_rfc3339(),
                    "user": user,
                })
            } else {
                user
            }
        })
        .collect();

    let last_page = total.div_ceil(per_page).max(1);
    let mut response = Json(body).into_response();
    if last_page > 1 {
        let link = format!(
            "<https://api.github.com/repositories/1/stargazers?per_page={per_page}&page={next}>; rel=\"next\", \
             <https://api.github.com/repositories/1/stargazers?per_page={per_page}&page={last_page}>; rel=\"last\"",
            next = page + 1,
        );
        response
            .headers_mut()
            .insert(header::LINK, HeaderValue::from_str(&link).unwrap());
    }
    response
}
