use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{PageFailure, Result, StarHistoryError};
use crate::models::{PageResult, RepoName};

/// Upstream calls the timeline pipeline depends on.
///
/// Implementations classify every failure into a [`StarHistoryError`] and never retry.
pub trait StarSource: Send + Sync + 'static {
    /// Avatar URL of the repository owner.
    fn fetch_logo_url<'a>(&'a self, owner: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Current stargazer count. A repository without stars is reported as not found.
    fn fetch_total_star_count<'a>(&'a self, repo: &'a RepoName) -> BoxFuture<'a, Result<u64>>;

    /// Number of stargazer pages available.
    fn fetch_page_count<'a>(&'a self, repo: &'a RepoName) -> BoxFuture<'a, Result<u32>>;

    /// Star timestamps on one 1-based page, oldest first.
    fn fetch_page<'a>(&'a self, repo: &'a RepoName, page: u32) -> BoxFuture<'a, Result<PageResult>>;
}

/// Fetch every planned page concurrently, one task per page.
///
/// All tasks run to completion even when some fail. On success the returned
/// vector lines up index for index with `pages`, whatever order the responses
/// arrived in. Otherwise every failure is reported together, in plan order.
pub async fn fetch_planned_pages<S: StarSource + ?Sized>(
    source: Arc<S>,
    repo: &RepoName,
    pages: &[u32],
) -> Result<Vec<PageResult>> {
    info!(repo = %repo, plan_len = pages.len(), "Fetching stargazer pages");

    let mut tasks = JoinSet::new();

    for (index, &page) in pages.iter().enumerate() {
        let source = Arc::clone(&source);
        let repo = repo.clone();
        tasks.spawn(async move {
            let result = source.fetch_page(&repo, page).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<PageResult>>> = (0..pages.len()).map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Err(e) = &result {
                    warn!(repo = %repo, page = pages[index], "Page fetch failed: {}", e);
                } else {
                    debug!(repo = %repo, page = pages[index], "Page fetched");
                }
                slots[index] = Some(result);
            }
            // The slot stays empty and is reported below.
            Err(join_error) => {
                error!(repo = %repo, "Page fetch task did not complete: {}", join_error);
            }
        }
    }

    let mut results = Vec::with_capacity(pages.len());
    let mut failures = Vec::new();

    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(page_result)) => results.push(page_result),
            Some(Err(error)) => failures.push(PageFailure {
                page: pages[index],
                error,
            }),
            None => failures.push(PageFailure {
                page: pages[index],
                error: StarHistoryError::TaskFailed(
                    "page fetch task did not complete".to_string(),
                ),
            }),
        }
    }

    if !failures.is_empty() {
        return Err(StarHistoryError::PagesFailed {
            total: pages.len(),
            failures,
        });
    }

    Ok(results)
}
