use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::fetch::{fetch_planned_pages, StarSource};
use crate::models::{RepoHistory, RepoName};
use crate::planner::plan_pages;
use crate::timeline::aggregate;

/// Default number of stargazer pages requested per timeline.
pub const DEFAULT_MAX_REQUEST_AMOUNT: u32 = 15;

/// Builds star timelines for repositories from a [`StarSource`].
pub struct StarHistory<S: ?Sized> {
    source: Arc<S>,
    max_request_amount: u32,
}

impl<S: StarSource + ?Sized> StarHistory<S> {
    pub fn new(source: Arc<S>, max_request_amount: u32) -> Self {
        Self {
            source,
            max_request_amount,
        }
    }

    /// Run the whole pipeline: owner logo, star total, page count, page plan,
    /// concurrent page fetch and aggregation. The first failing step aborts the
    /// request; no partial timeline is ever returned.
    pub async fn build(&self, repo: &RepoName, as_of: DateTime<Utc>) -> Result<RepoHistory> {
        let logo_url = self.source.fetch_logo_url(repo.owner()).await?;
        let total_stars = self.source.fetch_total_star_count(repo).await?;
        let total_pages = self.source.fetch_page_count(repo).await?;

        let plan = plan_pages(total_pages, self.max_request_amount)?;
        info!(
            repo = %repo,
            total_stars,
            total_pages,
            plan_len = plan.len(),
            "Planned stargazer pages"
        );

        let pages = fetch_planned_pages(Arc::clone(&self.source), repo, &plan).await?;
        let data = aggregate(&pages, &plan, self.max_request_amount, total_stars, as_of);

        info!(repo = %repo, points = data.len(), "Star timeline built");

        Ok(RepoHistory {
            total_stars,
            logo_url,
            data,
            name: repo.full_name().to_string(),
        })
    }
}
