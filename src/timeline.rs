use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{PagePlan, PageResult, StarRecord};

/// Stargazers per page returned by the upstream listing.
pub const STARS_PER_PAGE: u64 = 30;

/// A calendar month. Ordered chronologically; displayed as `Jan 2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        Period {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(first_day) => write!(f, "{}", first_day.format("%b %Y")),
            None => write!(f, "{:04}-{:02}", self.year, self.month),
        }
    }
}

/// Turn fetched pages into an ordered star timeline.
///
/// `pages[i]` must hold the result for `plan[i]`. A plan shorter than
/// `max_request_amount` is treated as a full listing and downsampled by rank;
/// otherwise each page contributes its first star at the milestone
/// `30 * (page - 1)`. The `as_of` month always ends up pinned to
/// `total_stars`. At most one point is kept per month and the result is
/// sorted by ascending star count.
pub fn aggregate(
    pages: &[PageResult],
    plan: &PagePlan,
    max_request_amount: u32,
    total_stars: u64,
    as_of: DateTime<Utc>,
) -> Vec<StarRecord> {
    let mut points: BTreeMap<Period, u64> = BTreeMap::new();

    if plan.len() < max_request_amount as usize {
        sample_by_rank(pages, max_request_amount, &mut points);
    } else {
        sample_by_page(pages, plan, &mut points);
    }

    points.insert(Period::of(&as_of), total_stars);

    // BTreeMap iteration is chronological and the sort is stable, so equal
    // counts stay in calendar order.
    let mut records: Vec<StarRecord> = points
        .into_iter()
        .map(|(period, stars)| StarRecord {
            period: period.label(),
            stars,
        })
        .collect();
    records.sort_by_key(|record| record.stars);
    records
}

fn sample_by_rank(pages: &[PageResult], max_request_amount: u32, points: &mut BTreeMap<Period, u64>) {
    let events: Vec<&DateTime<Utc>> = pages.iter().flatten().collect();
    let step = (events.len() / max_request_amount.max(1) as usize).max(1);

    for (index, starred_at) in events.into_iter().enumerate().step_by(step) {
        points.insert(Period::of(starred_at), index as u64 + 1);
    }
}

fn sample_by_page(pages: &[PageResult], plan: &PagePlan, points: &mut BTreeMap<Period, u64>) {
    for (page_result, &page) in pages.iter().zip(plan.iter()) {
        if let Some(first) = page_result.first() {
            let milestone = STARS_PER_PAGE * u64::from(page.saturating_sub(1));
            points.insert(Period::of(first), milestone);
        }
    }
}
