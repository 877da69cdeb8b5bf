use crate::error::{Result, StarHistoryError};
use crate::models::PagePlan;

/// Choose which stargazer pages to request.
///
/// When every page fits in the request budget the plan is dense (`1..=total_pages`).
/// Otherwise it holds exactly `max_request_amount` pages spread evenly over the
/// range: entry `k` is `k * total_pages / max_request_amount - 1` in integer
/// arithmetic, with the first entry pinned to page 1 so the earliest stars are
/// always represented. An entry that would not advance past its predecessor is
/// bumped to `previous + 1`, which keeps the plan strictly increasing without
/// leaving `1..=total_pages`.
pub fn plan_pages(total_pages: u32, max_request_amount: u32) -> Result<PagePlan> {
    if total_pages == 0 {
        return Err(StarHistoryError::Validation(
            "total page count must be at least 1".to_string(),
        ));
    }
    if max_request_amount == 0 {
        return Err(StarHistoryError::Validation(
            "max request amount must be at least 1".to_string(),
        ));
    }

    if total_pages < max_request_amount {
        return Ok(PagePlan::from_pages((1..=total_pages).collect()));
    }

    let total = u64::from(total_pages);
    let budget = u64::from(max_request_amount);
    let mut pages = Vec::with_capacity(max_request_amount as usize);

    for k in 1..=budget {
        let computed = (k * total / budget).saturating_sub(1);
        // computed <= total - 1, so it always fits back into a u32
        let page = match pages.last() {
            None => 1,
            Some(&previous) => (computed as u32).max(previous + 1),
        };
        pages.push(page);
    }

    Ok(PagePlan::from_pages(pages))
}
