use std::future::Future;

use crate::error::ApiError;
use crate::record::{Record, ResourcePage};

pub const PER_PAGE: u32 = 100;
pub const FIRST_PAGE: u32 = 1;

/// Walk pages from the first one until a page comes back empty.
///
/// Records are concatenated in the order the pages were returned. The first
/// failing page aborts the walk; retrying is the page fetcher's business.
pub async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Record>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ResourcePage, ApiError>>,
{
    let mut records = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        let current = fetch_page(page).await?;
        if current.is_empty() {
            break;
        }

        tracing::debug!("page {} returned {} record(s)", page, current.records.len());
        records.extend(current.records);
        page += 1;
    }

    Ok(records)
}
