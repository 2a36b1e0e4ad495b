//! Cursor pagination.
//!
//! List endpoints answer with `{items, nextPage, hasMore}`; the cursor goes
//! back as `after`. One generic loop drains any of them.

use std::collections::HashSet;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::client::PaperspaceClient;
use crate::context::CallContext;
use crate::error::{PaperspaceError, Result};
use crate::transport::ApiRequest;

/// Largest page size the API accepts.
pub const PAGE_LIMIT: u32 = 120;

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Cursor for the following page, `None` on the last page.
    ///
    /// `hasMore` without a usable cursor is an error.
    pub fn next_cursor(&self, path: &str) -> Result<Option<&str>> {
        if !self.has_more {
            return Ok(None);
        }
        match self.next_page.as_deref() {
            Some(cursor) if !cursor.is_empty() => Ok(Some(cursor)),
            _ => Err(PaperspaceError::Pagination {
                path: path.to_string(),
                reason: "hasMore=true without nextPage",
            }),
        }
    }
}

impl PaperspaceClient {
    /// Fetch every item of a list endpoint.
    ///
    /// Any failure aborts the whole fetch; partial results are discarded.
    /// Entries may repeat across pages and are returned as-is.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0usize;

        loop {
            ctx.check(path)?;

            let mut request = ApiRequest::get(path).query("limit", PAGE_LIMIT.to_string());
            for (key, value) in params {
                request = request.query(*key, *value);
            }
            if let Some(cursor) = &after {
                request = request.query("after", cursor.as_str());
            }

            let page: Page<T> = self.send_json(request).await?;
            pages += 1;

            let next = page.next_cursor(path)?.map(str::to_string);
            if next.is_some() && next == after {
                return Err(PaperspaceError::Pagination {
                    path: path.to_string(),
                    reason: "nextPage repeats the previous cursor",
                });
            }
            items.extend(page.items);

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!(path, pages, count = items.len(), "Fetched all pages");
        Ok(items)
    }
}

/// Drop repeated entries, keeping the first occurrence of each key in order.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}
