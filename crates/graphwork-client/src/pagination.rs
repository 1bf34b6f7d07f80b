//! Paginated collection traversal.
//!
//! Collections are served as `{ "value": [...], "@odata.nextLink": "<url>" }`.
//! The fetcher follows `@odata.nextLink` verbatim until it disappears and
//! yields items lazily, so a failure on page N leaves the items of pages
//! 1..N with the caller.
//!
//! A page with no `value` array ends the traversal without an error. That is
//! deliberate leniency for endpoints that answer a paging request with a
//! different shape; it is logged at `warn`.

use std::collections::HashSet;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use graphwork_auth::BearerToken;
use serde_json::Value;

use crate::client::GraphClient;
use crate::error::PaginationError;
use crate::types::{CollectionResult, Page, PageBody, ResourceItem};

/// Stream every item of the collection starting at `start`.
///
/// - Items are yielded in page order, then in-page order.
/// - An item whose `id` was already yielded is skipped.
/// - A cursor that was already fetched ends the traversal.
/// - The stream is not restartable; a failed traversal must be re-run from `start`.
///
/// Each `@odata.nextLink` must be a valid absolute URL. It is requested without
/// edits beyond the normalisation of [`url::Url`] parsing, which leaves an
/// encoded cursor as it is but percent-encodes raw spaces and quotes.
pub fn fetch_all<'a>(
    client: &'a GraphClient,
    token: &'a BearerToken,
    start: String,
) -> impl Stream<Item = Result<ResourceItem, PaginationError>> + 'a {
    try_stream! {
        let mut next = Some(start);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut page_number = 0usize;

        while let Some(cursor) = next.take() {
            if !visited.insert(cursor.clone()) {
                tracing::warn!(cursor = %cursor, "cursor repeated, ending traversal");
                break;
            }
            page_number += 1;
            tracing::debug!(page = page_number, cursor = %cursor, "fetching page");

            let body = client
                .get(&cursor, token)
                .await
                .map_err(|source| PaginationError::PageFetchFailed {
                    cursor: cursor.clone(),
                    source,
                })?;

            let Some(page) = parse_page(body, &cursor)? else {
                tracing::warn!(
                    page = page_number,
                    cursor = %cursor,
                    "page has no items field, treating as end of collection"
                );
                break;
            };

            tracing::debug!(
                page = page_number,
                items = page.items.len(),
                has_next = page.next_link.is_some(),
                "page received"
            );
            if page.items.is_empty() {
                break;
            }
            next = page.next_link;

            for item in page.items {
                if let Some(id) = item.id() {
                    if !seen_ids.insert(id.to_string()) {
                        tracing::debug!(id, "skipping duplicate item");
                        continue;
                    }
                }
                yield item;
            }
        }
    }
}

/// Drain [`fetch_all`] into a [`CollectionResult`].
pub async fn collect_all(
    client: &GraphClient,
    token: &BearerToken,
    start: String,
) -> Result<CollectionResult, PaginationError> {
    let stream = fetch_all(client, token, start);
    futures::pin_mut!(stream);

    let mut result = CollectionResult::default();
    while let Some(item) = stream.next().await {
        result.push(item?);
    }
    Ok(result)
}

/// Parse one response; `Ok(None)` when it has no usable `value` array.
pub(crate) fn parse_page(body: Value, cursor: &str) -> Result<Option<Page>, PaginationError> {
    let Ok(PageBody { value, next_link }) = serde_json::from_value::<PageBody>(body) else {
        return Ok(None);
    };
    let Some(values) = value else {
        return Ok(None);
    };

    let items = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            ResourceItem::from_value(value).ok_or_else(|| PaginationError::MalformedItem {
                cursor: cursor.to_string(),
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Page {
        items,
        next_link: next_link.filter(|link| !link.is_empty()),
    }))
}
