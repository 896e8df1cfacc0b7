use crate::api::base::{error::ApiError, normalizer::Normalizer};
use async_trait::async_trait;
use futures_util::{Stream, TryStreamExt, stream};
use model::{
    pagination::{cursor::PageCursor, page::Page},
    records::record::Record,
};
use tracing::{debug, warn};

/// One vendor pagination protocol: turns a cursor into a raw page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page, ApiError>;

    /// Human readable endpoint for logs and error context.
    fn endpoint(&self) -> String;
}

/// Orchestrator-facing capability: the complete envelope record set of one
/// table for one run.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>, ApiError>;
}

/// Lazy, finite sequence of pages. Ends after the first page without a
/// continuation, after an empty page, or on the first page-level error.
pub fn pages<'a, F>(fetcher: &'a F) -> impl Stream<Item = Result<Page, ApiError>> + Send + 'a
where
    F: PageFetcher + ?Sized,
{
    stream::try_unfold(Some(PageCursor::Initial), move |cursor| async move {
        let Some(cursor) = cursor else {
            return Ok(None);
        };

        let page = fetcher.fetch_page(&cursor).await?;
        debug!(
            endpoint = %fetcher.endpoint(),
            items = page.len(),
            has_more = page.has_more(),
            "Fetched page"
        );

        let next = if page.is_empty() {
            None
        } else {
            match page.next_cursor.clone() {
                Some(next) if next == cursor => {
                    warn!(endpoint = %fetcher.endpoint(), ?next, "Continuation did not advance");
                    return Err(ApiError::malformed(
                        fetcher.endpoint(),
                        "continuation cursor did not advance",
                    ));
                }
                other => other,
            }
        };

        Ok(Some((page, next)))
    })
}

/// A fetcher paired with the normalizer for its extraction strategy.
pub struct TableExtraction<F, N> {
    fetcher: F,
    normalizer: N,
}

impl<F, N> TableExtraction<F, N>
where
    F: PageFetcher,
    N: Normalizer,
{
    pub fn new(fetcher: F, normalizer: N) -> Self {
        Self {
            fetcher,
            normalizer,
        }
    }
}

#[async_trait]
impl<F, N> Extractor for TableExtraction<F, N>
where
    F: PageFetcher,
    N: Normalizer,
{
    async fn extract(&self) -> Result<Vec<Record>, ApiError> {
        let mut records = Vec::new();
        let pages = pages(&self.fetcher);
        futures_util::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            let normalized = self.normalizer.normalize(page, records.len()).await;
            records.extend(normalized);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::base::normalizer::ObjectNormalizer;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves a fixed list of pages keyed by call order.
    struct StaticPages {
        pages: Mutex<Vec<Page>>,
        seen: Mutex<Vec<PageCursor>>,
    }

    impl StaticPages {
        fn new(mut pages: Vec<Page>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StaticPages {
        async fn fetch_page(&self, cursor: &PageCursor) -> Result<Page, ApiError> {
            self.seen.lock().unwrap().push(cursor.clone());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::Transport("exhausted".into()))
        }

        fn endpoint(&self) -> String {
            "static".into()
        }
    }

    #[tokio::test]
    async fn follows_cursor_until_exhausted() {
        let fetcher = StaticPages::new(vec![
            Page::new(vec![json!({"id": "a"})], Some(PageCursor::Token("c1".into())), true),
            Page::new(vec![json!({"id": "b"})], Some(PageCursor::Token("c2".into())), true),
            Page::new(vec![json!({"id": "c"})], None, false),
        ]);

        let extraction = TableExtraction::new(fetcher, ObjectNormalizer);
        let records = extraction.extract().await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        let seen = extraction.fetcher.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                PageCursor::Initial,
                PageCursor::Token("c1".into()),
                PageCursor::Token("c2".into()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_first_page_yields_nothing() {
        let fetcher = StaticPages::new(vec![Page::new(
            vec![],
            Some(PageCursor::Token("never".into())),
            true,
        )]);

        let records = TableExtraction::new(fetcher, ObjectNormalizer)
            .extract()
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn positions_continue_across_pages() {
        let fetcher = StaticPages::new(vec![
            Page::new(vec![json!({"x": 1}), json!({"x": 2})], Some(PageCursor::Offset { offset: 2 }), true),
            Page::new(vec![json!({"x": 3})], None, false),
        ]);

        let records = TableExtraction::new(fetcher, ObjectNormalizer)
            .extract()
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["0", "1", "2"]);
    }

    #[tokio::test]
    async fn page_error_aborts_extraction() {
        let fetcher = StaticPages::new(vec![Page::new(
            vec![json!({"id": "a"})],
            Some(PageCursor::Token("c1".into())),
            true,
        )]);

        let result = TableExtraction::new(fetcher, ObjectNormalizer).extract().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn stalled_cursor_is_rejected() {
        let fetcher = StaticPages::new(vec![
            Page::new(vec![json!({"id": "a"})], Some(PageCursor::Start { start: 50 }), true),
            Page::new(vec![json!({"id": "b"})], Some(PageCursor::Start { start: 50 }), true),
        ]);

        let result = TableExtraction::new(fetcher, ObjectNormalizer).extract().await;
        assert!(matches!(result, Err(ApiError::MalformedPage { .. })));
    }
}
