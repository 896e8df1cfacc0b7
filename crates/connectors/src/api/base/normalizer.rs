use async_trait::async_trait;
use model::{pagination::page::Page, records::record::Record};

/// Maps a raw page into envelope records. `position` is the number of
/// records already produced for the table and seeds positional ids.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, page: Page, position: usize) -> Vec<Record>;
}

/// One successful record per listed object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectNormalizer;

#[async_trait]
impl Normalizer for ObjectNormalizer {
    async fn normalize(&self, page: Page, position: usize) -> Vec<Record> {
        page.items
            .iter()
            .enumerate()
            .map(|(index, object)| Record::from_object(position + index, object))
            .collect()
    }
}
