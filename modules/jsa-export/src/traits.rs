// Trait abstraction over the content catalog.
//
// The pipeline stages only need two operations from the platform: a
// title/type search and a per-layer record query. Putting them behind one
// trait lets tests run against MockCatalog with no network.

use anyhow::Result;
use async_trait::async_trait;

use agol_client::{AgolClient, ContentItem, FeatureSet};

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search the catalog by exact title and item type, capped at `max_items`.
    async fn search_items(
        &self,
        title: &str,
        item_type: &str,
        max_items: usize,
    ) -> Result<Vec<ContentItem>>;

    /// Query every record of one layer of an item.
    async fn query_layer(&self, item: &ContentItem, layer_index: usize) -> Result<FeatureSet>;
}

#[async_trait]
impl Catalog for AgolClient {
    async fn search_items(
        &self,
        title: &str,
        item_type: &str,
        max_items: usize,
    ) -> Result<Vec<ContentItem>> {
        Ok(AgolClient::search_items(self, title, item_type, max_items).await?)
    }

    async fn query_layer(&self, item: &ContentItem, layer_index: usize) -> Result<FeatureSet> {
        Ok(AgolClient::query_layer(self, item, layer_index).await?)
    }
}
