// Test mocks for the export pipeline.
//
// MockCatalog (Catalog) — registered items plus per-item feature sets,
// with failure injection and a layer-query counter so tests can assert
// that cached items cost zero network calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use agol_client::{ContentItem, Feature, FeatureSet, FieldInfo};

use crate::traits::Catalog;

/// In-memory catalog. Builder pattern: `.with_item()`, `.with_failing_item()`.
#[derive(Default)]
pub struct MockCatalog {
    items: Vec<ContentItem>,
    layers: HashMap<String, FeatureSet>,
    failing: HashSet<String>,
    layer_queries: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item whose first layer yields the given table.
    pub fn with_item(mut self, title: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        self.items.push(test_item(title));
        self.layers.insert(title.to_string(), feature_set(columns, rows));
        self
    }

    /// Register an item whose layer query always fails.
    pub fn with_failing_item(mut self, title: &str) -> Self {
        self.items.push(test_item(title));
        self.failing.insert(title.to_string());
        self
    }

    /// Layer queries issued so far.
    pub fn layer_query_count(&self) -> usize {
        self.layer_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn search_items(
        &self,
        _title: &str,
        _item_type: &str,
        max_items: usize,
    ) -> Result<Vec<ContentItem>> {
        Ok(self.items.iter().take(max_items).cloned().collect())
    }

    async fn query_layer(&self, item: &ContentItem, _layer_index: usize) -> Result<FeatureSet> {
        self.layer_queries.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(&item.title) {
            bail!("layer query failed for '{}'", item.title);
        }
        match self.layers.get(&item.title) {
            Some(fs) => Ok(fs.clone()),
            None => bail!("no layer registered for '{}'", item.title),
        }
    }
}

fn test_item(title: &str) -> ContentItem {
    ContentItem {
        id: format!("id-{title}"),
        title: title.to_string(),
        item_type: "Feature Layer".to_string(),
        url: Some(format!("https://example.test/{title}/FeatureServer")),
    }
}

fn feature_set(columns: &[&str], rows: &[&[&str]]) -> FeatureSet {
    let fields = columns
        .iter()
        .map(|name| FieldInfo {
            name: name.to_string(),
            field_type: None,
            alias: None,
        })
        .collect();
    let features = rows
        .iter()
        .map(|row| {
            let attributes = columns
                .iter()
                .zip(row.iter())
                .map(|(col, cell)| (col.to_string(), Value::String(cell.to_string())))
                .collect();
            Feature { attributes }
        })
        .collect();
    FeatureSet {
        fields,
        features,
        exceeded_transfer_limit: false,
    }
}
