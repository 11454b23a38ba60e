use serde::Deserialize;
use serde_json::Value;

// --- Token endpoint types ---

/// Response from `generateToken`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires: i64,
}

// --- Catalog search types ---

/// One page of catalog search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total: i64,
    pub start: i64,
    #[serde(rename = "nextStart")]
    pub next_start: i64,
    pub results: Vec<ContentItem>,
}

/// A named, queryable item handle from the content catalog.
/// `url` points at the item's feature service; individual layers hang off it
/// by index.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub url: Option<String>,
}

impl ContentItem {
    /// Endpoint for one of this item's layers. `None` if the item carries no
    /// service URL (e.g. a non-service item type).
    pub fn layer_url(&self, layer_index: usize) -> Option<String> {
        self.url
            .as_deref()
            .map(|u| format!("{}/{}", u.trim_end_matches('/'), layer_index))
    }
}

// --- Layer query types ---

/// A field descriptor from a layer query response.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub alias: Option<String>,
}

/// One record: a bag of attribute values keyed by field name.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub attributes: serde_json::Map<String, Value>,
}

/// A page (or accumulated set) of layer query results.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(rename = "exceededTransferLimit", default)]
    pub exceeded_transfer_limit: bool,
}

impl FeatureSet {
    /// Flatten into column names plus string rows, in declared field order.
    /// Attributes a record lacks render as empty strings; everything else
    /// renders via its JSON form with string quoting stripped, so the
    /// platform's literal sentinel strings (e.g. "None") pass through as-is.
    pub fn into_rows(self) -> (Vec<String>, Vec<Vec<String>>) {
        let columns: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        let rows = self
            .features
            .into_iter()
            .map(|feature| {
                columns
                    .iter()
                    .map(|col| {
                        feature
                            .attributes
                            .get(col)
                            .map(attribute_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        (columns, rows)
    }
}

fn attribute_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_url_appends_index() {
        let item = ContentItem {
            id: "abc".into(),
            title: "JSA North".into(),
            item_type: "Feature Layer".into(),
            url: Some("https://services.arcgis.com/x/FeatureServer/".into()),
        };
        assert_eq!(
            item.layer_url(0).unwrap(),
            "https://services.arcgis.com/x/FeatureServer/0"
        );
    }

    #[test]
    fn feature_set_flattens_in_field_order() {
        let fs: FeatureSet = serde_json::from_value(json!({
            "fields": [{"name": "OBJECTID"}, {"name": "tech_name"}, {"name": "count"}],
            "features": [
                {"attributes": {"OBJECTID": 1, "tech_name": "Cory_Hicks", "count": null}},
                {"attributes": {"OBJECTID": 2, "tech_name": "None"}}
            ]
        }))
        .unwrap();

        let (columns, rows) = fs.into_rows();
        assert_eq!(columns, vec!["OBJECTID", "tech_name", "count"]);
        assert_eq!(rows[0], vec!["1", "Cory_Hicks", ""]);
        // Missing attribute and null both come out empty; "None" survives.
        assert_eq!(rows[1], vec!["2", "None", ""]);
    }
}
