pub mod error;
pub mod types;

pub use error::{AgolError, Result};
pub use types::{ContentItem, Feature, FeatureSet, FieldInfo, SearchResponse, TokenResponse};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Results per catalog search page.
const SEARCH_PAGE_SIZE: i64 = 100;

/// Token lifetime requested at connect, in minutes.
const TOKEN_EXPIRATION_MINUTES: &str = "120";

pub struct AgolClient {
    client: reqwest::Client,
    portal: String,
    token: String,
}

impl AgolClient {
    /// Authenticate against the portal and return a ready client.
    /// A rejected credential is `AgolError::Auth`; this is the run's first
    /// network call, so callers treat any failure here as fatal.
    pub async fn connect(portal: &str, username: &str, password: &str) -> Result<Self> {
        let portal = portal.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let url = format!("{}/sharing/rest/generateToken", portal);
        let resp = client
            .post(&url)
            .form(&[
                ("f", "json"),
                ("username", username),
                ("password", password),
                ("referer", portal.as_str()),
                ("expiration", TOKEN_EXPIRATION_MINUTES),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgolError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = resp.json().await?;
        if let Some(err) = body.get("error") {
            return Err(AgolError::Auth(portal_error_message(err)));
        }
        let token_resp: TokenResponse = serde_json::from_value(body)?;

        // `expires` is epoch milliseconds.
        let expires = chrono::DateTime::from_timestamp_millis(token_resp.expires);
        tracing::info!(
            portal = %portal,
            username,
            token_expires = %expires.map(|t| t.to_rfc3339()).unwrap_or_default(),
            "Connected to portal"
        );

        Ok(Self {
            client,
            portal,
            token: token_resp.token,
        })
    }

    /// Search the content catalog by exact title and item type, following
    /// `nextStart` pagination up to `max_items`. Items come back in catalog
    /// order, which is not guaranteed stable across runs.
    pub async fn search_items(
        &self,
        title: &str,
        item_type: &str,
        max_items: usize,
    ) -> Result<Vec<ContentItem>> {
        let query = format!("title:\"{}\" AND type:\"{}\"", title, item_type);
        let mut items: Vec<ContentItem> = Vec::new();
        let mut start: i64 = 1;

        loop {
            let url = format!("{}/sharing/rest/search", self.portal);
            let params = [
                ("q", query.clone()),
                ("num", SEARCH_PAGE_SIZE.to_string()),
                ("start", start.to_string()),
            ];
            let page: SearchResponse = self.get_json(&url, &params).await?;

            tracing::debug!(
                start = page.start,
                returned = page.results.len(),
                total = page.total,
                "Search page fetched"
            );

            items.extend(page.results);
            if items.len() >= max_items || page.next_start <= 0 {
                break;
            }
            start = page.next_start;
        }

        items.truncate(max_items);
        tracing::info!(title, item_type, count = items.len(), "Catalog search complete");
        Ok(items)
    }

    /// Query every record of one layer of an item, following
    /// `exceededTransferLimit` pagination. Fields come from the first page.
    pub async fn query_layer(&self, item: &ContentItem, layer_index: usize) -> Result<FeatureSet> {
        let layer_url = item
            .layer_url(layer_index)
            .ok_or_else(|| AgolError::NotQueryable(format!("item '{}' has no service URL", item.title)))?;

        let mut accumulated: Option<FeatureSet> = None;
        let mut offset: usize = 0;

        loop {
            let url = format!("{}/query", layer_url);
            let params = [
                ("where", "1=1".to_string()),
                ("outFields", "*".to_string()),
                ("resultOffset", offset.to_string()),
            ];
            let page: FeatureSet = self.get_json(&url, &params).await?;

            offset += page.features.len();
            let more = page.exceeded_transfer_limit && !page.features.is_empty();

            match accumulated.as_mut() {
                None => accumulated = Some(page),
                Some(acc) => acc.features.extend(page.features),
            }

            if !more {
                break;
            }
            tracing::debug!(item = %item.title, offset, "Transfer limit hit, fetching next page");
        }

        let feature_set = accumulated.unwrap_or(FeatureSet {
            fields: Vec::new(),
            features: Vec::new(),
            exceeded_transfer_limit: false,
        });
        tracing::info!(
            item = %item.title,
            records = feature_set.features.len(),
            "Layer query complete"
        );
        Ok(feature_set)
    }

    /// GET a portal endpoint and parse the JSON body, unwrapping the
    /// portal's error envelope (errors arrive with HTTP 200 and an `error`
    /// object in the body).
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .query(&[("f", "json"), ("token", self.token.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgolError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = resp.json().await?;
        if let Some(err) = body.get("error") {
            return Err(AgolError::Api {
                status: status.as_u16(),
                message: portal_error_message(err),
            });
        }
        Ok(serde_json::from_value(body)?)
    }
}

fn portal_error_message(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}
