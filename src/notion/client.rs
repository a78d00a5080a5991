//! Notion REST client.

use super::{Block, DocumentService, PageProperties};
use crate::error::DocumentServiceError;
use crate::sections::SectionKind;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// Pinned `Notion-Version` header.
pub const NOTION_VERSION: &str = "2022-06-28";

/// [`DocumentService`] over the public Notion API.
pub struct NotionClient {
    client: Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: NOTION_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, DocumentServiceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Notion request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DocumentServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, retry_after));
        }
        response
            .json()
            .await
            .map_err(|e| DocumentServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DocumentService for NotionClient {
    async fn create_page(
        &self,
        database_id: &str,
        properties: &PageProperties,
        children: &[Block],
    ) -> Result<String, DocumentServiceError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
            "children": children,
        });
        let page: PageObject =
            serde_json::from_value(self.request(Method::POST, "/pages", Some(&body)).await?)
                .map_err(|e| DocumentServiceError::Decode(e.to_string()))?;
        Ok(page.id)
    }

    async fn append_blocks(&self, page_id: &str, children: &[Block]) -> Result<(), DocumentServiceError> {
        let body = json!({ "children": children });
        let path = format!("/blocks/{page_id}/children");
        self.request(Method::PATCH, &path, Some(&body)).await?;
        Ok(())
    }

    async fn database_properties(
        &self,
        database_id: &str,
    ) -> Result<BTreeMap<String, String>, DocumentServiceError> {
        let path = format!("/databases/{database_id}");
        let value = self.request::<Value>(Method::GET, &path, None).await?;
        let db: DatabaseObject =
            serde_json::from_value(value).map_err(|e| DocumentServiceError::Decode(e.to_string()))?;
        Ok(db
            .properties
            .into_iter()
            .map(|(name, p)| (name, p.kind))
            .collect())
    }

    async fn add_database_property(
        &self,
        database_id: &str,
        name: &str,
        kind: SectionKind,
    ) -> Result<(), DocumentServiceError> {
        let path = format!("/databases/{database_id}");
        self.request(Method::PATCH, &path, Some(&schema_patch(name, kind)))
            .await?;
        Ok(())
    }
}

/// `PATCH /databases/{id}` body adding one empty-configured column.
fn schema_patch(name: &str, kind: SectionKind) -> Value {
    let mut property = serde_json::Map::new();
    property.insert(kind.notion_type().to_string(), json!({}));
    json!({ "properties": { name: property } })
}

/// Map a non-2xx status to the matching [`DocumentServiceError`].
fn status_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> DocumentServiceError {
    let api: Option<ApiError> = serde_json::from_str(body).ok();
    match status {
        StatusCode::TOO_MANY_REQUESTS => DocumentServiceError::RateLimited {
            retry_after_secs: retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DocumentServiceError::Auth {
            detail: api.map(|e| e.message).unwrap_or_else(|| body.to_string()),
        },
        _ => {
            let (code, message) = match api {
                Some(e) => (e.code, e.message),
                None => ("unknown".to_string(), body.to_string()),
            };
            DocumentServiceError::Http {
                status: status.as_u16(),
                code,
                message,
            }
        }
    }
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct PageObject {
    id: String,
}

#[derive(Deserialize)]
struct DatabaseObject {
    #[serde(default)]
    properties: BTreeMap<String, PropertyObject>,
}

#[derive(Deserialize)]
struct PropertyObject {
    #[serde(rename = "type")]
    kind: String,
}
