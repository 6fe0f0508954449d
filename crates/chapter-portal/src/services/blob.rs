use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use crate::config::BlobConfig;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob storage is not configured")]
    NotConfigured,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Client for the external object store holding uploaded files.
///
/// Objects are written with `PUT {base_url}/{bucket}/{key}`; that URL is also
/// the reference persisted on the document row.
#[derive(Clone)]
pub struct BlobClient {
    http_client: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
    bucket: String,
}

impl BlobClient {
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            token: config.token.clone(),
            bucket: config.bucket.trim_matches('/').to_string(),
        }
    }

    /// Store `bytes` under `key` and return the object's URL.
    pub async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let base_url = self.base_url.as_deref().ok_or(BlobError::NotConfigured)?;
        let url = format!("{base_url}/{}/{key}", self.bucket);

        let mut request = self
            .http_client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobError::Rejected { status, body });
        }

        Ok(url)
    }
}

/// Object key for an upload: `<user>/<random>-<sanitized file name>`.
pub fn object_key(user_id: Uuid, file_name: &str) -> String {
    format!("{user_id}/{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
