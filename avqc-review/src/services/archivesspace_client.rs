//! ArchivesSpace API client
//!
//! Implements [`MetadataLookup`] by composition: the client owns an HTTP
//! client and a cached session token, and resolves a refid through the
//! `find_by_id` endpoint.

use avqc_common::config::ArchivesSpaceConfig;
use avqc_common::models::PackageMetadata;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::types::{LookupError, MetadataLookup};

const USER_AGENT: &str = concat!("avqc-review/", env!("CARGO_PKG_VERSION"));
const SESSION_HEADER: &str = "X-ArchivesSpace-Session";

/// ArchivesSpace API client
pub struct ArchivesSpaceClient {
    http_client: reqwest::Client,
    baseurl: String,
    username: String,
    password: String,
    repository: String,
    session: Mutex<Option<String>>,
}

impl ArchivesSpaceClient {
    pub fn new(config: &ArchivesSpaceConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            baseurl: config.baseurl.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            repository: config.repository.clone(),
            session: Mutex::new(None),
        })
    }

    /// Current session token, logging in if there is none
    async fn session_token(&self) -> Result<String, LookupError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }

        let url = format!("{}/users/{}/login", self.baseurl, self.username);
        tracing::debug!(url = %url, "Logging in to ArchivesSpace");

        let response = self
            .http_client
            .post(&url)
            .query(&[("password", self.password.as_str())])
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;
        let token = body
            .get("session")
            .and_then(Value::as_str)
            .ok_or_else(|| LookupError::Auth("login response has no session".to_string()))?
            .to_string();

        *session = Some(token.clone());
        Ok(token)
    }

    async fn find_by_refid(
        &self,
        refid: &str,
        token: &str,
    ) -> Result<reqwest::Response, LookupError> {
        let url = format!(
            "{}/repositories/{}/find_by_id/archival_objects",
            self.baseurl, self.repository
        );
        tracing::debug!(refid = %refid, url = %url, "Querying ArchivesSpace");

        self.http_client
            .get(&url)
            .header(SESSION_HEADER, token)
            .query(&[
                ("ref_id[]", refid),
                ("resolve[]", "archival_objects"),
                ("resolve[]", "archival_objects::resource"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MetadataLookup for ArchivesSpaceClient {
    async fn lookup(&self, refid: &str) -> Result<PackageMetadata, LookupError> {
        let token = self.session_token().await?;
        let mut response = self.find_by_refid(refid, &token).await?;

        // Expired session: log in again once
        if matches!(response.status().as_u16(), 401 | 403 | 412) {
            tracing::debug!("ArchivesSpace session rejected, logging in again");
            *self.session.lock().await = None;
            let token = self.session_token().await?;
            response = self.find_by_refid(refid, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        let metadata = parse_find_by_id(refid, &body)?;
        tracing::info!(
            refid = %refid,
            title = %metadata.title,
            "Retrieved archival object from ArchivesSpace"
        );
        Ok(metadata)
    }
}

/// Extract package metadata from a `find_by_id` response.
///
/// Exactly one resolved archival object is required.
pub fn parse_find_by_id(refid: &str, body: &Value) -> Result<PackageMetadata, LookupError> {
    let missing = |what: &str| {
        LookupError::Parse(format!(
            "Unable to fetch results for {}: missing {}. Got results {}",
            refid, what, body
        ))
    };

    let objects = body
        .get("archival_objects")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("archival_objects"))?;
    if objects.len() != 1 {
        return Err(LookupError::UnexpectedResultCount {
            refid: refid.to_string(),
            count: objects.len(),
        });
    }

    let object = objects[0].get("_resolved").ok_or_else(|| missing("_resolved"))?;
    let resource = object
        .get("resource")
        .and_then(|r| r.get("_resolved"))
        .ok_or_else(|| missing("resource"))?;

    let text = |value: &Value, key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing(key))
    };

    let dates = object
        .get("dates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(PackageMetadata {
        title: text(object, "display_string")?,
        object_uri: text(object, "uri")?,
        resource_title: text(resource, "title")?,
        resource_uri: text(resource, "uri")?,
        has_structured_dates: has_structured_dates(dates),
    })
}

/// True if any date carries a `begin` or `end` value.
///
/// Expression-only dates ("circa 1950") are not structured.
pub fn has_structured_dates(dates: &[Value]) -> bool {
    dates.iter().any(|date| {
        ["begin", "end"].iter().any(|key| {
            date.get(*key)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.trim().is_empty())
        })
    })
}
