//! Aquila rights registry client

use avqc_common::config::AquilaConfig;
use std::time::Duration;

use crate::types::{LookupError, RightsEntry, RightsRegistry};

pub struct AquilaClient {
    http_client: reqwest::Client,
    baseurl: String,
}

impl AquilaClient {
    pub fn new(config: &AquilaConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            baseurl: config.baseurl.trim_end_matches('/').to_string(),
        })
    }

    fn rights_url(&self) -> String {
        format!("{}/api/rights/", self.baseurl)
    }
}

#[async_trait::async_trait]
impl RightsRegistry for AquilaClient {
    async fn list_available(&self) -> Result<Vec<RightsEntry>, LookupError> {
        let url = self.rights_url();
        tracing::debug!(url = %url, "Fetching rights statements");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Vec<RightsEntry>>()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }
}
