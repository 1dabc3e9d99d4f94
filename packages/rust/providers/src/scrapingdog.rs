//! ScrapingDog profile scraper.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use leadscope_shared::{CollabResult, CollaboratorError, ProfileScraper, Result};

use crate::http::{build_client, check_status, network_error, read_json, trim_base_url};

const SERVICE: &str = "scrapingdog";

#[derive(Clone)]
pub struct ScrapingDogClient {
    client: Client,
    api_key: String,
    premium: bool,
    base_url: String,
}

impl ScrapingDogClient {
    pub fn new(api_key: impl Into<String>, premium: bool, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            premium,
            base_url: "https://api.scrapingdog.com".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(url);
        self
    }
}

#[async_trait]
impl ProfileScraper for ScrapingDogClient {
    #[instrument(skip_all, fields(profile_id = %profile_id))]
    async fn fetch_profile(&self, profile_id: &str) -> CollabResult<Value> {
        if self.api_key.trim().is_empty() {
            return Err(CollaboratorError::missing_credentials(SERVICE));
        }

        let premium = if self.premium { "true" } else { "false" };
        let response = self
            .client
            .get(format!("{}/linkedin/", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("type", "profile"),
                ("linkId", profile_id),
                ("premium", premium),
            ])
            .send()
            .await
            .map_err(|e| network_error(SERVICE, e))?;

        let response = check_status(SERVICE, profile_id, response).await?;
        let payload: Value = read_json(SERVICE, response).await?;
        debug!("profile payload received");
        Ok(payload)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
