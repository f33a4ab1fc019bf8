//! Domain source client.
//!
//! `GET <endpoint>` must answer 200 with `[[subdomain, backend_url], ...]`.
//! Anything else is a [`FetchError`].

use std::time::Duration;

use reqwest::StatusCode;

use crate::routing::DomainMapping;

/// Why a fetch produced no mapping.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("received {status} when fetching {url}")]
    Status { url: String, status: StatusCode },

    #[error("malformed domain list from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetches the subdomain mapping over HTTP.
#[derive(Debug, Clone)]
pub struct DomainSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl DomainSource {
    /// `timeout` bounds each fetch end to end. With `system_proxy` off the
    /// proxy environment variables are ignored.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        system_proxy: bool,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if !system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the current mapping.
    pub async fn fetch(&self) -> Result<DomainMapping, FetchError> {
        let transport = |source| FetchError::Transport {
            url: self.url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        decode(&body).map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Decode the array-of-pairs schema. Inner arrays must hold exactly two strings.
pub fn decode(body: &[u8]) -> Result<DomainMapping, serde_json::Error> {
    let entries: Vec<(String, String)> = serde_json::from_slice(body)?;
    Ok(DomainMapping::new(entries))
}
