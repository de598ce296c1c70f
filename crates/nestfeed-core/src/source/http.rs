use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::ListingSource;
use crate::config::ApiConfig;
use crate::feed::{SearchFilters, SearchPage};
use crate::{Error, Result};

const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;
const INITIAL_RETRY_DELAY_MS: u64 = 250;

/// REST client for the listings API
pub struct HttpListingSource {
    client: Client,
    base_url: Url,
    max_retries: u32,
}

impl HttpListingSource {
    /// Create a new source from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Self::build_client(config.request_timeout_secs, &config.proxy_url)?;

        // A trailing slash makes Url::join append instead of replacing the last segment
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            max_retries: config.max_retries,
        })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .default_headers(Self::default_headers());

        if let Some(ref proxy) = proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for listing requests");
        }

        builder.build().map_err(Error::Http)
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("nestfeed/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }

    /// Search endpoint URL for a page of results
    pub fn search_url(&self, filters: &SearchFilters, page: u32, limit: u32) -> Result<Url> {
        let mut url = self.base_url.join("listings")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            query.append_pair("limit", &limit.to_string());
            for (key, value) in filters.query_pairs() {
                query.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    /// Image endpoint URL for a listing
    pub fn images_url(&self, listing_id: &str) -> Result<Url> {
        let mut url = self.base_url.join("listings")?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL cannot hold a path: {}", self.base_url)))?
            .push(listing_id)
            .push("images");
        Ok(url)
    }

    /// GET a JSON document, retrying with exponential backoff on 429 and 503
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;
        let mut attempt = 0;

        loop {
            tracing::debug!(url = %url, attempt = attempt + 1, "GET");
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if (status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE)
                && attempt < self.max_retries
            {
                tracing::warn!(
                    "Received {} for {}, retrying after {}ms...",
                    status,
                    url,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                return Err(Error::Api {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.bytes().await?;
            ensure_content_size(body.len(), url.as_str())?;
            return Ok(serde_json::from_slice(&body)?);
        }
    }
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_RESPONSE_BYTES {
        return Err(Error::Other(format!(
            "Response too large ({} bytes) for URL: {}",
            size, url
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ListingSource for HttpListingSource {
    async fn search(&self, filters: &SearchFilters, page: u32, limit: u32) -> Result<SearchPage> {
        let url = self.search_url(filters, page, limit)?;
        tracing::info!("Searching listings: page {} ({} per page)", page, limit);
        self.get_json(url).await
    }

    async fn images_for(&self, listing_id: &str) -> Result<Vec<String>> {
        let url = self.images_url(listing_id)?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ListingType;

    fn source(base_url: &str) -> HttpListingSource {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        HttpListingSource::new(&config).unwrap()
    }

    #[test]
    fn test_search_url_keeps_base_path() {
        let source = source("https://example.com/api/v1/");
        let filters = SearchFilters {
            keyword: Some("loft".to_string()),
            listing_type: Some(ListingType::Rent),
            ..Default::default()
        };
        let url = source.search_url(&filters, 3, 12).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/v1/listings?page=3&limit=12&q=loft&listingType=rent"
        );
    }

    #[test]
    fn test_images_url_escapes_id() {
        let source = source("https://example.com/api");
        let url = source.images_url("a b/1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/listings/a%20b%2F1/images");
    }

    #[test]
    fn test_content_size_limit() {
        assert!(ensure_content_size(MAX_RESPONSE_BYTES, "u").is_ok());
        assert!(ensure_content_size(MAX_RESPONSE_BYTES + 1, "u").is_err());
    }
}
