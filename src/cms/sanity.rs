use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::{
    ContentSource,
    error::CmsError,
    query::{self, GroqQuery, PageWindow, PostFilter},
    types::{Category, Post, PostPage},
};
use crate::SanityConfig;

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Client for the hosted GROQ query endpoint.
pub struct SanityClient {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(project_id: &str, dataset: &str, config: &SanityConfig) -> Result<Self, CmsError> {
        if project_id.trim().is_empty() {
            return Err(CmsError::ConfigError("cms.project_id is empty".to_string()));
        }

        let host = if config.use_cdn && config.token.is_none() {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };
        let endpoint = Url::parse(&format!(
            "https://{}.{}/v{}/data/query/{}",
            project_id,
            host,
            config.api_version.trim_start_matches('v'),
            dataset
        ))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token: config.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Query URL with the GROQ text and each parameter JSON-encoded as `$name`.
    pub fn query_url(&self, groq: &GroqQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &groq.query);
            for (name, value) in &groq.params {
                pairs.append_pair(&format!("${}", name), &value.to_string());
            }
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(&self, groq: &GroqQuery) -> Result<T, CmsError> {
        let url = self.query_url(groq);
        debug!("GROQ query: {}", groq.query);

        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Content query failed with {}: {}", status, body);
            return Err(CmsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: QueryResponse<T> = response.json().await?;
        Ok(body.result)
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        window: Option<PageWindow>,
    ) -> Result<PostPage, CmsError> {
        self.fetch(&query::paginated_posts(filter, window)).await
    }

    async fn fetch_post(&self, slug: &str) -> Result<Option<Post>, CmsError> {
        self.fetch(&query::post_by_slug(slug)).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CmsError> {
        self.fetch(&query::categories()).await
    }

    async fn fetch_publish_dates(&self, filter: &PostFilter) -> Result<Vec<DateTime<Utc>>, CmsError> {
        let dates: Vec<Option<DateTime<Utc>>> = self.fetch(&query::publish_dates(filter)).await?;
        Ok(dates.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        "Sanity query API"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SanityConfig {
        SanityConfig {
            api_version: "2024-01-01".to_string(),
            use_cdn: true,
            token: None,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_endpoint_uses_cdn_without_token() {
        let client = SanityClient::new("abc123", "production", &config()).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://abc123.apicdn.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn test_endpoint_uses_live_api_with_token() {
        let mut config = config();
        config.token = Some("secret".to_string());
        config.api_version = "v2023-05-03".to_string();

        let client = SanityClient::new("abc123", "staging", &config).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://abc123.api.sanity.io/v2023-05-03/data/query/staging"
        );
    }

    #[test]
    fn test_empty_project_is_rejected() {
        assert!(matches!(
            SanityClient::new(" ", "production", &config()),
            Err(CmsError::ConfigError(_))
        ));
    }

    #[test]
    fn test_query_url_encodes_params_as_json() {
        let client = SanityClient::new("abc123", "production", &config()).unwrap();
        let url = client.query_url(&query::post_by_slug("hello world"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0].0, "query");
        assert!(pairs[0].1.contains("slug.current == $slug"));
        assert_eq!(pairs[1], ("$slug".to_string(), "\"hello world\"".to_string()));
    }
}
