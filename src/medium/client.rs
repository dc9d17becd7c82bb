use super::models::{
    ArticleRequest, CreatePost, DataEnvelope, ErrorEnvelope, MediumUser, Post, Publication,
    SearchQuery,
};
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://api.medium.com/v1";

/// HTTP client for the Medium REST API.
///
/// Cloning is cheap and clones share the authenticated user.
#[derive(Clone)]
pub struct MediumClient {
    base_url: Url,
    client: Client,
    access_token: String,
    user: Arc<OnceCell<MediumUser>>,
}

impl fmt::Debug for MediumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediumClient")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user.get().map(|u| &u.username))
            .finish()
    }
}

impl MediumClient {
    /// Creates a client for `base_url` using an integration token.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        if access_token.trim().is_empty() {
            return Err(Error::Config("Medium access token is empty".to_string()));
        }
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid Medium API base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Medium API base URL '{}' cannot take a path", base_url)));
        }
        let client = Client::builder()
            .user_agent(concat!("medium-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url,
            client,
            access_token: access_token.to_string(),
            user: Arc::new(OnceCell::new()),
        })
    }

    /// Verifies the token and caches the user it belongs to.
    pub async fn authenticate(&self) -> Result<MediumUser> {
        let user: MediumUser = self.get(&["me"], &[]).await?;
        info!(username = %user.username, "Authenticated with Medium");
        // A concurrent authenticate may have won; both saw the same user.
        let _ = self.user.set(user.clone());
        Ok(user)
    }

    /// The authenticated user, if `authenticate` has succeeded.
    pub fn user(&self) -> Result<&MediumUser> {
        self.user.get().ok_or(Error::NotAuthenticated)
    }

    /// Lists the publications the authenticated user contributes to.
    pub async fn get_user_publications(&self) -> Result<Vec<Publication>> {
        let user_id = self.user()?.id.as_str();
        self.get(&["users", user_id, "publications"], &[]).await
    }

    /// Publishes a markdown article, under a publication if one is given.
    pub async fn publish_article(&self, article: &ArticleRequest) -> Result<Post> {
        let body = CreatePost::from(article);
        match &article.publication_id {
            Some(publication_id) => self.post(&["publications", publication_id.as_str(), "posts"], &body).await,
            None => {
                let user_id = self.user()?.id.as_str();
                self.post(&["users", user_id, "posts"], &body).await
            }
        }
    }

    /// Searches articles. Keywords and tags are sent comma-separated.
    pub async fn search_articles(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        let mut params = Vec::new();
        if !query.keywords.is_empty() {
            params.push(("keywords", query.keywords.join(",")));
        }
        if !query.tags.is_empty() {
            params.push(("tags", query.tags.join(",")));
        }
        if let Some(publication_id) = &query.publication_id {
            params.push(("publicationId", publication_id.clone()));
        }
        self.get(&["articles", "search"], &params).await
    }

    /// Appends `segments` to the base URL. Each segment is percent-encoded,
    /// so ids cannot add path components of their own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config("Medium API base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        self.send(self.client.get(url).query(query)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, segments: &[&str], body: &B) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        self.send(self.client.post(url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: DataEnvelope<T> = response.json().await?;
            return Ok(envelope.data);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.errors.into_iter().next())
            .map(|error| error.message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("Request failed").to_string()
                } else {
                    body
                }
            });
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}
