//! Wire types for the Medium API.
//!
//! Medium wraps every successful payload in `{"data": ...}` and every failure
//! in `{"errors": [...]}`; both envelopes are unwrapped by the client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediumUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A post as returned by Medium, either freshly created or found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_id: Option<String>,
}

/// What to publish, and optionally under which publication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub publication_id: Option<String>,
}

/// Filters for an article search. Empty filters are left out of the query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub publication_id: Option<String>,
    pub tags: Vec<String>,
}

/// Request body for creating a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePost<'a> {
    pub title: &'a str,
    pub content_format: &'static str,
    pub content: &'a str,
    pub tags: &'a [String],
    pub publish_status: &'static str,
}

impl<'a> From<&'a ArticleRequest> for CreatePost<'a> {
    fn from(article: &'a ArticleRequest) -> Self {
        Self {
            title: &article.title,
            content_format: "markdown",
            content: &article.content,
            tags: &article.tags,
            publish_status: "public",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub message: String,
}
