//! The Medium tools and their argument types.

use crate::error::Result;
use crate::medium::{ArticleRequest, MediumClient, SearchQuery};
use crate::server::{ConnectionHandle, Server};
use crate::types::{CallToolResult, Tool};
use crate::{ToolArguments, SERVICE_NAME};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, ToolArguments)]
#[serde(rename_all = "camelCase")]
pub struct PublishArticleArgs {
    #[tool_arg(desc = "Title of the article", min_len = 1)]
    pub title: String,
    #[tool_arg(desc = "Article body in markdown", min_len = 10)]
    pub content: String,
    #[tool_arg(desc = "Tags for the article")]
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[tool_arg(desc = "Publish under this publication instead of the user's profile", rename = "publicationId")]
    #[serde(default)]
    pub publication_id: Option<String>,
}

#[derive(Debug, Deserialize, ToolArguments)]
pub struct GetPublicationsArgs {}

#[derive(Debug, Deserialize, ToolArguments)]
#[serde(rename_all = "camelCase")]
pub struct SearchArticlesArgs {
    #[tool_arg(desc = "Keywords to search for")]
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[tool_arg(desc = "Only return articles from this publication", rename = "publicationId")]
    #[serde(default)]
    pub publication_id: Option<String>,
    #[tool_arg(desc = "Only return articles with these tags")]
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Builds the MCP server with all Medium tools bound to `client`.
pub fn build_server(client: MediumClient) -> Server {
    let publish_client = client.clone();
    let publications_client = client.clone();
    let search_client = client;

    Server::new(SERVICE_NAME)
        .register_tool_typed(
            Tool::from_args::<PublishArticleArgs>(
                "publish-article",
                Some("Publish a new article on Medium"),
            ),
            move |_handle: ConnectionHandle, args: PublishArticleArgs| {
                let client = publish_client.clone();
                async move { publish_article(&client, args).await }
            },
        )
        .register_tool_typed(
            Tool::from_args::<GetPublicationsArgs>(
                "get-publications",
                Some("Retrieve user's publications"),
            ),
            move |_handle: ConnectionHandle, _args: GetPublicationsArgs| {
                let client = publications_client.clone();
                async move { get_publications(&client).await }
            },
        )
        .register_tool_typed(
            Tool::from_args::<SearchArticlesArgs>(
                "search-articles",
                Some("Search and filter Medium articles"),
            ),
            move |_handle: ConnectionHandle, args: SearchArticlesArgs| {
                let client = search_client.clone();
                async move { search_articles(&client, args).await }
            },
        )
}

async fn publish_article(client: &MediumClient, args: PublishArticleArgs) -> Result<CallToolResult> {
    let article = ArticleRequest {
        title: args.title,
        content: args.content,
        tags: args.tags.unwrap_or_default(),
        publication_id: args.publication_id,
    };
    match client.publish_article(&article).await {
        Ok(post) => {
            info!(post_id = %post.id, "Published article");
            CallToolResult::json(&post)
        }
        Err(e) => {
            warn!(error = %e, "Publishing failed");
            Ok(CallToolResult::error(format!("Error publishing article: {}", e)))
        }
    }
}

async fn get_publications(client: &MediumClient) -> Result<CallToolResult> {
    match client.get_user_publications().await {
        Ok(publications) => CallToolResult::json(&publications),
        Err(e) => {
            warn!(error = %e, "Listing publications failed");
            Ok(CallToolResult::error(format!("Error retrieving publications: {}", e)))
        }
    }
}

async fn search_articles(client: &MediumClient, args: SearchArticlesArgs) -> Result<CallToolResult> {
    let query = SearchQuery {
        keywords: args.keywords.unwrap_or_default(),
        publication_id: args.publication_id,
        tags: args.tags.unwrap_or_default(),
    };
    match client.search_articles(&query).await {
        Ok(articles) => CallToolResult::json(&articles),
        Err(e) => {
            warn!(error = %e, "Search failed");
            Ok(CallToolResult::error(format!("Error searching articles: {}", e)))
        }
    }
}
