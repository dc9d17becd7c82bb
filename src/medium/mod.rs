//! Client for the Medium REST API.

mod client;
pub mod models;

pub use client::{MediumClient, DEFAULT_API_BASE};
pub use models::{ArticleRequest, MediumUser, Post, Publication, SearchQuery};
