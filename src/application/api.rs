//! Remote collection seam: the operations the application needs from the blog API.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{Category, Keywords, Post, PostId};
use crate::domain::uploads::ImageAttachment;

use super::query::ListQuery;
use super::store::PostPage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound { message: Option<String> },
    #[error("server responded with status {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// Human-readable text supplied by the server, if any.
    pub fn payload_message(&self) -> Option<String> {
        match self {
            ClientError::NotFound { message } | ClientError::Server { message, .. } => {
                message.clone()
            }
            ClientError::Transport(_)
            | ClientError::Decode(_)
            | ClientError::InvalidRequest(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Editable fields submitted by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub image_alt_text: String,
    pub category: Category,
    pub featured: bool,
    pub keywords: Keywords,
    pub image: Option<ImageAttachment>,
}

impl PostForm {
    pub fn keywords_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(&self.keywords)
            .map_err(|err| ClientError::InvalidRequest(format!("keywords: {err}")))
    }
}

#[async_trait]
pub trait BlogApi: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<PostPage, ClientError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Post, ClientError>;

    async fn create(&self, form: &PostForm) -> Result<Post, ClientError>;

    async fn update(&self, id: &PostId, form: &PostForm) -> Result<Post, ClientError>;

    async fn delete(&self, id: &PostId) -> Result<(), ClientError>;
}
