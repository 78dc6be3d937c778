//! Wire shapes exchanged with the blog collection REST API.
//!
//! Every successful response is wrapped in a `{ "data": ... }` envelope. Field
//! names follow the server's camelCase convention; identifiers are opaque
//! strings published under `_id`, sometimes mirrored as a virtual `id`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Query-string keys understood by the list endpoint.
pub mod query {
    pub const PAGE: &str = "page";
    pub const LIMIT: &str = "limit";
    pub const SEARCH_TERM: &str = "searchTerm";
    pub const CATEGORY: &str = "category";
    pub const SORT_BY: &str = "sortBy";
}

/// Multipart part names accepted by the create and update endpoints.
pub mod form {
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const META_DESCRIPTION: &str = "metaDescription";
    pub const IMAGE_ALT_TEXT: &str = "imageAltText";
    pub const CATEGORY: &str = "category";
    pub const FEATURED: &str = "featured";
    pub const KEYWORDS: &str = "keywords";
    pub const IMAGE: &str = "image";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlogListData {
    pub blogs: Vec<BlogDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlogData {
    pub blog: BlogDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub total_items: u64,
    pub total_pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogDto {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub image_alt_text: String,
    #[serde(default)]
    pub image: Option<ImageDto>,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub author: Option<AuthorDto>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub slug: String,
}

impl BlogDto {
    /// `_id` when present and non-blank, otherwise the `id` mirror.
    pub fn identifier(&self) -> Option<&str> {
        [self.object_id.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// Failure payload; servers populate either `message` or `error`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// First non-blank human-readable message carried by the payload.
    pub fn into_message(self) -> Option<String> {
        [self.message, self.error]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}
