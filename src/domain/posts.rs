//! Blog post entity and the value types it is built from.

use std::fmt;
use std::str::FromStr;

use blogdesk_api_types::{AuthorDto, BlogDto, ImageDto};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use super::error::DomainError;

/// Upper bound for `meta_description`, counted in characters.
pub const META_DESCRIPTION_MAX_CHARS: usize = 200;

/// Server-assigned identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Guides,
    News,
    Tips,
    Announcements,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Guides,
        Category::News,
        Category::Tips,
        Category::Announcements,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Guides => "guides",
            Category::News => "news",
            Category::Tips => "tips",
            Category::Announcements => "announcements",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| DomainError::unknown_category(value))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword cannot be empty")]
    Empty,
    #[error("keyword `{0}` has already been added")]
    Duplicate(String),
}

/// Ordered set of distinct, non-empty keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Keywords(Vec<String>);

impl Keywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim and append `raw`, rejecting blanks and exact duplicates.
    pub fn insert(&mut self, raw: &str) -> Result<(), KeywordError> {
        let keyword = raw.trim();
        if keyword.is_empty() {
            return Err(KeywordError::Empty);
        }
        if self.contains(keyword) {
            return Err(KeywordError::Duplicate(keyword.to_string()));
        }
        self.0.push(keyword.to_string());
        Ok(())
    }

    pub fn remove(&mut self, keyword: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != keyword);
        self.0.len() != before
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.iter().any(|existing| existing == keyword)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep the first occurrence of each usable entry; server data is not trusted to be clean.
    pub fn collect_lenient<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut keywords = Self::new();
        for value in values {
            let _ = keywords.insert(value.as_ref());
        }
        keywords
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostImage {
    pub url: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub image_alt_text: String,
    pub image: Option<PostImage>,
    pub category: Category,
    pub keywords: Keywords,
    pub featured: bool,
    pub author: Option<Author>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub slug: String,
}

impl TryFrom<BlogDto> for Post {
    type Error = DomainError;

    fn try_from(dto: BlogDto) -> Result<Self, Self::Error> {
        let id = dto
            .identifier()
            .map(PostId::new)
            .ok_or_else(|| DomainError::validation("post is missing its identifier"))?;
        let BlogDto {
            title,
            content,
            meta_description,
            image_alt_text,
            image,
            category,
            keywords,
            featured,
            author,
            published_at,
            slug,
            ..
        } = dto;

        Ok(Self {
            id,
            title,
            content,
            meta_description,
            image_alt_text,
            image: image.map(|ImageDto { url, alt_text }| PostImage { url, alt_text }),
            category: category.parse()?,
            keywords: Keywords::collect_lenient(keywords),
            featured,
            author: author.map(
                |AuthorDto {
                     first_name,
                     last_name,
                 }| Author {
                    first_name,
                    last_name,
                },
            ),
            published_at,
            slug,
        })
    }
}

/// Character count as shown by the editor counter.
pub fn meta_description_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(category: &str) -> BlogDto {
        BlogDto {
            object_id: Some("abc".into()),
            id: None,
            title: "Title".into(),
            content: "<p>body</p>".into(),
            meta_description: "meta".into(),
            image_alt_text: "alt".into(),
            image: None,
            category: category.into(),
            keywords: vec!["rust".into(), "rust".into(), " ".into(), "async".into()],
            featured: false,
            author: Some(AuthorDto {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
            }),
            published_at: None,
            slug: "title".into(),
        }
    }

    #[test]
    fn keywords_preserve_order_and_reject_duplicates() {
        let mut keywords = Keywords::new();
        keywords.insert("  rust ").expect("first insert");
        keywords.insert("wasm").expect("second insert");

        assert_eq!(
            keywords.insert("rust"),
            Err(KeywordError::Duplicate("rust".into()))
        );
        assert_eq!(keywords.insert("   "), Err(KeywordError::Empty));
        assert_eq!(keywords.as_slice(), ["rust", "wasm"]);

        assert!(keywords.remove("rust"));
        assert!(!keywords.remove("rust"));
        assert_eq!(keywords.as_slice(), ["wasm"]);
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("News".parse::<Category>().expect("news"), Category::News);
        assert!(matches!(
            "recipes".parse::<Category>(),
            Err(DomainError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn post_from_dto_cleans_keywords() {
        let post = Post::try_from(dto("guides")).expect("valid post");
        assert_eq!(post.category, Category::Guides);
        assert_eq!(post.keywords.as_slice(), ["rust", "async"]);
        assert_eq!(
            post.author.map(|author| author.full_name()).as_deref(),
            Some("Grace Hopper")
        );
    }

    #[test]
    fn post_from_dto_takes_underscore_id_over_mirror() {
        let both = BlogDto {
            id: Some("mirror".into()),
            ..dto("news")
        };
        assert_eq!(Post::try_from(both).expect("valid post").id.as_str(), "abc");

        let mirror_only = BlogDto {
            object_id: None,
            id: Some("mirror".into()),
            ..dto("news")
        };
        assert_eq!(
            Post::try_from(mirror_only).expect("valid post").id.as_str(),
            "mirror"
        );

        let blank = BlogDto {
            object_id: Some("  ".into()),
            ..dto("news")
        };
        assert!(matches!(
            Post::try_from(blank),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn post_from_dto_rejects_unknown_category() {
        assert!(Post::try_from(dto("gossip")).is_err());
    }

    #[test]
    fn meta_description_counts_characters_not_bytes() {
        assert_eq!(meta_description_len("héllo"), 5);
    }
}
