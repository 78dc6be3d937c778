//! Image attachment checks applied before a file joins a post draft.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;

/// Default ceiling for attached images: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

const FALLBACK_FILE_NAME: &str = "image.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// A file picked by the user, not yet validated.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; the MIME type is guessed from its extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .map(str::to_string);
        Ok(Self::new(file_name, content_type, data))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared type without parameters, falling back to a guess from the file name.
    pub fn resolved_mime(&self) -> Option<String> {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());

        declared.or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first_raw()
                .map(str::to_string)
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Only JPEG, PNG and WebP images are allowed")]
    UnsupportedType { found: Option<String> },
    #[error("Image is too large (limit is {limit_mib} MiB)")]
    TooLarge { size: u64, limit_mib: u64 },
}

/// A file that passed type and size checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Bytes,
}

impl ImageAttachment {
    /// Inline `data:` URL suitable for an `<img src>` preview.
    pub fn preview_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.kind.mime(),
            STANDARD.encode(&self.bytes)
        )
    }
}

pub fn validate_image(file: ImageFile, max_bytes: u64) -> Result<ImageAttachment, AttachmentError> {
    let mime = file.resolved_mime();
    let kind = mime
        .as_deref()
        .and_then(ImageKind::from_mime)
        .ok_or(AttachmentError::UnsupportedType { found: mime })?;

    let size = file.size();
    if size > max_bytes {
        return Err(AttachmentError::TooLarge {
            size,
            limit_mib: max_bytes.div_ceil(1_048_576),
        });
    }

    Ok(ImageAttachment {
        file_name: file.file_name,
        kind,
        bytes: file.bytes,
    })
}
