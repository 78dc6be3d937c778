//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::uploads::DEFAULT_MAX_IMAGE_BYTES;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blogdesk";
const ENV_PREFIX: &str = "BLOGDESK";
const DEFAULT_COLLECTION_PATH: &str = "api/blogs";
const DEFAULT_PAGE_LIMIT: u64 = 9;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

/// Command-line arguments for the blogdesk binary.
#[derive(Debug, Parser)]
#[command(name = "blogdesk", version, about = "Blog administration client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGDESK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch one page of posts.
    List(ListArgs),
    /// Fetch a single post by slug.
    Show(ShowArgs),
    /// Create a post from an HTML body file.
    Create(CreateArgs),
    /// Delete a post by id.
    Delete(DeleteArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct ListArgs {
    /// Free-text search term.
    #[arg(long)]
    pub search: Option<String>,

    /// Category filter (`all` or a category name).
    #[arg(long)]
    pub category: Option<String>,

    /// Sort order (newest|oldest|title).
    #[arg(long)]
    pub sort: Option<String>,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    /// Listing summary, at most 200 characters.
    #[arg(long = "meta-description", value_name = "TEXT")]
    pub meta_description: String,

    #[arg(long = "image-alt-text", value_name = "TEXT")]
    pub image_alt_text: String,

    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub featured: bool,

    /// Keyword to attach; repeat the flag for more.
    #[arg(long = "keyword", value_name = "KEYWORD")]
    pub keywords: Vec<String>,

    /// File holding the post body as HTML.
    #[arg(long = "content-file", value_name = "PATH")]
    pub content_file: PathBuf,

    /// Optional cover image (JPEG, PNG or WebP).
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    pub id: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the API base URL.
    #[arg(long = "api-base-url", global = true, value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Override the bearer token sent with create, update and delete requests.
    #[arg(long = "api-token", global = true, env = "BLOGDESK_TOKEN", value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Override the number of posts per page.
    #[arg(long = "page-limit", global = true, value_name = "COUNT")]
    pub page_limit: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        global = true,
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub list: ListSettings,
    pub uploads: UploadSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub collection_path: String,
    pub token: Option<String>,
    pub page_limit: NonZeroU32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ListSettings {
    pub search_debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_image_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    list: RawListSettings,
    uploads: RawUploadSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    collection_path: Option<String>,
    token: Option<String>,
    page_limit: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListSettings {
    search_debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    max_image_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(token) = overrides.api_token.as_ref() {
            self.api.token = Some(token.clone());
        }
        if let Some(limit) = overrides.page_limit {
            self.api.page_limit = Some(limit);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            list,
            uploads,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            list: build_list_settings(list)?,
            uploads: build_upload_settings(uploads)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("api.base_url", "a base URL is required"))?;
    let base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "api.base_url",
            "URL cannot be used as a base",
        ));
    }

    let collection_path = api
        .collection_path
        .unwrap_or_else(|| DEFAULT_COLLECTION_PATH.to_string())
        .trim_matches('/')
        .to_string();
    if collection_path.is_empty() {
        return Err(LoadError::invalid(
            "api.collection_path",
            "path must not be empty",
        ));
    }

    let token = api.token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let page_limit = non_zero_u32(
        api.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        "api.page_limit",
    )?;

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        collection_path,
        token,
        page_limit,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_list_settings(list: RawListSettings) -> Result<ListSettings, LoadError> {
    let debounce_ms = list
        .search_debounce_ms
        .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS);
    if debounce_ms == 0 {
        return Err(LoadError::invalid(
            "list.search_debounce_ms",
            "must be greater than zero",
        ));
    }
    Ok(ListSettings {
        search_debounce: Duration::from_millis(debounce_ms),
    })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let value = uploads.max_image_bytes.unwrap_or(DEFAULT_MAX_IMAGE_BYTES);
    let max_image_bytes = NonZeroU64::new(value)
        .ok_or_else(|| LoadError::invalid("uploads.max_image_bytes", "must be greater than zero"))?;
    Ok(UploadSettings { max_image_bytes })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
