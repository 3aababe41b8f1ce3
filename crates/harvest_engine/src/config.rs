use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::FieldSchema;
use crate::xpath::LocatorError;

pub const DEFAULT_URL_LIST: &str = "urllist.txt";
pub const DEFAULT_LEDGER_FILE: &str = "downloaded.log";
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/static/images";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const BLOG_DIR: &str = "content/blog";
const IMAGE_DIR: &str = "static/images";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config is missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("`fields` must be an object mapping field names to definitions")]
    FieldsNotObject,
    #[error("schema is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {message}")]
    InvalidField { field: String, message: String },
    #[error("field `{field}` has an invalid locator: {source}")]
    InvalidLocator {
        field: String,
        #[source]
        source: LocatorError,
    },
    #[error("field `{field}` has unknown attribute kind `{attribute}`")]
    InvalidAttribute { field: String, attribute: String },
    #[error("field `{field}` downloads images but extracts text")]
    ImageFromText { field: String },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    project_root: Option<String>,
    fields: Option<Value>,
    url_list: Option<String>,
    ledger_file: Option<String>,
    image_url_prefix: Option<String>,
    user_agent: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// A validated crawl configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    pub project_root: PathBuf,
    pub schema: FieldSchema,
    pub url_list: PathBuf,
    pub ledger_file: PathBuf,
    pub image_url_prefix: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

/// Where a run reads its inputs and writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub url_list: PathBuf,
    pub ledger: PathBuf,
    pub blog_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let project_root = raw
            .project_root
            .filter(|root| !root.trim().is_empty())
            .ok_or(ConfigError::MissingKey("project_root"))?;
        let fields = match raw.fields {
            None => return Err(ConfigError::MissingKey("fields")),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ConfigError::FieldsNotObject),
        };
        Self::new(PathBuf::from(project_root), &fields).map(|config| Self {
            url_list: raw.url_list.map_or(config.url_list, PathBuf::from),
            ledger_file: raw.ledger_file.map_or(config.ledger_file, PathBuf::from),
            image_url_prefix: raw
                .image_url_prefix
                .map(|prefix| prefix.trim_end_matches('/').to_string())
                .unwrap_or(config.image_url_prefix),
            user_agent: raw.user_agent.unwrap_or(config.user_agent),
            request_timeout: raw
                .request_timeout_secs
                .map_or(config.request_timeout, Duration::from_secs),
            ..config
        })
    }

    /// Defaults for everything except the root and the field definitions.
    pub fn new(project_root: PathBuf, fields: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self {
            project_root,
            schema: FieldSchema::from_fields(fields)?,
            url_list: PathBuf::from(DEFAULT_URL_LIST),
            ledger_file: PathBuf::from(DEFAULT_LEDGER_FILE),
            image_url_prefix: DEFAULT_IMAGE_URL_PREFIX.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn layout(&self) -> ProjectLayout {
        let root = self.project_root.clone();
        ProjectLayout {
            url_list: root.join(&self.url_list),
            ledger: root.join(&self.ledger_file),
            blog_dir: root.join(BLOG_DIR),
            image_dir: root.join(IMAGE_DIR),
            root,
        }
    }
}
