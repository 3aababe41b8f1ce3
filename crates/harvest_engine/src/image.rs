use std::path::{Path, PathBuf};
use std::sync::Arc;

use harvest_logging::harvest_debug;
use percent_encoding::percent_decode_str;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use url::Url;

use crate::fetch::Fetcher;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
const SUFFIX_LEN: usize = 8;
const MAX_STEM_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let media = content_type.split(';').next().unwrap_or(content_type).trim();
        match media.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// An image written to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: PathBuf,
    pub filename: String,
    pub format: ImageFormat,
    pub byte_len: u64,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to fetch image {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("image {url} has unsupported type {content_type:?}")]
    UnsupportedType {
        url: String,
        content_type: Option<String>,
    },
    #[error("no free filename for image {url} after {attempts} attempts")]
    NameExhausted { url: String, attempts: usize },
    #[error("failed to store image {url}: {source}")]
    Persist {
        url: String,
        #[source]
        source: PersistError,
    },
}

/// Downloads images and stores them under collision-free names.
///
/// A name that is already taken is never overwritten; a random suffix is
/// appended to the stem instead.
pub struct ImageMaterializer {
    fetcher: Arc<dyn Fetcher>,
    max_attempts: usize,
}

impl ImageMaterializer {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn materialize(
        &self,
        image_url: &Url,
        destination: &Path,
    ) -> Result<StoredImage, DownloadError> {
        let url = image_url.as_str();
        let output = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| DownloadError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let (stem, extension) = base_name(image_url);
        let content_type = output.metadata.content_type;
        let format = content_type
            .as_deref()
            .and_then(ImageFormat::from_content_type)
            .or_else(|| extension.as_deref().and_then(ImageFormat::from_extension))
            .ok_or_else(|| DownloadError::UnsupportedType {
                url: url.to_string(),
                content_type: content_type.clone(),
            })?;
        let extension = extension.unwrap_or_else(|| format.extension().to_string());

        let writer = AtomicFileWriter::new(destination.to_path_buf());
        for attempt in 0..self.max_attempts {
            let filename = if attempt == 0 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}-{}.{extension}", random_suffix())
            };
            match writer.write_new(&filename, &output.bytes) {
                Ok(path) => {
                    harvest_debug!("Stored image {} as {:?}", url, path);
                    return Ok(StoredImage {
                        path,
                        filename,
                        format,
                        byte_len: output.bytes.len() as u64,
                    });
                }
                Err(PersistError::AlreadyExists(path)) => {
                    harvest_debug!("Image name {:?} taken, retrying with a suffix", path);
                }
                Err(source) => {
                    return Err(DownloadError::Persist {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }
        Err(DownloadError::NameExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Sanitized stem and lowercase extension from the last path segment.
fn base_name(url: &Url) -> (String, Option<String>) {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let segment = percent_decode_str(segment).decode_utf8_lossy();
    let (stem, extension) = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ImageFormat::from_extension(ext).is_some() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (&*segment, None),
    };
    let mut stem = sanitize(stem);
    stem.truncate(MAX_STEM_BYTES);
    let stem = stem.trim_matches('-').to_string();
    if stem.is_empty() {
        return ("image".to_string(), extension);
    }
    (stem, extension)
}

/// ASCII letters, digits, `_` and `.` are kept; every other run becomes one `-`.
fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches(|c| c == '-' || c == '.').to_string()
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}
