//! Harvest engine: configuration, extraction, image storage, rendering and the
//! crawl pipeline that ties them to the filesystem and the network.
mod assemble;
mod config;
mod convert;
mod decode;
mod extract;
mod fetch;
mod filename;
mod frontmatter;
mod image;
mod ledger;
mod links;
mod persist;
mod pipeline;
mod render;
mod rewrite;
mod schema;
mod types;
mod xpath;

pub use assemble::{AssembleError, DocumentAssembler, PageRecord, CONTENT_FIELD};
pub use config::{
    ConfigError, CrawlConfig, ProjectLayout, DEFAULT_IMAGE_URL_PREFIX, DEFAULT_LEDGER_FILE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_URL_LIST, DEFAULT_USER_AGENT,
};
pub use convert::{Converter, Html2MdConverter};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use extract::{visible_text, ExtractedValue, Extractor, XPathExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{markdown_filename, short_hash, slugify, MAX_SLUG_BYTES};
pub use frontmatter::FrontMatter;
pub use image::{DownloadError, ImageFormat, ImageMaterializer, StoredImage, DEFAULT_MAX_ATTEMPTS};
pub use ledger::{DedupLedger, LedgerError};
pub use links::{image_sources, resolve_url};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{run_config_file, run_project, CrawlPipeline, Fetchers, PageError, RunError};
pub use render::{MarkdownRenderer, RenderError, RenderedPage};
pub use rewrite::{find_markdown_containing, replace_in_files, RewriteError};
pub use schema::{Attribute, FieldSchema, FieldSpec, REQUIRED_FIELDS};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use xpath::{Locator, LocatorError, Match};
