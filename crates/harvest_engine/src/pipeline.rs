//! Sequential crawl over a URL list: fetch, assemble, render, write, record.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use harvest_core::{parse_url_list, RunReport, TransitionError, UrlJob, UrlOutcome, UrlState};
use harvest_logging::{harvest_debug, harvest_error, harvest_info, harvest_warn};
use thiserror::Error;
use url::Url;

use crate::assemble::{AssembleError, DocumentAssembler};
use crate::config::{ConfigError, CrawlConfig};
use crate::decode::{decode_html, DecodeError};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::image::ImageMaterializer;
use crate::ledger::{DedupLedger, LedgerError};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::render::{MarkdownRenderer, RenderError};
use crate::schema::FieldSchema;
use crate::FetchError;

/// Why a single page did not produce a file.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("fetched from an unusable url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write markdown: {0}")]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Problems that stop a run before any URL is processed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read url list {path:?}: {source}")]
    UrlList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("output directory {path:?} unusable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// Page and image fetchers. Images accept any content type.
#[derive(Clone)]
pub struct Fetchers {
    pub pages: Arc<dyn Fetcher>,
    pub images: Arc<dyn Fetcher>,
}

impl Fetchers {
    pub fn from_config(config: &CrawlConfig) -> Self {
        let user_agent = Some(config.user_agent.clone());
        let pages = FetchSettings::for_pages()
            .with_user_agent(user_agent.clone())
            .with_request_timeout(config.request_timeout);
        let images = FetchSettings::for_images()
            .with_user_agent(user_agent)
            .with_request_timeout(config.request_timeout);
        Self {
            pages: Arc::new(ReqwestFetcher::new(pages)),
            images: Arc::new(ReqwestFetcher::new(images)),
        }
    }

    /// One fetcher for both pages and images.
    pub fn shared(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            pages: fetcher.clone(),
            images: fetcher,
        }
    }
}

pub struct CrawlPipeline {
    schema: FieldSchema,
    pages: Arc<dyn Fetcher>,
    assembler: DocumentAssembler,
    renderer: MarkdownRenderer,
    writer: AtomicFileWriter,
    ledger: DedupLedger,
    crawl_date: NaiveDate,
}

impl CrawlPipeline {
    pub fn new(config: &CrawlConfig, ledger: DedupLedger, fetchers: Fetchers) -> Self {
        let layout = config.layout();
        let materializer = ImageMaterializer::new(fetchers.images);
        Self {
            schema: config.schema.clone(),
            pages: fetchers.pages,
            assembler: DocumentAssembler::new(
                materializer,
                layout.image_dir,
                &config.image_url_prefix,
            ),
            renderer: MarkdownRenderer::default(),
            writer: AtomicFileWriter::new(layout.blog_dir),
            ledger,
            crawl_date: Local::now().date_naive(),
        }
    }

    pub fn with_crawl_date(mut self, crawl_date: NaiveDate) -> Self {
        self.crawl_date = crawl_date;
        self
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Process `urls` one at a time, in order.
    pub async fn run(&mut self, urls: &[String]) -> RunReport {
        let mut report = RunReport::new();
        for url in urls {
            report.record(self.process(url).await);
        }
        report
    }

    pub async fn process(&mut self, url: &str) -> UrlOutcome {
        let mut job = UrlJob::new(url);
        if self.ledger.contains(url) {
            harvest_debug!("Skipping {}: already in ledger", url);
            if let Err(err) = job.advance(UrlState::Skipped) {
                harvest_error!("{}", err);
            }
            return job.into_outcome();
        }

        harvest_info!("Processing {}", url);
        match self.drive(&mut job).await {
            Ok(path) => harvest_info!("Wrote {} to {:?}", url, path),
            Err(err) => {
                harvest_warn!("Failed {} while {}: {}", url, job.state(), err);
                if let Err(transition) = job.fail(err.to_string()) {
                    harvest_error!("{}", transition);
                }
            }
        }
        job.into_outcome()
    }

    async fn drive(&mut self, job: &mut UrlJob) -> Result<PathBuf, PageError> {
        let url = job.url().to_string();

        job.advance(UrlState::Fetching)?;
        let output = self.pages.fetch(&url).await?;
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref())?;
        let base = Url::parse(&output.metadata.final_url)
            .map_err(|err| PageError::InvalidUrl(err.to_string()))?;
        harvest_debug!(
            "Fetched {} ({} bytes, {})",
            base,
            output.metadata.byte_len,
            decoded.encoding_label
        );

        job.advance(UrlState::Assembling)?;
        let record = self
            .assembler
            .assemble(&decoded.html, &base, &self.schema)
            .await?;

        job.advance(UrlState::Rendering)?;
        let rendered = self.renderer.render(&record, &url, self.crawl_date)?;
        let path = self.writer.write(&rendered.filename, &rendered.document)?;
        self.ledger.record(&url)?;
        job.complete(path.display().to_string())?;
        Ok(path)
    }
}

/// Run the crawl described by `config` under its project root.
pub async fn run_project(
    config: &CrawlConfig,
    fetchers: Fetchers,
    crawl_date: NaiveDate,
) -> Result<RunReport, RunError> {
    let layout = config.layout();
    for dir in [&layout.blog_dir, &layout.image_dir] {
        ensure_output_dir(dir).map_err(|source| RunError::OutputDir {
            path: dir.clone(),
            source,
        })?;
    }
    let raw = fs::read_to_string(&layout.url_list).map_err(|source| RunError::UrlList {
        path: layout.url_list.clone(),
        source,
    })?;
    let urls = parse_url_list(&raw);
    let ledger = DedupLedger::open(&layout.ledger)?;
    harvest_info!(
        "Loaded {} urls from {:?}; {} already processed",
        urls.len(),
        layout.url_list,
        ledger.len()
    );

    let mut pipeline = CrawlPipeline::new(config, ledger, fetchers).with_crawl_date(crawl_date);
    let report = pipeline.run(&urls).await;
    harvest_info!(
        "Run finished: {} written, {} skipped, {} failed",
        report.written(),
        report.skipped(),
        report.failed()
    );
    Ok(report)
}

/// Load the config at `path` and run it with network fetchers.
pub async fn run_config_file(path: &Path, crawl_date: NaiveDate) -> Result<RunReport, RunError> {
    let config = CrawlConfig::load(path)?;
    let fetchers = Fetchers::from_config(&config);
    run_project(&config, fetchers, crawl_date).await
}
