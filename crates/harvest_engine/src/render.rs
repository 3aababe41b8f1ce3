use chrono::NaiveDate;
use thiserror::Error;

use crate::assemble::PageRecord;
use crate::convert::{Converter, Html2MdConverter};
use crate::filename::markdown_filename;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub filename: String,
    pub document: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("page body converted to empty markdown")]
    EmptyBody,
}

pub struct MarkdownRenderer {
    converter: Box<dyn Converter>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(Box::new(Html2MdConverter))
    }
}

impl MarkdownRenderer {
    pub fn new(converter: Box<dyn Converter>) -> Self {
        Self { converter }
    }

    /// Front matter block, a blank line, then the Markdown body.
    ///
    /// A page `date` wins over `crawl_date` for the filename.
    pub fn render(
        &self,
        record: &PageRecord,
        url: &str,
        crawl_date: NaiveDate,
    ) -> Result<RenderedPage, RenderError> {
        let body = self.converter.to_markdown(&record.body);
        if body.trim().is_empty() {
            return Err(RenderError::EmptyBody);
        }
        let date = record.date.unwrap_or(crawl_date);
        let filename = markdown_filename(record.title.as_deref(), url, date);
        let document = format!("{}\n{}\n", record.front_matter.render(), body.trim_end());
        Ok(RenderedPage { filename, document })
    }
}
