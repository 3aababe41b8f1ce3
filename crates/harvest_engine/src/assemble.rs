//! Turns one fetched page into a [`PageRecord`]: field extraction, link
//! resolution, image materialization and reference rewriting.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use harvest_logging::{harvest_debug, harvest_warn};
use scraper::Html;
use thiserror::Error;
use url::Url;

use crate::extract::{ExtractedValue, Extractor, XPathExtractor};
use crate::frontmatter::FrontMatter;
use crate::image::ImageMaterializer;
use crate::links::{image_sources, resolve_url};
use crate::schema::{Attribute, FieldSchema, FieldSpec};

/// Field whose value becomes the page body.
pub const CONTENT_FIELD: &str = "content";
const TITLE_FIELD: &str = "title";
const DATE_FIELD: &str = "date";
const URL_FIELD: &str = "url";

/// Everything the renderer needs for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub front_matter: FrontMatter,
    /// HTML markup with image references already rewritten.
    pub body: String,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("no value for `content` ({locator})")]
    MissingContent { locator: String },
}

/// An image reference found while extracting, before download.
#[derive(Debug, Clone)]
struct ImageRef {
    raw: String,
    url: Url,
}

#[derive(Debug)]
struct FieldValue<'s> {
    spec: &'s FieldSpec,
    value: ExtractedValue,
    images: Vec<ImageRef>,
}

pub struct DocumentAssembler {
    extractor: Box<dyn Extractor>,
    materializer: ImageMaterializer,
    image_dir: PathBuf,
    image_url_prefix: String,
}

impl DocumentAssembler {
    pub fn new(materializer: ImageMaterializer, image_dir: PathBuf, image_url_prefix: &str) -> Self {
        Self {
            extractor: Box::new(XPathExtractor),
            materializer,
            image_dir,
            image_url_prefix: image_url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub async fn assemble(
        &self,
        html: &str,
        page_url: &Url,
        schema: &FieldSchema,
    ) -> Result<PageRecord, AssembleError> {
        let values = self.extract_fields(html, page_url, schema);
        if !values.iter().any(|v| v.spec.name == CONTENT_FIELD) {
            let locator = schema
                .get(CONTENT_FIELD)
                .map(|spec| spec.locator.to_string())
                .unwrap_or_default();
            return Err(AssembleError::MissingContent { locator });
        }

        let local_refs = self.materialize_images(&values, page_url).await;
        Ok(self.build_record(values, &local_refs))
    }

    /// Synchronous so the parsed document never lives across an await.
    fn extract_fields<'s>(
        &self,
        html: &str,
        page_url: &Url,
        schema: &'s FieldSchema,
    ) -> Vec<FieldValue<'s>> {
        let document = Html::parse_document(html);
        let mut values = Vec::new();
        for spec in schema.fields() {
            let Some(mut value) = self.extractor.extract(&document, spec) else {
                harvest_debug!(
                    "Field `{}` matched nothing on {} ({})",
                    spec.name,
                    page_url,
                    spec.locator
                );
                continue;
            };

            let mut images = Vec::new();
            let mut resolved_link = None;
            if let ExtractedValue::Scalar(raw) = &value {
                let url = resolve_url(raw, page_url);
                if let (true, Some(url)) = (spec.download_image, &url) {
                    images.push(ImageRef {
                        raw: raw.clone(),
                        url: url.clone(),
                    });
                }
                if spec.attribute.is_link() {
                    resolved_link = url;
                }
            }
            if let Some(url) = resolved_link {
                value = ExtractedValue::Scalar(url.into());
            }
            if let (ExtractedValue::Markup(markup), true) = (&value, spec.download_image) {
                images.extend(image_sources(markup).into_iter().filter_map(|raw| {
                    let url = resolve_url(&raw, page_url)?;
                    Some(ImageRef { raw, url })
                }));
            }

            values.push(FieldValue {
                spec,
                value,
                images,
            });
        }
        values
    }

    /// Download every distinct image once. Failed downloads have no entry.
    async fn materialize_images(
        &self,
        values: &[FieldValue<'_>],
        page_url: &Url,
    ) -> HashMap<String, String> {
        let mut attempted = Vec::new();
        let mut local_refs = HashMap::new();
        for field in values {
            for image in &field.images {
                let key = image.url.to_string();
                if attempted.contains(&key) {
                    continue;
                }
                attempted.push(key.clone());
                match self
                    .materializer
                    .materialize(&image.url, &self.image_dir)
                    .await
                {
                    Ok(stored) => {
                        let local = format!("{}/{}", self.image_url_prefix, stored.filename);
                        local_refs.insert(key, local);
                    }
                    Err(err) => harvest_warn!(
                        "Keeping remote image for field `{}` ({}) on {}: {}",
                        field.spec.name,
                        field.spec.locator,
                        page_url,
                        err
                    ),
                }
            }
        }
        local_refs
    }

    fn build_record(
        &self,
        values: Vec<FieldValue<'_>>,
        local_refs: &HashMap<String, String>,
    ) -> PageRecord {
        // Every form an image was seen in, mapped to what the page should reference.
        let mut rewrites: Vec<(String, String)> = Vec::new();
        for image in values.iter().flat_map(|v| &v.images) {
            let target = local_refs
                .get(image.url.as_str())
                .cloned()
                .unwrap_or_else(|| image.url.to_string());
            for form in [image.raw.clone(), image.url.to_string()] {
                if form != target && !rewrites.iter().any(|(from, _)| *from == form) {
                    rewrites.push((form, target.clone()));
                }
            }
        }

        let mut front_matter = FrontMatter::new();
        let mut body_parts = Vec::new();
        let mut standalone_images = Vec::new();
        let mut title = None;
        let mut date = None;

        for FieldValue { spec, value, .. } in values {
            let text = match &value {
                ExtractedValue::Scalar(scalar) => rewrite_scalar(scalar, &rewrites),
                ExtractedValue::Markup(markup) => rewrite_markup(markup, &rewrites),
            };
            match spec.name.as_str() {
                TITLE_FIELD => title = Some(text.clone()),
                DATE_FIELD => date = parse_date(&text),
                _ => {}
            }

            if spec.front_matter {
                front_matter.insert(spec.name.as_str(), text);
                continue;
            }
            if spec.name == URL_FIELD {
                continue;
            }
            match value {
                ExtractedValue::Markup(_) => body_parts.push(text),
                ExtractedValue::Scalar(_)
                    if spec.download_image && matches!(spec.attribute, Attribute::Named(_)) =>
                {
                    standalone_images.push((spec.name.clone(), text));
                }
                ExtractedValue::Scalar(_) => {
                    body_parts.push(format!("<p>{}</p>", escape_text(&text)));
                }
            }
        }

        let mut body = body_parts.join("\n");
        for (name, reference) in standalone_images {
            if body.contains(&escape_attr(&reference)) {
                continue;
            }
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&format!(
                "<p><img src=\"{}\" alt=\"{}\"></p>",
                escape_attr(&reference),
                escape_attr(&name)
            ));
        }

        PageRecord {
            front_matter,
            body,
            title,
            date,
        }
    }
}

fn rewrite_scalar(value: &str, rewrites: &[(String, String)]) -> String {
    rewrites
        .iter()
        .find(|(from, _)| from == value)
        .map_or_else(|| value.to_string(), |(_, to)| to.clone())
}

/// Replace `src` attributes that point at a rewritten image.
fn rewrite_markup(markup: &str, rewrites: &[(String, String)]) -> String {
    let mut out = markup.to_string();
    for (from, to) in rewrites {
        let needle = format!("src=\"{}\"", escape_attr(from));
        let replacement = format!("src=\"{}\"", escape_attr(to));
        out = out.replace(&needle, &replacement);
    }
    out
}

/// `YYYY-MM-DD` at the start of a value, as in `2024-03-01T10:00:00Z`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let prefix = value.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_read_from_the_value_prefix() {
        assert_eq!(
            parse_date("2024-03-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("March 1st"), None);
        assert_eq!(parse_date("2024"), None);
    }

    #[test]
    fn markup_rewrite_touches_only_src_attributes() {
        let rewrites = vec![("/a.png".to_string(), "/static/images/a.png".to_string())];
        assert_eq!(
            rewrite_markup(r#"<img src="/a.png"> <a href="/a.png">x</a>"#, &rewrites),
            r#"<img src="/static/images/a.png"> <a href="/a.png">x</a>"#
        );
    }

    #[test]
    fn ampersands_in_sources_match_serialized_markup() {
        let rewrites = vec![("/a.png?w=1&h=2".to_string(), "/static/images/a.png".to_string())];
        assert_eq!(
            rewrite_markup(r#"<img src="/a.png?w=1&amp;h=2">"#, &rewrites),
            r#"<img src="/static/images/a.png">"#
        );
    }
}
