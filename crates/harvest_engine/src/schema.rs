use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ConfigError;
use crate::xpath::Locator;

/// Fields every schema must declare.
pub const REQUIRED_FIELDS: [&str; 2] = ["title", "content"];

/// What to take from the first node a locator matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Visible text content.
    Text,
    /// Inner markup.
    Html,
    /// Raw value of the named attribute.
    Named(String),
}

impl Attribute {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("text") {
            return Some(Attribute::Text);
        }
        if raw.eq_ignore_ascii_case("html") {
            return Some(Attribute::Html);
        }
        let mut chars = raw.chars();
        let first = chars.next()?;
        let valid = (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'));
        valid.then(|| Attribute::Named(raw.to_ascii_lowercase()))
    }

    /// Attributes whose values are URLs relative to the page.
    pub fn is_link(&self) -> bool {
        matches!(self, Attribute::Named(name) if matches!(name.as_str(), "src" | "href" | "data-src" | "poster"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub locator: Locator,
    pub attribute: Attribute,
    pub front_matter: bool,
    pub download_image: bool,
}

impl FieldSpec {
    pub fn new(name: &str, locator: &str, attribute: Attribute) -> Result<Self, ConfigError> {
        let locator = Locator::compile(locator).map_err(|source| ConfigError::InvalidLocator {
            field: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            locator,
            attribute,
            front_matter: default_front_matter(name),
            download_image: false,
        })
    }

    pub fn with_front_matter(mut self, front_matter: bool) -> Self {
        self.front_matter = front_matter;
        self
    }

    pub fn with_download_image(mut self, download_image: bool) -> Self {
        self.download_image = download_image;
        self
    }
}

/// `content` feeds the body and `url` is bookkeeping; everything else is metadata.
fn default_front_matter(name: &str) -> bool {
    !matches!(name, "content" | "url")
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(alias = "locator")]
    xpath: Option<String>,
    attribute: Option<String>,
    #[serde(alias = "include_in_front_matter")]
    front_matter: Option<bool>,
    #[serde(default, alias = "download_as_image")]
    download_image: bool,
}

/// Validated field definitions, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|f| f.name == field.name) {
                return Err(ConfigError::InvalidField {
                    field: field.name.clone(),
                    message: "declared more than once".to_string(),
                });
            }
            if field.download_image && field.attribute == Attribute::Text {
                return Err(ConfigError::ImageFromText {
                    field: field.name.clone(),
                });
            }
        }
        for required in REQUIRED_FIELDS {
            if !fields.iter().any(|f| f.name == required) {
                return Err(ConfigError::MissingField(required));
            }
        }
        Ok(Self { fields })
    }

    /// Build from the `fields` object of a config file.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ConfigError> {
        let specs = fields
            .iter()
            .map(|(name, value)| parse_field(name, value))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn front_matter_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.front_matter)
    }
}

fn parse_field(name: &str, value: &Value) -> Result<FieldSpec, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidField {
        field: name.to_string(),
        message,
    };
    let raw = RawField::deserialize(value).map_err(|err| invalid(err.to_string()))?;
    let xpath = raw
        .xpath
        .filter(|x| !x.trim().is_empty())
        .ok_or_else(|| invalid("missing `xpath`".to_string()))?;
    let attribute = match raw.attribute.as_deref() {
        None => Attribute::Text,
        Some(kind) => Attribute::parse(kind).ok_or_else(|| ConfigError::InvalidAttribute {
            field: name.to_string(),
            attribute: kind.to_string(),
        })?,
    };
    let mut spec = FieldSpec::new(name, &xpath, attribute)?.with_download_image(raw.download_image);
    if let Some(front_matter) = raw.front_matter {
        spec = spec.with_front_matter(front_matter);
    }
    Ok(spec)
}
