use std::fs;
use std::time::Duration;

use harvest_engine::{Attribute, ConfigError, CrawlConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn parse(json: &str) -> Result<CrawlConfig, ConfigError> {
    CrawlConfig::from_json(json)
}

#[test]
fn fields_keep_declaration_order_and_defaults() {
    let config = parse(
        r#"{
            "project_root": "/srv/site",
            "fields": {
                "title": {"xpath": "//h1", "attribute": "text"},
                "url": {"xpath": "//link[@rel='canonical']", "attribute": "href"},
                "author": {"xpath": "//span[@class='author']"},
                "content": {"xpath": "//article", "attribute": "html", "download_image": true},
                "hero": {"xpath": "//img[@class='hero']", "attribute": "src", "download_image": true}
            }
        }"#,
    )
    .unwrap();

    let names: Vec<_> = config.schema.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["title", "url", "author", "content", "hero"]);

    let front: Vec<_> = config
        .schema
        .front_matter_fields()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(front, vec!["title", "author", "hero"]);

    let author = config.schema.get("author").unwrap();
    assert_eq!(author.attribute, Attribute::Text);
    assert!(!author.download_image);
    let hero = config.schema.get("hero").unwrap();
    assert_eq!(hero.attribute, Attribute::Named("src".to_string()));
    assert!(hero.download_image);
    assert_eq!(hero.locator.as_str(), "//img[@class='hero']");
}

#[test]
fn unknown_keys_are_ignored() {
    let config = parse(
        r#"{
            "project_root": "site",
            "theme": "dark",
            "fields": {
                "title": {"xpath": "//h1", "comment": "page heading"},
                "content": {"xpath": "//article", "attribute": "html", "weight": 3}
            }
        }"#,
    )
    .unwrap();

    let names: Vec<_> = config.schema.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["title", "content"]);
    assert_eq!(config.schema.get("content").unwrap().attribute, Attribute::Html);
}

#[test]
fn long_key_forms_are_accepted() {
    let config = parse(
        r#"{
            "project_root": "site",
            "request_timeout_secs": 5,
            "user_agent": "custom/1.0",
            "fields": {
                "title": {"locator": "//h1", "include_in_front_matter": false},
                "content": {"locator": "//main", "attribute": "html", "download_as_image": true}
            }
        }"#,
    )
    .unwrap();
    assert!(!config.schema.get("title").unwrap().front_matter);
    assert!(config.schema.get("content").unwrap().download_image);
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.user_agent, "custom/1.0");
}

#[test]
fn missing_required_pieces_are_reported() {
    assert!(matches!(
        parse(r#"{"fields": {}}"#),
        Err(ConfigError::MissingKey("project_root"))
    ));
    assert!(matches!(
        parse(r#"{"project_root": "site"}"#),
        Err(ConfigError::MissingKey("fields"))
    ));
    assert!(matches!(
        parse(r#"{"project_root": "site", "fields": []}"#),
        Err(ConfigError::FieldsNotObject)
    ));
    assert!(matches!(
        parse(r#"{"project_root": "site", "fields": {"content": {"xpath": "//main"}}}"#),
        Err(ConfigError::MissingField("title"))
    ));
    assert!(matches!(
        parse(r#"{"project_root": "site", "fields": {"title": {"xpath": "//h1"}}}"#),
        Err(ConfigError::MissingField("content"))
    ));
    assert!(matches!(parse("{not json"), Err(ConfigError::Parse(_))));
}

#[test]
fn invalid_field_definitions_are_rejected() {
    let err = parse(
        r#"{"project_root": "s", "fields": {
            "title": {"xpath": "//h1["},
            "content": {"xpath": "//main"}
        }}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLocator { ref field, .. } if field == "title"));

    let err = parse(
        r#"{"project_root": "s", "fields": {
            "title": {"xpath": "//h1", "attribute": "inner text"},
            "content": {"xpath": "//main"}
        }}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidAttribute { ref attribute, .. } if attribute == "inner text"));

    let err = parse(
        r#"{"project_root": "s", "fields": {
            "title": {"xpath": "//h1"},
            "content": {"xpath": "//main"},
            "cover": {"xpath": "//img", "download_image": true}
        }}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ImageFromText { ref field } if field == "cover"));

    let err = parse(
        r#"{"project_root": "s", "fields": {
            "title": {"attribute": "text"},
            "content": {"xpath": "//main"}
        }}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "title"));
}

#[test]
fn load_reads_from_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(
        &path,
        r#"{"project_root": "site", "fields": {"title": {"xpath": "//h1"}, "content": {"xpath": "//main"}}}"#,
    )
    .unwrap();
    let config = CrawlConfig::load(&path).unwrap();
    assert_eq!(config.schema.fields().len(), 2);

    let missing = CrawlConfig::load(&temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));
}
