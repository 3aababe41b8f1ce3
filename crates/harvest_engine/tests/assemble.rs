mod common;

use std::fs;
use std::sync::Arc;

use common::{StaticFetcher, PNG_BYTES};
use harvest_engine::{
    AssembleError, CrawlConfig, DocumentAssembler, FieldSchema, ImageMaterializer,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

fn schema(fields: &str) -> FieldSchema {
    let json = format!(r#"{{"project_root": "site", "fields": {fields}}}"#);
    CrawlConfig::from_json(&json).unwrap().schema
}

fn page_url() -> Url {
    Url::parse("https://example.com/posts/first.html").unwrap()
}

#[tokio::test]
async fn content_images_are_stored_once_and_rewritten() {
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(
        StaticFetcher::new()
            .bytes("https://example.com/img/a.png", PNG_BYTES, "image/png")
            .bytes("https://cdn.example.net/b.jpg", b"JPEG", "image/jpeg"),
    );
    let assembler = DocumentAssembler::new(
        ImageMaterializer::new(fetcher.clone()),
        temp.path().to_path_buf(),
        "/static/images/",
    );
    let html = r#"<html><body><h1>Pics</h1><main>
        <p><img src="../img/a.png"></p>
        <p><img src="https://cdn.example.net/b.jpg"><img src="/img/a.png"></p>
    </main></body></html>"#;
    let schema = schema(
        r#"{"title": {"xpath": "//h1"},
            "content": {"xpath": "//main", "attribute": "html", "download_image": true}}"#,
    );

    let record = assembler.assemble(html, &page_url(), &schema).await.unwrap();

    assert_eq!(
        fetcher.calls(),
        vec![
            "https://example.com/img/a.png".to_string(),
            "https://cdn.example.net/b.jpg".to_string(),
        ]
    );
    assert_eq!(record.body.matches("/static/images/a.png").count(), 2);
    assert!(record.body.contains(r#"src="/static/images/b.jpg""#));
    assert!(!record.body.contains("../img/a.png"));
    assert_eq!(record.title.as_deref(), Some("Pics"));
    assert_eq!(record.front_matter.keys().collect::<Vec<_>>(), vec!["title"]);
    assert!(temp.path().join("a.png").exists());
    assert!(temp.path().join("b.jpg").exists());
}

#[tokio::test]
async fn body_image_field_is_appended_when_not_referenced() {
    let temp = TempDir::new().unwrap();
    let fetcher = Arc::new(StaticFetcher::new().bytes(
        "https://example.com/posts/cover.png",
        PNG_BYTES,
        "image/png",
    ));
    let assembler = DocumentAssembler::new(
        ImageMaterializer::new(fetcher),
        temp.path().to_path_buf(),
        "/static/images",
    );
    let html = r#"<html><head><meta property="og:image" content="cover.png"></head>
        <body><h1>T</h1><div id="c"><p>Words.</p></div></body></html>"#;
    let schema = schema(
        r#"{"title": {"xpath": "//h1"},
            "content": {"xpath": "//div[@id='c']", "attribute": "html"},
            "cover": {"xpath": "//meta[@property='og:image']", "attribute": "content",
                      "download_image": true, "front_matter": false}}"#,
    );

    let record = assembler.assemble(html, &page_url(), &schema).await.unwrap();
    assert_eq!(
        record.body,
        "<p>Words.</p>\n<p><img src=\"/static/images/cover.png\" alt=\"cover\"></p>"
    );
    assert_eq!(fs::read(temp.path().join("cover.png")).unwrap(), PNG_BYTES);
}

#[tokio::test]
async fn links_are_absolute_and_scalars_are_escaped_into_the_body() {
    let temp = TempDir::new().unwrap();
    let assembler = DocumentAssembler::new(
        ImageMaterializer::new(Arc::new(StaticFetcher::new())),
        temp.path().to_path_buf(),
        "/static/images",
    );
    let html = r#"<html><body><h1>T</h1><a class="src" href="../about">x</a>
        <article><p>A</p></article><p class="note">1 &lt; 2</p></body></html>"#;
    let schema = schema(
        r#"{"title": {"xpath": "//h1"},
            "source": {"xpath": "//a[@class='src']", "attribute": "href"},
            "content": {"xpath": "//article", "attribute": "html"},
            "note": {"xpath": "//p[@class='note']", "front_matter": false}}"#,
    );

    let record = assembler.assemble(html, &page_url(), &schema).await.unwrap();
    assert_eq!(
        record.front_matter.get("source"),
        Some("https://example.com/about")
    );
    assert_eq!(record.body, "<p>A</p>\n<p>1 &lt; 2</p>");
}

#[tokio::test]
async fn missing_content_is_an_error() {
    let temp = TempDir::new().unwrap();
    let assembler = DocumentAssembler::new(
        ImageMaterializer::new(Arc::new(StaticFetcher::new())),
        temp.path().to_path_buf(),
        "/static/images",
    );
    let schema = schema(r#"{"title": {"xpath": "//h1"}, "content": {"xpath": "//article"}}"#);

    let err = assembler
        .assemble("<h1>T</h1>", &page_url(), &schema)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AssembleError::MissingContent {
            locator: "//article".to_string()
        }
    );
}
