use harvest_engine::{
    Attribute, Converter, ExtractedValue, Extractor, FieldSpec, Html2MdConverter, XPathExtractor,
};
use pretty_assertions::assert_eq;
use scraper::Html;

const PAGE: &str = r#"<html><head><title>Ignored</title><script>var x = 1;</script></head>
<body>
  <h1>  Hello
      World </h1>
  <div class="meta"><span class="author">Ann</span><time datetime="2024-03-01">March 1</time></div>
  <article>
    <p>Intro <b>bold</b> text.</p>
    <script>track()</script>
    <img class="hero" src="/media/hero.png" alt="Hero">
  </article>
  <p class="note">first</p>
  <p class="note">second</p>
</body></html>"#;

fn extract(locator: &str, attribute: Attribute) -> Option<ExtractedValue> {
    let document = Html::parse_document(PAGE);
    let spec = FieldSpec::new("field", locator, attribute).unwrap();
    XPathExtractor.extract(&document, &spec)
}

fn scalar(value: &str) -> Option<ExtractedValue> {
    Some(ExtractedValue::Scalar(value.to_string()))
}

#[test]
fn text_is_visible_and_collapsed() {
    assert_eq!(extract("//h1", Attribute::Text), scalar("Hello World"));
    assert_eq!(
        extract("//article", Attribute::Text),
        scalar("Intro bold text.")
    );
}

#[test]
fn html_returns_inner_markup() {
    let Some(ExtractedValue::Markup(markup)) = extract("//article", Attribute::Html) else {
        panic!("expected markup");
    };
    assert!(markup.starts_with("<p>Intro <b>bold</b> text.</p>"));
    assert!(markup.contains(r#"<img class="hero" src="/media/hero.png" alt="Hero">"#));
}

#[test]
fn named_attribute_reads_raw_value() {
    assert_eq!(
        extract("//img[@class='hero']", Attribute::Named("src".into())),
        scalar("/media/hero.png")
    );
    assert_eq!(
        extract("//time", Attribute::Named("datetime".into())),
        scalar("2024-03-01")
    );
    assert_eq!(extract("//h1", Attribute::Named("id".into())), None);
}

#[test]
fn attribute_and_text_nodes_return_their_string_value() {
    assert_eq!(
        extract("//img/@alt", Attribute::Html),
        scalar("Hero")
    );
    assert_eq!(
        extract("//span[@class='author']/text()", Attribute::Text),
        scalar("Ann")
    );
}

#[test]
fn first_match_in_document_order_wins() {
    assert_eq!(
        extract("//p[@class='note']", Attribute::Text),
        scalar("first")
    );
    assert_eq!(
        extract("//p[@class='note'][2]", Attribute::Text),
        scalar("second")
    );
}

#[test]
fn no_match_or_empty_value_is_absent() {
    assert_eq!(extract("//h2", Attribute::Text), None);
    assert_eq!(extract("//div[@class='missing']", Attribute::Html), None);
}

#[test]
fn converter_keeps_headings_links_and_images() {
    let md = Html2MdConverter.to_markdown(
        r#"<h2>Section</h2><p>See <a href="https://example.com/x">this</a>.</p><p><img src="/static/images/hero.png" alt="Hero"></p>"#,
    );
    assert!(md.contains("Section"));
    assert!(md.contains("[this](https://example.com/x)"));
    assert!(md.contains("![Hero](/static/images/hero.png)"));
}
