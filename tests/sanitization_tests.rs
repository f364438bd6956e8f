// tests/sanitization_tests.rs

use std::sync::Arc;

use html_field::{HostRecord, HtmlField, PurifierOverrides, PurifierPolicy, Record, Sanitizer};
use serde_json::json;

fn render(field: HtmlField) -> String {
    let mut field = field;
    field.resolve_for_display(&Record::new(), None).unwrap().to_string()
}

#[test]
fn it_sanitizes_html_by_default() {
    let value = render(HtmlField::new("Test").content(r#"<p>Hello</p><script>alert("xss")</script>"#));

    assert!(value.contains("Hello"));
    assert!(!value.contains("script"));
    assert!(!value.contains("alert"));
}

#[test]
fn it_removes_javascript_event_handlers() {
    let value = render(HtmlField::new("Test").content(r#"<div onclick="alert(1)">Click me</div>"#));

    assert!(value.contains("Click me"));
    assert!(!value.contains("onclick"));
    assert!(!value.contains("alert"));
}

#[test]
fn it_removes_javascript_urls() {
    let value = render(HtmlField::new("Test").content(r#"<a href="javascript:alert(1)">Link</a>"#));

    assert!(value.contains("Link"));
    assert!(!value.contains("javascript:"));
}

#[test]
fn it_preserves_safe_html_elements() {
    let value = render(
        HtmlField::new("Test")
            .content("<p>Paragraph</p><strong>Bold</strong><em>Italic</em><ul><li>Item</li></ul>"),
    );

    assert!(value.contains("<p>"));
    assert!(value.contains("<strong>"));
    assert!(value.contains("<em>"));
    assert!(value.contains("<ul>"));
    assert!(value.contains("<li>"));
}

#[test]
fn it_preserves_safe_links() {
    let value = render(HtmlField::new("Test").content(r#"<a href="https://example.com">External Link</a>"#));

    assert!(value.contains(r#"href="https://example.com""#));
    assert!(value.contains("External Link"));
}

#[test]
fn it_preserves_images_with_valid_sources() {
    let value =
        render(HtmlField::new("Test").content(r#"<img src="https://example.com/image.jpg" alt="Test">"#));

    assert!(value.contains("<img"));
    assert!(value.contains(r#"src="https://example.com/image.jpg""#));
}

#[test]
fn it_can_disable_sanitization() {
    let value = render(
        HtmlField::new("Test")
            .content(r#"<script>alert("test")</script>"#)
            .without_sanitization(),
    );

    assert!(value.contains("<script>"));
}

#[test]
fn it_accepts_custom_purifier_config() {
    let value = render(
        HtmlField::new("Test")
            .content("<p>Paragraph</p><div>Div</div>")
            .purifier_config([("HTML.Allowed", json!("p"))]),
    );

    assert!(value.contains("<p>"));
    assert!(!value.contains("<div>"));
}

#[test]
fn it_handles_empty_content_gracefully() {
    let value = render(HtmlField::new("Test").content(""));

    assert_eq!(value, "");
}

#[test]
fn it_removes_style_tags() {
    let value = render(HtmlField::new("Test").content("<style>.evil { display: none; }</style><p>Content</p>"));

    assert!(!value.contains("<style>"));
    assert!(!value.contains(".evil"));
    assert!(value.contains("Content"));
}

#[test]
fn it_removes_object_and_embed_tags() {
    let value = render(
        HtmlField::new("Test").content(r#"<object data="malware.swf"></object><embed src="malware.swf"><p>Safe</p>"#),
    );

    assert!(!value.contains("<object"));
    assert!(!value.contains("<embed"));
    assert!(value.contains("Safe"));
}

#[test]
fn it_removes_data_urls_from_images() {
    let value = render(HtmlField::new("Test").content(r#"<img src="data:image/svg+xml,<svg onload=alert(1)>">"#));

    assert!(!value.contains("data:"));
    assert!(!value.contains("onload"));
}

#[test]
fn it_handles_nested_xss_attempts() {
    let value = render(HtmlField::new("Test").content(r#"<p><img src="x" onerror="alert(1)"></p>"#));

    assert!(!value.contains("onerror"));
}

#[test]
fn it_sanitizes_dynamically_resolved_content() {
    let mut field = HtmlField::computed("Test", |record| Ok(record.get("unsafe_html").unwrap_or_default()));

    let record = Record::new().with("unsafe_html", r#"<p>Safe</p><script>alert("xss")</script>"#);
    let value = field.resolve_for_display(&record, None).unwrap();

    assert!(value.contains("Safe"));
    assert!(!value.contains("script"));
}

#[test]
fn overrides_cannot_allow_scripts() {
    let value = render(
        HtmlField::new("Test")
            .content("<script>alert(1)</script><p onclick=\"x()\">ok</p>")
            .purifier_config([
                ("HTML.Allowed", json!("script,p[onclick]")),
            ]),
    );

    assert_eq!(value, "<p>ok</p>");
}

#[test]
fn overrides_cannot_allow_script_urls() {
    let value = render(
        HtmlField::new("Test")
            .content(r#"<a href="javascript:alert(1)">x</a>"#)
            .purifier_config([("URI.AllowedSchemes", json!(["javascript", "http"]))]),
    );

    assert!(value.contains(">x</a>"));
    assert!(!value.contains("javascript"));
}

#[test]
fn it_removes_javascript_urls_from_cite() {
    let value = render(
        HtmlField::new("Test").content(r#"<q cite="javascript:alert(1)">quote</q><blockquote cite="https://example.com">b</blockquote>"#),
    );

    assert!(value.contains("<q>quote</q>"));
    assert!(!value.contains("javascript"));
    assert!(value.contains(r#"cite="https://example.com""#));
}

#[test]
fn nofollow_and_target_blank_options() {
    let value = render(
        HtmlField::new("Test")
            .content(r#"<a href="https://example.com" target="_self">x</a>"#)
            .purifier_config([("HTML.Nofollow", json!(true)), ("HTML.TargetBlank", json!(true))]),
    );

    assert!(value.contains("nofollow"));
    assert!(value.contains(r#"target="_blank""#));
    assert!(!value.contains("_self"));
}

#[test]
fn relative_urls_can_be_made_absolute() {
    let value = render(
        HtmlField::new("Test")
            .content(r#"<a href="/docs">Docs</a>"#)
            .purifier_config([
                ("URI.Base", json!("https://example.com/")),
                ("URI.MakeAbsolute", json!(true)),
            ]),
    );

    assert!(value.contains(r#"href="https://example.com/docs""#));
}

#[test]
fn sanitizing_is_idempotent() {
    let sanitizer = Sanitizer::default();
    let mut restrictive = PurifierOverrides::new();
    restrictive.insert("HTML.Allowed".to_string(), json!("p,b,a[href]"));
    let policies = [PurifierOverrides::new(), restrictive];

    let inputs = [
        "<p>Hello</p><script>alert(1)</script>",
        r#"<div onclick="alert(1)">Click me</div>"#,
        "<p><b>unbalanced <i>markup</p>",
        r#"<a href="javascript:alert(1)">x</a><img src="https://example.com/a.png" alt="a">"#,
        "<table><tr><td colspan=2>cell</td></tr></table>",
        "<pre>\n\nx</pre>",
        "<textarea>\n\nx</textarea>",
        "<h1>a<h2>b</h2></h1>",
        "<table><p>x</p></table>",
        "<b><p>x</b>y</p>",
    ];

    for overrides in &policies {
        for input in inputs {
            let once = sanitizer.sanitize(input, overrides).unwrap();
            let twice = sanitizer.sanitize(&once, overrides).unwrap();
            assert_eq!(once, twice, "sanitize is not idempotent for {input} under {overrides:?}");
        }
    }
}

#[test]
fn pre_blocks_keep_leading_blank_lines() {
    let value = render(HtmlField::new("Test").content("<pre>\n\nindented</pre>"));

    assert_eq!(value, "<pre>\n\nindented</pre>");
}

#[test]
fn shared_sanitizer_with_cache_dir() {
    let tmp = tempfile::TempDir::new().unwrap();
    let sanitizer = Arc::new(Sanitizer::with_cache_dir(
        PurifierPolicy::default(),
        Some(tmp.path().join("purifier")),
    ));

    for _ in 0..2 {
        let value = render(
            HtmlField::new("Test")
                .content("<p>A</p><div>B</div>")
                .purifier_config([("HTML.Allowed", json!("p"))])
                .sanitizer(Arc::clone(&sanitizer)),
        );
        assert!(value.contains("<p>A</p>"));
        assert!(!value.contains("<div>"));
    }
}
