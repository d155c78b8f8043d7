mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{envelope, image_bytes, media_name, CopyConverter, FixedCapture};
use hardcopy_engine::{
    shortcode, ArticleCheckError, BookLayout, Driver, EngineSettings, PipelineError, RunOptions,
    BROKEN_ASSET_PLACEHOLDER,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn layout(temp: &TempDir) -> BookLayout {
    BookLayout::for_date(temp.path(), NaiveDate::from_ymd_opt(2024, 10, 16).unwrap())
}

async fn mount_assets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/img/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes(600)))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/img/photo"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/photo"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes(900)))
        .mount(server)
        .await;
}

fn article(server: &MockServer) -> (String, String, String) {
    let url = format!("{}/article", server.uri());
    let readable = envelope(
        &url,
        "Test Article",
        &["Jane", "5 words"],
        r#"<p>Intro <a href="https://example.com/">link</a>.</p><p><img src="/img/a.png" alt="A"></p><p><img src="/img/photo"></p><table class="unique_id_1"><tr><td>table cell</td></tr></table>"#,
    );
    let raw = envelope(
        &url,
        "Test Article",
        &["Jane", "5 words"],
        r#"<nav>Menu</nav><p>Raw <img src="/img/a.png"> page</p><table class="unique_id_1"><tr><td>table cell</td></tr></table>"#,
    );
    (url, readable, raw)
}

fn driver(capture: Arc<FixedCapture>) -> Driver {
    Driver::new(EngineSettings::default())
        .unwrap()
        .with_converter(Arc::new(CopyConverter::default()))
        .with_capture(capture)
}

#[tokio::test]
async fn article_is_rendered_in_both_variants() {
    let server = MockServer::start().await;
    mount_assets(&server).await;
    let (url, readable, raw) = article(&server);
    let capture = Arc::new(FixedCapture::default().with_page(&url, readable, raw));
    let temp = TempDir::new().unwrap();
    let layout = layout(&temp);

    let outcomes = driver(capture.clone())
        .run(&layout, &[url.clone()], RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.table_ids, vec!["unique_id_1".to_string()]);
    assert_eq!(outcome.report.metadata_words, Some(5));
    assert_eq!(capture.calls(), 1);

    let a = media_name(&format!("{}/img/a.png", server.uri()));
    let photo = media_name(&format!("{}/img/photo", server.uri()));
    let markdown = std::fs::read_to_string(&outcome.markdown_path).unwrap();
    for expected in [
        "Test Article".to_string(),
        "Jane • 5 words".to_string(),
        format!("Intro [link](https://example.com/) {{{}}}.", shortcode("https://example.com/")),
        format!("![A](./media/{a})"),
        format!("![](./media/{photo}.jpg)"),
        "![](./media/element_unique_id_1.png)".to_string(),
        format!("[Article link]({url}) {{{}}}", shortcode(&url)),
    ] {
        assert!(markdown.contains(&expected), "missing {expected:?} in {markdown}");
    }
    assert!(!markdown.contains("<metadata>") && !markdown.contains("[\"Jane\""), "{markdown}");
    assert!(!markdown.contains(BROKEN_ASSET_PLACEHOLDER), "{markdown}");

    let raw_markdown = std::fs::read_to_string(&outcome.raw_markdown_path).unwrap();
    assert!(raw_markdown.contains("Raw ![](/img/a.png) page"), "{raw_markdown}");
    assert!(raw_markdown.contains("![](./media/element_unique_id_1.png)"));
    assert!(!raw_markdown.contains(BROKEN_ASSET_PLACEHOLDER));

    let (cached_readable, cached_raw) = layout.capture_paths(&url);
    assert!(cached_readable.is_file());
    assert!(cached_raw.is_file());
}

#[tokio::test]
async fn second_run_is_identical_and_offline() {
    let server = MockServer::start().await;
    mount_assets(&server).await;
    let (url, readable, raw) = article(&server);
    let capture = Arc::new(FixedCapture::default().with_page(&url, readable, raw));
    let temp = TempDir::new().unwrap();
    let layout = layout(&temp);
    let urls = [url.clone()];

    let first = driver(capture.clone())
        .run(&layout, &urls, RunOptions::default())
        .await
        .unwrap();
    let first_markdown = std::fs::read_to_string(&first[0].markdown_path).unwrap();
    let first_media = media_listing(&layout);
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 3);
    assert!(!first_markdown.contains(BROKEN_ASSET_PLACEHOLDER));

    let second = driver(capture.clone())
        .run(&layout, &urls, RunOptions::default())
        .await
        .unwrap();
    let second_markdown = std::fs::read_to_string(&second[0].markdown_path).unwrap();

    assert_eq!(second_markdown, first_markdown);
    assert_eq!(media_listing(&layout), first_media);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_after_first);
    assert_eq!(capture.calls(), 1);
}

#[tokio::test]
async fn raw_html_mode_rewrites_images_and_keeps_tables() {
    let server = MockServer::start().await;
    mount_assets(&server).await;
    let (url, readable, raw) = article(&server);
    let capture = Arc::new(FixedCapture::default().with_page(&url, readable, raw));
    let temp = TempDir::new().unwrap();
    let layout = layout(&temp);
    let options = RunOptions {
        use_raw_html: true,
        ..RunOptions::default()
    };

    let outcomes = driver(capture).run(&layout, &[url.clone()], options).await.unwrap();

    let a = media_name(&format!("{}/img/a.png", server.uri()));
    let markdown = std::fs::read_to_string(&outcomes[0].markdown_path).unwrap();
    assert!(markdown.contains("Menu"), "{markdown}");
    assert!(markdown.contains(&format!("Raw ![](./media/{a}) page")), "{markdown}");
    assert!(markdown.contains("table cell"), "{markdown}");
    assert!(!markdown.contains("element_unique_id_1"));
    let raw_markdown = std::fs::read_to_string(&outcomes[0].raw_markdown_path).unwrap();
    assert_eq!(raw_markdown, markdown);
}

#[tokio::test]
async fn long_articles_cannot_share_a_book() {
    let server = MockServer::start().await;
    let first = format!("{}/one", server.uri());
    let second = format!("{}/two", server.uri());
    let short = envelope(&first, "One", &["10 words"], "<p>short</p>");
    let long = envelope(&second, "Two", &["3500 words"], "<p>long</p>");
    let capture = Arc::new(
        FixedCapture::default()
            .with_page(&first, short.clone(), short)
            .with_page(&second, long.clone(), long),
    );
    let temp = TempDir::new().unwrap();
    let layout = layout(&temp);
    let urls = [first, second.clone()];

    let err = driver(capture.clone())
        .run(&layout, &urls, RunOptions::default())
        .await
        .unwrap_err();
    match err {
        PipelineError::ArticleCheck(ArticleCheckError::TooLong { url, words, .. }) => {
            assert_eq!(url, second);
            assert_eq!(words, 3500);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let options = RunOptions {
        ignore_long_articles: true,
        ..RunOptions::default()
    };
    let outcomes = driver(capture).run(&layout, &urls, options).await.unwrap();
    assert_eq!(outcomes.len(), 2);
}

#[tokio::test]
async fn cached_captures_are_read_as_utf8() {
    let server = MockServer::start().await;
    let url = format!("{}/accents", server.uri());
    let page = envelope(
        &url,
        "Accents",
        &["3 words"],
        r#"<p><meta charset="windows-1252">Café naïve crème</p>"#,
    );
    let temp = TempDir::new().unwrap();
    let layout = layout(&temp);
    layout.ensure().unwrap();
    let (readable_path, raw_path) = layout.capture_paths(&url);
    std::fs::write(&readable_path, &page).unwrap();
    std::fs::write(&raw_path, &page).unwrap();
    let capture = Arc::new(FixedCapture::default());

    let outcomes = driver(capture.clone())
        .run(&layout, &[url], RunOptions::default())
        .await
        .unwrap();

    assert_eq!(capture.calls(), 0);
    for path in [&outcomes[0].markdown_path, &outcomes[0].raw_markdown_path] {
        let markdown = std::fs::read_to_string(path).unwrap();
        assert!(markdown.contains("Café naïve crème"), "{markdown}");
    }
}

fn media_listing(layout: &BookLayout) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(layout.media_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
