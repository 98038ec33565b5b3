//! 爬虫集成测试：深度、去重、参数记录、分支终止

use std::sync::Arc;

use rswebscan::{CrawlReport, Crawler, ParamValues, RequestExecutor, RetryPolicy, ScanConfig};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

async fn page(mock_server: &MockServer, route: &str, body: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(hits)
        .mount(mock_server)
        .await;
}

async fn crawl(mock_server: &MockServer, depth: u32) -> CrawlReport {
    let config = ScanConfig::builder(&mock_server.uri())
        .max_depth(depth)
        .retry_policy(RetryPolicy::never())
        .build()
        .unwrap();
    let executor = Arc::new(RequestExecutor::new(&config).unwrap());
    Crawler::new(executor, &config).run().await
}

#[tokio::test]
async fn test_cyclic_links_are_fetched_once() {
    let mock_server = MockServer::start().await;

    page(&mock_server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#, 1).await;
    page(&mock_server, "/a", r#"<a href="/">home</a><a href="/b">b</a>"#, 1).await;
    page(&mock_server, "/b", r#"<a href="a">a</a><a href="/a#top">a</a>"#, 1).await;

    let report = crawl(&mock_server, 5).await;

    assert_eq!(report.sitemap.len(), 3);
    for route in ["/", "/a", "/b"] {
        assert!(report.sitemap.contains(route), "missing {}", route);
    }
}

#[tokio::test]
async fn test_depth_bound_stops_fetching() {
    let mock_server = MockServer::start().await;

    page(&mock_server, "/", r#"<a href="/l1">1</a>"#, 1).await;
    page(&mock_server, "/l1", r#"<a href="/l2">2</a>"#, 1).await;
    page(&mock_server, "/l2", r#"<a href="/l3">3</a>"#, 0).await;

    let report = crawl(&mock_server, 2).await;

    // 深度3的路径已登记但未抓取
    assert!(report.sitemap.contains("/l2"));
    assert!(!report.sitemap.contains("/l3"));
}

#[tokio::test]
async fn test_not_found_terminates_branch() {
    let mock_server = MockServer::start().await;

    page(&mock_server, "/", r#"<a href="/missing">x</a><a href="/ok">ok</a>"#, 1).await;
    page(&mock_server, "/ok", "fine", 1).await;
    page(&mock_server, "/hidden", "", 0).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"<a href="/hidden">h</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = crawl(&mock_server, 3).await;

    assert!(report.sitemap.contains("/missing"));
    assert!(report.sitemap.contains("/ok"));
    assert!(!report.sitemap.contains("/hidden"));
}

#[tokio::test]
async fn test_query_and_form_parameters_recorded() {
    let mock_server = MockServer::start().await;

    page(
        &mock_server,
        "/",
        r#"
        <a href="/item?id=1">one</a>
        <a href="/item?id=2">two</a>
        <a href="/item?id=1">again</a>
        <form action="/login" method="post">
            <input name="user" value="">
            <input name="pass" type="password">
        </form>
        <form action="/search">
            <input name="q" value="shoes">
        </form>
        "#,
        1,
    )
    .await;
    page(&mock_server, "/item", "item", 2).await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "shoes"))
        .respond_with(html("results"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("user="))
        .respond_with(html("welcome"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = crawl(&mock_server, 3).await;
    let exported = report.sitemap.export();

    assert_eq!(
        exported["/item"].url_parameters["id"],
        ParamValues::Many(vec!["1".to_string(), "2".to_string()])
    );
    assert!(exported["/login"].post_parameters.contains_key("user"));
    assert!(exported["/login"].post_parameters.contains_key("pass"));
    assert!(exported["/login"].url_parameters.is_empty());
    assert_eq!(
        exported["/search"].url_parameters["q"],
        ParamValues::Single("shoes".to_string())
    );
}

#[tokio::test]
async fn test_location_header_followed_as_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/landing"))
        .expect(1)
        .mount(&mock_server)
        .await;
    page(&mock_server, "/landing", "hello", 1).await;

    let report = crawl(&mock_server, 3).await;

    assert!(report.sitemap.contains("/landing"));
}

#[tokio::test]
async fn test_external_and_ignored_links_skipped() {
    let mock_server = MockServer::start().await;

    page(
        &mock_server,
        "/",
        r#"
        <a href="http://other.example/page">x</a>
        <a href="mailto:admin@example.com">mail</a>
        <a href="/logout">bye</a>
        <a href="/about">about</a>
        "#,
        1,
    )
    .await;
    page(&mock_server, "/about", "about", 1).await;
    page(&mock_server, "/logout", "", 0).await;

    let report = crawl(&mock_server, 3).await;

    assert_eq!(report.sitemap.len(), 2);
    assert!(report.sitemap.contains("/about"));
    assert!(!report.sitemap.contains("/logout"));
    assert!(!report.sitemap.contains("/page"));
}

#[tokio::test]
async fn test_emails_and_comments_collected() {
    let mock_server = MockServer::start().await;

    page(
        &mock_server,
        "/",
        r#"<!-- build 42 --><p>Contact admin@example.com</p><a href="/team">team</a>"#,
        1,
    )
    .await;
    page(&mock_server, "/team", "<!-- staging only -->ops@example.com", 1).await;

    let report = crawl(&mock_server, 3).await;

    assert!(report.emails.contains("admin@example.com"));
    assert!(report.emails.contains("ops@example.com"));
    assert!(report.comments.contains("build 42"));
    assert!(report.comments.contains("staging only"));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["directories"]["/team"].is_object());
    assert_eq!(json["emails"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_declared_charset_decodes_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<p>caf\xE9</p><a href=\"/next\">next</a>".to_vec(), "text/html; charset=iso-8859-1"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    page(&mock_server, "/next", "bienvenue", 1).await;

    let report = crawl(&mock_server, 3).await;

    assert!(report.sitemap.contains("/next"));
}

#[tokio::test]
async fn test_links_inside_scripts_not_followed() {
    let mock_server = MockServer::start().await;

    page(
        &mock_server,
        "/",
        r#"<script>var t = '<a href="/phantom">x</a>';</script><a href="/real">r</a>"#,
        1,
    )
    .await;
    page(&mock_server, "/real", "real", 1).await;
    page(&mock_server, "/phantom", "", 0).await;

    let report = crawl(&mock_server, 3).await;

    assert_eq!(report.sitemap.len(), 2);
    assert!(report.sitemap.contains("/real"));
    assert!(!report.sitemap.contains("/phantom"));
}
