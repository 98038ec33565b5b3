//! 请求执行器集成测试：重试、限速、请求构造

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rswebscan::{
    BasicAuth, Method, NetworkErrorKind, RequestExecutor, RequestOptions, RetryPolicy, RswebscanError,
    ScanConfig,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn executor(config: &ScanConfig) -> RequestExecutor {
    RequestExecutor::new(config).unwrap()
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_last_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = ScanConfig::builder(&mock_server.uri())
        .timeout(Duration::from_millis(100))
        .retry_policy(RetryPolicy::random_uniform(2, Duration::ZERO, Duration::ZERO))
        .build()
        .unwrap();

    let url = format!("{}/slow", mock_server.uri());
    let err = executor(&config).get(&url).await.unwrap_err();

    match err {
        RswebscanError::Network { kind, attempt, .. } => {
            assert_eq!(kind, NetworkErrorKind::Timeout);
            assert_eq!(attempt, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_http_error_status_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ScanConfig::builder(&mock_server.uri())
        .retry_policy(RetryPolicy::random_uniform(3, Duration::ZERO, Duration::ZERO))
        .build()
        .unwrap();

    let url = format!("{}/broken", mock_server.uri());
    let response = executor(&config).get(&url).await.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.text().unwrap(), "boom");
}

#[tokio::test]
async fn test_success_after_transient_timeout() {
    let mock_server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(move |_req: &Request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500))
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = ScanConfig::builder(&mock_server.uri())
        .timeout(Duration::from_millis(150))
        .retry_policy(RetryPolicy::random_uniform(2, Duration::ZERO, Duration::ZERO))
        .build()
        .unwrap();

    let url = format!("{}/flaky", mock_server.uri());
    let response = executor(&config).get(&url).await.unwrap();
    assert_eq!(response.text().unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    // 取一个空闲端口后立即释放
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let seed = format!("http://127.0.0.1:{}/", port);

    let config = ScanConfig::builder(&seed)
        .retry_policy(RetryPolicy::random_uniform(1, Duration::ZERO, Duration::ZERO))
        .build()
        .unwrap();

    let err = executor(&config).get(&seed).await.unwrap_err();
    assert!(err.is_network());
    assert!(matches!(err, RswebscanError::Network { attempt: 2, .. }));
}

#[tokio::test]
async fn test_rate_limit_spreads_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(6)
        .mount(&mock_server)
        .await;

    let config = ScanConfig::builder(&mock_server.uri())
        .rate_limit(Some(2))
        .build()
        .unwrap();
    let executor = Arc::new(executor(&config));
    let url = format!("{}/fast", mock_server.uri());

    let start = Instant::now();
    let requests = (0..6).map(|_| {
        let executor = Arc::clone(&executor);
        let url = url.clone();
        tokio::spawn(async move { executor.get(&url).await })
    });
    for handle in futures::future::join_all(requests).await {
        assert_eq!(handle.unwrap().unwrap().status, 200);
    }

    assert!(start.elapsed() >= Duration::from_millis(2400), "elapsed {:?}", start.elapsed());
}

#[tokio::test]
async fn test_request_carries_params_headers_and_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(header("x-api-key", "abc"))
        .and(header("cookie", "session=1"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("user=admin"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/home"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ScanConfig::builder(&mock_server.uri())
        .header("X-Api-Key", "abc")
        .cookie(Some("session=1".to_string()))
        .auth(Some(BasicAuth::parse("admin:secret").unwrap()))
        .build()
        .unwrap();
    let executor = executor(&config);

    let url = format!("{}/search", mock_server.uri());
    let options = RequestOptions::new().query(vec![("q".to_string(), "rust".to_string())]);
    let response = executor.execute(Method::GET, &url, &options).await.unwrap();
    assert_eq!(response.text().unwrap(), "found");

    let url = format!("{}/login", mock_server.uri());
    let options = RequestOptions::new()
        .form(vec![("user".to_string(), "admin".to_string())])
        .no_redirects();
    let response = executor.execute(Method::POST, &url, &options).await.unwrap();
    assert_eq!(response.status, 302);
    assert_eq!(response.location(), Some("/home"));
}
