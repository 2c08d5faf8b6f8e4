//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and drive the probe and
//! crawl pipelines over real HTTP into a temporary storage directory.

use std::sync::Arc;

use olymp_crawler::models::Config;
use olymp_crawler::pipeline::{run_crawl, run_probe};
use olymp_crawler::services::HttpTransport;
use olymp_crawler::storage::LocalStorage;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"<html><body>
<h1>Олимпиада по информатике</h1>
<span class="rating">8</span>
<span class="classes_types_a">9–11 класс</span>
<div class="subject_tags_full">ИнформатикаМатематика</div>
<div class="info block_with_margin_bottom"><p>Командная олимпиада.</p></div>
<div class="left"><table><tbody>
<tr><td>Отборочный этап</td><td>1 ноя...3 дек</td></tr>
</tbody></table></div>
</body></html>"#;

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.crawler.base_url = format!("{}/activity/", server.uri());
    config.crawler.timeout_secs = 5;
    config.crawler.max_retries = 1;
    config.crawler.backoff_base_ms = 10;
    config.crawler.max_concurrent = 4;
    config.probe.failure_delay_ms = 0;
    config.dates.reference_year = Some(2024);
    config
}

async fn mount_listing(server: &MockServer, id: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/activity/{}", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LISTING)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn transport(config: &Config) -> Arc<HttpTransport> {
    Arc::new(HttpTransport::from_config(&config.crawler).expect("Failed to build client"))
}

#[tokio::test]
async fn test_crawl_excludes_not_found_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, 41).await;
    mount_listing(&server, 43).await;
    // 42 is not mounted, so wiremock answers 404

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&server);
    let storage = LocalStorage::from_config(tmp.path(), &config);

    let summary = run_crawl(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        Some(vec![41, 42, 43]),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.not_found, 1);

    let text = std::fs::read_to_string(storage.output_path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["41", "43"]);
}

#[tokio::test]
async fn test_artifact_shape() {
    let server = MockServer::start().await;
    mount_listing(&server, 7).await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&server);
    let storage = LocalStorage::from_config(tmp.path(), &config);

    run_crawl(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        Some(vec![7]),
    )
    .await
    .expect("Crawl failed");

    let text = std::fs::read_to_string(storage.output_path()).unwrap();
    assert!(text.contains("Олимпиада по информатике"));

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        json["7"],
        serde_json::json!({
            "title": "Олимпиада по информатике",
            "rating": "8",
            "classes": ["Информатика", "Математика"],
            "description": "Командная олимпиада.",
            "grades": [9, 10, 11],
            "timetable": {
                "Отборочный этап": ["2024-11-01", "2024-12-03"]
            }
        })
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    for id in [1, 2, 5] {
        mount_listing(&server, id).await;
    }

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&server);
    let ids: Vec<u32> = (0..6).collect();

    let storage = LocalStorage::from_config(tmp.path(), &config);
    run_crawl(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        Some(ids.clone()),
    )
    .await
    .expect("First crawl failed");
    let first = std::fs::read(storage.output_path()).unwrap();

    let storage = LocalStorage::from_config(tmp.path(), &config);
    run_crawl(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        Some(ids),
    )
    .await
    .expect("Second crawl failed");
    let second = std::fs::read(storage.output_path()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_probe_then_crawl() {
    let server = MockServer::start().await;
    mount_listing(&server, 3).await;
    mount_listing(&server, 5).await;
    // A page without a title is not a valid listing
    Mock::given(method("GET"))
        .and(path("/activity/6"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Страница не найдена</p>"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&server);
    let storage = LocalStorage::from_config(tmp.path(), &config);

    let report = run_probe(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        0..8,
    )
    .await
    .expect("Probe failed");

    assert_eq!(report.valid, [3, 5]);
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("ids.txt")).unwrap(),
        "3\n5\n"
    );

    let summary = run_crawl(
        &config,
        &storage,
        transport(&config),
        CancellationToken::new(),
        None,
    )
    .await
    .expect("Crawl failed");

    assert_eq!(summary.succeeded, 2);
    assert_eq!(storage.load_listings().await.unwrap().len(), 2);
}
