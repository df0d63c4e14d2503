use crate::common::*;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tabs_harvest::record::Field;
use tabs_harvest::state::FailureKind;
use tabs_harvest::storage::{RecordStore, RunStatus, SqliteStore};
use tabs_harvest::{run_scrape, HarvestError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn temp_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("projects.db").to_string_lossy().into_owned();
    (dir, db_path)
}

fn open(db_path: &str) -> SqliteStore {
    SqliteStore::new(Path::new(db_path)).unwrap()
}

/// Mounts two pages (15 + 7) of fixture projects with their detail pages
async fn mount_two_pages(server: &MockServer, listing_calls: u64) {
    mount_listing_page(server, 1, listing_body(1, 15, Some(22)), listing_calls).await;
    mount_listing_page(server, 2, listing_body(16, 22, Some(22)), listing_calls).await;
    mount_details(server, 1, 22).await;
}

#[tokio::test]
async fn test_full_scrape_with_one_parse_failure() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    // Project 9 serves a page without any project labels
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", project_number(9))))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><h1>Maintenance</h1></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_page(&server, 1, listing_body(1, 15, Some(22)), 1).await;
    mount_listing_page(&server, 2, listing_body(16, 22, Some(22)), 1).await;
    mount_details(&server, 1, 8).await;
    mount_details(&server, 10, 22).await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.records_attempted, 22);
    assert_eq!(stats.records_stored, 21);
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.failures.parse, 1);
    assert_eq!(stats.retries, 0);
    assert!(stats.aborted.is_none());

    let store = open(&db_path);
    assert_eq!(store.count().unwrap(), 21);
    assert!(store.get(&project_number(9)).unwrap().is_none());

    let record = store.get(&project_number(3)).unwrap().unwrap();
    assert_eq!(record.project_name, Field::Known("Detail Project 3".to_string()));
    assert_eq!(record.project_id, Field::Known("1003".to_string()));
    assert_eq!(record.city, Field::Known("Austin".to_string()));
    assert_eq!(record.estimated_cost, Field::Known(3_000.0));
    assert_eq!(record.square_footage, Field::Known(3_500));
    assert_eq!(record.start_date, Field::Known("2026-03-01".to_string()));
    assert_eq!(record.completion_date, Field::Unknown);

    let runs = store.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].records_stored, 21);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 1, Some(1)), 1).await;

    // Two 503s, then the real page
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", project_number(1))))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_detail(&server, 1).await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.records_stored, 1);
    assert_eq!(stats.records_failed, 0);
    assert_eq!(stats.retries, 2);
    assert_eq!(open(&db_path).count().unwrap(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 2, Some(2)), 1).await;
    mount_detail(&server, 2).await;

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", project_number(1))))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.records_stored, 1);
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.failures.transient, 1);
    assert_eq!(stats.retries, 2);
}

#[tokio::test]
async fn test_missing_detail_page_is_not_retried() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 3, Some(3)), 1).await;
    mount_detail(&server, 1).await;
    mount_detail(&server, 3).await;

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", project_number(2))))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.records_stored, 2);
    assert_eq!(stats.failures.non_zero(), vec![(FailureKind::Fetch, 1)]);
    assert_eq!(stats.retries, 0);
}

#[tokio::test]
async fn test_record_cap_truncates_last_page() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();
    mount_two_pages(&server, 1).await;

    let mut config = create_test_config(&server, &db_path);
    config.scrape.max_records = Some(20);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.records_attempted, 20);
    assert!(stats.records_stored + stats.records_failed <= 20);
    assert_eq!(open(&db_path).count().unwrap(), 20);

    // Newest-first order: the last two listed projects were never fetched
    let store = open(&db_path);
    assert!(store.get(&project_number(20)).unwrap().is_some());
    assert!(store.get(&project_number(21)).unwrap().is_none());
}

#[tokio::test]
async fn test_record_cap_stops_paging() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 15, Some(22)), 1).await;
    mount_listing_page(&server, 2, listing_body(16, 22, Some(22)), 0).await;
    mount_details(&server, 1, 15).await;

    let mut config = create_test_config(&server, &db_path);
    config.scrape.max_records = Some(10);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.records_attempted, 10);
    assert_eq!(open(&db_path).count().unwrap(), 10);
}

#[tokio::test]
async fn test_two_runs_are_idempotent() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();
    mount_two_pages(&server, 2).await;

    let config = create_test_config(&server, &db_path);

    let first = run_scrape(&config).await.unwrap();
    assert_eq!(first.records_new, 22);
    let before = open(&db_path).get(&project_number(5)).unwrap().unwrap();

    let second = run_scrape(&config).await.unwrap();
    assert_eq!(second.records_new, 0);
    assert_eq!(second.records_updated, 22);

    let store = open(&db_path);
    assert_eq!(store.count().unwrap(), 22);

    let mut after = store.get(&project_number(5)).unwrap().unwrap();
    assert!(after.date_scraped >= before.date_scraped);
    after.date_scraped = before.date_scraped;
    assert_eq!(after, before);

    assert_eq!(store.recent_runs(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_page_ends_paging() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    // No totalRecords: a full page implies more, an empty page ends it
    mount_listing_page(&server, 1, listing_body(1, 15, None), 1).await;
    mount_listing_page(&server, 2, serde_json::json!({ "data": [] }), 1).await;
    mount_listing_page(&server, 3, listing_body(16, 16, None), 0).await;
    mount_details(&server, 1, 15).await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.records_stored, 15);
}

#[tokio::test]
async fn test_short_page_ends_paging() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 4, None), 1).await;
    mount_listing_page(&server, 2, listing_body(5, 5, None), 0).await;
    mount_details(&server, 1, 4).await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.records_stored, 4);
}

#[tokio::test]
async fn test_unreachable_first_page_aborts_run() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    Mock::given(method("POST"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path);
    let err = run_scrape(&config).await.unwrap_err();
    assert!(matches!(err, HarvestError::ListingUnreachable { page: 1, .. }));

    let store = open(&db_path);
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.recent_runs(1).unwrap()[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_later_listing_failure_keeps_progress() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 15, Some(40)), 1).await;
    mount_details(&server, 1, 15).await;

    Mock::given(method("POST"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &db_path);
    let stats = run_scrape(&config).await.unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.records_stored, 15);
    assert!(stats.aborted.unwrap().contains("page 2"));

    let store = open(&db_path);
    assert_eq!(store.count().unwrap(), 15);
    assert_eq!(store.recent_runs(1).unwrap()[0].status, RunStatus::Aborted);
}

/// Responder that notes when each request arrived
fn recording(
    arrivals: &Arc<Mutex<Vec<Instant>>>,
    response: ResponseTemplate,
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
    let arrivals = Arc::clone(arrivals);
    move |_: &Request| {
        arrivals.lock().unwrap().push(Instant::now());
        response.clone()
    }
}

#[tokio::test]
async fn test_requests_are_paced() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    Mock::given(method("POST"))
        .and(path("/listing"))
        .respond_with(recording(
            &arrivals,
            ResponseTemplate::new(200).set_body_json(listing_body(1, 4, Some(4))),
        ))
        .expect(1)
        .mount(&server)
        .await;
    for n in 1..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/detail/{}", project_number(n))))
            .respond_with(recording(
                &arrivals,
                ResponseTemplate::new(200).set_body_string(detail_html(n)),
            ))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, &db_path);
    config.scrape.delay_ms = 80;
    let stats = run_scrape(&config).await.unwrap();
    assert_eq!(stats.records_stored, 4);

    // One listing request and four detail requests; successive starts are
    // spaced by the delay, less a little scheduling jitter on arrival
    let mut arrivals = arrivals.lock().unwrap().clone();
    arrivals.sort();
    assert_eq!(arrivals.len(), 5);
    for pair in arrivals.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_millis(60), "requests only {:?} apart", gap);
    }
}

#[tokio::test]
async fn test_search_after_scrape() {
    let server = MockServer::start().await;
    let (_dir, db_path) = temp_db();

    mount_listing_page(&server, 1, listing_body(1, 3, Some(3)), 1).await;
    mount_details(&server, 1, 3).await;

    let config = create_test_config(&server, &db_path);
    run_scrape(&config).await.unwrap();

    let store = open(&db_path);
    assert_eq!(store.search("detail project 2", 50).unwrap().len(), 1);
    assert_eq!(store.search("travis", 50).unwrap().len(), 3);
    assert_eq!(store.search("travis", 2).unwrap().len(), 2);
}
