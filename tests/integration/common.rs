use serde_json::{json, Value};
use tabs_harvest::config::Config;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Project number for the n-th fixture project (1-based)
pub fn project_number(n: usize) -> String {
    format!("TABS2026{:06}", n)
}

/// Creates a test configuration pointing at the mock server
pub fn create_test_config(server: &MockServer, db_path: &str) -> Config {
    let mut config = Config::default();
    config.source.listing_url = format!("{}/listing", server.uri());
    config.source.detail_url = format!("{}/detail/", server.uri());
    config.source.referer = format!("{}/search", server.uri());
    config.scrape.page_size = 15;
    config.scrape.delay_ms = 0;
    config.scrape.max_concurrency = 5;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.output.database_path = db_path.to_string();
    config
}

/// Listing response body for projects `first..=last`
pub fn listing_body(first: usize, last: usize, total: Option<u64>) -> Value {
    let data: Vec<Value> = (first..=last)
        .map(|n| {
            json!({
                "ProjectNumber": project_number(n),
                "ProjectId": 1000 + n,
                "ProjectName": format!("Listing Project {}", n),
            })
        })
        .collect();

    match total {
        Some(total) => json!({ "data": data, "totalRecords": total }),
        None => json!({ "data": data }),
    }
}

/// Mounts a listing page, expected to be requested exactly `times` times
pub async fn mount_listing_page(server: &MockServer, page: u32, body: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/listing"))
        .and(body_partial_json(json!({ "pageNumber": page })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Detail page for the n-th fixture project
pub fn detail_html(n: usize) -> String {
    format!(
        r#"<html>
<head><title>Project {number}</title></head>
<body>
  <div>Project Name: Detail Project {n}</div>
  <div>Facility Name: Facility {n}</div>
  <div>Location Address:</div>
  <div>{n} Main St, Austin, TX 78701</div>
  <div>Location County: Travis</div>
  <div>Start Date: 03/01/2026</div>
  <div>Estimated Cost: ${n},000</div>
  <div>Square Footage: {n},500</div>
  <div>Current Status: Project Registered</div>
  <div>Registration Date: 01/{day:02}/2026</div>
</body>
</html>"#,
        number = project_number(n),
        n = n,
        day = (n % 28) + 1,
    )
}

/// Mounts the detail page of the n-th project
pub async fn mount_detail(server: &MockServer, n: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", project_number(n))))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(n)))
        .mount(server)
        .await;
}

/// Mounts detail pages for projects `first..=last`
pub async fn mount_details(server: &MockServer, first: usize, last: usize) {
    for n in first..=last {
        mount_detail(server, n).await;
    }
}
