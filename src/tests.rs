//! Integration tests for the Runcrew backend.

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::{session_layer, session_store};
use crate::config::Config;
use crate::db::init_database;
use crate::{create_router, AppState};

const BASE_LAT: f64 = 37.5665;
const BASE_LNG: f64 = 126.9780;

/// Test fixture for integration tests.
struct TestFixture {
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let store = session_store(&pool)
            .await
            .expect("Failed to init session store");

        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            bcrypt_cost: 4,
            max_radius_km: 10.0,
            ..Config::default()
        };

        let sessions = session_layer(store, &config);
        let app = create_router(AppState::new(pool, config), sessions);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// A client with its own cookie jar, i.e. its own session.
    fn client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    async fn sign_up(&self, client: &Client, email: &str, nickname: &str) -> String {
        let resp = client
            .post(self.url("/auth/signup"))
            .json(&json!({
                "email": email,
                "password": "password123",
                "nickname": nickname
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        body["data"]["userId"].as_str().unwrap().to_string()
    }

    /// Sign up a fresh user and return a client logged in as them.
    async fn logged_in(&self, email: &str, nickname: &str) -> (Client, String) {
        let client = self.client();
        let user_id = self.sign_up(&client, email, nickname).await;

        let resp = client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        (client, user_id)
    }

    async fn region_id(&self, district: &str) -> String {
        let body: Value = self
            .client()
            .get(self.url("/regions"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["district"] == district)
            .and_then(|r| r["id"].as_str())
            .unwrap()
            .to_string()
    }

    async fn create_crew(&self, client: &Client, crew: Value) -> String {
        let resp = client
            .post(self.url("/crews"))
            .json(&crew)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        body["data"]["crewId"].as_str().unwrap().to_string()
    }
}

fn crew_body(region_id: &str, latitude: f64, max_participants: i64) -> Value {
    json!({
        "title": "Morning run",
        "description": "Easy 5k",
        "regionId": region_id,
        "meetingTime": "2030-05-01T07:00:00",
        "place": "Seoul Plaza",
        "latitude": latitude,
        "longitude": BASE_LNG,
        "maxParticipants": max_participants,
        "level": "BEGINNER"
    })
}

async fn error_code(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    body["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client()
        .get(format!("{}/health", fixture.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_login_me_logout() {
    let fixture = TestFixture::new().await;
    let (client, user_id) = fixture.logged_in("runner@example.com", "Runner").await;

    let resp = client.get(fixture.url("/users/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "SUCCESS");
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["nickname"], "Runner");

    let resp = client.post(fixture.url("/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(fixture.url("/users/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let fixture = TestFixture::new().await;
    let anonymous = fixture.client();

    let resp = anonymous
        .post(fixture.url("/crews"))
        .json(&crew_body("whatever", BASE_LAT, 5))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "AUTHENTICATION_REQUIRED");

    let resp = anonymous
        .post(fixture.url("/crews/some-id/join"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_validation_and_duplicates() {
    let fixture = TestFixture::new().await;
    let client = fixture.client();

    let resp = client
        .post(fixture.url("/auth/signup"))
        .json(&json!({ "email": "nope", "password": "short", "nickname": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_INPUT_VALUE");
    let fields: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["email", "password", "nickname"]);

    fixture
        .sign_up(&client, "runner@example.com", "Runner")
        .await;
    let resp = client
        .post(fixture.url("/auth/signup"))
        .json(&json!({
            "email": "runner@example.com",
            "password": "password123",
            "nickname": "Again"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "DUPLICATED_EMAIL");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let fixture = TestFixture::new().await;
    let client = fixture.client();
    fixture
        .sign_up(&client, "runner@example.com", "Runner")
        .await;

    let resp = client
        .post(fixture.url("/auth/login"))
        .json(&json!({ "email": "runner@example.com", "password": "password999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "AUTHENTICATION_FAILED");
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client()
        .post(fixture.url("/auth/signup"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "INVALID_INPUT_VALUE");
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let fixture = TestFixture::new().await;
    let (client, _) = fixture.logged_in("runner@example.com", "Runner").await;
    let region_id = fixture.region_id("마포구").await;

    let resp = client
        .put(fixture.url("/users/me"))
        .json(&json!({
            "nickname": "Pacer",
            "regionId": region_id,
            "preferredLevel": "ADVANCED"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["nickname"], "Pacer");
    assert_eq!(body["data"]["region"]["district"], "마포구");
    assert_eq!(body["data"]["preferredLevel"], "ADVANCED");

    let resp = client
        .put(fixture.url("/users/me/password"))
        .json(&json!({ "currentPassword": "wrong-password", "newPassword": "new-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "PASSWORD_MISMATCH");

    let resp = client
        .put(fixture.url("/users/me/password"))
        .json(&json!({ "currentPassword": "password123", "newPassword": "new-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = fixture
        .client()
        .post(fixture.url("/auth/login"))
        .json(&json!({ "email": "runner@example.com", "password": "new-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_regions_are_seeded() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client()
        .get(fixture.url("/regions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let regions = body["data"].as_array().unwrap();
    assert_eq!(regions.len(), 25);
    assert!(regions.iter().all(|r| r["city"] == "서울"));
}

#[tokio::test]
async fn test_crew_lifecycle() {
    let fixture = TestFixture::new().await;
    let region_id = fixture.region_id("중구").await;
    let (host, host_id) = fixture.logged_in("host@example.com", "Host").await;
    let (runner, runner_id) = fixture.logged_in("runner@example.com", "Runner").await;

    let crew_id = fixture
        .create_crew(&host, crew_body(&region_id, BASE_LAT, 2))
        .await;

    // Detail is public and lists the host.
    let resp = fixture
        .client()
        .get(fixture.url(&format!("/crews/{}", crew_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["hostId"], host_id.as_str());
    assert_eq!(body["data"]["hostNickname"], "Host");
    assert_eq!(body["data"]["region"]["district"], "중구");
    assert_eq!(body["data"]["meetingTime"], "2030-05-01T07:00:00");
    assert_eq!(body["data"]["members"][0]["role"], "HOST");

    // Join, then joining again conflicts.
    let join_url = fixture.url(&format!("/crews/{}/join", crew_id));
    let resp = runner.post(&join_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = runner.post(&join_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "CREW_MEMBER_ALREADY_JOINED");

    // Crew of two is now full.
    let (late, _) = fixture.logged_in("late@example.com", "Late").await;
    let resp = late.post(&join_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "CREW_MEMBER_LIMIT_EXCEEDED");

    // Only the host may edit or delete.
    let mut changed = crew_body(&region_id, BASE_LAT, 4);
    changed["title"] = json!("Renamed run");
    let crew_url = fixture.url(&format!("/crews/{}", crew_id));
    let resp = runner.put(&crew_url).json(&changed).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, "ACCESS_DENIED");

    let resp = host.put(&crew_url).json(&changed).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Renamed run");
    assert_eq!(body["data"]["currentParticipants"], 2);
    assert_eq!(body["data"]["members"][1]["userId"], runner_id.as_str());

    // The host cannot leave; members can, once.
    let leave_url = fixture.url(&format!("/crews/{}/leave", crew_id));
    let resp = host.post(&leave_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = runner.post(&leave_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = runner.post(&leave_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "CREW_MEMBER_NOT_FOUND");

    let resp = runner.delete(&crew_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = host.delete(&crew_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = fixture.client().get(&crew_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "CREW_NOT_FOUND");
}

#[tokio::test]
async fn test_create_crew_validation() {
    let fixture = TestFixture::new().await;
    let (host, _) = fixture.logged_in("host@example.com", "Host").await;
    let region_id = fixture.region_id("중구").await;

    let mut body = crew_body(&region_id, 91.0, 0);
    body["title"] = json!("   ");
    let resp = host
        .post(fixture.url("/crews"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    let fields: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["title", "latitude", "maxParticipants"]);

    let resp = host
        .post(fixture.url("/crews"))
        .json(&crew_body("no-such-region", BASE_LAT, 5))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "REGION_NOT_FOUND");
}

#[tokio::test]
async fn test_nearby_search_orders_by_distance() {
    let fixture = TestFixture::new().await;
    let region_id = fixture.region_id("중구").await;
    let (host, _) = fixture.logged_in("host@example.com", "Host").await;

    let near = fixture
        .create_crew(&host, crew_body(&region_id, BASE_LAT + 0.002, 5))
        .await;
    let mid = fixture
        .create_crew(&host, crew_body(&region_id, BASE_LAT + 0.009, 5))
        .await;
    fixture
        .create_crew(&host, crew_body(&region_id, BASE_LAT + 0.05, 5))
        .await;

    let nearby = |radius: f64| {
        let client = fixture.client();
        let url = fixture.url(&format!(
            "/crews/nearby?latitude={}&longitude={}&radiusKm={}",
            BASE_LAT, BASE_LNG, radius
        ));
        async move { client.get(url).send().await.unwrap() }
    };

    let resp = nearby(2.0).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let hits = body["data"].as_array().unwrap();
    let ids: Vec<_> = hits.iter().map(|c| c["crewId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![near.as_str(), mid.as_str()]);
    assert!(hits[0]["distanceKm"].as_f64().unwrap() < hits[1]["distanceKm"].as_f64().unwrap());
    assert_eq!(hits[0]["regionDistrict"], "중구");

    let body: Value = nearby(0.3).await.json().await.unwrap();
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["crewId"], near.as_str());

    let resp = nearby(0.0).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "INVALID_INPUT_VALUE");

    let resp = nearby(11.0).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = fixture
        .client()
        .get(fixture.url("/crews/nearby?latitude=37.5"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "INVALID_INPUT_VALUE");
}

#[tokio::test]
async fn test_list_crews_with_filters_and_paging() {
    let fixture = TestFixture::new().await;
    let jung = fixture.region_id("중구").await;
    let gangnam = fixture.region_id("강남구").await;
    let (host, _) = fixture.logged_in("host@example.com", "Host").await;

    for day in 1..=3 {
        let mut body = crew_body(&jung, BASE_LAT, 5);
        body["meetingTime"] = json!(format!("2030-05-0{}T07:00:00", day));
        body["level"] = json!("INTERMEDIATE");
        fixture.create_crew(&host, body).await;
    }
    fixture
        .create_crew(&host, crew_body(&jung, BASE_LAT, 5))
        .await;
    fixture
        .create_crew(&host, crew_body(&gangnam, BASE_LAT, 5))
        .await;

    let client = fixture.client();
    let resp = client
        .get(fixture.url(&format!(
            "/crews?regionId={}&level=INTERMEDIATE&dateFilter=UPCOMING&page=0&size=2",
            jung
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let page = &body["data"];
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["hasNext"], true);
    let times: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["meetingTime"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["2030-05-01T07:00:00", "2030-05-02T07:00:00"]);

    let body: Value = client
        .get(fixture.url("/crews"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["totalElements"], 5);

    let resp = client
        .get(fixture.url("/crews?size=500"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(fixture.url("/crews?level=ELITE"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "INVALID_INPUT_VALUE");
}
