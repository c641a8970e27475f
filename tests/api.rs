use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use todo_be::gateway::{InMemoryGateway, TaskGateway};
use todo_be::models::auth::Claims;
use todo_be::{handlers, AppConfig, AppState};

const SECRET: &str = "integration-secret";

fn config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap()
}

fn bearer(user_id: &str) -> (&'static str, String) {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: None,
        aud: None,
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

macro_rules! app {
    ($gateway:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($gateway)))
                .app_data(web::Data::new(config()))
                .configure(handlers::configure),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

fn labels(view: &Value) -> Vec<String> {
    view["data"]["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|group| group["label"].as_str().unwrap_or("").to_string())
        .collect()
}

#[actix_web::test]
async fn requests_without_a_token_are_rejected() {
    let app = app!(Arc::new(InMemoryGateway::new()));

    let (status, body) = send!(app, test::TestRequest::get().uri("/api/todos"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Authentication required");

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/view")
            .insert_header(("Authorization", "Bearer not-a-token"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn created_todos_show_up_grouped_by_priority() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    let (status, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "  Water plants ", "priority": 1 }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["title"], "Water plants");
    assert!(!created["data"]["id"].as_str().unwrap().starts_with("pending-"));

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "File taxes", "priority": 4 }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, view) = send!(
        app,
        test::TestRequest::patch()
            .uri("/api/view/group")
            .insert_header(auth.clone())
            .set_json(json!({ "field": "priority" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(labels(&view), vec!["Urgent", "Low"]);
    assert_eq!(view["data"]["total"], 2);
    assert_eq!(view["data"]["groups"][0]["tasks"][0]["title"], "File taxes");
    assert_eq!(view["data"]["pending"], json!([]));

    let (_, listed) = send!(app, test::TestRequest::get().uri("/api/todos").insert_header(auth));
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn filters_apply_until_they_are_cleared() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    let mut ids = Vec::new();
    for title in ["Buy milk", "Call mom"] {
        let (_, created) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/todos")
                .insert_header(auth.clone())
                .set_json(json!({ "title": title }))
        );
        ids.push(created["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, toggled) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/todos/{}/toggle", ids[0]))
            .insert_header(auth.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["data"]["completed"], true);
    assert!(toggled["data"]["completed_at"].is_string());

    let (_, view) = send!(
        app,
        test::TestRequest::patch()
            .uri("/api/view/filters")
            .insert_header(auth.clone())
            .set_json(json!({ "status": "pending", "search": "CALL" }))
    );
    assert_eq!(view["data"]["total"], 1);
    assert_eq!(view["data"]["groups"][0]["tasks"][0]["title"], "Call mom");
    assert_eq!(view["data"]["settings"]["filters"]["status"], "pending");

    let (_, view) = send!(app, test::TestRequest::delete().uri("/api/view/filters").insert_header(auth.clone()));
    assert_eq!(view["data"]["total"], 2);
    assert_eq!(view["data"]["settings"]["filters"]["search"], "");

    let (_, settings) = send!(app, test::TestRequest::get().uri("/api/view/settings").insert_header(auth));
    assert_eq!(settings["data"]["sort"], json!({ "field": "created_at", "direction": "desc" }));
    assert_eq!(settings["data"]["group"]["field"], "none");
}

#[actix_web::test]
async fn failed_writes_leave_the_session_unchanged() {
    let gateway = Arc::new(InMemoryGateway::new());
    let app = app!(gateway.clone());
    let auth = bearer("user-1");

    let (_, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Original" }))
    );
    let id = created["data"]["id"].as_str().unwrap().to_string();

    gateway.fail_writes(true);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Changed" }))
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database operation failed");

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(auth.clone())
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Never stored" }))
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, view) = send!(app, test::TestRequest::get().uri("/api/view").insert_header(auth));
    assert_eq!(view["data"]["total"], 1);
    assert_eq!(view["data"]["groups"][0]["tasks"][0]["title"], "Original");
    assert_eq!(view["data"]["pending"], json!([]));
}

#[actix_web::test]
async fn invalid_payloads_are_rejected() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    for payload in [
        json!({ "title": "   " }),
        json!({ "title": "Stretch", "due_time": "25:99" }),
        json!({ "title": "Stretch", "priority": 9 }),
    ] {
        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/todos")
                .insert_header(auth.clone())
                .set_json(payload)
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos/reorder")
            .insert_header(auth)
            .set_json(json!({ "from_index": 0, "to_index": 3 }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn end_date_before_the_stored_start_is_rejected() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    let (_, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Conference", "start_date": "2026-10-05T00:00:00Z" }))
    );
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(auth.clone())
            .set_json(json!({ "end_date": "2026-10-01T00:00:00Z" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "end_date must not be before start_date");

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(auth.clone())
            .set_json(json!({ "end_date": "2026-10-07T00:00:00Z" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["end_date"].as_str().unwrap().starts_with("2026-10-07"));

    let (_, view) = send!(app, test::TestRequest::get().uri("/api/view").insert_header(auth));
    assert_eq!(view["data"]["pending"], json!([]));
}

#[actix_web::test]
async fn todos_are_private_to_their_owner() {
    let app = app!(Arc::new(InMemoryGateway::new()));

    let (_, created) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(bearer("alice"))
            .set_json(json!({ "title": "Secret plan" }))
    );
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(bearer("bob"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, view) = send!(app, test::TestRequest::get().uri("/api/view").insert_header(bearer("bob")));
    assert_eq!(view["data"]["total"], 0);
}

#[actix_web::test]
async fn reorder_moves_one_todo_and_renumbers() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    for title in ["First", "Second", "Third"] {
        send!(
            app,
            test::TestRequest::post()
                .uri("/api/todos")
                .insert_header(auth.clone())
                .set_json(json!({ "title": title }))
        );
    }

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos/reorder")
            .insert_header(auth.clone())
            .set_json(json!({ "from_index": 0, "to_index": 2 }))
    );
    assert_eq!(status, StatusCode::OK);
    let order: Vec<(String, i64)> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| (t["title"].as_str().unwrap().to_string(), t["position"].as_i64().unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Second".to_string(), 0),
            ("Third".to_string(), 1),
            ("First".to_string(), 2)
        ]
    );

    // The store agrees once the session is refreshed.
    let (_, listed) = send!(app, test::TestRequest::get().uri("/api/todos").insert_header(auth));
    assert_eq!(listed["data"][0]["title"], "Second");
}

#[actix_web::test]
async fn deleting_a_project_clears_it_from_todos() {
    let gateway = Arc::new(InMemoryGateway::new());
    let app = app!(gateway.clone());
    let auth = bearer("user-1");

    let (status, project) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/projects")
            .insert_header(auth.clone())
            .set_json(json!({ "name": "Garden", "color": "#22c55e", "allowed_assignees": ["Anna"] }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let project_id = project["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/projects")
            .insert_header(auth.clone())
            .set_json(json!({ "name": "Garden", "color": "#000000" }))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, todo) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Plant tulips", "project": "Garden" }))
    );
    let todo_id = todo["data"]["id"].as_str().unwrap().to_string();

    let (_, view) = send!(
        app,
        test::TestRequest::patch()
            .uri("/api/view/group")
            .insert_header(auth.clone())
            .set_json(json!({ "field": "project" }))
    );
    assert_eq!(labels(&view), vec!["Garden"]);

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/projects/{}", project_id))
            .insert_header(auth.clone())
    );
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send!(app, test::TestRequest::get().uri("/api/view").insert_header(auth.clone()));
    assert_eq!(labels(&view), vec!["No project"]);
    assert_eq!(view["data"]["total"], 1);

    let stored = gateway.get_task("user-1", &todo_id).await.unwrap();
    assert_eq!(stored.project, None);
}

#[actix_web::test]
async fn renaming_an_area_follows_through_to_the_view() {
    let app = app!(Arc::new(InMemoryGateway::new()));
    let auth = bearer("user-1");

    let (_, area) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/areas")
            .insert_header(auth.clone())
            .set_json(json!({ "name": "Home", "color": "#f97316" }))
    );
    let area_id = area["data"]["id"].as_str().unwrap().to_string();

    send!(
        app,
        test::TestRequest::post()
            .uri("/api/todos")
            .insert_header(auth.clone())
            .set_json(json!({ "title": "Fix sink", "area": "Home" }))
    );

    let (status, renamed) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/areas/{}", area_id))
            .insert_header(auth.clone())
            .set_json(json!({ "name": "House" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["data"]["name"], "House");

    let (_, view) = send!(
        app,
        test::TestRequest::patch()
            .uri("/api/view/group")
            .insert_header(auth)
            .set_json(json!({ "field": "area" }))
    );
    assert_eq!(labels(&view), vec!["House"]);
}

#[actix_web::test]
async fn health_reports_store_counts() {
    let gateway = Arc::new(InMemoryGateway::new());
    let app = app!(gateway.clone());

    send!(
        app,
        test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer("user-1"))
            .set_json(json!({ "name": "Errands", "color": "#3b82f6" }))
    );

    let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["stats"]["categories"], 1);
    assert_eq!(body["data"]["stats"]["todos"], 0);
}
