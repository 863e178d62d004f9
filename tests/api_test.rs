mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{spawn_app, spawn_app_with};
use kuizzz::db::Role;
use kuizzz::settings::Settings;
use serde_json::json;

#[tokio::test]
async fn healthz_returns_static_status() {
    let app = spawn_app().await;
    let (status, body) = app.get("/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn api_docs_list_routes() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Kuizzz API");
    assert!(body["paths"]["/healthz"].is_object());
    assert!(body["paths"]["/questions/{id}/options"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());

    let (status, same) = app.get("/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, same);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = spawn_app().await;
    app.get("/healthz", None).await;
    let (status, body) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("http_requests_total"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = spawn_app().await;
    let (status, _) = app.get("/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_login_me_logout() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "username": "sam",
                "display_name": "Sam",
                "email": "sam@example.com",
                "password": "correct horse"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["roles"], json!(["student"]));
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({"login": "sam", "password": "wrong password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({"login": "sam@example.com", "password": "correct horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "sam");

    let (status, _) = app
        .request(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = spawn_app().await;
    let user = json!({
        "username": "kim",
        "display_name": "Kim",
        "email": "kim@example.com",
        "password": "password123"
    });
    let (status, _) = app.post("/auth/register", None, user.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/auth/register", None, user).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({
                "username": "kim2",
                "display_name": "Kim",
                "email": "kim@example.com",
                "password": "password123"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_and_invalid_bodies_are_rejected() {
    let app = spawn_app().await;
    let (status, body) = app
        .post("/auth/register", None, json!({"username": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "username": "valid_name",
                "display_name": "V",
                "email": "not-an-email",
                "password": "password123"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn category_crud_requires_staff() {
    let app = spawn_app().await;
    let student = app.login_as("student", &[Role::Student]).await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let new = json!({"name": "Traffic Signs", "description": "Signs", "color": "#EF4444"});

    let (status, _) = app.post("/categories", None, new.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/categories", Some(&student), new.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app.post("/categories", Some(&teacher), new).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["question_count"], 0);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/categories",
            Some(&teacher),
            json!({"name": "Bad", "color": "red"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .put(
            &format!("/categories/{id}"),
            Some(&teacher),
            json!({"name": "Road Signs"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Road Signs");
    assert_eq!(updated["color"], "#EF4444");

    let (status, list) = app.get("/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/categories/{id}"), Some(&teacher)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/categories/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hidden_categories_only_for_staff_and_reorder() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let (_, a) = app
        .post("/categories", Some(&teacher), json!({"name": "A"}))
        .await;
    let (_, b) = app
        .post(
            "/categories",
            Some(&teacher),
            json!({"name": "B", "hidden": true}),
        )
        .await;

    let (_, public) = app.get("/categories", None).await;
    assert_eq!(public.as_array().unwrap().len(), 1);
    let (_, staff) = app.get("/categories", Some(&teacher)).await;
    assert_eq!(staff.as_array().unwrap().len(), 2);

    let (status, ordered) = app
        .post(
            "/categories/order",
            Some(&teacher),
            json!({"ids": [b["id"], a["id"]]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ordered[0]["name"], "B");
    assert_eq!(ordered[1]["name"], "A");
}

async fn create_multiple_choice(app: &common::TestApp, token: &str, category: Option<i64>) -> i64 {
    let (status, q) = app
        .post(
            "/questions",
            Some(token),
            json!({
                "category_id": category,
                "prompt": "What does a red octagon mean?",
                "kind": {
                    "type": "multiple_choice",
                    "options": ["Stop", "Yield", "No entry"],
                    "correct_index": 0
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{q}");
    q["id"].as_i64().unwrap()
}

#[tokio::test]
async fn questions_hide_answers_from_students() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let student = app.login_as("student", &[Role::Student]).await;
    let id = create_multiple_choice(&app, &teacher, None).await;

    let (status, _) = app.get("/questions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, full) = app.get(&format!("/questions/{id}"), Some(&teacher)).await;
    assert_eq!(full["kind"]["correct_index"], 0);

    let (status, prompt) = app.get(&format!("/questions/{id}"), Some(&student)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prompt["kind"]["type"], "multiple_choice");
    assert_eq!(prompt["kind"]["options"], json!(["Stop", "Yield", "No entry"]));
    assert!(prompt["kind"].get("correct_index").is_none());

    let (_, list) = app.get("/questions", Some(&student)).await;
    assert!(list[0]["kind"].get("correct_index").is_none());
}

#[tokio::test]
async fn question_option_bounds_are_enforced_on_create() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    for options in [json!(["Only"]), json!(["1", "2", "3", "4", "5", "6", "7"])] {
        let (status, _) = app
            .post(
                "/questions",
                Some(&teacher),
                json!({
                    "prompt": "Pick",
                    "kind": {"type": "multiple_choice", "options": options, "correct_index": 0}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn option_editor_keeps_invariants() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let id = create_multiple_choice(&app, &teacher, None).await;
    let options_uri = format!("/questions/{id}/options");

    let (status, q) = app
        .put(&format!("{options_uri}/2/correct"), Some(&teacher), json!(null))
        .await;
    assert_eq!(status, StatusCode::OK, "{q}");
    assert_eq!(q["kind"]["correct_index"], 2);

    // removing an earlier option keeps "No entry" as the answer
    let (status, q) = app.delete(&format!("{options_uri}/0"), Some(&teacher)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(q["kind"]["options"], json!(["Yield", "No entry"]));
    assert_eq!(q["kind"]["correct_index"], 1);

    let (status, body) = app.delete(&format!("{options_uri}/0"), Some(&teacher)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    for n in 0..4 {
        let (status, _) = app
            .post(&options_uri, Some(&teacher), json!({"text": format!("Extra {n}")}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app
        .post(&options_uri, Some(&teacher), json!({"text": "Seventh"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, q) = app
        .post(
            &format!("{options_uri}/move"),
            Some(&teacher),
            json!({"from": 1, "to": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(q["kind"]["options"][5], "No entry");
    assert_eq!(q["kind"]["correct_index"], 5);

    let (status, q) = app
        .put(
            &format!("{options_uri}/0"),
            Some(&teacher),
            json!({"text": "Give way"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(q["kind"]["options"][0], "Give way");

    let (_, stored) = app.get(&format!("/questions/{id}"), Some(&teacher)).await;
    assert_eq!(stored["kind"], q["kind"]);
}

#[tokio::test]
async fn option_editor_rejects_fill_in_blank() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let (_, q) = app
        .post(
            "/questions",
            Some(&teacher),
            json!({
                "prompt": "The speed limit in town is __ km/h",
                "kind": {"type": "fill_in_blank", "correct_text": "50"}
            }),
        )
        .await;
    let (status, _) = app
        .post(
            &format!("/questions/{}/options", q["id"]),
            Some(&teacher),
            json!({"text": "60"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn question_count_follows_questions() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let (_, category) = app
        .post("/categories", Some(&teacher), json!({"name": "Signs"}))
        .await;
    let category_id = category["id"].as_i64().unwrap();
    create_multiple_choice(&app, &teacher, Some(category_id)).await;
    create_multiple_choice(&app, &teacher, Some(category_id)).await;

    let (_, category) = app.get(&format!("/categories/{category_id}"), None).await;
    assert_eq!(category["question_count"], 2);

    let (_, filtered) = app
        .get(&format!("/questions?category_id={category_id}"), Some(&teacher))
        .await;
    assert_eq!(filtered.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_are_admin_only() {
    let app = spawn_app().await;
    let admin = app.login_as("admin", &[Role::Admin]).await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;

    let (status, _) = app.get("/users", Some(&teacher)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .post(
            "/users",
            Some(&admin),
            json!({
                "username": "newbie",
                "display_name": "New Teacher",
                "email": "newbie@example.com",
                "password": "password123",
                "roles": ["teacher", "student"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["roles"], json!(["teacher", "student"]));
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/users",
            Some(&admin),
            json!({
                "username": "newbie",
                "display_name": "Again",
                "email": "other@example.com",
                "roles": ["student"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = app
        .put(
            &format!("/users/{id}"),
            Some(&admin),
            json!({
                "username": "newbie",
                "display_name": "Renamed",
                "email": "newbie@example.com",
                "roles": ["student"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["display_name"], "Renamed");
    assert_eq!(updated["roles"], json!(["student"]));

    let (_, list) = app.get("/users", Some(&admin)).await;
    assert_eq!(list.as_array().unwrap().len(), 3);

    let (status, _) = app.delete(&format!("/users/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/users/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submission_is_marked_and_graded_with_feedback() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let student = app.login_as("student", &[Role::Student]).await;
    let other = app.login_as("other", &[Role::Student]).await;
    let (_, category) = app
        .post("/categories", Some(&teacher), json!({"name": "Signs"}))
        .await;
    let category_id = category["id"].as_i64().unwrap();
    let mc = create_multiple_choice(&app, &teacher, Some(category_id)).await;
    let (_, blank) = app
        .post(
            "/questions",
            Some(&teacher),
            json!({
                "category_id": category_id,
                "prompt": "A triangle sign means __",
                "kind": {"type": "fill_in_blank", "correct_text": "Warning"}
            }),
        )
        .await;

    let (status, submission) = app
        .post(
            "/submissions",
            Some(&student),
            json!({
                "category_id": category_id,
                "answers": [
                    {"question_id": mc, "answer": 0},
                    {"question_id": blank["id"], "answer": " warning "}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{submission}");
    assert_eq!(submission["score"], 2);
    assert_eq!(submission["total"], 2);
    assert_eq!(submission["status"], "pending");
    let id = submission["id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/submissions/{id}"), Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, own) = app.get("/submissions", Some(&other)).await;
    assert!(own.as_array().unwrap().is_empty());

    let feedback_uri = format!("/submissions/{id}/feedback");
    let (status, _) = app
        .put(&feedback_uri, Some(&student), json!({"feedback": "Great"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&feedback_uri, Some(&teacher), json!({"feedback": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter feedback before saving");
    let (_, unchanged) = app.get(&format!("/submissions/{id}"), Some(&teacher)).await;
    assert_eq!(unchanged["status"], "pending");
    assert!(unchanged["feedback"].is_null());

    let (status, graded) = app
        .put(&feedback_uri, Some(&teacher), json!({"feedback": " Perfect score "}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["status"], "graded");
    assert_eq!(graded["feedback"], "Perfect score");
    assert!(graded["graded_at"].is_string());

    let (_, mine) = app.get("/submissions", Some(&student)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn submission_with_unknown_question_is_rejected() {
    let app = spawn_app().await;
    let student = app.login_as("student", &[Role::Student]).await;
    let (status, body) = app
        .post(
            "/submissions",
            Some(&student),
            json!({"answers": [{"question_id": 999, "answer": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .post("/submissions", Some(&student), json!({"answers": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_for_missing_submission_is_404() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let (status, _) = app
        .put(
            "/submissions/42/feedback",
            Some(&teacher),
            json!({"feedback": "Nice"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hidden_category_content_is_404_for_students() {
    let app = spawn_app().await;
    let teacher = app.login_as("teacher", &[Role::Teacher]).await;
    let student = app.login_as("student", &[Role::Student]).await;
    let (_, category) = app
        .post(
            "/categories",
            Some(&teacher),
            json!({"name": "Drafts", "hidden": true}),
        )
        .await;
    let category_id = category["id"].as_i64().unwrap();
    let question = create_multiple_choice(&app, &teacher, Some(category_id)).await;

    let (status, _) = app
        .get(&format!("/questions?category_id={category_id}"), Some(&student))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/questions/{question}"), Some(&student))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = app.get("/questions", Some(&student)).await;
    assert!(all.as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            "/submissions",
            Some(&student),
            json!({
                "category_id": category_id,
                "answers": [{"question_id": question, "answer": 0}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app
        .post(
            "/submissions",
            Some(&student),
            json!({"answers": [{"question_id": question, "answer": 0}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, staff_view) = app
        .get(&format!("/questions?category_id={category_id}"), Some(&teacher))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(staff_view.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stale_token_is_anonymous_on_public_routes() {
    let app = spawn_app().await;
    let (status, body) = app.get("/categories", Some("bogus")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());

    let (status, _) = app.get("/auth/me", Some("bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_requires_current_and_ends_other_sessions() {
    let app = spawn_app().await;
    let token = app.login_as("pat", &[Role::Student]).await;
    let (_, other) = app
        .post(
            "/auth/login",
            None,
            json!({"login": "pat", "password": "password123"}),
        )
        .await;
    let other = other["token"].as_str().unwrap().to_owned();

    let (status, _) = app
        .put(
            "/auth/password",
            Some(&token),
            json!({"current_password": "not-it-at-all", "new_password": "brand new pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .put(
            "/auth/password",
            Some(&token),
            json!({"current_password": "password123", "new_password": "brand new pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/auth/me", Some(&other)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({"login": "pat", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({"login": "pat", "password": "brand new pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/categories")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let app = spawn_app().await;
    let response = app.send(preflight("https://quiz.example")).await;
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn cors_honours_configured_origins() {
    let mut settings = Settings::defaults().unwrap();
    settings.server.cors_origins = vec!["https://quiz.example".into()];
    let app = spawn_app_with(settings).await;

    let response = app.send(preflight("https://quiz.example")).await;
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://quiz.example"
    );

    let response = app.send(preflight("https://elsewhere.example")).await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
