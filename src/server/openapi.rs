use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::routes::{auth, categories, health, questions, submissions, users};

#[derive(OpenApi)]
#[openapi(
    info(title = "Kuizzz API", description = "Quiz and exam management"),
    paths(
        health::healthz,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::change_password,
        categories::get_categories,
        categories::category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::reorder,
        questions::get_questions,
        questions::question,
        questions::create_question,
        questions::update_question,
        questions::delete_question,
        questions::add_option,
        questions::update_option,
        questions::remove_option,
        questions::set_correct_option,
        questions::move_option,
        users::get_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        submissions::create_submission,
        submissions::get_submissions,
        submissions::submission,
        submissions::save_feedback,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth", description = "Accounts and sessions"),
        (name = "categories", description = "Question groupings"),
        (name = "questions", description = "Quiz authoring"),
        (name = "users", description = "User administration"),
        (name = "submissions", description = "Quiz attempts and grading"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn docs_router() -> Router {
    Router::new()
        .route("/api", get(openapi_json))
        .route("/api/openapi.json", get(openapi_json))
}
