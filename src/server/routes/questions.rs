use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    db::{queries::questions, Question},
    quiz::{
        options::{OptionError, OptionSet},
        PromptKind, QuestionKind,
    },
    server::{
        app::AppState,
        error::{ApiError, ErrorBody},
        extractors::{CurrentUser, ValidJson, Validate},
    },
};

use super::{ensure_category_visible, is_public, require_text, ApiResponse};

#[derive(Deserialize)]
pub struct QuestionsQuery {
    category_id: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct NewQuestion {
    category_id: Option<i64>,
    prompt: String,
    kind: QuestionKind,
    hidden: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct OptionText {
    text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct MoveOption {
    from: usize,
    to: usize,
}

/// A question without its answer key, as served to students.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionPrompt {
    pub id: i64,
    pub category_id: Option<i64>,
    pub prompt: String,
    pub kind: PromptKind,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum QuestionView {
    Full(Question),
    Prompt(QuestionPrompt),
}

impl QuestionView {
    fn for_user(question: Question, user: &CurrentUser) -> Self {
        if user.is_staff() {
            QuestionView::Full(question)
        } else {
            QuestionView::Prompt(QuestionPrompt {
                id: question.id,
                category_id: question.category_id,
                prompt: question.prompt,
                kind: question.kind.redacted(),
            })
        }
    }
}

impl Validate for NewQuestion {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("prompt", &self.prompt, 2000)?;
        if let QuestionKind::FillInBlank { correct_text } = &self.kind {
            require_text("correct_text", correct_text, 500)?;
        }
        Ok(())
    }
}

impl Validate for OptionText {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("text", &self.text, 500)
    }
}

impl Validate for MoveOption {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[utoipa::path(
    get,
    path = "/questions",
    tag = "questions",
    params(("category_id" = Option<i64>, Query, description = "Only questions of this category")),
    security(("bearer" = [])),
    responses((status = 200, description = "Questions; answer keys only for staff", body = [QuestionView]))
)]
pub async fn get_questions(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Query(QuestionsQuery { category_id }): Query<QuestionsQuery>,
) -> ApiResponse<Json<Vec<QuestionView>>> {
    let include_hidden = user.is_staff();
    let questions = match category_id {
        Some(id) => {
            ensure_category_visible(&pool, id, include_hidden).await?;
            questions::get_questions_for_category(&pool, id, include_hidden).await?
        }
        None => questions::get_all_questions(&pool, include_hidden).await?,
    };
    Ok(Json(
        questions
            .into_iter()
            .map(|q| QuestionView::for_user(q, &user))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The question", body = QuestionView),
        (status = 404, description = "No such question", body = ErrorBody)
    )
)]
pub async fn question(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResponse<Json<QuestionView>> {
    let q = questions::get_question_by_id(&pool, id).await?;
    if !user.is_staff() && !is_public(&pool, &q).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(QuestionView::for_user(q, &user)))
}

#[utoipa::path(
    post,
    path = "/questions",
    tag = "questions",
    request_body = NewQuestion,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created question", body = Question),
        (status = 400, description = "Invalid question", body = ErrorBody)
    )
)]
pub async fn create_question(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    ValidJson(form): ValidJson<NewQuestion>,
) -> ApiResponse<(StatusCode, Json<Question>)> {
    user.require_staff()?;
    let id = questions::create_question(
        &pool,
        form.category_id,
        form.prompt.trim(),
        &form.kind,
        form.hidden.unwrap_or(false),
    )
    .await?;
    tracing::info!(id, user = user.user.id, "Created question");

    Ok((
        StatusCode::CREATED,
        Json(questions::get_question_by_id(&pool, id).await?),
    ))
}

#[utoipa::path(
    put,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    request_body = NewQuestion,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 404, description = "No such question", body = ErrorBody)
    )
)]
pub async fn update_question(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidJson(form): ValidJson<NewQuestion>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    let current = questions::get_question_by_id(&pool, id).await?;
    questions::update_question(
        &pool,
        id,
        form.category_id,
        form.prompt.trim(),
        &form.kind,
        form.hidden.unwrap_or(current.hidden),
    )
    .await?;
    Ok(Json(questions::get_question_by_id(&pool, id).await?))
}

#[utoipa::path(
    delete,
    path = "/questions/{id}",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such question", body = ErrorBody)
    )
)]
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResponse<StatusCode> {
    user.require_staff()?;
    questions::delete_question(&pool, id).await?;
    tracing::info!(id, user = user.user.id, "Deleted question");
    Ok(StatusCode::NO_CONTENT)
}

/// Applies one option-editor operation to a stored multiple-choice question.
async fn edit_options<F>(pool: &SqlitePool, id: i64, edit: F) -> ApiResponse<Json<Question>>
where
    F: FnOnce(&mut OptionSet) -> Result<(), OptionError>,
{
    let mut question = questions::get_question_by_id(pool, id).await?;
    let options = question
        .kind
        .option_set_mut()
        .ok_or_else(|| ApiError::Validation("question is not multiple choice".into()))?;
    edit(options)?;
    questions::update_question_kind(pool, id, &question.kind).await?;
    Ok(Json(question))
}

#[utoipa::path(
    post,
    path = "/questions/{id}/options",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    request_body = OptionText,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Question with the option appended", body = Question),
        (status = 400, description = "Already six options, or not multiple choice", body = ErrorBody)
    )
)]
pub async fn add_option(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<OptionText>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    edit_options(&pool, id, |options| options.add(body.text)).await
}

#[utoipa::path(
    put,
    path = "/questions/{id}/options/{index}",
    tag = "questions",
    params(
        ("id" = i64, Path, description = "Question id"),
        ("index" = usize, Path, description = "Option position")
    ),
    request_body = OptionText,
    security(("bearer" = [])),
    responses((status = 200, description = "Question with the option rewritten", body = Question))
)]
pub async fn update_option(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path((id, index)): Path<(i64, usize)>,
    ValidJson(body): ValidJson<OptionText>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    edit_options(&pool, id, |options| options.update(index, body.text)).await
}

#[utoipa::path(
    delete,
    path = "/questions/{id}/options/{index}",
    tag = "questions",
    params(
        ("id" = i64, Path, description = "Question id"),
        ("index" = usize, Path, description = "Option position")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Question with the option removed", body = Question),
        (status = 400, description = "Only two options left", body = ErrorBody)
    )
)]
pub async fn remove_option(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path((id, index)): Path<(i64, usize)>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    edit_options(&pool, id, |options| options.remove(index).map(|_| ())).await
}

#[utoipa::path(
    put,
    path = "/questions/{id}/options/{index}/correct",
    tag = "questions",
    params(
        ("id" = i64, Path, description = "Question id"),
        ("index" = usize, Path, description = "Option position")
    ),
    security(("bearer" = [])),
    responses((status = 200, description = "Question with a new correct option", body = Question))
)]
pub async fn set_correct_option(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path((id, index)): Path<(i64, usize)>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    edit_options(&pool, id, |options| options.set_correct(index)).await
}

#[utoipa::path(
    post,
    path = "/questions/{id}/options/move",
    tag = "questions",
    params(("id" = i64, Path, description = "Question id")),
    request_body = MoveOption,
    security(("bearer" = [])),
    responses((status = 200, description = "Question with reordered options", body = Question))
)]
pub async fn move_option(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<MoveOption>,
) -> ApiResponse<Json<Question>> {
    user.require_staff()?;
    edit_options(&pool, id, |options| options.move_option(body.from, body.to)).await
}

pub fn questions_router(state: AppState) -> Router {
    Router::new()
        .route("/questions", get(get_questions).post(create_question))
        .route(
            "/questions/{id}",
            get(question).put(update_question).delete(delete_question),
        )
        .route("/questions/{id}/options", post(add_option))
        .route("/questions/{id}/options/move", post(move_option))
        .route(
            "/questions/{id}/options/{index}",
            put(update_option).delete(remove_option),
        )
        .route("/questions/{id}/options/{index}/correct", put(set_correct_option))
        .with_state(state)
}
