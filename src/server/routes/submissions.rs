use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    db::{
        queries::{questions, submissions},
        Submission, SubmissionStatus,
    },
    quiz::{
        feedback::{FeedbackDraft, FeedbackError, FEEDBACK_REQUIRED},
        grading::{self, GradingError},
        Answer, QuestionKind,
    },
    server::{
        app::AppState,
        error::{ApiError, ErrorBody},
        extractors::{CurrentUser, ValidJson, Validate},
    },
    telemetry::SUBMISSIONS,
};

use super::{ensure_category_visible, is_public, ApiResponse};

#[derive(Deserialize, ToSchema)]
pub struct NewSubmission {
    /// When set, every visible question of the category is part of the quiz.
    category_id: Option<i64>,
    answers: Vec<Answer>,
}

#[derive(Deserialize, ToSchema)]
pub struct FeedbackBody {
    feedback: String,
}

impl Validate for NewSubmission {
    fn validate(&self) -> Result<(), ApiError> {
        if self.answers.is_empty() {
            return Err(GradingError::NoAnswers.into());
        }
        Ok(())
    }
}

impl Validate for FeedbackBody {
    // blank text is reported by FeedbackDraft
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Builds the answer key a submission is marked against.
async fn answer_key(
    pool: &SqlitePool,
    submission: &NewSubmission,
) -> ApiResponse<HashMap<i64, QuestionKind>> {
    if let Some(category_id) = submission.category_id {
        return Ok(questions::get_questions_for_category(pool, category_id, false)
            .await?
            .into_iter()
            .map(|q| (q.id, q.kind))
            .collect());
    }
    let mut key = HashMap::with_capacity(submission.answers.len());
    for answer in &submission.answers {
        let unknown = GradingError::UnknownQuestion(answer.question_id);
        let q = match questions::get_question_by_id(pool, answer.question_id).await {
            Ok(q) => q,
            Err(sqlx::Error::RowNotFound) => return Err(unknown.into()),
            Err(e) => return Err(e.into()),
        };
        if !is_public(pool, &q).await? {
            return Err(unknown.into());
        }
        key.insert(q.id, q.kind);
    }
    Ok(key)
}

fn ensure_can_view(user: &CurrentUser, submission: &Submission) -> Result<(), ApiError> {
    if submission.user_id == user.user.id || user.is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[utoipa::path(
    post,
    path = "/submissions",
    tag = "submissions",
    request_body = NewSubmission,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Submission stored and auto-marked", body = Submission),
        (status = 400, description = "Unknown or repeated question", body = ErrorBody)
    )
)]
pub async fn create_submission(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    ValidJson(submission): ValidJson<NewSubmission>,
) -> ApiResponse<(StatusCode, Json<Submission>)> {
    if let Some(category_id) = submission.category_id {
        ensure_category_visible(&pool, category_id, user.is_staff()).await?;
    }
    let key = answer_key(&pool, &submission).await?;
    let score = grading::grade(&key, &submission.answers)?;
    let id = submissions::create_submission(
        &pool,
        user.user.id,
        submission.category_id,
        &submission.answers,
        score.correct,
        score.total,
    )
    .await?;
    SUBMISSIONS
        .with_label_values(&[SubmissionStatus::Pending.as_str()])
        .inc();
    tracing::info!(
        id,
        user_id = user.user.id,
        correct = score.correct,
        total = score.total,
        "Stored submission"
    );
    Ok((
        StatusCode::CREATED,
        Json(submissions::get_submission(&pool, id).await?),
    ))
}

#[utoipa::path(
    get,
    path = "/submissions",
    tag = "submissions",
    security(("bearer" = [])),
    responses((status = 200, description = "Own submissions; every submission for staff", body = [Submission]))
)]
pub async fn get_submissions(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
) -> ApiResponse<Json<Vec<Submission>>> {
    let owner = if user.is_staff() {
        None
    } else {
        Some(user.user.id)
    };
    Ok(Json(submissions::list_submissions(&pool, owner).await?))
}

#[utoipa::path(
    get,
    path = "/submissions/{id}",
    tag = "submissions",
    params(("id" = i64, Path, description = "Submission id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The submission", body = Submission),
        (status = 403, description = "Someone else's submission", body = ErrorBody),
        (status = 404, description = "No such submission", body = ErrorBody)
    )
)]
pub async fn submission(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResponse<Json<Submission>> {
    let submission = submissions::get_submission(&pool, id).await?;
    ensure_can_view(&user, &submission)?;
    Ok(Json(submission))
}

#[utoipa::path(
    put,
    path = "/submissions/{id}/feedback",
    tag = "submissions",
    params(("id" = i64, Path, description = "Submission id")),
    request_body = FeedbackBody,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Feedback saved, submission graded", body = Submission),
        (status = 400, description = "Feedback is blank", body = ErrorBody),
        (status = 404, description = "No such submission", body = ErrorBody)
    )
)]
pub async fn save_feedback(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<FeedbackBody>,
) -> ApiResponse<Json<Submission>> {
    user.require_staff()?;
    submissions::get_submission(&pool, id).await?;

    let mut draft = FeedbackDraft::new(body.feedback);
    draft
        .submit(|text| {
            let pool = pool.clone();
            async move { submissions::save_feedback(&pool, id, &text).await }
        })
        .await
        .map_err(|e| match e {
            FeedbackError::Empty => ApiError::Validation(FEEDBACK_REQUIRED.into()),
            FeedbackError::Save(e) => e.into(),
        })?;

    SUBMISSIONS
        .with_label_values(&[SubmissionStatus::Graded.as_str()])
        .inc();
    tracing::info!(id, grader = user.user.id, "Saved feedback");
    Ok(Json(submissions::get_submission(&pool, id).await?))
}

pub fn submissions_router(state: AppState) -> Router {
    Router::new()
        .route("/submissions", get(get_submissions).post(create_submission))
        .route("/submissions/{id}", get(submission))
        .route("/submissions/{id}/feedback", put(save_feedback))
        .with_state(state)
}
