use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    db::{queries::categories, Category, Reorder},
    server::{
        app::AppState,
        error::{ApiError, ErrorBody},
        extractors::{CurrentUser, MaybeUser, ValidJson, Validate},
    },
};

use super::{require_text, validate_color, ApiResponse};

pub const DEFAULT_COLOR: &str = "#6366F1";

#[derive(Deserialize, ToSchema)]
pub struct NewCategory {
    name: String,
    description: Option<String>,
    /// `#RRGGBB`, defaults to indigo.
    color: Option<String>,
    hidden: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CategoryUpdate {
    name: String,
    description: Option<String>,
    color: Option<String>,
    hidden: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct OrderingBody {
    /// Category ids in their new display order.
    ids: Vec<i64>,
}

fn validate_fields(name: &str, description: Option<&str>, color: Option<&str>) -> Result<(), ApiError> {
    require_text("name", name, 100)?;
    if description.is_some_and(|d| d.chars().count() > 1000) {
        return Err(ApiError::Validation(
            "description must be at most 1000 characters".into(),
        ));
    }
    if let Some(color) = color {
        validate_color(color)?;
    }
    Ok(())
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), ApiError> {
        validate_fields(&self.name, self.description.as_deref(), self.color.as_deref())
    }
}

impl Validate for CategoryUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        validate_fields(&self.name, self.description.as_deref(), self.color.as_deref())
    }
}

impl Validate for OrderingBody {
    fn validate(&self) -> Result<(), ApiError> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.ids.len() {
            return Err(ApiError::Validation("ids must not repeat".into()));
        }
        Ok(())
    }
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses((status = 200, description = "Categories in display order", body = [Category]))
)]
pub async fn get_categories(
    State(pool): State<SqlitePool>,
    MaybeUser(user): MaybeUser,
) -> ApiResponse<Json<Vec<Category>>> {
    let include_hidden = user.is_some_and(|u| u.is_staff());
    Ok(Json(
        categories::get_all_categories(&pool, include_hidden).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "The category", body = Category),
        (status = 404, description = "No such category", body = ErrorBody)
    )
)]
pub async fn category(
    State(pool): State<SqlitePool>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> ApiResponse<Json<Category>> {
    let c = categories::get_category(&pool, id).await?;
    if c.hidden && !user.is_some_and(|u| u.is_staff()) {
        return Err(ApiError::NotFound);
    }
    Ok(Json(c))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    request_body = NewCategory,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created category", body = Category),
        (status = 400, description = "Invalid category", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody)
    )
)]
pub async fn create_category(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    ValidJson(new_category): ValidJson<NewCategory>,
) -> ApiResponse<(StatusCode, Json<Category>)> {
    user.require_staff()?;
    let id = categories::create_category(
        &pool,
        new_category.name.trim(),
        new_category.description.as_deref().unwrap_or(""),
        new_category.color.as_deref().unwrap_or(DEFAULT_COLOR),
        new_category.hidden.unwrap_or(false),
    )
    .await?;
    tracing::info!(id, user = user.user.id, "Created category");

    Ok((
        StatusCode::CREATED,
        Json(categories::get_category(&pool, id).await?),
    ))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryUpdate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated category", body = Category),
        (status = 404, description = "No such category", body = ErrorBody)
    )
)]
pub async fn update_category(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidJson(category): ValidJson<CategoryUpdate>,
) -> ApiResponse<Json<Category>> {
    user.require_staff()?;
    let current = categories::get_category(&pool, id).await?;
    categories::update_category(
        &pool,
        id,
        category.name.trim(),
        category.description.as_deref().unwrap_or(&current.description),
        category.color.as_deref().unwrap_or(&current.color),
        category.hidden.unwrap_or(current.hidden),
    )
    .await?;
    Ok(Json(categories::get_category(&pool, id).await?))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted; its questions become uncategorized"),
        (status = 404, description = "No such category", body = ErrorBody)
    )
)]
pub async fn delete_category(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResponse<StatusCode> {
    user.require_staff()?;
    categories::delete_category(&pool, id).await?;
    tracing::info!(id, user = user.user.id, "Deleted category");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/categories/order",
    tag = "categories",
    request_body = OrderingBody,
    security(("bearer" = [])),
    responses((status = 200, description = "Categories in their new order", body = [Category]))
)]
pub async fn reorder(
    State(pool): State<SqlitePool>,
    user: CurrentUser,
    ValidJson(body): ValidJson<OrderingBody>,
) -> ApiResponse<Json<Vec<Category>>> {
    user.require_staff()?;
    let ordering: Vec<Reorder> = body
        .ids
        .into_iter()
        .enumerate()
        .map(|(n, id)| Reorder {
            id,
            ordering: n as i64,
        })
        .collect();

    categories::reorder_categories(&pool, ordering).await?;

    Ok(Json(categories::get_all_categories(&pool, true).await?))
}

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(get_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(category).put(update_category).delete(delete_category),
        )
        .route("/categories/order", post(reorder))
        .with_state(state)
}
