//! Department management, restricted to the main administrator.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Reply;
use crate::auth::MainAdmin;
use crate::error::ApiError;
use crate::models::Department;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departments))
        .route("/add", post(add_department))
        .route(
            "/:id",
            get(single_department)
                .put(update_department)
                .delete(remove_department),
        )
}

async fn list_departments(
    State(state): State<AppState>,
    _admin: MainAdmin,
) -> Result<Json<Reply<Vec<Department>>>, ApiError> {
    let departments: Vec<Department> =
        sqlx::query_as("SELECT * FROM departments ORDER BY name")
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(departments))
}

#[derive(Debug, Deserialize)]
pub struct DepartmentPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

async fn add_department(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Json(req): Json<DepartmentPayload>,
) -> Result<Json<Reply<Department>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Department name is required"));
    }

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE name = $1)")
            .bind(&req.name)
            .fetch_one(&state.db)
            .await?;
    if exists {
        return Err(ApiError::Conflict("Department already exists".into()));
    }

    let department: Department = sqlx::query_as(
        "INSERT INTO departments (name, description) VALUES ($1, $2) RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&state.db)
    .await?;

    Ok(Reply::with("Department added", department))
}

async fn single_department(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<Department>>, ApiError> {
    let department: Department = sqlx::query_as("SELECT * FROM departments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Department not found"))?;
    Ok(Reply::data(department))
}

async fn update_department(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<DepartmentPayload>,
) -> Result<Json<Reply<Department>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Department name is required"));
    }

    let department: Department = sqlx::query_as(
        "UPDATE departments SET name = $2, description = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Department not found"))?;

    Ok(Reply::with("Department updated", department))
}

async fn remove_department(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<()>>, ApiError> {
    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Department not found"));
    }
    Ok(Reply::message("Department removed"))
}
