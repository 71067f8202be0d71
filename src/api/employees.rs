//! Employee administration, restricted to the main administrator.
//!
//! Adding an employee creates two rows in one transaction: the login user
//! (role `employee`) and the employee record referencing it.

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::products::store_upload;
use crate::api::Reply;
use crate::auth::{self, MainAdmin};
use crate::error::ApiError;
use crate::models::{Employee, EmployeeView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_employee))
        .route("/", get(list_employees))
        .route("/:id", get(get_employee).put(update_employee))
}

const EMPLOYEE_COLUMNS: &str =
    "e.id, e.employee_id, u.name, u.email, d.name AS department, e.designation, \
     e.dob, e.gender, e.marital_status, e.salary, e.profile_image, e.created_at";

#[derive(Default)]
struct EmployeeForm {
    name: Option<String>,
    email: Option<String>,
    employee_id: Option<String>,
    password: Option<String>,
    dob: Option<NaiveDate>,
    gender: Option<String>,
    marital_status: Option<String>,
    designation: Option<String>,
    department_id: Option<Uuid>,
    salary: Option<i64>,
    profile_image: Option<String>,
}

async fn add_employee(
    State(state): State<AppState>,
    _admin: MainAdmin,
    mut multipart: Multipart,
) -> Result<Json<Reply<()>>, ApiError> {
    let mut form = EmployeeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => form.name = Some(read_text(field).await?),
            "email" => form.email = Some(read_text(field).await?.to_lowercase()),
            "employee_id" => form.employee_id = Some(read_text(field).await?),
            "password" => form.password = Some(read_text(field).await?),
            "dob" => {
                let raw = read_text(field).await?;
                form.dob = Some(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .map_err(|_| ApiError::bad_request("Invalid date of birth"))?,
                );
            }
            "gender" => form.gender = Some(read_text(field).await?),
            "marital_status" => form.marital_status = Some(read_text(field).await?),
            "designation" => form.designation = Some(read_text(field).await?),
            "department_id" => {
                let raw = read_text(field).await?;
                form.department_id = Some(
                    Uuid::parse_str(&raw)
                        .map_err(|_| ApiError::bad_request("Invalid department id"))?,
                );
            }
            "salary" => {
                let raw = read_text(field).await?;
                form.salary = Some(
                    raw.parse()
                        .map_err(|_| ApiError::bad_request("Invalid salary"))?,
                );
            }
            "profile_image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
                if !data.is_empty() {
                    form.profile_image = Some(store_upload(&state, &file_name, &data).await?);
                }
            }
            _ => {}
        }
    }

    let (Some(name), Some(email), Some(employee_id), Some(password)) = (
        form.name,
        form.email,
        form.employee_id,
        form.password,
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    let Some(department_id) = form.department_id else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(ApiError::Conflict("User already registered".into()));
    }

    let password_hash = auth::hash_password(&password)?;
    let mut tx = state.db.begin().await?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash, role, profile_image) \
         VALUES ($1, $2, $3, 'employee', $4) RETURNING id",
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(&form.profile_image)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO employees (user_id, employee_id, dob, gender, marital_status, designation, \
         department_id, salary, profile_image) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user_id)
    .bind(&employee_id)
    .bind(form.dob)
    .bind(&form.gender)
    .bind(&form.marital_status)
    .bind(&form.designation)
    .bind(department_id)
    .bind(form.salary.unwrap_or(0))
    .bind(&form.profile_image)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Reply::message("Employee created successfully"))
}

async fn list_employees(
    State(state): State<AppState>,
    _admin: MainAdmin,
) -> Result<Json<Reply<Vec<EmployeeView>>>, ApiError> {
    let employees: Vec<EmployeeView> = sqlx::query_as(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees e \
         JOIN users u ON u.id = e.user_id \
         JOIN departments d ON d.id = e.department_id \
         ORDER BY e.created_at DESC"
    ))
    .fetch_all(&state.db)
    .await?;
    Ok(Reply::data(employees))
}

/// Looks up by employee row id first, then by the linked user id so the
/// employee dashboard can resolve itself from a login token.
async fn get_employee(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<EmployeeView>>, ApiError> {
    let employee: EmployeeView = sqlx::query_as(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees e \
         JOIN users u ON u.id = e.user_id \
         JOIN departments d ON d.id = e.department_id \
         WHERE e.id = $1 OR e.user_id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(Reply::data(employee))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub salary: Option<i64>,
}

async fn update_employee(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let employee: Employee = sqlx::query_as("SELECT * FROM employees WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    let mut tx = state.db.begin().await?;

    if let Some(name) = &req.name {
        sqlx::query("UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(employee.user_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        "UPDATE employees SET marital_status = COALESCE($2, marital_status), \
         designation = COALESCE($3, designation), department_id = COALESCE($4, department_id), \
         salary = COALESCE($5, salary), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(&req.marital_status)
    .bind(&req.designation)
    .bind(req.department_id)
    .bind(req.salary)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Reply::message("Employee updated successfully"))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart field: {e}")))
}
