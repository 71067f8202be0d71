//! Product catalog management.

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Reply;
use crate::auth::StockAdmin;
use crate::error::ApiError;
use crate::models::Product;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_products))
        .route("/add", post(add_product))
        .route("/update", post(update_product))
        .route("/remove", post(remove_product))
        .route("/single", post(single_product))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<Product>>>, ApiError> {
    let products: Vec<Product> =
        sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(products))
}

const REQUIRED_FIELDS_MSG: &str =
    "Name, description, category, price, quantity, and sizes are required";

/// Multipart form: text fields plus up to four `image1..image4` files stored
/// under the uploads directory.
async fn add_product(
    State(state): State<AppState>,
    _admin: StockAdmin,
    mut multipart: Multipart,
) -> Result<Json<Reply<Product>>, ApiError> {
    let mut name = None;
    let mut description = None;
    let mut price_raw = None;
    let mut category = None;
    let mut sub_category = String::new();
    let mut sizes_raw = None;
    let mut bestseller = false;
    let mut quantity_raw = None;
    let mut images: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "price" => price_raw = Some(read_text(field).await?),
            "category" => category = Some(read_text(field).await?),
            "sub_category" => sub_category = read_text(field).await?,
            "sizes" => sizes_raw = Some(read_text(field).await?),
            "bestseller" => bestseller = read_text(field).await? == "true",
            "quantity" => quantity_raw = Some(read_text(field).await?),
            "image1" | "image2" | "image3" | "image4" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
                if !data.is_empty() {
                    images.push(store_upload(&state, &file_name, &data).await?);
                }
            }
            _ => {}
        }
    }

    let (name, description, category) = match (name, description, category) {
        (Some(n), Some(d), Some(c)) if !n.is_empty() && !d.is_empty() && !c.is_empty() => (n, d, c),
        _ => return Err(ApiError::bad_request(REQUIRED_FIELDS_MSG)),
    };
    let price = parse_price(price_raw.as_deref())?;
    let quantity = parse_quantity(quantity_raw.as_deref())?;
    let sizes = parse_sizes(sizes_raw.as_deref())?;
    if images.is_empty() {
        return Err(ApiError::bad_request(
            "At least one image is required to add the product",
        ));
    }

    let product: Product = sqlx::query_as(
        "INSERT INTO products (name, description, price, category, sub_category, sizes, images, bestseller, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(&name)
    .bind(&description)
    .bind(price)
    .bind(&category)
    .bind(&sub_category)
    .bind(serde_json::json!(sizes))
    .bind(serde_json::json!(images))
    .bind(bestseller)
    .bind(quantity)
    .fetch_one(&state.db)
    .await?;

    Ok(Reply::with("Product added", product))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    pub sizes: Vec<String>,
    #[serde(default)]
    pub bestseller: bool,
    pub quantity: i32,
}

async fn update_product(
    State(state): State<AppState>,
    _admin: StockAdmin,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Reply<Product>>, ApiError> {
    if req.name.is_empty() || req.description.is_empty() || req.category.is_empty() {
        return Err(ApiError::bad_request(REQUIRED_FIELDS_MSG));
    }
    if req.price <= 0 {
        return Err(ApiError::bad_request("Price must be a positive number"));
    }
    if req.quantity < 0 {
        return Err(ApiError::bad_request("Quantity must be a non-negative number"));
    }
    if req.sizes.is_empty() {
        return Err(ApiError::bad_request("Sizes must be a valid non-empty array"));
    }

    let product: Product = sqlx::query_as(
        "UPDATE products SET name = $2, description = $3, price = $4, category = $5, \
         sub_category = COALESCE($6, sub_category), sizes = $7, bestseller = $8, quantity = $9, \
         updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(req.id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.category)
    .bind(req.sub_category.as_deref())
    .bind(serde_json::json!(req.sizes))
    .bind(req.bestseller)
    .bind(req.quantity)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(Reply::with("Product updated", product))
}

#[derive(Debug, Deserialize)]
pub struct RemoveProductRequest {
    pub id: Uuid,
}

async fn remove_product(
    State(state): State<AppState>,
    _admin: StockAdmin,
    Json(req): Json<RemoveProductRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(req.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Product not found"));
    }
    Ok(Reply::message("Product removed"))
}

#[derive(Debug, Deserialize)]
pub struct SingleProductRequest {
    pub product_id: Uuid,
}

async fn single_product(
    State(state): State<AppState>,
    Json(req): Json<SingleProductRequest>,
) -> Result<Json<Reply<Product>>, ApiError> {
    let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(req.product_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Reply::data(product))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart field: {e}")))
}

fn parse_price(raw: Option<&str>) -> Result<i64, ApiError> {
    match raw.and_then(|v| v.parse::<i64>().ok()) {
        Some(price) if price > 0 => Ok(price),
        _ => Err(ApiError::bad_request("Price must be a positive number")),
    }
}

fn parse_quantity(raw: Option<&str>) -> Result<i32, ApiError> {
    match raw.and_then(|v| v.parse::<i32>().ok()) {
        Some(quantity) if quantity >= 0 => Ok(quantity),
        _ => Err(ApiError::bad_request("Quantity must be a non-negative number")),
    }
}

fn parse_sizes(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let sizes: Vec<String> = raw
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or_default();
    if sizes.is_empty() {
        return Err(ApiError::bad_request("Sizes must be a valid non-empty array"));
    }
    Ok(sizes)
}

/// Writes an upload under the configured directory and returns its public
/// path. Names combine epoch milliseconds with a random suffix so several
/// files in one request cannot collide.
pub(crate) async fn store_upload(
    state: &AppState,
    original_name: &str,
    data: &[u8],
) -> Result<String, ApiError> {
    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let file_name = format!(
        "{}-{:04}.{extension}",
        Utc::now().timestamp_millis(),
        rand::thread_rng().gen_range(0..10_000)
    );
    let path = state.config.uploads_dir.join(&file_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;
    Ok(format!("/uploads/{file_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_positive() {
        assert!(parse_price(Some("100")).is_ok());
        assert!(parse_price(Some("0")).is_err());
        assert!(parse_price(Some("-5")).is_err());
        assert!(parse_price(Some("abc")).is_err());
        assert!(parse_price(None).is_err());
    }

    #[test]
    fn quantity_allows_zero() {
        assert!(parse_quantity(Some("0")).is_ok());
        assert!(parse_quantity(Some("-1")).is_err());
    }

    #[test]
    fn sizes_must_be_non_empty_json_array() {
        assert_eq!(
            parse_sizes(Some(r#"["S","M"]"#)).unwrap(),
            vec!["S".to_string(), "M".to_string()]
        );
        assert!(parse_sizes(Some("[]")).is_err());
        assert!(parse_sizes(Some("not json")).is_err());
        assert!(parse_sizes(None).is_err());
    }
}
