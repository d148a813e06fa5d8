use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::error::{ApiError, Context};
use super::session::RequireAdmin;
use super::JsonBody;
use crate::catalog::{parse_product, Catalog};
use crate::model::{Product, ProductId};
use crate::sanitize::coerce_int;
use crate::state::AppState;
use crate::UnitOfWork;

/// Path ids are coerced like any other client input; garbage becomes 0,
/// which never matches a stored product.
fn product_id(raw: String) -> ProductId {
    ProductId::new(coerce_int(Some(&Value::String(raw))))
}

pub async fn list<U: UnitOfWork>(
    State(state): State<AppState<U>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = Catalog::new(state.store())
        .list()
        .await
        .context("list products", None)?;
    Ok(Json(products))
}

pub async fn create<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let input = parse_product(&body)?;
    let id = Catalog::new(state.store())
        .create(&admin, &input)
        .await
        .context("create product", Some(&admin))?;

    Ok(Json(json!({
        "success": true,
        "message": "product created",
        "id": id,
    })))
}

pub async fn update<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let input = parse_product(&body)?;
    Catalog::new(state.store())
        .update(&admin, product_id(id), &input)
        .await
        .context("update product", Some(&admin))?;

    Ok(Json(json!({ "success": true, "message": "product updated" })))
}

pub async fn delete<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Catalog::new(state.store())
        .delete(&admin, product_id(id))
        .await
        .context("delete product", Some(&admin))?;

    Ok(Json(json!({ "success": true, "message": "product deleted" })))
}
