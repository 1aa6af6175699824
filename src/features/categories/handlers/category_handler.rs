use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppBody, AppJson};
use crate::features::categories::dtos::{
    CategoryFormDto, CategoryMutationDto, CategoryResponseDto, CategoryTreeDto,
    DisableCategoryRequestDto, ParentCheckRequestDto, ParentCheckResponseDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::constants::CATEGORY_LIST_PATH;
use crate::shared::types::{ApiResponse, Meta};

/// Query params for listing categories
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListCategoriesQuery {
    /// If true, return tree structure. Default: false (flat list)
    #[serde(default)]
    pub tree: bool,
    /// If true, disabled categories are included
    #[serde(default)]
    pub include_disabled: bool,
}

fn mutation(category: CategoryResponseDto) -> CategoryMutationDto {
    CategoryMutationDto {
        category,
        redirect_to: CATEGORY_LIST_PATH.to_string(),
    }
}

/// List categories
///
/// Returns categories as flat list (tree order) or tree structure based on `tree` query param.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let (value, total) = if query.tree {
        let tree: Vec<CategoryTreeDto> = service.list_tree(query.include_disabled).await?;
        let total = tree.len();
        (serde_json::to_value(tree), total)
    } else {
        let categories = service.list(query.include_disabled).await?;
        let total = categories.len();
        (serde_json::to_value(categories), total)
    };

    let value = value.map_err(|e| AppError::Internal(format!("Failed to encode categories: {}", e)))?;
    Ok(Json(ApiResponse::success(
        Some(value),
        None,
        Some(Meta {
            total: total as i64,
        }),
    )))
}

/// Get category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = String, Path, description = "Category object id")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get(&id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Load the edit form state of a category
#[utoipa::path(
    get,
    path = "/api/categories/{id}/form",
    params(
        ("id" = String, Path, description = "Category object id")
    ),
    responses(
        (status = 200, description = "Form state", body = ApiResponse<CategoryFormDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_form(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CategoryFormDto>>> {
    let form = service.form(&id).await?;
    Ok(Json(ApiResponse::success(Some(form), None, None)))
}

/// Check a parent selection before saving
#[utoipa::path(
    post,
    path = "/api/categories/parent-check",
    request_body = ParentCheckRequestDto,
    responses(
        (status = 200, description = "Parent accepted", body = ApiResponse<ParentCheckResponseDto>),
        (status = 400, description = "Parent would create a loop or is disabled"),
        (status = 404, description = "Category or parent not found")
    ),
    tag = "categories"
)]
pub async fn check_parent(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<ParentCheckRequestDto>,
) -> Result<Json<ApiResponse<ParentCheckResponseDto>>> {
    let parent_id = service
        .check_parent(dto.category_id.as_deref(), dto.parent_id.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(ParentCheckResponseDto {
            accepted: true,
            parent_id,
        }),
        None,
        None,
    )))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryFormDto,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryMutationDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Parent not found")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(service): State<Arc<CategoryService>>,
    AppBody(dto): AppBody<CategoryFormDto>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryMutationDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.create(&dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(mutation(category)),
            Some("Category created".to_string()),
            None,
        )),
    ))
}

/// Save changes to a category
///
/// Only changed fields are written; the parent is re-validated against the current tree.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = String, Path, description = "Category object id")
    ),
    request_body = CategoryFormDto,
    responses(
        (status = 200, description = "Category saved", body = ApiResponse<CategoryMutationDto>),
        (status = 400, description = "Validation error or parent loop"),
        (status = 404, description = "Category or parent not found")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
    AppBody(dto): AppBody<CategoryFormDto>,
) -> Result<Json<ApiResponse<CategoryMutationDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.update(&id, &dto).await?;
    Ok(Json(ApiResponse::success(
        Some(mutation(category)),
        Some("Category saved".to_string()),
        None,
    )))
}

/// Soft-disable a category
#[utoipa::path(
    post,
    path = "/api/categories/{id}/disable",
    params(
        ("id" = String, Path, description = "Category object id")
    ),
    request_body = DisableCategoryRequestDto,
    responses(
        (status = 200, description = "Category disabled", body = ApiResponse<CategoryMutationDto>),
        (status = 400, description = "Confirmation missing"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category already disabled")
    ),
    tag = "categories"
)]
pub async fn disable_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<DisableCategoryRequestDto>,
) -> Result<Json<ApiResponse<CategoryMutationDto>>> {
    let category = service.disable(&id, dto.confirm).await?;
    Ok(Json(ApiResponse::success(
        Some(mutation(category)),
        Some("Category disabled".to_string()),
        None,
    )))
}
