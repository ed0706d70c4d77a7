//! Image API routes: public gallery reads plus the protected upload and
//! deletion endpoints

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware;
use crate::models::image::{Category, GalleryFilter, Orientation, UploadMetadata};
use crate::pipeline::UploadFile;
use crate::state::AppState;
use crate::validation::{MAX_BATCH_FILES, MAX_UPLOAD_BYTES};

// Room for a full batch plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_BATCH_FILES * MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/upload-file", post(upload_file))
        .route("/upload-multiple", post(upload_multiple))
        .route("/upload-url", post(upload_url))
        .route("/:id", delete(delete_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_session,
        ));

    Router::new()
        .route("/", get(list_images))
        .route("/categories", get(list_categories))
        .merge(protected)
}

/// Query parameters for the public gallery listing
#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub category: Option<String>,
    pub orientation: Option<String>,
}

/// List gallery images, newest first (public)
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter =
        GalleryFilter::from_params(query.category.as_deref(), query.orientation.as_deref())
            .map_err(ApiError::Validation)?;

    let images = state
        .image_repository
        .list(filter)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "success": true,
        "images": images,
    })))
}

/// Distinct categories currently present (public)
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = state
        .image_repository
        .distinct_categories()
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "success": true,
        "categories": categories,
    })))
}

/// Upload a single image file (protected)
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = read_multipart(multipart, "image").await?;

    let file = upload
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;

    let meta = UploadMetadata {
        title: required_field(&upload.fields, "title")?,
        description: upload.fields.get("description").cloned().unwrap_or_default(),
        category: parse_category(&upload.fields)?,
        orientation: parse_orientation(&upload.fields)?,
    };

    let image = state.pipeline.upload_file(file, meta).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Image uploaded successfully",
        "image": image,
    })))
}

/// Upload up to ten image files sharing one category/orientation (protected)
///
/// Items fail independently; the response attributes every failure to its
/// input index so a partial batch is distinguishable from a full one.
pub async fn upload_multiple(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = read_multipart(multipart, "images").await?;

    let category = parse_category(&upload.fields)?;
    let orientation = parse_orientation(&upload.fields)?;

    let outcome = state
        .pipeline
        .upload_many(upload.files, category, orientation)
        .await?;

    if outcome.all_failed() {
        return Err(ApiError::Upload(format!(
            "all {} uploads failed",
            outcome.failed.len()
        )));
    }

    let total_uploaded = outcome.images.len();
    let mut body = json!({
        "success": true,
        "message": format!("{} images uploaded successfully", total_uploaded),
        "images": outcome.images,
        "totalUploaded": total_uploaded,
    });

    if !outcome.failed.is_empty() {
        body["message"] = json!(format!(
            "{} of {} images uploaded",
            total_uploaded,
            total_uploaded + outcome.failed.len()
        ));
        body["failed"] = serde_json::to_value(&outcome.failed)
            .map_err(|e| ApiError::internal(e.into()))?;
    }

    Ok(Json(body))
}

/// Request for URL-based upload
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub orientation: String,
}

/// Upload by source URL; the media host fetches and stores it (protected)
pub async fn upload_url(
    State(state): State<AppState>,
    Json(payload): Json<UploadUrlRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }

    let meta = UploadMetadata {
        title: title.to_string(),
        description: payload.description,
        category: payload
            .category
            .parse::<Category>()
            .map_err(ApiError::Validation)?,
        orientation: payload
            .orientation
            .parse::<Orientation>()
            .map_err(ApiError::Validation)?,
    };

    let image = state
        .pipeline
        .upload_from_url(&payload.image_url, meta)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Image uploaded successfully",
        "image": image,
    })))
}

/// Delete an image and its remote object (protected)
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.pipeline.delete_image(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Image deleted successfully",
    })))
}

struct MultipartUpload {
    files: Vec<UploadFile>,
    fields: HashMap<String, String>,
}

/// Drain a multipart request into files (under `file_field`) and text fields
async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<MultipartUpload, ApiError> {
    let mut files = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::Validation(format!("Malformed multipart request: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::Validation(format!("Failed to read uploaded file: {}", e))
            })?;

            files.push(UploadFile {
                file_name,
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await.map_err(|e| {
                ApiError::Validation(format!("Failed to read field '{}': {}", name, e))
            })?;
            fields.insert(name, value);
        }
    }

    Ok(MultipartUpload { files, fields })
}

fn required_field(fields: &HashMap<String, String>, name: &str) -> Result<String, ApiError> {
    fields
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} is required", capitalize(name))))
}

fn parse_category(fields: &HashMap<String, String>) -> Result<Category, ApiError> {
    let raw = fields
        .get("category")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("Category and orientation are required".to_string())
        })?;

    raw.parse().map_err(ApiError::Validation)
}

fn parse_orientation(fields: &HashMap<String, String>) -> Result<Orientation, ApiError> {
    let raw = fields
        .get("orientation")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("Category and orientation are required".to_string())
        })?;

    raw.parse().map_err(ApiError::Validation)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_trims_and_rejects_empty() {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), "  Golden hour  ".to_string());

        assert_eq!(required_field(&fields, "title").unwrap(), "Golden hour");

        fields.insert("title".to_string(), "   ".to_string());
        assert!(required_field(&fields, "title").is_err());
        assert!(required_field(&HashMap::new(), "title").is_err());
    }

    #[test]
    fn missing_category_or_orientation_is_a_single_message() {
        let err = parse_category(&HashMap::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Category and orientation are required"
        );

        let err = parse_orientation(&HashMap::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Category and orientation are required"
        );
    }

    #[test]
    fn invalid_enum_values_surface_the_parse_error() {
        let mut fields = HashMap::new();
        fields.insert("category".to_string(), "SUNSETS".to_string());

        let err = parse_category(&fields).unwrap_err();
        assert!(err.to_string().contains("unknown category"));
    }
}
