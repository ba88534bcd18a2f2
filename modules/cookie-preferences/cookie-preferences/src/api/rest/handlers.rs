use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::Json;

use crate::domain::service::Service;

use super::dto::{
    CookiePreferencesListResponse, CookiePreferencesResponse, MessageResponse,
    SaveCookiePreferencesRequest,
};
use super::error::{ApiResult, MSG_NOT_FOUND};

const MSG_SAVED: &str = "Cookie preferences saved";
const MSG_DELETED: &str = "Cookie preferences deleted";

#[utoipa::path(
    get,
    path = "/cookie-preferences",
    tag = "Cookie Preferences",
    operation_id = "cookie-preferences.list",
    responses(
        (status = 200, description = "All stored preferences", body = CookiePreferencesListResponse),
        (status = 500, description = "Internal error", body = MessageResponse),
    )
)]
pub async fn list_preferences(
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<CookiePreferencesListResponse>> {
    let all = svc.list_preferences().await?;
    Ok(Json(CookiePreferencesListResponse {
        success: true,
        data: all.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/cookie-preferences",
    tag = "Cookie Preferences",
    operation_id = "cookie-preferences.save",
    request_body = SaveCookiePreferencesRequest,
    responses(
        (status = 200, description = "Preferences saved", body = MessageResponse),
        (status = 400, description = "Invalid cookie preferences data", body = MessageResponse),
    )
)]
pub async fn save_preferences(
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<SaveCookiePreferencesRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(req) = payload?;
    svc.save_preferences(req.into()).await?;
    Ok(Json(MessageResponse::ok(MSG_SAVED)))
}

#[utoipa::path(
    get,
    path = "/cookie-preferences/{userId}",
    tag = "Cookie Preferences",
    operation_id = "cookie-preferences.get",
    params(("userId" = String, Path, description = "Subject the record belongs to")),
    responses(
        (status = 200, description = "Stored preferences", body = CookiePreferencesResponse),
        (status = 404, description = "Cookie preferences not found", body = MessageResponse),
    )
)]
pub async fn get_preferences(
    Extension(svc): Extension<Arc<Service>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<CookiePreferencesResponse>> {
    let settings = svc.get_preferences(&user_id).await?;
    Ok(Json(CookiePreferencesResponse {
        success: true,
        data: settings.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/cookie-preferences/{userId}",
    tag = "Cookie Preferences",
    operation_id = "cookie-preferences.delete",
    params(("userId" = String, Path, description = "Subject the record belongs to")),
    responses(
        (status = 200, description = "`success` tells whether a record existed", body = MessageResponse),
    )
)]
pub async fn delete_preferences(
    Extension(svc): Extension<Arc<Service>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let deleted = svc.delete_preferences(&user_id).await?;
    Ok(Json(MessageResponse {
        success: deleted,
        message: if deleted { MSG_DELETED } else { MSG_NOT_FOUND }.to_owned(),
    }))
}
