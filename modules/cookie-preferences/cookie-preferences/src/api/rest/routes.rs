use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Json, Router};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cookie Preferences API",
        description = "Per-user cookie consent records"
    ),
    paths(
        handlers::list_preferences,
        handlers::save_preferences,
        handlers::get_preferences,
        handlers::delete_preferences,
    ),
    components(schemas(
        dto::CookieSettingsDto,
        dto::SaveCookiePreferencesRequest,
        dto::CookiePreferencesListResponse,
        dto::CookiePreferencesResponse,
        dto::MessageResponse,
    )),
    tags((name = "Cookie Preferences", description = "Cookie consent storage"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route(
            "/cookie-preferences",
            get(handlers::list_preferences).post(handlers::save_preferences),
        )
        .route(
            "/cookie-preferences/{user_id}",
            get(handlers::get_preferences).delete(handlers::delete_preferences),
        )
        .route("/openapi.json", get(openapi_json))
        .layer(Extension(service))
}
