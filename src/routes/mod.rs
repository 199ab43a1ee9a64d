use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod assets;
pub mod billing;
pub mod clients;
pub mod dashboard;
pub mod depreciation;
pub mod export;
pub mod firm;
pub mod health;
pub mod jurisdictions;
pub mod locations;
pub mod pages;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let clients_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/:client_id/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/:client_id/locations/:id",
            get(locations::get_location)
                .patch(locations::update_location)
                .delete(locations::delete_location),
        )
        .route(
            "/:client_id/locations/:location_id/assets",
            get(assets::list_assets).post(assets::create_asset),
        )
        .route(
            "/:client_id/locations/:location_id/assets/summary",
            get(assets::asset_summary),
        )
        .route(
            "/:client_id/locations/:location_id/assets/:id",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route(
            "/:client_id/locations/:location_id/depreciation/preview",
            get(depreciation::preview),
        )
        .route(
            "/:client_id/locations/:location_id/depreciation/overrides",
            patch(depreciation::update_overrides),
        );

    let users_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/invite", post(users::create_invite))
        .route("/invites", get(users::list_invites))
        .route("/invites/:id", delete(users::revoke_invite))
        .route("/:id/role", patch(users::update_role))
        .route("/:id", delete(users::remove_user));

    let firm_routes = Router::new().route("/me", get(firm::get_firm).patch(firm::update_firm));

    let billing_routes = Router::new()
        .route("/", get(billing::get_billing))
        .route("/checkout", post(billing::create_checkout))
        .route("/portal", post(billing::create_portal));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/clients", clients_routes)
        .nest("/api/users", users_routes)
        .nest("/api/firms", firm_routes)
        .nest("/api/billing", billing_routes)
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/jurisdictions/counties", get(jurisdictions::list_counties))
        .route("/api/export/:entity", get(export::export_entity))
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .merge(pages::page_router())
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
