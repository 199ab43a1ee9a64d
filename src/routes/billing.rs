use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::Firm,
    schema::firms,
    state::AppState,
};

#[derive(Serialize)]
pub struct BillingResponse {
    pub plan: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct RedirectResponse {
    pub url: String,
}

pub async fn get_billing(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<BillingResponse>> {
    let mut conn = state.db()?;
    let firm: Firm = firms::table.find(user.firm_id).first(&mut conn)?;
    Ok(Json(BillingResponse {
        plan: firm.billing_plan,
        status: firm.billing_status,
    }))
}

/// The payment provider hosts checkout; this only hands the caller the
/// firm-scoped redirect URL.
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<RedirectResponse>> {
    user.require_admin()?;
    let base = state
        .config
        .billing_checkout_url
        .as_ref()
        .ok_or_else(|| AppError::bad_request("billing checkout is not configured"))?;
    Ok(Json(RedirectResponse {
        url: format!("{base}?firm={}", user.firm_id),
    }))
}

pub async fn create_portal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<RedirectResponse>> {
    user.require_admin()?;
    let base = state
        .config
        .billing_portal_url
        .as_ref()
        .ok_or_else(|| AppError::bad_request("billing portal is not configured"))?;
    Ok(Json(RedirectResponse {
        url: format!("{base}?firm={}", user.firm_id),
    }))
}
