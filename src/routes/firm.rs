use axum::{extract::State, Json};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    audit::{self, ACTION_UPDATE, ENTITY_FIRM},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::Firm,
    schema::firms,
    state::AppState,
    validate,
};

use super::to_iso;

#[derive(Serialize)]
pub struct FirmResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub billing_plan: String,
    pub billing_status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct UpdateFirmRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = firms)]
struct FirmChangeset<'a> {
    name: Option<&'a str>,
    contact_email: Option<Option<&'a str>>,
}

pub async fn get_firm(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<FirmResponse>> {
    let mut conn = state.db()?;
    let firm: Firm = firms::table.find(user.firm_id).first(&mut conn)?;
    Ok(Json(to_firm_response(firm)))
}

pub async fn update_firm(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateFirmRequest>,
) -> AppResult<Json<FirmResponse>> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let existing: Firm = firms::table.find(user.firm_id).first(&mut conn)?;

    let mut new_name: Option<String> = None;
    if let Some(ref candidate) = payload.name {
        let validated = validate::required_text("name", candidate, 255)?;
        if validated != existing.name {
            new_name = Some(validated);
        }
    }

    let mut new_email: Option<Option<String>> = None;
    if let Some(ref candidate) = payload.contact_email {
        let trimmed = candidate.trim();
        let validated = if trimmed.is_empty() {
            None
        } else {
            Some(validate::email("contact_email", trimmed)?)
        };
        if validated != existing.contact_email {
            new_email = Some(validated);
        }
    }

    if new_name.is_none() && new_email.is_none() {
        return Ok(Json(to_firm_response(existing)));
    }

    let old_snapshot = snapshot(&existing);
    let changeset = FirmChangeset {
        name: new_name.as_deref(),
        contact_email: new_email.as_ref().map(|opt| opt.as_deref()),
    };

    let now = Utc::now().naive_utc();
    diesel::update(firms::table.find(user.firm_id))
        .set((&changeset, firms::updated_at.eq(now)))
        .execute(&mut conn)?;

    let updated: Firm = firms::table.find(user.firm_id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_FIRM,
        user.firm_id,
        ACTION_UPDATE,
        Some(old_snapshot),
        Some(snapshot(&updated)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(Json(to_firm_response(updated)))
}

fn snapshot(firm: &Firm) -> Value {
    json!({
        "name": firm.name,
        "contact_email": firm.contact_email,
    })
}

fn to_firm_response(firm: Firm) -> FirmResponse {
    FirmResponse {
        id: firm.id,
        name: firm.name,
        contact_email: firm.contact_email,
        billing_plan: firm.billing_plan,
        billing_status: firm.billing_status,
        created_at: to_iso(firm.created_at),
        updated_at: to_iso(firm.updated_at),
    }
}
