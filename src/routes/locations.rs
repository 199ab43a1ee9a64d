use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    audit::{self, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE, ENTITY_LOCATION},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Location, NewLocation},
    schema::locations,
    state::AppState,
    validate,
};

use super::clients::load_client_scoped;
use super::to_iso;

#[derive(Serialize)]
pub struct LocationResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: String,
    pub zip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: String,
    pub zip: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = locations)]
struct LocationChangeset<'a> {
    name: Option<&'a str>,
    address: Option<Option<&'a str>>,
    city: Option<Option<&'a str>>,
    county: Option<Option<&'a str>>,
    state: Option<&'a str>,
    zip: Option<Option<&'a str>>,
}

pub async fn list_locations(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<LocationResponse>>> {
    let mut conn = state.db()?;
    load_client_scoped(&mut conn, user.firm_id, client_id)?;

    let rows: Vec<Location> = locations::table
        .filter(locations::client_id.eq(client_id))
        .filter(locations::deleted_at.is_null())
        .order(locations::name.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_location_response).collect()))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<Json<LocationResponse>> {
    let mut conn = state.db()?;
    let location = load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;
    Ok(Json(to_location_response(location)))
}

pub async fn create_location(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateLocationRequest>,
) -> AppResult<(StatusCode, Json<LocationResponse>)> {
    let mut conn = state.db()?;
    load_client_scoped(&mut conn, user.firm_id, client_id)?;

    let new_location = NewLocation {
        id: Uuid::new_v4(),
        client_id,
        name: validate::required_text("name", &payload.name, 255)?,
        address: validate::optional_text("address", payload.address.as_deref(), 255)?,
        city: validate::optional_text("city", payload.city.as_deref(), 100)?,
        county: validate::optional_text("county", payload.county.as_deref(), 100)?,
        state: validate::state_code("state", &payload.state)?,
        zip: validate::optional_text("zip", payload.zip.as_deref(), 10)?,
    };

    diesel::insert_into(locations::table)
        .values(&new_location)
        .execute(&mut conn)?;

    let location: Location = locations::table.find(new_location.id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_LOCATION,
        location.id,
        ACTION_CREATE,
        None,
        Some(snapshot(&location)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(to_location_response(location))))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<LocationResponse>> {
    let mut conn = state.db()?;
    let existing = load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let mut new_name: Option<String> = None;
    if let Some(ref candidate) = payload.name {
        let validated = validate::required_text("name", candidate, 255)?;
        if validated != existing.name {
            new_name = Some(validated);
        }
    }

    let mut new_state: Option<String> = None;
    if let Some(ref candidate) = payload.state {
        let validated = validate::state_code("state", candidate)?;
        if validated != existing.state {
            new_state = Some(validated);
        }
    }

    let new_address = optional_field_change(
        "address",
        payload.address.as_deref(),
        existing.address.as_deref(),
        255,
    )?;
    let new_city =
        optional_field_change("city", payload.city.as_deref(), existing.city.as_deref(), 100)?;
    let new_county = optional_field_change(
        "county",
        payload.county.as_deref(),
        existing.county.as_deref(),
        100,
    )?;
    let new_zip =
        optional_field_change("zip", payload.zip.as_deref(), existing.zip.as_deref(), 10)?;

    if new_name.is_none()
        && new_state.is_none()
        && new_address.is_none()
        && new_city.is_none()
        && new_county.is_none()
        && new_zip.is_none()
    {
        return Ok(Json(to_location_response(existing)));
    }

    let old_snapshot = snapshot(&existing);
    let changeset = LocationChangeset {
        name: new_name.as_deref(),
        address: new_address.as_ref().map(|opt| opt.as_deref()),
        city: new_city.as_ref().map(|opt| opt.as_deref()),
        county: new_county.as_ref().map(|opt| opt.as_deref()),
        state: new_state.as_deref(),
        zip: new_zip.as_ref().map(|opt| opt.as_deref()),
    };

    let now = Utc::now().naive_utc();
    diesel::update(locations::table.find(location_id))
        .set((&changeset, locations::updated_at.eq(now)))
        .execute(&mut conn)?;

    let updated: Location = locations::table.find(location_id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_LOCATION,
        location_id,
        ACTION_UPDATE,
        Some(old_snapshot),
        Some(snapshot(&updated)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(Json(to_location_response(updated)))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let existing = load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let now = Utc::now().naive_utc();
    diesel::update(locations::table.find(location_id))
        .set((locations::deleted_at.eq(now), locations::updated_at.eq(now)))
        .execute(&mut conn)?;

    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_LOCATION,
        location_id,
        ACTION_DELETE,
        Some(snapshot(&existing)),
        None,
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn load_location_scoped(
    conn: &mut PgConnection,
    firm_id: Uuid,
    client_id: Uuid,
    location_id: Uuid,
) -> AppResult<Location> {
    load_client_scoped(conn, firm_id, client_id)?;
    let location: Location = locations::table
        .find(location_id)
        .filter(locations::client_id.eq(client_id))
        .filter(locations::deleted_at.is_null())
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;
    Ok(location)
}

// PATCH semantics: omitted means keep, blank means clear.
fn optional_field_change(
    field: &str,
    candidate: Option<&str>,
    current: Option<&str>,
    max_len: usize,
) -> AppResult<Option<Option<String>>> {
    match candidate {
        None => Ok(None),
        Some(raw) => {
            let validated = validate::optional_text(field, Some(raw), max_len)?;
            if validated.as_deref() == current {
                Ok(None)
            } else {
                Ok(Some(validated))
            }
        }
    }
}

fn snapshot(location: &Location) -> Value {
    json!({
        "name": location.name,
        "address": location.address,
        "city": location.city,
        "county": location.county,
        "state": location.state,
        "zip": location.zip,
    })
}

fn to_location_response(location: Location) -> LocationResponse {
    LocationResponse {
        id: location.id,
        client_id: location.client_id,
        name: location.name,
        address: location.address,
        city: location.city,
        county: location.county,
        state: location.state,
        zip: location.zip,
        created_at: to_iso(location.created_at),
        updated_at: to_iso(location.updated_at),
    }
}
