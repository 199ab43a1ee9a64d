use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use diesel::{dsl::count_star, prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    audit::{self, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE, ENTITY_ASSET},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Asset, NewAsset},
    schema::assets,
    state::AppState,
    validate,
};

use super::locations::load_location_scoped;
use super::to_iso;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

pub const MAX_ACQUISITION_COST: f64 = 999_999_999_999.99;

pub const ASSET_CATEGORIES: &[&str] = &[
    "furniture",
    "machinery",
    "computers",
    "vehicles",
    "inventory",
    "supplies",
    "leasehold_improvements",
    "other",
];

fn normalize_category(value: &str) -> AppResult<String> {
    let candidate = value.trim().to_lowercase();
    if ASSET_CATEGORIES.iter().any(|allowed| *allowed == candidate) {
        Ok(candidate)
    } else {
        Err(AppError::bad_request(format!(
            "invalid asset category '{candidate}'. Allowed categories: {}",
            ASSET_CATEGORIES.join(", ")
        )))
    }
}

#[derive(Serialize)]
pub struct AssetResponse {
    pub id: Uuid,
    pub location_id: Uuid,
    pub description: String,
    pub category: String,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: f64,
    pub fmv_override: Option<f64>,
    pub fmv_override_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct AssetListResponse {
    pub items: Vec<AssetResponse>,
    pub total: i64,
}

#[derive(Serialize)]
pub struct AssetSummaryResponse {
    pub count: i64,
    pub total_cost: f64,
    pub by_category: BTreeMap<String, i64>,
}

#[derive(Deserialize)]
pub struct AssetListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateAssetRequest {
    pub description: String,
    pub category: String,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: f64,
}

#[derive(Deserialize)]
pub struct UpdateAssetRequest {
    pub description: Option<String>,
    pub category: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub acquisition_cost: Option<f64>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = assets)]
struct AssetChangeset<'a> {
    description: Option<&'a str>,
    category: Option<&'a str>,
    acquisition_date: Option<NaiveDate>,
    acquisition_cost: Option<f64>,
}

pub async fn list_assets(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<AssetListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<AssetListResponse>> {
    let mut conn = state.db()?;
    load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let search = params
        .search
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    let category = match params.category.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => Some(normalize_category(raw)?),
        None => None,
    };

    let mut count_query = assets::table
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .into_boxed();
    let mut list_query = assets::table
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .into_boxed();

    if let Some(pattern) = search.as_ref() {
        count_query = count_query.filter(assets::description.ilike(pattern.clone()));
        list_query = list_query.filter(assets::description.ilike(pattern.clone()));
    }
    if let Some(category) = category.as_ref() {
        count_query = count_query.filter(assets::category.eq(category.clone()));
        list_query = list_query.filter(assets::category.eq(category.clone()));
    }

    let total: i64 = count_query.select(count_star()).first(&mut conn)?;
    let rows: Vec<Asset> = list_query
        .order(assets::acquisition_date.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    Ok(Json(AssetListResponse {
        items: rows.into_iter().map(to_asset_response).collect(),
        total,
    }))
}

pub async fn asset_summary(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<Json<AssetSummaryResponse>> {
    let mut conn = state.db()?;
    load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let rows: Vec<(String, f64)> = assets::table
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .select((assets::category, assets::acquisition_cost))
        .load(&mut conn)?;

    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
    let mut total_cost = 0.0;
    for (category, cost) in &rows {
        *by_category.entry(category.clone()).or_default() += 1;
        total_cost += cost;
    }

    Ok(Json(AssetSummaryResponse {
        count: rows.len() as i64,
        total_cost,
        by_category,
    }))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path((client_id, location_id, asset_id)): Path<(Uuid, Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<Json<AssetResponse>> {
    let mut conn = state.db()?;
    let asset = load_asset_scoped(&mut conn, user.firm_id, client_id, location_id, asset_id)?;
    Ok(Json(to_asset_response(asset)))
}

pub async fn create_asset(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAssetRequest>,
) -> AppResult<(StatusCode, Json<AssetResponse>)> {
    let mut conn = state.db()?;
    load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let new_asset = NewAsset {
        id: Uuid::new_v4(),
        location_id,
        description: validate::required_text("description", &payload.description, 255)?,
        category: normalize_category(&payload.category)?,
        acquisition_date: payload.acquisition_date,
        acquisition_cost: validate::non_negative_amount(
            "acquisition_cost",
            payload.acquisition_cost,
            MAX_ACQUISITION_COST,
        )?,
    };

    diesel::insert_into(assets::table)
        .values(&new_asset)
        .execute(&mut conn)?;

    let asset: Asset = assets::table.find(new_asset.id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_ASSET,
        asset.id,
        ACTION_CREATE,
        None,
        Some(snapshot(&asset)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(to_asset_response(asset))))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Path((client_id, location_id, asset_id)): Path<(Uuid, Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateAssetRequest>,
) -> AppResult<Json<AssetResponse>> {
    let mut conn = state.db()?;
    let existing = load_asset_scoped(&mut conn, user.firm_id, client_id, location_id, asset_id)?;

    let mut new_description: Option<String> = None;
    if let Some(ref candidate) = payload.description {
        let validated = validate::required_text("description", candidate, 255)?;
        if validated != existing.description {
            new_description = Some(validated);
        }
    }

    let mut new_category: Option<String> = None;
    if let Some(ref candidate) = payload.category {
        let validated = normalize_category(candidate)?;
        if validated != existing.category {
            new_category = Some(validated);
        }
    }

    let new_date = payload
        .acquisition_date
        .filter(|candidate| *candidate != existing.acquisition_date);

    let mut new_cost: Option<f64> = None;
    if let Some(candidate) = payload.acquisition_cost {
        let validated =
            validate::non_negative_amount("acquisition_cost", candidate, MAX_ACQUISITION_COST)?;
        if validated != existing.acquisition_cost {
            new_cost = Some(validated);
        }
    }

    if new_description.is_none() && new_category.is_none() && new_date.is_none() && new_cost.is_none()
    {
        return Ok(Json(to_asset_response(existing)));
    }

    let old_snapshot = snapshot(&existing);
    let changeset = AssetChangeset {
        description: new_description.as_deref(),
        category: new_category.as_deref(),
        acquisition_date: new_date,
        acquisition_cost: new_cost,
    };

    let now = Utc::now().naive_utc();
    diesel::update(assets::table.find(asset_id))
        .set((&changeset, assets::updated_at.eq(now)))
        .execute(&mut conn)?;

    let updated: Asset = assets::table.find(asset_id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_ASSET,
        asset_id,
        ACTION_UPDATE,
        Some(old_snapshot),
        Some(snapshot(&updated)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(Json(to_asset_response(updated)))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Path((client_id, location_id, asset_id)): Path<(Uuid, Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let existing = load_asset_scoped(&mut conn, user.firm_id, client_id, location_id, asset_id)?;

    let now = Utc::now().naive_utc();
    diesel::update(assets::table.find(asset_id))
        .set((assets::deleted_at.eq(now), assets::updated_at.eq(now)))
        .execute(&mut conn)?;

    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_ASSET,
        asset_id,
        ACTION_DELETE,
        Some(snapshot(&existing)),
        None,
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

pub(super) fn load_asset_scoped(
    conn: &mut PgConnection,
    firm_id: Uuid,
    client_id: Uuid,
    location_id: Uuid,
    asset_id: Uuid,
) -> AppResult<Asset> {
    load_location_scoped(conn, firm_id, client_id, location_id)?;
    let asset: Asset = assets::table
        .find(asset_id)
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;
    Ok(asset)
}

fn snapshot(asset: &Asset) -> Value {
    json!({
        "description": asset.description,
        "category": asset.category,
        "acquisition_date": asset.acquisition_date,
        "acquisition_cost": asset.acquisition_cost,
        "fmv_override": asset.fmv_override,
        "fmv_override_reason": asset.fmv_override_reason,
    })
}

pub(super) fn to_asset_response(asset: Asset) -> AssetResponse {
    AssetResponse {
        id: asset.id,
        location_id: asset.location_id,
        description: asset.description,
        category: asset.category,
        acquisition_date: asset.acquisition_date,
        acquisition_cost: asset.acquisition_cost,
        fmv_override: asset.fmv_override,
        fmv_override_reason: asset.fmv_override_reason,
        created_at: to_iso(asset.created_at),
        updated_at: to_iso(asset.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_category;

    #[test]
    fn category_is_case_insensitive() {
        assert_eq!(normalize_category(" Machinery ").unwrap(), "machinery");
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(normalize_category("goodwill").is_err());
    }
}
