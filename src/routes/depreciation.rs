use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, ACTION_UPDATE, ENTITY_ASSET},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::Asset,
    schema::assets,
    state::AppState,
};

use super::locations::load_location_scoped;

pub const MAX_OVERRIDE_ITEMS: usize = 500;
pub const MAX_OVERRIDE_VALUE: f64 = 999_999_999_999.99;
pub const MAX_REASON_LEN: usize = 500;

// Placeholder percent-good schedule pending jurisdiction-specific tables.
// Index is asset age in years as of the January 1 lien date.
const PERCENT_GOOD: &[f64] = &[0.90, 0.80, 0.70, 0.60, 0.50, 0.40, 0.30, 0.20];

fn percent_good_for_age(age_years: i32) -> f64 {
    let index = age_years.max(0) as usize;
    PERCENT_GOOD
        .get(index)
        .copied()
        .unwrap_or_else(|| *PERCENT_GOOD.last().expect("schedule is non-empty"))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    #[serde(rename = "taxYear")]
    pub tax_year: Option<i32>,
}

#[derive(Serialize)]
pub struct AssetPreview {
    pub asset_id: Uuid,
    pub description: String,
    pub category: String,
    pub acquisition_cost: f64,
    pub age_years: i32,
    pub percent_good: f64,
    pub computed_fmv: f64,
    pub override_fmv: Option<f64>,
    pub override_reason: Option<String>,
    pub final_fmv: f64,
}

#[derive(Serialize)]
pub struct DepreciationPreviewResponse {
    pub tax_year: i32,
    pub assets: Vec<AssetPreview>,
    pub total_fmv: f64,
}

pub async fn preview(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<PreviewQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<DepreciationPreviewResponse>> {
    let tax_year = match params.tax_year {
        Some(year) if (2000..=2100).contains(&year) => year,
        Some(year) => {
            return Err(AppError::bad_request(format!(
                "taxYear {year} is out of range"
            )))
        }
        None => Utc::now().year(),
    };

    let mut conn = state.db()?;
    load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let rows: Vec<Asset> = assets::table
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .order(assets::acquisition_date.desc())
        .load(&mut conn)?;

    let mut previews = Vec::with_capacity(rows.len());
    let mut total_fmv = 0.0;
    for asset in rows {
        let age_years = tax_year - asset.acquisition_date.year();
        let percent_good = percent_good_for_age(age_years);
        let computed_fmv = round_cents(asset.acquisition_cost * percent_good);
        let final_fmv = asset.fmv_override.unwrap_or(computed_fmv);
        total_fmv += final_fmv;

        previews.push(AssetPreview {
            asset_id: asset.id,
            description: asset.description,
            category: asset.category,
            acquisition_cost: asset.acquisition_cost,
            age_years,
            percent_good,
            computed_fmv,
            override_fmv: asset.fmv_override,
            override_reason: asset.fmv_override_reason,
            final_fmv,
        });
    }

    Ok(Json(DepreciationPreviewResponse {
        tax_year,
        assets: previews,
        total_fmv: round_cents(total_fmv),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FmvOverrideItem {
    pub asset_id: Uuid,
    pub fmv: f64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFmvOverridesRequest {
    pub overrides: Vec<FmvOverrideItem>,
}

impl UpdateFmvOverridesRequest {
    /// Field-level checks applied before any row is touched; the first
    /// violated rule wins.
    pub fn validate(&self) -> AppResult<()> {
        if self.overrides.is_empty() {
            return Err(AppError::bad_request(
                "overrides must contain at least one item",
            ));
        }
        if self.overrides.len() > MAX_OVERRIDE_ITEMS {
            return Err(AppError::bad_request(format!(
                "overrides must contain at most {MAX_OVERRIDE_ITEMS} items"
            )));
        }

        let mut seen: HashSet<Uuid> = HashSet::new();
        for item in &self.overrides {
            if !seen.insert(item.asset_id) {
                return Err(AppError::bad_request(format!(
                    "duplicate override for asset {}",
                    item.asset_id
                )));
            }
            if !item.fmv.is_finite() || item.fmv < 0.0 {
                return Err(AppError::bad_request(
                    "fmv must be a non-negative amount",
                ));
            }
            if item.fmv > MAX_OVERRIDE_VALUE {
                return Err(AppError::bad_request(format!(
                    "fmv must be at most {MAX_OVERRIDE_VALUE}"
                )));
            }
            let reason = item.reason.trim();
            if reason.is_empty() {
                return Err(AppError::bad_request("reason must not be empty"));
            }
            if reason.chars().count() > MAX_REASON_LEN {
                return Err(AppError::bad_request(format!(
                    "reason must be at most {MAX_REASON_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct UpdateFmvOverridesResponse {
    pub updated: usize,
}

pub async fn update_overrides(
    State(state): State<AppState>,
    Path((client_id, location_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateFmvOverridesRequest>,
) -> AppResult<Json<UpdateFmvOverridesResponse>> {
    payload.validate()?;

    let mut conn = state.db()?;
    load_location_scoped(&mut conn, user.firm_id, client_id, location_id)?;

    let requested_ids: Vec<Uuid> = payload.overrides.iter().map(|item| item.asset_id).collect();
    let known_ids: Vec<Uuid> = assets::table
        .filter(assets::location_id.eq(location_id))
        .filter(assets::deleted_at.is_null())
        .filter(assets::id.eq_any(&requested_ids))
        .select(assets::id)
        .load(&mut conn)?;
    let known: HashSet<Uuid> = known_ids.into_iter().collect();

    if let Some(missing) = requested_ids.iter().find(|id| !known.contains(id)) {
        return Err(AppError::bad_request(format!(
            "asset {missing} does not belong to this location"
        )));
    }

    // All or nothing: a failure partway through must not leave earlier
    // overrides applied.
    let now = Utc::now().naive_utc();
    let updated = conn.transaction::<usize, AppError, _>(|conn| {
        let mut updated = 0;
        for item in &payload.overrides {
            let existing: Asset = assets::table.find(item.asset_id).first(conn)?;
            let reason = item.reason.trim().to_string();

            diesel::update(assets::table.find(item.asset_id))
                .set((
                    assets::fmv_override.eq(Some(item.fmv)),
                    assets::fmv_override_reason.eq(Some(reason.clone())),
                    assets::updated_at.eq(now),
                ))
                .execute(conn)?;

            audit::record_change(
                conn,
                user.firm_id,
                ENTITY_ASSET,
                item.asset_id,
                ACTION_UPDATE,
                Some(json!({
                    "fmv_override": existing.fmv_override,
                    "fmv_override_reason": existing.fmv_override_reason,
                })),
                Some(json!({
                    "fmv_override": item.fmv,
                    "fmv_override_reason": reason,
                })),
                Some(user.user_id),
            )
            .map_err(AppError::internal)?;

            updated += 1;
        }
        Ok(updated)
    })?;

    Ok(Json(UpdateFmvOverridesResponse { updated }))
}
