use std::collections::BTreeSet;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use diesel::{
    dsl::{count_star, sum},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::Jurisdiction,
    schema::{assets, clients, jurisdictions, locations},
    state::AppState,
};

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "taxYear")]
    pub tax_year: Option<i32>,
}

#[derive(Serialize)]
pub struct DeadlineEntry {
    pub state: String,
    pub county: String,
    pub filing_deadline: NaiveDate,
}

#[derive(Serialize)]
pub struct DashboardStatsResponse {
    pub tax_year: i32,
    pub clients: i64,
    pub locations: i64,
    pub assets: i64,
    pub total_acquisition_cost: f64,
    pub upcoming_deadlines: Vec<DeadlineEntry>,
}

pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardStatsResponse>> {
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

    let client_count: i64 = clients::table
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .select(count_star())
        .first(&mut conn)?;

    let location_count: i64 = locations::table
        .inner_join(clients::table)
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .select(count_star())
        .first(&mut conn)?;

    let asset_count: i64 = assets::table
        .inner_join(locations::table.inner_join(clients::table))
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .filter(assets::deleted_at.is_null())
        .select(count_star())
        .first(&mut conn)?;

    let total_cost: Option<f64> = assets::table
        .inner_join(locations::table.inner_join(clients::table))
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .filter(assets::deleted_at.is_null())
        .select(sum(assets::acquisition_cost))
        .first(&mut conn)?;

    let county_rows: Vec<(String, Option<String>)> = locations::table
        .inner_join(clients::table)
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .select((locations::state, locations::county))
        .load(&mut conn)?;

    let filing_counties: BTreeSet<(String, String)> = county_rows
        .into_iter()
        .filter_map(|(state, county)| county.map(|county| (state, county)))
        .collect();

    let mut upcoming_deadlines = Vec::new();
    for (state_code, county) in &filing_counties {
        let jurisdiction: Option<Jurisdiction> = jurisdictions::table
            .filter(jurisdictions::state.eq(state_code))
            .filter(jurisdictions::county.eq(county))
            .first(&mut conn)
            .optional()?;

        if let Some(jurisdiction) = jurisdiction {
            // Deadlines with an invalid month/day pair are skipped rather
            // than failing the whole dashboard.
            if let Some(date) = NaiveDate::from_ymd_opt(
                tax_year,
                jurisdiction.filing_deadline_month as u32,
                jurisdiction.filing_deadline_day as u32,
            ) {
                upcoming_deadlines.push(DeadlineEntry {
                    state: jurisdiction.state,
                    county: jurisdiction.county,
                    filing_deadline: date,
                });
            }
        }
    }
    upcoming_deadlines.sort_by(|a, b| a.filing_deadline.cmp(&b.filing_deadline));

    Ok(Json(DashboardStatsResponse {
        tax_year,
        clients: client_count,
        locations: location_count,
        assets: asset_count,
        total_acquisition_cost: total_cost.unwrap_or(0.0),
        upcoming_deadlines,
    }))
}
