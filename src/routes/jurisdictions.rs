use axum::{
    extract::{Query, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::Jurisdiction,
    schema::jurisdictions,
    state::AppState,
    validate,
};

#[derive(Deserialize)]
pub struct CountyQuery {
    pub state: String,
}

#[derive(Serialize)]
pub struct CountyResponse {
    pub county: String,
    pub filing_deadline_month: i32,
    pub filing_deadline_day: i32,
    pub extension_deadline_month: Option<i32>,
    pub extension_deadline_day: Option<i32>,
}

pub async fn list_counties(
    State(state): State<AppState>,
    Query(params): Query<CountyQuery>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<CountyResponse>>> {
    let state_code = validate::state_code("state", &params.state)?;

    let mut conn = state.db()?;
    let rows: Vec<Jurisdiction> = jurisdictions::table
        .filter(jurisdictions::state.eq(&state_code))
        .order(jurisdictions::county.asc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|row| CountyResponse {
                county: row.county,
                filing_deadline_month: row.filing_deadline_month,
                filing_deadline_day: row.filing_deadline_day,
                extension_deadline_month: row.extension_deadline_month,
                extension_deadline_day: row.extension_deadline_day,
            })
            .collect(),
    ))
}
