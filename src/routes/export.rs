use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
};
use chrono::Utc;
use diesel::{prelude::*, PgConnection};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Asset, Client, Location},
    schema::{assets, clients, locations},
    state::AppState,
};

const EXPORT_ENTITIES: &[&str] = &["clients", "locations", "assets"];

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub client_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub category: Option<String>,
}

pub async fn export_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<ExportQuery>,
    user: AuthenticatedUser,
) -> AppResult<(HeaderMap, String)> {
    if !EXPORT_ENTITIES.iter().any(|allowed| *allowed == entity) {
        return Err(AppError::bad_request(format!(
            "unknown export entity '{entity}'. Supported entities: {}",
            EXPORT_ENTITIES.join(", ")
        )));
    }

    match params.format.as_deref().unwrap_or("csv") {
        "csv" => {}
        other => {
            return Err(AppError::bad_request(format!(
                "unsupported export format '{other}'"
            )))
        }
    }

    let mut conn = state.db()?;
    let body = match entity.as_str() {
        "clients" => export_clients(&mut conn, user.firm_id)?,
        "locations" => export_locations(&mut conn, user.firm_id, params.client_id)?,
        "assets" => export_assets(
            &mut conn,
            user.firm_id,
            params.client_id,
            params.location_id,
            params.category.as_deref(),
        )?,
        _ => unreachable!("entity validated above"),
    };

    let filename = export_filename(&entity);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .map_err(AppError::internal)?,
    );

    Ok((headers, body))
}

fn export_filename(entity: &str) -> String {
    format!("{entity}-{}.csv", Utc::now().format("%Y-%m-%d"))
}

fn export_clients(conn: &mut PgConnection, firm_id: Uuid) -> AppResult<String> {
    let rows: Vec<Client> = clients::table
        .filter(clients::firm_id.eq(firm_id))
        .filter(clients::deleted_at.is_null())
        .order(clients::name.asc())
        .load(conn)?;

    let mut out = csv_row(&["id", "name", "contact_email"]);
    for client in rows {
        out.push_str(&csv_row(&[
            &client.id.to_string(),
            &client.name,
            client.contact_email.as_deref().unwrap_or(""),
        ]));
    }
    Ok(out)
}

fn export_locations(
    conn: &mut PgConnection,
    firm_id: Uuid,
    client_id: Option<Uuid>,
) -> AppResult<String> {
    let mut query = locations::table
        .inner_join(clients::table)
        .filter(clients::firm_id.eq(firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .select((locations::all_columns, clients::name))
        .into_boxed();
    if let Some(client_id) = client_id {
        query = query.filter(locations::client_id.eq(client_id));
    }

    let rows: Vec<(Location, String)> = query.order(locations::name.asc()).load(conn)?;

    let mut out = csv_row(&[
        "id", "client", "name", "address", "city", "county", "state", "zip",
    ]);
    for (location, client_name) in rows {
        out.push_str(&csv_row(&[
            &location.id.to_string(),
            &client_name,
            &location.name,
            location.address.as_deref().unwrap_or(""),
            location.city.as_deref().unwrap_or(""),
            location.county.as_deref().unwrap_or(""),
            &location.state,
            location.zip.as_deref().unwrap_or(""),
        ]));
    }
    Ok(out)
}

fn export_assets(
    conn: &mut PgConnection,
    firm_id: Uuid,
    client_id: Option<Uuid>,
    location_id: Option<Uuid>,
    category: Option<&str>,
) -> AppResult<String> {
    let mut query = assets::table
        .inner_join(locations::table.inner_join(clients::table))
        .filter(clients::firm_id.eq(firm_id))
        .filter(clients::deleted_at.is_null())
        .filter(locations::deleted_at.is_null())
        .filter(assets::deleted_at.is_null())
        .select((assets::all_columns, locations::name, clients::name))
        .into_boxed();
    if let Some(client_id) = client_id {
        query = query.filter(locations::client_id.eq(client_id));
    }
    if let Some(location_id) = location_id {
        query = query.filter(assets::location_id.eq(location_id));
    }
    if let Some(category) = category.map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(assets::category.eq(category.to_lowercase()));
    }

    let rows: Vec<(Asset, String, String)> =
        query.order(assets::acquisition_date.desc()).load(conn)?;

    let mut out = csv_row(&[
        "id",
        "client",
        "location",
        "description",
        "category",
        "acquisition_date",
        "acquisition_cost",
        "fmv_override",
        "fmv_override_reason",
    ]);
    for (asset, location_name, client_name) in rows {
        out.push_str(&csv_row(&[
            &asset.id.to_string(),
            &client_name,
            &location_name,
            &asset.description,
            &asset.category,
            &asset.acquisition_date.to_string(),
            &format!("{:.2}", asset.acquisition_cost),
            &asset
                .fmv_override
                .map(|value| format!("{value:.2}"))
                .unwrap_or_default(),
            asset.fmv_override_reason.as_deref().unwrap_or(""),
        ]));
    }
    Ok(out)
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|field| csv_escape(field))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
