use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::{dsl::count_star, prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    audit::{self, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE, ENTITY_CLIENT},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Client, NewClient},
    schema::clients,
    state::AppState,
    validate,
};

use super::to_iso;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Serialize, Clone, Copy)]
pub struct Hb9Settings {
    pub exemption_elected: Option<bool>,
    pub notice_acknowledged: Option<bool>,
}

#[derive(Serialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub hb9: Hb9Settings,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ClientListResponse {
    pub items: Vec<ClientResponse>,
    pub total: i64,
}

#[derive(Deserialize)]
pub struct ClientListQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct Hb9SettingsInput {
    pub exemption_elected: Option<bool>,
    pub notice_acknowledged: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub hb9: Hb9SettingsInput,
}

#[derive(Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub hb9: Option<Hb9SettingsInput>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = clients)]
struct ClientChangeset<'a> {
    name: Option<&'a str>,
    contact_email: Option<Option<&'a str>>,
    hb9_exemption_elected: Option<Option<bool>>,
    hb9_notice_acknowledged: Option<Option<bool>>,
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ClientListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<ClientListResponse>> {
    let mut conn = state.db()?;

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

    let mut count_query = clients::table
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .into_boxed();
    let mut list_query = clients::table
        .filter(clients::firm_id.eq(user.firm_id))
        .filter(clients::deleted_at.is_null())
        .into_boxed();

    if let Some(pattern) = search.as_ref() {
        count_query = count_query.filter(clients::name.ilike(pattern.clone()));
        list_query = list_query.filter(clients::name.ilike(pattern.clone()));
    }

    let descending = match params.order.as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "order must be 'asc' or 'desc', got '{other}'"
            )))
        }
    };

    list_query = match params.sort.as_deref().unwrap_or("name") {
        "name" => {
            if descending {
                list_query.order(clients::name.desc())
            } else {
                list_query.order(clients::name.asc())
            }
        }
        "created_at" => {
            if descending {
                list_query.order(clients::created_at.desc())
            } else {
                list_query.order(clients::created_at.asc())
            }
        }
        "updated_at" => {
            if descending {
                list_query.order(clients::updated_at.desc())
            } else {
                list_query.order(clients::updated_at.asc())
            }
        }
        other => {
            return Err(AppError::bad_request(format!(
                "unsupported sort field '{other}'"
            )))
        }
    };

    let total: i64 = count_query.select(count_star()).first(&mut conn)?;
    let rows: Vec<Client> = list_query.limit(limit).offset(offset).load(&mut conn)?;

    Ok(Json(ClientListResponse {
        items: rows.into_iter().map(to_client_response).collect(),
        total,
    }))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;
    let client = load_client_scoped(&mut conn, user.firm_id, client_id)?;
    Ok(Json(to_client_response(client)))
}

pub async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<ClientResponse>)> {
    let name = validate::required_text("name", &payload.name, 255)?;
    let contact_email = match payload.contact_email.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(validate::email("contact_email", raw)?),
        _ => None,
    };

    let new_client = NewClient {
        id: Uuid::new_v4(),
        firm_id: user.firm_id,
        name,
        contact_email,
        hb9_exemption_elected: payload.hb9.exemption_elected,
        hb9_notice_acknowledged: payload.hb9.notice_acknowledged,
    };

    let mut conn = state.db()?;
    diesel::insert_into(clients::table)
        .values(&new_client)
        .execute(&mut conn)?;

    let client: Client = clients::table.find(new_client.id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_CLIENT,
        client.id,
        ACTION_CREATE,
        None,
        Some(snapshot(&client)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(to_client_response(client))))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateClientRequest>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;
    let existing = load_client_scoped(&mut conn, user.firm_id, client_id)?;

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

    let mut new_elected: Option<Option<bool>> = None;
    let mut new_acknowledged: Option<Option<bool>> = None;
    if let Some(ref hb9) = payload.hb9 {
        if hb9.exemption_elected != existing.hb9_exemption_elected {
            new_elected = Some(hb9.exemption_elected);
        }
        if hb9.notice_acknowledged != existing.hb9_notice_acknowledged {
            new_acknowledged = Some(hb9.notice_acknowledged);
        }
    }

    if new_name.is_none() && new_email.is_none() && new_elected.is_none() && new_acknowledged.is_none() {
        return Ok(Json(to_client_response(existing)));
    }

    let old_snapshot = snapshot(&existing);
    let changeset = ClientChangeset {
        name: new_name.as_deref(),
        contact_email: new_email.as_ref().map(|opt| opt.as_deref()),
        hb9_exemption_elected: new_elected,
        hb9_notice_acknowledged: new_acknowledged,
    };

    let now = Utc::now().naive_utc();
    diesel::update(clients::table.find(client_id))
        .set((&changeset, clients::updated_at.eq(now)))
        .execute(&mut conn)?;

    let updated: Client = clients::table.find(client_id).first(&mut conn)?;
    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_CLIENT,
        client_id,
        ACTION_UPDATE,
        Some(old_snapshot),
        Some(snapshot(&updated)),
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(Json(to_client_response(updated)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let existing = load_client_scoped(&mut conn, user.firm_id, client_id)?;

    let now = Utc::now().naive_utc();
    diesel::update(clients::table.find(client_id))
        .set((clients::deleted_at.eq(now), clients::updated_at.eq(now)))
        .execute(&mut conn)?;

    audit::record_change(
        &mut conn,
        user.firm_id,
        ENTITY_CLIENT,
        client_id,
        ACTION_DELETE,
        Some(snapshot(&existing)),
        None,
        Some(user.user_id),
    )
    .map_err(AppError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Loads an active client and proves it belongs to the caller's firm. Every
/// nested resource handler goes through this before touching child rows.
pub(super) fn load_client_scoped(
    conn: &mut PgConnection,
    firm_id: Uuid,
    client_id: Uuid,
) -> AppResult<Client> {
    let client: Client = clients::table
        .find(client_id)
        .filter(clients::firm_id.eq(firm_id))
        .filter(clients::deleted_at.is_null())
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;
    Ok(client)
}

fn snapshot(client: &Client) -> Value {
    json!({
        "name": client.name,
        "contact_email": client.contact_email,
        "hb9_exemption_elected": client.hb9_exemption_elected,
        "hb9_notice_acknowledged": client.hb9_notice_acknowledged,
    })
}

fn to_client_response(client: Client) -> ClientResponse {
    ClientResponse {
        id: client.id,
        name: client.name,
        contact_email: client.contact_email,
        hb9: Hb9Settings {
            exemption_elected: client.hb9_exemption_elected,
            notice_acknowledged: client.hb9_notice_acknowledged,
        },
        created_at: to_iso(client.created_at),
        updated_at: to_iso(client.updated_at),
    }
}
