use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::{dsl::count_star, prelude::*};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    auth::{is_valid_role, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{FirmInvite, FirmUser, NewFirmInvite},
    schema::{firm_invites, firm_users},
    state::AppState,
    validate,
};

use super::to_iso;

#[derive(Serialize)]
pub struct FirmUserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct CreatedInviteResponse {
    #[serde(flatten)]
    pub invite: InviteResponse,
    /// Returned exactly once; only a hash is persisted.
    pub token: String,
}

#[derive(Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<FirmUserResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<FirmUser> = firm_users::table
        .filter(firm_users::firm_id.eq(user.firm_id))
        .filter(firm_users::deleted_at.is_null())
        .order(firm_users::email.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_user_response).collect()))
}

pub async fn create_invite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateInviteRequest>,
) -> AppResult<(StatusCode, Json<CreatedInviteResponse>)> {
    user.require_admin()?;

    let email = validate::email("email", &payload.email)?;
    let role = payload.role.trim().to_lowercase();
    if !is_valid_role(&role) {
        return Err(AppError::bad_request(format!("invalid role '{role}'")));
    }

    let mut conn = state.db()?;

    let already_member: i64 = firm_users::table
        .filter(firm_users::firm_id.eq(user.firm_id))
        .filter(firm_users::email.eq(&email))
        .filter(firm_users::deleted_at.is_null())
        .select(count_star())
        .first(&mut conn)?;
    if already_member > 0 {
        return Err(AppError::bad_request("user is already a member of the firm"));
    }

    let pending: i64 = firm_invites::table
        .filter(firm_invites::firm_id.eq(user.firm_id))
        .filter(firm_invites::email.eq(&email))
        .filter(firm_invites::accepted_at.is_null())
        .filter(firm_invites::revoked_at.is_null())
        .filter(firm_invites::expires_at.gt(Utc::now().naive_utc()))
        .select(count_star())
        .first(&mut conn)?;
    if pending > 0 {
        return Err(AppError::bad_request("an active invite already exists"));
    }

    let token = generate_invite_token();
    let now = Utc::now();
    let expires_at = now + ChronoDuration::days(state.config.invite_expiry_days);

    let new_invite = NewFirmInvite {
        id: Uuid::new_v4(),
        firm_id: user.firm_id,
        email,
        role,
        token_hash: hash_invite_token(&token),
        expires_at: expires_at.naive_utc(),
    };

    diesel::insert_into(firm_invites::table)
        .values(&new_invite)
        .execute(&mut conn)?;

    let invite: FirmInvite = firm_invites::table.find(new_invite.id).first(&mut conn)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedInviteResponse {
            invite: to_invite_response(invite),
            token,
        }),
    ))
}

pub async fn list_invites(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<InviteResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<FirmInvite> = firm_invites::table
        .filter(firm_invites::firm_id.eq(user.firm_id))
        .filter(firm_invites::accepted_at.is_null())
        .filter(firm_invites::revoked_at.is_null())
        .filter(firm_invites::expires_at.gt(Utc::now().naive_utc()))
        .order(firm_invites::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_invite_response).collect()))
}

pub async fn revoke_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let revoked = diesel::update(
        firm_invites::table
            .find(invite_id)
            .filter(firm_invites::firm_id.eq(user.firm_id))
            .filter(firm_invites::revoked_at.is_null()),
    )
    .set((
        firm_invites::revoked_at.eq(now),
        firm_invites::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    if revoked == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<FirmUserResponse>> {
    user.require_admin()?;

    let role = payload.role.trim().to_lowercase();
    if !is_valid_role(&role) {
        return Err(AppError::bad_request(format!("invalid role '{role}'")));
    }

    let mut conn = state.db()?;
    let member: FirmUser = firm_users::table
        .find(member_id)
        .filter(firm_users::firm_id.eq(user.firm_id))
        .filter(firm_users::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if member.role == crate::auth::ROLE_ADMIN && role != crate::auth::ROLE_ADMIN {
        ensure_not_last_admin(&mut conn, user.firm_id)?;
    }

    let now = Utc::now().naive_utc();
    diesel::update(firm_users::table.find(member_id))
        .set((firm_users::role.eq(&role), firm_users::updated_at.eq(now)))
        .execute(&mut conn)?;

    let updated: FirmUser = firm_users::table.find(member_id).first(&mut conn)?;
    Ok(Json(to_user_response(updated)))
}

pub async fn remove_user(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;

    if member_id == user.user_id {
        return Err(AppError::bad_request("cannot remove your own membership"));
    }

    let mut conn = state.db()?;
    let member: FirmUser = firm_users::table
        .find(member_id)
        .filter(firm_users::firm_id.eq(user.firm_id))
        .filter(firm_users::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if member.role == crate::auth::ROLE_ADMIN {
        ensure_not_last_admin(&mut conn, user.firm_id)?;
    }

    let now = Utc::now().naive_utc();
    diesel::update(firm_users::table.find(member_id))
        .set((
            firm_users::deleted_at.eq(now),
            firm_users::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

fn ensure_not_last_admin(
    conn: &mut diesel::PgConnection,
    firm_id: Uuid,
) -> AppResult<()> {
    let admins: i64 = firm_users::table
        .filter(firm_users::firm_id.eq(firm_id))
        .filter(firm_users::role.eq(crate::auth::ROLE_ADMIN))
        .filter(firm_users::deleted_at.is_null())
        .select(count_star())
        .first(conn)?;
    if admins <= 1 {
        return Err(AppError::bad_request(
            "firm must retain at least one administrator",
        ));
    }
    Ok(())
}

fn hash_invite_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn to_user_response(member: FirmUser) -> FirmUserResponse {
    FirmUserResponse {
        id: member.id,
        email: member.email,
        display_name: member.display_name,
        role: member.role,
        created_at: to_iso(member.created_at),
        updated_at: to_iso(member.updated_at),
    }
}

fn to_invite_response(invite: FirmInvite) -> InviteResponse {
    InviteResponse {
        id: invite.id,
        email: invite.email,
        role: invite.role,
        expires_at: to_iso(invite.expires_at),
        created_at: to_iso(invite.created_at),
    }
}
