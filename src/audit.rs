use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::NewAuditLog;
use crate::schema::audit_logs;

pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";

pub const ENTITY_FIRM: &str = "firm";
pub const ENTITY_CLIENT: &str = "client";
pub const ENTITY_LOCATION: &str = "location";
pub const ENTITY_ASSET: &str = "asset";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Appends one audit row. The table is append-only; there is no update or
/// delete counterpart.
pub fn record_change(
    conn: &mut PgConnection,
    firm_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
    action: &str,
    old_value: Option<Value>,
    new_value: Option<Value>,
    changed_by: Option<Uuid>,
) -> Result<(), AuditError> {
    let entry = NewAuditLog {
        id: Uuid::new_v4(),
        firm_id,
        entity_type: entity_type.to_string(),
        entity_id,
        action: action.to_string(),
        old_value,
        new_value,
        changed_by,
    };

    diesel::insert_into(audit_logs::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}
