use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = firms)]
pub struct Firm {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub billing_plan: String,
    pub billing_status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = firms)]
pub struct NewFirm {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub billing_plan: String,
    pub billing_status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = firm_users)]
#[diesel(belongs_to(Firm))]
pub struct FirmUser {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = firm_users)]
pub struct NewFirmUser {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = firm_invites)]
#[diesel(belongs_to(Firm))]
pub struct FirmInvite {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub email: String,
    pub role: String,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
    pub accepted_at: Option<NaiveDateTime>,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = firm_invites)]
pub struct NewFirmInvite {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub email: String,
    pub role: String,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = clients)]
#[diesel(belongs_to(Firm))]
pub struct Client {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub hb9_exemption_elected: Option<bool>,
    pub hb9_notice_acknowledged: Option<bool>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub hb9_exemption_elected: Option<bool>,
    pub hb9_notice_acknowledged: Option<bool>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = locations)]
#[diesel(belongs_to(Client))]
pub struct Location {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: String,
    pub zip: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = locations)]
pub struct NewLocation {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: String,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = assets)]
#[diesel(belongs_to(Location))]
pub struct Asset {
    pub id: Uuid,
    pub location_id: Uuid,
    pub description: String,
    pub category: String,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: f64,
    pub fmv_override: Option<f64>,
    pub fmv_override_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = assets)]
pub struct NewAsset {
    pub id: Uuid,
    pub location_id: Uuid,
    pub description: String,
    pub category: String,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: f64,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = jurisdictions)]
pub struct Jurisdiction {
    pub id: Uuid,
    pub state: String,
    pub county: String,
    pub filing_deadline_month: i32,
    pub filing_deadline_day: i32,
    pub extension_deadline_month: Option<i32>,
    pub extension_deadline_day: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jurisdictions)]
pub struct NewJurisdiction {
    pub id: Uuid,
    pub state: String,
    pub county: String,
    pub filing_deadline_month: i32,
    pub filing_deadline_day: i32,
    pub extension_deadline_month: Option<i32>,
    pub extension_deadline_day: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = audit_logs)]
pub struct AuditLog {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub changed_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub changed_by: Option<Uuid>,
}

// Reserved for the form pre-fill workflow; no routes reference this yet.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = form_templates)]
pub struct FormTemplate {
    pub id: Uuid,
    pub state: String,
    pub form_name: String,
    pub version: String,
    pub template_path: Option<String>,
    pub field_mappings: Option<Value>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = form_templates)]
pub struct NewFormTemplate {
    pub id: Uuid,
    pub state: String,
    pub form_name: String,
    pub version: String,
    pub template_path: Option<String>,
    pub field_mappings: Option<Value>,
    pub notes: Option<String>,
}
