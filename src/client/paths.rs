//! Pure path construction for every API operation. Optional filters that are
//! unset are omitted from the query string entirely.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use uuid::Uuid;

// Everything a query value cannot carry literally; hyphens and colons stay
// readable so UUIDs and dates round-trip unchanged.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'%')
    .add(b'?');

#[derive(Debug, Default, Clone)]
pub struct ClientListParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct AssetListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Clone)]
pub struct ExportParams {
    pub format: Option<String>,
    pub client_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub category: Option<String>,
}

struct QueryString {
    buffer: String,
}

impl QueryString {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn push(&mut self, key: &str, value: &str) {
        self.buffer
            .push(if self.buffer.is_empty() { '?' } else { '&' });
        self.buffer.push_str(key);
        self.buffer.push('=');
        self.buffer
            .push_str(&utf8_percent_encode(value, QUERY_ENCODE).to_string());
    }

    fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    fn finish(self) -> String {
        self.buffer
    }
}

pub fn clients(params: &ClientListParams) -> String {
    let mut query = QueryString::new();
    query.push_opt("search", params.search.as_deref());
    query.push_opt("limit", params.limit.map(|v| v.to_string()).as_deref());
    query.push_opt("offset", params.offset.map(|v| v.to_string()).as_deref());
    query.push_opt("sort", params.sort.as_deref());
    query.push_opt("order", params.order.as_deref());
    format!("/clients{}", query.finish())
}

pub fn client(id: Uuid) -> String {
    format!("/clients/{id}")
}

pub fn locations(client_id: Uuid) -> String {
    format!("/clients/{client_id}/locations")
}

pub fn location(client_id: Uuid, id: Uuid) -> String {
    format!("/clients/{client_id}/locations/{id}")
}

pub fn assets(client_id: Uuid, location_id: Uuid, params: &AssetListParams) -> String {
    let mut query = QueryString::new();
    query.push_opt("search", params.search.as_deref());
    query.push_opt("category", params.category.as_deref());
    query.push_opt("limit", params.limit.map(|v| v.to_string()).as_deref());
    query.push_opt("offset", params.offset.map(|v| v.to_string()).as_deref());
    format!(
        "/clients/{client_id}/locations/{location_id}/assets{}",
        query.finish()
    )
}

pub fn asset(client_id: Uuid, location_id: Uuid, id: Uuid) -> String {
    format!("/clients/{client_id}/locations/{location_id}/assets/{id}")
}

pub fn asset_summary(client_id: Uuid, location_id: Uuid) -> String {
    format!("/clients/{client_id}/locations/{location_id}/assets/summary")
}

pub fn firm_me() -> String {
    "/firms/me".to_string()
}

pub fn users() -> String {
    "/users".to_string()
}

pub fn user(id: Uuid) -> String {
    format!("/users/{id}")
}

pub fn user_role(id: Uuid) -> String {
    format!("/users/{id}/role")
}

pub fn user_invite() -> String {
    "/users/invite".to_string()
}

pub fn user_invites() -> String {
    "/users/invites".to_string()
}

pub fn user_invite_item(id: Uuid) -> String {
    format!("/users/invites/{id}")
}

pub fn billing() -> String {
    "/billing".to_string()
}

pub fn billing_checkout() -> String {
    "/billing/checkout".to_string()
}

pub fn billing_portal() -> String {
    "/billing/portal".to_string()
}

pub fn dashboard_stats(tax_year: Option<i32>) -> String {
    let mut query = QueryString::new();
    query.push_opt("taxYear", tax_year.map(|v| v.to_string()).as_deref());
    format!("/dashboard/stats{}", query.finish())
}

pub fn depreciation_preview(client_id: Uuid, location_id: Uuid, tax_year: Option<i32>) -> String {
    let mut query = QueryString::new();
    query.push_opt("taxYear", tax_year.map(|v| v.to_string()).as_deref());
    format!(
        "/clients/{client_id}/locations/{location_id}/depreciation/preview{}",
        query.finish()
    )
}

pub fn depreciation_overrides(client_id: Uuid, location_id: Uuid) -> String {
    format!("/clients/{client_id}/locations/{location_id}/depreciation/overrides")
}

pub fn counties(state: &str) -> String {
    let mut query = QueryString::new();
    query.push("state", state);
    format!("/jurisdictions/counties{}", query.finish())
}

pub fn export(entity: &str, params: &ExportParams) -> String {
    let mut query = QueryString::new();
    query.push_opt("format", params.format.as_deref());
    query.push_opt(
        "client_id",
        params.client_id.map(|v| v.to_string()).as_deref(),
    );
    query.push_opt(
        "location_id",
        params.location_id.map(|v| v.to_string()).as_deref(),
    );
    query.push_opt("category", params.category.as_deref());
    format!("/export/{entity}{}", query.finish())
}

pub fn health() -> String {
    "/health".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_with_no_filters_has_no_query_string() {
        assert_eq!(clients(&ClientListParams::default()), "/clients");
    }

    #[test]
    fn clients_with_all_filters() {
        let params = ClientListParams {
            search: Some("acme supply".to_string()),
            limit: Some(25),
            offset: Some(50),
            sort: Some("name".to_string()),
            order: Some("desc".to_string()),
        };
        assert_eq!(
            clients(&params),
            "/clients?search=acme%20supply&limit=25&offset=50&sort=name&order=desc"
        );
    }

    #[test]
    fn clients_omits_unset_filters() {
        let params = ClientListParams {
            offset: Some(10),
            ..Default::default()
        };
        assert_eq!(clients(&params), "/clients?offset=10");
    }

    #[test]
    fn nested_resource_paths() {
        let c = Uuid::nil();
        let l = Uuid::nil();
        let a = Uuid::nil();
        assert_eq!(
            locations(c),
            "/clients/00000000-0000-0000-0000-000000000000/locations"
        );
        assert_eq!(
            asset(c, l, a),
            "/clients/00000000-0000-0000-0000-000000000000/locations/00000000-0000-0000-0000-000000000000/assets/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            asset_summary(c, l),
            "/clients/00000000-0000-0000-0000-000000000000/locations/00000000-0000-0000-0000-000000000000/assets/summary"
        );
    }

    #[test]
    fn assets_with_category_filter_only() {
        let params = AssetListParams {
            category: Some("machinery".to_string()),
            ..Default::default()
        };
        let path = assets(Uuid::nil(), Uuid::nil(), &params);
        assert!(path.ends_with("/assets?category=machinery"));
    }

    #[test]
    fn fixed_paths() {
        assert_eq!(firm_me(), "/firms/me");
        assert_eq!(users(), "/users");
        assert_eq!(user_invite(), "/users/invite");
        assert_eq!(user_invites(), "/users/invites");
        assert_eq!(billing(), "/billing");
        assert_eq!(billing_checkout(), "/billing/checkout");
        assert_eq!(billing_portal(), "/billing/portal");
        assert_eq!(health(), "/health");
    }

    #[test]
    fn dashboard_stats_tax_year() {
        assert_eq!(dashboard_stats(None), "/dashboard/stats");
        assert_eq!(dashboard_stats(Some(2026)), "/dashboard/stats?taxYear=2026");
    }

    #[test]
    fn depreciation_paths() {
        let c = Uuid::nil();
        let l = Uuid::nil();
        assert_eq!(
            depreciation_preview(c, l, Some(2026)),
            "/clients/00000000-0000-0000-0000-000000000000/locations/00000000-0000-0000-0000-000000000000/depreciation/preview?taxYear=2026"
        );
        assert_eq!(
            depreciation_overrides(c, l),
            "/clients/00000000-0000-0000-0000-000000000000/locations/00000000-0000-0000-0000-000000000000/depreciation/overrides"
        );
    }

    #[test]
    fn counties_encodes_state() {
        assert_eq!(counties("TX"), "/jurisdictions/counties?state=TX");
    }

    #[test]
    fn export_with_filters() {
        let params = ExportParams {
            format: Some("csv".to_string()),
            client_id: Some(Uuid::nil()),
            ..Default::default()
        };
        assert_eq!(
            export("assets", &params),
            "/export/assets?format=csv&client_id=00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn export_without_filters() {
        assert_eq!(export("clients", &ExportParams::default()), "/export/clients");
    }
}
