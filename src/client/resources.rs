use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use super::paths::{self, AssetListParams, ClientListParams, ExportParams};
use super::{ApiClient, ApiError};

/// A triggered export: the server's suggested filename plus the raw payload.
#[derive(Debug, Clone)]
pub struct ExportDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    // -- clients ----------------------------------------------------------

    pub async fn list_clients(&self, params: &ClientListParams) -> Result<Value, ApiError> {
        self.get_cached(&paths::clients(params)).await
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Value, ApiError> {
        self.get_cached(&paths::client(id)).await
    }

    pub async fn create_client(&self, body: &Value) -> Result<Option<Value>, ApiError> {
        let result = self.request(Method::POST, "/clients", Some(body)).await?;
        self.invalidate("/clients");
        Ok(result)
    }

    pub async fn update_client(&self, id: Uuid, body: &Value) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::PATCH, &paths::client(id), Some(body))
            .await?;
        self.invalidate("/clients");
        Ok(result)
    }

    pub async fn delete_client(&self, id: Uuid) -> Result<(), ApiError> {
        self.request(Method::DELETE, &paths::client(id), None).await?;
        self.invalidate("/clients");
        Ok(())
    }

    // -- locations --------------------------------------------------------

    pub async fn list_locations(&self, client_id: Uuid) -> Result<Value, ApiError> {
        self.get_cached(&paths::locations(client_id)).await
    }

    pub async fn get_location(&self, client_id: Uuid, id: Uuid) -> Result<Value, ApiError> {
        self.get_cached(&paths::location(client_id, id)).await
    }

    pub async fn create_location(
        &self,
        client_id: Uuid,
        body: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::POST, &paths::locations(client_id), Some(body))
            .await?;
        self.invalidate(&paths::locations(client_id));
        Ok(result)
    }

    pub async fn update_location(
        &self,
        client_id: Uuid,
        id: Uuid,
        body: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::PATCH, &paths::location(client_id, id), Some(body))
            .await?;
        self.invalidate(&paths::locations(client_id));
        Ok(result)
    }

    pub async fn delete_location(&self, client_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        self.request(Method::DELETE, &paths::location(client_id, id), None)
            .await?;
        self.invalidate(&paths::locations(client_id));
        Ok(())
    }

    // -- assets -----------------------------------------------------------

    pub async fn list_assets(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        params: &AssetListParams,
    ) -> Result<Value, ApiError> {
        self.get_cached(&paths::assets(client_id, location_id, params))
            .await
    }

    pub async fn get_asset(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        id: Uuid,
    ) -> Result<Value, ApiError> {
        self.get_cached(&paths::asset(client_id, location_id, id))
            .await
    }

    pub async fn asset_summary(
        &self,
        client_id: Uuid,
        location_id: Uuid,
    ) -> Result<Value, ApiError> {
        self.get_cached(&paths::asset_summary(client_id, location_id))
            .await
    }

    pub async fn create_asset(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        body: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(
                Method::POST,
                &paths::assets(client_id, location_id, &AssetListParams::default()),
                Some(body),
            )
            .await?;
        self.invalidate_location_reads(client_id, location_id);
        Ok(result)
    }

    pub async fn update_asset(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        id: Uuid,
        body: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(
                Method::PATCH,
                &paths::asset(client_id, location_id, id),
                Some(body),
            )
            .await?;
        self.invalidate_location_reads(client_id, location_id);
        Ok(result)
    }

    pub async fn delete_asset(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        id: Uuid,
    ) -> Result<(), ApiError> {
        self.request(Method::DELETE, &paths::asset(client_id, location_id, id), None)
            .await?;
        self.invalidate_location_reads(client_id, location_id);
        Ok(())
    }

    // Asset mutations change summaries and depreciation previews too; all of
    // those reads share the location prefix.
    fn invalidate_location_reads(&self, client_id: Uuid, location_id: Uuid) {
        self.invalidate(&format!(
            "/clients/{client_id}/locations/{location_id}"
        ));
    }

    // -- firm / users -----------------------------------------------------

    pub async fn get_firm(&self) -> Result<Value, ApiError> {
        self.get_cached(&paths::firm_me()).await
    }

    pub async fn update_firm(&self, body: &Value) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::PATCH, &paths::firm_me(), Some(body))
            .await?;
        self.invalidate(&paths::firm_me());
        Ok(result)
    }

    pub async fn list_users(&self) -> Result<Value, ApiError> {
        self.get_cached(&paths::users()).await
    }

    pub async fn invite_user(&self, body: &Value) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::POST, &paths::user_invite(), Some(body))
            .await?;
        self.invalidate("/users");
        Ok(result)
    }

    pub async fn list_invites(&self) -> Result<Value, ApiError> {
        self.get_cached(&paths::user_invites()).await
    }

    pub async fn revoke_invite(&self, id: Uuid) -> Result<(), ApiError> {
        self.request(Method::DELETE, &paths::user_invite_item(id), None)
            .await?;
        self.invalidate("/users");
        Ok(())
    }

    pub async fn update_user_role(&self, id: Uuid, body: &Value) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(Method::PATCH, &paths::user_role(id), Some(body))
            .await?;
        self.invalidate("/users");
        Ok(result)
    }

    pub async fn remove_user(&self, id: Uuid) -> Result<(), ApiError> {
        self.request(Method::DELETE, &paths::user(id), None).await?;
        self.invalidate("/users");
        Ok(())
    }

    // -- billing / dashboard / depreciation / jurisdictions ---------------

    pub async fn get_billing(&self) -> Result<Value, ApiError> {
        self.get_cached(&paths::billing()).await
    }

    pub async fn start_checkout(&self) -> Result<Option<Value>, ApiError> {
        self.request(Method::POST, &paths::billing_checkout(), None)
            .await
    }

    pub async fn open_billing_portal(&self) -> Result<Option<Value>, ApiError> {
        self.request(Method::POST, &paths::billing_portal(), None)
            .await
    }

    pub async fn dashboard_stats(&self, tax_year: Option<i32>) -> Result<Value, ApiError> {
        self.get_cached(&paths::dashboard_stats(tax_year)).await
    }

    pub async fn depreciation_preview(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        tax_year: Option<i32>,
    ) -> Result<Value, ApiError> {
        self.get_cached(&paths::depreciation_preview(client_id, location_id, tax_year))
            .await
    }

    pub async fn update_fmv_overrides(
        &self,
        client_id: Uuid,
        location_id: Uuid,
        body: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let result = self
            .request(
                Method::PATCH,
                &paths::depreciation_overrides(client_id, location_id),
                Some(body),
            )
            .await?;
        self.invalidate_location_reads(client_id, location_id);
        Ok(result)
    }

    pub async fn list_counties(&self, state: &str) -> Result<Value, ApiError> {
        self.get_cached(&paths::counties(state)).await
    }

    // -- export / health --------------------------------------------------

    pub async fn export(
        &self,
        entity: &str,
        params: &ExportParams,
    ) -> Result<ExportDownload, ApiError> {
        let path = paths::export(entity, params);
        let (headers, bytes) = self.request_bytes(&path).await?;

        let filename = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| format!("{entity}.csv"));

        Ok(ExportDownload { filename, bytes })
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        Ok(self
            .request(Method::GET, &paths::health(), None)
            .await?
            .unwrap_or(Value::Null))
    }
}

fn filename_from_content_disposition(value: &str) -> Option<String> {
    let marker = value.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
    })?;
    let trimmed = marker.trim().trim_matches('"');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
