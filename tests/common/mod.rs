use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use renditions::auth::jwt::JwtService;
use renditions::config::AppConfig;
use renditions::db::{self, PgPool};
use renditions::models::{NewAsset, NewClient, NewFirm, NewFirmUser, NewJurisdiction, NewLocation};
use renditions::routes;
use renditions::state::AppState;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            invite_expiry_days: 7,
            sign_in_path: "/sign-in".to_string(),
            templates_dir: PathBuf::from("templates"),
            billing_checkout_url: Some("https://billing.test/checkout".to_string()),
            billing_portal_url: Some("https://billing.test/portal".to_string()),
            cors_allowed_origin: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(|conn| truncate_all(conn)).await
    }

    pub async fn insert_firm(&self, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let firm = NewFirm {
                id: Uuid::new_v4(),
                name,
                contact_email: None,
                billing_plan: "trial".to_string(),
                billing_status: "active".to_string(),
            };
            diesel::insert_into(renditions::schema::firms::table)
                .values(&firm)
                .execute(conn)
                .context("failed to insert firm")?;
            Ok(firm.id)
        })
        .await
    }

    pub async fn insert_user(&self, firm_id: Uuid, email: &str, role: &str) -> Result<Uuid> {
        let email = email.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let user = NewFirmUser {
                id: Uuid::new_v4(),
                firm_id,
                display_name: email
                    .split('@')
                    .next()
                    .unwrap_or("user")
                    .to_string(),
                email,
                role,
            };
            diesel::insert_into(renditions::schema::firm_users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub fn token_for(&self, user_id: Uuid, firm_id: Uuid, email: &str, role: &str) -> Result<String> {
        self.state.jwt.generate_token(user_id, firm_id, email, role)
    }

    #[allow(dead_code)]
    pub async fn insert_client(&self, firm_id: Uuid, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let client = NewClient {
                id: Uuid::new_v4(),
                firm_id,
                name,
                contact_email: None,
                hb9_exemption_elected: None,
                hb9_notice_acknowledged: None,
            };
            diesel::insert_into(renditions::schema::clients::table)
                .values(&client)
                .execute(conn)
                .context("failed to insert client")?;
            Ok(client.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_location(&self, client_id: Uuid, name: &str, state_code: &str) -> Result<Uuid> {
        let name = name.to_string();
        let state_code = state_code.to_string();
        self.with_conn(move |conn| {
            let location = NewLocation {
                id: Uuid::new_v4(),
                client_id,
                name,
                address: None,
                city: None,
                county: None,
                state: state_code,
                zip: None,
            };
            diesel::insert_into(renditions::schema::locations::table)
                .values(&location)
                .execute(conn)
                .context("failed to insert location")?;
            Ok(location.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_asset(
        &self,
        location_id: Uuid,
        description: &str,
        category: &str,
        acquisition_date: chrono::NaiveDate,
        acquisition_cost: f64,
    ) -> Result<Uuid> {
        let description = description.to_string();
        let category = category.to_string();
        self.with_conn(move |conn| {
            let asset = NewAsset {
                id: Uuid::new_v4(),
                location_id,
                description,
                category,
                acquisition_date,
                acquisition_cost,
            };
            diesel::insert_into(renditions::schema::assets::table)
                .values(&asset)
                .execute(conn)
                .context("failed to insert asset")?;
            Ok(asset.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_jurisdiction(
        &self,
        state_code: &str,
        county: &str,
        month: i32,
        day: i32,
    ) -> Result<Uuid> {
        let state_code = state_code.to_string();
        let county = county.to_string();
        self.with_conn(move |conn| {
            let jurisdiction = NewJurisdiction {
                id: Uuid::new_v4(),
                state: state_code,
                county,
                filing_deadline_month: month,
                filing_deadline_day: day,
                extension_deadline_month: None,
                extension_deadline_day: None,
            };
            diesel::insert_into(renditions::schema::jurisdictions::table)
                .values(&jurisdiction)
                .execute(conn)
                .context("failed to insert jurisdiction")?;
            Ok(jurisdiction.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn audit_count(&self, firm: Uuid, entity: &str) -> Result<i64> {
        let entity = entity.to_string();
        self.with_conn(move |conn| {
            use renditions::schema::audit_logs;
            let count: i64 = audit_logs::table
                .filter(audit_logs::firm_id.eq(firm))
                .filter(audit_logs::entity_type.eq(&entity))
                .count()
                .get_result(conn)
                .context("failed to count audit rows")?;
            Ok(count)
        })
        .await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::DELETE).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_to_json(body: Body) -> Result<Value> {
    let bytes = body_to_vec(body).await?;
    serde_json::from_slice(&bytes).context("response body is not valid JSON")
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE audit_logs, assets, locations, clients, firm_invites, firm_users, jurisdictions, form_templates, firms RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
