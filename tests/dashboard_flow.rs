mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{acquire_db_lock, body_to_json, TestApp};

#[tokio::test]
async fn dashboard_stats_and_deadlines() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let firm_id = app.insert_firm("Stats Firm").await?;
    let user_id = app.insert_user(firm_id, "s@firm.test", "member").await?;
    let token = app.token_for(user_id, firm_id, "s@firm.test", "member")?;

    app.insert_jurisdiction("TX", "Tarrant", 4, 15).await?;
    app.insert_jurisdiction("TX", "Dallas", 4, 1).await?;

    let client_id = app.insert_client(firm_id, "Stats Client").await?;
    let location_id = app.insert_location(client_id, "HQ", "TX").await?;
    app.patch_json(
        &format!("/api/clients/{client_id}/locations/{location_id}"),
        &serde_json::json!({ "county": "Tarrant" }),
        Some(&token),
    )
    .await?;
    app.insert_asset(
        location_id,
        "Server rack",
        "computers",
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        18_000.0,
    )
    .await?;
    app.insert_asset(
        location_id,
        "Desks",
        "furniture",
        NaiveDate::from_ymd_opt(2022, 9, 1).unwrap(),
        6_000.0,
    )
    .await?;

    let stats = app
        .get("/api/dashboard/stats?taxYear=2026", Some(&token))
        .await?;
    assert_eq!(stats.status(), StatusCode::OK);
    let body = body_to_json(stats.into_body()).await?;
    assert_eq!(body["tax_year"], 2026);
    assert_eq!(body["clients"], 1);
    assert_eq!(body["locations"], 1);
    assert_eq!(body["assets"], 2);
    assert_eq!(body["total_acquisition_cost"], 24_000.0);

    let deadlines = body["upcoming_deadlines"].as_array().unwrap();
    // only counties where the firm actually has locations
    assert_eq!(deadlines.len(), 1);
    assert_eq!(deadlines[0]["county"], "Tarrant");
    assert_eq!(deadlines[0]["filing_deadline"], "2026-04-15");

    let bad_year = app
        .get("/api/dashboard/stats?taxYear=3000", Some(&token))
        .await?;
    assert_eq!(bad_year.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn county_listing() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let firm_id = app.insert_firm("County Firm").await?;
    let user_id = app.insert_user(firm_id, "c@firm.test", "member").await?;
    let token = app.token_for(user_id, firm_id, "c@firm.test", "member")?;

    app.insert_jurisdiction("TX", "Travis", 4, 15).await?;
    app.insert_jurisdiction("TX", "Bexar", 4, 15).await?;
    app.insert_jurisdiction("OK", "Tulsa", 3, 15).await?;

    let counties = app
        .get("/api/jurisdictions/counties?state=tx", Some(&token))
        .await?;
    assert_eq!(counties.status(), StatusCode::OK);
    let body = body_to_json(counties.into_body()).await?;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // alphabetical
    assert_eq!(rows[0]["county"], "Bexar");
    assert_eq!(rows[1]["county"], "Travis");
    assert_eq!(rows[0]["filing_deadline_month"], 4);

    let bad_state = app
        .get("/api/jurisdictions/counties?state=Texas", Some(&token))
        .await?;
    assert_eq!(bad_state.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
