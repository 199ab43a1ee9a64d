mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn client_crud_flow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let firm_id = app.insert_firm("Hargrove & Finch CPAs").await?;
    let user_id = app.insert_user(firm_id, "pat@hargrove.test", "admin").await?;
    let token = app.token_for(user_id, firm_id, "pat@hargrove.test", "admin")?;

    let create = app
        .post_json(
            "/api/clients",
            &json!({
                "name": "Acme Fabrication",
                "contact_email": "ap@acme.test",
                "hb9": { "exemption_elected": true }
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_to_json(create.into_body()).await?;
    assert_eq!(created["name"], "Acme Fabrication");
    assert_eq!(created["contact_email"], "ap@acme.test");
    assert_eq!(created["hb9"]["exemption_elected"], true);
    let client_id = created["id"].as_str().unwrap().to_string();

    let get = app
        .get(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(get.status(), StatusCode::OK);

    let update = app
        .patch_json(
            &format!("/api/clients/{client_id}"),
            &json!({ "name": "Acme Fabrication LLC", "contact_email": "" }),
            Some(&token),
        )
        .await?;
    assert_eq!(update.status(), StatusCode::OK);
    let updated = body_to_json(update.into_body()).await?;
    assert_eq!(updated["name"], "Acme Fabrication LLC");
    assert!(updated["contact_email"].is_null());

    let blank_name = app
        .patch_json(
            &format!("/api/clients/{client_id}"),
            &json!({ "name": "   " }),
            Some(&token),
        )
        .await?;
    assert_eq!(blank_name.status(), StatusCode::BAD_REQUEST);
    let error = body_to_json(blank_name.into_body()).await?;
    assert!(error["message"].as_str().unwrap().contains("name"));

    let delete = app
        .delete(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let after_delete = app
        .get(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(after_delete.status(), StatusCode::NOT_FOUND);

    let list = app.get("/api/clients", Some(&token)).await?;
    assert_eq!(list.status(), StatusCode::OK);
    let listed = body_to_json(list.into_body()).await?;
    assert_eq!(listed["total"], 0);

    // create, update, delete all leave a trail
    assert_eq!(app.audit_count(firm_id, "client").await?, 3);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn client_search_and_sort() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let firm_id = app.insert_firm("Search Firm").await?;
    let user_id = app.insert_user(firm_id, "s@firm.test", "member").await?;
    let token = app.token_for(user_id, firm_id, "s@firm.test", "member")?;

    for name in ["Beacon Foods", "Anchor Tools", "Beacon Motors"] {
        let created = app
            .post_json("/api/clients", &json!({ "name": name }), Some(&token))
            .await?;
        assert_eq!(created.status(), StatusCode::CREATED);
    }

    let search = app
        .get("/api/clients?search=beacon", Some(&token))
        .await?;
    let found = body_to_json(search.into_body()).await?;
    assert_eq!(found["total"], 2);
    assert_eq!(found["items"][0]["name"], "Beacon Foods");

    let sorted = app
        .get("/api/clients?sort=name&order=desc&limit=1", Some(&token))
        .await?;
    let page = body_to_json(sorted.into_body()).await?;
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["name"], "Beacon Motors");

    let bad_sort = app.get("/api/clients?sort=balance", Some(&token)).await?;
    assert_eq!(bad_sort.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn clients_are_isolated_per_firm() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let firm_a = app.insert_firm("Firm A").await?;
    let firm_b = app.insert_firm("Firm B").await?;
    let user_a = app.insert_user(firm_a, "a@a.test", "admin").await?;
    let user_b = app.insert_user(firm_b, "b@b.test", "admin").await?;
    let token_a = app.token_for(user_a, firm_a, "a@a.test", "admin")?;
    let token_b = app.token_for(user_b, firm_b, "b@b.test", "admin")?;

    let client_id = app.insert_client(firm_a, "Firm A Client").await?;

    let cross = app
        .get(&format!("/api/clients/{client_id}"), Some(&token_b))
        .await?;
    assert_eq!(cross.status(), StatusCode::NOT_FOUND);

    let own = app
        .get(&format!("/api/clients/{client_id}"), Some(&token_a))
        .await?;
    assert_eq!(own.status(), StatusCode::OK);

    let unauthenticated = app.get("/api/clients", None).await?;
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}
