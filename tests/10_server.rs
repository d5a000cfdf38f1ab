mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

#[tokio::test]
async fn health_and_root_respond() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let server = common::ensure_server(&url).await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["database"], "ok");

    let res = client.get(format!("{}/", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let server = common::ensure_server(&url).await?;
    let username = common::unique("clerk");
    common::create_user(&url, &username, "right-password", false).await?;

    let client = reqwest::Client::new();
    let attempt = |user: String| {
        let client = client.clone();
        let endpoint = format!("{}/auth/login", server.base_url);
        async move {
            let res = client
                .post(endpoint)
                .json(&json!({ "username": user, "password": "wrong-password" }))
                .send()
                .await?;
            let status = res.status();
            let body: Value = res.json().await?;
            anyhow::Ok((status, body))
        }
    };

    let wrong = attempt(username).await?;
    let unknown = attempt(common::unique("ghost")).await?;
    assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
    Ok(())
}

#[tokio::test]
async fn upload_filter_report_and_logout() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let server = common::ensure_server(&url).await?;
    let username = common::unique("clerk");
    common::create_user(&url, &username, "clerk-password", false).await?;
    let token = common::login(server, &username, "clerk-password").await?;
    let client = reqwest::Client::new();
    let auth = format!("Bearer {}", token);

    // An explicit organization column keeps this test's rows apart from other data.
    let org = common::unique("Org");
    let csv = format!(
        "First name,Description,Organization\nAda,RS Secretary,{org}\nAlan,RS President,{org}\n"
    );
    let res = client
        .post(format!("{}/api/data/upload?file_name=members.csv", server.base_url))
        .header(header::AUTHORIZATION, &auth)
        .body(csv)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["rows_inserted"], 2);

    let res = client
        .get(format!("{}/api/data", server.base_url))
        .query(&[("organization", org.as_str())])
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["count"], 2);
    assert!(body["data"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["organization"] == org.as_str()));

    let res = client
        .get(format!("{}/api/report/pdf", server.base_url))
        .query(&[("organization", org.as_str())])
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(res.bytes().await?.starts_with(b"%PDF"));

    let res = client
        .delete(format!("{}/api/auth/session", server.base_url))
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn non_admins_cannot_list_users() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let server = common::ensure_server(&url).await?;
    let username = common::unique("clerk");
    common::create_user(&url, &username, "clerk-password", false).await?;
    let token = common::login(server, &username, "clerk-password").await?;

    let res = reqwest::Client::new()
        .get(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
