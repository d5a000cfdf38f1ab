#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use csv_explorer::auth::{provision_user, NewAccount};
use csv_explorer::database::{schema, PgGateway};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Postgres-backed tests run only when this is set.
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|v| !v.is_empty())
}

pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Gateway over a private, freshly migrated schema.
pub async fn isolated_gateway(url: &str) -> Result<(PgGateway, String)> {
    let (pool, schema_name) = isolated_pool(url).await?;
    schema::migrate(&pool).await?;
    Ok((PgGateway::new(pool), schema_name))
}

/// Pool pinned to a private, empty schema.
pub async fn isolated_pool(url: &str) -> Result<(PgPool, String)> {
    let schema_name = unique("csvx_test");
    let admin = PgPool::connect(url).await?;
    sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
        .execute(&admin)
        .await?;
    admin.close().await;

    let search_path = format!("SET search_path TO {}", schema_name);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .after_connect(move |conn, _meta| {
            let sql = search_path.clone();
            Box::pin(async move {
                sqlx::query(&sql).execute(conn).await?;
                Ok(())
            })
        })
        .connect(url)
        .await?;
    Ok((pool, schema_name))
}

pub async fn drop_schema(gateway: &PgGateway, schema_name: &str) -> Result<()> {
    sqlx::query(&format!("DROP SCHEMA {} CASCADE", schema_name))
        .execute(gateway.pool())
        .await?;
    Ok(())
}

/// Create a user in the database the spawned server uses.
pub async fn create_user(url: &str, username: &str, password: &str, is_admin: bool) -> Result<()> {
    let pool = PgPool::connect(url).await?;
    schema::migrate(&pool).await?;
    let gateway = PgGateway::new(pool);
    provision_user(
        &gateway,
        NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            is_admin,
            email: None,
        },
    )
    .await?;
    gateway.pool().close().await;
    Ok(())
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(database_url: &str) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_csv-explorer"));
        cmd.env("PORT", port.to_string())
            .env("DATABASE_URL", database_url)
            .env("EMAIL_FAILURE_LOG", std::env::temp_dir().join("csvx_test_email_failures.log"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server(database_url: &str) -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn(database_url).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
    let body: serde_json::Value = res.json().await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no token")
}
