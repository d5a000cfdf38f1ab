mod common;

use anyhow::Result;

use sha2::{Digest, Sha256};

use csv_explorer::auth::{AuthGate, SessionStore};
use csv_explorer::database::models::NewBatch;
use csv_explorer::database::{schema, PersistenceGateway, PgGateway};
use csv_explorer::ingest::{
    IngestionError, Ingestor, NewColumn, NormalizedBatch, NormalizedRow,
};
use csv_explorer::types::OrgFilter;

fn column(name: &str) -> NewColumn {
    NewColumn {
        name: name.to_string(),
        label: name.to_string(),
    }
}

#[tokio::test]
async fn add_columns_is_idempotent() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;

    gateway.add_columns(&[column("ward"), column("phone")]).await?;
    gateway.add_columns(&[column("phone"), column("email")]).await?;

    let names: Vec<_> = gateway.known_columns().await?.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["ward", "phone", "email"]);

    common::drop_schema(&gateway, &schema).await
}

#[tokio::test]
async fn later_columns_read_null_for_earlier_rows() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;
    let ingestor = Ingestor::default();

    ingestor
        .ingest(&gateway, b"First name,Description\nAda,RS Secretary\n", NewBatch::new("test", None))
        .await?;
    let second = ingestor
        .ingest(&gateway, b"First name,Ward\nAlan,2nd\n", NewBatch::new("test", None))
        .await?;
    assert_eq!(second.new_columns.len(), 1);

    let rows = gateway.query_by_organization(&OrgFilter::All).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("ward"), None);
    assert!(rows[0].values.contains_key("ward"));
    assert_eq!(rows[1].get("ward"), Some("2nd"));
    assert_eq!(rows[1].get("description"), None);
    assert_eq!(rows[1].organization, "(blank org)");

    common::drop_schema(&gateway, &schema).await
}

#[tokio::test]
async fn failed_insert_rolls_back_new_columns() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;

    // The second column name is not a safe identifier, so the insert fails
    // after the first column has been added inside the same transaction.
    let batch = NormalizedBatch {
        columns: vec!["ward".to_string(), "Not Safe".to_string()],
        new_columns: vec![column("ward")],
        rows: vec![NormalizedRow {
            organization: "RS".to_string(),
            values: vec![Some("2nd".to_string()), None],
        }],
    };
    let err = gateway
        .apply_batch(&batch, &NewBatch::new("test", None))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Insert(_)));

    assert!(gateway.known_columns().await?.is_empty());
    assert!(gateway.list_batches().await?.is_empty());
    let (present,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = 'users_data' AND column_name = 'ward')",
    )
    .bind(&schema)
    .fetch_one(gateway.pool())
    .await?;
    assert!(!present);

    common::drop_schema(&gateway, &schema).await
}

#[tokio::test]
async fn organization_filter_is_exact_and_all_is_the_union() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;

    let csv = b"Description,User role\nRS Secretary,Member\nrs helper,Member\nBishop,Manager\n,Member\n";
    Ingestor::default().ingest(&gateway, csv, NewBatch::new("test", None)).await?;

    let rs = gateway.query_by_organization(&OrgFilter::Exact("RS".into())).await?;
    assert_eq!(rs.len(), 1);

    let mut union = 0;
    for org in gateway.organizations().await? {
        union += gateway
            .query_by_organization(&OrgFilter::Exact(org.organization))
            .await?
            .len();
    }
    assert_eq!(union, gateway.query_by_organization(&OrgFilter::All).await?.len());
    assert_eq!(union, 4);

    common::drop_schema(&gateway, &schema).await
}

#[tokio::test]
async fn same_file_twice_adds_rows_twice() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;
    let csv = b"First name\nAda\nAlan\n";

    let ingestor = Ingestor::default();
    let first = ingestor.ingest(&gateway, csv, NewBatch::new("test", None)).await?;
    ingestor.ingest(&gateway, csv, NewBatch::new("test", None)).await?;
    assert_eq!(gateway.query_by_organization(&OrgFilter::All).await?.len(), 4);
    assert_eq!(gateway.list_batches().await?.len(), 2);

    let removed = gateway.delete_batch(first.batch.unwrap().id).await?;
    assert_eq!(removed, 2);
    assert_eq!(gateway.query_by_organization(&OrgFilter::All).await?.len(), 2);

    common::drop_schema(&gateway, &schema).await
}

fn ward_batch(organization: &str, ward: &str) -> NormalizedBatch {
    NormalizedBatch {
        columns: vec!["ward".to_string()],
        new_columns: vec![column("ward")],
        rows: vec![
            NormalizedRow {
                organization: organization.to_string(),
                values: vec![Some(ward.to_string())],
            },
            NormalizedRow {
                organization: organization.to_string(),
                values: vec![None],
            },
        ],
    }
}

#[tokio::test]
async fn concurrent_uploads_adding_the_same_column_both_commit() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (gateway, schema) = common::isolated_gateway(&url).await?;

    let (first_batch, second_batch) = (ward_batch("RS", "1st"), ward_batch("EQ", "2nd"));
    let (first_meta, second_meta) = (NewBatch::new("one", None), NewBatch::new("two", None));
    let (first, second) = tokio::join!(
        gateway.apply_batch(&first_batch, &first_meta),
        gateway.apply_batch(&second_batch, &second_meta),
    );
    assert_eq!(first?.row_count, 2);
    assert_eq!(second?.row_count, 2);

    let names: Vec<_> = gateway.known_columns().await?.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["ward"]);

    let rows = gateway.query_by_organization(&OrgFilter::All).await?;
    assert_eq!(rows.len(), 4);
    assert_eq!(gateway.query_by_organization(&OrgFilter::Exact("RS".into())).await?.len(), 2);
    assert_eq!(gateway.query_by_organization(&OrgFilter::Exact("EQ".into())).await?.len(), 2);
    assert_eq!(gateway.list_batches().await?.len(), 2);

    common::drop_schema(&gateway, &schema).await
}

#[tokio::test]
async fn migrate_upgrades_a_legacy_users_table() -> Result<()> {
    let Some(url) = common::database_url() else { return Ok(()) };
    let (pool, schema_name) = common::isolated_pool(&url).await?;

    sqlx::query(
        "CREATE TABLE users (
            id SERIAL PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            is_admin BOOLEAN DEFAULT FALSE
        )",
    )
    .execute(&pool)
    .await?;
    sqlx::query("INSERT INTO users (username, password, is_admin) VALUES ($1, $2, TRUE), ($3, $4, NULL)")
        .bind("admin")
        .bind(format!("{:x}", Sha256::digest(b"admin")))
        .bind("clerk")
        .bind(format!("{:x}", Sha256::digest(b"clerk-pass")))
        .execute(&pool)
        .await?;

    schema::migrate(&pool).await?;
    schema::migrate(&pool).await?;
    let gateway = PgGateway::new(pool);

    let clerk = gateway.get_user("clerk").await?.expect("clerk survives the migration");
    assert!(!clerk.is_admin);
    assert_eq!(clerk.email, None);

    let gate = AuthGate::new(SessionStore::new("secret", 1));
    let (session, _) = gate.login(&gateway, "admin", "admin").await?;
    assert!(session.is_admin);

    let admin = gateway.get_user("admin").await?.expect("admin exists");
    assert!(admin.password_hash.starts_with("$argon2"));
    gate.login(&gateway, "admin", "admin").await?;

    common::drop_schema(&gateway, &schema_name).await
}
