use serde_json::json;

use crate::auth::bootstrap_admin;
use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::schema;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let gateway = connect(config).await?;
    schema::migrate(gateway.pool()).await?;

    let created = bootstrap_admin(&gateway, &config.security.bootstrap_admin_password).await?;
    let message = if created {
        "Database initialized; created user 'admin' (change its password)"
    } else {
        "Database initialized; users already exist"
    };

    output_success(&output_format, message, Some(json!({ "admin_created": created })))
}
