use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::ingest::organization::OrgRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub smtp: SmtpConfig,
    pub report: ReportConfig,
    pub organization: OrganizationConfig,
    pub email_failure_log: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; assembled from PG* variables when DATABASE_URL is absent.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_ttl_hours: u64,
    #[serde(skip_serializing)]
    pub bootstrap_admin_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from: Option<String>,
    pub starttls: bool,
    pub timeout_secs: u64,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.from.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub default_columns: Vec<String>,
    pub sort_column: String,
    pub activation_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub blank_label: String,
    pub rules: Vec<OrgRule>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("PORT").ok().or_else(|| env::var("CSV_EXPLORER_PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = v.parse().unwrap_or(self.server.max_upload_bytes);
        }

        // Database overrides
        self.database.url = env::var("DATABASE_URL").ok().or_else(Self::url_from_pg_vars);
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            if !v.trim().is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("SESSION_TTL_HOURS") {
            self.security.session_ttl_hours = v.parse().unwrap_or(self.security.session_ttl_hours);
        }
        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_PASSWORD") {
            if !v.is_empty() {
                self.security.bootstrap_admin_password = v;
            }
        }

        // SMTP overrides
        self.smtp.host = non_empty_var("SMTP_HOST");
        self.smtp.username = non_empty_var("SMTP_USERNAME");
        self.smtp.password = non_empty_var("SMTP_PASSWORD");
        self.smtp.from = non_empty_var("SMTP_FROM").or_else(|| self.smtp.username.clone());
        if let Ok(v) = env::var("SMTP_PORT") {
            self.smtp.port = v.parse().unwrap_or(self.smtp.port);
        }
        if let Ok(v) = env::var("SMTP_STARTTLS") {
            self.smtp.starttls = v.parse().unwrap_or(self.smtp.starttls);
        }
        if let Ok(v) = env::var("SMTP_TIMEOUT_SECS") {
            self.smtp.timeout_secs = v.parse().unwrap_or(self.smtp.timeout_secs);
        }

        // Report overrides
        if let Ok(v) = env::var("REPORT_COLUMNS") {
            self.report.default_columns = split_list(&v);
        }
        if let Ok(v) = env::var("REPORT_SORT_COLUMN") {
            self.report.sort_column = v.trim().to_string();
        }
        if let Ok(v) = env::var("REPORT_ACTIVATION_COLUMN") {
            self.report.activation_column = v.trim().to_string();
        }

        // Organization overrides
        if let Ok(v) = env::var("ORG_BLANK_LABEL") {
            self.organization.blank_label = v;
        }
        if let Ok(v) = env::var("ORG_RULES") {
            match OrgRule::parse_list(&v) {
                Ok(rules) => self.organization.rules = rules,
                Err(e) => tracing::warn!("Ignoring ORG_RULES: {}", e),
            }
        }

        if let Ok(v) = env::var("EMAIL_FAILURE_LOG") {
            self.email_failure_log = PathBuf::from(v);
        }

        self
    }

    /// Assemble a connection string from the discrete libpq-style variables.
    fn url_from_pg_vars() -> Option<String> {
        let host = env::var("PGHOST").ok()?;
        let port = env::var("PGPORT").unwrap_or_else(|_| "5432".to_string());
        let database = env::var("PGDATABASE").unwrap_or_else(|_| "postgres".to_string());

        let mut url = url::Url::parse(&format!("postgres://{}:{}/", host, port)).ok()?;
        url.set_path(&format!("/{}", database));
        if let Ok(user) = env::var("PGUSER") {
            url.set_username(&user).ok()?;
        }
        if let Ok(password) = env::var("PGPASSWORD") {
            url.set_password(Some(&password)).ok()?;
        }
        Some(url.into())
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                port: 8501,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: random_secret(),
                session_ttl_hours: 12,
                bootstrap_admin_password: "admin".to_string(),
            },
            smtp: SmtpConfig {
                host: None,
                port: 587,
                username: None,
                password: None,
                from: None,
                starttls: true,
                timeout_secs: 30,
            },
            report: ReportConfig {
                default_columns: split_list(
                    "first_name,last_name,email,description,accepted_site_invitation",
                ),
                sort_column: "description".to_string(),
                activation_column: "accepted_site_invitation".to_string(),
            },
            organization: OrganizationConfig {
                blank_label: "(blank org)".to_string(),
                rules: OrgRule::defaults(),
            },
            email_failure_log: PathBuf::from("email_failures.log"),
        }
    }

    pub fn development() -> Self {
        Self::base(Environment::Development)
    }

    pub fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.server.max_upload_bytes = 5 * 1024 * 1024;
        config.security.session_ttl_hours = 8;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.server.max_upload_bytes = 5 * 1024 * 1024;
        config.security.session_ttl_hours = 4;
        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Per-process signing key; restarting the process invalidates every issued token.
fn random_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
