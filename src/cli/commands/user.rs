use clap::Subcommand;
use serde_json::json;

use crate::auth::{provision_user, set_user_password, NewAccount};
use crate::cli::utils::{output_collection, output_empty_collection, output_success};
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::PersistenceGateway;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account")]
    Create {
        #[arg(help = "Username")]
        username: String,

        #[arg(long, env = "CSVX_PASSWORD", help = "Password (or CSVX_PASSWORD)")]
        password: String,

        #[arg(long, help = "Grant administrator rights")]
        admin: bool,

        #[arg(long, help = "Notification email address")]
        email: Option<String>,
    },

    #[command(about = "Set a user's password")]
    Password {
        #[arg(help = "Username")]
        username: String,

        #[arg(long, env = "CSVX_PASSWORD", help = "New password (or CSVX_PASSWORD)")]
        password: String,
    },

    #[command(about = "List accounts")]
    List,
}

pub async fn handle(
    cmd: UserCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let gateway = connect(config).await?;

    match cmd {
        UserCommands::Create {
            username,
            password,
            admin,
            email,
        } => {
            let user = provision_user(
                &gateway,
                NewAccount {
                    username,
                    password,
                    is_admin: admin,
                    email,
                },
            )
            .await?;
            output_success(
                &output_format,
                &format!("Created user '{}'", user.username),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Password { username, password } => {
            set_user_password(&gateway, &username, &password).await?;
            output_success(&output_format, &format!("Password updated for '{}'", username), None)
        }
        UserCommands::List => {
            let users = gateway.list_users().await?;
            if users.is_empty() {
                return output_empty_collection(&output_format, "users", "No users");
            }

            match output_format {
                OutputFormat::Json => output_collection("users", serde_json::to_value(&users)?),
                OutputFormat::Text => {
                    println!("{:<20} {:<6} {:<30} {}", "USERNAME", "ADMIN", "EMAIL", "CREATED");
                    println!("{}", "-".repeat(75));
                    for user in &users {
                        println!(
                            "{:<20} {:<6} {:<30} {}",
                            user.username,
                            if user.is_admin { "yes" } else { "no" },
                            user.email.as_deref().unwrap_or("-"),
                            user.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                    Ok(())
                }
            }
        }
    }
}
