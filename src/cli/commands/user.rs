use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect, output_rows, output_success};
use crate::cli::OutputFormat;
use crate::database::PgStore;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an API user")]
    Create {
        #[arg(help = "User name")]
        name: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "List API users")]
    List,
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    let users = UserService::new(Arc::new(PgStore::new(pool)));

    match cmd {
        UserCommands::Create { name, password } => {
            let user = users.create_user(&name, &password).await?;
            output_success(
                &output_format,
                &format!("User '{}' created with id {}", user.name, user.id),
                Some(json!({ "id": user.id, "name": user.name })),
            )
        }
        UserCommands::List => {
            let rows = users
                .list()
                .await?
                .into_iter()
                .map(|u| json!({ "id": u.id, "name": u.name }))
                .collect();
            output_rows(&output_format, "users", rows, |row| {
                format!("{}\t{}", row["id"], row["name"].as_str().unwrap_or_default())
            })
        }
    }
}
