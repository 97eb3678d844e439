use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a list of rows, one line each in text mode
pub fn output_rows(
    output_format: &OutputFormat,
    collection_name: &str,
    rows: Vec<Value>,
    line: impl Fn(&Value) -> String,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert(collection_name.to_string(), Value::Array(rows));
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text if rows.is_empty() => {
            println!("No {} found", collection_name);
        }
        OutputFormat::Text => {
            for row in &rows {
                println!("{}", line(row));
            }
        }
    }
    Ok(())
}

/// Admin commands always need a real database
pub async fn connect() -> anyhow::Result<PgPool> {
    let pool = DatabaseManager::connect(&config().database).await?;
    Ok(pool)
}
