use std::sync::Arc;

use crate::cli::utils::connect;
use crate::database::PgStore;
use crate::services::DescribeService;

/// XML goes to stdout regardless of `--json`
pub async fn handle() -> anyhow::Result<()> {
    let pool = connect().await?;
    let describe = DescribeService::new(Arc::new(PgStore::new(pool)));
    println!("{}", describe.schema_xml().await?);
    Ok(())
}
