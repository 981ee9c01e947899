use std::path::Path;
use taskboard_importer::config::Config;
use taskboard_importer::{TaskClient, import_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = Config::from_env()?;
    let client = TaskClient::new(config.tasks_url);
    import_file(Path::new(&config.csv_path), &client).await?;
    Ok(())
}
