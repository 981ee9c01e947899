pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_csv_path")]
        pub csv_path: String,
        #[serde(default = "default_tasks_url")]
        pub tasks_url: String,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                csv_path: default_csv_path(),
                tasks_url: default_tasks_url(),
            }
        }
    }

    impl Config {
        /// Loads configuration from `TASKBOARD_*` environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::with_prefix("TASKBOARD"))
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_csv_path() -> String {
        "files/tasks.csv".to_string()
    }

    fn default_tasks_url() -> String {
        "http://localhost:3333/tasks".to_string()
    }

}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One data row of the import file: `name,description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub name: String,
    pub description: String,
}

/// Error type for importer operations.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to open CSV file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Lazily reads task rows, skipping the header line.
///
/// Columns are taken by position, whatever the header says.
pub fn read_rows<R: io::Read>(reader: R) -> impl Iterator<Item = Result<TaskRow, csv::Error>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader)
        .into_records()
        .map(|record| record?.deserialize::<TaskRow>(None))
}

/// The server's answer to one create request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub status: u16,
    pub body: Value,
}

/// Thin client for the create-task endpoint.
#[derive(Debug, Clone)]
pub struct TaskClient {
    client: reqwest::Client,
    url: String,
}

impl TaskClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// POSTs one row and parses whatever JSON comes back, error bodies included.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, row: &TaskRow) -> Result<CreateOutcome, ImportError> {
        let response = self.client.post(&self.url).json(row).send().await?;
        let status = response.status().as_u16();
        let body = response.json::<Value>().await?;
        Ok(CreateOutcome { status, body })
    }
}

/// Tally of an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows the server accepted.
    pub created: usize,
    /// Rows the server answered with an error status.
    pub rejected: usize,
    /// Rows whose request or response parsing failed.
    pub failed: usize,
    /// Rows that could not be read from the file.
    pub skipped: usize,
}

/// Imports every row of the CSV file at `path`.
///
/// The file is read on the blocking pool and each row is sent as soon as
/// it has been parsed.
pub async fn import_file(path: &Path, client: &TaskClient) -> Result<ImportSummary, ImportError> {
    let file = tokio::fs::File::open(path).await?.into_std().await;
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let reader = tokio::task::spawn_blocking(move || {
        for row in read_rows(file) {
            if sender.send(row).is_err() {
                break;
            }
        }
    });

    let mut import = Import::new(client);
    while let Some(row) = receiver.recv().await {
        import.send(row);
    }
    if let Err(err) = reader.await {
        tracing::error!("CSV reader stopped: {}", err);
    }
    Ok(import.finish().await)
}

/// Fires one create request per row without waiting on the previous one.
///
/// A failed row is logged and counted, never fatal. Returns once every
/// request has settled.
pub async fn import_rows<I>(rows: I, client: &TaskClient) -> ImportSummary
where
    I: IntoIterator<Item = Result<TaskRow, csv::Error>>,
{
    let mut import = Import::new(client);
    for row in rows {
        import.send(row);
    }
    import.finish().await
}

/// Requests in flight plus the tally of rows that never made it out.
struct Import<'a> {
    client: &'a TaskClient,
    requests: JoinSet<Result<CreateOutcome, ImportError>>,
    summary: ImportSummary,
}

impl<'a> Import<'a> {
    fn new(client: &'a TaskClient) -> Self {
        Self {
            client,
            requests: JoinSet::new(),
            summary: ImportSummary::default(),
        }
    }

    fn send(&mut self, row: Result<TaskRow, csv::Error>) {
        match row {
            Ok(row) => {
                let client = self.client.clone();
                self.requests
                    .spawn(async move { client.create_task(&row).await });
            }
            Err(err) => {
                tracing::error!("Skipping unreadable row: {}", err);
                self.summary.skipped += 1;
            }
        }
    }

    async fn finish(mut self) -> ImportSummary {
        let summary = &mut self.summary;
        while let Some(joined) = self.requests.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    tracing::info!("data {}", outcome.body);
                    if (200..300).contains(&outcome.status) {
                        summary.created += 1;
                    } else {
                        summary.rejected += 1;
                    }
                }
                Ok(Err(err)) => {
                    tracing::error!("error: {}", err);
                    summary.failed += 1;
                }
                Err(err) => {
                    tracing::error!("Import request aborted: {}", err);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            created = summary.created,
            rejected = summary.rejected,
            failed = summary.failed,
            skipped = summary.skipped,
            "finished"
        );
        self.summary
    }
}
