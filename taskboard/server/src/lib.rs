pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_db_path")]
        pub db_path: String,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                port: default_port(),
                db_path: default_db_path(),
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

    fn default_port() -> u16 {
        3333
    }

    fn default_db_path() -> String {
        "files/db.json".to_string()
    }

}

pub mod storage;
pub mod task;
pub mod timestamp;
pub mod web;
