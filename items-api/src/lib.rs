pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Settings {
        #[serde(default = "default_app_name")]
        pub app_name: String,
        #[serde(default = "default_host")]
        pub host: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Origins allowed to call the API from a browser.
        #[serde(default = "default_allowed_origins")]
        pub allowed_origins: Vec<String>,
    }

    impl Settings {
        /// Loads settings from environment variables.
        ///
        /// `ALLOWED_ORIGINS` is a comma-separated list.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(
                    config::Environment::default()
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("allowed_origins"),
                )
                .build()?;

            let settings: Settings = settings.try_deserialize()?;
            Ok(settings)
        }

        pub fn server_address(&self) -> String {
            format!("{}:{}", self.host, self.port)
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                app_name: default_app_name(),
                host: default_host(),
                port: default_port(),
                allowed_origins: default_allowed_origins(),
            }
        }
    }

    fn default_app_name() -> String {
        "Items API".to_string()
    }

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    fn default_allowed_origins() -> Vec<String> {
        vec!["http://localhost:3000".to_string()]
    }

}
pub mod item;
pub mod web;
