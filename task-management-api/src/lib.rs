pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_database_url")]
        pub database_url: String,
        #[serde(default = "default_host")]
        pub host: String,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables.
        ///
        /// `DATABASE_URL` selects the backing store; when it is absent the
        /// embedded file store next to the working directory is used.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Address the HTTP listener binds to.
        pub fn server_address(&self) -> String {
            format!("{}:{}", self.host, self.port)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                database_url: default_database_url(),
                host: default_host(),
                port: default_port(),
            }
        }
    }

    fn default_database_url() -> String {
        "sqlite://database.db?mode=rwc".to_string()
    }

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

}
pub mod entities;
pub mod session;
pub mod task;
pub mod web;
