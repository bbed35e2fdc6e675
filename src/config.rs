// Application configuration, loaded with the 'config' crate (and 'dotenv').

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub server_address: String,
    /// Base URL of the remote marketplace REST API, e.g. http://localhost:8000/api
    pub api_base_url: String,
    /// Page size requested from the listings endpoint.
    pub per_page: u32,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            // Defaults match the original deployment's local setup
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("api_base_url", "http://localhost:8000/api")?
            .set_default("per_page", 12)?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_API_BASE_URL).
            // No separator: the fields are flat, so the stripped key must
            // map straight onto them (APP_API_BASE_URL -> api_base_url).
            .add_source(Environment::with_prefix("APP"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_prefixed_env_vars_override_the_defaults() {
        // SAFETY: test-local variable name, set before any other thread
        // could read the environment for it.
        unsafe { std::env::set_var("APP_PER_PAGE", "5") };
        let settings = Settings::new().unwrap();
        unsafe { std::env::remove_var("APP_PER_PAGE") };
        assert_eq!(settings.per_page, 5);
        // Untouched fields keep their defaults
        assert_eq!(settings.server_address, "127.0.0.1:3000");
    }
}
