use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: String,
    pub webhook_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let webhook_secret =
            std::env::var("WEBHOOK_SECRET").unwrap_or_else(|_| "demo-secret".into());
        Ok(Self {
            database_url,
            environment,
            webhook_secret,
        })
    }

    /// Session cookies carry the Secure attribute only in production.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
