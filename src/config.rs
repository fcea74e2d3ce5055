use serde::{Deserialize, Serialize};

/// Server and integration settings, loaded from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub admin_email: Option<String>,
}

/// SMTP transport settings for the notification emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Load from environment or use defaults
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").ok(),
            stripe_publishable_key: std::env::var("STRIPE_PUBLISHABLE_KEY").ok(),
            smtp: SmtpConfig::load()?,
            admin_email: std::env::var("ADMIN_EMAIL").ok(),
        })
    }
}

impl SmtpConfig {
    /// Present only when SMTP_HOST is set; the remaining variables then
    /// fall back to empty/default values the transport can reject itself.
    fn load() -> Result<Option<Self>, Box<dyn std::error::Error>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()?,
            user: std::env::var("SMTP_USER").unwrap_or_default(),
            pass: std::env::var("SMTP_PASS").unwrap_or_default(),
            from: std::env::var("SMTP_FROM").unwrap_or_default(),
        }))
    }
}
