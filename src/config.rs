use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    /// Cap on captured request/response bodies stored in audit metadata.
    pub audit_body_limit: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("PRACTICA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PRACTICA_HOST: {e}"))?;

        let port: u16 = env_or("PRACTICA_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PRACTICA_PORT: {e}"))?;

        let max_body_size: usize = env_or("PRACTICA_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid PRACTICA_MAX_BODY_SIZE: {e}"))?;

        let audit_body_limit: usize = env_or("PRACTICA_AUDIT_BODY_LIMIT", "8192")
            .parse()
            .map_err(|e| format!("Invalid PRACTICA_AUDIT_BODY_LIMIT: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("PRACTICA_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid PRACTICA_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("PRACTICA_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            audit_body_limit,
            trusted_proxies,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
