//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.deskbot/config.json`);
//! individual settings can be overridden from the environment. Required
//! settings are validated present-or-fail before the gateway starts.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat platform app identity.
    #[serde(default)]
    pub bot: BotConfig,

    /// Zoho Desk credentials and endpoint.
    #[serde(default)]
    pub zoho: ZohoConfig,

    /// Recipients for the "Take to Chat" deep link.
    #[serde(default)]
    pub teams: TeamsConfig,
}

/// Server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the activity endpoint (default 3978).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform POSTs from outside).
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    3978
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// Bot app identity (used for connector authentication).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub app_id: Option<String>,
    pub app_password: Option<String>,
    /// "MultiTenant" unless the registration is single-tenant.
    #[serde(default = "default_app_type")]
    pub app_type: String,
    pub tenant_id: Option<String>,
}

fn default_app_type() -> String {
    "MultiTenant".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_password: None,
            app_type: default_app_type(),
            tenant_id: None,
        }
    }
}

/// Zoho Desk credentials: the refresh-token tuple, the org scope, and the API
/// base URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZohoConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub org_id: Option<String>,
    /// Default https://desk.zoho.com.
    pub base_url: Option<String>,
}

/// The two fixed recipients of the group-chat deep link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsConfig {
    pub upn1: Option<String>,
    pub upn2: Option<String>,
}

/// Resolve config path from env or default (`~/.deskbot/config.json`).
pub fn default_config_path() -> PathBuf {
    std::env::var("DESKBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".deskbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or DESKBOT_CONFIG_PATH), then apply
/// environment overrides. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config);
    Ok((config, path))
}

/// Non-empty env value, trimmed.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Environment overrides take priority over file values.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(v) = env_value("PORT").and_then(|v| v.parse().ok()) {
        config.server.port = v;
    }
    if let Some(v) = env_value("BOT_APP_ID") {
        config.bot.app_id = Some(v);
    }
    if let Some(v) = env_value("BOT_APP_PASSWORD") {
        config.bot.app_password = Some(v);
    }
    if let Some(v) = env_value("BOT_TENANT_ID") {
        config.bot.tenant_id = Some(v);
    }
    if let Some(v) = env_value("ZOHO_CLIENT_ID") {
        config.zoho.client_id = Some(v);
    }
    if let Some(v) = env_value("ZOHO_CLIENT_SECRET") {
        config.zoho.client_secret = Some(v);
    }
    if let Some(v) = env_value("ZOHO_REFRESH_TOKEN") {
        config.zoho.refresh_token = Some(v);
    }
    if let Some(v) = env_value("ZOHO_ORG_ID") {
        config.zoho.org_id = Some(v);
    }
    if let Some(v) = env_value("ZOHO_BASE_URL") {
        config.zoho.base_url = Some(v);
    }
    if let Some(v) = env_value("TEAMS_UPN_1") {
        config.teams.upn1 = Some(v);
    }
    if let Some(v) = env_value("TEAMS_UPN_2") {
        config.teams.upn2 = Some(v);
    }
}

fn is_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Fail unless every required setting is present. The error lists all of the
/// missing settings so a first deploy can be fixed in one pass.
pub fn validate(config: &Config) -> Result<()> {
    let required = [
        ("bot.appId", &config.bot.app_id),
        ("bot.appPassword", &config.bot.app_password),
        ("zoho.clientId", &config.zoho.client_id),
        ("zoho.clientSecret", &config.zoho.client_secret),
        ("zoho.refreshToken", &config.zoho.refresh_token),
        ("zoho.orgId", &config.zoho.org_id),
        ("teams.upn1", &config.teams.upn1),
        ("teams.upn2", &config.teams.upn2),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| is_missing(value))
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        bail!("missing required settings: {}", missing.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Config {
        let mut config = Config::default();
        config.bot.app_id = Some("app".to_string());
        config.bot.app_password = Some("secret".to_string());
        config.zoho.client_id = Some("cid".to_string());
        config.zoho.client_secret = Some("csecret".to_string());
        config.zoho.refresh_token = Some("rtoken".to_string());
        config.zoho.org_id = Some("org".to_string());
        config.teams.upn1 = Some("a@contoso.com".to_string());
        config.teams.upn2 = Some("b@contoso.com".to_string());
        config
    }

    #[test]
    fn default_port_and_bind() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 3978);
        assert_eq!(s.bind, "0.0.0.0");
    }

    #[test]
    fn validate_accepts_a_complete_config() {
        assert!(validate(&filled()).is_ok());
    }

    #[test]
    fn validate_lists_every_missing_setting() {
        let mut config = filled();
        config.zoho.refresh_token = None;
        config.teams.upn2 = Some("  ".to_string());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("zoho.refreshToken"));
        assert!(err.contains("teams.upn2"));
        assert!(!err.contains("bot.appId"));
    }

    #[test]
    fn file_config_fills_unset_sections_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"zoho":{"orgId":"123"}}"#).unwrap();
        assert_eq!(config.server.port, 3978);
        assert_eq!(config.zoho.org_id.as_deref(), Some("123"));
        assert_eq!(config.bot.app_type, "MultiTenant");
    }
}
