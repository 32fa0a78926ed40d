use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub http_addr: String,
    /// `host:port` of the Lambda runtime API, normally `AWS_LAMBDA_RUNTIME_API`.
    pub runtime_api: Option<String>,
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot_id: Option<String>,
    pub bot_alias_id: Option<String>,
    pub region: Option<String>,
    pub language: Option<String>,
    /// Answer a hangup with no connected leg with `[""]` instead of `[]`.
    pub hangup_placeholder: Option<bool>,
}

/// Resolved, immutable bot configuration handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    pub bot_id: String,
    pub bot_alias_id: String,
    pub region: String,
    pub language: String,
    pub hangup_placeholder: bool,
}

pub type BotSettingsRef = Arc<BotSettings>;

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            http_addr: "0.0.0.0:8080".to_string(),
            runtime_api: None,
            bot: BotConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    /// Overlays the process environment, after loading `.env` if present.
    pub fn overlay_env(&mut self) {
        let _ = dotenv::dotenv();
        self.overlay(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Fills every unset value from `lookup`; values already present win.
    pub fn overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if self.runtime_api.is_none() {
            self.runtime_api = lookup("AWS_LAMBDA_RUNTIME_API");
        }
        let bot = &mut self.bot;
        if bot.bot_id.is_none() {
            bot.bot_id = lookup("LEX_BOT_ID");
        }
        if bot.bot_alias_id.is_none() {
            bot.bot_alias_id = lookup("LEX_BOT_ALIAS_ID");
        }
        if bot.region.is_none() {
            bot.region = lookup("AWS_REGION");
        }
        if bot.language.is_none() {
            bot.language = lookup("LANG");
        }
        if bot.hangup_placeholder.is_none() {
            bot.hangup_placeholder = lookup("HANGUP_PLACEHOLDER").and_then(|v| {
                let flag = parse_flag(&v);
                if flag.is_none() {
                    warn!(value = %v, "ignoring unrecognized HANGUP_PLACEHOLDER");
                }
                flag
            });
        }
    }
}

/// Accepts `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`, case-insensitively.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl BotConfig {
    pub fn resolve(&self) -> Result<BotSettings, Error> {
        let mut missing = Vec::new();
        let mut required = |value: &Option<String>, name: &str| match value
            .as_deref()
            .map(str::trim)
        {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };
        let bot_id = required(&self.bot_id, "LEX_BOT_ID");
        let bot_alias_id = required(&self.bot_alias_id, "LEX_BOT_ALIAS_ID");
        let region = required(&self.region, "AWS_REGION");
        if !missing.is_empty() {
            return Err(Error::Configuration(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        Ok(BotSettings {
            bot_id,
            bot_alias_id,
            region,
            language: self
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            hangup_placeholder: self.hangup_placeholder.unwrap_or(true),
        })
    }
}

impl BotSettings {
    /// `arn:aws:lex:{region}:{account}:bot-alias/{bot}/{alias}`
    pub fn bot_alias_arn(&self, account_id: &str) -> String {
        format!(
            "arn:aws:lex:{}:{}:bot-alias/{}/{}",
            self.region, account_id, self.bot_id, self.bot_alias_id
        )
    }
}
