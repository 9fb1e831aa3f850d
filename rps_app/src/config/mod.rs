#![allow(dead_code, reason = "config might be partly unused")]
use serde::Deserialize;
use serenity::model::Color;

pub mod setup;
mod token_parse;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub log: log4rs::config::RawConfig,
    /// Whether panics are routed to the logger.
    #[serde(default)]
    pub panic_hook: bool,
}

#[derive(Deserialize)]
pub struct DiscordConfig {
    #[serde(with = "token_parse")]
    pub token: String,
    pub status: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<hidden>")
            .field("status", &self.status)
            .finish()
    }
}

const fn default_embed_color() -> Color {
    Color::new(0xDD_A0_DD)
}

#[derive(Debug, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_embed_color")]
    pub embed_color: Color,
    #[serde(default)]
    pub rps: crate::modules::rps::Config,
}
