use super::prelude::*;

pub mod config;
pub mod game;
mod output;
mod select;
mod slashies;

pub use config::Config;

pub struct Module;

impl super::Module for Module {
    fn enabled(&self, config: &BotConfig) -> bool {
        config.rps.enabled
    }

    fn intents(&self, _config: &BotConfig) -> GatewayIntents {
        // `GUILDS` so guild roles are cached for the stop permission check
        GatewayIntents::GUILDS
    }

    fn commands(&self, _config: &BotConfig) -> impl IntoIterator<Item = AppCommand> {
        [slashies::start_rps(), slashies::stop_rps()]
    }

    fn components(&self, _config: &BotConfig) -> impl IntoIterator<Item = ComponentAction> {
        [ComponentAction::new(select::GUESS_CUSTOM_ID, |ctx| {
            Box::pin(select::guess(ctx))
        })]
    }

    fn validate(&self, config: &BotConfig) -> Result {
        log::info!("Rock Paper Scissors is enabled.");

        let rps = &config.rps;
        anyhow::ensure!(rps.round_seconds > 0, "`rps.round_seconds` must be positive");

        if rps.stop_roles.is_empty() {
            log::warn!("`rps.stop_roles` is empty. Only administrators can stop rounds.");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::Module as _;

    fn bot_config(toml: &str) -> BotConfig {
        toml::from_str(toml).expect("bot config must parse")
    }

    #[test]
    fn defaults_match_classic_round() {
        let config = bot_config("");
        let timing = config.rps.timing();

        assert!(config.rps.enabled, "enabled by default");
        assert_eq!(timing.round.as_secs(), 60, "one minute rounds");
        assert_eq!(timing.reveal.as_secs(), 2, "short reveal pause");
        assert_eq!(
            config.rps.stop_roles,
            ["Game Master", "Moderator"],
            "default stop roles"
        );
    }

    #[test]
    fn zero_round_is_invalid() {
        let config = bot_config("[rps]\nround_seconds = 0");
        assert!(Module.validate(&config).is_err(), "zero second rounds must be rejected");
    }

    #[test]
    fn can_be_disabled() {
        let config = bot_config("[rps]\nenabled = false");
        assert!(!Module.enabled(&config), "module must be disabled");
    }
}
