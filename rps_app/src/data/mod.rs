use crate::components::ComponentHandler;
use crate::config::BotConfig;
use crate::modules::rps::game::{GameError, Games};
use crate::prelude::*;

/// A general color that can be used for embeds indicating errors.
pub const ERROR_EMBED_COLOR: Color = Color::new(0xCF_00_25);

/// A general color that can be used for embeds announcing a success.
pub const SUCCESS_EMBED_COLOR: Color = Color::new(0x2E_CC_71);

/// Actual data type provided to poise's user data.
pub type FrameworkData = Arc<BotData>;

/// The poise context type used by commands.
pub type Context<'a> = poise::Context<'a, FrameworkData, anyhow::Error>;

/// A command as registered with the framework.
pub type AppCommand = poise::Command<FrameworkData, anyhow::Error>;

/// Errors reported to the framework's error hook.
pub type FrameworkError<'a> = poise::FrameworkError<'a, FrameworkData, anyhow::Error>;

/// A simple error that can return any error message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{msg}")]
#[must_use]
pub struct ArgError {
    /// The error message
    pub msg: Cow<'static, str>,
}

impl ArgError {
    pub const fn new_const(msg: &'static str) -> Self {
        Self {
            msg: Cow::Borrowed(msg),
        }
    }
}

/// Gets the message to show the user for an error caused by their input.
///
/// Returns [`None`] for errors that aren't the user's fault.
pub fn user_error_message(err: &anyhow::Error) -> Option<Cow<'_, str>> {
    if let Some(err) = err.downcast_ref::<ArgError>() {
        return Some(Cow::Borrowed(err.msg.as_ref()));
    }

    err.downcast_ref::<GameError>()
        .map(|err| Cow::Owned(err.to_string()))
}

/// The global bot data. Only one instance exists per bot.
#[derive(Debug)]
pub struct BotData {
    /// The bot configuration.
    config: BotConfig,
    /// The active rock-paper-scissors rounds.
    games: Games,
    /// Handlers for message components.
    components: ComponentHandler,
}

impl BotData {
    /// Creates a new instance.
    #[must_use]
    pub fn new(config: BotConfig, components: ComponentHandler) -> Self {
        Self {
            config,
            games: Games::default(),
            components,
        }
    }

    /// Gets the bot configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Gets the active rock-paper-scissors rounds.
    #[must_use]
    pub fn games(&self) -> &Games {
        &self.games
    }

    /// Gets the registered component handlers.
    #[must_use]
    pub fn components(&self) -> &ComponentHandler {
        &self.components
    }
}
