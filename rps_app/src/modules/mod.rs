use crate::components::{ComponentAction, ComponentHandler};
use crate::config::BotConfig;
use crate::prelude::*;

pub mod rps;

mod prelude {
    pub use super::Module as _;
    pub use crate::components::ComponentAction;
    pub use crate::config::BotConfig;
    pub use crate::prelude::*;
}

/// Run an expression against every enabled module.
///
/// Syntax is:
///
/// ```ignore
/// for_each_module!(&config, |m| do_stuff(m));
/// ```
macro_rules! for_each_module {
    (@inner $module:expr, $config:expr, |$var:ident| $body:expr) => {{
        let $var = $module;
        if $crate::modules::Module::enabled(&$var, $config) {
            $body
        }
    }};
    ($config:expr, |$var:ident| $body:expr) => {{
        $crate::modules::for_each_module!(@inner $crate::modules::rps::Module, $config, |$var| $body);
    }};
}

pub(crate) use for_each_module;

pub trait Module: Sized {
    /// Whether the module is enabled.
    fn enabled(&self, config: &BotConfig) -> bool;

    /// The intents needed.
    fn intents(&self, config: &BotConfig) -> GatewayIntents {
        _ = config;
        GatewayIntents::empty()
    }

    /// Commands for this module.
    fn commands(&self, config: &BotConfig) -> impl IntoIterator<Item = AppCommand> {
        _ = config;
        []
    }

    /// Message component handlers for this module.
    fn components(&self, config: &BotConfig) -> impl IntoIterator<Item = ComponentAction> {
        _ = config;
        []
    }

    /// Validates that the config is good.
    fn validate(&self, config: &BotConfig) -> Result {
        _ = config;
        Ok(())
    }
}

/// Data needed for bot startup.
pub struct Init {
    /// Intents used by this app.
    pub intents: GatewayIntents,
    /// Commands to register.
    pub commands: Vec<AppCommand>,
    /// Component handlers of all enabled modules.
    pub components: ComponentHandler,
}

/// Gets the init data needed based on the enabled modules.
pub fn init(config: &BotConfig) -> Result<Init> {
    // default isn't empty but non_privileged and we need empty
    let mut intents = GatewayIntents::empty();
    let mut commands = Vec::new();
    let mut components = Vec::new();

    for_each_module!(config, |m| {
        m.validate(config)?;
        intents |= m.intents(config);
        commands.extend(m.commands(config));
        components.extend(m.components(config));
    });

    if commands.is_empty() {
        log::warn!("No modules are enabled. The bot will not respond to anything.");
    }

    Ok(Init {
        intents,
        commands,
        components: ComponentHandler::new(components)?,
    })
}
