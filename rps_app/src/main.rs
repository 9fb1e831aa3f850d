mod build;
mod components;
mod config;
mod data;
mod logging;
mod modules;
mod prelude;
mod slashies;

fn main() -> anyhow::Result<()> {
    use std::panic;

    use serenity::gateway::ActivityData;
    use serenity::prelude::*;

    use crate::build::{GIT_HASH, VERSION};
    use crate::config::Config;
    use crate::prelude::*;

    return inner();

    // short async fn to reduce `tokio::main` scope
    #[tokio::main]
    async fn inner() -> anyhow::Result<()> {
        // run the program and clean up
        let res = run().await;
        if let Err(why) = &res {
            log::error!("Exiting due to error: {why:?}");
        }

        log::logger().flush();
        res
    }

    // actual main logic
    async fn run() -> Result {
        let config = build_config()?;
        init_logging(config.log)?;

        if config.panic_hook {
            // register the custom panic handler after logging is set up
            panic::set_hook(Box::new(on_panic));
        }

        log::info!(target: "rps_app::version", "RPS Bot v{VERSION} - {GIT_HASH}");

        let init = modules::init(&config.bot)?;
        let bot_data = Arc::new(BotData::new(config.bot, init.components));

        let options = poise::FrameworkOptions {
            commands: init.commands,
            pre_command: |ctx| Box::pin(slashies::pre_command(ctx)),
            on_error: |error| Box::pin(slashies::error_handler(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(components::handle_event(ctx, event, data))
            },
            ..Default::default()
        };

        let framework = poise::Framework::builder()
            .options(options)
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await
                        .context("failed to register commands")?;

                    log::info!("Logged in as {}.", ready.user.name);
                    Ok(bot_data)
                })
            })
            .build();

        let status = config
            .discord
            .status
            .unwrap_or_else(|| format!("v{VERSION}"));

        let mut client = Client::builder(&config.discord.token, init.intents)
            .activity(ActivityData::custom(status))
            .framework(framework)
            .await
            .context("failed to init discord client")?;

        client
            .start()
            .await
            .context("discord client shut down unexpectedly")
    }

    /// Custom panic handler that writes the panic to the logger and flushes it.
    ///
    /// This _could_ be a problem if the logger is the cause of the panic, but
    /// at that stage error reporting is already screwed so this doesn't make it
    /// any worse.
    fn on_panic(info: &panic::PanicHookInfo<'_>) {
        use std::backtrace::Backtrace;
        use std::io::{Write as _, stdout};

        // always include the backtrace here, even when not enabled
        let backtrace = Backtrace::force_capture();
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");

        // just in case the loggers fail or are empty
        _ = writeln!(stdout(), "thread '{name}' {info}");
        log::error!("thread '{name}' {info}\n{backtrace}");
        log::logger().flush();
    }

    fn profile() -> Result<Cow<'static, str>> {
        use std::env::VarError::NotPresent;
        use std::env::var;

        match var("RPS_PROFILE") {
            Ok(value) => Ok(value.into()),
            Err(NotPresent) => Ok("release".into()),
            Err(err) => Err(err).context("cannot load RPS_PROFILE env variable"),
        }
    }

    fn build_config() -> Result<Config> {
        use crate::config::setup::{Builder, Env, File, TomlText};

        let profile = profile()?;
        let profile_config = format!("rps_app.{profile}.toml");
        let default_config = include_str!("../assets/default_config.toml");

        Builder::new()
            .add_layer(TomlText::new(default_config))
            .add_layer(File::new("rps_app.toml").required(false))
            .add_layer(File::new(&profile_config).required(false))
            .add_layer(Env::prefixed("RPS__"))
            .build()
    }

    fn init_logging(config: log4rs::config::RawConfig) -> anyhow::Result<()> {
        let deserializers = crate::logging::deserializers();
        let (appenders, errors) = config.appenders_lossy(&deserializers);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let config = log4rs::Config::builder()
            .appenders(appenders)
            .loggers(config.loggers())
            .build(config.root())?;

        log4rs::init_config(config)?;
        Ok(())
    }
}
