use crate::components::interaction_location;
use crate::prelude::*;

/// Pre-command execution hook.
pub async fn pre_command(ctx: Context<'_>) {
    // arguments are not logged: `/startrps` carries the host's secret move
    log::info!(
        "[Command] {}, {}: /{}",
        interaction_location(ctx.guild_id(), ctx.channel_id()),
        ctx.author().name,
        ctx.command().qualified_name,
    );
}

/// Command execution error handler.
#[cold]
pub async fn error_handler(error: FrameworkError<'_>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => command_error(ctx, &error).await,
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => {
            let feedback = format!(
                "Argument invalid: {error}\nCaused by input: '{}'",
                input.as_deref().unwrap_or_default()
            );
            context_error(ctx, feedback).await
        },
        error => {
            if let Err(why) = poise::builtins::on_error(error).await {
                log::error!("Error in error handler: {why:?}");
            }
        },
    }
}

async fn command_error(ctx: Context<'_>, err: &anyhow::Error) {
    let message = match user_error_message(err) {
        Some(msg) => msg.into_owned(),
        None => {
            if let Some(ser_err) = err.downcast_ref::<serenity::Error>() {
                // print both errors to preserve the stack trace, if present
                log::warn!("Discord error in command: {ser_err:?} / {err:?}");
            } else {
                log::error!("Error in command: {err:?}");
            }

            format!("Internal error: ```{err}```")
        },
    };

    context_error(ctx, message).await
}

async fn context_error(ctx: Context<'_>, feedback: String) {
    let embed = CreateEmbed::new()
        .description(feedback)
        .color(ERROR_EMBED_COLOR);

    let reply = CreateReply::default().embed(embed).ephemeral(true);
    if let Err(err) = ctx.send(reply).await {
        log::error!("Error in error handler: {err:?}");
    }
}
