use super::Config;
use super::game::{Capabilities, Move, run_countdown};
use super::output::ChannelOutput;
use super::select::guess_components;
use crate::prelude::*;

/// Start a Rock Paper Scissors game.
#[poise::command(slash_command, guild_only, rename = "startrps")]
pub async fn start_rps(
    ctx: Context<'_>,
    #[description = "Choose your move to start the game."] choice: Move,
) -> Result {
    let data = ctx.data();
    let guild_id = ctx.guild_id().context("startrps is guild only")?;
    let config = &data.config().rps;

    let round = data.games().start_round(guild_id, ctx.channel_id(), choice)?;

    let reply = CreateReply::default()
        .embed(prompt_embed(config, data.config().embed_color))
        .components(guess_components());

    let message_id = match send_prompt(ctx, reply).await {
        Ok(message_id) => message_id,
        Err(why) => {
            data.games().abort_round(guild_id);
            return Err(why);
        },
    };

    data.games().set_prompt_message(guild_id, message_id);
    log::info!(
        "RPS round started in {}/{} by {}.",
        round.guild_id(),
        round.channel_id(),
        ctx.author().name
    );

    let output = ChannelOutput::new(Arc::clone(&ctx.serenity_context().http), round.channel_id());
    let timing = config.timing();
    let data = Arc::clone(data);
    tokio::spawn(async move {
        run_countdown(data.games(), round, timing, &output).await;
    });

    Ok(())
}

/// Force stop the Rock Paper Scissors game.
#[poise::command(slash_command, guild_only, rename = "stoprps")]
pub async fn stop_rps(ctx: Context<'_>) -> Result {
    let guild_id = ctx.guild_id().context("stoprps is guild only")?;

    let member = ctx
        .author_member()
        .await
        .context("cannot resolve the invoking member")?;

    let capabilities = member_capabilities(ctx, &member);
    ctx.data().games().stop_round(guild_id, capabilities)?;
    log::info!("RPS round in {guild_id} stopped by {}.", ctx.author().name);

    let reply = CreateReply::default()
        .content("🛑 Stopping the RPS game...")
        .ephemeral(true);

    ctx.send(reply).await?;
    Ok(())
}

async fn send_prompt(ctx: Context<'_>, reply: CreateReply) -> Result<MessageId> {
    let handle = ctx.send(reply).await?;
    let message = handle.message().await?;
    Ok(message.id)
}

fn prompt_embed(config: &Config, color: Color) -> CreateEmbed {
    let description = format!(
        "**A new game has started!**\n\n\
         The host has chosen their secret move.\n\
         To win, you must pick the move that **beats** their choice.\n\n\
         You have **{} seconds** to pick!\n\n\
         👇 Use the dropdown menu below to lock in your move.",
        config.round_seconds
    );

    CreateEmbed::new()
        .title("🪨📄✂️ Rock Paper Scissors")
        .description(description)
        .footer(CreateEmbedFooter::new("Good luck!"))
        .color(color)
}

fn member_capabilities(ctx: Context<'_>, member: &Member) -> Capabilities {
    // roles come from the cache, if the guild isn't cached only permissions count
    let guild = ctx.guild();
    let roles = guild.as_ref().map(|g| &g.roles);
    let role_names = member
        .roles
        .iter()
        .filter_map(|id| roles?.get(id))
        .map(|r| r.name.as_str());

    Capabilities::resolve(role_names, member.permissions, &ctx.data().config().rps.stop_roles)
}
