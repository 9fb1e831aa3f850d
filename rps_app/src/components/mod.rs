//! Dispatches message component interactions to the module handlers.
//!
//! Handlers are keyed by the exact custom id of the component.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use serenity::client::{Context as SerenityContext, FullEvent};
use serenity::futures::future::BoxFuture;

use crate::prelude::*;

/// Signature of a component handler.
pub type ComponentFn = for<'a> fn(ComponentContext<'a>) -> BoxFuture<'a, Result>;

/// A handler for components with a specific custom id.
#[derive(Clone, Copy)]
pub struct ComponentAction {
    /// The custom id to handle.
    pub custom_id: &'static str,
    /// The function to invoke.
    pub invoke: ComponentFn,
}

impl ComponentAction {
    pub const fn new(custom_id: &'static str, invoke: ComponentFn) -> Self {
        Self { custom_id, invoke }
    }
}

impl fmt::Debug for ComponentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentAction")
            .field(&self.custom_id)
            .finish()
    }
}

/// Execution context for component handlers.
#[derive(Clone, Copy)]
pub struct ComponentContext<'a> {
    /// The serenity context.
    pub serenity: &'a SerenityContext,
    /// The interaction being handled.
    pub interaction: &'a ComponentInteraction,
    /// The bot data.
    pub data: &'a FrameworkData,
}

/// Routes component interactions to their [`ComponentAction`].
#[derive(Debug, Default)]
pub struct ComponentHandler {
    actions: HashMap<&'static str, ComponentAction>,
}

impl ComponentHandler {
    /// Creates a new handler with the given actions.
    ///
    /// Fails if two actions share a custom id.
    pub fn new(actions: impl IntoIterator<Item = ComponentAction>) -> Result<Self> {
        let mut map = HashMap::new();
        for action in actions {
            match map.entry(action.custom_id) {
                Entry::Vacant(entry) => _ = entry.insert(action),
                Entry::Occupied(_) => {
                    anyhow::bail!("duplicate component action for `{}`", action.custom_id)
                },
            }
        }

        Ok(Self { actions: map })
    }

    /// Dispatches a component interaction.
    ///
    /// Errors are reported to the user or logged, never returned.
    pub async fn dispatch(
        &self,
        ctx: &SerenityContext,
        interaction: &ComponentInteraction,
        data: &FrameworkData,
    ) {
        let custom_id = interaction.data.custom_id.as_str();
        let Some(action) = self.actions.get(custom_id) else {
            log::debug!("Ignoring component with unknown custom id `{custom_id}`.");
            return;
        };

        log::info!(
            "[Component] {}, {}: {custom_id}",
            interaction_location(interaction.guild_id, interaction.channel_id),
            interaction.user.name,
        );

        let component_ctx = ComponentContext {
            serenity: ctx,
            interaction,
            data,
        };

        if let Err(err) = (action.invoke)(component_ctx).await {
            handle_dispatch_error(ctx, interaction, err).await;
        }
    }
}

/// Hooks into the framework's event stream.
pub async fn handle_event(
    ctx: &SerenityContext,
    event: &FullEvent,
    data: &FrameworkData,
) -> Result {
    if let FullEvent::InteractionCreate {
        interaction: Interaction::Component(interaction),
        ..
    } = event
    {
        data.components().dispatch(ctx, interaction, data).await;
    }

    Ok(())
}

/// Formats where an interaction happened, for logging.
pub fn interaction_location(guild_id: Option<GuildId>, channel_id: ChannelId) -> InteractionLocation {
    InteractionLocation {
        guild_id,
        channel_id,
    }
}

/// Display wrapper returned by [`interaction_location`].
#[derive(Debug, Clone, Copy)]
pub struct InteractionLocation {
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
}

impl fmt::Display for InteractionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.guild_id {
            Some(guild_id) => write!(f, "{guild_id}/{}", self.channel_id),
            None => write!(f, "DM/{}", self.channel_id),
        }
    }
}

#[cold]
async fn handle_dispatch_error(
    ctx: &SerenityContext,
    interaction: &ComponentInteraction,
    err: anyhow::Error,
) {
    if let Some(ser_err) = err.downcast_ref::<serenity::Error>() {
        // print both errors to preserve the stack trace, if present
        log::warn!("Discord interaction error: {ser_err:?} / {err:?}");
        return;
    }

    let err_text = match user_error_message(&err) {
        Some(msg) => msg.into_owned(),
        None => {
            log::warn!("Component error: {err:?}");
            format!("Internal error: ```{err}```")
        },
    };

    let embed = CreateEmbed::new()
        .description(err_text)
        .color(ERROR_EMBED_COLOR);

    let response = CreateInteractionResponseMessage::new()
        .embed(embed)
        .ephemeral(true);

    let response = CreateInteractionResponse::Message(response);
    if let Err(why) = interaction.create_response(ctx, response).await {
        log::warn!("Error sending component error: {why}");
    }
}
