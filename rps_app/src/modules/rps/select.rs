use super::game::Move;
use crate::components::ComponentContext;
use crate::prelude::*;

/// Custom id of the guess select menu.
pub const GUESS_CUSTOM_ID: &str = "rps:guess";

/// Creates the select menu used to submit guesses.
pub fn guess_components() -> Vec<CreateActionRow> {
    let options = Move::ALL
        .into_iter()
        .map(|m| {
            CreateSelectMenuOption::new(m.label(), m.value())
                .emoji(ReactionType::Unicode(m.emoji().to_owned()))
        })
        .collect();

    let menu = CreateSelectMenu::new(GUESS_CUSTOM_ID, CreateSelectMenuKind::String { options })
        .placeholder("Choose your move...");

    vec![CreateActionRow::SelectMenu(menu)]
}

/// Handles a selection in the guess menu.
pub async fn guess(ctx: ComponentContext<'_>) -> Result {
    let interaction = ctx.interaction;
    let guild_id = interaction
        .guild_id
        .ok_or(ArgError::new_const("This game can only be played in a server."))?;

    let ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind else {
        anyhow::bail!("rps guess must come from a string select");
    };

    let guess = values
        .first()
        .and_then(|v| Move::from_value(v))
        .ok_or(ArgError::new_const("That is not a valid move."))?;

    ctx.data
        .games()
        .submit_guess(guild_id, interaction.user.id, guess)?;

    log::debug!("Recorded RPS guess in {guild_id} for {}.", interaction.user.id);

    let response = CreateInteractionResponseMessage::new()
        .content(format!("✅ Your guess of **{guess}** has been recorded."))
        .ephemeral(true);

    let response = CreateInteractionResponse::Message(response);
    interaction.create_response(ctx.serenity, response).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_is_a_single_select_row() {
        let rows = guess_components();
        assert!(
            matches!(rows.as_slice(), [CreateActionRow::SelectMenu(_)]),
            "a single row holding the select menu"
        );
    }
}
