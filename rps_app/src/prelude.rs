pub use std::borrow::Cow;
pub use std::sync::Arc;

pub use anyhow::Context as _;
pub use poise::CreateReply;
pub use serenity::builder::*;
pub use serenity::model::Color;
pub use serenity::model::prelude::*;

pub use crate::data::*;

/// Result type used throughout the app, defaulting to [`anyhow::Error`].
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
