use std::time::Duration;

use super::game::Timing;

fn default_stop_roles() -> Vec<String> {
    vec!["Game Master".to_owned(), "Moderator".to_owned()]
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    /// How long guesses are collected, in seconds.
    pub round_seconds: u64,
    /// Pause before the winner is revealed, in seconds.
    pub reveal_seconds: u64,
    /// Names of roles whose members may stop rounds.
    pub stop_roles: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            round_seconds: 60,
            reveal_seconds: 2,
            stop_roles: default_stop_roles(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn timing(&self) -> Timing {
        Timing {
            round: Duration::from_secs(self.round_seconds),
            reveal: Duration::from_secs(self.reveal_seconds),
        }
    }
}
