//! Server-scoped rock-paper-scissors guessing rounds.
//!
//! A host picks a secret move and everyone else has a fixed amount of time to
//! guess the move that beats it. When time runs out, one of the correct
//! guessers is picked at random as the winner.

use std::collections::{HashMap, hash_map};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use rand::seq::IndexedRandom as _;
use tokio::sync::oneshot;

use crate::prelude::*;

/// A move in rock-paper-scissors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum Move {
    #[name = "🪨 Rock"]
    Rock,
    #[name = "📄 Paper"]
    Paper,
    #[name = "✂️ Scissors"]
    Scissors,
}

impl Move {
    pub const ALL: [Self; 3] = [Self::Rock, Self::Paper, Self::Scissors];

    /// Gets the move that beats this one.
    ///
    /// Rock loses to paper, paper loses to scissors, scissors loses to rock.
    #[must_use]
    pub const fn counter(self) -> Self {
        match self {
            Self::Rock => Self::Paper,
            Self::Paper => Self::Scissors,
            Self::Scissors => Self::Rock,
        }
    }

    /// The stable value used in component payloads.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Paper => "paper",
            Self::Scissors => "scissors",
        }
    }

    /// Parses a value as returned by [`Move::value`].
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.value() == value)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rock => "Rock",
            Self::Paper => "Paper",
            Self::Scissors => "Scissors",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Rock => "\u{1FAA8}",
            Self::Paper => "\u{1F4C4}",
            Self::Scissors => "\u{2702}\u{FE0F}",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

/// Reasons a game request is rejected.
///
/// All of these are shown to the requester and are otherwise harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("❗ An RPS game is already running in this server.")]
    AlreadyRunning,
    #[error("❗ No RPS game is currently running in this server.")]
    NoActiveGame,
    #[error("❌ You have already made your guess for this round!")]
    AlreadyGuessed,
    #[error("❌ You don't have permission.")]
    Forbidden,
}

/// What a member is allowed to do with rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the member may stop rounds started by others.
    pub elevated: bool,
}

impl Capabilities {
    /// Resolves the capabilities of a member from their role names and
    /// permissions.
    ///
    /// Members are elevated if they hold any of the `stop_roles` or are
    /// administrators.
    pub fn resolve<'a>(
        role_names: impl IntoIterator<Item = &'a str>,
        permissions: Option<Permissions>,
        stop_roles: &[String],
    ) -> Self {
        let is_admin = permissions.is_some_and(|p| p.administrator());
        let has_role = role_names
            .into_iter()
            .any(|name| stop_roles.iter().any(|r| r == name));

        Self {
            elevated: is_admin || has_role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Guesses are accepted.
    Collecting,
    /// Time is up or the round was stopped; results are being announced.
    Resolving,
}

#[derive(Debug)]
struct Session {
    channel_id: ChannelId,
    winning_move: Move,
    guesses: HashMap<UserId, Move>,
    cancel: Option<oneshot::Sender<()>>,
    prompt_message_id: Option<MessageId>,
    phase: Phase,
}

/// Handle to a freshly started round, consumed by [`run_countdown`].
#[derive(Debug)]
#[must_use = "a round without a countdown never ends"]
pub struct Round {
    guild_id: GuildId,
    channel_id: ChannelId,
    cancel: oneshot::Receiver<()>,
}

impl Round {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// The channel results are posted in.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }
}

/// The state of a round at the moment it stopped accepting guesses.
#[derive(Debug, Clone)]
struct ClosedRound {
    channel_id: ChannelId,
    correct_guessers: Vec<UserId>,
    prompt_message_id: Option<MessageId>,
}

/// The active rounds, at most one per guild.
#[derive(Debug, Default)]
pub struct Games {
    sessions: DashMap<GuildId, Session>,
}

impl Games {
    /// Starts a new round in a guild.
    ///
    /// The winning move is the counter to `host_move`.
    pub fn start_round(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        host_move: Move,
    ) -> Result<Round, GameError> {
        let Entry::Vacant(entry) = self.sessions.entry(guild_id) else {
            return Err(GameError::AlreadyRunning);
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        entry.insert(Session {
            channel_id,
            winning_move: host_move.counter(),
            guesses: HashMap::new(),
            cancel: Some(cancel_tx),
            prompt_message_id: None,
            phase: Phase::Collecting,
        });

        Ok(Round {
            guild_id,
            channel_id,
            cancel: cancel_rx,
        })
    }

    /// Records the message that holds the round's guess controls.
    ///
    /// Only the first call for a round has an effect.
    pub fn set_prompt_message(&self, guild_id: GuildId, message_id: MessageId) {
        if let Some(mut session) = self.sessions.get_mut(&guild_id) {
            session.prompt_message_id.get_or_insert(message_id);
        }
    }

    /// Records a participant's guess.
    pub fn submit_guess(&self, guild_id: GuildId, user_id: UserId, guess: Move) -> Result<(), GameError> {
        let mut session = self
            .sessions
            .get_mut(&guild_id)
            .filter(|s| s.phase == Phase::Collecting)
            .ok_or(GameError::NoActiveGame)?;

        match session.guesses.entry(user_id) {
            hash_map::Entry::Occupied(_) => Err(GameError::AlreadyGuessed),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(guess);
                Ok(())
            },
        }
    }

    /// Requests that a round is stopped.
    ///
    /// The round is resolved by its countdown shortly after. Stopping a round
    /// twice is accepted.
    pub fn stop_round(&self, guild_id: GuildId, capabilities: Capabilities) -> Result<(), GameError> {
        if !capabilities.elevated {
            return Err(GameError::Forbidden);
        }

        let mut session = self
            .sessions
            .get_mut(&guild_id)
            .filter(|s| s.phase == Phase::Collecting)
            .ok_or(GameError::NoActiveGame)?;

        if let Some(cancel) = session.cancel.take() {
            // the receiver only goes away once the countdown has already resolved
            _ = cancel.send(());
        }

        Ok(())
    }

    /// Drops a round that never got its countdown running.
    pub fn abort_round(&self, guild_id: GuildId) {
        self.sessions.remove(&guild_id);
    }

    #[cfg(test)]
    fn phase(&self, guild_id: GuildId) -> Option<Phase> {
        self.sessions.get(&guild_id).map(|s| s.phase)
    }

    /// Stops accepting guesses and captures who guessed correctly.
    fn close_round(&self, guild_id: GuildId) -> Option<ClosedRound> {
        let mut session = self.sessions.get_mut(&guild_id)?;
        session.phase = Phase::Resolving;

        let winning_move = session.winning_move;
        let correct_guessers = session
            .guesses
            .iter()
            .filter(|&(_, &guess)| guess == winning_move)
            .map(|(&user_id, _)| user_id)
            .collect();

        Some(ClosedRound {
            channel_id: session.channel_id,
            correct_guessers,
            prompt_message_id: session.prompt_message_id,
        })
    }

    fn finish_round(&self, guild_id: GuildId) {
        self.sessions.remove(&guild_id);
    }

    #[cfg(test)]
    fn guess_of(&self, guild_id: GuildId, user_id: UserId) -> Option<Move> {
        self.sessions
            .get(&guild_id)
            .and_then(|s| s.guesses.get(&user_id).copied())
    }
}

/// Picks a winner uniformly at random among the correct guessers.
pub fn pick_winner<R: Rng + ?Sized>(correct_guessers: &[UserId], rng: &mut R) -> Option<UserId> {
    correct_guessers.choose(rng).copied()
}

/// Timing of a round.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// How long guesses are collected.
    pub round: Duration,
    /// Pause between announcing the end of the round and the result.
    pub reveal: Duration,
}

/// Messages posted while a round resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The round was stopped before time ran out.
    Cancelled,
    /// Time is up and the winner is about to be revealed.
    Revealing,
    Winner(UserId),
    NoWinner,
    /// The round is over and a new one may be started.
    Over,
}

/// Where a round posts its results.
pub trait RoundOutput: Send + Sync {
    /// Posts a notice to the round's channel.
    fn notify(&self, notice: Notice) -> impl Future<Output = Result> + Send;

    /// Removes the guess controls from the prompt message.
    fn clear_prompt(&self, message_id: MessageId) -> impl Future<Output = Result> + Send;
}

/// Waits for the round to time out or be stopped, then announces the result
/// and removes the round.
pub async fn run_countdown<O: RoundOutput>(games: &Games, round: Round, timing: Timing, output: &O) {
    let Round {
        guild_id, cancel, ..
    } = round;

    // a dropped sender only happens if the round was removed some other way
    let cancelled = tokio::time::timeout(timing.round, cancel).await.is_ok();

    let Some(closed) = games.close_round(guild_id) else {
        log::warn!("RPS round in {guild_id} vanished before it could be resolved.");
        return;
    };

    if cancelled {
        log::info!("RPS round in {guild_id} was cancelled.");
        notify(output, guild_id, Notice::Cancelled).await;
    } else {
        notify(output, guild_id, Notice::Revealing).await;
        tokio::time::sleep(timing.reveal).await;

        let winner = pick_winner(&closed.correct_guessers, &mut rand::rng());
        log::info!(
            "RPS round in {guild_id}/{} ended with {} correct guesses. Winner: {winner:?}",
            closed.channel_id,
            closed.correct_guessers.len()
        );

        let notice = winner.map_or(Notice::NoWinner, Notice::Winner);
        notify(output, guild_id, notice).await;
    }

    if let Some(message_id) = closed.prompt_message_id
        && let Err(why) = output.clear_prompt(message_id).await
    {
        log::warn!("Could not clear RPS prompt {message_id} in {guild_id}: {why:?}");
    }

    games.finish_round(guild_id);
    notify(output, guild_id, Notice::Over).await;
}

async fn notify<O: RoundOutput>(output: &O, guild_id: GuildId, notice: Notice) {
    if let Err(why) = output.notify(notice).await {
        log::error!("Failed to post {notice:?} for RPS round in {guild_id}: {why:?}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::SeedableRng as _;
    use rand::rngs::StdRng;
    use tokio::time::Instant;

    use super::*;

    const TIMING: Timing = Timing {
        round: Duration::from_secs(60),
        reveal: Duration::from_secs(2),
    };

    const ELEVATED: Capabilities = Capabilities { elevated: true };

    fn guild() -> GuildId {
        GuildId::new(100)
    }

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    fn channel() -> ChannelId {
        ChannelId::new(200)
    }

    fn prompt() -> MessageId {
        MessageId::new(500)
    }

    #[derive(Default)]
    struct Recorder {
        notices: Mutex<Vec<Notice>>,
        cleared: Mutex<Vec<MessageId>>,
        fail_clear: bool,
    }

    impl Recorder {
        fn failing_clear() -> Self {
            Self {
                fail_clear: true,
                ..Self::default()
            }
        }

        fn notices(&self) -> Vec<Notice> {
            self.notices.lock().expect("not poisoned").clone()
        }

        fn cleared(&self) -> Vec<MessageId> {
            self.cleared.lock().expect("not poisoned").clone()
        }
    }

    impl RoundOutput for Recorder {
        async fn notify(&self, notice: Notice) -> Result {
            self.notices.lock().expect("not poisoned").push(notice);
            Ok(())
        }

        async fn clear_prompt(&self, message_id: MessageId) -> Result {
            if self.fail_clear {
                anyhow::bail!("Unknown Message");
            }

            self.cleared.lock().expect("not poisoned").push(message_id);
            Ok(())
        }
    }

    #[test]
    fn counter_cycle() {
        assert_eq!(Move::Rock.counter(), Move::Paper, "paper beats rock");
        assert_eq!(Move::Paper.counter(), Move::Scissors, "scissors beats paper");
        assert_eq!(Move::Scissors.counter(), Move::Rock, "rock beats scissors");
    }

    #[test]
    fn move_values_parse() {
        for m in Move::ALL {
            assert_eq!(Move::from_value(m.value()), Some(m), "value must parse back");
        }

        assert_eq!(Move::from_value("lizard"), None, "unknown values must be rejected");
        assert_eq!(Move::from_value("Rock"), None, "values are case sensitive");
    }

    #[test]
    fn start_twice_is_rejected() {
        let games = Games::default();
        let _round = games.start_round(guild(), channel(), Move::Rock).expect("first start");

        let second = games.start_round(guild(), channel(), Move::Paper);
        assert_eq!(second.map(|_| ()), Err(GameError::AlreadyRunning), "second start must fail");
    }

    #[test]
    fn rounds_are_per_guild() {
        let games = Games::default();
        let _a = games.start_round(GuildId::new(1), channel(), Move::Rock).expect("guild 1");
        let _b = games.start_round(GuildId::new(2), channel(), Move::Rock).expect("guild 2");
    }

    #[test]
    fn guess_without_round_is_rejected() {
        let games = Games::default();
        let res = games.submit_guess(guild(), user(1), Move::Rock);
        assert_eq!(res, Err(GameError::NoActiveGame), "no round to guess in");
    }

    #[test]
    fn second_guess_is_rejected() {
        let games = Games::default();
        let _round = games.start_round(guild(), channel(), Move::Rock).expect("start");

        games.submit_guess(guild(), user(1), Move::Paper).expect("first guess");
        let res = games.submit_guess(guild(), user(1), Move::Scissors);

        assert_eq!(res, Err(GameError::AlreadyGuessed), "second guess must fail");
        assert_eq!(
            games.guess_of(guild(), user(1)),
            Some(Move::Paper),
            "first guess must be kept"
        );
    }

    #[test]
    fn prompt_message_is_set_once() {
        let games = Games::default();
        let _round = games.start_round(guild(), channel(), Move::Rock).expect("start");

        games.set_prompt_message(guild(), prompt());
        games.set_prompt_message(guild(), MessageId::new(501));

        let closed = games.close_round(guild()).expect("round exists");
        assert_eq!(closed.prompt_message_id, Some(prompt()), "first id must be kept");
    }

    #[test]
    fn stop_without_role_is_forbidden() {
        let games = Games::default();
        let _round = games.start_round(guild(), channel(), Move::Rock).expect("start");

        let res = games.stop_round(guild(), Capabilities::default());
        assert_eq!(res, Err(GameError::Forbidden), "plain members cannot stop");
        assert_eq!(games.phase(guild()), Some(Phase::Collecting), "round must continue");
        games.submit_guess(guild(), user(1), Move::Paper).expect("guesses still accepted");
    }

    #[test]
    fn stop_without_round_is_rejected() {
        let games = Games::default();
        let res = games.stop_round(guild(), ELEVATED);
        assert_eq!(res, Err(GameError::NoActiveGame), "nothing to stop");
    }

    #[test]
    fn forbidden_is_checked_before_existence() {
        let games = Games::default();
        let res = games.stop_round(guild(), Capabilities::default());
        assert_eq!(res, Err(GameError::Forbidden), "permission comes first");
    }

    #[test]
    fn capabilities_from_roles() {
        let stop_roles = ["Game Master".to_owned(), "Moderator".to_owned()];

        let member = Capabilities::resolve(["Member", "Artist"], None, &stop_roles);
        assert!(!member.elevated, "unrelated roles are not elevated");

        let moderator = Capabilities::resolve(["Member", "Moderator"], None, &stop_roles);
        assert!(moderator.elevated, "moderators are elevated");

        let admin = Capabilities::resolve([], Some(Permissions::ADMINISTRATOR), &stop_roles);
        assert!(admin.elevated, "administrators are elevated");

        let manager = Capabilities::resolve([], Some(Permissions::MANAGE_MESSAGES), &stop_roles);
        assert!(!manager.elevated, "other permissions are not enough");
    }

    #[test]
    fn no_correct_guessers_has_no_winner() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_winner(&[], &mut rng), None, "nobody to pick");
    }

    #[test]
    fn single_correct_guesser_always_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(pick_winner(&[user(1)], &mut rng), Some(user(1)), "only candidate");
        }
    }

    #[test]
    fn winner_is_uniform() {
        const TRIALS: u32 = 30_000;

        let candidates = [user(1), user(2), user(3)];
        let mut counts = [0u32; 3];
        let mut rng = StdRng::seed_from_u64(0x5EED);

        for _ in 0..TRIALS {
            let winner = pick_winner(&candidates, &mut rng).expect("candidates present");
            let index = candidates
                .iter()
                .position(|&c| c == winner)
                .expect("winner must be a candidate");
            counts[index] += 1;
        }

        // expected 10000 each, standard deviation is about 82
        for count in counts {
            assert!(
                (9_300..=10_700).contains(&count),
                "count {count} too far from uniform: {counts:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_announces_correct_guesser() {
        let games = Games::default();
        let round = games.start_round(guild(), channel(), Move::Rock).expect("start");
        games.set_prompt_message(guild(), prompt());

        games.submit_guess(guild(), user(1), Move::Paper).expect("A guesses");
        games.submit_guess(guild(), user(2), Move::Scissors).expect("B guesses");

        let output = Recorder::default();
        let start = Instant::now();
        run_countdown(&games, round, TIMING, &output).await;

        assert!(start.elapsed() >= TIMING.round + TIMING.reveal, "must wait out the round");
        assert_eq!(
            output.notices(),
            [Notice::Revealing, Notice::Winner(user(1)), Notice::Over],
            "A must be announced"
        );
        assert_eq!(output.cleared(), [prompt()], "prompt controls must be removed");
        assert_eq!(games.phase(guild()), None, "round must be removed");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_correct_guess_has_no_winner() {
        let games = Games::default();
        let round = games.start_round(guild(), channel(), Move::Scissors).expect("start");
        games.submit_guess(guild(), user(1), Move::Paper).expect("wrong guess");

        let output = Recorder::default();
        run_countdown(&games, round, TIMING, &output).await;

        assert_eq!(
            output.notices(),
            [Notice::Revealing, Notice::NoWinner, Notice::Over],
            "nobody must win"
        );
        assert!(output.cleared().is_empty(), "no prompt was recorded");
        assert_eq!(games.phase(guild()), None, "round must be removed");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_round() {
        let games = Games::default();
        let round = games.start_round(guild(), channel(), Move::Rock).expect("start");
        games.set_prompt_message(guild(), prompt());
        games.submit_guess(guild(), user(1), Move::Paper).expect("correct guess");

        let output = Recorder::default();
        let start = Instant::now();
        let stop = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            games.stop_round(guild(), ELEVATED)
        };

        let ((), stopped) = tokio::join!(run_countdown(&games, round, TIMING, &output), stop);
        stopped.expect("elevated members can stop");

        assert!(start.elapsed() < TIMING.round, "must not wait for the timeout");
        assert_eq!(
            output.notices(),
            [Notice::Cancelled, Notice::Over],
            "no winner must be computed"
        );
        assert_eq!(output.cleared(), [prompt()], "prompt controls must be removed");
        assert_eq!(
            games.submit_guess(guild(), user(2), Move::Paper),
            Err(GameError::NoActiveGame),
            "guesses after the round must be rejected"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resolving_round_rejects_requests() {
        let games = Games::default();
        let round = games.start_round(guild(), channel(), Move::Rock).expect("start");

        let output = Recorder::default();
        let during_reveal = async {
            // the round times out at 60s and reveals at 62s
            tokio::time::sleep(Duration::from_secs(61)).await;
            (
                games.phase(guild()),
                games.submit_guess(guild(), user(1), Move::Paper),
                games.start_round(guild(), channel(), Move::Paper).map(|_| ()),
                games.stop_round(guild(), ELEVATED),
            )
        };

        let ((), (phase, guess, start, stop)) =
            tokio::join!(run_countdown(&games, round, TIMING, &output), during_reveal);

        assert_eq!(phase, Some(Phase::Resolving), "round must be resolving");
        assert_eq!(guess, Err(GameError::NoActiveGame), "late guesses are rejected");
        assert_eq!(start, Err(GameError::AlreadyRunning), "no new round while resolving");
        assert_eq!(stop, Err(GameError::NoActiveGame), "nothing left to stop");
        assert_eq!(games.phase(guild()), None, "round must be removed afterwards");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prompt_cleanup_still_ends_round() {
        let games = Games::default();
        let round = games.start_round(guild(), channel(), Move::Paper).expect("start");
        games.set_prompt_message(guild(), prompt());

        let output = Recorder::failing_clear();
        run_countdown(&games, round, TIMING, &output).await;

        assert_eq!(
            output.notices().last(),
            Some(&Notice::Over),
            "final notice must still be posted"
        );
        assert_eq!(games.phase(guild()), None, "round must be removed");
        games
            .start_round(guild(), channel(), Move::Rock)
            .map(|_| ())
            .expect("a new round can start");
    }

    #[test]
    fn aborted_round_can_be_restarted() {
        let games = Games::default();
        let _round = games.start_round(guild(), channel(), Move::Rock).expect("start");
        games.abort_round(guild());

        let _round = games.start_round(guild(), channel(), Move::Rock).expect("restart");
    }
}
