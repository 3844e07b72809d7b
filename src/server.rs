//! Match actor: one Tokio task owns a [`GameState`] and serializes every
//! request against it.
//!
//! Callers talk to the task through a cloneable [`MatchHandle`]. Events
//! leave through one unbounded channel per connected player, filtered by
//! each dispatch's [`Recipient`].

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{ConfigError, GameConfig, ServerConfig};
use crate::game::{Dispatch, GameError, GameEvent, GameState, MatchSnapshot, Request};

pub type EventSender = mpsc::UnboundedSender<GameEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GameEvent>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("match actor is no longer running")]
    Unavailable,
    #[error(transparent)]
    Rejected(#[from] GameError),
}

enum MatchCommand {
    Submit {
        player: usize,
        request: Request,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Connect {
        player: usize,
        reply: oneshot::Sender<Result<EventReceiver, GameError>>,
    },
    /// Keeps a player alive without doing anything else.
    Heartbeat { player: usize },
    Disconnect { player: usize },
    Snapshot {
        reply: oneshot::Sender<MatchSnapshot>,
    },
    Shutdown,
}

/// Handle to a running match actor. Cheap to clone.
#[derive(Clone)]
pub struct MatchHandle {
    sender: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    /// Applies `request` for `player`. Resulting events go out through the
    /// connected players' channels; a rejection comes back here only.
    pub async fn submit(&self, player: usize, request: Request) -> Result<(), ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MatchCommand::Submit {
            player,
            request,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ServerError::Unavailable)??;
        Ok(())
    }

    /// Registers `player` and returns the stream of events they may see.
    /// Connecting again replaces the earlier stream.
    pub async fn connect(&self, player: usize) -> Result<EventReceiver, ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MatchCommand::Connect {
            player,
            reply: reply_tx,
        })
        .await?;
        Ok(reply_rx.await.map_err(|_| ServerError::Unavailable)??)
    }

    pub async fn heartbeat(&self, player: usize) -> Result<(), ServerError> {
        self.send(MatchCommand::Heartbeat { player }).await
    }

    /// Drops `player` from the match, which ends it without a winner.
    pub async fn disconnect(&self, player: usize) -> Result<(), ServerError> {
        self.send(MatchCommand::Disconnect { player }).await
    }

    pub async fn snapshot(&self) -> Result<MatchSnapshot, ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MatchCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| ServerError::Unavailable)
    }

    pub async fn shutdown(&self) -> Result<(), ServerError> {
        self.send(MatchCommand::Shutdown).await
    }

    async fn send(&self, command: MatchCommand) -> Result<(), ServerError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ServerError::Unavailable)
    }
}

struct MatchActor {
    state: GameState,
    config: ServerConfig,
    senders: HashMap<usize, EventSender>,
    /// Last sign of life per connected player.
    last_seen: HashMap<usize, Instant>,
    receiver: mpsc::Receiver<MatchCommand>,
}

impl MatchActor {
    async fn run(mut self) {
        tracing::info!(players = self.state.players().len(), "match actor started");
        let mut liveness = time::interval(self.config.liveness_interval);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    match command {
                        Some(MatchCommand::Shutdown) | None => break,
                        Some(command) => self.handle(command),
                    }
                }
                _ = liveness.tick() => self.check_liveness(),
            }
        }

        tracing::info!(winner = ?self.state.winner(), "match actor stopped");
    }

    fn handle(&mut self, command: MatchCommand) {
        match command {
            MatchCommand::Submit {
                player,
                request,
                reply,
            } => {
                self.touch(player);
                let result = self.state.step(player, request).map(|dispatches| {
                    self.dispatch(dispatches);
                });
                let _ = reply.send(result);
            }
            MatchCommand::Connect { player, reply } => {
                let _ = reply.send(self.handle_connect(player));
            }
            MatchCommand::Heartbeat { player } => self.touch(player),
            MatchCommand::Disconnect { player } => {
                self.drop_player(player);
                self.senders.remove(&player);
            }
            MatchCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            MatchCommand::Shutdown => {}
        }
    }

    fn handle_connect(&mut self, player: usize) -> Result<EventReceiver, GameError> {
        if self.state.player(player).is_none() {
            return Err(GameError::UnknownPlayer(player));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(player, tx);
        self.last_seen.insert(player, Instant::now());
        tracing::info!(player, connected = self.senders.len(), "player connected");
        Ok(rx)
    }

    fn touch(&mut self, player: usize) {
        if let Some(seen) = self.last_seen.get_mut(&player) {
            *seen = Instant::now();
        }
    }

    fn check_liveness(&mut self) {
        if self.state.is_finished() {
            return;
        }
        let timeout = self.config.liveness_timeout;
        let mut silent: Vec<usize> = self
            .last_seen
            .iter()
            .filter_map(|(player, seen)| (seen.elapsed() > timeout).then_some(*player))
            .collect();
        if silent.is_empty() {
            return;
        }
        silent.sort_unstable();
        tracing::warn!(players = ?silent, ?timeout, "players timed out");
        self.drop_players(&silent);
    }

    fn drop_player(&mut self, player: usize) {
        self.drop_players(&[player]);
    }

    fn drop_players(&mut self, players: &[usize]) {
        for player in players {
            self.last_seen.remove(player);
        }
        match self.state.connections_lost(players) {
            Ok(dispatches) => self.dispatch(dispatches),
            Err(error) => tracing::debug!(?players, %error, "disconnect ignored"),
        }
    }

    fn dispatch(&self, dispatches: Vec<Dispatch>) {
        for Dispatch { recipient, event } in dispatches {
            for (player, sender) in &self.senders {
                if recipient.includes(*player) {
                    // A closed receiver means the client went away.
                    let _ = sender.send(event.clone());
                }
            }
        }
    }
}

/// Creates a match from `game` and runs it on a new Tokio task.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_match(game: GameConfig, server: ServerConfig) -> Result<MatchHandle, ConfigError> {
    let state = GameState::new(game)?;
    let (tx, rx) = mpsc::channel(server.channel_size);
    let actor = MatchActor {
        state,
        config: server,
        senders: HashMap::new(),
        last_seen: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    Ok(MatchHandle { sender: tx })
}
