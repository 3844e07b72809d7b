//! The match aggregate. Every mutation goes through [`GameState::step`] or
//! [`GameState::connections_lost`]; each handler validates the whole request
//! before touching anything, so a rejection leaves the state as it was.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::{Board, CornerId, EdgeId, HexId, Locality};
use crate::config::{ConfigError, GameConfig, ShortagePolicy};
use crate::game::action::{CardPlay, Request};
use crate::game::arbiter::{self, SpecialCards};
use crate::game::bank::Bank;
use crate::game::cheats::Cheat;
use crate::game::error::GameError;
use crate::game::events::{Construction, Dispatch, GameEvent, Outbox, PlayerView, Recipient};
use crate::game::players::PlayerState;
use crate::game::resources::{COST_DEVELOPMENT, ResourceBundle};
use crate::game::setup::{BeginnerSelection, SelectionOutcome, SetupRounds};
use crate::game::trade::{Response, Trade, TradeNegotiator, Withdrawal};
use crate::game::validator;
use crate::types::{BuildingKind, Color, DevelopmentCard, MatchPhase, PlayerPhase, Resource};

/// Hands above this size are halved when a 7 is rolled.
pub const DISCARD_THRESHOLD: u32 = 7;
pub const ROBBER_ROLL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDiscard {
    pub player: usize,
    pub count: u32,
}

/// Public picture of a match, safe to show to every participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub current_player: usize,
    pub turn: u32,
    pub robber: HexId,
    pub last_roll: Option<(u8, u8)>,
    pub players: Vec<PlayerView>,
    pub active_trade: Option<Trade>,
    pub longest_road: Option<usize>,
    pub largest_army: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    board: Board,
    players: Vec<PlayerState>,
    bank: Bank,
    special: SpecialCards,
    trades: TradeNegotiator,
    phase: MatchPhase,
    selection: BeginnerSelection,
    setup: Option<SetupRounds>,
    turn_order: Vec<usize>,
    current: usize,
    /// Advances on every turn change; development cards remember it.
    turn: u32,
    last_roll: Option<(u8, u8)>,
    discards: VecDeque<PendingDiscard>,
    /// Phase the robber mover returns to; a knight can come before the roll.
    robber_return: PlayerPhase,
    free_roads: u8,
    forced_dice: Option<(u8, u8)>,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let board = Board::build_with_rng(config.map_type, &mut rng);
        let bank = Bank::standard(&mut rng);
        let players = (0..config.num_players)
            .map(|idx| PlayerState::new(idx, Color::ORDERED[idx]))
            .collect();
        info!(
            players = config.num_players,
            map = %config.map_type,
            seed = ?config.seed,
            "match created"
        );

        Ok(Self {
            board,
            players,
            bank,
            special: SpecialCards::default(),
            trades: TradeNegotiator::default(),
            phase: MatchPhase::ChooseBeginner,
            selection: BeginnerSelection::new((0..config.num_players).collect()),
            setup: None,
            turn_order: (0..config.num_players).collect(),
            current: 0,
            turn: 0,
            last_roll: None,
            discards: VecDeque::new(),
            robber_return: PlayerPhase::TradeOrBuild,
            free_roads: 0,
            forced_dice: None,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn player(&self, idx: usize) -> Option<&PlayerState> {
        self.players.get(idx)
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn current_player(&self) -> usize {
        self.current
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn turn_order(&self) -> &[usize] {
        &self.turn_order
    }

    pub fn last_roll(&self) -> Option<(u8, u8)> {
        self.last_roll
    }

    pub fn active_trade(&self) -> Option<&Trade> {
        self.trades.active()
    }

    pub fn special_cards(&self) -> &SpecialCards {
        &self.special
    }

    pub fn pending_discards(&self) -> impl Iterator<Item = &PendingDiscard> + '_ {
        self.discards.iter()
    }

    pub fn free_roads(&self) -> u8 {
        self.free_roads
    }

    /// Corner the current setup step's road has to touch.
    pub fn setup_anchor(&self) -> Option<CornerId> {
        self.setup.as_ref().and_then(|rounds| rounds.anchor)
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    pub fn winner(&self) -> Option<usize> {
        match self.phase {
            MatchPhase::Finished { winner } => winner,
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            current_player: self.current,
            turn: self.turn,
            robber: self.board.robber(),
            last_roll: self.last_roll,
            players: self.views(),
            active_trade: self.trades.active().cloned(),
            longest_road: self.special.longest_road,
            largest_army: self.special.largest_army,
        }
    }

    /// Applies one request from `actor` and returns the events it produced.
    pub fn step(&mut self, actor: usize, request: Request) -> Result<Vec<Dispatch>, GameError> {
        let name = request.name();
        match self.apply(actor, request) {
            Ok(dispatches) => {
                debug!(
                    player = actor,
                    request = name,
                    events = dispatches.len(),
                    "request applied"
                );
                Ok(dispatches)
            }
            Err(error) => {
                debug!(player = actor, request = name, %error, "request rejected");
                Err(error)
            }
        }
    }

    /// Marks `player` as gone and ends the match without a winner.
    pub fn connection_lost(&mut self, player: usize) -> Result<Vec<Dispatch>, GameError> {
        self.connections_lost(&[player])
    }

    /// Marks every player in `lost` as gone, then ends the match once.
    pub fn connections_lost(&mut self, lost: &[usize]) -> Result<Vec<Dispatch>, GameError> {
        if let Some(&unknown) = lost.iter().find(|&&player| player >= self.players.len()) {
            return Err(GameError::UnknownPlayer(unknown));
        }
        if self.is_finished() || lost.is_empty() {
            return Ok(Vec::new());
        }
        let before = self.views();
        let mut outbox = Outbox::default();
        for &player in lost {
            warn!(player, "connection lost");
            self.players[player].phase = PlayerPhase::ConnectionLost;
        }
        self.finish(None, &mut outbox);
        self.publish_changes(&before, &mut outbox);
        Ok(outbox.into_vec())
    }

    fn apply(&mut self, actor: usize, request: Request) -> Result<Vec<Dispatch>, GameError> {
        if actor >= self.players.len() {
            return Err(GameError::UnknownPlayer(actor));
        }
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        if !request.ignores_turn() && self.players[actor].phase == PlayerPhase::Wait {
            return Err(GameError::NotYourTurn);
        }
        let before = self.views();
        let mut outbox = Outbox::default();
        match request {
            Request::RollDice => self.roll_dice(actor, &mut outbox)?,
            Request::Build { kind, position } => self.build(actor, kind, position, &mut outbox)?,
            Request::BuyDevelopmentCard => self.buy_development_card(actor, &mut outbox)?,
            Request::PlayDevelopmentCard { card } => {
                self.play_development_card(actor, card, &mut outbox)?
            }
            Request::SeaTrade { supply, demand } => {
                self.maritime_trade(actor, supply, demand, &mut outbox)?
            }
            Request::OfferTrade { supply, demand } => {
                self.begin_trade(actor, supply, demand, &mut outbox)?
            }
            Request::AcceptTrade { trade_id, accept } => {
                self.answer_trade(actor, trade_id, accept, &mut outbox)?
            }
            Request::CancelTrade { trade_id } => self.cancel_trade(actor, trade_id, &mut outbox)?,
            Request::FinishTrade { trade_id, partner } => {
                self.finish_trade(actor, trade_id, partner, &mut outbox)?
            }
            Request::MoveRobber { hex, target } => {
                self.move_robber(actor, hex, target, &mut outbox)?
            }
            Request::DiscardResources { resources } => {
                self.discard(actor, resources, &mut outbox)?
            }
            Request::EndTurn => self.end_turn(actor, &mut outbox)?,
            Request::ChatMessage { text } => self.chat(actor, text, &mut outbox)?,
        }
        self.publish_changes(&before, &mut outbox);
        Ok(outbox.into_vec())
    }

    fn require_phase(
        &self,
        actor: usize,
        action: &'static str,
        allowed: &[PlayerPhase],
    ) -> Result<(), GameError> {
        let phase = self.players[actor].phase;
        if allowed.contains(&phase) {
            Ok(())
        } else if phase == PlayerPhase::Wait {
            Err(GameError::NotYourTurn)
        } else {
            Err(GameError::WrongPhase { action, phase })
        }
    }

    fn roll_dice(&mut self, actor: usize, outbox: &mut Outbox) -> Result<(), GameError> {
        self.require_phase(
            actor,
            "roll dice",
            &[PlayerPhase::SetupAwaitStart, PlayerPhase::RollDice],
        )?;
        let selecting = self.players[actor].phase == PlayerPhase::SetupAwaitStart;
        if selecting && !self.selection.may_roll(actor) {
            return Err(GameError::NotYourTurn);
        }
        let dice = match self.forced_dice.take() {
            Some(fixed) => fixed,
            None => (self.roll_die(), self.roll_die()),
        };
        let sum = dice.0 + dice.1;
        outbox.broadcast(GameEvent::DiceRolled {
            player: actor,
            dice,
            sum,
        });

        if selecting {
            self.players[actor].phase = PlayerPhase::Wait;
            match self.selection.record(actor, sum) {
                SelectionOutcome::Pending => {}
                SelectionOutcome::Reroll(tied) => {
                    debug!(?tied, "beginner roll tied");
                    for player in tied {
                        self.players[player].phase = PlayerPhase::SetupAwaitStart;
                    }
                }
                SelectionOutcome::Decided(beginner) => self.begin_setup(beginner, outbox),
            }
            return Ok(());
        }

        self.last_roll = Some(dice);
        if sum == ROBBER_ROLL {
            self.begin_discard_phase(actor);
        } else {
            self.distribute_resources(sum, outbox);
            self.players[actor].phase = PlayerPhase::TradeOrBuild;
            self.set_match_phase(MatchPhase::BuildTradePhase, outbox);
        }
        Ok(())
    }

    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    fn begin_setup(&mut self, beginner: usize, outbox: &mut Outbox) {
        let count = self.players.len();
        self.turn_order = (0..count).map(|i| (beginner + i) % count).collect();
        for player in &mut self.players {
            player.phase = PlayerPhase::Wait;
        }
        self.players[beginner].phase = PlayerPhase::BuildFreeSettlement;
        self.current = beginner;
        self.setup = Some(SetupRounds::new(&self.turn_order));
        info!(beginner, order = ?self.turn_order, "beginner chosen");
        self.set_match_phase(MatchPhase::FreeBuild, outbox);
    }

    fn advance_setup(&mut self, actor: usize, outbox: &mut Outbox) {
        self.players[actor].phase = PlayerPhase::Wait;
        match self.setup.as_mut().and_then(SetupRounds::advance) {
            Some(next) => {
                self.current = next;
                self.players[next].phase = PlayerPhase::BuildFreeSettlement;
            }
            None => {
                self.setup = None;
                let first = self.turn_order[0];
                info!(first, "setup finished");
                self.start_turn(first, outbox);
            }
        }
    }

    fn start_turn(&mut self, player: usize, outbox: &mut Outbox) {
        self.current = player;
        self.turn += 1;
        self.free_roads = 0;
        self.robber_return = PlayerPhase::TradeOrBuild;
        let state = &mut self.players[player];
        state.played_card_this_turn = false;
        state.phase = PlayerPhase::RollDice;
        self.set_match_phase(MatchPhase::RollDicePhase, outbox);
    }

    fn end_turn(&mut self, actor: usize, outbox: &mut Outbox) -> Result<(), GameError> {
        self.require_phase(actor, "end turn", &[PlayerPhase::TradeOrBuild])?;
        if let Some(trade) = self.trades.clear() {
            outbox.broadcast(GameEvent::TradeCanceled { trade_id: trade.id });
        }
        self.players[actor].played_card_this_turn = false;
        self.players[actor].phase = PlayerPhase::Wait;
        let next = self.next_in_turn_order(actor);
        self.start_turn(next, outbox);
        Ok(())
    }

    fn next_in_turn_order(&self, player: usize) -> usize {
        let pos = self
            .turn_order
            .iter()
            .position(|p| *p == player)
            .unwrap_or(0);
        self.turn_order[(pos + 1) % self.turn_order.len()]
    }

    /// Turn order rotated to start at `player`.
    fn rotation_from(&self, player: usize) -> Vec<usize> {
        let pos = self
            .turn_order
            .iter()
            .position(|p| *p == player)
            .unwrap_or(0);
        let count = self.turn_order.len();
        (0..count)
            .map(|i| self.turn_order[(pos + i) % count])
            .collect()
    }

    fn distribute_resources(&mut self, sum: u8, outbox: &mut Outbox) {
        let mut claims = vec![ResourceBundle::zero(); self.players.len()];
        let robber = self.board.robber();
        for hex in self.board.hexes() {
            if hex.number != Some(sum) || hex.id == robber {
                continue;
            }
            let Some(resource) = hex.resource else {
                continue;
            };
            for corner in hex.corners {
                if let Some(locality) = self.board.locality_at(corner) {
                    claims[locality.owner()].add(resource, locality.yield_multiplier());
                }
            }
        }

        let payouts = match self.config.shortage_policy {
            ShortagePolicy::PerPlayer => self.per_player_payouts(&claims),
            ShortagePolicy::Tabletop => self.tabletop_payouts(&claims),
        };
        for player in self.rotation_from(self.current) {
            let grant = payouts[player];
            if grant.is_empty() {
                continue;
            }
            if self.bank.dispense(&grant).is_ok() {
                self.players[player].add_resources(&grant);
                outbox.resource_gain(player, grant);
            }
        }
    }

    fn per_player_payouts(&self, claims: &[ResourceBundle]) -> Vec<ResourceBundle> {
        let mut stock = *self.bank.resources();
        let mut payouts = vec![ResourceBundle::zero(); claims.len()];
        for player in self.rotation_from(self.current) {
            for (resource, amount) in claims[player].present() {
                if stock.subtract(resource, amount).is_ok() {
                    payouts[player].add(resource, amount);
                } else {
                    debug!(player, %resource, amount, "bank short, claim skipped");
                }
            }
        }
        payouts
    }

    fn tabletop_payouts(&self, claims: &[ResourceBundle]) -> Vec<ResourceBundle> {
        let mut payouts = vec![ResourceBundle::zero(); claims.len()];
        for resource in Resource::ALL {
            let claimants: Vec<usize> = (0..claims.len())
                .filter(|p| claims[*p].get(resource) > 0)
                .collect();
            let owed: u32 = claimants
                .iter()
                .map(|p| claims[*p].get(resource) as u32)
                .sum();
            if owed == 0 {
                continue;
            }
            let available = self.bank.available(resource);
            if owed <= available as u32 {
                for player in claimants {
                    payouts[player].add(resource, claims[player].get(resource));
                }
            } else if let [only] = claimants.as_slice() {
                payouts[*only].add(resource, available);
            } else {
                debug!(%resource, owed, available, "bank short, nobody paid");
            }
        }
        payouts
    }

    /// Second-round setup settlements yield one card per adjacent land hex.
    fn award_starting_resources(&mut self, player: usize, corner: CornerId, outbox: &mut Outbox) {
        let mut grant = ResourceBundle::zero();
        if let Some(site) = self.board.corner(corner) {
            for hex in &site.hexes {
                if let Some(resource) = self.board.hex(*hex).and_then(|h| h.resource) {
                    if self.bank.available(resource) > grant.get(resource) {
                        grant.add(resource, 1);
                    }
                }
            }
        }
        if !grant.is_empty() && self.bank.dispense(&grant).is_ok() {
            self.players[player].add_resources(&grant);
            outbox.resource_gain(player, grant);
        }
    }

    fn begin_discard_phase(&mut self, roller: usize) {
        let queue: VecDeque<PendingDiscard> = self
            .rotation_from(roller)
            .into_iter()
            .filter_map(|player| {
                let hand = self.players[player].hand_size();
                (hand > DISCARD_THRESHOLD).then_some(PendingDiscard {
                    player,
                    count: hand / 2,
                })
            })
            .collect();
        debug!(pending = queue.len(), "robber rolled");
        self.discards = queue;
        self.robber_return = PlayerPhase::TradeOrBuild;
        self.players[roller].phase = PlayerPhase::Wait;
        self.advance_discards();
    }

    /// Hands the discard turn to the next player in line, or the robber to
    /// the roller once everyone has discarded.
    fn advance_discards(&mut self) {
        match self.discards.front() {
            Some(pending) => self.players[pending.player].phase = PlayerPhase::DiscardResources,
            None => self.players[self.current].phase = PlayerPhase::MoveRobber,
        }
    }

    fn discard(
        &mut self,
        actor: usize,
        resources: ResourceBundle,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        self.require_phase(actor, "discard", &[PlayerPhase::DiscardResources])?;
        let pending = self
            .discards
            .front()
            .copied()
            .filter(|pending| pending.player == actor)
            .ok_or(GameError::NotYourTurn)?;
        let offered = resources.total();
        if offered != pending.count {
            return Err(GameError::WrongDiscardCount {
                required: pending.count,
                offered,
            });
        }
        self.pay_cost(actor, &resources)?;
        outbox.resource_loss(actor, resources);
        self.discards.pop_front();
        self.players[actor].phase = PlayerPhase::Wait;
        self.advance_discards();
        Ok(())
    }

    fn move_robber(
        &mut self,
        actor: usize,
        hex: HexId,
        target: Option<usize>,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        self.require_phase(actor, "move robber", &[PlayerPhase::MoveRobber])?;
        self.board.hex(hex).ok_or(GameError::UnknownHex(hex))?;
        if hex == self.board.robber() {
            return Err(GameError::IllegalRobberMove(
                "the robber must move to another hex",
            ));
        }
        let eligible: Vec<usize> = self
            .board
            .owners_around(hex)
            .into_iter()
            .filter(|p| *p != actor)
            .collect();
        let holding: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|p| self.players[*p].hand_size() > 0)
            .collect();
        let victim = match target {
            Some(victim) if victim == actor => {
                return Err(GameError::IllegalRobberMove("you cannot rob yourself"));
            }
            Some(victim) if !eligible.contains(&victim) => {
                return Err(GameError::IllegalRobberMove(
                    "target has no building on that hex",
                ));
            }
            Some(victim) if !holding.is_empty() && !holding.contains(&victim) => {
                return Err(GameError::IllegalRobberMove("target holds no cards"));
            }
            None if !holding.is_empty() => {
                return Err(GameError::IllegalRobberMove("a player to rob must be chosen"));
            }
            other => other,
        };

        self.board.set_robber(hex);
        outbox.broadcast(GameEvent::RobberMoved {
            player: actor,
            hex,
            victim,
        });
        if let Some(victim) = victim {
            self.steal_random_resource(actor, victim, outbox);
        }
        let back = self.robber_return;
        self.players[actor].phase = back;
        if back == PlayerPhase::TradeOrBuild {
            self.set_match_phase(MatchPhase::BuildTradePhase, outbox);
        }
        Ok(())
    }

    fn steal_random_resource(&mut self, thief: usize, victim: usize, outbox: &mut Outbox) {
        let hand = self.players[victim].hand_size();
        if hand == 0 {
            return;
        }
        let nth = self.rng.gen_range(0..hand);
        let Some(resource) = self.players[victim].resources.nth_card(nth) else {
            return;
        };
        let card = ResourceBundle::single(resource, 1);
        if self.players[victim].remove_resources(&card).is_ok() {
            self.players[thief].add_resources(&card);
            outbox.resource_loss(victim, card);
            outbox.resource_gain(thief, card);
        }
    }

    fn build(
        &mut self,
        actor: usize,
        kind: BuildingKind,
        position: u16,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let phase = self.players[actor].phase;
        match (kind, phase) {
            (BuildingKind::Settlement, PlayerPhase::BuildFreeSettlement) => {
                self.build_settlement(actor, position, true, outbox)?
            }
            (BuildingKind::Road, PlayerPhase::BuildFreeRoad) => {
                self.build_road(actor, position, true, outbox)?
            }
            (BuildingKind::Settlement, PlayerPhase::TradeOrBuild) => {
                self.build_settlement(actor, position, false, outbox)?
            }
            (BuildingKind::City, PlayerPhase::TradeOrBuild) => {
                self.build_city(actor, position, outbox)?
            }
            (BuildingKind::Road, PlayerPhase::TradeOrBuild) => {
                self.build_road(actor, position, false, outbox)?
            }
            (_, PlayerPhase::Wait) => return Err(GameError::NotYourTurn),
            (kind, phase) => {
                return Err(GameError::WrongPhase {
                    action: build_label(kind),
                    phase,
                });
            }
        }
        self.check_victory(actor, outbox);
        Ok(())
    }

    fn pay_cost(&mut self, player: usize, cost: &ResourceBundle) -> Result<(), GameError> {
        self.players[player]
            .remove_resources(cost)
            .map_err(|_| GameError::InsufficientResources)?;
        self.bank.receive(cost);
        Ok(())
    }

    fn build_settlement(
        &mut self,
        actor: usize,
        corner: CornerId,
        free: bool,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        validator::check_settlement(&self.board, &self.players[actor], corner, !free)?;
        if !free {
            let cost = validator::cost_of(BuildingKind::Settlement);
            validator::check_cost(&self.players[actor], &cost)?;
            self.pay_cost(actor, &cost)?;
            outbox.resource_loss(actor, cost);
        }

        self.board
            .set_locality(corner, Locality::Settlement { owner: actor });
        let harbor = self.board.corner(corner).and_then(|site| site.harbor);
        let player = &mut self.players[actor];
        player.settlements += 1;
        if let Some(harbor) = harbor {
            player.apply_harbor(harbor);
        }
        outbox.broadcast(GameEvent::Built {
            player: actor,
            construction: Construction::Settlement(corner),
        });

        let split = arbiter::split_candidates(&self.board, corner, actor);
        if !split.is_empty() {
            debug!(corner, ?split, "settlement may split roads");
            self.refresh_longest_road(&split, outbox);
        }

        if free {
            let second_round = match self.setup.as_mut() {
                Some(rounds) => {
                    rounds.anchor = Some(corner);
                    rounds.is_second_round()
                }
                None => false,
            };
            if second_round {
                self.award_starting_resources(actor, corner, outbox);
            }
            self.players[actor].phase = PlayerPhase::BuildFreeRoad;
        }
        Ok(())
    }

    fn build_city(
        &mut self,
        actor: usize,
        corner: CornerId,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        validator::check_city(&self.board, &self.players[actor], corner)?;
        let cost = validator::cost_of(BuildingKind::City);
        validator::check_cost(&self.players[actor], &cost)?;
        self.pay_cost(actor, &cost)?;
        outbox.resource_loss(actor, cost);

        self.board.set_locality(corner, Locality::City { owner: actor });
        let player = &mut self.players[actor];
        player.settlements -= 1;
        player.cities += 1;
        outbox.broadcast(GameEvent::Built {
            player: actor,
            construction: Construction::City(corner),
        });
        Ok(())
    }

    fn build_road(
        &mut self,
        actor: usize,
        edge: EdgeId,
        setup: bool,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let anchor = if setup {
            Some(self.setup_anchor().ok_or(GameError::IllegalBuildPosition(
                "place the setup settlement first",
            ))?)
        } else {
            None
        };
        validator::check_road(&self.board, &self.players[actor], edge, anchor)?;
        let paid = !setup && self.free_roads == 0;
        if paid {
            let cost = validator::cost_of(BuildingKind::Road);
            validator::check_cost(&self.players[actor], &cost)?;
            self.pay_cost(actor, &cost)?;
            outbox.resource_loss(actor, cost);
        } else if !setup {
            self.free_roads -= 1;
        }

        self.board.set_road(edge, actor);
        self.players[actor].roads += 1;
        outbox.broadcast(GameEvent::Built {
            player: actor,
            construction: Construction::Road(edge),
        });
        self.refresh_longest_road(&[actor], outbox);

        if setup {
            self.advance_setup(actor, outbox);
        }
        Ok(())
    }

    fn refresh_longest_road(&mut self, changed: &[usize], outbox: &mut Outbox) {
        let Some(transfer) = self
            .special
            .refresh_longest_road(&self.board, &mut self.players, changed)
        else {
            return;
        };
        let length = transfer
            .owner
            .map(|owner| self.players[owner].longest_road)
            .unwrap_or(0);
        info!(previous = ?transfer.previous, owner = ?transfer.owner, length, "longest road changed");
        outbox.broadcast(GameEvent::LongestRoadChanged {
            previous: transfer.previous,
            owner: transfer.owner,
            length,
        });
    }

    fn buy_development_card(&mut self, actor: usize, outbox: &mut Outbox) -> Result<(), GameError> {
        self.require_phase(actor, "buy development card", &[PlayerPhase::TradeOrBuild])?;
        validator::check_cost(&self.players[actor], &COST_DEVELOPMENT)?;
        if self.bank.development_deck_len() == 0 {
            return Err(GameError::OutOfCards);
        }
        let card = self.bank.draw_development_card()?;
        self.pay_cost(actor, &COST_DEVELOPMENT)?;
        outbox.resource_loss(actor, COST_DEVELOPMENT);

        self.players[actor].add_dev_card(card, self.turn);
        self.announce_card(actor, card, outbox);
        self.check_victory(actor, outbox);
        Ok(())
    }

    fn announce_card(&self, player: usize, card: DevelopmentCard, outbox: &mut Outbox) {
        outbox.send(
            Recipient::Player(player),
            GameEvent::DevelopmentCardBought {
                player,
                card: Some(card),
            },
        );
        outbox.send(
            Recipient::AllExcept(player),
            GameEvent::DevelopmentCardBought { player, card: None },
        );
    }

    fn play_development_card(
        &mut self,
        actor: usize,
        play: CardPlay,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let card = play.card();
        let allowed: &[PlayerPhase] = match play {
            CardPlay::Knight => &[PlayerPhase::RollDice, PlayerPhase::TradeOrBuild],
            _ => &[PlayerPhase::TradeOrBuild],
        };
        self.require_phase(actor, "play development card", allowed)?;
        self.players[actor].playable_card(card, self.turn)?;
        match play {
            CardPlay::RoadBuilding if self.players[actor].pieces_left(BuildingKind::Road) == 0 => {
                return Err(GameError::PieceLimit(BuildingKind::Road));
            }
            CardPlay::YearOfPlenty { first, second } => {
                let wanted = year_of_plenty_bundle(first, second);
                if let Some((resource, _)) = wanted
                    .present()
                    .find(|(resource, amount)| self.bank.available(*resource) < *amount)
                {
                    return Err(GameError::BankDepleted(resource));
                }
            }
            _ => {}
        }

        let played_from = self.players[actor].phase;
        self.players[actor].consume_card(card, self.turn)?;
        outbox.broadcast(GameEvent::DevelopmentCardPlayed {
            player: actor,
            card,
        });
        info!(player = actor, %card, "development card played");

        match play {
            CardPlay::Knight => {
                self.robber_return = played_from;
                self.players[actor].phase = PlayerPhase::MoveRobber;
                if let Some(transfer) = self.special.refresh_largest_army(&mut self.players, actor)
                {
                    let knights = transfer
                        .owner
                        .map(|owner| self.players[owner].knights_played)
                        .unwrap_or(0);
                    outbox.broadcast(GameEvent::LargestArmyChanged {
                        previous: transfer.previous,
                        owner: transfer.owner,
                        knights,
                    });
                }
            }
            CardPlay::RoadBuilding => {
                self.free_roads = self.players[actor].pieces_left(BuildingKind::Road).min(2);
            }
            CardPlay::YearOfPlenty { first, second } => {
                let wanted = year_of_plenty_bundle(first, second);
                if self.bank.dispense(&wanted).is_ok() {
                    self.players[actor].add_resources(&wanted);
                    outbox.resource_gain(actor, wanted);
                }
            }
            CardPlay::Monopoly { resource } => self.play_monopoly(actor, resource, outbox),
        }
        self.check_victory(actor, outbox);
        Ok(())
    }

    fn play_monopoly(&mut self, actor: usize, resource: Resource, outbox: &mut Outbox) {
        let mut collected = ResourceBundle::zero();
        for victim in self.rotation_from(actor) {
            if victim == actor {
                continue;
            }
            let amount = self.players[victim].resources.get(resource);
            if amount == 0 {
                continue;
            }
            let taken = ResourceBundle::single(resource, amount);
            if self.players[victim].remove_resources(&taken).is_ok() {
                collected.add_bundle(&taken);
                outbox.resource_loss(victim, taken);
            }
        }
        self.players[actor].add_resources(&collected);
        outbox.resource_gain(actor, collected);
    }

    fn maritime_trade(
        &mut self,
        actor: usize,
        supply: ResourceBundle,
        demand: ResourceBundle,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        self.require_phase(actor, "sea trade", &[PlayerPhase::TradeOrBuild])?;
        if supply.is_empty() || demand.is_empty() {
            return Err(GameError::InvalidTrade(
                "supply and demand must both be non-empty",
            ));
        }
        if !supply.is_disjoint(&demand) {
            return Err(GameError::InvalidTrade(
                "supply and demand must name different resources",
            ));
        }
        let player = &self.players[actor];
        let mut units = 0u32;
        for (resource, amount) in supply.present() {
            let ratio = player.ratio(resource);
            if amount % ratio != 0 {
                return Err(GameError::WrongTradeRatio);
            }
            units += (amount / ratio) as u32;
        }
        if units != demand.total() {
            return Err(GameError::WrongTradeRatio);
        }
        validator::check_cost(player, &supply)?;
        if let Some((resource, _)) = demand
            .present()
            .find(|(resource, amount)| self.bank.available(*resource) < *amount)
        {
            return Err(GameError::BankDepleted(resource));
        }

        self.pay_cost(actor, &supply)?;
        if self.bank.dispense(&demand).is_ok() {
            self.players[actor].add_resources(&demand);
        }
        outbox.resource_loss(actor, supply);
        outbox.resource_gain(actor, demand);
        Ok(())
    }

    fn begin_trade(
        &mut self,
        actor: usize,
        supply: ResourceBundle,
        demand: ResourceBundle,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        self.require_phase(actor, "offer trade", &[PlayerPhase::TradeOrBuild])?;
        let trade = self.trades.open(&self.players[actor], supply, demand)?.clone();
        debug!(trade_id = %trade.id, offerer = actor, "trade offered");
        outbox.broadcast(GameEvent::TradeOffered { trade });
        Ok(())
    }

    fn answer_trade(
        &mut self,
        actor: usize,
        trade_id: uuid::Uuid,
        accept: bool,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        let response =
            self.trades
                .respond(trade_id, &self.players[actor], accept, self.players.len())?;
        outbox.broadcast(GameEvent::TradeAccepted {
            trade_id,
            player: actor,
            accepted: accept,
        });
        if let Response::DeclinedByAll(trade) = response {
            debug!(trade_id = %trade.id, "trade declined by everyone");
            outbox.broadcast(GameEvent::TradeCanceled { trade_id: trade.id });
        }
        Ok(())
    }

    fn cancel_trade(
        &mut self,
        actor: usize,
        trade_id: uuid::Uuid,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        match self.trades.withdraw(trade_id, actor)? {
            Withdrawal::Cancelled(trade) => {
                outbox.broadcast(GameEvent::TradeCanceled { trade_id: trade.id });
            }
            Withdrawal::AcceptanceWithdrawn => {
                outbox.broadcast(GameEvent::TradeAccepted {
                    trade_id,
                    player: actor,
                    accepted: false,
                });
            }
        }
        Ok(())
    }

    fn finish_trade(
        &mut self,
        actor: usize,
        trade_id: uuid::Uuid,
        partner: usize,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        self.require_phase(actor, "finish trade", &[PlayerPhase::TradeOrBuild])?;
        if partner >= self.players.len() {
            return Err(GameError::UnknownPlayer(partner));
        }
        let trade = self
            .trades
            .settle(trade_id, actor, partner, &mut self.players)?;
        info!(trade_id = %trade.id, offerer = trade.offerer, partner, "trade executed");
        outbox.broadcast(GameEvent::TradeExecuted {
            trade_id: trade.id,
            offerer: trade.offerer,
            partner,
            supply: trade.supply,
            demand: trade.demand,
        });
        Ok(())
    }

    fn chat(&mut self, actor: usize, text: String, outbox: &mut Outbox) -> Result<(), GameError> {
        if !Cheat::is_command(&text) {
            outbox.broadcast(GameEvent::Chat {
                player: actor,
                text,
            });
            return Ok(());
        }
        if !self.config.cheats_enabled {
            return Err(GameError::CheatsDisabled);
        }
        let cheat: Cheat = text.parse()?;
        info!(player = actor, ?cheat, "operator command");
        self.apply_cheat(actor, cheat, outbox)
    }

    fn apply_cheat(
        &mut self,
        actor: usize,
        cheat: Cheat,
        outbox: &mut Outbox,
    ) -> Result<(), GameError> {
        match cheat {
            Cheat::Give { resource, amount } => {
                let amount = amount.min(self.bank.available(resource));
                let grant = ResourceBundle::single(resource, amount);
                if self.bank.dispense(&grant).is_ok() {
                    self.players[actor].add_resources(&grant);
                    outbox.resource_gain(actor, grant);
                }
            }
            Cheat::Win => self.finish(Some(actor), outbox),
            Cheat::Lose => {
                let winner = self
                    .players
                    .iter()
                    .filter(|player| player.index != actor)
                    .max_by(|a, b| {
                        a.total_points()
                            .cmp(&b.total_points())
                            .then(b.index.cmp(&a.index))
                    })
                    .map(|player| player.index);
                self.finish(winner, outbox);
            }
            Cheat::Robber(hex) => {
                self.board.hex(hex).ok_or(GameError::UnknownHex(hex))?;
                self.board.set_robber(hex);
                outbox.broadcast(GameEvent::RobberMoved {
                    player: actor,
                    hex,
                    victim: None,
                });
            }
            Cheat::DevCard(card) => {
                let card = self
                    .bank
                    .take_development_card(card)
                    .ok_or(GameError::OutOfCards)?;
                self.players[actor].add_dev_card(card, self.turn.saturating_sub(1));
                self.announce_card(actor, card, outbox);
                self.check_victory(actor, outbox);
            }
            Cheat::Dice(a, b) => self.forced_dice = Some((a, b)),
        }
        Ok(())
    }

    fn check_victory(&mut self, actor: usize, outbox: &mut Outbox) {
        if self.is_finished() {
            return;
        }
        let points = self.players[actor].total_points();
        if points >= self.config.vps_to_win {
            self.finish(Some(actor), outbox);
        }
    }

    fn finish(&mut self, winner: Option<usize>, outbox: &mut Outbox) {
        if let Some(trade) = self.trades.clear() {
            outbox.broadcast(GameEvent::TradeCanceled { trade_id: trade.id });
        }
        self.discards.clear();
        self.set_match_phase(MatchPhase::Finished { winner }, outbox);
        outbox.broadcast(GameEvent::GameFinished { winner });
        info!(?winner, turn = self.turn, "match finished");
    }

    fn set_match_phase(&mut self, phase: MatchPhase, outbox: &mut Outbox) {
        if self.phase != phase {
            self.phase = phase;
            outbox.broadcast(GameEvent::MatchPhaseChanged { phase });
        }
    }

    fn views(&self) -> Vec<PlayerView> {
        self.players.iter().map(PlayerView::from).collect()
    }

    fn publish_changes(&self, before: &[PlayerView], outbox: &mut Outbox) {
        for (player, previous) in self.players.iter().zip(before) {
            if PlayerView::from(player) != *previous {
                outbox.state_update(player);
            }
        }
    }
}

fn build_label(kind: BuildingKind) -> &'static str {
    match kind {
        BuildingKind::Settlement => "build settlement",
        BuildingKind::City => "build city",
        BuildingKind::Road => "build road",
    }
}

fn year_of_plenty_bundle(first: Resource, second: Option<Resource>) -> ResourceBundle {
    let mut bundle = ResourceBundle::single(first, 1);
    if let Some(second) = second {
        bundle.add(second, 1);
    }
    bundle
}
