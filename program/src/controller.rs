use std::fmt::Display;

use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    error::LotteryError,
    events::LotteryEvent,
    ledger::Ledger,
    state::{LotteryConfig, LotteryState, RoundRecord},
    upkeep::{self, UpkeepStatus},
    utils,
    vrf::{PendingRequest, RandomnessGateway},
};

/// Round state machine: `Open -> Calculating -> Open`.
///
/// Owns no storage of its own; it drives the record it was handed and is the
/// only writer of that record.
pub struct RoundController<'a> {
    config: &'a LotteryConfig,
    record: &'a mut RoundRecord,
}

/// Everything a completed drawing overwrites, kept until the payout succeeds
struct Rollback {
    ledger: Ledger,
    gateway: RandomnessGateway,
    state: LotteryState,
    round: u64,
    recent_winner: Option<Pubkey>,
    last_timestamp: UnixTimestamp,
}

impl Rollback {
    fn restore(self, record: &mut RoundRecord) {
        record.ledger = self.ledger;
        record.gateway = self.gateway;
        record.state = self.state;
        record.round = self.round;
        record.recent_winner = self.recent_winner;
        record.last_timestamp = self.last_timestamp;
    }
}

impl<'a> RoundController<'a> {
    pub fn new(config: &'a LotteryConfig, record: &'a mut RoundRecord) -> Self {
        Self { config, record }
    }

    pub fn enter(&mut self, sender: Pubkey, amount: u64) -> Result<LotteryEvent, LotteryError> {
        self.record
            .ledger
            .record(self.record.state, self.config.entrance_fee, sender, amount)?;
        Ok(LotteryEvent::EntryAccepted { entrant: sender })
    }

    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        upkeep::check_upkeep(&*self.record, self.config.interval, now)
    }

    /// Starts a drawing. The upkeep conditions are re-checked here because the
    /// automation trigger may fire late or be replayed.
    pub fn perform_upkeep(&mut self, now: UnixTimestamp) -> Result<LotteryEvent, LotteryError> {
        if !upkeep::should_draw(self.record, self.config.interval, now) {
            return Err(LotteryError::UpkeepNotNeeded {
                balance: self.record.ledger.balance(),
                entrant_count: self.record.ledger.entrant_count() as u64,
                state: self.record.state,
            });
        }

        let request_id = self.record.gateway.request(self.record.round, now)?;
        self.record.state = LotteryState::Calculating;
        Ok(self.draw_requested(request_id))
    }

    /// Consumes the coordinator's answer, records the winner, resets the round
    /// and only then calls `payout` with the already-reset record.
    ///
    /// If `payout` fails every field is restored and the pending request stays
    /// outstanding, so the same fulfillment can be delivered again.
    pub fn fulfill_random_words<F, E>(
        &mut self,
        caller: &Pubkey,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: F,
    ) -> Result<LotteryEvent, LotteryError>
    where
        F: FnOnce(&RoundRecord, &Pubkey, u64) -> Result<(), E>,
        E: Display,
    {
        let mut gateway = self.record.gateway.clone();
        let fulfillment =
            gateway.fulfill(caller, &self.config.coordinator, request_id, random_words)?;

        let winner = utils::winner_index(
            &fulfillment.random_words,
            self.record.ledger.entrant_count(),
        )
        .and_then(|index| self.record.ledger.entrant(index))
        .copied()
        .ok_or(LotteryError::PayoutFailed)?;
        let round = self.record.round;
        let next_round = round.checked_add(1).ok_or(LotteryError::Overflow)?;

        let rollback = Rollback {
            ledger: self.record.ledger.reset(),
            gateway: std::mem::replace(&mut self.record.gateway, gateway),
            state: std::mem::replace(&mut self.record.state, LotteryState::Open),
            round: std::mem::replace(&mut self.record.round, next_round),
            recent_winner: self.record.recent_winner.replace(winner),
            last_timestamp: std::mem::replace(&mut self.record.last_timestamp, now),
        };
        let prize = rollback.ledger.balance();

        if let Err(err) = payout(&*self.record, &winner, prize) {
            msg!("Payout of {} lamports to {} failed: {}", prize, winner, err);
            rollback.restore(self.record);
            return Err(LotteryError::PayoutFailed);
        }

        Ok(LotteryEvent::WinnerPicked {
            winner,
            prize,
            round,
        })
    }

    /// Owner-only recovery for a coordinator that never answered: replaces a
    /// timed-out request with a fresh one for the same entrants.
    pub fn reissue_request(
        &mut self,
        caller: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Vec<LotteryEvent>, LotteryError> {
        if *caller != self.config.owner {
            return Err(LotteryError::Unauthorized);
        }

        let (previous, request_id) = self
            .record
            .gateway
            .reissue(now, self.config.request_timeout)?;
        Ok(vec![
            LotteryEvent::RequestReissued {
                previous,
                request_id,
            },
            self.draw_requested(request_id),
        ])
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn state(&self) -> LotteryState {
        self.record.state
    }

    pub fn entrants(&self) -> &[Pubkey] {
        self.record.ledger.entrants()
    }

    pub fn entrant(&self, index: usize) -> Option<&Pubkey> {
        self.record.ledger.entrant(index)
    }

    pub fn balance(&self) -> u64 {
        self.record.ledger.balance()
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.record.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.record.last_timestamp
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.record.gateway.pending()
    }

    fn draw_requested(&self, request_id: u64) -> LotteryEvent {
        let request = &self.config.request;
        LotteryEvent::DrawRequested {
            request_id,
            round: self.record.round,
            key_hash: request.key_hash,
            subscription_id: request.subscription_id,
            callback_compute_limit: request.callback_compute_limit,
            request_confirmations: request.request_confirmations,
            num_words: request.num_words,
        }
    }
}
