// Randomness requests and their one-shot fulfillment
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::error::LotteryError;

/// The single outstanding randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    /// Round the request was issued for
    pub round: u64,
    pub requested_at: UnixTimestamp,
}

impl PendingRequest {
    pub const LEN: usize = 8 + 8 + 8;
}

/// Random words handed back to the round controller after a fulfillment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomnessFulfillment {
    pub request_id: u64,
    pub round: u64,
    pub random_words: Vec<u64>,
}

/// Issues correlation ids and accepts exactly one fulfillment per id.
///
/// Ids come from a monotonically increasing counter, so a consumed id is never
/// issued again and any replay of it is rejected as unknown.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RandomnessGateway {
    /// Last issued request id; the first request gets id 1
    request_counter: u64,
    pending: Option<PendingRequest>,
}

impl RandomnessGateway {
    pub fn request(&mut self, round: u64, now: UnixTimestamp) -> Result<u64, LotteryError> {
        if self.pending.is_some() {
            return Err(LotteryError::DrawAlreadyInProgress);
        }
        self.issue(round, now)
    }

    /// Consumes the pending request if `request_id` matches it and `caller`
    /// is the configured coordinator.
    pub fn fulfill(
        &mut self,
        caller: &Pubkey,
        coordinator: &Pubkey,
        request_id: u64,
        random_words: &[u64],
    ) -> Result<RandomnessFulfillment, LotteryError> {
        let pending = match self.pending {
            Some(pending) if pending.request_id == request_id => pending,
            _ => return Err(LotteryError::UnknownRequest { request_id }),
        };
        if caller != coordinator {
            return Err(LotteryError::Unauthorized);
        }
        if random_words.is_empty() {
            return Err(LotteryError::NoRandomWords);
        }

        self.pending = None;
        Ok(RandomnessFulfillment {
            request_id,
            round: pending.round,
            random_words: random_words.to_vec(),
        })
    }

    /// Replaces a pending request that has been outstanding for at least
    /// `timeout` seconds. Returns the replaced id and the new one.
    pub fn reissue(
        &mut self,
        now: UnixTimestamp,
        timeout: u64,
    ) -> Result<(u64, u64), LotteryError> {
        let pending = self.pending.ok_or(LotteryError::NoPendingRequest)?;
        let waited = now.saturating_sub(pending.requested_at).max(0) as u64;
        if waited < timeout {
            return Err(LotteryError::RequestNotExpired);
        }

        let request_id = self.issue(pending.round, now)?;
        Ok((pending.request_id, request_id))
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Borsh-encoded size: counter, option tag, pending request
    pub fn packed_len(&self) -> usize {
        8 + 1 + self.pending.map_or(0, |_| PendingRequest::LEN)
    }

    fn issue(&mut self, round: u64, now: UnixTimestamp) -> Result<u64, LotteryError> {
        let request_id = self
            .request_counter
            .checked_add(1)
            .ok_or(LotteryError::Overflow)?;
        self.request_counter = request_id;
        self.pending = Some(PendingRequest {
            request_id,
            round,
            requested_at: now,
        });
        Ok(request_id)
    }
}
