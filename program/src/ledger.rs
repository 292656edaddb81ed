use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::{Pubkey, PUBKEY_BYTES};

use crate::{error::LotteryError, state::LotteryState};

/// Entries accepted per round. Decoding a full round must fit the 32 KiB
/// program heap next to everything else an instruction allocates.
pub const MAX_ENTRANTS: usize = 512;

/// Entrants and custody balance of the current round.
///
/// `balance` always equals the sum of the amounts recorded since the last
/// reset, and is non-zero whenever `entrants` is non-empty.
#[derive(BorshSerialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    entrants: Vec<Pubkey>,
    balance: u64,
}

impl Ledger {
    /// Records one entry. Overpayment is kept in full, there are no refunds.
    pub fn record(
        &mut self,
        state: LotteryState,
        entrance_fee: u64,
        sender: Pubkey,
        amount: u64,
    ) -> Result<(), LotteryError> {
        if state != LotteryState::Open {
            return Err(LotteryError::NotOpen);
        }
        if amount == 0 || amount < entrance_fee {
            return Err(LotteryError::InvalidEntranceFee {
                sent: amount,
                required: entrance_fee,
            });
        }

        if self.entrants.len() >= MAX_ENTRANTS {
            return Err(LotteryError::RoundFull {
                capacity: MAX_ENTRANTS as u64,
            });
        }

        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(LotteryError::Overflow)?;
        self.entrants.push(sender);
        self.balance = balance;
        Ok(())
    }

    /// Clears the round in O(1), handing back what was recorded.
    pub fn reset(&mut self) -> Ledger {
        std::mem::take(self)
    }

    pub fn entrants(&self) -> &[Pubkey] {
        &self.entrants
    }

    pub fn entrant(&self, index: usize) -> Option<&Pubkey> {
        self.entrants.get(index)
    }

    pub fn entrant_count(&self) -> usize {
        self.entrants.len()
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    /// Borsh-encoded size: length prefix, keys, balance
    pub fn packed_len(&self) -> usize {
        4 + self.entrants.len() * PUBKEY_BYTES + 8
    }
}

// Same wire format as the derived encoding. The entrant vector is allocated
// once at its final size plus one slot, so an entry never reallocates it.
impl BorshDeserialize for Ledger {
    fn deserialize(buf: &mut &[u8]) -> io::Result<Self> {
        let count = u32::deserialize(buf)? as usize;
        if count > MAX_ENTRANTS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "entrant count exceeds capacity",
            ));
        }

        let mut entrants = Vec::with_capacity(count + 1);
        for _ in 0..count {
            entrants.push(Pubkey::deserialize(buf)?);
        }
        let balance = u64::deserialize(buf)?;
        Ok(Self { entrants, balance })
    }
}
