use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{entrypoint::ProgramResult, log::sol_log_data, msg, pubkey::Pubkey};

use crate::utils::lamports_to_sol;

/// Observations emitted by the lottery.
///
/// Each event is logged once as text and once as borsh bytes through
/// `sol_log_data`; off-chain coordinators and automation watch the latter.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    EntryAccepted {
        entrant: Pubkey,
    },
    /// Randomness requested; carries everything the coordinator needs to serve it
    DrawRequested {
        request_id: u64,
        round: u64,
        key_hash: [u8; 32],
        subscription_id: u64,
        callback_compute_limit: u32,
        request_confirmations: u16,
        num_words: u32,
    },
    WinnerPicked {
        winner: Pubkey,
        prize: u64,
        round: u64,
    },
    RequestReissued {
        previous: u64,
        request_id: u64,
    },
    CoordinatorUpdated {
        coordinator: Pubkey,
    },
}

impl LotteryEvent {
    pub fn emit(&self) -> ProgramResult {
        match self {
            LotteryEvent::EntryAccepted { entrant } => {
                msg!("EntryAccepted: entrant={}", entrant)
            }
            LotteryEvent::DrawRequested {
                request_id, round, ..
            } => msg!("DrawRequested: request_id={}, round={}", request_id, round),
            LotteryEvent::WinnerPicked {
                winner,
                prize,
                round,
            } => msg!(
                "WinnerPicked: winner={}, prize={} SOL, round={}",
                winner,
                lamports_to_sol(*prize),
                round
            ),
            LotteryEvent::RequestReissued {
                previous,
                request_id,
            } => msg!(
                "RequestReissued: previous={}, request_id={}",
                previous,
                request_id
            ),
            LotteryEvent::CoordinatorUpdated { coordinator } => {
                msg!("CoordinatorUpdated: coordinator={}", coordinator)
            }
        }

        let payload = self.try_to_vec()?;
        sol_log_data(&[&payload]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_events() -> Vec<LotteryEvent> {
        vec![
            LotteryEvent::EntryAccepted {
                entrant: Pubkey::new_unique(),
            },
            LotteryEvent::DrawRequested {
                request_id: 1,
                round: 1,
                key_hash: [0xd8; 32],
                subscription_id: 9,
                callback_compute_limit: 500_000,
                request_confirmations: 3,
                num_words: 1,
            },
            LotteryEvent::WinnerPicked {
                winner: Pubkey::new_unique(),
                prize: 350,
                round: 1,
            },
            LotteryEvent::RequestReissued {
                previous: 1,
                request_id: 2,
            },
            LotteryEvent::CoordinatorUpdated {
                coordinator: Pubkey::new_unique(),
            },
        ]
    }

    #[test]
    fn logged_payloads_decode_with_stable_tags() {
        for (tag, event) in all_events().into_iter().enumerate() {
            let payload = event.try_to_vec().unwrap();
            assert_eq!(payload[0] as usize, tag);
            assert_eq!(LotteryEvent::try_from_slice(&payload).unwrap(), event);
            assert_eq!(event.emit(), Ok(()));
        }
    }
}
