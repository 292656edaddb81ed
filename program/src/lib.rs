// Lottery Program
// A time-boxed raffle on Solana: entries accumulate in a vault and a single
// winner is drawn from oracle randomness once every interval.

// Core modules
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

// Round lifecycle
pub mod controller;
pub mod events;
pub mod ledger;
pub mod upkeep;

// Randomness requests and fulfillment
pub mod vrf;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
