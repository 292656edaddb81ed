// Lottery Program - Instructions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    state::RequestParams,
    utils::{find_config_address, find_lottery_address, find_vault_address},
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Create the config, round record and vault accounts
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The owner, pays for the new accounts
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[writable]` The lottery account (PDA)
    /// 3. `[writable]` The vault account (PDA)
    /// 4. `[]` The system program
    Initialize {
        /// Minimum entry payment in lamports
        entrance_fee: u64,
        /// Seconds between drawings
        interval: u64,
        /// Oracle endpoint allowed to fulfill requests
        coordinator: Pubkey,
        request: RequestParams,
        /// Seconds before the owner may reissue a pending request
        request_timeout: u64,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The entrant (pays the entry)
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[writable]` The vault account
    /// 4. `[]` The system program
    Enter {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether a drawing should start; the answer is the return data
    ///
    /// Accounts expected:
    /// 0. `[]` The config account
    /// 1. `[]` The lottery account
    CheckUpkeep,

    /// Start a drawing if the upkeep conditions hold
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller (automation)
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    PerformUpkeep {
        /// Context returned by `CheckUpkeep`; the conditions are re-checked regardless
        perform_data: Vec<u8>,
    },

    /// Deliver randomness for the pending request and pay the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[writable]` The vault account
    /// 4. `[writable]` The winner (the entrant selected by the first random word)
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },

    /// Replace the coordinator (owner only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    /// 1. `[writable]` The config account
    SetCoordinator { coordinator: Pubkey },

    /// Replace a timed-out randomness request with a fresh one (owner only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    ReissueRequest,
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }
}

/// Create initialize instruction
pub fn initialize(
    program_id: &Pubkey,
    owner: &Pubkey,
    entrance_fee: u64,
    interval: u64,
    coordinator: &Pubkey,
    request: RequestParams,
    request_timeout: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(find_config_address(program_id).0, false),
        AccountMeta::new(find_lottery_address(program_id).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::Initialize {
            entrance_fee,
            interval,
            coordinator: *coordinator,
            request,
            request_timeout,
        },
        accounts,
    )
}

/// Create enter instruction
pub fn enter(program_id: &Pubkey, entrant: &Pubkey, amount: u64) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*entrant, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(find_lottery_address(program_id).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction::new_with_borsh(*program_id, &LotteryInstruction::Enter { amount }, accounts)
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new_readonly(find_lottery_address(program_id).0, false),
    ];

    Instruction::new_with_borsh(*program_id, &LotteryInstruction::CheckUpkeep, accounts)
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(program_id: &Pubkey, caller: &Pubkey, perform_data: Vec<u8>) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(find_lottery_address(program_id).0, false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::PerformUpkeep { perform_data },
        accounts,
    )
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*coordinator, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(find_lottery_address(program_id).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::FulfillRandomWords {
            request_id,
            random_words,
        },
        accounts,
    )
}

/// Create set_coordinator instruction
pub fn set_coordinator(program_id: &Pubkey, owner: &Pubkey, coordinator: &Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*owner, true),
        AccountMeta::new(find_config_address(program_id).0, false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::SetCoordinator {
            coordinator: *coordinator,
        },
        accounts,
    )
}

/// Create reissue_request instruction
pub fn reissue_request(program_id: &Pubkey, owner: &Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*owner, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(find_lottery_address(program_id).0, false),
    ];

    Instruction::new_with_borsh(*program_id, &LotteryInstruction::ReissueRequest, accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_rejects_garbage() {
        assert_eq!(
            LotteryInstruction::unpack(&[42]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn fulfill_instruction_targets_lottery_accounts() {
        let program_id = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();
        let winner = Pubkey::new_unique();
        let ix = fulfill_random_words(&program_id, &coordinator, &winner, 3, vec![17]);

        assert_eq!(ix.program_id, program_id);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[2].pubkey, find_lottery_address(&program_id).0);
        assert_eq!(ix.accounts[3].pubkey, find_vault_address(&program_id).0);
        assert!(ix.accounts[4].is_writable);
        assert_eq!(
            LotteryInstruction::unpack(&ix.data).unwrap(),
            LotteryInstruction::FulfillRandomWords {
                request_id: 3,
                random_words: vec![17],
            }
        );
    }
}
