// Lottery Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::{ProgramResult, MAX_PERMITTED_DATA_INCREASE},
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::{PrintProgramError, ProgramError},
    program_pack::Pack,
    pubkey::{Pubkey, PUBKEY_BYTES},
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::{
    controller::RoundController,
    error::LotteryError,
    events::LotteryEvent,
    instruction::LotteryInstruction,
    state::{LotteryConfig, RequestParams, RoundRecord, CONFIG_SEED, LOTTERY_SEED, VAULT_SEED},
    utils::{find_config_address, find_lottery_address, find_vault_address, lamports_to_sol},
};

/// Entrant slots added each time the lottery account has to grow
const ENTRANT_CHUNK: usize = 32;

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::Initialize {
                entrance_fee,
                interval,
                coordinator,
                request,
                request_timeout,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    program_id,
                    accounts,
                    entrance_fee,
                    interval,
                    coordinator,
                    request,
                    request_timeout,
                )
            }
            LotteryInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(program_id, accounts, amount)
            }
            LotteryInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            LotteryInstruction::PerformUpkeep { perform_data } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts, &perform_data)
            }
            LotteryInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
            LotteryInstruction::SetCoordinator { coordinator } => {
                msg!("Instruction: Set Coordinator");
                Self::process_set_coordinator(program_id, accounts, coordinator)
            }
            LotteryInstruction::ReissueRequest => {
                msg!("Instruction: Reissue Request");
                Self::process_reissue_request(program_id, accounts)
            }
        }
    }

    /// Creates the three program accounts and writes the immutable config.
    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: u64,
        coordinator: Pubkey,
        request: RequestParams,
        request_timeout: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            msg!("Owner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let config = LotteryConfig::new(
            *owner_info.key,
            entrance_fee,
            interval,
            coordinator,
            request,
            request_timeout,
        )
        .map_err(reject)?;

        let (config_key, config_bump) = find_config_address(program_id);
        let (lottery_key, lottery_bump) = find_lottery_address(program_id);
        let (vault_key, vault_bump) = find_vault_address(program_id);
        if *config_info.key != config_key
            || *lottery_info.key != lottery_key
            || *vault_info.key != vault_key
        {
            return Err(reject(LotteryError::InvalidAccount));
        }
        if config_info.owner == program_id {
            return Err(reject(LotteryError::AlreadyInitialized));
        }

        let record = RoundRecord::new(Clock::get()?.unix_timestamp);
        let record_len = record.packed_len() + ENTRANT_CHUNK * PUBKEY_BYTES;

        Self::create_pda_account(
            owner_info,
            config_info,
            system_program_info,
            program_id,
            LotteryConfig::LEN,
            &[CONFIG_SEED, &[config_bump]],
        )?;
        Self::create_pda_account(
            owner_info,
            lottery_info,
            system_program_info,
            program_id,
            record_len,
            &[LOTTERY_SEED, &[lottery_bump]],
        )?;
        Self::create_pda_account(
            owner_info,
            vault_info,
            system_program_info,
            program_id,
            0,
            &[VAULT_SEED, &[vault_bump]],
        )?;

        LotteryConfig::pack(config, &mut config_info.data.borrow_mut())?;
        record.save(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Lottery initialized: Owner={}, Coordinator={}, EntranceFee={} SOL, Interval={}s",
            owner_info.key,
            coordinator,
            lamports_to_sol(entrance_fee),
            interval
        );
        Ok(())
    }

    fn process_enter(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let entrant_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !entrant_info.is_signer {
            msg!("Entrant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut record = Self::load_record(program_id, lottery_info)?;
        Self::check_vault(program_id, vault_info)?;

        let mut controller = RoundController::new(&config, &mut record);
        let event = controller.enter(*entrant_info.key, amount).map_err(reject)?;
        msg!(
            "Entry of {} SOL accepted (fee {} SOL), {} entrants holding {} SOL",
            lamports_to_sol(amount),
            lamports_to_sol(controller.entrance_fee()),
            controller.entrants().len(),
            lamports_to_sol(controller.balance())
        );

        invoke(
            &system_instruction::transfer(entrant_info.key, vault_info.key, amount),
            &[
                entrant_info.clone(),
                vault_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::ensure_capacity(
            entrant_info,
            lottery_info,
            system_program_info,
            record.packed_len(),
        )?;
        record.save(&mut lottery_info.data.borrow_mut())?;

        event.emit()
    }

    /// Read-only; the `UpkeepStatus` is handed back through the return data.
    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        let mut record = Self::load_record(program_id, lottery_info)?;
        let now = Clock::get()?.unix_timestamp;

        let controller = RoundController::new(&config, &mut record);
        let status = controller.check_upkeep(now);
        msg!(
            "Upkeep needed: {} (interval {}s, last drawing at {})",
            status.upkeep_needed,
            controller.interval(),
            controller.last_timestamp()
        );
        set_return_data(&status.try_to_vec()?);
        Ok(())
    }

    fn process_perform_upkeep(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        perform_data: &[u8],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut record = Self::load_record(program_id, lottery_info)?;
        let now = Clock::get()?.unix_timestamp;

        msg!("Perform data: {} bytes", perform_data.len());
        let event = RoundController::new(&config, &mut record)
            .perform_upkeep(now)
            .map_err(reject)?;

        record.save(&mut lottery_info.data.borrow_mut())?;
        event.emit()
    }

    /// The record is persisted inside the payout callback, before any lamports
    /// leave the vault.
    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !coordinator_info.is_signer {
            msg!("Coordinator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut record = Self::load_record(program_id, lottery_info)?;
        Self::check_vault(program_id, vault_info)?;
        let now = Clock::get()?.unix_timestamp;

        let event = RoundController::new(&config, &mut record)
            .fulfill_random_words(
                coordinator_info.key,
                request_id,
                random_words,
                now,
                |record, winner, prize| {
                    if winner != winner_info.key {
                        msg!(
                            "Winner account {} is not the selected entrant {}",
                            winner_info.key,
                            winner
                        );
                        return Err(ProgramError::InvalidArgument);
                    }
                    record.save(&mut lottery_info.data.borrow_mut())?;
                    Self::transfer_from_vault(vault_info, winner_info, prize)
                },
            )
            .map_err(reject)?;

        event.emit()
    }

    fn process_set_coordinator(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        coordinator: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            msg!("Owner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut config = Self::load_config(program_id, config_info)?;
        config
            .set_coordinator(owner_info.key, coordinator)
            .map_err(reject)?;
        LotteryConfig::pack(config, &mut config_info.data.borrow_mut())?;

        LotteryEvent::CoordinatorUpdated { coordinator }.emit()
    }

    fn process_reissue_request(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            msg!("Owner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(program_id, config_info)?;
        let mut record = Self::load_record(program_id, lottery_info)?;
        let now = Clock::get()?.unix_timestamp;

        let events = RoundController::new(&config, &mut record)
            .reissue_request(owner_info.key, now)
            .map_err(reject)?;
        record.save(&mut lottery_info.data.borrow_mut())?;

        for event in &events {
            event.emit()?;
        }
        Ok(())
    }

    fn load_config(
        program_id: &Pubkey,
        config_info: &AccountInfo,
    ) -> Result<LotteryConfig, ProgramError> {
        if *config_info.key != find_config_address(program_id).0 {
            return Err(reject(LotteryError::InvalidAccount));
        }
        if config_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        LotteryConfig::unpack(&config_info.data.borrow())
    }

    fn load_record(
        program_id: &Pubkey,
        lottery_info: &AccountInfo,
    ) -> Result<RoundRecord, ProgramError> {
        if *lottery_info.key != find_lottery_address(program_id).0 {
            return Err(reject(LotteryError::InvalidAccount));
        }
        if lottery_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        RoundRecord::load(&lottery_info.data.borrow())
    }

    fn check_vault(program_id: &Pubkey, vault_info: &AccountInfo) -> ProgramResult {
        if *vault_info.key != find_vault_address(program_id).0 {
            return Err(reject(LotteryError::InvalidAccount));
        }
        if vault_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(())
    }

    /// Creates a program-owned PDA. A PDA that already holds lamports (someone
    /// transferred to the address first) is topped up to rent exemption,
    /// allocated and assigned instead, since `create_account` refuses it.
    fn create_pda_account<'a>(
        payer_info: &AccountInfo<'a>,
        target_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        program_id: &Pubkey,
        space: usize,
        seeds: &[&[u8]],
    ) -> ProgramResult {
        let rent = Rent::get()?;
        let required = rent.minimum_balance(space);

        if target_info.lamports() == 0 {
            return invoke_signed(
                &system_instruction::create_account(
                    payer_info.key,
                    target_info.key,
                    required,
                    space as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    target_info.clone(),
                    system_program_info.clone(),
                ],
                &[seeds],
            );
        }

        msg!("Taking over pre-funded account {}", target_info.key);
        let top_up = required.saturating_sub(target_info.lamports());
        if top_up > 0 {
            invoke(
                &system_instruction::transfer(payer_info.key, target_info.key, top_up),
                &[
                    payer_info.clone(),
                    target_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        invoke_signed(
            &system_instruction::allocate(target_info.key, space as u64),
            &[target_info.clone(), system_program_info.clone()],
            &[seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(target_info.key, program_id),
            &[target_info.clone(), system_program_info.clone()],
            &[seeds],
        )
    }

    /// Grows the lottery account in whole chunks of entrant slots, charging the
    /// extra rent to `payer_info`. The account never shrinks.
    fn ensure_capacity<'a>(
        payer_info: &AccountInfo<'a>,
        lottery_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        needed: usize,
    ) -> ProgramResult {
        let current = lottery_info.data_len();
        if needed <= current {
            return Ok(());
        }

        let grown = needed
            .max(current + ENTRANT_CHUNK * PUBKEY_BYTES)
            .min(current + MAX_PERMITTED_DATA_INCREASE);
        let rent_due = Rent::get()?
            .minimum_balance(grown)
            .saturating_sub(lottery_info.lamports());
        if rent_due > 0 {
            invoke(
                &system_instruction::transfer(payer_info.key, lottery_info.key, rent_due),
                &[
                    payer_info.clone(),
                    lottery_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }

        msg!("Growing lottery account from {} to {} bytes", current, grown);
        lottery_info.realloc(grown, false)
    }

    fn transfer_from_vault(
        vault_info: &AccountInfo,
        recipient_info: &AccountInfo,
        amount: u64,
    ) -> ProgramResult {
        let vault_lamports = vault_info
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let recipient_lamports = recipient_info
            .lamports()
            .checked_add(amount)
            .ok_or_else(|| ProgramError::from(LotteryError::Overflow))?;

        **vault_info.try_borrow_mut_lamports()? = vault_lamports;
        **recipient_info.try_borrow_mut_lamports()? = recipient_lamports;

        msg!(
            "Paid {} SOL from vault to {}",
            lamports_to_sol(amount),
            recipient_info.key
        );
        Ok(())
    }
}

/// Prints the error with its context before it is flattened into a code.
fn reject(err: LotteryError) -> ProgramError {
    err.print::<LotteryError>();
    err.into()
}
