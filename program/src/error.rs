use num_traits::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

use crate::state::LotteryState;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Entry amount is below the configured entrance fee (or zero)
    #[error("Invalid entrance fee: sent {sent} lamports, required {required}")]
    InvalidEntranceFee { sent: u64, required: u64 },

    /// Entries are only accepted while the lottery is open
    #[error("Lottery is not open")]
    NotOpen,

    /// A drawing was triggered while the upkeep conditions do not hold
    #[error("Upkeep not needed: balance={balance}, entrants={entrant_count}, state={state:?}")]
    UpkeepNotNeeded {
        balance: u64,
        entrant_count: u64,
        state: LotteryState,
    },

    /// A randomness request is already outstanding for this round
    #[error("Draw already in progress")]
    DrawAlreadyInProgress,

    /// Fulfillment for an id that is not the pending request
    #[error("Unknown randomness request {request_id}")]
    UnknownRequest { request_id: u64 },

    /// Caller is not allowed to perform this action
    #[error("Unauthorized caller")]
    Unauthorized,

    /// Transferring the prize to the winner failed
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Fulfillment carried no random words
    #[error("Fulfillment carried no random words")]
    NoRandomWords,

    /// There is no outstanding randomness request
    #[error("No pending randomness request")]
    NoPendingRequest,

    /// The pending request is still within its timeout
    #[error("Pending request has not timed out yet")]
    RequestNotExpired,

    /// Arithmetic overflow on balances or counters
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Lottery already initialized")]
    AlreadyInitialized,

    #[error("Lottery not initialized")]
    NotInitialized,

    /// Rejected construction parameters
    #[error("Invalid lottery configuration")]
    InvalidConfig,

    /// Account does not match the expected program address
    #[error("Invalid lottery account")]
    InvalidAccount,

    /// The round already holds the maximum number of entries
    #[error("Round is full: {capacity} entries")]
    RoundFull { capacity: u64 },
}

impl LotteryError {
    /// Stable numeric code reported as `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            LotteryError::InvalidEntranceFee { .. } => 0,
            LotteryError::NotOpen => 1,
            LotteryError::UpkeepNotNeeded { .. } => 2,
            LotteryError::DrawAlreadyInProgress => 3,
            LotteryError::UnknownRequest { .. } => 4,
            LotteryError::Unauthorized => 5,
            LotteryError::PayoutFailed => 6,
            LotteryError::NoRandomWords => 7,
            LotteryError::NoPendingRequest => 8,
            LotteryError::RequestNotExpired => 9,
            LotteryError::Overflow => 10,
            LotteryError::AlreadyInitialized => 11,
            LotteryError::NotInitialized => 12,
            LotteryError::InvalidConfig => 13,
            LotteryError::InvalidAccount => 14,
            LotteryError::RoundFull { .. } => 15,
        }
    }
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!("Error: {}", self);
    }
}

/// Recovers the variant behind a `Custom` code. Context fields are not part
/// of the code and come back zeroed.
impl FromPrimitive for LotteryError {
    fn from_i64(n: i64) -> Option<Self> {
        u64::try_from(n).ok().and_then(Self::from_u64)
    }

    fn from_u64(n: u64) -> Option<Self> {
        let err = match n {
            0 => LotteryError::InvalidEntranceFee {
                sent: 0,
                required: 0,
            },
            1 => LotteryError::NotOpen,
            2 => LotteryError::UpkeepNotNeeded {
                balance: 0,
                entrant_count: 0,
                state: LotteryState::Open,
            },
            3 => LotteryError::DrawAlreadyInProgress,
            4 => LotteryError::UnknownRequest { request_id: 0 },
            5 => LotteryError::Unauthorized,
            6 => LotteryError::PayoutFailed,
            7 => LotteryError::NoRandomWords,
            8 => LotteryError::NoPendingRequest,
            9 => LotteryError::RequestNotExpired,
            10 => LotteryError::Overflow,
            11 => LotteryError::AlreadyInitialized,
            12 => LotteryError::NotInitialized,
            13 => LotteryError::InvalidConfig,
            14 => LotteryError::InvalidAccount,
            15 => LotteryError::RoundFull { capacity: 0 },
            _ => return None,
        };
        Some(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_custom_program_error() {
        let err: ProgramError = LotteryError::UnknownRequest { request_id: 9 }.into();
        assert_eq!(err, ProgramError::Custom(4));

        let err: ProgramError = LotteryError::PayoutFailed.into();
        assert_eq!(err, ProgramError::Custom(6));
    }

    fn decode(code: u32) -> Option<LotteryError> {
        <LotteryError as DecodeError<LotteryError>>::decode_custom_error_to_enum(code)
    }

    #[test]
    fn custom_codes_decode_back_to_variants() {
        for code in 0..=15u32 {
            let err = decode(code).unwrap();
            assert_eq!(err.code(), code);
            err.print::<LotteryError>();
        }
        assert_eq!(decode(16), None);
        assert_eq!(decode(4), Some(LotteryError::UnknownRequest { request_id: 0 }));
    }

    #[test]
    fn upkeep_error_reports_context() {
        let err = LotteryError::UpkeepNotNeeded {
            balance: 0,
            entrant_count: 0,
            state: LotteryState::Open,
        };
        assert_eq!(
            err.to_string(),
            "Upkeep not needed: balance=0, entrants=0, state=Open"
        );
    }
}
