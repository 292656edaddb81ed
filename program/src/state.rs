use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};

use crate::{error::LotteryError, ledger::Ledger, vrf::RandomnessGateway};

/// PDA seed of the config account
pub const CONFIG_SEED: &[u8] = b"config";
/// PDA seed of the round record account
pub const LOTTERY_SEED: &[u8] = b"lottery";
/// PDA seed of the account holding the custody balance
pub const VAULT_SEED: &[u8] = b"vault";

/// Status of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryState {
    /// Accepting entries
    Open,
    /// Randomness requested, waiting for the coordinator to call back
    Calculating,
}

impl Default for LotteryState {
    fn default() -> Self {
        LotteryState::Open
    }
}

/// Parameters forwarded to the randomness coordinator with every request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestParams {
    /// Gas lane selecting the coordinator's priority tier
    pub key_hash: [u8; 32],
    /// Prepaid subscription billed for the request
    pub subscription_id: u64,
    /// Compute budget granted to the fulfillment callback
    pub callback_compute_limit: u32,
    pub request_confirmations: u16,
    /// Number of random words to deliver, at least one
    pub num_words: u32,
}

/// Lottery configuration account, written once at initialization
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotteryConfig {
    pub is_initialized: bool,
    /// Key allowed to reconfigure the coordinator and reissue requests
    pub owner: Pubkey,
    /// Minimum entry payment in lamports
    pub entrance_fee: u64,
    /// Minimum number of seconds between drawings
    pub interval: u64,
    /// Oracle endpoint, the only key allowed to fulfill requests
    pub coordinator: Pubkey,
    pub request: RequestParams,
    /// Seconds after which a pending request may be reissued by the owner
    pub request_timeout: u64,
}

impl LotteryConfig {
    pub fn new(
        owner: Pubkey,
        entrance_fee: u64,
        interval: u64,
        coordinator: Pubkey,
        request: RequestParams,
        request_timeout: u64,
    ) -> Result<Self, LotteryError> {
        if interval == 0
            || request_timeout == 0
            || request.num_words == 0
            || coordinator == Pubkey::default()
        {
            return Err(LotteryError::InvalidConfig);
        }

        Ok(Self {
            is_initialized: true,
            owner,
            entrance_fee,
            interval,
            coordinator,
            request,
            request_timeout,
        })
    }

    /// Owner-gated replacement of the oracle endpoint
    pub fn set_coordinator(
        &mut self,
        caller: &Pubkey,
        coordinator: Pubkey,
    ) -> Result<(), LotteryError> {
        if *caller != self.owner {
            return Err(LotteryError::Unauthorized);
        }
        if coordinator == Pubkey::default() {
            return Err(LotteryError::InvalidConfig);
        }
        self.coordinator = coordinator;
        Ok(())
    }
}

impl Sealed for LotteryConfig {}

impl IsInitialized for LotteryConfig {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for LotteryConfig {
    const LEN: usize = 1 + 32 + 8 + 8 + 32 + 32 + 8 + 4 + 2 + 4 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, LotteryConfig::LEN];
        let (
            is_initialized,
            owner,
            entrance_fee,
            interval,
            coordinator,
            key_hash,
            subscription_id,
            callback_compute_limit,
            request_confirmations,
            num_words,
            request_timeout,
        ) = array_refs![src, 1, 32, 8, 8, 32, 32, 8, 4, 2, 4, 8];

        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(LotteryConfig {
            is_initialized,
            owner: Pubkey::new_from_array(*owner),
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            coordinator: Pubkey::new_from_array(*coordinator),
            request: RequestParams {
                key_hash: *key_hash,
                subscription_id: u64::from_le_bytes(*subscription_id),
                callback_compute_limit: u32::from_le_bytes(*callback_compute_limit),
                request_confirmations: u16::from_le_bytes(*request_confirmations),
                num_words: u32::from_le_bytes(*num_words),
            },
            request_timeout: u64::from_le_bytes(*request_timeout),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, LotteryConfig::LEN];
        let (
            is_initialized_dst,
            owner_dst,
            entrance_fee_dst,
            interval_dst,
            coordinator_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_compute_limit_dst,
            request_confirmations_dst,
            num_words_dst,
            request_timeout_dst,
        ) = mut_array_refs![dst, 1, 32, 8, 8, 32, 32, 8, 4, 2, 4, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        owner_dst.copy_from_slice(self.owner.as_ref());
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        coordinator_dst.copy_from_slice(self.coordinator.as_ref());
        *key_hash_dst = self.request.key_hash;
        *subscription_id_dst = self.request.subscription_id.to_le_bytes();
        *callback_compute_limit_dst = self.request.callback_compute_limit.to_le_bytes();
        *request_confirmations_dst = self.request.request_confirmations.to_le_bytes();
        *num_words_dst = self.request.num_words.to_le_bytes();
        *request_timeout_dst = self.request_timeout.to_le_bytes();
    }
}

/// Round record account: everything the round controller mutates.
///
/// Only the round controller writes these fields; everything else reads them
/// through the accessors.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundRecord {
    pub(crate) is_initialized: bool,
    pub(crate) state: LotteryState,
    /// Round number, starting at 1
    pub(crate) round: u64,
    pub(crate) ledger: Ledger,
    pub(crate) gateway: RandomnessGateway,
    pub(crate) recent_winner: Option<Pubkey>,
    /// Time of the last completed drawing (or of initialization)
    pub(crate) last_timestamp: UnixTimestamp,
}

impl RoundRecord {
    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            state: LotteryState::Open,
            round: 1,
            ledger: Ledger::default(),
            gateway: RandomnessGateway::default(),
            recent_winner: None,
            last_timestamp: now,
        }
    }

    /// Decodes the record from the head of `data`; trailing capacity is ignored.
    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let mut buf = data;
        let record =
            Self::deserialize(&mut buf).map_err(|_| ProgramError::InvalidAccountData)?;
        if !record.is_initialized {
            return Err(LotteryError::NotInitialized.into());
        }
        Ok(record)
    }

    /// Encodes the record straight into the head of `data` and zeroes the
    /// unused tail.
    pub fn save(&self, data: &mut [u8]) -> ProgramResult {
        let len = self.packed_len();
        if len > data.len() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        let (head, tail) = data.split_at_mut(len);
        let mut writer: &mut [u8] = head;
        self.serialize(&mut writer)?;
        tail.fill(0);
        Ok(())
    }

    /// Borsh-encoded size, computed without encoding
    pub fn packed_len(&self) -> usize {
        // is_initialized, state, round
        1 + 1 + 8
            + self.ledger.packed_len()
            + self.gateway.packed_len()
            + 1
            + self.recent_winner.map_or(0, |_| PUBKEY_BYTES)
            + 8
    }

    pub fn state(&self) -> LotteryState {
        self.state
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn gateway(&self) -> &RandomnessGateway {
        &self.gateway
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }
}

impl IsInitialized for RoundRecord {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_params() -> RequestParams {
        RequestParams {
            key_hash: [7; 32],
            subscription_id: 42,
            callback_compute_limit: 500_000,
            request_confirmations: 3,
            num_words: 1,
        }
    }

    #[test]
    fn config_pack_preserves_fields() {
        let config = LotteryConfig::new(
            Pubkey::new_unique(),
            5_000_000,
            60,
            Pubkey::new_unique(),
            request_params(),
            3_600,
        )
        .unwrap();

        let mut data = vec![0u8; LotteryConfig::LEN];
        LotteryConfig::pack(config, &mut data).unwrap();
        assert_eq!(LotteryConfig::unpack(&data).unwrap(), config);
    }

    #[test]
    fn config_rejects_degenerate_parameters() {
        let owner = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();

        assert_eq!(
            LotteryConfig::new(owner, 1, 0, coordinator, request_params(), 60),
            Err(LotteryError::InvalidConfig)
        );
        assert_eq!(
            LotteryConfig::new(owner, 1, 60, Pubkey::default(), request_params(), 60),
            Err(LotteryError::InvalidConfig)
        );
        let no_words = RequestParams {
            num_words: 0,
            ..request_params()
        };
        assert_eq!(
            LotteryConfig::new(owner, 1, 60, coordinator, no_words, 60),
            Err(LotteryError::InvalidConfig)
        );
        assert_eq!(
            LotteryConfig::new(owner, 1, 60, coordinator, request_params(), 0),
            Err(LotteryError::InvalidConfig)
        );
    }

    #[test]
    fn uninitialized_config_does_not_unpack() {
        let data = vec![0u8; LotteryConfig::LEN];
        assert_eq!(
            LotteryConfig::unpack(&data),
            Err(ProgramError::UninitializedAccount)
        );
    }

    #[test]
    fn only_owner_replaces_coordinator() {
        let owner = Pubkey::new_unique();
        let mut config = LotteryConfig::new(
            owner,
            1,
            60,
            Pubkey::new_unique(),
            request_params(),
            60,
        )
        .unwrap();
        let replacement = Pubkey::new_unique();

        assert_eq!(
            config.set_coordinator(&Pubkey::new_unique(), replacement),
            Err(LotteryError::Unauthorized)
        );
        config.set_coordinator(&owner, replacement).unwrap();
        assert_eq!(config.coordinator, replacement);
    }

    #[test]
    fn record_survives_save_into_larger_buffer() {
        let mut record = RoundRecord::new(1_700_000_000);
        record
            .ledger
            .record(LotteryState::Open, 10, Pubkey::new_unique(), 10)
            .unwrap();

        let mut data = vec![0xff; record.packed_len() + 64];
        record.save(&mut data).unwrap();
        assert_eq!(RoundRecord::load(&data).unwrap(), record);

        // Shrinking the logical content clears the stale tail.
        let drained = RoundRecord::new(1_700_000_100);
        drained.save(&mut data).unwrap();
        let len = drained.packed_len();
        assert!(data[len..].iter().all(|byte| *byte == 0));
        assert_eq!(RoundRecord::load(&data).unwrap(), drained);
    }

    #[test]
    fn packed_len_matches_encoding() {
        let mut record = RoundRecord::new(1_700_000_000);
        assert_eq!(record.packed_len(), record.try_to_vec().unwrap().len());

        for _ in 0..5 {
            record
                .ledger
                .record(LotteryState::Open, 10, Pubkey::new_unique(), 10)
                .unwrap();
        }
        record.gateway.request(1, 1_700_000_060).unwrap();
        record.state = LotteryState::Calculating;
        assert_eq!(record.packed_len(), record.try_to_vec().unwrap().len());

        record.recent_winner = Some(Pubkey::new_unique());
        assert_eq!(record.packed_len(), record.try_to_vec().unwrap().len());
    }

    #[test]
    fn save_rejects_short_buffer() {
        let record = RoundRecord::new(0);
        let mut data = vec![0u8; 4];
        assert_eq!(record.save(&mut data), Err(ProgramError::AccountDataTooSmall));
    }

    #[test]
    fn zeroed_record_is_not_initialized() {
        let data = vec![0u8; 128];
        assert_eq!(
            RoundRecord::load(&data),
            Err(LotteryError::NotInitialized.into())
        );
    }
}
