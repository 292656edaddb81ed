// Lottery Program - Utility Functions
use solana_program::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

use crate::state::{CONFIG_SEED, LOTTERY_SEED, VAULT_SEED};

/// Maps the first random word onto an entrant index: `word % entrant_count`.
///
/// Returns `None` when there are no words or no entrants.
pub fn winner_index(random_words: &[u64], entrant_count: usize) -> Option<usize> {
    let word = *random_words.first()?;
    if entrant_count == 0 {
        return None;
    }
    Some((word % entrant_count as u64) as usize)
}

/// Find the program derived address of the config account
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the program derived address of the round record account
pub fn find_lottery_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED], program_id)
}

/// Find the program derived address of the custody vault
pub fn find_vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED], program_id)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn index_is_first_word_modulo_count() {
        assert_eq!(winner_index(&[17], 6), Some(5));
        assert_eq!(winner_index(&[17, 0, 3], 6), Some(5));
        assert_eq!(winner_index(&[u64::MAX], 1), Some(0));
        assert_eq!(winner_index(&[12], 4), Some(0));
    }

    #[test]
    fn no_words_or_entrants_yield_none() {
        assert_eq!(winner_index(&[], 3), None);
        assert_eq!(winner_index(&[9], 0), None);
    }

    #[test]
    fn uniform_words_give_uniform_winners() {
        const ENTRANTS: usize = 7;
        const TRIALS: usize = 70_000;

        let mut rng = StdRng::seed_from_u64(0x10_77e5);
        let mut wins = [0usize; ENTRANTS];
        for _ in 0..TRIALS {
            let word: u64 = rng.gen();
            wins[winner_index(&[word], ENTRANTS).unwrap()] += 1;
        }

        let expected = TRIALS as f64 / ENTRANTS as f64;
        for count in wins {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "win frequency off by {:.3}", deviation);
        }
    }

    #[test]
    fn pdas_are_distinct() {
        let program_id = Pubkey::new_unique();
        let config = find_config_address(&program_id).0;
        let lottery = find_lottery_address(&program_id).0;
        let vault = find_vault_address(&program_id).0;
        assert_ne!(config, lottery);
        assert_ne!(lottery, vault);
        assert_ne!(config, vault);
    }
}
