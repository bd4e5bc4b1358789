mod common;

use bitvault_spend::error::WalletError;
use bitvault_spend::types::Coin;
use bitvault_spend::utxo_selection::{CoinSelection, SelectionStrategy, SmallestFirst, UtxoSelector};
use bitvault_spend::validation::ValidationError;
use common::{coin, setup};

#[test]
fn test_smallest_first_order() {
    setup();

    let coins = vec![coin(1, 0, 5_000), coin(2, 0, 700), coin(3, 0, 2_000)];
    let selection = SmallestFirst.select(&coins, 2_500).unwrap();

    let values: Vec<u64> = selection.selected.iter().map(|c| c.value).collect();
    assert_eq!(values, vec![700, 2_000]);
    assert_eq!(selection.total, 2_700);
}

#[test]
fn test_stops_as_soon_as_target_met() {
    setup();

    let coins = vec![coin(1, 0, 1_000), coin(2, 0, 1_000), coin(3, 0, 1_000)];
    let selection = SmallestFirst.select(&coins, 1_000).unwrap();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection.total, 1_000);
}

#[test]
fn test_ties_keep_input_order() {
    setup();

    let coins = vec![coin(9, 0, 1_000), coin(8, 1, 1_000), coin(7, 2, 1_000)];
    let selection = SmallestFirst.select(&coins, 1_500).unwrap();
    assert_eq!(selection.selected, vec![coins[0].clone(), coins[1].clone()]);
}

#[test]
fn test_insufficient_funds_reports_totals() {
    setup();

    let coins = vec![coin(1, 0, 400), coin(2, 0, 500)];
    match SmallestFirst.select(&coins, 1_000) {
        Err(WalletError::InsufficientFunds { needed, available }) => {
            assert_eq!(needed, 1_000);
            assert_eq!(available, 900);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }
}

#[test]
fn test_empty_coin_set() {
    setup();

    let result = UtxoSelector::new().select(&[], 546);
    assert!(matches!(
        result,
        Err(WalletError::InsufficientFunds {
            needed: 546,
            available: 0
        })
    ));
}

#[test]
fn test_overflowing_coin_values() {
    setup();

    let coins = vec![coin(1, 0, u64::MAX), coin(2, 0, u64::MAX)];
    let result = SmallestFirst.select(&coins, u64::MAX);
    // The first coin alone covers the target
    assert_eq!(result.unwrap().len(), 1);

    let coins = vec![coin(1, 0, u64::MAX - 1), coin(2, 0, u64::MAX - 1)];
    let result = SmallestFirst.select(&coins, u64::MAX);
    assert!(matches!(
        result,
        Err(WalletError::Validation(ValidationError::CoinValueOverflow))
    ));
}

#[test]
fn test_input_is_not_reordered() {
    setup();

    let coins = vec![coin(1, 0, 5_000), coin(2, 0, 700)];
    let _ = SmallestFirst.select(&coins, 100).unwrap();
    assert_eq!(coins[0].value, 5_000);
}

struct LargestFirst;

impl SelectionStrategy for LargestFirst {
    fn name(&self) -> &'static str {
        "largest-first"
    }

    fn select(&self, coins: &[Coin], target: u64) -> Result<CoinSelection, WalletError> {
        let mut sorted = coins.to_vec();
        sorted.sort_by(|a, b| b.value.cmp(&a.value));
        let mut selected = Vec::new();
        let mut total = 0;
        for c in sorted {
            total += c.value;
            selected.push(c);
            if total >= target {
                return Ok(CoinSelection { selected, total });
            }
        }
        Err(WalletError::InsufficientFunds {
            needed: target,
            available: total,
        })
    }
}

#[test]
fn test_selector_delegates_to_strategy() {
    setup();

    let selector = UtxoSelector::with_strategy(Box::new(LargestFirst));
    assert_eq!(selector.strategy_name(), "largest-first");
    assert_eq!(UtxoSelector::default().strategy_name(), "smallest-first");

    let coins = vec![coin(1, 0, 700), coin(2, 0, 5_000)];
    let selection = selector.select(&coins, 600).unwrap();
    assert_eq!(selection.selected[0].value, 5_000);
}
