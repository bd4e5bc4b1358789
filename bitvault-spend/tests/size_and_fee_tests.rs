mod common;

use bitvault_spend::fee_estimation::{effective_fee_rate, estimate_fee, solve_fee_and_change, FeeOutcome};
use bitvault_spend::math::{
    calculate_fee, calculate_tx_weight, estimate_tx_vsize, estimate_tx_vsize_by_name,
    is_dust_amount, weight_to_vsize, DEFAULT_TX_VSIZE,
};
use bitvault_spend::types::{AddressType, FeeDecision};
use common::setup;

#[test]
fn test_segwit_vsize_constants() {
    setup();

    assert_eq!(estimate_tx_vsize(1, 1, AddressType::P2wpkh), 133);
    assert_eq!(estimate_tx_vsize(1, 2, AddressType::P2wpkh), 164);
    assert_eq!(estimate_tx_vsize(2, 1, AddressType::P2wpkh), 223);
    assert_eq!(estimate_tx_vsize(1, 1, AddressType::P2shP2wpkh), 133);
}

#[test]
fn test_legacy_vsize_constants() {
    setup();

    assert_eq!(estimate_tx_vsize(1, 1, AddressType::P2pkh), 192);
    assert_eq!(estimate_tx_vsize(1, 2, AddressType::P2pkh), 226);
    assert_eq!(estimate_tx_vsize(0, 0, AddressType::P2pkh), 10);
}

#[test]
fn test_taproot_vsize_constants() {
    setup();

    assert_eq!(estimate_tx_vsize(1, 1, AddressType::P2tr), 122);
    assert_eq!(estimate_tx_vsize(1, 2, AddressType::P2tr), 153);
}

#[test]
fn test_vsize_by_name() {
    setup();

    assert_eq!(estimate_tx_vsize_by_name(1, 1, "p2wpkh"), 133);
    assert_eq!(estimate_tx_vsize_by_name(1, 1, "P2PKH"), 192);
    assert_eq!(estimate_tx_vsize_by_name(1, 1, "p2sh-p2wpkh"), 133);
    assert_eq!(estimate_tx_vsize_by_name(1, 1, "p2wsh"), DEFAULT_TX_VSIZE);
    assert_eq!(estimate_tx_vsize_by_name(7, 9, ""), 250);
}

#[test]
fn test_weight_helpers() {
    setup();

    assert_eq!(calculate_tx_weight(105, 109), 529);
    assert_eq!(weight_to_vsize(529), 133);
    assert_eq!(weight_to_vsize(528), 132);
    assert_eq!(calculate_fee(133, 3), 399);
    assert_eq!(calculate_fee(u64::MAX, 2), u64::MAX);
    assert!(is_dust_amount(545));
    assert!(!is_dust_amount(546));
}

#[test]
fn test_fee_rate_floor() {
    setup();

    assert_eq!(effective_fee_rate(i64::MIN), 1);
    assert_eq!(effective_fee_rate(-1), 1);
    assert_eq!(effective_fee_rate(0), 1);
    assert_eq!(effective_fee_rate(25), 25);
    assert_eq!(estimate_fee(1, 1, AddressType::P2wpkh, 2), 266);
}

#[test]
fn test_solver_creates_change() {
    setup();

    // One 3000 sat coin paying 1500 at 1 sat/vB
    let outcome = solve_fee_and_change(1, 3000, 1500, 1, AddressType::P2wpkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Settled(FeeDecision {
            fee: 164,
            change: 1336
        })
    );
    assert!(outcome.is_settled());
    if let FeeOutcome::Settled(decision) = outcome {
        assert!(decision.has_change_output());
    }
}

#[test]
fn test_solver_folds_small_change_into_fee() {
    setup();

    // 2500 - 2000 - 164 = 336, not worth a change output
    let outcome = solve_fee_and_change(1, 2500, 2000, 1, AddressType::P2wpkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Settled(FeeDecision {
            fee: 500,
            change: 0
        })
    );
}

#[test]
fn test_solver_change_exactly_dust_is_folded() {
    setup();

    // value - requested - 164 == 546
    let value = 1500 + 164 + 546;
    let outcome = solve_fee_and_change(1, value, 1500, 1, AddressType::P2wpkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Settled(FeeDecision {
            fee: 164 + 546,
            change: 0
        })
    );

    // One more sat and the change output is kept
    let outcome = solve_fee_and_change(1, value + 1, 1500, 1, AddressType::P2wpkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Settled(FeeDecision {
            fee: 164,
            change: 547
        })
    );
}

#[test]
fn test_solver_reports_shortfall() {
    setup();

    // 600 sat coin paying exactly dust: 546 + 133 > 600
    let outcome = solve_fee_and_change(1, 600, 546, 1, AddressType::P2wpkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Shortfall {
            fee: 133,
            missing: 79
        }
    );
    assert!(!outcome.is_settled());
}

#[test]
fn test_solver_exact_cover_without_change() {
    setup();

    let outcome = solve_fee_and_change(1, 1500 + 192, 1500, 1, AddressType::P2pkh, 1);
    assert_eq!(
        outcome,
        FeeOutcome::Settled(FeeDecision {
            fee: 192,
            change: 0
        })
    );
}

#[test]
fn test_solver_conserves_value() {
    setup();

    for (value, requested, rate) in [(10_000u64, 1_000u64, 3u64), (5_000, 4_000, 1), (90_000, 546, 20)] {
        for family in AddressType::ALL {
            if let FeeOutcome::Settled(decision) =
                solve_fee_and_change(2, value, requested, 1, family, rate)
            {
                assert_eq!(value, requested + decision.fee + decision.change);
                assert_eq!(decision.has_change_output(), decision.change > 0);
            }
        }
    }
}
