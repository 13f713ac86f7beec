use cash_acceptor::domain::change::{ChangeBox, Denominations};
use cash_acceptor::error::CashError;
use cash_acceptor::infrastructure::mock::MockHopper;

const TABLE: [u64; 5] = [200, 100, 50, 20, 10];

/// Fewest pieces for every multiple of 10 up to `limit`, by dynamic programming.
fn optimal_piece_counts(limit: u64) -> Vec<u64> {
    let slots = (limit / 10) as usize;
    let coins: Vec<usize> = TABLE.iter().map(|&d| (d / 10) as usize).collect();
    let mut best = vec![u64::MAX; slots + 1];
    best[0] = 0;
    for amount in 1..=slots {
        for &coin in &coins {
            if coin <= amount && best[amount - coin] != u64::MAX {
                best[amount] = best[amount].min(best[amount - coin] + 1);
            }
        }
    }
    best
}

#[test]
fn test_greedy_is_exact_and_minimal() {
    let table = Denominations::new(&TABLE).unwrap();
    let optimal = optimal_piece_counts(5_000);

    for amount in (0..=5_000u64).step_by(10) {
        let change = table.plan(amount).unwrap();
        assert_eq!(change.total(), amount, "amount {amount}");
        assert_eq!(
            change.piece_count(),
            optimal[(amount / 10) as usize],
            "amount {amount} used too many pieces"
        );
    }
}

#[test]
fn test_off_grid_amounts_fail() {
    let table = Denominations::new(&TABLE).unwrap();
    for amount in [1, 5, 11, 95, 1_001] {
        assert!(matches!(
            table.plan(amount),
            Err(CashError::ChangeNotDivisible { unit: 10, .. })
        ));
    }
}

#[tokio::test]
async fn test_hopper_receives_exact_sum() {
    let hopper = MockHopper::new();
    let change_box = ChangeBox::new(Denominations::new(&TABLE).unwrap(), Box::new(hopper.clone()));

    let change = change_box.give_change(1_230).await.unwrap();

    assert_eq!(hopper.total().await, 1_230);
    assert_eq!(hopper.ejected().await.len() as u64, change.piece_count());
    assert_eq!(hopper.ejected().await, vec![200, 200, 200, 200, 200, 200, 20, 10]);
}

#[tokio::test]
async fn test_failed_plan_dispenses_nothing() {
    let hopper = MockHopper::new();
    let change_box = ChangeBox::new(Denominations::new(&TABLE).unwrap(), Box::new(hopper.clone()));

    assert!(change_box.give_change(1_235).await.is_err());
    assert_eq!(hopper.total().await, 0);
}
