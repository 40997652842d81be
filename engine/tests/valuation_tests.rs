//! Valuation ledger tests
//!
//! Tests for the weighted-average cost ledger including:
//! - Inbound movements blending into the running average
//! - Outbound movements preserving the cost basis
//! - Cost reset when stock is exhausted or driven negative
//! - Serialization of concurrent movements per ingredient

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use larder_engine::config::{CascadeConfig, DatabaseConfig, MatchingConfig, VarianceConfig};
use larder_engine::{Config, Engine, InMemoryRepository, RecordMovementInput, Repository};
use shared::models::{Ingredient, MovementKind};
use shared::types::IngredientId;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/larder_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        matching: MatchingConfig::default(),
        variance: VarianceConfig::default(),
        cascade: CascadeConfig::default(),
    }
}

fn seed_ingredient(repo: &InMemoryRepository, name: &str) -> IngredientId {
    let id = IngredientId::new();
    repo.insert_ingredient(Ingredient {
        id,
        name: name.to_string(),
        category_id: None,
        conversion_factor: Decimal::ONE,
        purchase_unit: "kg".to_string(),
        usage_unit: "kg".to_string(),
    });
    id
}

fn receipt(ingredient_id: IngredientId, quantity: &str, amount: &str) -> RecordMovementInput {
    RecordMovementInput {
        ingredient_id,
        delta_quantity: dec(quantity),
        total_amount: dec(amount),
        kind: MovementKind::Receipt,
        reference_id: None,
    }
}

fn consumption(ingredient_id: IngredientId, quantity: &str) -> RecordMovementInput {
    RecordMovementInput {
        ingredient_id,
        delta_quantity: dec(quantity),
        total_amount: Decimal::ZERO,
        kind: MovementKind::Consumption,
        reference_id: None,
    }
}

fn adjustment(ingredient_id: IngredientId, quantity: &str, amount: &str) -> RecordMovementInput {
    RecordMovementInput {
        ingredient_id,
        delta_quantity: dec(quantity),
        total_amount: dec(amount),
        kind: MovementKind::Adjustment,
        reference_id: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test that the first receipt sets quantity and unit cost
    #[tokio::test]
    async fn test_first_receipt_values_stock() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");

        let outcome = engine
            .apply_movement(receipt(flour, "10", "1000"))
            .await
            .unwrap();

        assert_eq!(outcome.valuation.quantity_on_hand, dec("10"));
        assert_eq!(outcome.valuation.weighted_average_cost, dec("100"));
        assert_eq!(outcome.movement.amount, dec("1000"));
    }

    /// Test that a second receipt at a different price blends the average
    #[tokio::test]
    async fn test_second_receipt_blends_average() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");

        engine
            .apply_movement(receipt(flour, "10", "1000"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(receipt(flour, "10", "1200"))
            .await
            .unwrap();

        // (10 * 100 + 1200) / 20 = 110
        assert_eq!(outcome.valuation.quantity_on_hand, dec("20"));
        assert_eq!(outcome.valuation.weighted_average_cost, dec("110"));
    }

    /// Test that consumption reduces quantity without moving the average
    #[tokio::test]
    async fn test_consumption_keeps_cost_basis() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let butter = seed_ingredient(&repo, "Butter");

        engine
            .apply_movement(receipt(butter, "10", "1000"))
            .await
            .unwrap();
        engine
            .apply_movement(receipt(butter, "10", "1200"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(consumption(butter, "-5"))
            .await
            .unwrap();

        assert_eq!(outcome.valuation.quantity_on_hand, dec("15"));
        assert_eq!(outcome.valuation.weighted_average_cost, dec("110"));
    }

    /// Test that an outbound movement never carries value out of the average
    #[tokio::test]
    async fn test_outbound_amount_is_forced_to_zero() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let butter = seed_ingredient(&repo, "Butter");

        engine
            .apply_movement(receipt(butter, "10", "1000"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(RecordMovementInput {
                ingredient_id: butter,
                delta_quantity: dec("-4"),
                total_amount: dec("9999"),
                kind: MovementKind::Consumption,
                reference_id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.movement.amount, Decimal::ZERO);
        assert_eq!(outcome.valuation.weighted_average_cost, dec("100"));
    }

    /// Test that exhausting the stock resets the cost basis
    #[tokio::test]
    async fn test_exhausting_stock_resets_cost() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let cream = seed_ingredient(&repo, "Cream");

        engine
            .apply_movement(receipt(cream, "10", "1000"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(consumption(cream, "-10"))
            .await
            .unwrap();

        assert_eq!(outcome.valuation.quantity_on_hand, Decimal::ZERO);
        assert_eq!(outcome.valuation.weighted_average_cost, Decimal::ZERO);
    }

    /// Test that a receipt into negative stock uses the movement's unit cost
    #[tokio::test]
    async fn test_receipt_into_negative_stock_uses_movement_unit_cost() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let cream = seed_ingredient(&repo, "Cream");

        // Consumption booked before the matching receipt drives stock negative.
        engine
            .apply_movement(consumption(cream, "-10"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(receipt(cream, "5", "500"))
            .await
            .unwrap();

        assert_eq!(outcome.valuation.quantity_on_hand, dec("-5"));
        assert_eq!(outcome.valuation.weighted_average_cost, dec("100"));
    }

    /// Test that a zero-quantity adjustment revalues the stock on hand
    #[tokio::test]
    async fn test_zero_delta_adjustment_revalues_stock() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let oil = seed_ingredient(&repo, "Olive oil");

        engine
            .apply_movement(receipt(oil, "10", "1000"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(adjustment(oil, "0", "200"))
            .await
            .unwrap();

        // (10 * 100 + 200) / 10 = 120
        assert_eq!(outcome.valuation.quantity_on_hand, dec("10"));
        assert_eq!(outcome.valuation.weighted_average_cost, dec("120"));
    }

    /// Test that a downward correction larger than the stock value clamps to zero
    #[tokio::test]
    async fn test_negative_average_is_clamped_to_zero() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let oil = seed_ingredient(&repo, "Olive oil");

        engine
            .apply_movement(receipt(oil, "10", "100"))
            .await
            .unwrap();
        let outcome = engine
            .apply_movement(adjustment(oil, "0", "-200"))
            .await
            .unwrap();

        // Raw average would be (10 * 10 - 200) / 10 = -10.
        assert_eq!(outcome.valuation.quantity_on_hand, dec("10"));
        assert_eq!(outcome.valuation.weighted_average_cost, Decimal::ZERO);
    }

    /// Test that every applied movement lands in the journal
    #[tokio::test]
    async fn test_movements_are_journaled() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");

        engine
            .apply_movement(receipt(flour, "10", "1000"))
            .await
            .unwrap();
        engine
            .apply_movement(consumption(flour, "-3"))
            .await
            .unwrap();

        let movements = repo.movements();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::Receipt);
        assert_eq!(movements[0].amount, dec("1000"));
        assert_eq!(movements[1].kind, MovementKind::Consumption);
        assert_eq!(movements[1].delta_quantity, dec("-3"));
        assert_eq!(movements[1].amount, Decimal::ZERO);
    }

    /// Test that a movement with no quantity and no amount is rejected
    #[tokio::test]
    async fn test_empty_movement_is_rejected() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");

        let err = engine
            .apply_movement(adjustment(flour, "0", "0"))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(repo.movements().is_empty());
    }

    /// Test that an inbound movement with a negative amount is rejected
    #[tokio::test]
    async fn test_inbound_negative_amount_is_rejected() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");

        let err = engine
            .apply_movement(receipt(flour, "5", "-10"))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    /// Test that an ingredient missing from master data is still valued
    #[tokio::test]
    async fn test_unknown_ingredient_is_still_valued() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let unknown = IngredientId::new();

        let outcome = engine
            .apply_movement(receipt(unknown, "4", "80"))
            .await
            .unwrap();

        assert_eq!(outcome.valuation.weighted_average_cost, dec("20"));
        let stored = repo.valuation(unknown).await.unwrap().unwrap();
        assert_eq!(stored.quantity_on_hand, dec("4"));
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    /// Test that concurrent movements on one ingredient lose no update
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_movements_serialize() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let milk = seed_ingredient(&repo, "Milk");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .apply_movement(receipt(milk, "1", "100"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let valuation = repo.valuation(milk).await.unwrap().unwrap();
        assert_eq!(valuation.quantity_on_hand, dec("20"));
        assert_eq!(valuation.weighted_average_cost, dec("100"));
        assert_eq!(repo.movements().len(), 20);
    }

    /// Test that movements on different ingredients do not block each other
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_ingredients_progress_independently() {
        let repo = InMemoryRepository::new();
        let engine = Engine::new(repo.clone(), &test_config());
        let flour = seed_ingredient(&repo, "Flour");
        let sugar = seed_ingredient(&repo, "Sugar");

        let mut handles = Vec::new();
        for ingredient in [flour, sugar] {
            for _ in 0..10 {
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    engine
                        .apply_movement(receipt(ingredient, "2", "50"))
                        .await
                        .unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let flour_valuation = repo.valuation(flour).await.unwrap().unwrap();
        let sugar_valuation = repo.valuation(sugar).await.unwrap().unwrap();
        assert_eq!(flour_valuation.quantity_on_hand, dec("20"));
        assert_eq!(sugar_valuation.quantity_on_hand, dec("20"));
        assert_eq!(repo.movements().len(), 20);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid movement quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    /// Strategy for generating movement amounts
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1000000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 10000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For inbound-only sequences the average equals total money over
        /// total quantity, up to Decimal rounding.
        #[test]
        fn prop_inbound_only_average_is_money_over_quantity(
            movements in prop::collection::vec((quantity_strategy(), amount_strategy()), 1..12)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let valuation = rt.block_on(async {
                let repo = InMemoryRepository::new();
                let engine = Engine::new(repo.clone(), &test_config());
                let ingredient = seed_ingredient(&repo, "Cocoa");

                let mut last = None;
                for (quantity, amount) in &movements {
                    let outcome = engine
                        .apply_movement(RecordMovementInput {
                            ingredient_id: ingredient,
                            delta_quantity: *quantity,
                            total_amount: *amount,
                            kind: MovementKind::Receipt,
                            reference_id: None,
                        })
                        .await
                        .unwrap();
                    last = Some(outcome.valuation);
                }
                last.unwrap()
            });

            let total_quantity: Decimal = movements.iter().map(|(q, _)| q).sum();
            let total_amount: Decimal = movements.iter().map(|(_, a)| a).sum();
            let expected = total_amount / total_quantity;
            let drift = (valuation.weighted_average_cost - expected).abs();

            prop_assert_eq!(valuation.quantity_on_hand, total_quantity);
            prop_assert!(
                drift < dec("0.000001"),
                "average {} drifted from expected {}",
                valuation.weighted_average_cost,
                expected
            );
        }

        /// Outbound movements never change the weighted-average cost while
        /// stock stays positive.
        #[test]
        fn prop_outbound_preserves_cost_basis(
            initial_amount in amount_strategy(),
            outbound in prop::collection::vec((1i64..=9990i64).prop_map(|n| Decimal::new(n, 1)), 1..10)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (initial_cost, final_cost) = rt.block_on(async {
                let repo = InMemoryRepository::new();
                let engine = Engine::new(repo.clone(), &test_config());
                let ingredient = seed_ingredient(&repo, "Vanilla");

                // Stock far exceeds the largest possible outbound total.
                let opening = engine
                    .apply_movement(RecordMovementInput {
                        ingredient_id: ingredient,
                        delta_quantity: dec("100000"),
                        total_amount: initial_amount,
                        kind: MovementKind::Receipt,
                        reference_id: None,
                    })
                    .await
                    .unwrap();

                let mut last = opening.valuation.clone();
                for quantity in &outbound {
                    let outcome = engine
                        .apply_movement(RecordMovementInput {
                            ingredient_id: ingredient,
                            delta_quantity: -*quantity,
                            total_amount: Decimal::ZERO,
                            kind: MovementKind::Consumption,
                            reference_id: None,
                        })
                        .await
                        .unwrap();
                    last = outcome.valuation;
                }
                (opening.valuation.weighted_average_cost, last.weighted_average_cost)
            });

            prop_assert_eq!(initial_cost, final_cost);
        }

        /// Quantity on hand is always the signed sum of applied deltas.
        #[test]
        fn prop_quantity_is_sum_of_deltas(
            receipts in prop::collection::vec((quantity_strategy(), amount_strategy()), 1..8),
            consumed in prop::collection::vec(quantity_strategy(), 0..8)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let valuation = rt.block_on(async {
                let repo = InMemoryRepository::new();
                let engine = Engine::new(repo.clone(), &test_config());
                let ingredient = seed_ingredient(&repo, "Basil");

                for (quantity, amount) in &receipts {
                    engine
                        .apply_movement(RecordMovementInput {
                            ingredient_id: ingredient,
                            delta_quantity: *quantity,
                            total_amount: *amount,
                            kind: MovementKind::Receipt,
                            reference_id: None,
                        })
                        .await
                        .unwrap();
                }
                for quantity in &consumed {
                    engine
                        .apply_movement(RecordMovementInput {
                            ingredient_id: ingredient,
                            delta_quantity: -*quantity,
                            total_amount: Decimal::ZERO,
                            kind: MovementKind::Consumption,
                            reference_id: None,
                        })
                        .await
                        .unwrap();
                }
                repo.valuation(ingredient).await.unwrap().unwrap()
            });

            let expected: Decimal = receipts.iter().map(|(q, _)| *q).sum::<Decimal>()
                - consumed.iter().sum::<Decimal>();
            prop_assert_eq!(valuation.quantity_on_hand, expected);
        }
    }
}
