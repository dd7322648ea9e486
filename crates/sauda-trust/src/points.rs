// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure scoring arithmetic for vendor trust.
//!
//! Every function here is deterministic integer-in integer-out so the
//! engine stays trivially testable. Scores and point samples live on a
//! 0..=100 scale; a component is folded toward each new sample with an
//! exponential moving average that weighs history 4:1 over the sample.

/// Weight of the existing component score in [`ema_update`].
const HISTORY_WEIGHT: f64 = 0.8;
/// Weight of the incoming sample in [`ema_update`].
const SAMPLE_WEIGHT: f64 = 0.2;

/// Folds one 0..=100 sample into a component score.
pub fn ema_update(current: u8, sample: u8) -> u8 {
    let blended = f64::from(current) * HISTORY_WEIGHT + f64::from(sample) * SAMPLE_WEIGHT;
    blended.round().clamp(0.0, 100.0) as u8
}

/// Points for a seller counter-offer, judged against the modal price.
///
/// A counter at or below modal is fully stable (100). Above modal the
/// points fall by 2 for each percent of overshoot, to a floor of 0.
pub fn counter_offer_points(counter_price: f64, modal_price: f64) -> u8 {
    if modal_price <= 0.0 || counter_price <= modal_price {
        return 100;
    }
    let overshoot = (counter_price - modal_price) / modal_price;
    (100.0 - 200.0 * overshoot).round().clamp(0.0, 100.0) as u8
}

/// Points for a struck deal's final unit price.
///
/// Prices up to 5% above modal still score 100; past that grace margin
/// the points fall by 4 for each percent of the modal price, to 0.
pub fn deal_price_points(final_price: f64, modal_price: f64) -> u8 {
    if modal_price <= 0.0 {
        return 100;
    }
    let ceiling = modal_price * 1.05;
    if final_price <= ceiling {
        return 100;
    }
    let excess = (final_price - ceiling) / modal_price;
    (100.0 - 400.0 * excess).round().clamp(0.0, 100.0) as u8
}

/// Points for language reliability at deal time, from the number of
/// dispute-flavored messages seen during the negotiation.
pub fn dispute_language_points(dispute_count: u32) -> u8 {
    100u32.saturating_sub(dispute_count.saturating_mul(25)) as u8
}

/// Weighted overall score from the three components.
pub fn overall_score(price_honesty: u8, negotiation_stability: u8, language_reliability: u8) -> u8 {
    let weighted = f64::from(price_honesty) * 0.45
        + f64::from(negotiation_stability) * 0.35
        + f64::from(language_reliability) * 0.20;
    weighted.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ema_blends_four_to_one() {
        assert_eq!(ema_update(70, 100), 76);
        assert_eq!(ema_update(70, 0), 56);
        assert_eq!(ema_update(100, 100), 100);
        assert_eq!(ema_update(0, 0), 0);
    }

    #[test]
    fn counter_at_or_below_modal_is_fully_stable() {
        assert_eq!(counter_offer_points(2200.0, 2200.0), 100);
        assert_eq!(counter_offer_points(2000.0, 2200.0), 100);
    }

    #[test]
    fn counter_overshoot_loses_two_points_per_percent() {
        // 10% above modal: 100 - 200 * 0.10 = 80
        assert_eq!(counter_offer_points(2420.0, 2200.0), 80);
        // 50% above modal: floor at 0
        assert_eq!(counter_offer_points(3300.0, 2200.0), 0);
    }

    #[test]
    fn deal_price_has_five_percent_grace() {
        assert_eq!(deal_price_points(2310.0, 2200.0), 100);
        // 5% past the grace ceiling: 100 - 400 * 0.05 = 80
        assert_eq!(deal_price_points(2420.0, 2200.0), 80);
        // Far past: floor at 0
        assert_eq!(deal_price_points(3500.0, 2200.0), 0);
    }

    #[test]
    fn dispute_count_steps_language_points_down() {
        assert_eq!(dispute_language_points(0), 100);
        assert_eq!(dispute_language_points(1), 75);
        assert_eq!(dispute_language_points(2), 50);
        assert_eq!(dispute_language_points(4), 0);
        assert_eq!(dispute_language_points(40), 0);
    }

    #[test]
    fn overall_weighs_honesty_heaviest() {
        assert_eq!(overall_score(70, 70, 70), 70);
        // round(100*0.45 + 70*0.35 + 70*0.20) = round(45 + 24.5 + 14) = 84
        assert_eq!(overall_score(100, 70, 70), 84);
        assert_eq!(overall_score(0, 0, 0), 0);
        assert_eq!(overall_score(100, 100, 100), 100);
    }

    proptest! {
        #[test]
        fn ema_stays_in_score_range(current in 0u8..=100, sample in 0u8..=100) {
            let updated = ema_update(current, sample);
            prop_assert!(updated <= 100);
        }

        #[test]
        fn ema_is_monotonic_in_sample(current in 0u8..=100, sample in 0u8..100) {
            prop_assert!(ema_update(current, sample) <= ema_update(current, sample + 1));
        }

        #[test]
        fn overall_stays_in_score_range(
            ph in 0u8..=100,
            ns in 0u8..=100,
            lr in 0u8..=100,
        ) {
            prop_assert!(overall_score(ph, ns, lr) <= 100);
        }

        #[test]
        fn counter_points_never_reward_overshoot(
            modal in 100.0f64..10_000.0,
            factor in 1.01f64..3.0,
        ) {
            let points = counter_offer_points(modal * factor, modal);
            prop_assert!(points < 100);
        }
    }
}
