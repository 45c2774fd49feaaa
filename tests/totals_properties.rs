// Propriedades aritméticas do cálculo de totais.

use std::collections::BTreeMap;

use battery_billing::models::batch::{BatteryLine, BatteryLines};
use battery_billing::services::pricing::{compute_totals, price_lines, round2};
use battery_billing::services::rates::RateTable;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const KEYS: &[&str] = &[
    "1a", "1b", "2c", "3a", "4b", "pastila", "g_0_50", "g_251_500", "g_over_1000", "auto_plumb", "ind_nicd",
];

fn arb_line() -> impl Strategy<Value = BatteryLine> {
    (0i64..5_000, 0i64..10_000_000, 0i64..100_000_000).prop_map(|(pieces, grams, bani)| BatteryLine {
        pieces,
        weight_kg: Decimal::new(grams, 3),
        price_ron: Decimal::new(bani, 2),
    })
}

fn arb_lines() -> impl Strategy<Value = BatteryLines> {
    prop::collection::vec((prop::sample::select(KEYS), arb_line()), 1..8).prop_map(|entries| {
        entries
            .into_iter()
            .filter(|(_, line)| !line.is_empty())
            .map(|(k, line)| (k.to_string(), line))
            .collect::<BTreeMap<_, _>>()
    })
}

fn arb_vat_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=9_900).prop_map(|basis| Decimal::new(basis, 2))
}

proptest! {
    #[test]
    fn total_is_subtotal_plus_vat(lines in arb_lines(), vat_rate in arb_vat_rate()) {
        for table in [RateTable::standard(), RateTable::free_form()] {
            let priced = price_lines(&table, &lines);
            let totals = compute_totals(&priced, vat_rate);

            prop_assert_eq!(totals.total, totals.subtotal + totals.vat_amount);
            prop_assert_eq!(totals.vat_amount, round2(totals.subtotal * vat_rate / dec!(100)));
        }
    }

    #[test]
    fn subtotal_equals_sum_of_line_totals(lines in arb_lines(), vat_rate in arb_vat_rate()) {
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, vat_rate);
        let sum: Decimal = priced.iter().map(|l| l.line_total).sum();

        prop_assert_eq!(totals.subtotal, round2(sum));
        prop_assert_eq!(totals.subtotal, sum);
    }

    #[test]
    fn every_amount_has_at_most_two_decimals(lines in arb_lines(), vat_rate in arb_vat_rate()) {
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, vat_rate);

        for value in [totals.subtotal, totals.vat_amount, totals.total, totals.total_weight] {
            prop_assert_eq!(value, round2(value));
        }
        for line in &priced {
            prop_assert_eq!(line.line_total, round2(line.line_total));
            prop_assert!(line.line_total >= Decimal::ZERO);
        }
    }

    #[test]
    fn one_priced_line_per_normalized_line(lines in arb_lines()) {
        let priced = price_lines(&RateTable::standard(), &lines);
        prop_assert_eq!(priced.len(), lines.len());
        let keys: Vec<&str> = priced.iter().map(|l| l.key.as_str()).collect();
        let expected: Vec<&str> = lines.keys().map(String::as_str).collect();
        prop_assert_eq!(keys, expected);
    }
}
