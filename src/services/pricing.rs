// src/services/pricing.rs

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;
use crate::models::batch::{BatteryLine, BatteryLines, LineSummary, RawBatteryEntry};
use crate::models::invoice::Unit;
use crate::services::rates::{RateTable, Tariff};

// Limites por campo de entrada; mantêm a aritmética longe do overflow de Decimal.
const MAX_PIECES: i64 = 1_000_000_000;
const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MAX_PRICE_RON: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

// Maiores valores que cabem nas colunas NUMERIC(14, 2) e NUMERIC(12, 2).
const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);
const MAX_STORED_WEIGHT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Arredondamento comercial (metade para longe do zero) em 2 casas.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---
// Normalizador
// ---

/// Converte o mapa enviado pelo cliente em linhas canônicas.
/// Campos ausentes viram zero, linhas totalmente zeradas são descartadas.
pub fn normalize_lines(raw: &BTreeMap<String, RawBatteryEntry>) -> Result<BatteryLines, AppError> {
    let mut lines = BatteryLines::new();

    for (key, entry) in raw {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::InvalidBatteryLine {
                key: key.to_string(),
                reason: "category key must not be empty".into(),
            });
        }

        let line = entry.to_line().map_err(|reason| AppError::InvalidBatteryLine {
            key: key.to_string(),
            reason,
        })?;
        check_bounds(key, &line)?;

        if !line.is_empty() {
            lines.insert(key.to_string(), line);
        }
    }

    Ok(lines)
}

/// As linhas gravadas já passaram pela validação na leitura do JSONB; aqui só
/// descartamos as zeradas e reaplicamos os limites.
pub fn normalize_stored(stored: &BatteryLines) -> Result<BatteryLines, AppError> {
    let mut lines = BatteryLines::new();
    for (key, line) in stored {
        check_bounds(key, line)?;
        if !line.is_empty() {
            lines.insert(key.clone(), *line);
        }
    }
    Ok(lines)
}

fn check_bounds(key: &str, line: &BatteryLine) -> Result<(), AppError> {
    let reason = if line.pieces > MAX_PIECES {
        "pieces exceeds the allowed maximum"
    } else if line.weight_kg > MAX_WEIGHT_KG {
        "weight_kg exceeds the allowed maximum"
    } else if line.price_ron > MAX_PRICE_RON {
        "price_ron exceeds the allowed maximum"
    } else {
        return Ok(());
    };
    Err(AppError::InvalidBatteryLine { key: key.to_string(), reason: reason.into() })
}

// ---
// Precificação por linha
// ---

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub key: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub weight_kg: Decimal,
}

/// Precifica as linhas na ordem do mapa (chaves ordenadas).
/// Categorias da tabela usam preço/peso fixos quando a quantidade relevante é > 0;
/// as demais usam o `price_ron` e o `weight_kg` enviados.
pub fn price_lines(table: &RateTable, lines: &BatteryLines) -> Vec<PricedLine> {
    lines
        .iter()
        .map(|(key, line)| price_line(table, key, line))
        .collect()
}

fn price_line(table: &RateTable, key: &str, line: &BatteryLine) -> PricedLine {
    let description = table.describe(key);
    let pieces = Decimal::from(line.pieces);

    match table.tariff(key) {
        Some(Tariff::PerPiece { unit_price, unit_weight_kg }) if line.pieces > 0 => PricedLine {
            key: key.to_string(),
            description,
            quantity: pieces,
            unit: Unit::Buc,
            unit_price,
            line_total: round2(pieces * unit_price),
            weight_kg: round2(pieces * unit_weight_kg),
        },
        Some(Tariff::PerKg { unit_price }) if !line.weight_kg.is_zero() => PricedLine {
            key: key.to_string(),
            description,
            quantity: line.weight_kg,
            unit: Unit::Kg,
            unit_price,
            line_total: round2(line.weight_kg * unit_price),
            weight_kg: round2(line.weight_kg),
        },
        _ => {
            let (quantity, unit) = if !line.weight_kg.is_zero() {
                (line.weight_kg, Unit::Kg)
            } else if line.pieces > 0 {
                (pieces, Unit::Buc)
            } else {
                (Decimal::ONE, Unit::Buc)
            };
            let line_total = round2(line.price_ron);
            PricedLine {
                key: key.to_string(),
                description,
                quantity,
                unit,
                unit_price: back_derive_unit_price(line_total, quantity),
                line_total,
                weight_kg: round2(line.weight_kg),
            }
        }
    }
}

pub fn back_derive_unit_price(line_total: Decimal, quantity: Decimal) -> Decimal {
    if quantity > Decimal::ZERO {
        round2(line_total / quantity)
    } else {
        line_total
    }
}

// ---
// Totais
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub total_weight: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

/// `subtotal` é a soma dos totais de linha já arredondados, então
/// `subtotal == Σ line_total` vale exatamente na fatura.
pub fn compute_totals(lines: &[PricedLine], vat_rate: Decimal) -> Totals {
    let subtotal = round2(lines.iter().map(|l| l.line_total).sum());
    let total_weight = round2(lines.iter().map(|l| l.weight_kg).sum());
    let vat_amount = round2(subtotal * vat_rate / Decimal::ONE_HUNDRED);
    let total = round2(subtotal + vat_amount);

    Totals { subtotal, total_weight, vat_amount, total }
}

/// Valores derivados (preço unitário, somas) também precisam caber nas colunas;
/// limites por campo não garantem isso.
pub fn ensure_storable(lines: &[PricedLine], totals: &Totals) -> Result<(), AppError> {
    for line in lines {
        let reason = if line.unit_price > MAX_AMOUNT {
            "derived unit price exceeds the allowed maximum"
        } else if line.line_total > MAX_AMOUNT {
            "line total exceeds the allowed maximum"
        } else if line.weight_kg > MAX_STORED_WEIGHT {
            "line weight exceeds the allowed maximum"
        } else {
            continue;
        };
        return Err(AppError::InvalidBatteryLine { key: line.key.clone(), reason: reason.into() });
    }

    if totals.total_weight > MAX_STORED_WEIGHT {
        return Err(AppError::AmountOutOfRange("batch total weight exceeds the allowed maximum".into()));
    }
    if [totals.subtotal, totals.vat_amount, totals.total].iter().any(|v| *v > MAX_AMOUNT) {
        return Err(AppError::AmountOutOfRange("batch total exceeds the allowed maximum".into()));
    }
    Ok(())
}

/// Resumo por linha para a tela do lote ("12 buc", "10.5 kg").
pub fn summarize(lines: &[PricedLine]) -> Vec<LineSummary> {
    lines
        .iter()
        .map(|l| LineSummary {
            key: l.key.clone(),
            label: l.description.clone(),
            quantity_display: format!("{} {}", l.quantity.normalize(), l.unit.as_str()),
            line_total: l.line_total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(json: &str) -> BTreeMap<String, RawBatteryEntry> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(dec!(0.665)), dec!(0.67));
        assert_eq!(round2(dec!(0.664)), dec!(0.66));
        assert_eq!(round2(dec!(-0.665)), dec!(-0.67));
        assert_eq!(round2(dec!(2.5)), dec!(2.50));
    }

    #[test]
    fn normalizer_drops_all_zero_lines_and_fills_defaults() {
        let lines = normalize_lines(&raw(r#"{"1a": 0, "1b": {"pieces": 2}, "3a": {"weight_kg": "4.2"}}"#)).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines["1b"], BatteryLine { pieces: 2, weight_kg: dec!(0), price_ron: dec!(0) });
        assert_eq!(lines["3a"].weight_kg, dec!(4.2));
    }

    #[test]
    fn normalizer_rejects_negative_values_with_the_key() {
        let err = normalize_lines(&raw(r#"{"2b": {"pieces": -3}}"#)).unwrap_err();
        match err {
            AppError::InvalidBatteryLine { key, .. } => assert_eq!(key, "2b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalizer_rejects_out_of_bounds_values() {
        let err = normalize_lines(&raw(r#"{"3a": {"weight_kg": "5000000000"}}"#)).unwrap_err();
        assert!(matches!(err, AppError::InvalidBatteryLine { .. }));
    }

    #[test]
    fn normalizer_rejects_blank_keys() {
        assert!(normalize_lines(&raw(r#"{" ": 3}"#)).is_err());
    }

    #[test]
    fn free_form_line_priced_by_weight() {
        let lines = normalize_lines(&raw(r#"{"3a": {"weight_kg": 10, "price_ron": "3.50"}}"#)).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);

        assert_eq!(priced.len(), 1);
        let line = &priced[0];
        assert_eq!(line.unit, Unit::Kg);
        assert_eq!(line.quantity, dec!(10));
        assert_eq!(line.line_total, dec!(3.50));
        assert_eq!(line.unit_price, dec!(0.35));
        assert_eq!(line.description, "Plumb acid (3a)");
    }

    #[test]
    fn free_form_line_without_quantity_is_one_piece() {
        let lines = normalize_lines(&raw(r#"{"1h": {"price_ron": 12}}"#)).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);
        assert_eq!(priced[0].quantity, dec!(1));
        assert_eq!(priced[0].unit, Unit::Buc);
        assert_eq!(priced[0].unit_price, dec!(12));
    }

    #[test]
    fn table_categories_ignore_submitted_price() {
        let lines = normalize_lines(&raw(
            r#"{"g_51_150": {"pieces": 100, "price_ron": 999}, "auto_nicd": {"weight_kg": "2.5"}}"#,
        ))
        .unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);

        // ordem das chaves: auto_nicd < g_51_150
        assert_eq!(priced[0].key, "auto_nicd");
        assert_eq!(priced[0].line_total, dec!(3.45));
        assert_eq!(priced[0].unit, Unit::Kg);

        assert_eq!(priced[1].line_total, dec!(11.00));
        assert_eq!(priced[1].weight_kg, dec!(15.00));
        assert_eq!(priced[1].unit_price, dec!(0.11));
    }

    #[test]
    fn disabled_table_prices_everything_free_form() {
        let lines = normalize_lines(&raw(r#"{"g_51_150": {"pieces": 100, "price_ron": 9}}"#)).unwrap();
        let priced = price_lines(&RateTable::free_form(), &lines);
        assert_eq!(priced[0].line_total, dec!(9));
        assert_eq!(priced[0].unit_price, dec!(0.09));
    }

    #[test]
    fn totals_for_single_line_scenario() {
        let lines = normalize_lines(&raw(r#"{"3a": {"weight_kg": 10, "price_ron": 3.50}}"#)).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, dec!(19.00));

        assert_eq!(totals.subtotal, dec!(3.50));
        assert_eq!(totals.vat_amount, dec!(0.67));
        assert_eq!(totals.total, dec!(4.17));
        assert_eq!(totals.total_weight, dec!(10.00));
    }

    #[test]
    fn empty_batch_totals_are_zero() {
        let totals = compute_totals(&[], dec!(19));
        assert!(totals.subtotal.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn tiny_weight_with_large_price_is_not_storable() {
        let lines = normalize_lines(&raw(r#"{"3a": {"weight_kg": "0.001", "price_ron": "1000000000"}}"#)).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, dec!(19));

        assert_eq!(priced[0].unit_price, dec!(1000000000000));
        match ensure_storable(&priced, &totals).unwrap_err() {
            AppError::InvalidBatteryLine { key, .. } => assert_eq!(key, "3a"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn aggregate_weight_over_column_range_is_rejected() {
        let entries: BTreeMap<String, RawBatteryEntry> = (1..=12)
            .map(|i| (format!("k{i}"), serde_json::from_str(r#"{"weight_kg": "1000000000"}"#).unwrap()))
            .collect();
        let lines = normalize_lines(&entries).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, Decimal::ZERO);

        assert_eq!(totals.total_weight, dec!(12000000000));
        let err = ensure_storable(&priced, &totals).unwrap_err();
        assert!(matches!(err, AppError::AmountOutOfRange(_)));
    }

    #[test]
    fn regular_batches_are_storable() {
        let lines = normalize_lines(&raw(r#"{"3a": {"weight_kg": 10, "price_ron": "3.50"}, "1a": 12}"#)).unwrap();
        let priced = price_lines(&RateTable::standard(), &lines);
        let totals = compute_totals(&priced, dec!(19));
        assert!(ensure_storable(&priced, &totals).is_ok());
    }

    #[test]
    fn summary_displays_quantity_with_unit() {
        let lines = normalize_lines(&raw(r#"{"1a": 12, "3a": {"weight_kg": "10.50", "price_ron": 1}}"#)).unwrap();
        let summary = summarize(&price_lines(&RateTable::standard(), &lines));
        assert_eq!(summary[0].quantity_display, "12 buc");
        assert_eq!(summary[1].quantity_display, "10.5 kg");
    }
}
