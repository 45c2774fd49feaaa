// src/services/rates.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::invoice::Unit;

/// Como uma categoria de tabela é precificada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tariff {
    // lei / buc; o peso também vem da tabela
    PerPiece { unit_price: Decimal, unit_weight_kg: Decimal },
    // lei / kg
    PerKg { unit_price: Decimal },
}

#[derive(Debug, Clone, Copy)]
pub struct RateEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub tariff: Tariff,
}

// Categorias (chave -> rótulo em romeno). Estas são precificadas livremente por linha.
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("1a", "Alcaline"),
    ("1b", "Litiu"),
    ("1c", "Zinc carbon"),
    ("1d", "Zinc aer"),
    ("1e", "Oxid de mercur (HgO)"),
    ("1f", "Oxid de argint (Ag₂O)"),
    ("1g", "Ansamblu de baterii"),
    ("1h", "Altele"),
    ("2a", "Nichel Cadmiu (NiCd)"),
    ("2b", "Plumb"),
    ("2c", "Nichel metal hidrură (NiMH)"),
    ("2d", "Litiu ion"),
    ("2e", "Litiu polimer"),
    ("2f", "Altele"),
    ("3a", "Plumb acid"),
    ("3b", "Nichel cadmiu (NiCd)"),
    ("3c", "Altele"),
    ("4a", "Plumb acid"),
    ("4b", "Nichel cadmiu (NiCd)"),
    ("4c", "Altele"),
];

// (código, título, chaves na ordem de exibição)
const SECTIONS: &[(&str, &str, &[&str])] = &[
    (
        "PORTABLE_12",
        "Baterii portabile (categoriile 1 și 2)",
        &["1a", "1b", "1c", "1d", "1e", "1f", "1g", "1h", "2a", "2b", "2c", "2d", "2e", "2f"],
    ),
    ("AUTO_3", "Baterii auto (categoria 3)", &["3a", "3b", "3c"]),
    ("INDUSTRIAL_4", "Baterii industriale (categoria 4)", &["4a", "4b", "4c"]),
];

/// Tarifas fixas. Portáteis por classe de peso (lei/buc, peso unitário = limite superior
/// da classe); auto e industriais por kg.
fn standard_entries() -> Vec<RateEntry> {
    let piece = |key, label, cents: i64, grams: i64| RateEntry {
        key,
        label,
        tariff: Tariff::PerPiece {
            unit_price: Decimal::new(cents, 2),
            unit_weight_kg: Decimal::new(grams, 3),
        },
    };
    let per_kg = |key, label, cents: i64| RateEntry {
        key,
        label,
        tariff: Tariff::PerKg { unit_price: Decimal::new(cents, 2) },
    };

    vec![
        piece("pastila", "Baterii portabile tip pastilă", 1, 5),
        piece("g_0_50", "Baterii portabile 0-50 g", 4, 50),
        piece("g_51_150", "Baterii portabile 51-150 g", 11, 150),
        piece("g_151_250", "Baterii portabile 151-250 g", 38, 250),
        piece("g_251_500", "Baterii portabile 251-500 g", 80, 500),
        piece("g_501_750", "Baterii portabile 501-750 g", 98, 750),
        piece("g_751_1000", "Baterii portabile 751-1000 g", 120, 1000),
        piece("g_over_1000", "Baterii portabile peste 1000 g", 138, 1000),
        per_kg("auto_plumb", "Baterii auto plumb acid", 35),
        per_kg("auto_nicd", "Baterii auto NiCd", 138),
        per_kg("auto_altele", "Baterii auto altele", 138),
        per_kg("ind_plumb", "Baterii industriale plumb acid", 35),
        per_kg("ind_nicd", "Baterii industriale NiCd", 138),
        per_kg("ind_altele", "Baterii industriale altele", 138),
    ]
}

#[derive(Debug, Clone)]
pub struct RateTable {
    tariffs: HashMap<&'static str, RateEntry>,
    labels: HashMap<&'static str, &'static str>,
}

impl RateTable {
    /// Tabela com as tarifas fixas ativas.
    pub fn standard() -> Self {
        let tariffs = standard_entries().into_iter().map(|e| (e.key, e)).collect();
        Self { tariffs, labels: CATEGORY_LABELS.iter().copied().collect() }
    }

    /// Sem tarifas: toda linha usa o preço e o peso enviados.
    pub fn free_form() -> Self {
        Self { tariffs: HashMap::new(), labels: CATEGORY_LABELS.iter().copied().collect() }
    }

    pub fn tariff(&self, key: &str) -> Option<Tariff> {
        self.tariffs.get(key).map(|e| e.tariff)
    }

    /// Descrição usada na fatura: "Plumb acid (3a)".
    pub fn describe(&self, key: &str) -> String {
        if let Some(entry) = self.tariffs.get(key) {
            return entry.label.to_string();
        }
        match self.labels.get(key) {
            Some(label) => format!("{} ({})", label, key),
            None => format!("Baterii {}", key),
        }
    }

    pub fn catalogue(&self) -> RateCatalogue {
        let sections = SECTIONS
            .iter()
            .map(|&(code, title, keys)| CatalogueSection {
                code,
                title,
                categories: keys
                    .iter()
                    .map(|&key| CatalogueCategory { key, label: self.labels.get(key).copied().unwrap_or(key) })
                    .collect(),
            })
            .collect();

        let mut tariffs: Vec<CatalogueTariff> = self
            .tariffs
            .values()
            .map(|e| match e.tariff {
                Tariff::PerPiece { unit_price, unit_weight_kg } => CatalogueTariff {
                    key: e.key,
                    label: e.label,
                    unit: Unit::Buc,
                    unit_price,
                    unit_weight_kg: Some(unit_weight_kg),
                },
                Tariff::PerKg { unit_price } => CatalogueTariff {
                    key: e.key,
                    label: e.label,
                    unit: Unit::Kg,
                    unit_price,
                    unit_weight_kg: None,
                },
            })
            .collect();
        tariffs.sort_by_key(|t| t.key);

        RateCatalogue { sections, tariffs }
    }
}

// --- Visão serializável para GET /api/rates ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCatalogue {
    pub sections: Vec<CatalogueSection>,
    pub tariffs: Vec<CatalogueTariff>,
}

#[derive(Debug, Serialize)]
pub struct CatalogueSection {
    pub code: &'static str,
    pub title: &'static str,
    pub categories: Vec<CatalogueCategory>,
}

#[derive(Debug, Serialize)]
pub struct CatalogueCategory {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueTariff {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub unit_weight_kg: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn standard_table_has_piece_and_kg_tariffs() {
        let table = RateTable::standard();
        assert_eq!(
            table.tariff("g_0_50"),
            Some(Tariff::PerPiece { unit_price: dec!(0.04), unit_weight_kg: dec!(0.050) })
        );
        assert_eq!(table.tariff("auto_plumb"), Some(Tariff::PerKg { unit_price: dec!(0.35) }));
        assert_eq!(table.tariff("3a"), None);
    }

    #[test]
    fn free_form_table_has_no_tariffs() {
        assert_eq!(RateTable::free_form().tariff("g_0_50"), None);
    }

    #[test]
    fn descriptions_fall_back_to_the_key() {
        let table = RateTable::standard();
        assert_eq!(table.describe("3a"), "Plumb acid (3a)");
        assert_eq!(table.describe("ind_nicd"), "Baterii industriale NiCd");
        assert_eq!(table.describe("zz"), "Baterii zz");
    }

    #[test]
    fn catalogue_lists_every_section_in_order() {
        let cat = RateTable::standard().catalogue();
        let codes: Vec<_> = cat.sections.iter().map(|s| s.code).collect();
        assert_eq!(codes, ["PORTABLE_12", "AUTO_3", "INDUSTRIAL_4"]);
        assert_eq!(cat.sections[0].categories.len(), 14);
        assert_eq!(cat.tariffs.len(), 14);
    }
}
