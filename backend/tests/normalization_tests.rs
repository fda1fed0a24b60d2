//! Value normalization tests
//!
//! Tests for the spreadsheet value normalizers including:
//! - SKU canonicalization
//! - pt-BR number parsing
//! - Spreadsheet date serials and day-first strings
//! - Brand and product type inference

use chrono::NaiveDate;
use proptest::prelude::*;
use shared::normalize::{
    date_from_serial, find_column_value, fold_header, normalize_sku, parse_locale_str,
    parse_spreadsheet_date, CellValue, SheetRow,
};
use shared::{Brand, ProductType};

// Format an amount the way pt-BR spreadsheets do: 1.234.567,89
fn pt_br(units: u64, cents: u64) -> String {
    let digits = units.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{},{:02}", grouped, cents)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test SKU normalization strips every kind of whitespace
    #[test]
    fn test_normalize_sku() {
        assert_eq!(normalize_sku("  ab-12 x "), "AB-12X");
        assert_eq!(normalize_sku("\u{feff}dk\u{a0}9000"), "DK9000");
        assert_eq!(normalize_sku(""), "");
    }

    /// Test pt-BR number parsing
    #[test]
    fn test_parse_locale_numbers() {
        assert_eq!(parse_locale_str("1.234,56"), 1234.56);
        assert_eq!(parse_locale_str("R$ 1.500,00"), 1500.0);
        assert_eq!(parse_locale_str("12,5"), 12.5);
        assert_eq!(parse_locale_str("42"), 42.0);
        assert_eq!(parse_locale_str("abc"), 0.0);
        assert_eq!(parse_locale_str(""), 0.0);
    }

    /// Test the known serial maps to the same day as its string form
    #[test]
    fn test_serial_and_string_dates_agree() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 15);

        assert_eq!(date_from_serial(45000.0), expected);
        assert_eq!(parse_spreadsheet_date(&CellValue::Number(45000.0)), expected);
        assert_eq!(parse_spreadsheet_date(&CellValue::from("15/03/2023")), expected);
        assert_eq!(parse_spreadsheet_date(&CellValue::from("15-03-2023")), expected);
        assert_eq!(parse_spreadsheet_date(&CellValue::from("2023-03-15")), expected);
    }

    /// Test small numbers are not treated as dates
    #[test]
    fn test_small_numbers_are_not_dates() {
        assert_eq!(parse_spreadsheet_date(&CellValue::Number(150.0)), None);
        assert_eq!(parse_spreadsheet_date(&CellValue::Empty), None);
        assert_eq!(parse_spreadsheet_date(&CellValue::from("sem data")), None);
    }

    /// Test explicit brand match wins over the Springer fallback
    #[test]
    fn test_brand_inference() {
        assert_eq!(Brand::infer("AR CONDICIONADO SPRINGER MIDEA 12000"), Brand::Midea);
        assert_eq!(Brand::infer("SPRINGER 18000 BTU"), Brand::Midea);
        assert_eq!(Brand::infer("condensadora daikin 9000"), Brand::Daikin);
        assert_eq!(Brand::infer("SUPORTE PARA CONDENSADORA"), Brand::Other);
    }

    /// Test product type inference
    #[test]
    fn test_product_type_inference() {
        assert_eq!(ProductType::infer("UNIDADE CONDENSADORA"), ProductType::Condenser);
        assert_eq!(ProductType::infer("UNIDADE EXTERNA"), ProductType::Condenser);
        assert_eq!(ProductType::infer("EVAPORADORA HI WALL"), ProductType::Evaporator);
        assert_eq!(ProductType::infer("UNIDADE INTERNA"), ProductType::Evaporator);
        assert_eq!(ProductType::infer("CONTROLE REMOTO"), ProductType::Other);
    }

    /// Test header matching ignores case and accents
    #[test]
    fn test_fuzzy_header_lookup() {
        let row: SheetRow = vec![
            ("CÓDIGO DO PRODUTO", CellValue::from("dk1")),
            ("Descrição", CellValue::from("Evaporadora")),
        ]
        .into_iter()
        .collect();

        assert_eq!(fold_header("  Descrição "), "descricao");
        assert_eq!(
            find_column_value(&row, &["Codigo"]),
            Some(&CellValue::from("dk1"))
        );
        assert_eq!(find_column_value(&row, &["Estoque"]), None);
    }

    /// Test a header equal to the candidate wins over an earlier one containing it
    #[test]
    fn test_exact_header_preferred() {
        let row: SheetRow = vec![
            ("Marca", CellValue::from("DAIKIN")),
            ("Mar", CellValue::Number(7.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(find_column_value(&row, &["Mar"]), Some(&CellValue::Number(7.0)));
        assert_eq!(find_column_value(&row, &["Marc"]), Some(&CellValue::from("DAIKIN")));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Normalizing a SKU twice gives the same result as once
        #[test]
        fn prop_normalize_sku_idempotent(raw in "[ a-zA-Z0-9\\-\\.\u{a0}\u{feff}]{0,20}") {
            let once = normalize_sku(&raw);
            prop_assert_eq!(normalize_sku(&once), once.clone());
            prop_assert!(!once.chars().any(char::is_whitespace));
        }

        /// pt-BR formatted amounts parse back to their value
        #[test]
        fn prop_locale_number_roundtrip(units in 0u64..10_000_000, cents in 0u64..100) {
            let text = pt_br(units, cents);
            let expected = units as f64 + cents as f64 / 100.0;
            prop_assert!((parse_locale_str(&text) - expected).abs() < 1e-6);
        }

        /// A serial and its day-first rendering name the same date
        #[test]
        fn prop_serial_matches_day_first_string(serial in 20001u32..80000) {
            let date = date_from_serial(f64::from(serial)).unwrap();
            let text = date.format("%d/%m/%Y").to_string();
            prop_assert_eq!(parse_spreadsheet_date(&CellValue::from(text.as_str())), Some(date));
        }

        /// The time-of-day fraction of a serial never changes the date
        #[test]
        fn prop_serial_fraction_ignored(serial in 20001u32..80000, fraction in 0.0f64..0.999) {
            prop_assert_eq!(
                date_from_serial(f64::from(serial) + fraction),
                date_from_serial(f64::from(serial))
            );
        }
    }
}
