//! Value normalizers for spreadsheet cells
//!
//! Spreadsheets come from several ERP exports and are hand-edited before
//! upload, so headers, numbers and dates are matched leniently. Numbers follow
//! pt-BR conventions (`1.234,56`), dates are day-first.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spreadsheet serials at or below this value are not treated as dates
pub const DATE_SERIAL_THRESHOLD: f64 = 20000.0;

/// A single decoded spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual form of the cell. Integral numbers print without a fraction so
    /// numeric SKUs survive the round trip through a spreadsheet.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Empty => Cow::Borrowed(""),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One data row keyed by the sheet's header row, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: Vec<(String, CellValue)>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell. Blank cells are dropped so lookups fall through to the
    /// next candidate column.
    pub fn push(&mut self, header: impl Into<String>, value: CellValue) {
        if !value.is_blank() {
            self.cells.push((header.into(), value));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v))
    }
}

impl<H: Into<String>> FromIterator<(H, CellValue)> for SheetRow {
    fn from_iter<I: IntoIterator<Item = (H, CellValue)>>(iter: I) -> Self {
        let mut row = SheetRow::new();
        for (header, value) in iter {
            row.push(header, value);
        }
        row
    }
}

// ============================================================================
// SKU
// ============================================================================

/// Canonical SKU: trimmed, upper-cased, with every whitespace character
/// (including NBSP and BOM) removed
pub fn normalize_sku(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{FEFF}')
        .flat_map(char::to_uppercase)
        .collect()
}

/// [`normalize_sku`] over a cell
pub fn normalize_sku_cell(value: &CellValue) -> String {
    normalize_sku(&value.as_text())
}

// ============================================================================
// Dates
// ============================================================================

fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Calendar day for a spreadsheet serial; the time-of-day fraction is dropped
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= DATE_SERIAL_THRESHOLD {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a spreadsheet date cell.
///
/// Accepts serial numbers above [`DATE_SERIAL_THRESHOLD`], day-first
/// `D/M/YYYY` or `D-M-YYYY` strings and ISO-style strings.
pub fn parse_spreadsheet_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Number(n) => date_from_serial(*n),
        CellValue::Text(s) => parse_date_text(s.trim()),
        CellValue::Bool(_) | CellValue::Empty => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Some(date) = parse_day_first(s) {
        return Some(date);
    }
    if let Ok(serial) = s.parse::<f64>() {
        return date_from_serial(serial);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// `D/M/YYYY` or `D-M-YYYY` at the start of the string; trailing text such as
/// a time of day is ignored
fn parse_day_first(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    let day = take_digits(bytes, &mut pos, 1, 2)?;
    take_separator(bytes, &mut pos)?;
    let month = take_digits(bytes, &mut pos, 1, 2)?;
    take_separator(bytes, &mut pos)?;
    let year = take_digits(bytes, &mut pos, 4, 4)?;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        return None;
    }

    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn take_digits(bytes: &[u8], pos: &mut usize, min: usize, max: usize) -> Option<u32> {
    let start = *pos;
    while *pos < bytes.len() && *pos - start < max && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos - start < min {
        return None;
    }
    std::str::from_utf8(&bytes[start..*pos]).ok()?.parse().ok()
}

fn take_separator(bytes: &[u8], pos: &mut usize) -> Option<()> {
    match bytes.get(*pos) {
        Some(b'/') | Some(b'-') => {
            *pos += 1;
            Some(())
        }
        _ => None,
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Rewrite a pt-BR formatted number into a plain decimal string.
///
/// Currency marks and whitespace are removed. A lone comma is the decimal
/// separator; when both separators appear, dots group thousands.
fn canonical_number_text(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, 'R' | '$') && !c.is_whitespace())
        .collect();

    match (cleaned.contains(','), cleaned.contains('.')) {
        (true, false) => cleaned.replacen(',', ".", 1),
        (true, true) => cleaned.replace('.', "").replacen(',', ".", 1),
        _ => cleaned,
    }
}

/// Longest leading slice that reads as a decimal number
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    Some(&s[..end])
}

/// Parse a pt-BR number from text; anything unreadable is zero
pub fn parse_locale_str(raw: &str) -> f64 {
    let canonical = canonical_number_text(raw);
    numeric_prefix(&canonical)
        .and_then(|p| p.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Numeric value of a cell, using pt-BR separators for text
pub fn parse_locale_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => parse_locale_str(s),
        _ => 0.0,
    }
}

/// Monetary value of a cell
pub fn parse_locale_decimal(value: &CellValue) -> Decimal {
    match value {
        CellValue::Number(n) => Decimal::try_from(*n)
            .map(|d| d.round_dp(6).normalize())
            .unwrap_or(Decimal::ZERO),
        CellValue::Text(s) => {
            let canonical = canonical_number_text(s);
            numeric_prefix(&canonical)
                .and_then(|p| {
                    Decimal::from_str(p)
                        .ok()
                        .or_else(|| p.parse::<f64>().ok().and_then(|n| Decimal::try_from(n).ok()))
                })
                .unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    }
}

/// Leading integer of a cell, truncating any fraction
pub fn parse_leading_int(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(n.trunc() as i64),
        CellValue::Text(s) => {
            let s = s.trim_start();
            let bytes = s.as_bytes();
            let mut end = usize::from(matches!(bytes.first(), Some(b'+') | Some(b'-')));
            let digits_start = end;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end == digits_start {
                return None;
            }
            s[..end].parse().ok()
        }
        _ => None,
    }
}

// ============================================================================
// Column lookup
// ============================================================================

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        // combining diacritical marks
        '\u{0300}'..='\u{036F}' => return None,
        other => other,
    };
    Some(folded)
}

/// Lower-case, strip diacritics and trim a header or candidate name
pub fn fold_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(fold_char)
        .collect()
}

/// First non-blank value whose header contains one of the candidates.
///
/// Candidates are tried in order. For each candidate a header equal to it
/// wins over the first header that merely contains it, so a short name such
/// as `Mar` is not captured by `Marca`. Matching ignores case and accents.
pub fn find_column_value<'a, S: AsRef<str>>(
    row: &'a SheetRow,
    candidates: &[S],
) -> Option<&'a CellValue> {
    let headers: Vec<String> = row.cells.iter().map(|(h, _)| fold_header(h)).collect();
    candidates
        .iter()
        .map(|c| fold_header(c.as_ref()))
        .filter(|c| !c.is_empty())
        .find_map(|candidate| {
            headers
                .iter()
                .position(|h| *h == candidate)
                .or_else(|| headers.iter().position(|h| h.contains(&candidate)))
                .map(|i| &row.cells[i].1)
        })
}
