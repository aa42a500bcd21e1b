//! Text-to-number coercion for hand-maintained spreadsheet cells.
//!
//! Blank and unparsable cells are not errors: they come back as
//! [`Coerced::Blank`] / [`Coerced::Unparsable`] and callers turn both into a
//! missing value while tallying them in [`CoercionStats`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decimal convention of a column.
///
/// `Comma` is the locale-ambiguous setting: every `,` is read as a decimal
/// point, so both `12,5` and `12.5` parse to 12.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Dot,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    Blank,
    Unparsable,
}

impl<T> Coerced<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Coerced::Value(v) => Some(v),
            Coerced::Blank | Coerced::Unparsable => None,
        }
    }

    pub fn is_unparsable(&self) -> bool {
        matches!(self, Coerced::Unparsable)
    }
}

pub fn coerce_number(text: &str, decimal: DecimalSeparator) -> Coerced<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Coerced::Blank;
    }
    let parsed = match decimal {
        DecimalSeparator::Dot => trimmed.parse::<f64>(),
        DecimalSeparator::Comma => trimmed.replace(',', ".").parse::<f64>(),
    };
    match parsed {
        // "inf" and "NaN" parse as f64 but are placeholders, not measurements
        Ok(v) if v.is_finite() => Coerced::Value(v),
        _ => Coerced::Unparsable,
    }
}

/// Like [`coerce_number`], then downcasts integral values that fit in `i64`.
/// A fractional or out-of-range value is unparsable for an integer column.
pub fn coerce_integer(text: &str, decimal: DecimalSeparator) -> Coerced<i64> {
    match coerce_number(text, decimal) {
        Coerced::Value(v)
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
        {
            Coerced::Value(v as i64)
        }
        Coerced::Value(_) | Coerced::Unparsable => Coerced::Unparsable,
        Coerced::Blank => Coerced::Blank,
    }
}

/// Shortest representation that parses back to the same `f64`.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnStats {
    pub blank: usize,
    pub unparsable: usize,
}

/// Per-column tallies of cells that degraded to missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoercionStats {
    columns: BTreeMap<String, ColumnStats>,
}

impl CoercionStats {
    pub fn record<T>(&mut self, column: &str, cell: &Coerced<T>) {
        if let Coerced::Value(_) = cell {
            return;
        }
        let stats = self.columns.entry(column.to_string()).or_default();
        if cell.is_unparsable() {
            stats.unparsable += 1;
        } else {
            stats.blank += 1;
        }
    }

    pub fn merge(&mut self, other: CoercionStats) {
        for (column, stats) in other.columns {
            let entry = self.columns.entry(column).or_default();
            entry.blank += stats.blank;
            entry.unparsable += stats.unparsable;
        }
    }

    pub fn column(&self, name: &str) -> ColumnStats {
        self.columns.get(name).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnStats)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn total_blank(&self) -> usize {
        self.columns.values().map(|s| s.blank).sum()
    }

    pub fn total_unparsable(&self) -> usize {
        self.columns.values().map(|s| s.unparsable).sum()
    }

    pub fn log_warnings(&self, source: &str) {
        for (column, stats) in &self.columns {
            if stats.unparsable > 0 {
                log::warn!(
                    "{}: {} unparsable cell(s) in column '{}' treated as missing",
                    source,
                    stats.unparsable,
                    column
                );
            }
            if stats.blank > 0 {
                log::debug!("{}: {} blank cell(s) in column '{}'", source, stats.blank, column);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_locale_reads_comma_decimal() {
        assert_eq!(coerce_number("12,5", DecimalSeparator::Comma), Coerced::Value(12.5));
        assert_eq!(coerce_number("12.5", DecimalSeparator::Comma), Coerced::Value(12.5));
    }

    #[test]
    fn dot_locale_reads_dot_decimal() {
        assert_eq!(coerce_number("12.5", DecimalSeparator::Dot), Coerced::Value(12.5));
        assert_eq!(coerce_number(" 7 ", DecimalSeparator::Dot), Coerced::Value(7.0));
        assert!(coerce_number("12,5", DecimalSeparator::Dot).is_unparsable());
    }

    #[test]
    fn empty_is_missing_under_any_locale() {
        for decimal in [DecimalSeparator::Dot, DecimalSeparator::Comma] {
            assert_eq!(coerce_number("", decimal), Coerced::Blank);
            assert_eq!(coerce_number("   ", decimal), Coerced::Blank);
            assert_eq!(coerce_number("", decimal).value(), None);
        }
    }

    #[test]
    fn placeholders_are_unparsable() {
        for text in ["n/a", "-", "NaN", "inf", "1.2.3"] {
            assert!(
                coerce_number(text, DecimalSeparator::Comma).is_unparsable(),
                "{text}"
            );
        }
    }

    #[test]
    fn integer_downcast() {
        assert_eq!(coerce_integer("3", DecimalSeparator::Dot), Coerced::Value(3));
        assert_eq!(coerce_integer("3.0", DecimalSeparator::Dot), Coerced::Value(3));
        assert_eq!(coerce_integer("-2", DecimalSeparator::Dot), Coerced::Value(-2));
        assert!(coerce_integer("3.5", DecimalSeparator::Dot).is_unparsable());
        assert!(coerce_integer("1e300", DecimalSeparator::Dot).is_unparsable());
        assert_eq!(coerce_integer("", DecimalSeparator::Dot), Coerced::Blank);
    }

    #[test]
    fn full_precision_rendering() {
        assert_eq!(format_number(90.0), "90");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn stats_count_and_merge() {
        let mut a = CoercionStats::default();
        a.record("Time", &coerce_number("", DecimalSeparator::Comma));
        a.record("Time", &coerce_number("x", DecimalSeparator::Comma));
        a.record("Time", &coerce_number("1,5", DecimalSeparator::Comma));
        let mut b = CoercionStats::default();
        b.record("Time", &coerce_number("?", DecimalSeparator::Comma));
        b.record("Gap", &coerce_integer("", DecimalSeparator::Dot));
        a.merge(b);
        assert_eq!(a.column("Time"), ColumnStats { blank: 1, unparsable: 2 });
        assert_eq!(a.column("Gap").blank, 1);
        assert_eq!(a.total_unparsable(), 2);
        assert_eq!(a.total_blank(), 2);
    }
}
