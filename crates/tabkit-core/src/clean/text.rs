//! Text normalization: accents, symbols and capitalisation.

use log::info;
use unicode_normalization::UnicodeNormalization;

use crate::{
    convert::{string_column, to_strings},
    error::TableResult,
    table::Table,
};

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalise one text value: strip accents, keep ASCII letters and whitespace
/// (plus digits when `keep_digits`), trim, lowercase, capitalise.
pub fn normalize_text(value: &str, keep_digits: bool) -> String {
    let kept: String = value
        .nfkd()
        .filter(|c| {
            c.is_ascii_alphabetic() || c.is_whitespace() || (keep_digits && c.is_ascii_digit())
        })
        .collect();
    capitalize(&kept.trim().to_lowercase())
}

impl Table {
    /// Normalise every value of `column` with [`normalize_text`]. Nulls stay null.
    pub fn clean_text(&mut self, column: &str, keep_digits: bool) -> TableResult<()> {
        let values = to_strings(self.column(column)?.as_ref())?;
        let cleaned = values
            .into_iter()
            .map(|v| v.map(|s| normalize_text(&s, keep_digits)))
            .collect();

        self.set_column(column, string_column(cleaned))?;
        info!("column '{column}' text normalised");
        Ok(())
    }
}
