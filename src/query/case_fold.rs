use std::collections::BTreeMap;
use crate::core::error::{Error, Result};
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::FieldSelection;

pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.7;

/// At least one cased character and no upper-case ones.
fn is_lowercase_term(term: &str) -> bool {
    let mut cased = false;
    for c in term.chars() {
        if c.is_uppercase() {
            return false;
        }
        cased |= c.is_lowercase();
    }
    cased
}

/// Upper-cases every cased character that follows an uncased one and
/// lower-cases the rest, so "tea-party" becomes "Tea-Party".
fn title_case(term: &str) -> String {
    let mut titled = String::with_capacity(term.len());
    let mut after_cased = false;
    for c in term.chars() {
        if after_cased {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        after_cased = c.is_lowercase() || c.is_uppercase();
    }
    titled
}

impl IndexSnapshot {
    /// Number of frames containing each term, summed over the selected fields.
    pub(crate) fn aggregate_frequencies(&self, selection: &FieldSelection) -> BTreeMap<&str, u64> {
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
        for (field, postings) in &self.postings.fields {
            if !selection.matches(field) {
                continue;
            }
            for (term, list) in &postings.terms {
                *totals.entry(term.as_str()).or_insert(0) += list.frame_freq();
            }
        }
        totals
    }

    /// Pairs `(variant, normalised)` of lower and title case spellings of one
    /// word, where the normalised form is clearly the more frequent one.
    pub fn case_fold_terms(&self, selection: &FieldSelection, merge_threshold: f64) -> Result<Vec<(String, String)>> {
        if !(merge_threshold > 0.0 && merge_threshold <= 1.0) {
            return Err(Error::invalid_argument(format!(
                "merge threshold must be in (0, 1], got {}",
                merge_threshold
            )));
        }

        let totals = self.aggregate_frequencies(selection);
        let mut pairs = Vec::new();
        for (&lower, &lower_freq) in &totals {
            if !is_lowercase_term(lower) {
                continue;
            }
            let title = title_case(lower);
            let Some(&title_freq) = totals.get(title.as_str()) else {
                continue;
            };

            if (lower_freq as f64) / (title_freq as f64) < merge_threshold {
                pairs.push((lower.to_string(), title));
            } else if (title_freq as f64) / (lower_freq as f64) < merge_threshold {
                pairs.push((title, lower.to_string()));
            }
        }
        Ok(pairs)
    }
}
