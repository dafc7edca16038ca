use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use rayon::prelude::*;
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::core::types::FrameId;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::{FieldSelection, Pagination};

/// Parameters of [`IndexSnapshot::significant_ngrams`].
#[derive(Debug, Clone, PartialEq)]
pub struct NgramOptions {
    pub min_count: u64,
    pub threshold: f64,
    /// When set, normalised PMI replaces the default score.
    pub npmi_threshold: Option<f64>,
    pub selection: FieldSelection,
    pub max_order: usize,
}

impl Default for NgramOptions {
    fn default() -> Self {
        NgramOptions {
            min_count: 5,
            threshold: 40.0,
            npmi_threshold: None,
            selection: FieldSelection::all(),
            max_order: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scoring {
    #[default]
    Tf,
    BinarisedTf,
}

impl FromStr for Scoring {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf" => Ok(Scoring::Tf),
            "binarised-tf" => Ok(Scoring::BinarisedTf),
            other => Err(Error::invalid_argument(format!("unknown scoring '{}'", other))),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scoring::Tf => write!(f, "tf"),
            Scoring::BinarisedTf => write!(f, "binarised-tf"),
        }
    }
}

/// Parameters of [`IndexSnapshot::filter_ngrams`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNgramOptions {
    pub scoring: Scoring,
    pub normalise_length: bool,
    pub idf_weight: f64,
    pub return_documents: bool,
    pub selection: FieldSelection,
    pub pagination: Pagination,
}

impl Default for FilterNgramOptions {
    fn default() -> Self {
        FilterNgramOptions {
            scoring: Scoring::Tf,
            normalise_length: false,
            idf_weight: 5.0,
            return_documents: false,
            selection: FieldSelection::all(),
            pagination: Pagination::default(),
        }
    }
}

type Counts<'a> = HashMap<Vec<&'a str>, u64>;

/// Number of frames containing each accepted window of `order` terms.
fn count_windows<'a, F>(frames: &[Vec<&'a str>], order: usize, accept: F) -> Counts<'a>
where
    F: Fn(&[&'a str]) -> bool + Sync,
{
    frames
        .par_iter()
        .fold(Counts::new, |mut counts, terms| {
            let mut seen: HashSet<&[&str]> = HashSet::new();
            for window in terms.windows(order) {
                if accept(window) && seen.insert(window) {
                    *counts.entry(window.to_vec()).or_insert(0) += 1;
                }
            }
            counts
        })
        .reduce(Counts::new, |mut left, right| {
            for (gram, count) in right {
                *left.entry(gram).or_insert(0) += count;
            }
            left
        })
}

fn npmi(count: f64, fa: f64, fb: f64, frames: f64) -> f64 {
    if count >= frames {
        return 1.0;
    }
    (count * frames / (fa * fb)).ln() / -(count / frames).ln()
}

impl IndexSnapshot {
    /// Frequently co-occurring term sequences, up to `max_order` terms long,
    /// ordered by length then lexically. Counts are numbers of frames.
    pub fn significant_ngrams(&self, options: &NgramOptions) -> Result<Vec<Vec<String>>> {
        if options.max_order < 2 {
            return Err(Error::invalid_argument(format!(
                "max_order must be at least 2, got {}",
                options.max_order
            )));
        }

        let frames: Vec<Vec<&str>> = self
            .frames_matching(&options.selection, None)
            .into_iter()
            .map(|frame| frame.ordered_terms())
            .collect();
        let total = frames.len() as f64;
        let vocab = self.aggregate_frequencies(&options.selection).len() as f64;
        let unigrams = count_windows(&frames, 1, |_| true);

        let significant = |count: u64, prefix: u64, suffix: u64| -> bool {
            if count < options.min_count {
                return false;
            }
            let (count, fa, fb) = (count as f64, prefix as f64, suffix as f64);
            match options.npmi_threshold {
                Some(limit) => npmi(count, fa, fb, total) > limit,
                None => count * vocab / (fa * fb) > options.threshold,
            }
        };

        let mut detected: Vec<Vec<String>> = Vec::new();
        let mut previous = unigrams.clone();
        for order in 2..=options.max_order {
            let candidates = count_windows(&frames, order, |window| previous.contains_key(&window[..order - 1]));

            let mut accepted: Counts = Counts::new();
            for (gram, count) in candidates {
                let prefix = previous.get(&gram[..order - 1]).copied().unwrap_or(0);
                let suffix = unigrams.get(&gram[order - 1..]).copied().unwrap_or(0);
                if significant(count, prefix, suffix) {
                    accepted.insert(gram, count);
                }
            }

            debug!(order, detected = accepted.len(), "significant ngrams");
            let mut level: Vec<Vec<String>> = accepted
                .keys()
                .map(|gram| gram.iter().map(|t| t.to_string()).collect())
                .collect();
            level.sort();
            detected.extend(level);

            if accepted.is_empty() {
                break;
            }
            previous = accepted;
        }

        Ok(detected)
    }

    /// Positions in `frame_id` at which `ngram` starts.
    fn ngram_occurrences(&self, field: &str, frame_id: FrameId, ngram: &[String]) -> usize {
        let Some(head) = self.postings.term(field, &ngram[0]).and_then(|list| list.frames.get(&frame_id)) else {
            return 0;
        };
        let mut tails = Vec::with_capacity(ngram.len() - 1);
        for term in &ngram[1..] {
            match self.postings.term(field, term).and_then(|list| list.frames.get(&frame_id)) {
                Some(positions) => tails.push(positions),
                None => return 0,
            }
        }

        head.iter()
            .filter(|&&start| {
                tails
                    .iter()
                    .enumerate()
                    .all(|(i, positions)| positions.binary_search(&(start + i as u32 + 1)).is_ok())
            })
            .count()
    }

    /// Scores frames (or documents) containing each ngram at consecutive
    /// positions. Every id maps to one score per ngram it matched, in input order.
    pub fn filter_ngrams(&self, ngrams: &[Vec<String>], options: &FilterNgramOptions) -> Result<BTreeMap<u64, Vec<f64>>> {
        if let Some(short) = ngrams.iter().find(|ngram| ngram.len() < 2) {
            return Err(Error::invalid_argument(format!("ngram {:?} needs at least two terms", short)));
        }

        let mut results: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
        for ngram in ngrams {
            let mut frame_scores: Vec<(FrameId, f64)> = Vec::new();
            for (field, postings) in &self.postings.fields {
                if !options.selection.matches(field) {
                    continue;
                }
                let Some(head) = postings.terms.get(&ngram[0]) else {
                    continue;
                };
                for &frame_id in head.frames.keys() {
                    let occurrences = self.ngram_occurrences(field, frame_id, ngram);
                    if occurrences == 0 {
                        continue;
                    }
                    let mut score = match options.scoring {
                        Scoring::Tf => occurrences as f64,
                        Scoring::BinarisedTf => 1.0,
                    };
                    if options.normalise_length {
                        let length = self.frames.get(&frame_id).map_or(1, |frame| frame.len().max(1));
                        score /= length as f64;
                    }
                    frame_scores.push((frame_id, score));
                }
            }

            if !options.return_documents {
                for (frame_id, score) in frame_scores {
                    if options.pagination.contains(frame_id.0) {
                        results.entry(frame_id.0).or_default().push(score * options.idf_weight);
                    }
                }
                continue;
            }

            let mut documents: BTreeMap<u64, f64> = BTreeMap::new();
            for (frame_id, score) in frame_scores {
                let Some(frame) = self.frames.get(&frame_id) else {
                    continue;
                };
                let entry = documents.entry(frame.doc_id.0).or_insert(0.0);
                *entry = match options.scoring {
                    Scoring::Tf => *entry + score,
                    Scoring::BinarisedTf => entry.max(score),
                };
            }
            for (doc_id, score) in documents {
                if options.pagination.contains(doc_id) {
                    results.entry(doc_id).or_default().push(score * options.idf_weight);
                }
            }
        }

        Ok(results)
    }
}
