//! Boolean term queries over frames, as filters or ranked searches.
//!
//! A frame (or document) is a candidate when it contains any query term. It
//! matches when it holds every `must` group, at least `at_least_n` of the
//! `at_least` groups and none of the `must_not` groups. A group is one term or
//! several interchangeable spellings of it; any spelling satisfies the group.
//!
//! Scores sum `tf * weight` over every query term found. With idf the weight
//! is `1 + ln(frames / (frames_containing_term + 1))`, counted over the
//! selected fields. Documents sum the scores of their frames, and are matched
//! on the union of their frames' terms.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use roaring::RoaringTreemap;
use tracing::debug;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::error::{Error, Result};
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::metadata::Comparison;
use crate::query::{FieldSelection, Pagination};

pub const DEFAULT_RANK_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TermScoring {
    Tf,
    BinarisedTf,
    #[default]
    TfIdf,
    BinarisedTfIdf,
}

impl TermScoring {
    fn counts_occurrences(self) -> bool {
        matches!(self, TermScoring::Tf | TermScoring::TfIdf)
    }

    fn uses_idf(self) -> bool {
        matches!(self, TermScoring::TfIdf | TermScoring::BinarisedTfIdf)
    }
}

impl FromStr for TermScoring {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf" => Ok(TermScoring::Tf),
            "binarised-tf" => Ok(TermScoring::BinarisedTf),
            "tf-idf" => Ok(TermScoring::TfIdf),
            "binarised-tf-idf" => Ok(TermScoring::BinarisedTfIdf),
            other => Err(Error::invalid_argument(format!("unknown scoring '{}'", other))),
        }
    }
}

impl fmt::Display for TermScoring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TermScoring::Tf => write!(f, "tf"),
            TermScoring::BinarisedTf => write!(f, "binarised-tf"),
            TermScoring::TfIdf => write!(f, "tf-idf"),
            TermScoring::BinarisedTfIdf => write!(f, "binarised-tf-idf"),
        }
    }
}

/// Parameters of [`IndexSnapshot::filter_terms`] and [`IndexSnapshot::rank_terms`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermQuery {
    pub must: Vec<Vec<String>>,
    pub should: Vec<Vec<String>>,
    pub at_least_n: usize,
    pub at_least: Vec<Vec<String>>,
    pub must_not: Vec<Vec<String>>,
    /// Conjunctive conditions on structured fields of the owning document.
    pub metadata: Vec<(String, Comparison)>,
    pub selection: FieldSelection,
    pub scoring: TermScoring,
    pub normalise_length: bool,
    pub return_documents: bool,
}

fn singletons<I, S>(terms: I) -> impl Iterator<Item = Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    terms.into_iter().map(|term| vec![term.into()])
}

fn variants<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    terms.into_iter().map(Into::into).collect()
}

impl TermQuery {
    pub fn new() -> Self {
        TermQuery::default()
    }

    /// Each term is required.
    pub fn must<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must.extend(singletons(terms));
        self
    }

    /// One required group satisfied by any of `spellings`.
    pub fn must_any<I, S>(mut self, spellings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must.push(variants(spellings));
        self
    }

    pub fn should<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.should.extend(singletons(terms));
        self
    }

    pub fn at_least<I, S>(mut self, n: usize, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.at_least_n = n;
        self.at_least.extend(singletons(terms));
        self
    }

    pub fn must_not<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must_not.extend(singletons(terms));
        self
    }

    pub fn with_metadata(mut self, field: &str, comparison: Comparison) -> Self {
        self.metadata.push((field.to_string(), comparison));
        self
    }

    pub fn in_fields(mut self, selection: FieldSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn scored_by(mut self, scoring: TermScoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn normalise_length(mut self, normalise: bool) -> Self {
        self.normalise_length = normalise;
        self
    }

    pub fn documents(mut self) -> Self {
        self.return_documents = true;
        self
    }

    fn has_positive_terms(&self) -> bool {
        !self.must.is_empty() || !self.should.is_empty() || !self.at_least.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Must,
    Should,
    AtLeast,
    MustNot,
}

/// What one frame or document matched so far.
#[derive(Debug, Default)]
struct Tally {
    must: BTreeSet<usize>,
    at_least: BTreeSet<usize>,
    excluded: bool,
    score: f64,
}

impl IndexSnapshot {
    /// Ids of matching frames (or documents) inside the window with their
    /// scores, at most `limit` of them in id order.
    ///
    /// Without terms, the metadata conditions alone select every frame of the
    /// selected fields (or every document) they admit, scored 0.
    pub fn filter_terms(
        &self,
        query: &TermQuery,
        pagination: Pagination,
        limit: Option<usize>,
        analyzers: &AnalyzerRegistry,
    ) -> Result<BTreeMap<u64, f64>> {
        if !query.has_positive_terms() {
            if !query.must_not.is_empty() {
                return Err(Error::invalid_argument(
                    "must_not needs at least one term in must, should or at_least",
                ));
            }
            if query.metadata.is_empty() {
                return Ok(BTreeMap::new());
            }
            let allowed = self.allowed_documents(query, analyzers)?;
            let ids: Vec<u64> = if query.return_documents {
                allowed.iter().collect()
            } else {
                self.selected_frames(&query.selection, None)
                    .into_iter()
                    .filter(|id| self.frames.get(id).is_some_and(|frame| allowed.contains(frame.doc_id.0)))
                    .map(|id| id.0)
                    .collect()
            };
            return Ok(ids
                .into_iter()
                .filter(|id| pagination.contains(*id))
                .take(limit.unwrap_or(usize::MAX))
                .map(|id| (id, 0.0))
                .collect());
        }

        let matched = self.match_terms(query, analyzers)?;
        let results: BTreeMap<u64, f64> = matched
            .into_iter()
            .filter(|(id, _)| pagination.contains(*id))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        debug!(matched = results.len(), documents = query.return_documents, "term filter");
        Ok(results)
    }

    /// Matching frames (or documents) by descending score, ties by ascending
    /// id. Passing the last `(id, score)` of a page as `after` returns the
    /// next page.
    pub fn rank_terms(
        &self,
        query: &TermQuery,
        after: Option<(u64, f64)>,
        limit: usize,
        analyzers: &AnalyzerRegistry,
    ) -> Result<Vec<(u64, f64)>> {
        if !query.has_positive_terms() {
            return Err(Error::invalid_argument(
                "ranking needs at least one term in must, should or at_least; filter on metadata instead",
            ));
        }

        let mut ranked: Vec<(u64, f64)> = self.match_terms(query, analyzers)?.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let ranked: Vec<(u64, f64)> = ranked
            .into_iter()
            .filter(|(id, score)| match after {
                Some((after_id, after_score)) => match score.total_cmp(&after_score) {
                    Ordering::Less => true,
                    Ordering::Equal => *id > after_id,
                    Ordering::Greater => false,
                },
                None => true,
            })
            .take(limit)
            .collect();
        debug!(returned = ranked.len(), documents = query.return_documents, "ranked term search");
        Ok(ranked)
    }

    fn allowed_documents(&self, query: &TermQuery, analyzers: &AnalyzerRegistry) -> Result<RoaringTreemap> {
        let conditions: Vec<(&str, Comparison)> = query
            .metadata
            .iter()
            .map(|(field, comparison)| (field.as_str(), comparison.clone()))
            .collect();
        Ok(self.filter(&conditions, analyzers)?.into_iter().map(|id| id.0).collect())
    }

    fn match_terms(&self, query: &TermQuery, analyzers: &AnalyzerRegistry) -> Result<BTreeMap<u64, f64>> {
        let allowed = if query.metadata.is_empty() {
            None
        } else {
            Some(self.allowed_documents(query, analyzers)?)
        };

        let fields: Vec<_> = self
            .postings
            .fields
            .iter()
            .filter(|(field, _)| query.selection.matches(field))
            .map(|(_, postings)| postings)
            .collect();
        let frame_total = fields.iter().map(|postings| postings.frame_ids.len()).sum::<usize>() as f64;

        let clauses = [
            (Clause::Must, &query.must),
            (Clause::Should, &query.should),
            (Clause::AtLeast, &query.at_least),
            (Clause::MustNot, &query.must_not),
        ];

        let mut tallies: BTreeMap<u64, Tally> = BTreeMap::new();
        for (clause, groups) in clauses {
            for (group, spellings) in groups.iter().enumerate() {
                for term in spellings {
                    let lists: Vec<_> = fields.iter().filter_map(|postings| postings.terms.get(term)).collect();
                    let containing: u64 = lists.iter().map(|list| list.frame_freq()).sum();
                    if containing == 0 {
                        continue;
                    }
                    let weight = if query.scoring.uses_idf() {
                        1.0 + (frame_total / (containing as f64 + 1.0)).ln()
                    } else {
                        1.0
                    };

                    for list in lists {
                        for (frame_id, positions) in &list.frames {
                            let Some(frame) = self.frames.get(frame_id) else {
                                continue;
                            };
                            if allowed.as_ref().is_some_and(|allowed| !allowed.contains(frame.doc_id.0)) {
                                continue;
                            }

                            let tf = if query.scoring.counts_occurrences() { positions.len() as f64 } else { 1.0 };
                            let mut score = tf * weight;
                            if query.normalise_length {
                                score /= frame.len().max(1) as f64;
                            }

                            let key = if query.return_documents { frame.doc_id.0 } else { frame_id.0 };
                            let tally = tallies.entry(key).or_default();
                            match clause {
                                Clause::Must => {
                                    tally.must.insert(group);
                                }
                                Clause::AtLeast => {
                                    tally.at_least.insert(group);
                                }
                                Clause::MustNot => tally.excluded = true,
                                Clause::Should => {}
                            }
                            tally.score += score;
                        }
                    }
                }
            }
        }

        Ok(tallies
            .into_iter()
            .filter(|(_, tally)| {
                !tally.excluded
                    && tally.must.len() == query.must.len()
                    && tally.at_least.len() >= query.at_least_n
            })
            .map(|(id, tally)| (id, tally.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::{AttributeValue, FieldValue};
    use crate::query::test_support::{build, snapshot_of};

    fn ids(results: &BTreeMap<u64, f64>) -> Vec<u64> {
        results.keys().copied().collect()
    }

    fn filter(snapshot: &IndexSnapshot, query: &TermQuery) -> BTreeMap<u64, f64> {
        snapshot
            .filter_terms(query, Pagination::default(), None, &AnalyzerRegistry::new())
            .unwrap()
    }

    #[test]
    fn must_not_removes_candidates() {
        let snapshot = snapshot_of(&[&["tea party", "tea cake"], &["party cake"]]);

        let query = TermQuery::new().must(["tea"]).must_not(["cake"]);
        assert_eq!(ids(&filter(&snapshot, &query)), vec![1]);

        let query = TermQuery::new().should(["tea", "party"]).must_not(["cake"]);
        assert_eq!(ids(&filter(&snapshot, &query)), vec![1]);

        let query = TermQuery::new().should(["tea", "party"]);
        assert_eq!(ids(&filter(&snapshot, &query)), vec![1, 2, 3]);

        let err = snapshot
            .filter_terms(&TermQuery::new().must_not(["cake"]), Pagination::default(), None, &AnalyzerRegistry::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn at_least_counts_distinct_groups() {
        let snapshot = snapshot_of(&[&["a b c", "a b", "a", "b c d", "a a a"]]);

        let two = TermQuery::new().at_least(2, ["a", "b", "c"]);
        assert_eq!(ids(&filter(&snapshot, &two)), vec![1, 2, 4]);

        let three = TermQuery::new().at_least(3, ["a", "b", "c"]);
        assert_eq!(ids(&filter(&snapshot, &three)), vec![1]);

        let with_must = TermQuery::new().must(["d"]).at_least(2, ["a", "b", "c"]);
        assert_eq!(ids(&filter(&snapshot, &with_must)), vec![4]);

        let impossible = TermQuery::new().at_least(4, ["a", "b", "c"]);
        assert!(filter(&snapshot, &impossible).is_empty());
    }

    #[test]
    fn documents_match_across_their_frames() {
        let snapshot = snapshot_of(&[&["tea party", "cake"], &["tea cake", "poison"], &["cake"]]);

        let both = TermQuery::new().must(["tea", "cake"]);
        assert_eq!(ids(&filter(&snapshot, &both)), vec![3]);
        assert_eq!(ids(&filter(&snapshot, &both.clone().documents())), vec![1, 2]);

        let safe = TermQuery::new().must(["tea"]).must_not(["poison"]);
        assert_eq!(ids(&filter(&snapshot, &safe)), vec![1, 3]);
        assert_eq!(ids(&filter(&snapshot, &safe.documents())), vec![1]);
    }

    #[test]
    fn any_spelling_satisfies_a_group() {
        let snapshot = snapshot_of(&[&["Apple pie", "apple PIE", "apple tart"]]);

        let query = TermQuery::new().must_any(["Apple", "apple"]).must_any(["pie", "PIE"]);
        assert_eq!(ids(&filter(&snapshot, &query)), vec![1, 2]);
    }

    #[test]
    fn scoring_variants() {
        let snapshot = snapshot_of(&[&["tea tea cake", "cake", "milk", "milk"]]);
        let score = |scoring: TermScoring, normalise: bool| {
            let query = TermQuery::new().should(["tea"]).scored_by(scoring).normalise_length(normalise);
            filter(&snapshot, &query)[&1]
        };

        assert_eq!(score(TermScoring::Tf, false), 2.0);
        assert_eq!(score(TermScoring::BinarisedTf, false), 1.0);
        assert!((score(TermScoring::Tf, true) - 2.0 / 3.0).abs() < 1e-9);
        // Four frames, one holding "tea".
        let idf = 1.0 + 2.0f64.ln();
        assert!((score(TermScoring::TfIdf, false) - 2.0 * idf).abs() < 1e-9);
        assert!((score(TermScoring::BinarisedTfIdf, false) - idf).abs() < 1e-9);
        assert!(score(TermScoring::Tf, false) >= score(TermScoring::BinarisedTf, false));

        assert_eq!("binarised-tf-idf".parse::<TermScoring>().unwrap(), TermScoring::BinarisedTfIdf);
        assert_eq!(TermScoring::default().to_string(), "tf-idf");
        assert_eq!("bm25".parse::<TermScoring>().unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn filter_pages_by_id() {
        let snapshot = snapshot_of(&[&["tea", "tea", "cake", "tea", "tea"]]);
        let query = TermQuery::new().must(["tea"]);
        let registry = AnalyzerRegistry::new();

        let page = snapshot.filter_terms(&query, Pagination::default(), Some(2), &registry).unwrap();
        assert_eq!(ids(&page), vec![1, 2]);
        let next = snapshot.filter_terms(&query, Pagination::new(Some(2), None), Some(2), &registry).unwrap();
        assert_eq!(ids(&next), vec![4, 5]);
        let capped = snapshot.filter_terms(&query, Pagination::new(None, Some(4)), None, &registry).unwrap();
        assert_eq!(ids(&capped), vec![1, 2, 4]);
    }

    #[test]
    fn ranking_orders_by_score_and_resumes() {
        let snapshot = snapshot_of(&[&["tea tea tea", "tea", "tea tea", "tea", "cake"]]);
        let query = TermQuery::new().should(["tea"]).scored_by(TermScoring::Tf);
        let registry = AnalyzerRegistry::new();

        let all = snapshot.rank_terms(&query, None, DEFAULT_RANK_LIMIT, &registry).unwrap();
        assert_eq!(all, vec![(1, 3.0), (3, 2.0), (2, 1.0), (4, 1.0)]);

        let first = snapshot.rank_terms(&query, None, 3, &registry).unwrap();
        let rest = snapshot.rank_terms(&query, first.last().copied(), 3, &registry).unwrap();
        assert_eq!(rest, vec![(4, 1.0)]);

        let metadata_only = TermQuery::new().with_metadata("region", Comparison::Eq(FieldValue::from("Victoria")));
        let err = snapshot.rank_terms(&metadata_only, None, 10, &registry).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn metadata_restricts_owning_documents() {
        let frames: &[(&str, &str)] = &[("body", "tea party"), ("title", "tea")];
        let other: &[(&str, &str)] = &[("body", "tea")];
        let victoria: &[(&str, AttributeValue)] = &[("region", AttributeValue::from("Victoria"))];
        let tasmania: &[(&str, AttributeValue)] = &[("region", AttributeValue::from("Tasmania"))];
        let snapshot = build(&[(frames, victoria), (other, tasmania)]);
        let in_victoria = Comparison::Eq(FieldValue::from("Victoria"));

        let query = TermQuery::new().should(["tea"]).with_metadata("region", in_victoria.clone());
        assert_eq!(ids(&filter(&snapshot, &query)), vec![1, 2]);

        let body_only = query.in_fields(FieldSelection::include(["body"]));
        assert_eq!(ids(&filter(&snapshot, &body_only)), vec![1]);

        let metadata_only = TermQuery::new().with_metadata("region", in_victoria);
        let scores = filter(&snapshot, &metadata_only);
        assert_eq!(ids(&scores), vec![1, 2]);
        assert!(scores.values().all(|score| *score == 0.0));
        assert_eq!(ids(&filter(&snapshot, &metadata_only.documents())), vec![1]);
    }
}
