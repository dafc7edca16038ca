use std::collections::{BTreeMap, BTreeSet};
use framedex::{
    AttributeValue, Comparison, Config, DocId, ErrorKind, FieldSelection, FieldType, FieldValue, FilterNgramOptions,
    FrameId, IndexConfig, IndexReader, IndexWriter, NgramOptions, Pagination, Schema, Scoring, TermQuery, TermScoring,
    Weighting,
};
use tempfile::TempDir;

const CHAPTER: [&str; 4] = [
    "The Mad Hatter poured tea for the March Hare while the Dormouse slept between them.",
    "Alice thought the Mad Hatter was rude, and the March Hare agreed with nothing she said.",
    "The Queen of Hearts shouted at the White Rabbit, and the White Rabbit trembled.",
    "alice followed the White Rabbit while the Mad Hatter poured tea for the hare.",
];

fn schema() -> Schema {
    Schema::new()
        .field("text", FieldType::text())
        .field("title", FieldType::text())
        .field("score", FieldType::numeric())
        .field("region", FieldType::categorical_text())
        .field("ref", FieldType::id())
}

/// Index of the chapter, one document per line with structured metadata.
fn index() -> (TempDir, IndexReader) {
    let dir = TempDir::new().unwrap();
    let config = Config { sync_on_commit: false, ..Config::default() };
    let mut writer = IndexWriter::with_config(dir.path(), Some(IndexConfig::new(schema())), config).unwrap();

    let regions = ["Victoria", "Tasmania", "Victoria", "Queensland"];
    writer
        .transaction(None, |w| {
            for (i, line) in CHAPTER.iter().enumerate() {
                w.add_document(
                    Some(4),
                    vec![
                        ("text", FieldValue::from(*line)),
                        ("title", FieldValue::from(format!("Chapter {}", i + 1))),
                        ("score", FieldValue::Integer(i as i64 * 10)),
                        ("region", FieldValue::from(regions[i])),
                        ("ref", FieldValue::Integer(100 + i as i64)),
                    ],
                )?;
            }
            Ok(())
        })
        .unwrap();

    let reader = IndexReader::open(dir.path()).unwrap();
    (dir, reader)
}

#[test]
fn frequency_vectors_sum_to_term_frequencies() {
    let (_dir, reader) = index();
    let selection = FieldSelection::include(["text"]);
    let vectors = reader.get_term_frequency_vectors(&selection, None, Weighting::Tf).unwrap();

    let mut summed: BTreeMap<String, u64> = BTreeMap::new();
    for vector in vectors.values() {
        for (term, count) in vector {
            *summed.entry(term.clone()).or_insert(0) += count;
        }
    }
    assert_eq!(summed, reader.get_frequencies("text").unwrap());
    assert_eq!(summed.len(), reader.get_vocab_size("text").unwrap());
    assert_eq!(reader.get_term_frequency("Rabbit", "text").unwrap(), 3);

    let positions = reader.get_term_positions("Hatter", "text").unwrap();
    assert_eq!(reader.get_document_count_from_frame_ids(&positions.keys().copied().collect::<Vec<_>>()).unwrap(), 3);
    assert_eq!(reader.get_positions_index("text").unwrap()["Hatter"], positions);
}

#[test]
fn frames_follow_the_requested_size() {
    let (_dir, reader) = index();
    let frames = reader.get_frames(&FieldSelection::include(["text"]), None).unwrap();
    assert!(frames.iter().all(|f| f.len() <= 4 && f.len() > 0));
    assert!(frames.iter().all(|f| f.text.is_some()));
    assert_eq!(frames.len(), reader.get_frame_ids("text").unwrap().len());

    let title_frames = reader.get_frame_count(&["title"]).unwrap();
    assert_eq!(title_frames, 4);
    let everything = reader.get_frame_count::<&str>(&[]).unwrap();
    assert_eq!(everything, frames.len() + title_frames);
    assert_eq!(reader.get_frames(&FieldSelection::exclude(["text"]), None).unwrap().len(), title_frames);

    let first = frames[0].id;
    let only = reader.get_frames(&FieldSelection::all(), Some(&[first])).unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(reader.get_frame(first).unwrap(), only[0]);
    assert_eq!(reader.get_frame(FrameId(10_000)).unwrap_err().kind, ErrorKind::DocumentNotFound);
}

#[test]
fn skipgram_windows() {
    let (_dir, reader) = index();
    let all = FieldSelection::include(["text"]);

    let adjacent = reader.get_skipgrams(1, 1, &all, None).unwrap();
    let mut expected = Vec::new();
    for frame in reader.get_frames(&all, None).unwrap() {
        let terms = frame.ordered_terms();
        for pair in terms.windows(2) {
            expected.push((frame.id, pair[0].to_string(), pair[1].to_string()));
        }
    }
    let found: Vec<_> = adjacent.iter().map(|g| (g.frame_id, g.left.clone(), g.right.clone())).collect();
    assert_eq!(found, expected);

    let mut previous = adjacent.len();
    for end in 2..6 {
        let wider = reader.get_skipgrams(1, end, &all, None).unwrap();
        assert!(wider.len() >= previous);
        assert!(adjacent.iter().all(|g| wider.contains(g)));
        previous = wider.len();
    }

    assert_eq!(reader.get_skipgrams(2, 1, &all, None).unwrap_err().kind, ErrorKind::InvalidArgument);
}

#[test]
fn ngram_detection_and_filtering() {
    let (_dir, reader) = index();
    let loose = NgramOptions { min_count: 2, threshold: 1.0, ..Default::default() };
    let found = reader.detect_significant_ngrams(&loose).unwrap();
    assert!(found.contains(&vec!["White".to_string(), "Rabbit".to_string()]));

    let strict = NgramOptions { threshold: 1000.0, ..loose.clone() };
    let fewer = reader.detect_significant_ngrams(&strict).unwrap();
    assert!(fewer.iter().all(|gram| found.contains(gram)));

    let ngrams = vec![
        vec!["Mad".to_string(), "Hatter".to_string()],
        vec!["White".to_string(), "Rabbit".to_string()],
    ];
    let tf = reader.filter_ngrams(&ngrams, &FilterNgramOptions::default()).unwrap();
    let binarised = reader
        .filter_ngrams(&ngrams, &FilterNgramOptions { scoring: "binarised-tf".parse().unwrap(), ..Default::default() })
        .unwrap();
    assert_eq!(tf.keys().collect::<Vec<_>>(), binarised.keys().collect::<Vec<_>>());
    for (id, scores) in &tf {
        assert!(scores.iter().zip(&binarised[id]).all(|(t, b)| t >= b));
    }

    let normalised = reader
        .filter_ngrams(&ngrams, &FilterNgramOptions { normalise_length: true, ..Default::default() })
        .unwrap();
    for (id, scores) in &normalised {
        assert!(scores.iter().zip(&tf[id]).all(|(n, t)| n <= t));
    }

    let documents = reader
        .filter_ngrams(
            &ngrams,
            &FilterNgramOptions { return_documents: true, scoring: Scoring::BinarisedTf, ..Default::default() },
        )
        .unwrap();
    // Documents 1, 2 and 4 mention the Hatter; 3 and 4 the Rabbit.
    assert_eq!(documents.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(documents[&4], vec![5.0, 5.0]);

    assert_eq!("okapi".parse::<Scoring>().unwrap_err().kind, ErrorKind::InvalidArgument);
}

#[test]
fn frame_attributes_with_pagination() {
    let dir = TempDir::new().unwrap();
    let mut writer = IndexWriter::new(dir.path(), Some(IndexConfig::new(schema()))).unwrap();
    writer
        .transaction(None, |w| {
            w.add_document(Some(2), [("text", "one two three four")])?;
            w.add_document(Some(2), [("text", "five six")])
        })
        .unwrap();

    let tag = |value: &str| BTreeMap::from([("tone".to_string(), AttributeValue::from(value))]);
    writer
        .transaction(None, |w| {
            w.append_frame_attributes(BTreeMap::from([(FrameId(1), tag("calm")), (FrameId(2), tag("calm"))]))?;
            w.append_frame_attributes(BTreeMap::from([(FrameId(3), tag("loud"))]))?;
            w.append_frame_attributes(BTreeMap::from([(FrameId(2), tag("loud"))]))
        })
        .unwrap();

    writer.begin(None).unwrap();
    let err = writer
        .append_frame_attributes(BTreeMap::from([(FrameId(1), tag("x")), (FrameId(99), tag("x"))]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DocumentNotFound);
    writer.rollback().unwrap();

    let reader = IndexReader::open(dir.path()).unwrap();
    let all = FieldSelection::all();
    let frames = reader.get_attributes(&all, false, Pagination::default()).unwrap();
    let calm = AttributeValue::from("calm");
    let loud = AttributeValue::from("loud");
    assert_eq!(frames["tone"][&calm], BTreeSet::from([1]));
    assert_eq!(frames["tone"][&loud], BTreeSet::from([2, 3]));

    let paged = reader.get_attributes(&all, false, Pagination::new(Some(1), Some(2))).unwrap();
    assert!(!paged["tone"].contains_key(&calm));
    assert_eq!(paged["tone"][&loud], BTreeSet::from([2]));

    let documents = reader.get_attributes(&all, true, Pagination::default()).unwrap();
    assert_eq!(documents["tone"][&loud], BTreeSet::from([1, 2]));

    let filtered = reader
        .filter_attributes(&[("tone", Comparison::Eq("loud".into()))], true, &all, Pagination::default())
        .unwrap();
    assert_eq!(filtered, BTreeSet::from([1, 2]));
    let err = reader
        .filter_attributes(&[("tone", Comparison::In(vec!["loud".into()]))], false, &all, Pagination::default())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedOperator);
}

#[test]
fn metadata_filters() {
    let (_dir, reader) = index();
    let ids = |conditions: &[(&str, Comparison)]| -> Vec<u64> {
        reader.filter(conditions).unwrap().into_iter().map(|id| id.0).collect()
    };

    assert_eq!(ids(&[("region", Comparison::Eq("Victoria".into()))]), vec![1, 3]);
    assert_eq!(ids(&[("score", Comparison::Ge(FieldValue::Integer(10)))]), vec![2, 3, 4]);
    assert_eq!(ids(&[("score", Comparison::Between(5.0.into(), 25.0.into()))]), vec![2, 3]);
    assert_eq!(ids(&[("score", Comparison::NotBetween(5.0.into(), 25.0.into()))]), vec![1, 4]);
    assert_eq!(ids(&[("ref", Comparison::In(vec![FieldValue::Integer(101), "103".into()]))]), vec![2, 4]);
    assert_eq!(
        ids(&[("region", Comparison::Eq("Victoria".into())), ("score", Comparison::Gt(0.0.into()))]),
        vec![3]
    );
    assert_eq!(ids(&[]).len(), 4);

    let kind = |field: &str, c: Comparison| reader.filter(&[(field, c)]).unwrap_err().kind;
    assert_eq!(kind("nope", Comparison::Eq("x".into())), ErrorKind::UnknownField);
    assert_eq!(kind("text", Comparison::Eq("x".into())), ErrorKind::NonIndexedField);
    assert_eq!(kind("region", Comparison::Le("x".into())), ErrorKind::UnsupportedOperator);

    let metadata = reader.get_metadata(&FieldSelection::all(), true, Pagination::default()).unwrap();
    assert_eq!(metadata["region"][&AttributeValue::from("Victoria")], BTreeSet::from([1, 3]));
    let frames = reader.get_metadata(&FieldSelection::include(["title"]), false, Pagination::default()).unwrap();
    assert_eq!(frames["ref"][&AttributeValue::from("100")].len(), 1);

    let document = reader.get_document(DocId(2)).unwrap();
    assert_eq!(document.get_field("region"), Some(&FieldValue::from("Tasmania")));
}

#[test]
fn case_folding_over_fields() {
    let (_dir, reader) = index();
    let pairs = reader.get_case_fold_terms(&FieldSelection::include(["text"]), 0.7).unwrap();
    // "hare" occurs in half as many frames as "Hare"; "alice" and "Alice" are even.
    assert_eq!(pairs, vec![("hare".to_string(), "Hare".to_string())]);
    assert!(reader.get_case_fold_terms(&FieldSelection::include(["title"]), 0.7).unwrap().is_empty());
    assert_eq!(
        reader.get_case_fold_terms(&FieldSelection::all(), 1.5).unwrap_err().kind,
        ErrorKind::InvalidArgument
    );
}

#[test]
fn paging_through_frames() {
    let (_dir, reader) = index();
    let all = FieldSelection::all();
    let first_page = reader.filter_range(&all, Pagination::default(), 3, false).unwrap();
    assert_eq!(first_page, vec![1, 2, 3]);
    let next = reader.filter_range(&all, Pagination::new(Some(3), None), 3, false).unwrap();
    assert_eq!(next[0], 4);
    assert_eq!(reader.filter_range(&all, Pagination::default(), 10, true).unwrap(), vec![1, 2, 3, 4]);

    let nonempty = reader.filter_nonempty(&all, Pagination::default()).unwrap();
    assert_eq!(nonempty.len(), reader.get_frame_count::<&str>(&[]).unwrap());
}

#[test]
fn boolean_term_queries() {
    let (_dir, reader) = index();
    let text = FieldSelection::include(["text"]);
    let docs = |query: TermQuery| -> Vec<u64> {
        let results = reader.filter_terms(&query.in_fields(text.clone()).documents(), Pagination::default(), None).unwrap();
        results.into_keys().collect()
    };

    assert_eq!(docs(TermQuery::new().must(["Hatter"])), vec![1, 2, 4]);
    assert_eq!(docs(TermQuery::new().must(["Hatter"]).must_not(["alice"])), vec![1, 2]);
    assert_eq!(docs(TermQuery::new().must_any(["alice", "Alice"])), vec![2, 4]);
    assert_eq!(docs(TermQuery::new().at_least(2, ["Hatter", "Rabbit", "Hare"])), vec![1, 2, 4]);
    assert!(docs(TermQuery::new().at_least(3, ["Hatter", "Rabbit", "Hare"])).is_empty());
    assert_eq!(
        docs(TermQuery::new().should(["Hatter"]).with_metadata("region", Comparison::Eq(FieldValue::from("Victoria")))),
        vec![1]
    );

    let frames = reader.filter_terms(&TermQuery::new().must(["Hatter"]), Pagination::default(), None).unwrap();
    assert_eq!(frames.len(), reader.get_term_positions("Hatter", "text").unwrap().len());
    for id in frames.keys() {
        let frame = reader.get_frame(FrameId(*id)).unwrap();
        assert!(frame.terms.iter().any(|(term, _)| term == "Hatter"));
    }
}

#[test]
fn ranked_term_search_pages_by_score() {
    let (_dir, reader) = index();
    let query = TermQuery::new().should(["Rabbit"]).scored_by(TermScoring::Tf).documents();

    let ranked = reader.filter_and_rank(&query, None, 10).unwrap();
    assert_eq!(ranked, vec![(3, 2.0), (4, 1.0)]);
    let rest = reader.filter_and_rank(&query, Some(ranked[0]), 10).unwrap();
    assert_eq!(rest, vec![(4, 1.0)]);

    let idf = reader.filter_and_rank(&query.clone().scored_by(TermScoring::TfIdf), None, 1).unwrap();
    assert_eq!(idf[0].0, 3);
    assert!(idf[0].1 > 0.0);
}
