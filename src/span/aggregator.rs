// ============================================================
// Layer 5b — Answer Aggregator
// ============================================================
// Merges the per-window candidates of each query into one ranked
// answer list. Per query, in ascending query order:
//
//   1. collect   every candidate of every window of the query,
//                resolving byte spans into document text
//   2. sort      probability descending (stable, input order on ties)
//   3. top_k     keep the first k
//   4. no-answer (calibrated sigmoid only) add one candidate with
//                p = Π (1 − pᵢ) over the kept list, placed after
//                every candidate whose probability is ≥ p
//   5. top_p     keep the shortest prefix whose mass reaches top_p
//
// The synthesized no-answer is computed after the top_k cut, so
// its probability depends on top_k.

use std::cmp::Ordering;

use serde_json::Map;

use crate::data::splitter::FlatDocument;
use crate::data::window::{query_ranges, Window};
use crate::domain::answer::ExtractedAnswer;
use crate::span::extractor::SpanCandidate;

/// Resolved selection policy for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    pub top_k:                Option<usize>,
    pub top_p:                Option<f64>,
    pub synthesize_no_answer: bool,
}

/// Rank one query's answers: sort, cut to top_k, add the synthesized
/// no-answer if requested, cut to top_p.
pub fn rank(
    mut answers: Vec<ExtractedAnswer>,
    params:      &SelectionParams,
    question:    &str,
) -> Vec<ExtractedAnswer> {
    // sort_by is stable, so equal probabilities keep input order
    answers.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });

    if let Some(k) = params.top_k {
        answers.truncate(k);
    }

    if params.synthesize_no_answer {
        let probability: f64 = answers.iter().map(|a| 1.0 - a.probability).product();
        let at = answers
            .iter()
            .position(|a| a.probability < probability)
            .unwrap_or(answers.len());
        answers.insert(at, ExtractedAnswer::no_answer(question, probability));
    }

    if let Some(top_p) = params.top_p {
        let mut mass = 0.0;
        let cut = answers.iter().position(|a| {
            mass += a.probability;
            mass >= top_p
        });
        if let Some(last) = cut {
            answers.truncate(last + 1);
        }
    }

    answers
}

/// One ranked answer list per query, in query order.
///
/// `windows` and `candidates` are parallel; `flat` is the flattened
/// document list the windows' `document_id`s index into.
pub fn aggregate(
    queries:    &[String],
    flat:       &[FlatDocument<'_>],
    windows:    &[Window],
    candidates: &[Vec<SpanCandidate>],
    params:     &SelectionParams,
) -> Vec<Vec<ExtractedAnswer>> {
    let mut per_query: Vec<Vec<ExtractedAnswer>> = vec![Vec::new(); queries.len()];

    for (query_id, range) in query_ranges(windows) {
        let Some(question) = queries.get(query_id) else {
            continue;
        };
        let collected: Vec<ExtractedAnswer> = range
            .flat_map(|index| {
                let document_id = windows[index].origin.document_id;
                candidates[index]
                    .iter()
                    .map(move |c| to_answer(c, question, flat.get(document_id)))
            })
            .collect();

        tracing::debug!("Query {query_id}: ranking {} candidates", collected.len());
        per_query[query_id] = rank(collected, params, question);
    }

    per_query
}

fn to_answer(
    candidate: &SpanCandidate,
    question:  &str,
    flat_doc:  Option<&FlatDocument<'_>>,
) -> ExtractedAnswer {
    let document = flat_doc.map(|f| f.document.clone());

    let span = match (candidate.start, candidate.end, &document) {
        (Some(start), Some(end), Some(doc)) => doc
            .span(start, end)
            .map(|text| (text.to_string(), start, end)),
        _ => None,
    };

    match span {
        Some((text, start, end)) => ExtractedAnswer::new(
            Some(text),
            question,
            Map::new(),
            document,
            candidate.probability,
            Some(start),
            Some(end),
        ),
        None => ExtractedAnswer::new(
            None,
            question,
            Map::new(),
            document,
            candidate.probability,
            None,
            None,
        ),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::splitter::{flatten, WindowSplitter};
    use crate::domain::document::Document;
    use crate::testing::WhitespaceEncoder;
    use proptest::prelude::*;

    fn answers(probabilities: &[f64]) -> Vec<ExtractedAnswer> {
        probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| {
                ExtractedAnswer::new(
                    Some(format!("a{i}")),
                    "q",
                    Map::new(),
                    None,
                    *p,
                    Some(i),
                    Some(i + 1),
                )
            })
            .collect()
    }

    fn params(top_k: Option<usize>, top_p: Option<f64>, synthesize: bool) -> SelectionParams {
        SelectionParams { top_k, top_p, synthesize_no_answer: synthesize }
    }

    fn probabilities(list: &[ExtractedAnswer]) -> Vec<f64> {
        list.iter().map(|a| a.probability).collect()
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let ranked = rank(answers(&[0.2, 0.5, 0.2, 0.5]), &params(None, None, false), "q");
        let data: Vec<&str> = ranked.iter().map(|a| a.data.as_deref().unwrap()).collect();
        assert_eq!(data, vec!["a1", "a3", "a0", "a2"]);
    }

    #[test]
    fn test_synthesized_no_answer_is_product_of_complements() {
        let ranked = rank(answers(&[0.3, 0.6]), &params(None, None, true), "q");
        assert_eq!(ranked.len(), 3);
        assert!((ranked[2].probability - 0.28).abs() < 1e-12);
        assert!(ranked[2].is_no_answer());
        assert!(ranked[2].document.is_none());
        assert_eq!(&probabilities(&ranked)[..2], &[0.6, 0.3]);
    }

    #[test]
    fn test_synthesized_no_answer_can_rank_first() {
        let ranked = rank(answers(&[0.3, 0.2]), &params(None, None, true), "q");
        assert!(ranked[0].is_no_answer());
        assert!((ranked[0].probability - 0.56).abs() < 1e-12);
    }

    #[test]
    fn test_no_answer_is_computed_after_top_k() {
        let ranked = rank(answers(&[0.6, 0.3, 0.5]), &params(Some(2), None, true), "q");
        // (1 - 0.6) × (1 - 0.5): the 0.3 candidate was already cut
        assert_eq!(ranked.len(), 3);
        assert!((ranked[2].probability - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_top_p_keeps_the_crossing_candidate() {
        let ranked = rank(answers(&[0.5, 0.3, 0.1, 0.1]), &params(None, Some(0.7), false), "q");
        assert_eq!(probabilities(&ranked), vec![0.5, 0.3]);

        let exact = rank(answers(&[0.5, 0.25, 0.25]), &params(None, Some(0.75), false), "q");
        assert_eq!(exact.len(), 2);
    }

    #[test]
    fn test_top_p_never_reached_keeps_everything() {
        let ranked = rank(answers(&[0.1, 0.2]), &params(None, Some(0.9), false), "q");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_aggregate_resolves_text_and_groups_by_query() {
        let docs = vec![
            vec![Document::new("a", "Paris is nice")],
            vec![Document::new("b", "Rome too")],
        ];
        let flat    = flatten(&docs);
        let queries = vec!["q1".to_string(), "q2".to_string()];
        let windows = WindowSplitter::new(32, 4)
            .split(&WhitespaceEncoder, &queries, &flat)
            .unwrap();

        let candidate = |window, start_token, end_token, start, end, probability| SpanCandidate {
            window, start_token, end_token, start, end, probability,
        };
        let candidates = vec![
            vec![
                candidate(0, 3, 3, Some(0), Some(5), 0.7),
                candidate(0, 0, 0, None, None, 0.3),
            ],
            vec![
                candidate(1, 3, 4, Some(0), Some(8), 0.9),
                candidate(1, 0, 3, None, None, 0.1),
            ],
        ];

        let out = aggregate(&queries, &flat, &windows, &candidates, &params(Some(10), None, false));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0].data.as_deref(), Some("Paris"));
        assert_eq!(out[0][0].question, "q1");
        assert_eq!(out[0][0].document.as_ref().map(|d| d.id.as_str()), Some("a"));
        assert!(out[0][1].is_no_answer());
        // window-level no-answers keep their document
        assert!(out[0][1].document.is_some());
        assert_eq!(out[1][0].data.as_deref(), Some("Rome too"));
        assert_eq!(out[1][0].question, "q2");
    }

    #[test]
    fn test_unsliceable_span_becomes_no_answer() {
        let docs    = vec![vec![Document::new("a", "short")]];
        let flat    = flatten(&docs);
        let queries = vec!["q".to_string()];
        let windows = WindowSplitter::new(16, 2)
            .split(&WhitespaceEncoder, &queries, &flat)
            .unwrap();
        let candidates = vec![vec![SpanCandidate {
            window: 0, start_token: 3, end_token: 3,
            start: Some(2), end: Some(99), probability: 0.4,
        }]];

        let out = aggregate(&queries, &flat, &windows, &candidates, &params(None, None, false));
        assert!(out[0][0].is_no_answer());
        assert_eq!(out[0][0].start, None);
        assert_eq!(out[0][0].probability, 0.4);
    }

    proptest! {
        #[test]
        fn prop_ranked_lists_are_sorted_and_minimal_for_top_p(
            probs      in proptest::collection::vec(0.0f64..1.0, 0..30),
            top_k      in proptest::option::of(1usize..20),
            top_p      in proptest::option::of(0.01f64..=1.0),
            synthesize in any::<bool>(),
        ) {
            let ranked = rank(answers(&probs), &params(top_k, top_p, synthesize), "q");

            prop_assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));

            if let Some(top_p) = top_p {
                let mass: f64 = ranked.iter().map(|a| a.probability).sum();
                let without_last: f64 = ranked
                    .iter()
                    .take(ranked.len().saturating_sub(1))
                    .map(|a| a.probability)
                    .sum();
                if mass >= top_p {
                    prop_assert!(without_last < top_p);
                }
            }
        }
    }
}
