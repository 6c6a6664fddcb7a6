//! Property tests for normalization and fusion.
//!
//! Ranked lists draw docids from a small pool so that overlap between lists
//! is common.

use proptest::prelude::*;
use rankfuse_core::{
    FusionConfig, FusionMethod, NormalizeMode, RankedList, ScoreRange, ScoredDocument, fuse,
    normalize,
};
use std::collections::BTreeSet;

fn arb_ranked_list() -> impl Strategy<Value = RankedList> {
    prop::collection::vec((0u8..24, -100.0f64..100.0), 0..16).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(id, score)| ScoredDocument::new(format!("d{id:02}"), score))
            .collect()
    })
}

fn arb_method() -> impl Strategy<Value = FusionMethod> {
    prop_oneof![
        Just(FusionMethod::LinearInterpolation),
        Just(FusionMethod::ReciprocalRankFusion),
        Just(FusionMethod::Average),
        Just(FusionMethod::Normalize),
    ]
}

fn arb_config() -> impl Strategy<Value = FusionConfig> {
    (arb_method(), 0.0f64..2.0, any::<bool>(), any::<bool>(), 1usize..100).prop_map(
        |(method, alpha, weight_on_dense, normalize, rrf_k)| FusionConfig {
            method,
            alpha,
            weight_on_dense,
            normalize,
            rrf_k,
            ..FusionConfig::default()
        },
    )
}

fn docid_union(lists: &[&RankedList]) -> BTreeSet<String> {
    lists
        .iter()
        .flat_map(|l| l.docids().map(str::to_string))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn fused_docids_equal_union_without_truncation(
        a in arb_ranked_list(),
        b in arb_ranked_list(),
        config in arb_config(),
    ) {
        let fused = fuse(&[&a, &b], &config).unwrap();
        let fused_ids: BTreeSet<String> = fused.docids().map(str::to_string).collect();
        prop_assert_eq!(fused_ids.len(), fused.len());
        prop_assert_eq!(fused_ids, docid_union(&[&a, &b]));
    }

    #[test]
    fn fused_docids_subset_of_union_with_truncation(
        a in arb_ranked_list(),
        b in arb_ranked_list(),
        config in arb_config(),
        top_k in 1usize..8,
    ) {
        let config = config.top_k(top_k);
        let fused = fuse(&[&a, &b], &config).unwrap();
        let union = docid_union(&[&a, &b]);
        prop_assert!(fused.len() <= top_k);
        prop_assert_eq!(fused.len(), union.len().min(top_k));
        for docid in fused.docids() {
            prop_assert!(union.contains(docid));
        }
    }

    #[test]
    fn fused_output_is_sorted(
        a in arb_ranked_list(),
        b in arb_ranked_list(),
        config in arb_config(),
    ) {
        let fused = fuse(&[&a, &b], &config).unwrap();
        for pair in fused.docs().windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score.to_bits() == pair[1].score.to_bits() {
                prop_assert!(pair[0].docid < pair[1].docid);
            }
        }
    }

    #[test]
    fn fusion_is_deterministic(
        a in arb_ranked_list(),
        b in arb_ranked_list(),
        config in arb_config(),
    ) {
        let first = fuse(&[&a, &b], &config).unwrap();
        let second = fuse(&[&a, &b], &config).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn centered_normalization_stays_in_range(list in arb_ranked_list()) {
        let out = normalize(&list, NormalizeMode::MinMaxCentered);
        let range = ScoreRange::of(list.docs());
        prop_assume!(range.is_some_and(|r| !r.is_degenerate()));
        for doc in out.iter() {
            prop_assert!((-1.0..=1.0).contains(&doc.score));
            prop_assert!((-0.5 - 1e-9..=0.5 + 1e-9).contains(&doc.score));
        }
    }

    #[test]
    fn centered_normalization_maps_midpoint_to_zero(lo in -50.0f64..0.0, width in 0.5f64..50.0) {
        let range = ScoreRange { min: lo, max: lo + width };
        let mid = (range.min + range.max) / 2.0;
        prop_assert!(range.apply(mid, NormalizeMode::MinMaxCentered).abs() < 1e-9);
    }

    #[test]
    fn rrf_better_rank_never_lowers_score(
        others in prop::collection::btree_set(0u8..24, 1..12),
        other_list in arb_ranked_list(),
        from in 0usize..12,
        to in 0usize..12,
    ) {
        let target = "target";
        let others: Vec<String> = others.into_iter().map(|id| format!("d{id:02}")).collect();
        let from = from.min(others.len());
        let to = to.min(from);

        let build = |pos: usize| {
            let mut ids = others.clone();
            ids.insert(pos, target.to_string());
            RankedList::from_ranked(
                ids.into_iter()
                    .enumerate()
                    .map(|(idx, id)| ScoredDocument::new(id, -(idx as f64)))
                    .collect(),
            )
        };

        let config = FusionConfig::with_method(FusionMethod::ReciprocalRankFusion);
        let worse = fuse(&[&build(from), &other_list], &config).unwrap();
        let better = fuse(&[&build(to), &other_list], &config).unwrap();

        let score = |fused: &RankedList| fused.get(target).map(|d| d.score).unwrap();
        prop_assert!(score(&better) >= score(&worse));
    }
}
