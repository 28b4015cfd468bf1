use proptest::prelude::*;

use pbix_audit_core::parser::{decode_utf16le, walk_layout};
use pbix_audit_core::rules::recommend;
use pbix_audit_core::score_performance;
use pbix_audit_core::types::StructureResult;

proptest! {
    #[test]
    fn size_score_never_increases_with_size(a in 0.0f64..500.0, b in 0.0f64..500.0) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let s = score_performance(small);
        let l = score_performance(large);
        prop_assert!(l.size_score <= s.size_score);
        prop_assert!(l.performance_grade >= s.performance_grade);
    }

    #[test]
    fn recommendations_are_never_empty(
        size in 0.0f64..500.0,
        pages in 0u64..40,
        visuals in 0u64..200,
        types in 0usize..20,
    ) {
        let structure = StructureResult {
            page_count: pages,
            visual_count: visuals,
            visual_types: (0..types).map(|i| i.to_string()).collect(),
            has_layout: true,
            ..StructureResult::default()
        };
        let recs = recommend(&score_performance(size), &structure);
        prop_assert!(!recs.is_empty());
        prop_assert!(recs.len() <= 4);
    }

    #[test]
    fn decoder_never_panics(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let _ = decode_utf16le(&data);
    }

    #[test]
    fn utf16_text_round_trips_through_decoder(s in "\\PC{0,64}") {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let decoded = decode_utf16le(&bytes).unwrap();
        prop_assert_eq!(decoded, s);
    }

    #[test]
    fn visual_count_is_sum_of_containers(sizes in prop::collection::vec(0usize..20, 0..12)) {
        let sections: Vec<serde_json::Value> = sizes
            .iter()
            .map(|n| serde_json::json!({ "visualContainers": vec![serde_json::json!({}); *n] }))
            .collect();
        let doc = serde_json::json!({ "sections": sections });
        let mut out = StructureResult::default();
        walk_layout(&doc, &mut out);
        prop_assert_eq!(out.page_count as usize, sizes.len());
        prop_assert_eq!(out.visual_count as usize, sizes.iter().sum::<usize>());
        prop_assert!(out.page_names.iter().all(|n| n == "Unnamed Page"));
    }
}
