use proptest::prelude::*;
use rust_litreview_mcp::client::{document_path, normalize_doi, sanitize_filename};
use rust_litreview_mcp::synthesis::{themes, YearBucket, THEME_SAMPLE_SIZE};
use rust_litreview_mcp::text::{extract_keywords, keywords::TOP_KEYWORDS, Sections};
use rust_litreview_mcp::{synthesize, ExtractedDocument};
use std::path::Path;

/// Property-based tests for filename, identifier and aggregation helpers
mod filename_props {
    use super::*;

    proptest! {
        #[test]
        fn test_sanitized_name_is_single_component(name in ".*", max_len in 1usize..120) {
            let sanitized = sanitize_filename(&name, max_len);
            prop_assert!(!sanitized.is_empty());
            prop_assert!(sanitized.chars().count() <= max_len.max("untitled".len()));
            prop_assert!(!sanitized.contains('/'));
            prop_assert!(!sanitized.contains('\\'));
            prop_assert!(!sanitized.ends_with(' '));
        }

        #[test]
        fn test_document_path_stays_in_directory(title in ".*", year in proptest::option::of(1900u32..2100)) {
            let dir = Path::new("papers/topic");
            let path = document_path(dir, year, &title, 80);
            prop_assert_eq!(path.parent(), Some(dir));
            prop_assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        }
    }
}

mod doi_props {
    use super::*;

    proptest! {
        #[test]
        fn test_normalization_strips_resolver_prefix(
            prefix in prop_oneof![
                Just(""),
                Just("https://doi.org/"),
                Just("HTTP://DOI.ORG/"),
                Just("doi:"),
            ],
            suffix in r"10\.\d{4,9}/[a-zA-Z0-9._;()/-]{1,40}",
        ) {
            let normalized = normalize_doi(Some(&format!(" {prefix}{suffix} ")));
            prop_assert_eq!(normalized.as_deref(), Some(suffix.as_str()));
        }

        #[test]
        fn test_blank_input_has_no_doi(blank in r"[ \t]{0,8}") {
            prop_assert_eq!(normalize_doi(Some(&blank)), None);
        }
    }
}

mod synthesis_props {
    use super::*;

    fn document(index: usize, keywords: Vec<String>) -> ExtractedDocument {
        ExtractedDocument {
            title: Some(format!("Paper {index}")),
            year: Some(2020 + (index % 7) as u32),
            doi: None,
            authors: Vec::new(),
            full_text_length: index * 10,
            sections: Sections::default(),
            keywords,
        }
    }

    proptest! {
        #[test]
        fn test_year_classification_by_prefix(year in 1000u32..10000) {
            let bucket = YearBucket::classify(&year.to_string());
            let expected = match year {
                2024 | 2025 => Some(YearBucket::Recent),
                2020..=2023 => Some(YearBucket::Older),
                _ => None,
            };
            prop_assert_eq!(bucket, expected);
        }

        #[test]
        fn test_theme_samples_never_exceed_cap(
            keyword_sets in proptest::collection::vec(
                proptest::collection::vec("[a-e]{5}", 0..4),
                0..20,
            )
        ) {
            let documents: Vec<_> = keyword_sets
                .into_iter()
                .enumerate()
                .map(|(i, keywords)| document(i, keywords))
                .collect();

            for cluster in themes(&documents) {
                prop_assert!(cluster.papers.len() <= THEME_SAMPLE_SIZE);
                prop_assert!(cluster.paper_count >= cluster.papers.len());
                let matching = documents
                    .iter()
                    .filter(|d| d.keywords.contains(&cluster.keyword))
                    .count();
                prop_assert_eq!(cluster.paper_count, matching);
            }
        }

        #[test]
        fn test_average_length_defined_for_any_set(count in 0usize..10) {
            let documents: Vec<_> = (0..count).map(|i| document(i, Vec::new())).collect();
            let synthesis = synthesize(&documents);
            prop_assert_eq!(synthesis.total_papers, count);
            if count == 0 {
                prop_assert_eq!(synthesis.statistics.avg_text_length, 0);
            }
        }
    }
}

mod keyword_props {
    use super::*;

    proptest! {
        #[test]
        fn test_keyword_list_bounded(text in "[a-zA-Z ,.]{0,400}") {
            let keywords = extract_keywords(&text);
            prop_assert!(keywords.len() <= TOP_KEYWORDS);
            for keyword in &keywords {
                prop_assert!(keyword.chars().count() > 4);
                prop_assert_eq!(keyword.to_lowercase(), keyword.clone());
            }
        }
    }
}
