//! Cross-document aggregation over extracted documents.
//!
//! Every field of [`Synthesis`] is recomputed from scratch on each run.

use crate::text::{rank_by_frequency, ExtractedDocument};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Entries kept in the global keyword table
pub const KEYWORD_TABLE_SIZE: usize = 20;
/// Global keywords turned into theme clusters
pub const THEME_COUNT: usize = 10;
/// Representative documents listed per theme
pub const THEME_SAMPLE_SIZE: usize = 5;

const RECENT_PREFIXES: [&str; 2] = ["2024", "2025"];
const OLDER_PREFIXES: [&str; 4] = ["2020", "2021", "2022", "2023"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSample {
    pub title: Option<String>,
    pub year: Option<u32>,
}

/// Documents sharing one dominant keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeCluster {
    pub theme_name: String,
    pub keyword: String,
    /// Size of the full matching set, not of `papers`
    pub paper_count: usize,
    pub papers: Vec<ThemeSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub avg_text_length: usize,
    pub papers_with_methodology: usize,
    pub papers_with_conclusion: usize,
    pub unique_authors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperGroupings {
    pub recent_papers: usize,
    pub older_papers: usize,
}

/// Aggregated view written to `synthesis.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub total_papers: usize,
    pub year_distribution: BTreeMap<u32, usize>,
    pub keyword_frequency: Vec<KeywordCount>,
    pub themes: Vec<ThemeCluster>,
    pub statistics: Statistics,
    pub paper_groupings: PaperGroupings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearBucket {
    Recent,
    Older,
}

impl YearBucket {
    /// Classify a year string by prefix; anything else belongs to no bucket
    pub fn classify(year: &str) -> Option<Self> {
        if RECENT_PREFIXES.iter().any(|p| year.starts_with(p)) {
            Some(Self::Recent)
        } else if OLDER_PREFIXES.iter().any(|p| year.starts_with(p)) {
            Some(Self::Older)
        } else {
            None
        }
    }
}

/// Count per publication year; documents without a year are left out
pub fn year_distribution(documents: &[ExtractedDocument]) -> BTreeMap<u32, usize> {
    let mut distribution = BTreeMap::new();
    for year in documents.iter().filter_map(|d| d.year) {
        *distribution.entry(year).or_insert(0) += 1;
    }
    distribution
}

fn global_keywords(documents: &[ExtractedDocument]) -> Vec<(String, usize)> {
    rank_by_frequency(documents.iter().flat_map(|d| d.keywords.iter().cloned()))
}

pub fn keyword_frequency(documents: &[ExtractedDocument]) -> Vec<KeywordCount> {
    global_keywords(documents)
        .into_iter()
        .take(KEYWORD_TABLE_SIZE)
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}

/// One cluster per global top keyword, built from each document's own keyword list
pub fn themes(documents: &[ExtractedDocument]) -> Vec<ThemeCluster> {
    global_keywords(documents)
        .into_iter()
        .take(THEME_COUNT)
        .filter_map(|(keyword, _)| {
            let matching: Vec<&ExtractedDocument> = documents
                .iter()
                .filter(|d| d.keywords.contains(&keyword))
                .collect();
            if matching.is_empty() {
                return None;
            }

            Some(ThemeCluster {
                theme_name: capitalize(&keyword),
                paper_count: matching.len(),
                papers: matching
                    .iter()
                    .take(THEME_SAMPLE_SIZE)
                    .map(|d| ThemeSample {
                        title: d.title.clone(),
                        year: d.year,
                    })
                    .collect(),
                keyword,
            })
        })
        .collect()
}

pub fn statistics(documents: &[ExtractedDocument]) -> Statistics {
    let total_length: usize = documents.iter().map(|d| d.full_text_length).sum();
    let avg_text_length = total_length.checked_div(documents.len()).unwrap_or(0);

    let unique_authors: HashSet<&str> = documents
        .iter()
        .flat_map(|d| d.authors.iter())
        .filter_map(|a| a.as_deref())
        .filter(|a| !a.is_empty())
        .collect();

    Statistics {
        avg_text_length,
        papers_with_methodology: documents
            .iter()
            .filter(|d| !d.sections.methodology.is_empty())
            .count(),
        papers_with_conclusion: documents
            .iter()
            .filter(|d| !d.sections.conclusion.is_empty())
            .count(),
        unique_authors: unique_authors.len(),
    }
}

pub fn paper_groupings(documents: &[ExtractedDocument]) -> PaperGroupings {
    let mut groupings = PaperGroupings::default();
    for year in documents.iter().filter_map(|d| d.year) {
        match YearBucket::classify(&year.to_string()) {
            Some(YearBucket::Recent) => groupings.recent_papers += 1,
            Some(YearBucket::Older) => groupings.older_papers += 1,
            None => {}
        }
    }
    groupings
}

/// Run every aggregation over the full document set
pub fn synthesize(documents: &[ExtractedDocument]) -> Synthesis {
    Synthesis {
        total_papers: documents.len(),
        year_distribution: year_distribution(documents),
        keyword_frequency: keyword_frequency(documents),
        themes: themes(documents),
        statistics: statistics(documents),
        paper_groupings: paper_groupings(documents),
    }
}
