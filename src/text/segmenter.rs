//! Best-effort section finder.
//!
//! Each label owns a short list of indicative tokens. The first occurrence of
//! the first token that matches anywhere in the lower-cased text marks the
//! section start, and a fixed window of characters is captured from there.
//! Section ends are never located, so adjacent windows usually overlap.

use serde::{Deserialize, Serialize};

/// Characters captured from the start of a matched section
pub const SECTION_WINDOW: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionLabel {
    Abstract,
    Introduction,
    Methodology,
    Results,
    Conclusion,
}

impl SectionLabel {
    pub const ALL: [Self; 5] = [
        Self::Abstract,
        Self::Introduction,
        Self::Methodology,
        Self::Results,
        Self::Conclusion,
    ];

    /// Indicative tokens, tried in this order
    pub const fn tokens(self) -> &'static [&'static str] {
        match self {
            Self::Abstract => &["abstract"],
            Self::Introduction => &["introduction", "1. introduction"],
            Self::Methodology => &["methodology", "methods", "materials and methods"],
            Self::Results => &["results", "findings"],
            Self::Conclusion => &["conclusion", "discussion"],
        }
    }

    /// Maximum characters kept for the label in an extracted document
    pub const fn output_cap(self) -> usize {
        match self {
            Self::Abstract | Self::Conclusion => 1000,
            Self::Introduction | Self::Methodology | Self::Results => 1500,
        }
    }
}

/// Raw text windows per section; empty when no token matched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sections {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub introduction: String,
    pub methodology: String,
    pub results: String,
    pub conclusion: String,
}

impl Sections {
    pub fn get(&self, label: SectionLabel) -> &str {
        match label {
            SectionLabel::Abstract => &self.abstract_text,
            SectionLabel::Introduction => &self.introduction,
            SectionLabel::Methodology => &self.methodology,
            SectionLabel::Results => &self.results,
            SectionLabel::Conclusion => &self.conclusion,
        }
    }

    fn slot(&mut self, label: SectionLabel) -> &mut String {
        match label {
            SectionLabel::Abstract => &mut self.abstract_text,
            SectionLabel::Introduction => &mut self.introduction,
            SectionLabel::Methodology => &mut self.methodology,
            SectionLabel::Results => &mut self.results,
            SectionLabel::Conclusion => &mut self.conclusion,
        }
    }

    /// Apply each label's output cap
    #[must_use]
    pub fn capped(mut self) -> Self {
        for label in SectionLabel::ALL {
            let slot = self.slot(label);
            *slot = take_chars(slot, label.output_cap());
        }
        self
    }
}

/// Lower-case one character at a time so char offsets line up with `text`
fn aligned_lowercase(text: &str) -> String {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Char offset of the first matching token for `label`
fn locate(lowered: &str, label: SectionLabel) -> Option<usize> {
    label.tokens().iter().find_map(|token| {
        lowered
            .find(token)
            .map(|byte_idx| lowered[..byte_idx].chars().count())
    })
}

/// Locate every section in `text`
pub fn segment(text: &str) -> Sections {
    let lowered = aligned_lowercase(text);
    let mut sections = Sections::default();

    for label in SectionLabel::ALL {
        if let Some(start) = locate(&lowered, label) {
            *sections.slot(label) = text.chars().skip(start).take(SECTION_WINDOW).collect();
        }
    }
    sections
}
