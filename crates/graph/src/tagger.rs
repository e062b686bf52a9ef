use crate::lexicon::Lexicon;
use compass_protocol::{Concept, ConceptTag};

/// Maps free text to weighted concept tags through the lexicon's keyword
/// dictionary. Pure: identical input always yields identical tags.
#[derive(Clone, Copy)]
pub struct SemanticTagger<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> SemanticTagger<'a> {
    #[must_use]
    pub const fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Tags ordered by confidence descending, one per concept. Ties keep
    /// vocabulary order.
    #[must_use]
    pub fn tag(&self, text: &str) -> Vec<ConceptTag> {
        let lowered = text.to_lowercase();
        if lowered.trim().is_empty() {
            return Vec::new();
        }

        let mut tags: Vec<ConceptTag> = Concept::ALL
            .into_iter()
            .filter_map(|concept| self.tag_concept(concept, &lowered))
            .collect();

        // Stable sort keeps vocabulary order among equal confidences.
        tags.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        tags
    }

    /// Confidence for a single concept, 0.0 when absent.
    #[must_use]
    pub fn confidence(&self, text: &str, concept: Concept) -> f32 {
        self.tag_concept(concept, &text.to_lowercase())
            .map_or(0.0, |tag| tag.confidence)
    }

    fn tag_concept(&self, concept: Concept, lowered: &str) -> Option<ConceptTag> {
        let keywords = self.lexicon.keywords(concept);
        if keywords.is_empty() {
            return None;
        }

        let mut matches = 0usize;
        let mut matched = Vec::new();
        for keyword in keywords {
            let hits = lowered.matches(keyword.as_str()).count();
            if hits > 0 {
                matches += hits;
                matched.push(keyword.clone());
            }
        }
        if matches == 0 {
            return None;
        }

        let confidence = (matches as f32 / keywords.len() as f32).min(1.0);
        Some(ConceptTag {
            concept,
            confidence,
            keywords: matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_keyword_scores_against_list_length() {
        let lexicon = Lexicon::bundled();
        let tagger = SemanticTagger::new(&lexicon);
        let tags = tagger.tag("Speed");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].concept, Concept::Speed);
        assert!((tags[0].confidence - 1.0 / 6.0).abs() < 1e-6);
        assert_eq!(tags[0].keywords, vec!["speed".to_string()]);
    }

    #[test]
    fn orders_by_confidence_and_caps_at_one() {
        let lexicon = Lexicon::bundled();
        let tagger = SemanticTagger::new(&lexicon);
        let tags = tagger.tag(
            "Perfect quality through craft, polish, rigor and excellence. Quality first. Move fast.",
        );
        assert_eq!(tags[0].concept, Concept::Quality);
        assert!((tags[0].confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(tags[1].concept, Concept::Speed);
    }

    #[test]
    fn unrelated_text_has_no_tags() {
        let lexicon = Lexicon::bundled();
        let tagger = SemanticTagger::new(&lexicon);
        assert!(tagger.tag("").is_empty());
        assert!(tagger.tag("Kindness matters").is_empty());
        assert!(tagger.confidence("Kindness", Concept::Speed).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn tagging_is_deterministic_and_bounded(text in "[a-zA-Z ,.]{0,120}") {
            let lexicon = Lexicon::bundled();
            let tagger = SemanticTagger::new(&lexicon);
            let first = tagger.tag(&text);
            let second = tagger.tag(&text);
            prop_assert_eq!(&first, &second);
            let mut seen = std::collections::HashSet::new();
            for tag in &first {
                prop_assert!(tag.confidence > 0.0 && tag.confidence <= 1.0);
                prop_assert!(seen.insert(tag.concept));
            }
            for pair in first.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
    }
}
