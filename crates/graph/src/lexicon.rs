use crate::error::{GraphError, Result};
use compass_protocol::{Concept, NodeType};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const BUILTIN_DEFAULT: &str = include_str!("../../../lexicons/default.json");

/// Static configuration behind tagging, conflict detection and scoring.
///
/// The bundled `default` lexicon is always the base; user lexicons are
/// overlaid onto it, so a file only needs to name what it changes.
#[derive(Clone, Debug)]
pub struct Lexicon {
    name: String,
    keywords: BTreeMap<Concept, Vec<String>>,
    oppositions: Vec<Opposition>,
    thresholds: SeverityThresholds,
    penalties: ConflictPenalties,
    weights: AlignmentWeights,
    conflict_node_types: Vec<NodeType>,
}

/// Two concepts that pull in opposite directions.
#[derive(Clone, Debug, PartialEq)]
pub struct Opposition {
    pub left: Concept,
    pub right: Concept,
    pub resolution: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeverityThresholds {
    pub critical: f32,
    pub potential: f32,
    /// Tags below this confidence never take part in a conflict.
    pub detection_floor: f32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 0.6,
            potential: 0.3,
            detection_floor: 0.15,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConflictPenalties {
    pub critical: u32,
    pub potential: u32,
    pub healthy: u32,
}

impl Default for ConflictPenalties {
    fn default() -> Self {
        Self {
            critical: 25,
            potential: 10,
            healthy: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentWeights {
    pub completeness: f32,
    pub density: f32,
    pub conflict: f32,
}

impl Default for AlignmentWeights {
    fn default() -> Self {
        Self {
            completeness: 0.4,
            density: 0.3,
            conflict: 0.3,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLexicon {
    schema_version: Option<u32>,
    name: Option<String>,
    #[allow(dead_code)]
    description: Option<String>,
    #[serde(default)]
    concepts: BTreeMap<String, Vec<String>>,
    oppositions: Option<Vec<RawOpposition>>,
    thresholds: Option<RawThresholds>,
    penalties: Option<RawPenalties>,
    weights: Option<RawWeights>,
    conflict_node_types: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOpposition {
    left: String,
    right: String,
    #[serde(default)]
    resolution: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholds {
    critical: Option<f32>,
    potential: Option<f32>,
    detection_floor: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPenalties {
    critical: Option<u32>,
    potential: Option<u32>,
    healthy: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    completeness: Option<f32>,
    density: Option<f32>,
    conflict: Option<f32>,
}

impl Lexicon {
    /// The lexicon bundled with the crate.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_raw(builtin_raw().expect("bundled lexicon must parse"), "default")
            .expect("bundled lexicon must validate")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| GraphError::LexiconIo {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom");
        Self::from_bytes(fallback, &bytes)
    }

    /// Parse a JSON or TOML lexicon and overlay it onto the bundled default.
    pub fn from_bytes(fallback_name: &str, bytes: &[u8]) -> Result<Self> {
        let overlay = parse_raw(bytes)?;
        let merged = merge_raw(builtin_raw()?, overlay);
        Self::from_raw(merged, fallback_name)
    }

    fn from_raw(raw: RawLexicon, fallback_name: &str) -> Result<Self> {
        if let Some(schema_version) = raw.schema_version {
            if schema_version != 1 {
                return Err(GraphError::InvalidLexicon(format!(
                    "schema_version {schema_version} is not supported (expected 1)"
                )));
            }
        }

        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let mut keywords = BTreeMap::new();
        for (raw_concept, words) in raw.concepts {
            let concept = Concept::parse(&raw_concept).ok_or_else(|| {
                GraphError::InvalidLexicon(format!("unknown concept '{raw_concept}'"))
            })?;
            keywords.insert(concept, normalize_keywords(concept, words)?);
        }

        let oppositions = raw
            .oppositions
            .unwrap_or_default()
            .into_iter()
            .map(Opposition::from_raw)
            .collect::<Result<Vec<_>>>()?;

        let thresholds = merge_thresholds(raw.thresholds);
        let penalties = merge_penalties(raw.penalties);
        let weights = merge_weights(raw.weights);

        let conflict_node_types = match raw.conflict_node_types {
            Some(types) => types
                .iter()
                .map(|t| {
                    NodeType::parse(t).ok_or_else(|| {
                        GraphError::InvalidLexicon(format!("unknown node type '{t}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => vec![NodeType::Value],
        };

        let lexicon = Self {
            name,
            keywords,
            oppositions,
            thresholds,
            penalties,
            weights,
            conflict_node_types,
        };
        lexicon.validate()?;
        Ok(lexicon)
    }

    fn validate(&self) -> Result<()> {
        let t = self.thresholds;
        for (label, value) in [
            ("thresholds.critical", t.critical),
            ("thresholds.potential", t.potential),
            ("thresholds.detection_floor", t.detection_floor),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(GraphError::InvalidLexicon(format!(
                    "{label} must be in (0.0, 1.0] (got {value})"
                )));
            }
        }
        if !(t.detection_floor <= t.potential && t.potential <= t.critical) {
            return Err(GraphError::InvalidLexicon(format!(
                "thresholds must satisfy detection_floor <= potential <= critical (got {} / {} / {})",
                t.detection_floor, t.potential, t.critical
            )));
        }

        let w = self.weights;
        if w.completeness < 0.0 || w.density < 0.0 || w.conflict < 0.0 {
            return Err(GraphError::InvalidLexicon(
                "weights must be non-negative".to_string(),
            ));
        }
        if w.completeness + w.density + w.conflict <= 0.0 {
            return Err(GraphError::InvalidLexicon(
                "weights must not all be zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for opposition in &self.oppositions {
            let key = if opposition.left <= opposition.right {
                (opposition.left, opposition.right)
            } else {
                (opposition.right, opposition.left)
            };
            if !seen.insert(key) {
                return Err(GraphError::InvalidLexicon(format!(
                    "opposition {} vs {} is listed twice",
                    opposition.left, opposition.right
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keyword list for a concept; empty when the lexicon does not cover it.
    #[must_use]
    pub fn keywords(&self, concept: Concept) -> &[String] {
        self.keywords.get(&concept).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn oppositions(&self) -> &[Opposition] {
        &self.oppositions
    }

    #[must_use]
    pub const fn thresholds(&self) -> SeverityThresholds {
        self.thresholds
    }

    #[must_use]
    pub const fn penalties(&self) -> ConflictPenalties {
        self.penalties
    }

    #[must_use]
    pub const fn weights(&self) -> AlignmentWeights {
        self.weights
    }

    #[must_use]
    pub fn conflict_node_types(&self) -> &[NodeType] {
        &self.conflict_node_types
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::bundled()
    }
}

impl Opposition {
    fn from_raw(raw: RawOpposition) -> Result<Self> {
        let left = Concept::parse(&raw.left)
            .ok_or_else(|| GraphError::InvalidLexicon(format!("unknown concept '{}'", raw.left)))?;
        let right = Concept::parse(&raw.right).ok_or_else(|| {
            GraphError::InvalidLexicon(format!("unknown concept '{}'", raw.right))
        })?;
        if left == right {
            return Err(GraphError::InvalidLexicon(format!(
                "opposition must name two different concepts (got {left} twice)"
            )));
        }
        Ok(Self {
            left,
            right,
            resolution: raw.resolution.filter(|r| !r.trim().is_empty()),
        })
    }

    /// The concept on the other side, if `concept` takes part.
    #[must_use]
    pub fn opposite_of(&self, concept: Concept) -> Option<Concept> {
        if concept == self.left {
            Some(self.right)
        } else if concept == self.right {
            Some(self.left)
        } else {
            None
        }
    }
}

fn normalize_keywords(concept: Concept, words: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(GraphError::InvalidLexicon(format!(
                "concept {concept} has an empty keyword"
            )));
        }
        if !out.contains(&word) {
            out.push(word);
        }
    }
    Ok(out)
}

fn merge_thresholds(raw: Option<RawThresholds>) -> SeverityThresholds {
    let defaults = SeverityThresholds::default();
    let raw = raw.unwrap_or_default();
    SeverityThresholds {
        critical: raw.critical.unwrap_or(defaults.critical),
        potential: raw.potential.unwrap_or(defaults.potential),
        detection_floor: raw.detection_floor.unwrap_or(defaults.detection_floor),
    }
}

fn merge_penalties(raw: Option<RawPenalties>) -> ConflictPenalties {
    let defaults = ConflictPenalties::default();
    let raw = raw.unwrap_or_default();
    ConflictPenalties {
        critical: raw.critical.unwrap_or(defaults.critical),
        potential: raw.potential.unwrap_or(defaults.potential),
        healthy: raw.healthy.unwrap_or(defaults.healthy),
    }
}

fn merge_weights(raw: Option<RawWeights>) -> AlignmentWeights {
    let defaults = AlignmentWeights::default();
    let raw = raw.unwrap_or_default();
    AlignmentWeights {
        completeness: raw.completeness.unwrap_or(defaults.completeness),
        density: raw.density.unwrap_or(defaults.density),
        conflict: raw.conflict.unwrap_or(defaults.conflict),
    }
}

fn builtin_raw() -> Result<RawLexicon> {
    parse_raw(BUILTIN_DEFAULT.as_bytes())
}

fn merge_raw(mut base: RawLexicon, overlay: RawLexicon) -> RawLexicon {
    base.concepts.extend(overlay.concepts);
    RawLexicon {
        schema_version: overlay.schema_version.or(base.schema_version),
        name: overlay.name,
        description: overlay.description.or(base.description),
        concepts: base.concepts,
        oppositions: overlay.oppositions.or(base.oppositions),
        thresholds: Some(merge_raw_thresholds(base.thresholds, overlay.thresholds)),
        penalties: Some(merge_raw_penalties(base.penalties, overlay.penalties)),
        weights: Some(merge_raw_weights(base.weights, overlay.weights)),
        conflict_node_types: overlay.conflict_node_types.or(base.conflict_node_types),
    }
}

fn merge_raw_thresholds(base: Option<RawThresholds>, overlay: Option<RawThresholds>) -> RawThresholds {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    RawThresholds {
        critical: overlay.critical.or(base.critical),
        potential: overlay.potential.or(base.potential),
        detection_floor: overlay.detection_floor.or(base.detection_floor),
    }
}

fn merge_raw_penalties(base: Option<RawPenalties>, overlay: Option<RawPenalties>) -> RawPenalties {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    RawPenalties {
        critical: overlay.critical.or(base.critical),
        potential: overlay.potential.or(base.potential),
        healthy: overlay.healthy.or(base.healthy),
    }
}

fn merge_raw_weights(base: Option<RawWeights>, overlay: Option<RawWeights>) -> RawWeights {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    RawWeights {
        completeness: overlay.completeness.or(base.completeness),
        density: overlay.density.or(base.density),
        conflict: overlay.conflict.or(base.conflict),
    }
}

fn parse_raw(bytes: &[u8]) -> Result<RawLexicon> {
    match serde_json::from_slice(bytes) {
        Ok(raw) => Ok(raw),
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes)
                .map_err(|err| GraphError::LexiconParse(format!("{json_err}; {err}")))?;
            toml::from_str(utf8).map_err(|toml_err| {
                GraphError::LexiconParse(format!("{json_err}; TOML parse error: {toml_err}"))
            })
        }
    }
}
