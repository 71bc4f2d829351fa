//! Evaluation–Potency–Activity coordinates.
//!
//! EPA is Osgood's three-axis semantic differential: good/bad, strong/weak,
//! active/passive. Values are balanced ternary and independent of the
//! hierarchical dimensions.

use serde::{Deserialize, Serialize};

use crate::error::EpaError;

/// Balanced-ternary value in {-1, 0, +1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Ternary {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl Ternary {
    pub fn value(self) -> i64 {
        match self {
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
        }
    }

    /// Quantize a real score: above 0.3 is positive, below -0.3 negative.
    pub fn quantize(x: f64) -> Self {
        if x > 0.3 {
            Self::Positive
        } else if x < -0.3 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl TryFrom<i64> for Ternary {
    type Error = EpaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Positive),
            other => Err(EpaError::InvalidTernary { value: other }),
        }
    }
}

impl From<Ternary> for i64 {
    fn from(t: Ternary) -> i64 {
        t.value()
    }
}

/// An entity's EPA coordinates with a confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEpa")]
pub struct EpaValues {
    pub evaluation: Ternary,
    pub potency: Ternary,
    pub activity: Ternary,
    confidence: f64,
}

/// Unvalidated wire form of [`EpaValues`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawEpa {
    pub evaluation: Ternary,
    pub potency: Ternary,
    pub activity: Ternary,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl TryFrom<RawEpa> for EpaValues {
    type Error = EpaError;

    fn try_from(raw: RawEpa) -> Result<Self, Self::Error> {
        EpaValues::new(raw.evaluation, raw.potency, raw.activity, raw.confidence)
    }
}

impl Default for EpaValues {
    fn default() -> Self {
        Self {
            evaluation: Ternary::Neutral,
            potency: Ternary::Neutral,
            activity: Ternary::Neutral,
            confidence: 1.0,
        }
    }
}

impl EpaValues {
    /// Create EPA values, rejecting a confidence outside [0, 1].
    pub fn new(
        evaluation: Ternary,
        potency: Ternary,
        activity: Ternary,
        confidence: f64,
    ) -> Result<Self, EpaError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EpaError::ConfidenceOutOfRange { confidence });
        }
        Ok(Self {
            evaluation,
            potency,
            activity,
            confidence,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// `(E, P, A)` as integers.
    pub fn as_vector(&self) -> (i64, i64, i64) {
        (
            self.evaluation.value(),
            self.potency.value(),
            self.activity.value(),
        )
    }

    /// Euclidean distance in EPA space.
    pub fn distance(&self, other: &EpaValues) -> f64 {
        let (e1, p1, a1) = self.as_vector();
        let (e2, p2, a2) = other.as_vector();
        (((e1 - e2).pow(2) + (p1 - p2).pow(2) + (a1 - a2).pow(2)) as f64).sqrt()
    }
}

/// Contribution of a semantic primitive to each EPA axis.
struct PrimitiveWeights {
    name: &'static str,
    e: f64,
    p: f64,
    a: f64,
}

const PRIMITIVE_TO_EPA: &[PrimitiveWeights] = &[
    PrimitiveWeights { name: "GOOD", e: 1.0, p: 0.0, a: 0.0 },
    PrimitiveWeights { name: "BAD", e: -1.0, p: 0.0, a: 0.0 },
    PrimitiveWeights { name: "BIG", e: 0.0, p: 1.0, a: 0.0 },
    PrimitiveWeights { name: "SMALL", e: 0.0, p: -1.0, a: 0.0 },
    PrimitiveWeights { name: "CAN", e: 0.0, p: 0.5, a: 0.0 },
    PrimitiveWeights { name: "MUST", e: 0.0, p: -0.3, a: 0.0 },
    PrimitiveWeights { name: "DO", e: 0.0, p: 0.0, a: 1.0 },
    PrimitiveWeights { name: "MOVE", e: 0.0, p: 0.0, a: 0.8 },
    PrimitiveWeights { name: "HAPPEN", e: 0.0, p: 0.0, a: 0.5 },
    PrimitiveWeights { name: "ALIVE", e: 0.0, p: 0.0, a: 0.3 },
    PrimitiveWeights { name: "DEAD", e: 0.0, p: 0.0, a: -1.0 },
    PrimitiveWeights { name: "WANT", e: 0.0, p: 0.2, a: 0.3 },
    PrimitiveWeights { name: "THINK", e: 0.0, p: 0.0, a: 0.2 },
    PrimitiveWeights { name: "FEEL", e: 0.2, p: 0.0, a: 0.2 },
];

/// Project semantic-primitive values onto EPA.
///
/// Unknown primitive names are ignored. Confidence grows with the number of
/// recognised primitives, saturating at three.
pub fn primitives_to_epa<'a, I>(primitives: I) -> EpaValues
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let (mut e, mut p, mut a) = (0.0, 0.0, 0.0);
    let mut count = 0usize;
    for (name, value) in primitives {
        if let Some(w) = PRIMITIVE_TO_EPA
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
        {
            e += w.e * value;
            p += w.p * value;
            a += w.a * value;
            count += 1;
        }
    }
    EpaValues {
        evaluation: Ternary::quantize(e),
        potency: Ternary::quantize(p),
        activity: Ternary::quantize(a),
        confidence: (count as f64 / 3.0).min(1.0),
    }
}

/// Default EPA for a coarse entity type (`person`, `place`, ...).
pub fn entity_type_epa(entity_type: &str) -> Option<EpaValues> {
    use Ternary::*;
    let (e, p, a) = match entity_type.to_lowercase().as_str() {
        "person" => (Neutral, Neutral, Positive),
        "place" => (Neutral, Neutral, Negative),
        "event" => (Neutral, Neutral, Positive),
        "organization" => (Neutral, Positive, Neutral),
        "concept" => (Neutral, Negative, Negative),
        _ => return None,
    };
    Some(EpaValues {
        evaluation: e,
        potency: p,
        activity: a,
        confidence: 1.0,
    })
}

/// Similarity in [0, 1], where 1 means identical coordinates.
pub fn epa_similarity(a: &EpaValues, b: &EpaValues) -> f64 {
    let max_distance = 12f64.sqrt();
    1.0 - a.distance(b) / max_distance
}

/// Whether two EPA profiles are at least `threshold` similar.
pub fn epa_compatible(a: &EpaValues, b: &EpaValues, threshold: f64) -> bool {
    epa_similarity(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_and_similarity() {
        let hero = EpaValues::new(Ternary::Positive, Ternary::Positive, Ternary::Positive, 1.0).unwrap();
        let villain = EpaValues::new(Ternary::Negative, Ternary::Positive, Ternary::Positive, 1.0).unwrap();
        assert!((hero.distance(&villain) - 2.0).abs() < 1e-9);
        assert!((epa_similarity(&hero, &hero) - 1.0).abs() < 1e-9);

        let victim = EpaValues::new(Ternary::Positive, Ternary::Negative, Ternary::Negative, 1.0).unwrap();
        assert!(epa_compatible(&hero, &villain, 0.4));
        assert!(!epa_compatible(&hero, &victim, 0.5));
    }

    #[test]
    fn confidence_is_bounded() {
        assert!(matches!(
            EpaValues::new(Ternary::Neutral, Ternary::Neutral, Ternary::Neutral, 1.5),
            Err(EpaError::ConfidenceOutOfRange { .. })
        ));
        assert!(Ternary::try_from(3).is_err());
    }

    #[test]
    fn primitive_projection() {
        let epa = primitives_to_epa([("GOOD", 1.0), ("DO", 1.0), ("nonsense", 1.0)]);
        assert_eq!(epa.as_vector(), (1, 0, 1));
        assert!((epa.confidence() - 2.0 / 3.0).abs() < 1e-9);

        // MUST alone is too weak to cross the quantization cut.
        let weak = primitives_to_epa([("MUST", 1.0)]);
        assert_eq!(weak.potency, Ternary::Neutral);
    }

    #[test]
    fn type_defaults() {
        assert_eq!(entity_type_epa("Person").unwrap().activity, Ternary::Positive);
        assert!(entity_type_epa("spaceship").is_none());
    }
}
