//! Pattern-based claim parsing.
//!
//! Claims are matched against an ordered list of surface patterns; the first
//! match wins. The output is a [`ParsedClaim`], a typed triple that the
//! verifier consumes without ever seeing the regexes.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Regex patterns ──────────────────────────────────────────────────────

static RE_ATTRIBUTION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(created|wrote|invented|developed|discovered|founded|built)\s+(.+)").unwrap()
});

static RE_ATTRIBUTION_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+is\s+the\s+(creator|inventor|author|founder)\s+of\s+(.+)").unwrap()
});

static RE_LOCATION_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+is\s+(?:in|located\s+in|situated\s+in)\s+(.+)").unwrap()
});

static RE_LOCATION_CAPITAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+is\s+the\s+capital\s+of\s+(.+)").unwrap()
});

static RE_TEMPORAL_BORN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+was\s+born\s+in\s+(\d{4})").unwrap()
});

static RE_TEMPORAL_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(?:happened|occurred)\s+in\s+(\d{4})").unwrap()
});

static RE_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(?:is|was)\s+(?:a|an)\s+(.+)").unwrap()
});

static RE_RELATION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(.+?)\s+is\s+(related\s+to|associated\s+with|connected\s+to|linked\s+to|part\s+of|known\s+for)\s+(.+)",
    )
    .unwrap()
});

static RE_RELATION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(.+?)\s+(influenced|inspired|succeeded|preceded|married|visited|studied|taught|led|ruled|defeated|won)\s+(.+)",
    )
    .unwrap()
});

// ── Types ───────────────────────────────────────────────────────────────

/// Coarse claim category, reported on every verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// "X created/invented/wrote Y".
    Attribution,
    /// "X is in Y", "X is the capital of Y".
    Location,
    /// "X was born in 1879", "X happened in 1969".
    Temporal,
    /// "X is a Y".
    Property,
    /// Any other relation between two entities.
    Relation,
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attribution => "attribution",
            Self::Location => "location",
            Self::Temporal => "temporal",
            Self::Property => "property",
            Self::Relation => "relation",
        };
        f.write_str(name)
    }
}

/// Flavour of a location claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// "is in", "is located in", "is situated in".
    Within,
    /// "is the capital of".
    CapitalOf,
}

/// Flavour of a temporal claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalEvent {
    Born,
    Occurred,
}

/// A claim reduced to a typed triple. Mentions are kept verbatim (trimmed);
/// grounding decides how to normalize them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedClaim {
    Attribution {
        subject: String,
        /// Past-tense verb, lower-cased (`invented`, `wrote`, ...).
        verb: String,
        object: String,
    },
    Location {
        subject: String,
        place: String,
        kind: LocationKind,
    },
    Temporal {
        subject: String,
        event: TemporalEvent,
        year: String,
    },
    Property {
        subject: String,
        property: String,
    },
    Relation {
        subject: String,
        relation: String,
        object: String,
    },
}

impl ParsedClaim {
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Self::Attribution { .. } => ClaimType::Attribution,
            Self::Location { .. } => ClaimType::Location,
            Self::Temporal { .. } => ClaimType::Temporal,
            Self::Property { .. } => ClaimType::Property,
            Self::Relation { .. } => ClaimType::Relation,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Self::Attribution { subject, .. }
            | Self::Location { subject, .. }
            | Self::Temporal { subject, .. }
            | Self::Property { subject, .. }
            | Self::Relation { subject, .. } => subject,
        }
    }

    /// Object mention that names an entity, if the claim has one.
    ///
    /// Properties and years are matched as text, not grounded.
    pub fn object_mention(&self) -> Option<&str> {
        match self {
            Self::Attribution { object, .. } | Self::Relation { object, .. } => Some(object),
            Self::Location { place, .. } => Some(place),
            Self::Temporal { .. } | Self::Property { .. } => None,
        }
    }
}

/// Verb implied by a noun-form attribution ("the inventor of").
fn verb_for_role(role: &str) -> String {
    match role.to_lowercase().as_str() {
        "creator" => "created".into(),
        "inventor" => "invented".into(),
        "author" => "wrote".into(),
        "founder" => "founded".into(),
        other => other.into(),
    }
}

fn group(caps: &regex::Captures<'_>, i: usize) -> String {
    caps.get(i).map_or_else(String::new, |m| m.as_str().trim().to_string())
}

/// Ordered surface-pattern matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimParser;

impl ClaimParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a claim; `None` when no pattern matches.
    ///
    /// Surrounding whitespace and trailing periods are ignored; matching is
    /// case-insensitive.
    pub fn parse(&self, claim: &str) -> Option<ParsedClaim> {
        let text = claim.trim().trim_end_matches('.').trim_end();

        if let Some(c) = RE_ATTRIBUTION_VERB.captures(text) {
            return Some(ParsedClaim::Attribution {
                subject: group(&c, 1),
                verb: group(&c, 2).to_lowercase(),
                object: group(&c, 3),
            });
        }
        if let Some(c) = RE_ATTRIBUTION_NOUN.captures(text) {
            return Some(ParsedClaim::Attribution {
                subject: group(&c, 1),
                verb: verb_for_role(&group(&c, 2)),
                object: group(&c, 3),
            });
        }
        if let Some(c) = RE_LOCATION_IN.captures(text) {
            return Some(ParsedClaim::Location {
                subject: group(&c, 1),
                place: group(&c, 2),
                kind: LocationKind::Within,
            });
        }
        if let Some(c) = RE_LOCATION_CAPITAL.captures(text) {
            return Some(ParsedClaim::Location {
                subject: group(&c, 1),
                place: group(&c, 2),
                kind: LocationKind::CapitalOf,
            });
        }
        if let Some(c) = RE_TEMPORAL_BORN.captures(text) {
            return Some(ParsedClaim::Temporal {
                subject: group(&c, 1),
                event: TemporalEvent::Born,
                year: group(&c, 2),
            });
        }
        if let Some(c) = RE_TEMPORAL_EVENT.captures(text) {
            return Some(ParsedClaim::Temporal {
                subject: group(&c, 1),
                event: TemporalEvent::Occurred,
                year: group(&c, 2),
            });
        }
        if let Some(c) = RE_PROPERTY.captures(text) {
            return Some(ParsedClaim::Property {
                subject: group(&c, 1),
                property: group(&c, 2),
            });
        }
        if let Some(c) = RE_RELATION_PHRASE.captures(text).or_else(|| RE_RELATION_VERB.captures(text)) {
            let relation = group(&c, 2)
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            return Some(ParsedClaim::Relation {
                subject: group(&c, 1),
                relation,
                object: group(&c, 3),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ParsedClaim> {
        ClaimParser::new().parse(text)
    }

    #[test]
    fn attribution_verbs_and_roles() {
        assert_eq!(
            parse("Thomas Edison invented the telephone."),
            Some(ParsedClaim::Attribution {
                subject: "Thomas Edison".into(),
                verb: "invented".into(),
                object: "the telephone".into(),
            })
        );
        assert_eq!(
            parse("Alexander Graham Bell is the inventor of the telephone"),
            Some(ParsedClaim::Attribution {
                subject: "Alexander Graham Bell".into(),
                verb: "invented".into(),
                object: "the telephone".into(),
            })
        );
        let Some(ParsedClaim::Attribution { verb, .. }) = parse("Shakespeare is the AUTHOR of Hamlet") else {
            panic!("expected attribution");
        };
        assert_eq!(verb, "wrote");
    }

    #[test]
    fn location_forms() {
        assert_eq!(
            parse("Paris is the capital of France"),
            Some(ParsedClaim::Location {
                subject: "Paris".into(),
                place: "France".into(),
                kind: LocationKind::CapitalOf,
            })
        );
        let parsed = parse("  The Louvre is located in Paris  ").unwrap();
        assert_eq!(parsed.subject(), "The Louvre");
        assert_eq!(parsed.object_mention(), Some("Paris"));
        assert_eq!(parsed.claim_type(), ClaimType::Location);
    }

    #[test]
    fn temporal_before_property() {
        assert_eq!(
            parse("Albert Einstein was born in 1879"),
            Some(ParsedClaim::Temporal {
                subject: "Albert Einstein".into(),
                event: TemporalEvent::Born,
                year: "1879".into(),
            })
        );
        let Some(ParsedClaim::Temporal { event, .. }) = parse("The Moon landing happened in 1969") else {
            panic!("expected temporal");
        };
        assert_eq!(event, TemporalEvent::Occurred);
        assert_eq!(
            parse("Albert Einstein was a physicist"),
            Some(ParsedClaim::Property {
                subject: "Albert Einstein".into(),
                property: "physicist".into(),
            })
        );
    }

    #[test]
    fn residual_relations() {
        assert_eq!(
            parse("Einstein is associated with   Princeton"),
            Some(ParsedClaim::Relation {
                subject: "Einstein".into(),
                relation: "associated with".into(),
                object: "Princeton".into(),
            })
        );
        let parsed = parse("Napoleon defeated Austria").unwrap();
        assert_eq!(parsed.claim_type(), ClaimType::Relation);
        assert_eq!(parsed.object_mention(), Some("Austria"));
    }

    #[test]
    fn unmatched_claims() {
        assert_eq!(parse("Hello world"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("..."), None);
    }
}
