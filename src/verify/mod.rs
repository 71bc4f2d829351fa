//! Claim verification with confidence-gated abstention.
//!
//! [`ClaimVerifier::verify`] parses a claim into a [`ParsedClaim`], grounds
//! its mentions through the store, then applies a per-type strategy:
//!
//! - **attribution**: the subject's outgoing relations, then the object's
//!   incoming relations for a different holder,
//! - **location**: the SPATIAL hierarchy first, then location relations and
//!   GEOGRAPHY anchors,
//! - **temporal**: the TEMPORAL hierarchy, then date-like properties,
//! - **property**: the TAXONOMIC and DOMAIN hierarchies, then description,
//!   properties and KNOWN_FOR anchors,
//! - **relation**: spreading activation from the subject.
//!
//! Verification never fails. Every outcome, including store failures, is a
//! [`VerificationResult`]; [`VerificationResult::effective_status`] withholds
//! SUPPORTED and CONTRADICTED verdicts whose confidence is below the
//! configured threshold.

pub mod ground;
pub mod parse;
pub mod relations;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::EntityProfile;
use crate::error::{ConfigError, GroundingResult};
use crate::position::{Dimension, same_label};
use crate::spreading::{SpreadingActivation, SpreadingConfig};
use crate::store::{Direction, KnowledgeStore};

pub use ground::Grounder;
pub use parse::{ClaimParser, ClaimType, LocationKind, ParsedClaim, TemporalEvent};
pub use relations::{RelationMatch, RelationMatcher, normalize_relation};

static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Verdict of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Stored knowledge confirms the claim.
    Supported,
    /// Stored knowledge conflicts with the claim.
    Contradicted,
    /// Not enough evidence either way.
    Unverifiable,
    /// Indirect evidence suggests the claim.
    Plausible,
}

impl VerificationStatus {
    fn glyph(self) -> char {
        match self {
            Self::Supported => '✓',
            Self::Contradicted => '✗',
            Self::Unverifiable => '?',
            Self::Plausible => '~',
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Supported => "SUPPORTED",
            Self::Contradicted => "CONTRADICTED",
            Self::Unverifiable => "UNVERIFIABLE",
            Self::Plausible => "PLAUSIBLE",
        };
        f.write_str(name)
    }
}

/// Verifier tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// SUPPORTED/CONTRADICTED below this confidence are reported as UNVERIFIABLE.
    pub confidence_threshold: f64,
    /// Accept the generic `RelatedTo` relation as attribution support.
    pub generic_relation_fallback: bool,
    /// Confidence of a SUPPORTED verdict resting only on `RelatedTo`.
    pub generic_match_confidence: f64,
    /// Confidence reported when the subject cannot be grounded.
    pub ungrounded_subject_confidence: f64,
    /// Candidates fetched per grounding query.
    pub search_limit: usize,
    /// Outgoing relations scanned per subject.
    pub relation_scan_limit: usize,
    /// Incoming relations scanned when looking for a different holder.
    pub incoming_scan_limit: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            generic_relation_fallback: true,
            generic_match_confidence: 0.9,
            ungrounded_subject_confidence: 0.0,
            search_limit: 5,
            relation_scan_limit: 100,
            incoming_scan_limit: 50,
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("generic_match_confidence", self.generic_match_confidence),
            ("ungrounded_subject_confidence", self.ungrounded_subject_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field: format!("verifier.{field}"),
                    message: format!("must be in [0, 1], got {value}"),
                });
            }
        }
        if self.search_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "verifier.search_limit".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Outcome of verifying one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub claim: String,
    /// Raw verdict, before the confidence gate.
    pub status: VerificationStatus,
    pub claim_type: Option<ClaimType>,
    pub confidence: f64,
    pub subject: Option<EntityProfile>,
    pub object: Option<EntityProfile>,
    pub supporting_evidence: Vec<String>,
    pub contradicting_evidence: Vec<String>,
    /// What the stored knowledge says instead, for contradictions.
    pub correction: Option<String>,
    /// Why no confident verdict was reached.
    pub abstention_reason: Option<String>,
    confidence_threshold: f64,
}

impl VerificationResult {
    fn new(claim: &str, status: VerificationStatus, confidence: f64) -> Self {
        Self {
            claim: claim.to_string(),
            status,
            claim_type: None,
            confidence,
            subject: None,
            object: None,
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
            correction: None,
            abstention_reason: None,
            confidence_threshold: VerifierConfig::default().confidence_threshold,
        }
    }

    fn typed(mut self, claim_type: ClaimType) -> Self {
        self.claim_type = Some(claim_type);
        self
    }

    fn about(mut self, subject: &EntityProfile, object: Option<&EntityProfile>) -> Self {
        self.subject = Some(subject.clone());
        self.object = object.cloned();
        self
    }

    fn supported_by(mut self, evidence: impl Into<String>) -> Self {
        self.supporting_evidence.push(evidence.into());
        self
    }

    fn contradicted_by(mut self, evidence: impl Into<String>) -> Self {
        self.contradicting_evidence.push(evidence.into());
        self
    }

    fn corrected(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    fn abstain(mut self, reason: impl Into<String>) -> Self {
        self.abstention_reason = Some(reason.into());
        self
    }

    /// Whether the confidence clears the threshold.
    pub fn is_confident(&self) -> bool {
        self.confidence >= self.confidence_threshold
    }

    /// Status after the confidence gate. Only SUPPORTED and CONTRADICTED are
    /// ever downgraded.
    pub fn effective_status(&self) -> VerificationStatus {
        match self.status {
            VerificationStatus::Supported | VerificationStatus::Contradicted if !self.is_confident() => {
                VerificationStatus::Unverifiable
            }
            status => status,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.effective_status().glyph(), self.claim)?;
        if !self.is_confident() {
            write!(f, " (conf={:.2})", self.confidence)?;
        }
        Ok(())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn hierarchy_evidence(profile: &EntityProfile, dimension: Dimension) -> String {
    format!("{dimension} hierarchy: {}", profile.navigate_from_zero(dimension).join(" > "))
}

/// Property keys that hold dates for an event kind.
fn is_date_key(key: &str, event: TemporalEvent) -> bool {
    let key = key.to_lowercase();
    let hints: &[&str] = match event {
        TemporalEvent::Born => &["birth", "born"],
        TemporalEvent::Occurred => &["date", "year", "time", "inception", "occurred", "happened"],
    };
    hints.iter().any(|h| key.contains(h))
}

/// Verifies free-text claims against a knowledge store.
pub struct ClaimVerifier<S> {
    engine: SpreadingActivation<S>,
    parser: ClaimParser,
    config: VerifierConfig,
}

impl<S: KnowledgeStore> ClaimVerifier<S> {
    /// Verifier with default verifier and spreading configuration.
    pub fn new(store: S) -> Self {
        Self {
            engine: SpreadingActivation::new(store),
            parser: ClaimParser::new(),
            config: VerifierConfig::default(),
        }
    }

    /// Verifier with validated configuration.
    pub fn with_config(store: S, config: VerifierConfig, spreading: SpreadingConfig) -> GroundingResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: SpreadingActivation::with_config(store, spreading)?,
            parser: ClaimParser::new(),
            config,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    /// Verify one claim.
    pub fn verify(&self, claim: &str) -> VerificationResult {
        let mut result = match self.parser.parse(claim) {
            None => VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.0)
                .abstain("claim does not match any known pattern"),
            Some(parsed) => match self.verify_parsed(claim, &parsed) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, claim, "knowledge store failure during verification");
                    VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.0)
                        .typed(parsed.claim_type())
                        .abstain(format!("knowledge store error: {e}"))
                }
            },
        };

        result.confidence_threshold = self.config.confidence_threshold;
        if result.abstention_reason.is_none() && result.effective_status() != result.status {
            result.abstention_reason = Some(format!(
                "confidence {:.2} is below the {:.2} threshold",
                result.confidence, self.config.confidence_threshold
            ));
        }

        tracing::debug!(
            claim,
            status = %result.status,
            effective = %result.effective_status(),
            confidence = result.confidence,
            "verified claim"
        );
        result
    }

    /// Verify several claims in order.
    pub fn verify_batch<I, T>(&self, claims: I) -> Vec<VerificationResult>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        claims.into_iter().map(|c| self.verify(c.as_ref())).collect()
    }

    fn verify_parsed(&self, claim: &str, parsed: &ParsedClaim) -> GroundingResult<VerificationResult> {
        let grounder = Grounder::new(self.store(), self.config.search_limit);
        let Some(subject) = grounder.ground(parsed.subject())? else {
            return Ok(VerificationResult::new(
                claim,
                VerificationStatus::Unverifiable,
                self.config.ungrounded_subject_confidence,
            )
            .typed(parsed.claim_type())
            .abstain(format!("could not ground subject \"{}\"", parsed.subject())));
        };
        let object = match parsed.object_mention() {
            Some(mention) => grounder.ground(mention)?,
            None => None,
        };

        let result = match parsed {
            ParsedClaim::Attribution { verb, object: mention, .. } => {
                self.verify_attribution(claim, &subject, verb, mention, object.as_ref())?
            }
            ParsedClaim::Location { place, kind, .. } => {
                self.verify_location(claim, &subject, place, *kind, object.as_ref())?
            }
            ParsedClaim::Temporal { event, year, .. } => self.verify_temporal(claim, &subject, *event, year),
            ParsedClaim::Property { property, .. } => self.verify_property(claim, &subject, property)?,
            ParsedClaim::Relation { .. } => self.verify_relation(claim, &subject, object.as_ref())?,
        };
        Ok(result.typed(parsed.claim_type()))
    }

    fn verify_attribution(
        &self,
        claim: &str,
        subject: &EntityProfile,
        verb: &str,
        object_mention: &str,
        object: Option<&EntityProfile>,
    ) -> GroundingResult<VerificationResult> {
        let matcher = RelationMatcher::for_verb(verb, self.config.generic_relation_fallback);
        let object_text = ground::strip_article(object_mention).to_lowercase();
        let names_object = |profile: &EntityProfile| {
            object.is_some_and(|o| o.id() == profile.id())
                || (!object_text.is_empty() && profile.label().to_lowercase().contains(&object_text))
        };

        let mut specific = Vec::new();
        let mut generic = Vec::new();
        for rel in self.store().get_related(
            subject.id().as_str(),
            None,
            Direction::Outgoing,
            self.config.relation_scan_limit,
        )? {
            let kind = matcher.classify(&rel.relation);
            if kind == RelationMatch::None || !names_object(&rel.profile) {
                continue;
            }
            let evidence = format!("{}: {}", rel.relation, rel.profile.label());
            match kind {
                RelationMatch::Specific => specific.push(evidence),
                _ => generic.push(format!("{evidence} (generic)")),
            }
        }

        if !specific.is_empty() {
            let mut result = VerificationResult::new(claim, VerificationStatus::Supported, 0.9).about(subject, object);
            result.supporting_evidence = specific;
            return Ok(result);
        }

        if let Some(object) = object {
            let incoming = self.store().get_related(
                object.id().as_str(),
                None,
                Direction::Incoming,
                self.config.incoming_scan_limit,
            )?;
            if let Some(holder) = incoming
                .iter()
                .find(|rel| matcher.matches_specific(rel.base_relation()) && rel.profile.id() != subject.id())
            {
                let correction = format!(
                    "{} was {} by {}",
                    object_mention.trim(),
                    relations::participle(verb),
                    holder.profile.label()
                );
                return Ok(
                    VerificationResult::new(claim, VerificationStatus::Contradicted, 0.85)
                        .about(subject, Some(object))
                        .contradicted_by(format!("{}: {}", holder.base_relation(), holder.profile.label()))
                        .corrected(capitalize(&correction)),
                );
            }
        }

        if !generic.is_empty() {
            let mut result = VerificationResult::new(
                claim,
                VerificationStatus::Supported,
                self.config.generic_match_confidence,
            )
            .about(subject, object);
            result.supporting_evidence = generic;
            return Ok(result);
        }

        Ok(VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.4)
            .about(subject, object)
            .abstain(format!("no {verb} relation links the subject to \"{object_mention}\"")))
    }

    fn verify_location(
        &self,
        claim: &str,
        subject: &EntityProfile,
        place_mention: &str,
        kind: LocationKind,
        object: Option<&EntityProfile>,
    ) -> GroundingResult<VerificationResult> {
        let place = ground::strip_article(place_mention);
        let within = subject.is_descendant_of(place, Dimension::Spatial)
            || object.is_some_and(|o| subject.is_descendant_of(o.label(), Dimension::Spatial));

        if within {
            let mut result = VerificationResult::new(claim, VerificationStatus::Supported, 0.95)
                .about(subject, object)
                .supported_by(hierarchy_evidence(subject, Dimension::Spatial));
            if let (LocationKind::CapitalOf, Some(object)) = (kind, object) {
                let capital = self.store().get_related(
                    subject.id().as_str(),
                    None,
                    Direction::Outgoing,
                    self.config.relation_scan_limit,
                )?;
                if let Some(rel) = capital
                    .iter()
                    .find(|r| r.profile.id() == object.id() && normalize_relation(&r.relation) == "capitalof")
                {
                    result = result.supported_by(format!("{}: {}", rel.relation, rel.profile.label()));
                }
            }
            return Ok(result);
        }

        if let Some(position) = subject.get_position(Dimension::Spatial) {
            let nodes = position.path_nodes();
            let ancestors = match nodes.split_last() {
                Some((last, rest)) if same_label(last, subject.label()) => rest,
                _ => nodes,
            };
            let tail = &ancestors[ancestors.len().saturating_sub(3)..];
            let mut result = VerificationResult::new(claim, VerificationStatus::Contradicted, 0.8)
                .about(subject, object)
                .contradicted_by(hierarchy_evidence(subject, Dimension::Spatial));
            if !tail.is_empty() {
                result = result.corrected(format!("{} is located in {}", subject.label(), tail.join(" > ")));
            }
            return Ok(result);
        }

        let place_lower = place.to_lowercase();
        let related = self.store().get_related(
            subject.id().as_str(),
            None,
            Direction::Outgoing,
            self.config.relation_scan_limit,
        )?;
        for rel in related.iter().filter(|r| relations::is_location_relation(&r.relation)) {
            if object.is_some_and(|o| o.id() == rel.profile.id()) {
                return Ok(VerificationResult::new(claim, VerificationStatus::Supported, 0.85)
                    .about(subject, object)
                    .supported_by(format!("{}: {} (exact match)", rel.relation, rel.profile.label())));
            }
            if !place_lower.is_empty() && rel.profile.label().to_lowercase().contains(&place_lower) {
                return Ok(VerificationResult::new(claim, VerificationStatus::Supported, 0.75)
                    .about(subject, object)
                    .supported_by(format!("{}: {}", rel.relation, rel.profile.label())));
            }
        }

        if let Some(anchor) = self
            .store()
            .get_entity_anchors(subject.id().as_str())?
            .into_iter()
            .find(|a| a.in_category("GEOGRAPHY") && a.label.to_lowercase().contains(&place_lower))
        {
            return Ok(VerificationResult::new(claim, VerificationStatus::Plausible, 0.6)
                .about(subject, object)
                .supported_by(format!("Geographic anchor: {}", anchor.label)));
        }

        Ok(VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.3)
            .about(subject, object)
            .abstain("no spatial position, location relation or geographic anchor for the subject"))
    }

    fn verify_temporal(
        &self,
        claim: &str,
        subject: &EntityProfile,
        event: TemporalEvent,
        year: &str,
    ) -> VerificationResult {
        if subject.is_descendant_of(year, Dimension::Temporal) {
            return VerificationResult::new(claim, VerificationStatus::Supported, 0.9)
                .about(subject, None)
                .supported_by(hierarchy_evidence(subject, Dimension::Temporal));
        }

        let dated: Vec<_> = subject
            .properties
            .iter()
            .filter(|(key, _)| is_date_key(key, event))
            .collect();

        if let Some((key, value)) = dated.iter().find(|(_, v)| v.mentions(year)) {
            return VerificationResult::new(claim, VerificationStatus::Supported, 0.8)
                .about(subject, None)
                .supported_by(format!("{key}: {value}"));
        }

        for (key, value) in &dated {
            let text = value.to_string();
            let Some(other) = RE_YEAR.captures(&text).and_then(|c| c.get(1)) else {
                continue;
            };
            let phrase = match event {
                TemporalEvent::Born => "was born in",
                TemporalEvent::Occurred => "happened in",
            };
            return VerificationResult::new(claim, VerificationStatus::Contradicted, 0.75)
                .about(subject, None)
                .contradicted_by(format!("{key}: {value}"))
                .corrected(format!("{} {phrase} {}", subject.label(), other.as_str()));
        }

        VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.3)
            .about(subject, None)
            .abstain("no temporal position or dated property for the subject")
    }

    fn verify_property(
        &self,
        claim: &str,
        subject: &EntityProfile,
        property: &str,
    ) -> GroundingResult<VerificationResult> {
        let property = property.trim();
        for (dimension, confidence) in [(Dimension::Taxonomic, 0.9), (Dimension::Domain, 0.85)] {
            if subject.is_descendant_of(property, dimension) {
                return Ok(VerificationResult::new(claim, VerificationStatus::Supported, confidence)
                    .about(subject, None)
                    .supported_by(hierarchy_evidence(subject, dimension)));
            }
        }

        let needle = property.to_lowercase();
        if let Some(description) = subject
            .entity
            .description
            .as_deref()
            .filter(|d| d.to_lowercase().contains(&needle))
        {
            return Ok(VerificationResult::new(claim, VerificationStatus::Supported, 0.8)
                .about(subject, None)
                .supported_by(format!("Description: {description}")));
        }

        if let Some((key, value)) = subject.properties.iter().find(|(_, v)| v.mentions(property)) {
            return Ok(VerificationResult::new(claim, VerificationStatus::Supported, 0.75)
                .about(subject, None)
                .supported_by(format!("{key}: {value}")));
        }

        if let Some(anchor) = self
            .store()
            .get_entity_anchors(subject.id().as_str())?
            .into_iter()
            .find(|a| a.in_category("KNOWN_FOR") && a.label.to_lowercase().contains(&needle))
        {
            return Ok(VerificationResult::new(claim, VerificationStatus::Plausible, 0.65)
                .about(subject, None)
                .supported_by(format!("Known for: {}", anchor.label)));
        }

        Ok(VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.3)
            .about(subject, None)
            .abstain(format!("nothing about the subject mentions \"{property}\"")))
    }

    fn verify_relation(
        &self,
        claim: &str,
        subject: &EntityProfile,
        object: Option<&EntityProfile>,
    ) -> GroundingResult<VerificationResult> {
        let Some(object) = object else {
            return Ok(VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.2)
                .about(subject, None)
                .abstain("could not ground the object"));
        };

        let reached = self.engine.spread(subject.id().as_str(), 1.0)?;
        if let Some(hit) = reached.iter().find(|r| r.id() == object.id()) {
            let path: Vec<&str> = hit.path.iter().map(|id| id.as_str()).collect();
            return Ok(VerificationResult::new(claim, VerificationStatus::Plausible, hit.activation)
                .about(subject, Some(object))
                .supported_by(format!("Activation path: {}", path.join(" -> "))));
        }

        Ok(VerificationResult::new(claim, VerificationStatus::Unverifiable, 0.3)
            .about(subject, Some(object))
            .abstain("object not reached by spreading activation from the subject"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, PropertyValue};
    use crate::position::DimensionPosition;
    use std::collections::BTreeMap;

    use crate::error::StoreError;
    use crate::store::{
        AnchorId, AnchorLink, AnchorMember, KnowledgeBase, MemStore, RelatedEntity, SearchFilter, StoreResult,
    };

    fn store() -> MemStore {
        let mut kb = KnowledgeBase::new();
        kb.add_entity(
            EntityProfile::new(Entity::new("Q937", "Albert Einstein").with_description("German-born theoretical physicist"))
                .with_position(DimensionPosition::from_path(Dimension::Taxonomic, ["Thing", "Person", "Scientist"]).unwrap())
                .with_position(DimensionPosition::from_path(Dimension::Domain, ["Knowledge", "Science", "Physics"]).unwrap())
                .with_property("date_of_birth", "14 March 1879")
                .with_property("awards", PropertyValue::List(vec!["Nobel Prize in Physics".into()])),
        )
        .add_entity(EntityProfile::new(Entity::new("Q1", "Ulm")))
        .add_entity(EntityProfile::new(Entity::new("Q2", "Princeton")))
        .add_entity(EntityProfile::new(Entity::new("Q3", "Relativity")))
        .link("Q937", "RelatedTo", "Q3", 1.0)
        .link("Q937", "born_in", "Q1", 1.0)
        .link("Q1", "AtLocation", "Q2", 1.0)
        .anchor(1, "Theory of relativity", Some("KNOWN_FOR"))
        .anchor(2, "Swabia", Some("GEOGRAPHY"))
        .attach("Q937", 1, 1.0)
        .attach("Q1", 2, 1.0);
        MemStore::from_knowledge_base(kb).unwrap()
    }

    #[test]
    fn unparseable_claim_abstains_with_zero_confidence() {
        let verifier = ClaimVerifier::new(store());
        let result = verifier.verify("Colourless green ideas sleep furiously");
        assert_eq!(result.status, VerificationStatus::Unverifiable);
        assert_eq!(result.confidence, 0.0);
        assert!(result.claim_type.is_none());
        assert!(result.abstention_reason.is_some());
    }

    #[test]
    fn property_checks_hierarchies_then_text() {
        let verifier = ClaimVerifier::new(store());

        let r = verifier.verify("Albert Einstein is a scientist");
        assert_eq!(r.status, VerificationStatus::Supported);
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.supporting_evidence, vec!["TAXONOMIC hierarchy: Thing > Person > Scientist"]);

        let r = verifier.verify("Albert Einstein was a physics");
        assert_eq!(r.confidence, 0.85);

        let r = verifier.verify("Einstein is a theoretical physicist");
        assert_eq!(r.confidence, 0.8);

        let r = verifier.verify("Einstein is a Nobel Prize in Physics");
        assert_eq!(r.confidence, 0.75);

        let r = verifier.verify("Einstein is a theory of relativity");
        assert_eq!(r.status, VerificationStatus::Plausible);
        assert_eq!(r.confidence, 0.65);

        let r = verifier.verify("Einstein is a chef");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
        assert_eq!(r.confidence, 0.3);
    }

    #[test]
    fn temporal_claims_use_dated_properties() {
        let verifier = ClaimVerifier::new(store());

        let r = verifier.verify("Albert Einstein was born in 1879");
        assert_eq!(r.status, VerificationStatus::Supported);
        assert_eq!(r.claim_type, Some(ClaimType::Temporal));
        assert_eq!(r.confidence, 0.8);

        let r = verifier.verify("Albert Einstein was born in 1900");
        assert_eq!(r.status, VerificationStatus::Contradicted);
        assert_eq!(r.correction.as_deref(), Some("Albert Einstein was born in 1879"));
        assert_eq!(r.effective_status(), VerificationStatus::Contradicted);

        let r = verifier.verify("Ulm was born in 1879");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
    }

    #[test]
    fn generic_relation_support_is_explicit() {
        let r = ClaimVerifier::new(store()).verify("Albert Einstein created relativity");
        assert_eq!(r.status, VerificationStatus::Supported);
        assert_eq!(r.supporting_evidence, vec!["RelatedTo: Relativity (generic)"]);

        let strict = VerifierConfig {
            generic_relation_fallback: false,
            ..Default::default()
        };
        let verifier = ClaimVerifier::with_config(store(), strict, SpreadingConfig::default()).unwrap();
        let r = verifier.verify("Albert Einstein created relativity");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
        assert_eq!(r.confidence, 0.4);
    }

    #[test]
    fn low_confidence_generic_support_is_gated() {
        let config = VerifierConfig {
            generic_match_confidence: 0.5,
            ..Default::default()
        };
        let verifier = ClaimVerifier::with_config(store(), config, SpreadingConfig::default()).unwrap();
        let r = verifier.verify("Albert Einstein created relativity");
        assert_eq!(r.status, VerificationStatus::Supported);
        assert!(!r.is_confident());
        assert_eq!(r.effective_status(), VerificationStatus::Unverifiable);
        assert!(r.abstention_reason.unwrap().contains("below"));
    }

    #[test]
    fn location_without_spatial_position_uses_relations_and_anchors() {
        let verifier = ClaimVerifier::new(store());

        let r = verifier.verify("Ulm is in Princeton");
        assert_eq!(r.status, VerificationStatus::Supported);
        assert_eq!(r.confidence, 0.85);
        assert_eq!(r.supporting_evidence, vec!["AtLocation: Princeton (exact match)"]);

        let r = verifier.verify("Ulm is in Swabia");
        assert_eq!(r.status, VerificationStatus::Plausible);
        assert_eq!(r.confidence, 0.6);

        let r = verifier.verify("Ulm is located in Atlantis");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
        assert_eq!(r.confidence, 0.3);
    }

    #[test]
    fn relation_claims_use_spreading_activation() {
        let verifier = ClaimVerifier::new(store());

        let r = verifier.verify("Albert Einstein visited Princeton");
        assert_eq!(r.claim_type, Some(ClaimType::Relation));
        assert_eq!(r.status, VerificationStatus::Plausible);
        assert!((r.confidence - 0.7 * 0.7 * 0.7 * 0.5).abs() < 1e-9);
        assert_eq!(r.supporting_evidence, vec!["Activation path: Q937 -> Q1 -> Q2"]);

        let r = verifier.verify("Albert Einstein married Nobody Known");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
        assert_eq!(r.confidence, 0.2);
    }

    #[test]
    fn display_uses_effective_status() {
        let verifier = ClaimVerifier::new(store());
        assert_eq!(
            verifier.verify("Albert Einstein is a scientist").to_string(),
            "[✓] Albert Einstein is a scientist"
        );
        assert_eq!(
            verifier.verify("Einstein is a chef").to_string(),
            "[?] Einstein is a chef (conf=0.30)"
        );
    }

    #[test]
    fn batch_preserves_order() {
        let verifier = ClaimVerifier::new(store());
        let results = verifier.verify_batch(["Einstein is a chef", "Albert Einstein is a scientist"]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].status, VerificationStatus::Supported);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = VerifierConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(ClaimVerifier::with_config(store(), config, SpreadingConfig::default()).is_err());
    }

    /// Store whose label lookups always fail.
    struct BrokenStore;

    fn broken<T>() -> StoreResult<T> {
        Err(StoreError::Redb {
            message: "table labels: storage file truncated".into(),
        })
    }

    impl KnowledgeStore for BrokenStore {
        fn get(&self, _id: &str) -> StoreResult<Option<EntityProfile>> {
            Ok(None)
        }

        fn get_by_title(&self, _title: &str) -> StoreResult<Option<EntityProfile>> {
            Ok(None)
        }

        fn search_filtered(&self, _label: &str, _limit: usize, _filter: SearchFilter) -> StoreResult<Vec<EntityProfile>> {
            broken()
        }

        fn search_exact(&self, _label: &str, _limit: usize) -> StoreResult<Vec<EntityProfile>> {
            broken()
        }

        fn get_related(
            &self,
            _id: &str,
            _relation: Option<&str>,
            _direction: Direction,
            _limit: usize,
        ) -> StoreResult<Vec<RelatedEntity>> {
            Ok(Vec::new())
        }

        fn get_entity_anchors(&self, _id: &str) -> StoreResult<Vec<AnchorLink>> {
            Ok(Vec::new())
        }

        fn get_entities_with_anchor(&self, _anchor: AnchorId, _limit: usize) -> StoreResult<Vec<AnchorMember>> {
            Ok(Vec::new())
        }

        fn get_zero_state(&self, _dimension: Dimension) -> StoreResult<Option<String>> {
            Ok(None)
        }

        fn get_all_zero_states(&self) -> StoreResult<BTreeMap<Dimension, String>> {
            Ok(BTreeMap::new())
        }

        fn count(&self, _max_vital_level: Option<u8>) -> StoreResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn store_failure_becomes_an_abstention() {
        let verifier = ClaimVerifier::new(BrokenStore);
        let r = verifier.verify("Paris is in France");
        assert_eq!(r.status, VerificationStatus::Unverifiable);
        assert_eq!(r.effective_status(), VerificationStatus::Unverifiable);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.claim_type, Some(ClaimType::Location));
        assert!(r.subject.is_none());
        let reason = r.abstention_reason.unwrap();
        assert!(reason.starts_with("knowledge store error:"), "{reason}");
        assert!(reason.contains("storage file truncated"), "{reason}");
    }
}
