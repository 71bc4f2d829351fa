//! Signed hierarchical positions and tree reasoning over the five dimensions.
//!
//! Every dimension is a tree with a single zero state at its root. An entity's
//! place in that tree is stored as a materialized path from the zero state down
//! to the entity, so every query here is a walk over at most two short vectors
//! with no store access.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityProfile;
use crate::error::PositionError;

/// One of the five independent hierarchies an entity can be grounded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    /// Earth → continents → countries → cities.
    Spatial,
    /// Present → centuries → decades → years.
    Temporal,
    /// Thing → Person/Place/Event → subtypes.
    Taxonomic,
    /// Regional → Local/National/Global.
    Scale,
    /// Knowledge → fields → subfields.
    Domain,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Spatial,
        Dimension::Temporal,
        Dimension::Taxonomic,
        Dimension::Scale,
        Dimension::Domain,
    ];

    /// Upper-case name as persisted (`"SPATIAL"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spatial => "SPATIAL",
            Self::Temporal => "TEMPORAL",
            Self::Taxonomic => "TAXONOMIC",
            Self::Scale => "SCALE",
            Self::Domain => "DOMAIN",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PositionError::UnknownDimension {
                name: s.to_string(),
            })
    }
}

/// Direction of a position relative to its dimension's zero state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PathSign {
    /// More abstract than the zero state.
    Negative,
    /// The zero state itself.
    Zero,
    /// More specific than the zero state.
    Positive,
}

impl PathSign {
    /// Numeric value in {-1, 0, +1}.
    pub fn value(self) -> i64 {
        match self {
            Self::Negative => -1,
            Self::Zero => 0,
            Self::Positive => 1,
        }
    }
}

impl TryFrom<i64> for PathSign {
    type Error = PositionError;

    fn try_from(sign: i64) -> Result<Self, Self::Error> {
        match sign {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Zero),
            1 => Ok(Self::Positive),
            other => Err(PositionError::InvalidSign { sign: other }),
        }
    }
}

impl From<PathSign> for i64 {
    fn from(sign: PathSign) -> i64 {
        sign.value()
    }
}

/// An entity's signed position in one dimension tree.
///
/// Construction validates the path invariants, so a `DimensionPosition` in hand
/// always satisfies them:
///
/// - the path is non-empty (it contains at least the zero state),
/// - the first node is the zero state,
/// - sign 0 implies depth 0 and a single-node path,
/// - a non-zero sign implies `depth == path_nodes.len() - 1` and `depth > 0`.
///
/// Example for Paris: `+3:SPATIAL/Earth/Europe/France/Paris`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition", into = "RawPosition")]
pub struct DimensionPosition {
    dimension: Dimension,
    path_sign: PathSign,
    path_depth: u32,
    path_nodes: Vec<String>,
    zero_state: String,
}

/// Unvalidated wire form of [`DimensionPosition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosition {
    pub dimension: Dimension,
    pub path_sign: i64,
    pub path_depth: u32,
    pub path_nodes: Vec<String>,
    pub zero_state: String,
}

impl TryFrom<RawPosition> for DimensionPosition {
    type Error = PositionError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        let sign = PathSign::try_from(raw.path_sign)?;
        DimensionPosition::new(raw.dimension, sign, raw.path_depth, raw.path_nodes, raw.zero_state)
    }
}

impl From<DimensionPosition> for RawPosition {
    fn from(pos: DimensionPosition) -> Self {
        Self {
            dimension: pos.dimension,
            path_sign: pos.path_sign.value(),
            path_depth: pos.path_depth,
            path_nodes: pos.path_nodes,
            zero_state: pos.zero_state,
        }
    }
}

impl DimensionPosition {
    /// Create a validated position.
    pub fn new(
        dimension: Dimension,
        path_sign: PathSign,
        path_depth: u32,
        path_nodes: Vec<String>,
        zero_state: impl Into<String>,
    ) -> Result<Self, PositionError> {
        if path_nodes.is_empty() {
            return Err(PositionError::EmptyPath {
                dimension: dimension.to_string(),
            });
        }
        let zero_state = zero_state.into();
        if !same_label(&path_nodes[0], &zero_state) {
            return Err(PositionError::RootMismatch {
                dimension: dimension.to_string(),
                root: path_nodes[0].clone(),
                zero_state,
            });
        }
        match path_sign {
            PathSign::Zero if path_depth != 0 => {
                return Err(PositionError::ZeroStateDepth {
                    dimension: dimension.to_string(),
                    depth: path_depth,
                });
            }
            PathSign::Zero if path_nodes.len() != 1 => {
                return Err(PositionError::DepthMismatch {
                    dimension: dimension.to_string(),
                    depth: path_depth,
                    nodes: path_nodes.len(),
                });
            }
            PathSign::Zero => {}
            PathSign::Negative | PathSign::Positive => {
                if path_depth == 0 || path_depth as usize != path_nodes.len() - 1 {
                    return Err(PositionError::DepthMismatch {
                        dimension: dimension.to_string(),
                        depth: path_depth,
                        nodes: path_nodes.len(),
                    });
                }
            }
        }
        Ok(Self {
            dimension,
            path_sign,
            path_depth,
            path_nodes,
            zero_state,
        })
    }

    /// Position more specific than the zero state, with depth derived from the path.
    ///
    /// The first node is taken as the zero state. A single-node path is the
    /// zero state itself.
    pub fn from_path<I, S>(dimension: Dimension, nodes: I) -> Result<Self, PositionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes: Vec<String> = nodes.into_iter().map(Into::into).collect();
        let zero_state = nodes.first().cloned().ok_or_else(|| PositionError::EmptyPath {
            dimension: dimension.to_string(),
        })?;
        let depth = (nodes.len() - 1) as u32;
        let sign = if depth == 0 {
            PathSign::Zero
        } else {
            PathSign::Positive
        };
        Self::new(dimension, sign, depth, nodes, zero_state)
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn path_sign(&self) -> PathSign {
        self.path_sign
    }

    pub fn path_depth(&self) -> u32 {
        self.path_depth
    }

    /// Path from the zero state to the entity, root first.
    pub fn path_nodes(&self) -> &[String] {
        &self.path_nodes
    }

    pub fn zero_state(&self) -> &str {
        &self.zero_state
    }

    /// Signed distance from the zero state: `sign * depth`.
    pub fn signed_depth(&self) -> i64 {
        self.path_sign.value() * i64::from(self.path_depth)
    }

    /// Whether `label` (case-insensitive) is on this path.
    pub fn contains(&self, label: &str) -> bool {
        let label = label.trim();
        self.path_nodes.iter().any(|n| same_label(n, label))
    }
}

impl fmt::Display for DimensionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.path_sign {
            PathSign::Positive => "+",
            PathSign::Negative => "-",
            PathSign::Zero => "",
        };
        write!(
            f,
            "{sign}{}:{}/{}",
            self.path_depth,
            self.dimension,
            self.path_nodes.join("/")
        )
    }
}

/// Case-insensitive label equality.
pub(crate) fn same_label(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Number of leading nodes two paths share.
fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| same_label(x, y))
        .count()
}

// ---------------------------------------------------------------------------
// Tree reasoning on profiles
// ---------------------------------------------------------------------------

impl EntityProfile {
    /// Position in `dimension`, if the entity is grounded there.
    pub fn get_position(&self, dimension: Dimension) -> Option<&DimensionPosition> {
        self.positions.get(&dimension)
    }

    /// Path nodes from the zero state down to this entity. Empty without a position.
    pub fn navigate_from_zero(&self, dimension: Dimension) -> Vec<String> {
        self.get_position(dimension)
            .map(|p| p.path_nodes.clone())
            .unwrap_or_default()
    }

    /// Path nodes from this entity up to the zero state. Empty without a position.
    pub fn navigate_toward_zero(&self, dimension: Dimension) -> Vec<String> {
        let mut path = self.navigate_from_zero(dimension);
        path.reverse();
        path
    }

    /// Signed distance from the zero state, 0 without a position.
    pub fn distance_from_zero(&self, dimension: Dimension) -> i64 {
        self.get_position(dimension)
            .map_or(0, DimensionPosition::signed_depth)
    }

    /// Whether `label` appears anywhere on this entity's path in `dimension`.
    ///
    /// Used both for "is located in" (SPATIAL) and "is a kind of"
    /// (TAXONOMIC, DOMAIN) checks.
    pub fn is_descendant_of(&self, label: &str, dimension: Dimension) -> bool {
        self.get_position(dimension)
            .is_some_and(|p| p.contains(label))
    }

    /// Last node of the longest common prefix of both paths in `dimension`.
    ///
    /// `None` when either entity lacks the dimension or the roots differ.
    pub fn shared_ancestor<'a>(&'a self, other: &EntityProfile, dimension: Dimension) -> Option<&'a str> {
        let mine = self.get_position(dimension)?;
        let theirs = other.get_position(dimension)?;
        let shared = common_prefix_len(&mine.path_nodes, &theirs.path_nodes);
        if shared == 0 {
            return None;
        }
        Some(mine.path_nodes[shared - 1].as_str())
    }

    /// Steps from each entity up to their shared prefix, summed.
    ///
    /// Returns -1 when there is no shared prefix or either entity lacks the
    /// dimension. Identical paths are at distance 0.
    pub fn hierarchical_distance(&self, other: &EntityProfile, dimension: Dimension) -> i64 {
        let (Some(mine), Some(theirs)) = (self.get_position(dimension), other.get_position(dimension)) else {
            return -1;
        };
        let shared = common_prefix_len(&mine.path_nodes, &theirs.path_nodes);
        if shared == 0 {
            return -1;
        }
        ((mine.path_nodes.len() - shared) + (theirs.path_nodes.len() - shared)) as i64
    }
}
