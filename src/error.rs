//! Rich diagnostic error types for the grounding engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Claim verification never surfaces these
//! to callers: verdicts are classification outcomes, and store failures hit
//! during verification are folded into an UNVERIFIABLE result.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the grounding engine.
#[derive(Debug, Error, Diagnostic)]
pub enum GroundingError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Epa(#[from] EpaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Spread(#[from] SpreadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("knowledge store not found: {path}")]
    #[diagnostic(
        code(grounding::store::missing),
        help(
            "The knowledge store file does not exist. Build it first with \
             `DurableStore::create`, or check the configured path."
        )
    )]
    Missing { path: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(grounding::store::io),
        help("A filesystem operation failed. Check the path and its permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(grounding::store::redb),
        help(
            "The embedded database encountered an error. The file may be corrupt \
             or written by an incompatible version; rebuild it from the source dataset."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(grounding::store::serde),
        help(
            "Failed to serialize or deserialize a stored record. \
             This usually means the store format changed between versions."
        )
    )]
    Serialization { message: String },

    #[error("malformed record for entity {entity_id}: {reason}")]
    #[diagnostic(
        code(grounding::store::malformed),
        help(
            "A persisted record violates a model invariant (for example a path depth \
             that disagrees with its node list). Fix the source data and re-import."
        )
    )]
    Malformed { entity_id: String, reason: String },

    #[error("import failed: {message}")]
    #[diagnostic(
        code(grounding::store::import),
        help("The dataset references an entity or anchor that was never declared.")
    )]
    Import { message: String },
}

// ---------------------------------------------------------------------------
// Position errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PositionError {
    #[error("path sign must be -1, 0 or +1, got {sign}")]
    #[diagnostic(
        code(grounding::position::invalid_sign),
        help("Use +1 for more specific than the zero state, -1 for more abstract, 0 at the zero state.")
    )]
    InvalidSign { sign: i64 },

    #[error("{dimension} position has an empty path")]
    #[diagnostic(
        code(grounding::position::empty_path),
        help("A path always contains at least the dimension's zero state.")
    )]
    EmptyPath { dimension: String },

    #[error("{dimension} path depth {depth} disagrees with {nodes} path nodes")]
    #[diagnostic(
        code(grounding::position::depth_mismatch),
        help("The depth of a non-zero position must equal the number of path nodes minus one.")
    )]
    DepthMismatch {
        dimension: String,
        depth: u32,
        nodes: usize,
    },

    #[error("{dimension} zero-state position must have depth 0, got {depth}")]
    #[diagnostic(
        code(grounding::position::zero_state_depth),
        help("A position with sign 0 is the zero state itself and sits at depth 0.")
    )]
    ZeroStateDepth { dimension: String, depth: u32 },

    #[error("{dimension} path starts at {root}, not at the zero state {zero_state}")]
    #[diagnostic(
        code(grounding::position::root_mismatch),
        help("Every path is rooted at its dimension's zero state; prepend the zero state or fix the stored root.")
    )]
    RootMismatch {
        dimension: String,
        root: String,
        zero_state: String,
    },

    #[error("unknown dimension: {name}")]
    #[diagnostic(
        code(grounding::position::unknown_dimension),
        help("Valid dimensions are SPATIAL, TEMPORAL, TAXONOMIC, SCALE and DOMAIN.")
    )]
    UnknownDimension { name: String },
}

// ---------------------------------------------------------------------------
// EPA errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EpaError {
    #[error("ternary value must be -1, 0 or +1, got {value}")]
    #[diagnostic(
        code(grounding::epa::invalid_ternary),
        help("Evaluation, potency and activity are balanced-ternary values.")
    )]
    InvalidTernary { value: i64 },

    #[error("EPA confidence {confidence} is outside [0, 1]")]
    #[diagnostic(
        code(grounding::epa::confidence),
        help("Clamp the confidence into the unit interval before storing it.")
    )]
    ConfidenceOutOfRange { confidence: f64 },
}

// ---------------------------------------------------------------------------
// Spreading activation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SpreadError {
    #[error("spreading activation requires at least one source entity")]
    #[diagnostic(
        code(grounding::spread::no_sources),
        help("Pass one or more (entity id, initial activation) pairs.")
    )]
    NoSources,

    #[error("invalid spreading configuration: {message}")]
    #[diagnostic(
        code(grounding::spread::invalid_config),
        help("Check decay, threshold and limit values in the spreading configuration.")
    )]
    InvalidConfig { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    #[diagnostic(
        code(grounding::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {path}")]
    #[diagnostic(
        code(grounding::config::write),
        help("Check that the parent directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(grounding::config::parse),
        help("The config file must be valid TOML with [spreading] and [verifier] tables.")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize config: {message}")]
    #[diagnostic(
        code(grounding::config::serialize),
        help("The in-memory configuration could not be rendered as TOML. Nothing was written.")
    )]
    Serialize { message: String },

    #[error("invalid config value for {field}: {message}")]
    #[diagnostic(
        code(grounding::config::invalid),
        help("Adjust the value so it lies in the documented range.")
    )]
    Invalid { field: String, message: String },
}

/// Convenience result type for engine-level operations.
pub type GroundingResult<T> = std::result::Result<T, GroundingError>;
