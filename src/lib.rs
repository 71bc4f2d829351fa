// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # wiki-grounding
//!
//! Grounds entity mentions and factual claims against a multi-dimensional
//! hierarchical knowledge base to catch generated text that contradicts
//! known facts.
//!
//! ## Architecture
//!
//! - **Position model** (`position`): signed materialized paths in five
//!   dimension trees (SPATIAL, TEMPORAL, TAXONOMIC, SCALE, DOMAIN)
//! - **Spreading activation** (`spreading`): best-first propagation through
//!   direct relations and a shared-anchor cross layer
//! - **Claim verification** (`verify`): pattern parsing, mention grounding and
//!   per-type checks with confidence-gated abstention
//! - **Storage** (`store`): the lookup contract plus in-memory and redb backends
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use wiki_grounding::store::DurableStore;
//! use wiki_grounding::verify::{ClaimVerifier, VerificationStatus};
//!
//! let store = DurableStore::open(Path::new("data/entities.redb")).unwrap();
//! let verifier = ClaimVerifier::new(&store);
//! let result = verifier.verify("Thomas Edison invented the telephone");
//! if result.effective_status() == VerificationStatus::Contradicted {
//!     println!("{result}: {}", result.correction.as_deref().unwrap_or_default());
//! }
//! ```

pub mod config;
pub mod entity;
pub mod epa;
pub mod error;
pub mod position;
pub mod spreading;
pub mod store;
pub mod verify;
