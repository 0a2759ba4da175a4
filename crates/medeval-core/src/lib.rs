//! # medeval-core
//!
//! Deterministic core for medical transcription fidelity evaluation.
//!
//! This crate holds everything in the evaluation pipeline that does NOT
//! talk to a language model:
//!
//! - the severity labels and the evaluation record ([`types`])
//! - the parsing boundary turning raw model text into typed verdicts
//!   ([`parser`])
//! - the consensus rule reconciling the three domain verdicts ([`consensus`])
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same verdicts always produce the same final
//!    classification and report
//! 2. **No LLM calls, no I/O**: model invocation lives in `medeval-runtime`
//! 3. **Conservative parsing**: unparseable model output degrades to
//!    `NINGUNA`, never to `GRAVE`
//!
//! ## Example
//!
//! ```rust
//! use medeval_core::{Consensus, DomainVerdict, DomainVerdicts, Severity};
//!
//! let verdicts = DomainVerdicts {
//!     medication: DomainVerdict::new(Severity::Critical, "Celebrex → Cerebyx"),
//!     dosage: DomainVerdict::clean(),
//!     consistency: DomainVerdict::clean(),
//! };
//!
//! let outcome = Consensus::new().synthesize(&verdicts);
//! assert_eq!(outcome.final_classification, Severity::Critical);
//! ```

pub mod consensus;
pub mod parser;
pub mod types;

pub use consensus::{Consensus, ConsensusOutcome};
pub use parser::{extract_explanation, parse_severity};
pub use types::{Domain, DomainVerdict, DomainVerdicts, EvaluationRecord, Severity};
