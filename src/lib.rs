//! Securegen - secure code generation gate.
//!
//! Securegen turns a natural-language prompt into generated source code and a
//! static security analysis report. The generated blob is unwrapped from its
//! Markdown fence, split into files at `=== FILE: <path> ===` markers, written
//! to a private temporary project, and scanned with rule packs chosen for the
//! languages found in it.
//!
//! # Architecture
//!
//! - `blob`: fence stripping, manifest splitting and materialization
//! - `detect`: language detection and rule-pack selection
//! - `analysis`: running the analysis tool and normalizing its output
//! - `collab`: sanitizer, enhancer and generator collaborators
//! - `pipeline`: stage sequencing, cancellation and the response document
//! - `config`: YAML configuration
//! - `report`: Output formatting (pretty, JSON, SARIF)
//! - `telemetry`: tracing setup for the binary

pub mod analysis;
pub mod blob;
pub mod cli;
pub mod collab;
pub mod config;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod telemetry;

pub use analysis::{AnalysisReport, AnalysisRunner, Finding};
pub use blob::{strip_fence, FileManifest, MaterializedProject};
pub use config::Config;
pub use detect::{detect_languages, select_packs, LanguageSet, RulePackList, RulePackSelector};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineResponse, PipelineStage};
