//! Static analysis of a materialized project.
//!
//! The runner shells out to the analysis binary (semgrep by default) with the
//! selected rule packs and turns whatever comes back into an
//! [`AnalysisReport`]. Availability is checked first through a [`ToolProbe`],
//! which tests replace with a [`StaticProbe`].

mod output;
mod probe;
mod runner;
mod types;

pub use output::{parse_output, ParsedOutput};
pub use probe::{CommandProbe, StaticProbe, ToolProbe, ToolStatus};
pub use runner::{build_report, AnalysisRunner, EXIT_FINDINGS, EXIT_NO_FINDINGS};
pub use types::{AnalysisIssue, AnalysisReport, Finding, Position, DEFAULT_SEVERITY};
