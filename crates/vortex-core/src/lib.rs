//! # vortex-core
//!
//! Conversion workflow engine for the VORTEX harness.
//!
//! This crate provides:
//! - The test case data model and its cross-field validation
//! - The CSV case reader
//! - The conversion workflow state machine driving the external application
//!   through a [`UiDriver`](vortex_proto::UiDriver)
//! - The completion-dialog polling monitor
//! - Sequential batch execution with cooldown pauses and progress events
//! - Run report aggregation and resource sampling

mod case;
mod config;
mod monitor;
mod reader;
mod report;
mod result;
mod runner;
mod sampler;
mod workflow;

pub use case::{OutputFormat, OutputType, Texture, TriState, TestCaseConfig};
pub use config::{ConfigError, HarnessConfig, UiLabels};
pub use monitor::{ConversionMonitor, DismissStrategy, MonitorOutcome};
pub use reader::{CaseReader, ValidationError};
pub use report::{ConversionStats, RunReport};
pub use result::{CaseResult, CaseStatus, StepRecord, StepStatus};
pub use runner::{BatchRunner, ProgressCallback, ProgressEvent};
pub use sampler::{ResourceSample, SamplerHandle};
pub use workflow::{ConversionWorkflow, StepError, WorkflowState};
