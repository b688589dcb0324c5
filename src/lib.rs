//! # reqflow
//!
//! Client for a document-to-work-item service: upload a functional
//! specification, generate requirements artifacts from it, download them, and
//! push them to an issue tracker as work items.
//!
//! ## Features
//!
//! - **Upload**: PDF and DOCX specifications
//! - **Generate**: epics, user stories, use cases, technical design and data
//!   model documents, as DOCX or PDF
//! - **Download**: save generated documents locally
//! - **Push**: create tracker work items from what was generated
//! - **Chat**: ask an assistant about the uploaded specification
//!
//! ## Quick Start
//!
//! ```bash
//! reqflow upload spec.docx
//! reqflow generate --exclude tdd
//! reqflow download epic
//! reqflow push
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]
#![allow(clippy::future_not_send)]

pub mod client;
pub mod core;
pub mod workflow;

pub use client::{ApiError, ApiResult, Backend, HttpBackend, Operation, TimeoutPolicy};
pub use core::{Config, SessionStore};
pub use workflow::{
    ArtifactSelection, ArtifactType, Assistant, DocumentCandidate, GenerationResult,
    OutputFormat, PushOptions, PushResult, SendOutcome, ValidationError, Workflow,
    WorkflowError, WorkflowResult, WorkflowStage, WorkflowState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "reqflow";
