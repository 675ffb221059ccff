//! Core utilities for gqlfuse.
//!
//! - `span`: byte-offset source locations
//! - `diagnostics`: error and warning reporting for GraphQL source text

pub mod diagnostics;
pub mod span;

pub use diagnostics::{codes, Diagnostic, DiagnosticBag, DiagnosticSeverity, Label};
pub use span::Span;
