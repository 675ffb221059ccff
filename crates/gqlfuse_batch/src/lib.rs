//! Batch composition for GraphQL.
//!
//! This crate provides:
//! - `rewrite`: Aliasing, variable renaming and prefixing of one operation
//! - `merge`: Concatenation of operations into one composite operation
//! - `namespace`: Per-item naming policies
//! - `batch`: Composing N copies of a template into one request
//! - `demux`: Splitting one response back into per-item outcomes
//! - `response`: GraphQL-over-HTTP wire types
//! - `transport`: The transport seam and the batch executor
//!
//! ```ignore
//! let template = parse_operation(CREATE_ALERT, Some("CreateAlertMutation"))?;
//! let items: Vec<_> = services
//!     .iter()
//!     .map(|svc| BatchItem::new(svc.id.clone()).with_variable("input", svc.input()))
//!     .collect();
//!
//! let result = BatchExecutor::new(transport).execute(&template, &items).await?;
//! for (service, errors) in result.failures() {
//!     report(service, errors);
//! }
//! ```

pub mod batch;
pub mod demux;
pub mod error;
pub mod merge;
pub mod namespace;
pub mod response;
pub mod rewrite;
pub mod template;
pub mod transport;

pub use batch::{compose, AliasMap, BatchConfig, BatchItem, ComposedRequest, Composer};
pub use demux::{demux, demux_with, ComposedResult, Outcome};
pub use error::{CollisionError, ComposeError, ComposeResult, ErrorCode, TransportError};
pub use merge::{merge, merge_all};
pub use namespace::{IndexedNamespace, NamespacePolicy, PrefixedNamespace};
pub use response::{ErrorInfo, GraphQLRequest, GraphQLResponse, PathSegment};
pub use rewrite::{prefix_operation, rename_variables, set_alias};
pub use template::parse_operation;
pub use transport::{BatchExecutor, Transport};
