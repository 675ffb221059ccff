//! Syntax layer for gqlfuse.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization
//! - `ast`: Immutable document model for executable documents
//! - `parser`: Recursive descent parser
//! - `formatter`: Printing documents back to query text

pub mod ast;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use formatter::{format, format_operation, FormatOptions, Formatter};
pub use lexer::Lexer;
pub use parser::{parse, ParseResult, Parser};
pub use token::{Token, TokenKind};
