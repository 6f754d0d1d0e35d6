//! # Structex Docs
//!
//! Documentation for raise contracts and problem types.
//!
//! This crate provides:
//! - **Contract sections**: a "Raises" section listing what a function may
//!   return, appended to an existing doc string with matching indentation
//! - **Problem references**: a markdown page per problem type
//! - **Content schemas**: a JSON Schema describing a problem type's content
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use structex_docs::{extend_doc, render_problem_type, render_raises, DocsConfig};
//!
//! let config = DocsConfig::load_from("docs.toml", "STRUCTEX_DOCS")?;
//!
//! let raises = structex::contract_of("my_crate::reserve").unwrap();
//! let doc = extend_doc("Reserves space.", &render_raises(raises, &config));
//!
//! let page = render_problem_type(&INSUFFICIENT_SPACE);
//! ```
//!
//! ## Configuration
//!
//! Rendering is tuned by [`DocsConfig`], loaded in layers by
//! [`DocsConfigLoader`]: defaults, then a TOML file, then environment
//! variables.

mod config;
mod error;
mod reference;
mod render;

pub use config::{DocsConfig, DocsConfigLoader};
pub use error::{DocsError, DocsResult};
pub use reference::{content_schema, render_problem_type};
pub use render::{exception_info, extend_doc, render_raises, undent, ExceptionInfo};
