//! # Structex
//!
//! **Structured exceptions for Rust**
//!
//! Structex gives errors a shape:
//!
//! - **Typed content** – every problem type declares named, typed, documented
//!   fields, validated when the problem is created
//! - **RFC 7807 wire format** – problems serialize to `application/problem+json`
//!   and decode back to the right type by their `type` discriminator
//! - **Raise contracts** – `#[raises(...)]` declares which errors a function
//!   may return and turns anything else into a `BadExceptionBug`
//! - **Two roots** – [`ERROR`](roots::ERROR) for conditions callers can act on,
//!   [`BUG`](roots::BUG) for defects that are never converted or handled
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use structex::prelude::*;
//!
//! declare_problem! {
//!     /// Raised when a filesystem has insufficient space.
//!     pub static INSUFFICIENT_SPACE: InsufficientSpace(ERROR) {
//!         status = 507;
//!         detail = "Filesystem {path} has only {avail} bytes free, need {need}";
//!         path: Str => "The filesystem mount point";
//!         avail: Int => "Number of bytes free on the filesystem";
//!         need: Int => "Number of bytes needed";
//!     }
//! }
//!
//! #[raises(INSUFFICIENT_SPACE)]
//! fn reserve(path: &str, need: i64) -> Result<(), Exception> {
//!     let avail = 1024;
//!     if avail < need {
//!         return Err(problem!(INSUFFICIENT_SPACE, path = path, avail = avail, need = need)?.into());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! structex-core       field specs, schemas, problem types, wire format, contracts
//! structex-macros     #[raises(...)]
//! structex-docs       rendered documentation for contracts and problem types
//! structex-telemetry  logging initialisation
//! structex-test       scripted raisers for tests (dev-dependency)
//! ```

#![doc(html_root_url = "https://docs.rs/structex/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use structex_core as core;

pub use structex_core::{
    field, json, kind, problem, registry, response, roots, schema, substitute, template,
};

// Raise contracts: the module and the attribute macro share a name
pub use structex_core::raises;
pub use structex_macros::raises;

#[cfg(feature = "fixtures")]
pub use structex_core::fixtures;

// `problem` above brings in both the module and the `problem!` macro
pub use structex_core::declare_problem;

pub use structex_core::{
    contract_of, lookup_contract, may_raise, may_raise_named, Allow, AmbiguousContract,
    AttributeError, Content, ContentSchema, Contracted, Declared, ExceptionClass, Exception,
    FieldSpec, FieldType, Problem, ProblemDetails, ProblemType, ProblemTypeBuilder, Raises,
    ValidationError, WireError,
};

// Re-export documentation rendering
pub use structex_docs as docs;

// Re-export logging initialisation
pub use structex_telemetry as telemetry;

#[doc(hidden)]
pub use structex_core::__private;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use structex::prelude::*;
/// ```
pub mod prelude {
    pub use structex_core::roots::{BUG, ERROR};
    pub use structex_core::{
        declare_problem, may_raise, may_raise_named, problem, Allow, Exception, ExceptionClass,
        Problem, ProblemType, Raises,
    };

    // Re-export the contract attribute
    pub use structex_macros::raises;
}
