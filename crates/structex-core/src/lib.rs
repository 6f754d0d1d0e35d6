//! # Structex Core
//!
//! Structured problems with typed content, an RFC 7807 wire format, and
//! enforced raise contracts.
//!
//! - [`field`] / [`schema`] - typed field descriptors and validated content
//! - [`kind`] - the [`ProblemType`] metamodel and [`declare_problem!`]
//! - [`problem`] - [`Problem`] instances and their wire form
//! - [`roots`] - the [`ERROR`](roots::ERROR) and [`BUG`](roots::BUG) roots
//! - [`raises`] - [`Raises`] contracts and introspection
//! - [`substitute`] - thread-local substitution of contracted functions
//! - [`response`] - `application/problem+json` HTTP responses
//!
//! # Example
//!
//! ```
//! use structex_core::{declare_problem, problem, roots::ERROR};
//!
//! declare_problem! {
//!     /// Raised when something could not be done.
//!     pub static FAILED: Failed(ERROR) {
//!         detail = "Failed to {what}";
//!         what: Str => "What failed";
//!     }
//! }
//!
//! let failed = problem!(FAILED, what = "open the pod bay doors").unwrap();
//! assert_eq!(failed.to_string(), "Failed to open the pod bay doors");
//! assert_eq!(failed.to_details().status, 400);
//! ```

#![doc(html_root_url = "https://docs.rs/structex-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod field;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod json;
pub mod kind;
pub mod problem;
pub mod raises;
pub mod registry;
pub mod response;
pub mod roots;
pub mod schema;
pub mod substitute;
pub mod template;

pub use field::{FieldSpec, FieldType};
pub use kind::{Declared, ProblemType, ProblemTypeBuilder};
pub use problem::{AttributeError, Exception, Problem, ProblemDetails, WireError};
pub use raises::{
    contract_of, lookup_contract, may_raise, may_raise_named, Allow, AmbiguousContract, Contracted,
    ExceptionClass, Raises,
};
pub use registry::registry;
pub use schema::{Content, ContentSchema, ValidationError};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use serde_json;
}

/// Instantiates a problem type from `field = value` pairs.
///
/// Expands to [`ProblemType::instantiate`], so the result is
/// `Result<Problem, Problem>` with a validation bug on the error side.
///
/// ```
/// use structex_core::{declare_problem, problem, roots::ERROR};
///
/// declare_problem! {
///     /// A sample problem with a name and a code.
///     pub static EXAMPLE_ERROR: ExampleError(ERROR) {
///         detail = "Example error: name={name} code={code}";
///         name: Str;
///         code: Int;
///     }
/// }
///
/// let p = problem!(EXAMPLE_ERROR, name = "x", code = 1).unwrap();
/// assert_eq!(p.to_string(), "Example error: name=x code=1");
///
/// let bug = problem!(EXAMPLE_ERROR, name = "x").unwrap_err();
/// assert!(bug.is_bug());
/// ```
#[macro_export]
macro_rules! problem {
    ($kind:expr $(, $field:ident = $value:expr)* $(,)?) => {{
        let fields: ::std::vec::Vec<(&str, $crate::__private::serde_json::Value)> = ::std::vec![
            $( (::core::stringify!($field), $crate::__private::serde_json::Value::from($value)) ),*
        ];
        $kind.instantiate(fields)
    }};
}
