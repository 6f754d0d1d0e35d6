//! Procedural macros for structex raise contracts.
//!
//! # Overview
//!
//! The `#[raises(...)]` attribute binds a function to a raise contract: the
//! errors it may return. Allowed errors and bugs pass through unchanged;
//! any other error is converted into a `BadExceptionBug` carrying the
//! original as its source.
//!
//! # Example
//!
//! ```rust,ignore
//! use structex::prelude::*;
//!
//! #[raises(OP_ERROR)]
//! pub fn div(a: f64, b: f64) -> Result<f64, Exception> {
//!     if b == 0.0 {
//!         return Err(problem!(OP_ERROR, op = "div", a = a, b = b, error = "division by zero")?.into());
//!     }
//!     Ok(a / b)
//! }
//! ```
//!
//! # Macro Expansion
//!
//! The `#[raises]` macro:
//!
//! 1. Appends a "Raises" section listing the allow-list to the rustdoc
//! 2. Declares the contract in a function-local `static`
//! 3. Registers it under the function's path, for `contract_of` and
//!    `may_raise_named`
//! 4. Runs the original body through `Raises::call`, which also honours test
//!    substitutions

mod parse;
mod raises;

use proc_macro::TokenStream;

/// Declares and enforces the errors a function may return.
///
/// The function must return `Result<T, Exception>`.
///
/// # Arguments
///
/// - a problem-type static or any expression `e` with `Allow: From<&e>`
/// - `native(Type)` / `native(Type, "title")`: a concrete Rust error type
/// - `Any`: any error
/// - `None`: nothing (ignored inside a non-empty list)
/// - `[a, b, ...]`: a nested list, flattened in order
/// - `path = "..."`: registration path, defaults to `module_path!()::name`;
///   required on methods taking `self`
/// - `crate = path`: runtime crate, defaults to `::structex`
///
/// # Example
///
/// ```rust,ignore
/// #[raises([INSUFFICIENT_SPACE, native(std::io::Error)])]
/// fn reserve(path: &str, need: i64) -> Result<(), Exception> {
///     let avail = free_space(path)?;
///     if avail < need {
///         return Err(problem!(INSUFFICIENT_SPACE, path = path, avail = avail, need = need)?.into());
///     }
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn raises(attr: TokenStream, item: TokenStream) -> TokenStream {
    raises::expand_raises(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
