//! # Structex Test
//!
//! Test utilities for structex, replacing contracted functions with scripted
//! raisers without touching the code under test.
//!
//! ## Key Features
//!
//! - **Scripted errors**: a [`Raiser`] returns its errors one per call, then
//!   [`RaiserExhausted`]
//! - **Contract checked**: [`raises_exception`] refuses to script an error the
//!   target's contract does not allow
//! - **Thread local**: substitutions are scoped to the returned
//!   [`Substitution`] and to the current thread, so parallel tests don't
//!   interfere
//! - **Coverage hints**: allowed classes the script never exercises are
//!   reported by [`Substitution::untested`]
//!
//! ## Example
//!
//! ```ignore
//! use structex::prelude::*;
//! use structex_test::raises_exception;
//!
//! #[raises(INSUFFICIENT_SPACE)]
//! fn reserve(path: &str, need: i64) -> Result<(), Exception> {
//!     // ...
//! }
//!
//! #[test]
//! fn test_reserve_reports_full_disk() {
//!     let full = problem!(INSUFFICIENT_SPACE, path = "/", avail = 0, need = 1).unwrap();
//!     let _sub = raises_exception("my_crate::reserve", [full.clone()]).unwrap();
//!
//!     let error = reserve("/", 1).unwrap_err();
//!     assert_eq!(error.downcast_ref::<Problem>(), Some(&full));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/structex-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod raiser;
mod substitution;

pub use error::RaiserExhausted;
pub use raiser::Raiser;
pub use substitution::{raises_exception, Substitution};
