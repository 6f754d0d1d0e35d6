//! Raise contracts: declared, enforced allow-lists of error classes.
//!
//! A [`Raises`] contract names the classes of error a callable may return.
//! Running the callable through the contract lets allowed errors and bugs
//! through unchanged and converts everything else into a
//! `BAD_EXCEPTION_BUG` problem that keeps the original as its source.
//!
//! ```
//! use structex_core::raises::{Allow, Raises};
//! use structex_core::roots::ERROR;
//! use structex_core::Exception;
//!
//! let contract = Raises::new([Allow::from(&ERROR)]);
//!
//! let result: Result<(), Exception> = contract.call(|| Err("boom".into()));
//! let bug = result.unwrap_err();
//! assert_eq!(bug.to_string(), "Disallowed exception raised: boom");
//! ```
//!
//! Functions usually get their contract from the `#[raises(...)]`
//! attribute, which also registers it by path so that tooling can find it
//! with [`contract_of`] and [`may_raise_named`].

use crate::kind::{Declared, ProblemType};
use crate::problem::{Exception, Problem};
use crate::roots::BAD_EXCEPTION_BUG;
use crate::substitute;
use indexmap::IndexMap;
use serde_json::Value;
use std::any::{type_name, TypeId};
use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Name shown for [`ExceptionClass::Any`].
pub const ANY_CLASS_NAME: &str = "Exception";

/// A concrete Rust error type that may appear in a contract.
#[derive(Clone, Copy)]
pub struct NativeClass {
    type_id: TypeId,
    type_name: &'static str,
    title: Option<&'static str>,
    matches: fn(&(dyn StdError + 'static)) -> bool,
}

fn is_type<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

impl NativeClass {
    /// Describes the error type `E`.
    #[must_use]
    pub fn of<E: StdError + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            title: None,
            matches: is_type::<E>,
        }
    }

    /// Attaches a title used when documenting contracts.
    #[must_use]
    pub fn titled(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }

    /// Returns the full Rust type path.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the title, if one was attached.
    #[must_use]
    pub const fn title(&self) -> Option<&'static str> {
        self.title
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// One entry of a contract's allow-list.
#[derive(Clone)]
pub enum ExceptionClass {
    /// A problem type; matches it and every subtype.
    Problem(Arc<ProblemType>),
    /// A concrete Rust error type; matches exactly that type.
    Native(NativeClass),
    /// Matches any error.
    Any,
}

impl ExceptionClass {
    /// Builds a native class for `E`.
    #[must_use]
    pub fn native<E: StdError + 'static>() -> Self {
        Self::Native(NativeClass::of::<E>())
    }

    /// Builds a native class for `E` with a documentation title.
    #[must_use]
    pub fn native_titled<E: StdError + 'static>(title: &'static str) -> Self {
        Self::Native(NativeClass::of::<E>().titled(title))
    }

    /// Returns the short name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Problem(kind) => kind.name(),
            Self::Native(native) => short_type_name(native.type_name),
            Self::Any => ANY_CLASS_NAME,
        }
    }

    /// Returns the qualified name, with `.` separators.
    #[must_use]
    pub fn qualname(&self) -> String {
        match self {
            Self::Problem(kind) => kind.qualname(),
            Self::Native(native) => strip_generics(native.type_name).replace("::", "."),
            Self::Any => ANY_CLASS_NAME.to_string(),
        }
    }

    /// Returns the documentation title, if there is one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Problem(kind) => Some(kind.title()).filter(|t| !t.is_empty()),
            Self::Native(native) => native.title,
            Self::Any => None,
        }
    }

    /// Returns `false` if other registered classes descend from this one.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        match self {
            Self::Problem(kind) => kind.is_leaf(),
            Self::Native(_) => true,
            Self::Any => false,
        }
    }

    /// Returns `true` if `error` belongs to this class.
    #[must_use]
    pub fn matches(&self, error: &(dyn StdError + 'static)) -> bool {
        match self {
            Self::Problem(kind) => error
                .downcast_ref::<Problem>()
                .is_some_and(|problem| problem.is_a(kind)),
            Self::Native(native) => (native.matches)(error),
            Self::Any => true,
        }
    }

    fn key(&self) -> ClassKey {
        match self {
            Self::Problem(kind) => ClassKey::Problem(Arc::as_ptr(kind) as usize),
            Self::Native(native) => ClassKey::Native(native.type_id),
            Self::Any => ClassKey::Any,
        }
    }
}

fn strip_generics(type_name: &str) -> &str {
    type_name.split('<').next().unwrap_or(type_name)
}

fn short_type_name(type_name: &str) -> &str {
    let base = strip_generics(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

#[derive(PartialEq, Eq, Hash)]
enum ClassKey {
    Problem(usize),
    Native(TypeId),
    Any,
}

impl PartialEq for ExceptionClass {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ExceptionClass {}

impl Hash for ExceptionClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualname())
    }
}

impl fmt::Display for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualname())
    }
}

impl From<&Arc<ProblemType>> for ExceptionClass {
    fn from(kind: &Arc<ProblemType>) -> Self {
        Self::Problem(Arc::clone(kind))
    }
}

impl From<Arc<ProblemType>> for ExceptionClass {
    fn from(kind: Arc<ProblemType>) -> Self {
        Self::Problem(kind)
    }
}

impl From<&Declared> for ExceptionClass {
    fn from(kind: &Declared) -> Self {
        Self::Problem(Arc::clone(kind))
    }
}

impl From<NativeClass> for ExceptionClass {
    fn from(native: NativeClass) -> Self {
        Self::Native(native)
    }
}

/// An argument to [`Raises::new`]: a class, a nested list, or the "raises
/// nothing" sentinel.
#[derive(Debug, Clone)]
pub enum Allow {
    /// A single class.
    Class(ExceptionClass),
    /// A nested list, flattened in order.
    Many(Vec<Allow>),
    /// Permits nothing; dropped during flattening.
    Nothing,
}

impl Allow {
    /// Allows the native error type `E`.
    #[must_use]
    pub fn native<E: StdError + 'static>() -> Self {
        Self::Class(ExceptionClass::native::<E>())
    }

    /// Allows any error.
    #[must_use]
    pub const fn any() -> Self {
        Self::Class(ExceptionClass::Any)
    }

    fn flatten_into(self, out: &mut Vec<ExceptionClass>) {
        match self {
            Self::Class(class) => out.push(class),
            Self::Many(items) => items.into_iter().for_each(|item| item.flatten_into(out)),
            Self::Nothing => {}
        }
    }
}

impl From<ExceptionClass> for Allow {
    fn from(class: ExceptionClass) -> Self {
        Self::Class(class)
    }
}

impl From<&Arc<ProblemType>> for Allow {
    fn from(kind: &Arc<ProblemType>) -> Self {
        Self::Class(kind.into())
    }
}

impl From<Arc<ProblemType>> for Allow {
    fn from(kind: Arc<ProblemType>) -> Self {
        Self::Class(kind.into())
    }
}

impl From<&Declared> for Allow {
    fn from(kind: &Declared) -> Self {
        Self::Class(kind.into())
    }
}

impl From<NativeClass> for Allow {
    fn from(native: NativeClass) -> Self {
        Self::Class(native.into())
    }
}

impl<T: Into<Allow>> From<Vec<T>> for Allow {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Allow>, const N: usize> From<[T; N]> for Allow {
    fn from(items: [T; N]) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Allow>> From<Option<T>> for Allow {
    fn from(item: Option<T>) -> Self {
        item.map_or(Self::Nothing, Into::into)
    }
}

/// What a contract does with one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// An allowed class matches; the error passes unchanged.
    Allowed,
    /// The error is a bug; it passes unchanged.
    Bug,
    /// The error is undeclared and will be converted.
    Violation,
}

/// A declared allow-list of error classes.
#[derive(Debug, Clone, Default)]
pub struct Raises {
    name: Option<String>,
    allowed: Vec<ExceptionClass>,
}

impl Raises {
    /// Builds a contract, flattening nested lists in order.
    ///
    /// Duplicates are kept; [`Allow::Nothing`] entries are dropped.
    #[must_use]
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Allow>,
    {
        let mut allowed = Vec::new();
        for item in items {
            item.into().flatten_into(&mut allowed);
        }
        Self {
            name: None,
            allowed,
        }
    }

    /// A contract that permits no errors at all.
    #[must_use]
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Names the contract after the callable it guards.
    ///
    /// Named contracts can be substituted in tests with
    /// [`substitute::install`].
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name of the guarded callable, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the flattened allow-list, in declaration order.
    #[must_use]
    pub fn allowed(&self) -> &[ExceptionClass] {
        &self.allowed
    }

    /// Returns `true` if the contract permits nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Returns `true` if some allowed class matches `error`.
    #[must_use]
    pub fn permits(&self, error: &(dyn StdError + 'static)) -> bool {
        self.allowed.iter().any(|class| class.matches(error))
    }

    /// Classifies `error` without converting it.
    #[must_use]
    pub fn check(&self, error: &(dyn StdError + 'static)) -> Verdict {
        if self.permits(error) {
            Verdict::Allowed
        } else if error
            .downcast_ref::<Problem>()
            .is_some_and(Problem::is_bug)
        {
            Verdict::Bug
        } else {
            Verdict::Violation
        }
    }

    /// Applies the contract to an error leaving the guarded callable.
    pub fn enforce(&self, error: Exception) -> Exception {
        match self.check(&*error) {
            Verdict::Allowed => {
                tracing::trace!(contract = self.label(), error = %error, "allowed error passed through");
                error
            }
            Verdict::Bug => error,
            Verdict::Violation => {
                tracing::warn!(
                    contract = self.label(),
                    error = %error,
                    "undeclared error converted to BadExceptionBug"
                );
                Box::new(bad_exception(error))
            }
        }
    }

    /// Runs `f` under the contract.
    ///
    /// If a substitute is installed for this contract's name on the current
    /// thread, `f` is not run and the substitute's error is returned instead.
    pub fn call<T, F>(&self, f: F) -> Result<T, Exception>
    where
        F: FnOnce() -> Result<T, Exception>,
    {
        if let Some(name) = self.name.as_deref() {
            if let Some(scripted) = substitute::intercept(name) {
                return Err(scripted);
            }
        }
        f().map_err(|error| self.enforce(error))
    }

    /// Binds the contract to a callable.
    #[must_use]
    pub fn wrap<F>(self, func: F) -> Contracted<F> {
        Contracted { raises: self, func }
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

fn bad_exception(error: Exception) -> Problem {
    let mut values = IndexMap::new();
    values.insert("raised".to_string(), Value::String(error.to_string()));
    Problem::trusted(&BAD_EXCEPTION_BUG, values).with_source(error)
}

/// A callable bound to its raise contract.
///
/// Arguments are passed as one value (use a tuple for several).
///
/// ```
/// use structex_core::raises::Raises;
/// use structex_core::Exception;
///
/// let halve = Raises::nothing().wrap(|n: u32| -> Result<u32, Exception> { Ok(n / 2) });
/// assert_eq!(halve.call(10).unwrap(), 5);
/// assert!(halve.raises().is_empty());
/// ```
#[derive(Clone)]
pub struct Contracted<F> {
    raises: Raises,
    func: F,
}

impl<F> Contracted<F> {
    /// Returns the contract.
    #[must_use]
    pub fn raises(&self) -> &Raises {
        &self.raises
    }

    /// Calls the wrapped callable under its contract.
    pub fn call<A, T>(&self, args: A) -> Result<T, Exception>
    where
        F: Fn(A) -> Result<T, Exception>,
    {
        self.raises.call(|| (self.func)(args))
    }
}

impl<F> fmt::Debug for Contracted<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contracted")
            .field("raises", &self.raises)
            .finish_non_exhaustive()
    }
}

/// A link-time record of a contract attached to a named function.
///
/// Emitted by the `#[raises]` attribute.
pub struct NamedContract {
    path: &'static str,
    raises: &'static LazyLock<Raises>,
}

impl NamedContract {
    /// Records `raises` under `path`.
    #[must_use]
    pub const fn new(path: &'static str, raises: &'static LazyLock<Raises>) -> Self {
        Self { path, raises }
    }

    /// Returns the function path, e.g. `my_crate::ops::div`.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// Returns the contract.
    #[must_use]
    pub fn raises(&self) -> &'static Raises {
        self.raises
    }
}

impl fmt::Debug for NamedContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedContract")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

inventory::collect!(NamedContract);

/// More than one function registered a contract under the same path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{count} contracts are registered under '{path}'; give each function a distinct `path`")]
pub struct AmbiguousContract {
    /// The shared path.
    pub path: String,
    /// How many contracts claim it.
    pub count: usize,
}

/// Looks up the contract registered at `path`, failing if several
/// functions claim the same path.
pub fn lookup_contract(path: &str) -> Result<Option<&'static Raises>, AmbiguousContract> {
    let mut found = None;
    let mut count = 0;
    for contract in inventory::iter::<NamedContract> {
        if contract.path == path {
            count += 1;
            found.get_or_insert(contract.raises());
        }
    }
    if count > 1 {
        return Err(AmbiguousContract {
            path: path.to_string(),
            count,
        });
    }
    Ok(found)
}

/// Looks up the contract attached to the function at `path`.
///
/// An ambiguous path has no single contract and yields `None`.
#[must_use]
pub fn contract_of(path: &str) -> Option<&'static Raises> {
    lookup_contract(path).unwrap_or_else(|err| {
        tracing::warn!(path = %err.path, count = err.count, "ambiguous contract path");
        None
    })
}

/// Returns the set of classes a callable may raise.
///
/// With no contract the answer is the universal set `{Exception}`: there are
/// no guarantees. An empty contract yields the empty set.
#[must_use]
pub fn may_raise(contract: Option<&Raises>) -> HashSet<ExceptionClass> {
    match contract {
        Some(raises) => raises.allowed.iter().cloned().collect(),
        None => HashSet::from([ExceptionClass::Any]),
    }
}

/// [`may_raise`] for the function registered at `path`.
#[must_use]
pub fn may_raise_named(path: &str) -> HashSet<ExceptionClass> {
    may_raise(contract_of(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EXAMPLE_ERROR, FOO_ERROR, PLEASE_WAIT};
    use crate::roots::{BUG, ERROR, VALIDATION_BUG};
    use serde_json::json;
    use std::io;

    fn example() -> Problem {
        EXAMPLE_ERROR
            .instantiate([("name", json!("x")), ("code", json!(1))])
            .unwrap()
    }

    fn as_problem(error: &Exception) -> &Problem {
        error.downcast_ref::<Problem>().unwrap()
    }

    #[test]
    fn test_flattening_keeps_order_and_duplicates() {
        let raises = Raises::new([
            Allow::from(&EXAMPLE_ERROR),
            Allow::from(vec![Allow::from(&FOO_ERROR), Allow::from([&EXAMPLE_ERROR])]),
            Allow::Nothing,
            Allow::native::<io::Error>(),
        ]);
        let names: Vec<&str> = raises.allowed().iter().map(ExceptionClass::name).collect();
        assert_eq!(names, ["ExampleError", "FooError", "ExampleError", "Error"]);
    }

    #[test]
    fn test_sentinel_collapses_to_empty() {
        assert!(Raises::new([Allow::Nothing]).is_empty());
        assert!(Raises::new([Option::<&Declared>::None]).is_empty());
        assert!(Raises::nothing().is_empty());
    }

    #[test]
    fn test_allowed_error_passes_unchanged() {
        let raises = Raises::new([&EXAMPLE_ERROR]);
        let error = raises.call::<(), _>(|| Err(example().into())).unwrap_err();
        assert_eq!(as_problem(&error), &example());
    }

    #[test]
    fn test_subtypes_are_allowed() {
        let raises = Raises::new([&FOO_ERROR]);
        let wait = PLEASE_WAIT.instantiate([("howlong", json!(5))]).unwrap();
        let error = raises.call::<(), _>(|| Err(wait.clone().into())).unwrap_err();
        assert_eq!(as_problem(&error), &wait);
    }

    #[test]
    fn test_undeclared_error_is_converted() {
        let raises = Raises::new([&FOO_ERROR]);
        let error = raises.call::<(), _>(|| Err(example().into())).unwrap_err();

        let bug = as_problem(&error);
        assert!(bug.is_a(&BAD_EXCEPTION_BUG));
        assert_eq!(bug.get("raised").unwrap(), &json!("Example error: name=x code=1"));
        let cause = bug.cause().unwrap().downcast_ref::<Problem>().unwrap();
        assert_eq!(cause, &example());
    }

    #[test]
    fn test_native_errors() {
        let raises = Raises::new([Allow::native::<io::Error>()]);
        let error = raises
            .call::<(), _>(|| Err(io::Error::other("disk").into()))
            .unwrap_err();
        assert!(error.is::<io::Error>());

        let error = raises
            .call::<(), _>(|| Err("plain".into()))
            .unwrap_err();
        assert!(as_problem(&error).is_a(&BAD_EXCEPTION_BUG));
    }

    #[test]
    fn test_bugs_are_never_converted() {
        let raises = Raises::nothing();
        let bug = EXAMPLE_ERROR.instantiate([("name", json!("x"))]).unwrap_err();
        let error = raises.call::<(), _>(|| Err(bug.into())).unwrap_err();
        assert!(as_problem(&error).is_a(&VALIDATION_BUG));
    }

    #[test]
    fn test_empty_contract_converts_everything() {
        let raises = Raises::nothing();
        let error = raises.call::<(), _>(|| Err(example().into())).unwrap_err();
        assert!(as_problem(&error).is_a(&BAD_EXCEPTION_BUG));
        assert_eq!(raises.check(&example()), Verdict::Violation);
    }

    #[test]
    fn test_any_allows_everything() {
        let raises = Raises::new([Allow::any()]);
        assert_eq!(raises.check(&example()), Verdict::Allowed);
        assert_eq!(raises.check(&io::Error::other("x")), Verdict::Allowed);
    }

    #[test]
    fn test_success_passes_through() {
        let raises = Raises::nothing();
        assert_eq!(raises.call(|| Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_contracted_callable() {
        let div = Raises::new([&ERROR]).wrap(|(a, b): (i64, i64)| -> Result<i64, Exception> {
            if b == 0 {
                return Err("division by zero".into());
            }
            Ok(a / b)
        });
        assert_eq!(div.call((6, 3)).unwrap(), 2);
        let error = div.call((1, 0)).unwrap_err();
        assert!(as_problem(&error).is_a(&BAD_EXCEPTION_BUG));
        assert_eq!(div.raises().allowed().len(), 1);
    }

    #[test]
    fn test_may_raise() {
        assert_eq!(may_raise(None), HashSet::from([ExceptionClass::Any]));

        let raises = Raises::new([Allow::from(&FOO_ERROR), Allow::from(&FOO_ERROR)]);
        assert_eq!(
            may_raise(Some(&raises)),
            HashSet::from([ExceptionClass::from(&FOO_ERROR)])
        );
        assert!(may_raise(Some(&Raises::nothing())).is_empty());
        assert_eq!(
            may_raise_named("no::such::function"),
            HashSet::from([ExceptionClass::Any])
        );
    }

    #[test]
    fn test_class_names() {
        let native = ExceptionClass::native_titled::<io::Error>("I/O failure");
        assert_eq!(native.name(), "Error");
        assert!(native.qualname().starts_with("std.io."));
        assert_eq!(native.title(), Some("I/O failure"));
        assert!(native.is_leaf());

        let bug = ExceptionClass::from(&BUG);
        assert_eq!(bug.qualname(), "structex_core.roots.Bug");
        assert!(!bug.is_leaf());
        assert_eq!(ExceptionClass::Any.name(), "Exception");
    }
}
