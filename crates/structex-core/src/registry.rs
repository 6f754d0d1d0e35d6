//! Process-wide registry of problem types, keyed by typename.
//!
//! Every [`ProblemTypeBuilder::build`](crate::kind::ProblemTypeBuilder::build)
//! call registers its type here. Types declared with
//! [`declare_problem!`](crate::declare_problem) are additionally submitted
//! to [`inventory`], and [`registry`] forces all of them once before
//! answering any lookup, so wire decoding never depends on whether a
//! declaration has been touched yet.
//!
//! The registry is append-only; entries live for the life of the process.

use crate::kind::{Declared, ProblemType};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock, Once};

/// A link-time record of one statically declared problem type.
///
/// Emitted by [`declare_problem!`](crate::declare_problem); not normally
/// constructed by hand.
#[derive(Debug)]
pub struct Declaration {
    kind: &'static Declared,
}

impl Declaration {
    /// Wraps a declared static.
    #[must_use]
    pub const fn new(kind: &'static Declared) -> Self {
        Self { kind }
    }

    fn force(&self) -> &Arc<ProblemType> {
        LazyLock::force(self.kind)
    }
}

inventory::collect!(Declaration);

/// Typename-indexed store of every declared problem type.
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<IndexMap<String, Arc<ProblemType>>>,
}

impl Registry {
    /// Registers `kind` under its typename.
    ///
    /// Returns `false` (and keeps the earlier entry) if a different type
    /// already claimed the typename.
    pub fn register(&self, kind: Arc<ProblemType>) -> bool {
        let mut types = self.types.write();
        match types.get(kind.typename()) {
            Some(existing) if Arc::ptr_eq(existing, &kind) => true,
            Some(existing) => {
                tracing::warn!(
                    typename = %kind.typename(),
                    existing = %existing.qualname(),
                    duplicate = %kind.qualname(),
                    "typename already registered; keeping the first declaration"
                );
                false
            }
            None => {
                types.insert(kind.typename().to_string(), kind);
                true
            }
        }
    }

    /// Looks a type up by typename.
    #[must_use]
    pub fn lookup(&self, typename: &str) -> Option<Arc<ProblemType>> {
        self.types.read().get(typename).cloned()
    }

    /// Finds the type called `typename` among `root` and its subtypes.
    #[must_use]
    pub fn resolve(&self, root: &ProblemType, typename: &str) -> Option<Arc<ProblemType>> {
        self.lookup(typename)
            .filter(|candidate| candidate.is_subtype_of(root))
    }

    /// Returns every registered type that strictly inherits from `root`, in
    /// registration order.
    #[must_use]
    pub fn subtypes_of(&self, root: &ProblemType) -> Vec<Arc<ProblemType>> {
        self.types
            .read()
            .values()
            .filter(|kind| !std::ptr::eq(Arc::as_ptr(kind), root) && kind.is_subtype_of(root))
            .cloned()
            .collect()
    }

    /// Returns every registered type, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<ProblemType>> {
        self.types.read().values().cloned().collect()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::default);
static DECLARATIONS: Once = Once::new();

/// Returns the registry without forcing pending declarations.
///
/// Used by the builder itself, which may run while declarations are being
/// forced.
pub(crate) fn raw() -> &'static Registry {
    &REGISTRY
}

/// Returns the process-wide registry with every static declaration loaded.
pub fn registry() -> &'static Registry {
    DECLARATIONS.call_once(|| {
        let mut count = 0_usize;
        for declaration in inventory::iter::<Declaration> {
            declaration.force();
            count += 1;
        }
        tracing::debug!(declarations = count, "loaded static problem declarations");
    });
    &REGISTRY
}
