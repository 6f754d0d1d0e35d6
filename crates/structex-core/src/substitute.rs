//! Thread-local substitution of contracted functions.
//!
//! Tests replace a named contract's callable with a stub that produces the
//! error to return. Substitutions are per thread, so tests running in
//! parallel do not see each other's stubs, and each lasts as long as the
//! [`SubstitutionGuard`] returned by [`install`].
//!
//! Prefer `structex_test::raises_exception`, which checks the scripted
//! errors against the target's contract before installing them.

use crate::problem::Exception;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

type Stub = Box<dyn FnMut() -> Exception>;

thread_local! {
    static STUBS: RefCell<HashMap<String, Stub>> = RefCell::new(HashMap::new());
}

/// Number of live guards across all threads. Zero means no thread has a
/// substitution, and lookups can skip the thread-local map.
static ACTIVE: AtomicUsize = AtomicUsize::new(0);

/// Removes a substitution when dropped, restoring any it replaced.
#[must_use = "the substitution is removed as soon as the guard is dropped"]
pub struct SubstitutionGuard {
    path: String,
    previous: Option<Stub>,
    // Tied to the installing thread.
    _thread: PhantomData<*const ()>,
}

impl SubstitutionGuard {
    /// Returns the substituted path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for SubstitutionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionGuard")
            .field("path", &self.path)
            .field("replaces_previous", &self.previous.is_some())
            .finish()
    }
}

impl Drop for SubstitutionGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = STUBS.try_with(|stubs| {
            let mut stubs = stubs.borrow_mut();
            match previous {
                Some(stub) => {
                    stubs.insert(self.path.clone(), stub);
                }
                None => {
                    stubs.remove(&self.path);
                }
            }
        });
        ACTIVE.fetch_sub(1, Ordering::Release);
        tracing::trace!(path = %self.path, "substitution removed");
    }
}

/// Substitutes the contracted function at `path` on the current thread.
///
/// While the guard lives, each call to the function returns `Err(stub())`
/// without running its body.
pub fn install<F>(path: impl Into<String>, stub: F) -> SubstitutionGuard
where
    F: FnMut() -> Exception + 'static,
{
    let path = path.into();
    let previous = STUBS.with(|stubs| stubs.borrow_mut().insert(path.clone(), Box::new(stub)));
    ACTIVE.fetch_add(1, Ordering::Acquire);
    tracing::trace!(path = %path, "substitution installed");
    SubstitutionGuard {
        path,
        previous,
        _thread: PhantomData,
    }
}

/// Returns the substituted error for `path`, if a stub is installed on this
/// thread.
pub fn intercept(path: &str) -> Option<Exception> {
    if ACTIVE.load(Ordering::Relaxed) == 0 {
        return None;
    }
    STUBS.with(|stubs| {
        let mut stubs = stubs.try_borrow_mut().ok()?;
        stubs.get_mut(path).map(|stub| stub())
    })
}

/// Returns `true` if `path` is substituted on this thread.
#[must_use]
pub fn is_substituted(path: &str) -> bool {
    ACTIVE.load(Ordering::Relaxed) != 0 && STUBS.with(|stubs| stubs.borrow().contains_key(path))
}
