//! Contract-checked substitution of contracted functions.

use std::error::Error as StdError;

use serde_json::Value;
use structex_core::roots::{BAD_EXCEPTIONS_IN_TEST_BUG, UNKNOWN_CONTRACT_BUG};
use structex_core::substitute::{self, SubstitutionGuard};
use structex_core::{lookup_contract, may_raise, Exception, ExceptionClass, Problem};

use crate::raiser::Raiser;

/// A live substitution installed by [`raises_exception`].
///
/// The contracted function behaves normally again once this is dropped.
#[derive(Debug)]
#[must_use = "the substitution is removed as soon as it is dropped"]
pub struct Substitution {
    guard: SubstitutionGuard,
    untested: Vec<ExceptionClass>,
}

impl Substitution {
    /// Returns the substituted path.
    pub fn path(&self) -> &str {
        self.guard.path()
    }

    /// Returns the allowed classes none of the scripted errors belong to,
    /// ordered by qualified name.
    pub fn untested(&self) -> &[ExceptionClass] {
        &self.untested
    }
}

/// Makes the contracted function at `path` return `exceptions`, one per
/// call, on the current thread.
///
/// `path` must name exactly one registered contract; otherwise the error is
/// an `UnknownContractBug`. Every scripted error must be allowed by that
/// contract, or nothing is installed and the error is a
/// `BadExceptionsInTestBug` problem naming the offending errors.
pub fn raises_exception<I, E>(path: &str, exceptions: I) -> Result<Substitution, Problem>
where
    I: IntoIterator<Item = E>,
    E: Into<Exception>,
{
    let exceptions: Vec<Exception> = exceptions.into_iter().map(Into::into).collect();
    let allowed = match lookup_contract(path) {
        Ok(Some(raises)) => may_raise(Some(raises)),
        Ok(None) => return Err(unknown_contract(path, "no contract is registered at this path")),
        Err(ambiguous) => return Err(unknown_contract(path, &ambiguous.to_string())),
    };

    let bad: Vec<String> = exceptions
        .iter()
        .filter(|exception| !allowed.iter().any(|class| class.matches(&***exception)))
        .map(|exception| describe(&**exception))
        .collect();
    if !bad.is_empty() {
        let bug = BAD_EXCEPTIONS_IN_TEST_BUG
            .instantiate([
                ("name", Value::from(path)),
                ("exceptions", Value::from(bad.join(", "))),
            ])
            .unwrap_or_else(|validation_bug| validation_bug);
        return Err(bug);
    }

    let mut untested: Vec<ExceptionClass> = allowed
        .into_iter()
        .filter(|class| {
            !exceptions
                .iter()
                .any(|exception| class.matches(&**exception))
        })
        .collect();
    untested.sort_by_key(ExceptionClass::qualname);
    for class in &untested {
        tracing::info!(path = %path, class = %class.qualname(), "allowed exception class not tested");
    }

    let mut raiser = Raiser::new(path, exceptions);
    let guard = substitute::install(path, move || raiser.raise());

    Ok(Substitution { guard, untested })
}

fn unknown_contract(path: &str, reason: &str) -> Problem {
    tracing::warn!(path = %path, reason = %reason, "cannot substitute");
    UNKNOWN_CONTRACT_BUG
        .instantiate([("name", Value::from(path)), ("reason", Value::from(reason))])
        .unwrap_or_else(|validation_bug| validation_bug)
}

fn describe(exception: &(dyn StdError + 'static)) -> String {
    match exception.downcast_ref::<Problem>() {
        Some(problem) => format!("{}({problem})", problem.typename()),
        None => exception.to_string(),
    }
}
