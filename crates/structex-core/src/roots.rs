//! The two problem roots and the framework's own bugs.
//!
//! [`ERROR`] is the root of conditions a caller can act on. [`BUG`] is the
//! root of defects: they are logged and escalated, never handled, and a
//! raise contract always lets them through.

crate::declare_problem! {
    /// Base type for recoverable problems.
    ///
    /// Libraries declare their own problems as subtypes of this one.
    pub static ERROR: Error {
        typename = "structex.Error";
        status = 400;
    }

    /// Base type for problems that indicate a defect.
    ///
    /// A bug is never an expected outcome and is never converted by a raise
    /// contract.
    pub static BUG: Bug {
        typename = "structex.Bug";
        status = 500;
    }

    /// An undeclared error escaped a contracted callable.
    pub static BAD_EXCEPTION_BUG: BadExceptionBug(BUG) {
        typename = "structex.BadExceptionBug";
        detail = "Disallowed exception raised: {raised}";
        raised: Str => "The disallowed exception";
    }

    /// A test scripted an error its target may not raise.
    pub static BAD_EXCEPTIONS_IN_TEST_BUG: BadExceptionsInTestBug(BUG) {
        typename = "structex.BadExceptionsInTestBug";
        detail = "Test case for {name} raises bad exception(s): {exceptions}";
        name: Str => "Path of the substituted callable";
        exceptions: Str => "The exceptions it may not raise";
    }

    /// A test tried to substitute a path with no single registered contract.
    pub static UNKNOWN_CONTRACT_BUG: UnknownContractBug(BUG) {
        typename = "structex.UnknownContractBug";
        detail = "Cannot substitute {name}: {reason}";
        name: Str => "Path of the callable to substitute";
        reason: Str => "Why no contract was found";
    }

    /// Problem content failed validation.
    pub static VALIDATION_BUG: ValidationBug(BUG) {
        typename = "structex.ValidationBug";
        detail = "Invalid content for {problem}: {errors}";
        problem: Str => "Typename of the problem being constructed";
        errors: Str => "The validation errors";
    }
}
