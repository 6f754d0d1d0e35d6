//! Sample problem types for tests and demos.
//!
//! Compiled for this crate's own tests and, for other crates, behind the
//! `fixtures` feature.

use crate::roots::ERROR;

crate::declare_problem! {
    /// A sample problem with a name and a code.
    pub static EXAMPLE_ERROR: ExampleError(ERROR) {
        detail = "Example error: name={name} code={code}";
        name: Str => "A name";
        code: Int => "A code";
    }

    /// A sample problem whose only field has a default.
    pub static DEFAULTED_ERROR: DefaultedError(ERROR) {
        detail = "Label is {label}";
        label: Str = "missing" => "A label";
    }

    /// Raised when a filesystem has insufficient space.
    pub static INSUFFICIENT_SPACE: InsufficientSpace(ERROR) {
        status = 507;
        detail = "Filesystem {path} has only {avail} bytes free, need {need}";
        path: Str => "The filesystem mount point";
        avail: Int => "Number of bytes free on the filesystem";
        need: Int => "Number of bytes needed";
    }

    /// Raised when an arithmetic operation fails.
    pub static OP_ERROR: OpError(ERROR) {
        title = "The operation failed";
        detail = "Op {op}(a={a}, b={b}) failed: {error}";
        op: Str => "Name of the operation";
        a: Float => "First operand";
        b: Float => "Second operand";
        error: Str => "What went wrong";
    }

    /// Raised when something could not be done.
    pub static FAILED: Failed(ERROR) {
        detail = "Failed to {what}";
        what: Str => "What failed";
    }

    /// Base type for Foo errors.
    pub static FOO_ERROR: FooError(ERROR) {}

    /// Raised when an operation can't be done right now.
    pub static PLEASE_WAIT: PleaseWait(FOO_ERROR) {
        status = 503;
        detail = "Please wait at least {howlong} seconds";
        howlong: Int => "Minimum amount of time to wait";
    }
}
