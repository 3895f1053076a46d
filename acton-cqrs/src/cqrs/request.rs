//! Command and query marker traits

/// A value dispatched to exactly one handler
///
/// `NAME` is the stable name used for logs, endpoint names and registry
/// errors. Prefer it over `type_name::<T>()`, which changes with refactors.
pub trait Request: Send + 'static {
    /// Stable name, e.g. `"CreateProduct"`
    const NAME: &'static str;

    /// Value produced by a successful handler; `()` for fire-and-forget
    /// commands
    type Result: Send + 'static;
}

/// Intent to mutate state
///
/// # Example
///
/// ```rust
/// use acton_cqrs::cqrs::{Command, Request};
///
/// struct DeleteProduct {
///     id: u64,
/// }
///
/// impl Request for DeleteProduct {
///     const NAME: &'static str = "DeleteProduct";
///     type Result = ();
/// }
///
/// impl Command for DeleteProduct {}
/// ```
pub trait Command: Request {}

/// Intent to read state; always carries a result
pub trait Query: Request {}
