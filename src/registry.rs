use std::collections::HashSet;

use crate::error::Result;

/// A collection of named flags the binder can read and update.
///
/// The registry owns the flags; callers only go through these methods.
pub trait FlagRegistry {
    /// Names of every registered flag, in the order they should be visited.
    fn flag_names(&self) -> Vec<String>;

    /// Names of the flags the user supplied on the command line.
    fn explicitly_set(&self) -> HashSet<String>;

    /// Assign a value to a flag from its string form.
    ///
    /// This must not mark the flag as explicitly set. Parse failures are
    /// returned as [`Error::InvalidValue`](crate::Error::InvalidValue).
    fn set_value(&mut self, name: &str, value: &str) -> Result<()>;

    /// Append `suffix` to the flag's usage text.
    fn append_usage(&mut self, name: &str, suffix: &str);
}
