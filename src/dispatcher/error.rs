use std::fmt;

/// The requested key, its explicit default and the dispatcher's global
/// default all failed to resolve to a registered handler.
///
/// This is the only failure the dispatcher itself produces. Callers such as
/// the router catch it to move on to their next fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndispatchableError {
    /// Display form of the key that was asked for (`None` when nothing was
    /// requested, e.g. an empty pipeline or an unset delegate)
    pub requested: Option<String>,
}

impl UndispatchableError {
    /// Create an error for the given requested key.
    #[must_use]
    pub fn new(requested: Option<String>) -> Self {
        Self { requested }
    }
}

impl fmt::Display for UndispatchableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.requested {
            Some(key) => write!(
                f,
                "key '{key}' is not dispatchable and no default key could be dispatched"
            ),
            None => write!(f, "nothing to dispatch and no default key could be dispatched"),
        }
    }
}

impl std::error::Error for UndispatchableError {}

/// Outcome of a failed dispatch.
///
/// Keeps "no handler could be found" apart from "the handler ran and failed"
/// so callers can drive fallback on the former and propagate the latter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError<E> {
    /// No handler could be resolved
    Undispatchable(UndispatchableError),
    /// The resolved handler returned an error
    Handler(E),
}

impl<E> DispatchError<E> {
    /// The handler's own error, if the handler ran.
    #[must_use]
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            DispatchError::Handler(e) => Some(e),
            DispatchError::Undispatchable(_) => None,
        }
    }

    /// Whether the dispatch failed before any handler ran.
    #[must_use]
    pub fn is_undispatchable(&self) -> bool {
        matches!(self, DispatchError::Undispatchable(_))
    }
}

impl<E> From<UndispatchableError> for DispatchError<E> {
    fn from(err: UndispatchableError) -> Self {
        DispatchError::Undispatchable(err)
    }
}

impl<E: fmt::Display> fmt::Display for DispatchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Undispatchable(e) => write!(f, "{e}"),
            DispatchError::Handler(e) => write!(f, "handler failed: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DispatchError<E> {}
