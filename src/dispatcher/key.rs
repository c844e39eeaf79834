//! Keys, registration slots, dispatch candidates and default-key policy.
//!
//! A [`Key`] is what ends up in the registry. A [`Slot`] is what the caller
//! asks for at registration time (an explicit key or the next anonymous
//! numeric slot). A [`Candidate`] is what the caller asks for at dispatch
//! time: either a literal key or a function computing one from the live
//! arguments.

use std::fmt;
use std::sync::Arc;

/// Registered dispatcher key.
///
/// Keys are compared and hashed by value. Integer and string keys never
/// compare equal, so `Key::Int(1)` and `Key::Str("1")` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Numeric key (anonymous slots and status codes)
    Int(i64),
    /// String key (handler names, endpoint templates, method names)
    Str(Arc<str>),
}

impl Key {
    /// Text used when the key takes part in pattern matching.
    #[must_use]
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Key::Int(n) => std::borrow::Cow::Owned(n.to_string()),
            Key::Str(s) => std::borrow::Cow::Borrowed(s),
        }
    }

    /// The integer value, if this is a numeric key.
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(n) => Some(*n),
            Key::Str(_) => None,
        }
    }

    /// The string value, if this is a string key.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Int(_) => None,
            Key::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Arc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Arc::from(value))
    }
}

impl From<Arc<str>> for Key {
    fn from(value: Arc<str>) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<u16> for Key {
    fn from(value: u16) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Where a handler should be stored when it is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Next anonymous numeric slot: one past the largest non-negative integer
    /// key registered so far, or `0` for a fresh dispatcher.
    Auto,
    /// Explicit key. Re-registering an existing key replaces its handler in place.
    Key(Key),
}

impl From<Key> for Slot {
    fn from(value: Key) -> Self {
        Slot::Key(value)
    }
}

/// Function computing a key from the live dispatch arguments.
pub type ComputeKey<A> = Arc<dyn Fn(&A) -> Option<Key> + Send + Sync>;

/// Key requested at dispatch time.
///
/// `Computed` candidates are evaluated every time they are resolved, with the
/// arguments of that particular call. Resolving the same candidate twice may
/// therefore produce two different keys; callers must not cache the outcome.
pub enum Candidate<A> {
    /// A literal registered key
    Literal(Key),
    /// A key computed from the dispatch arguments; `None` means "no key"
    Computed(ComputeKey<A>),
}

impl<A> Candidate<A> {
    /// Build a computed candidate from a closure.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&A) -> Option<Key> + Send + Sync + 'static,
    {
        Candidate::Computed(Arc::new(f))
    }
}

impl<A> Clone for Candidate<A> {
    fn clone(&self) -> Self {
        match self {
            Candidate::Literal(k) => Candidate::Literal(k.clone()),
            Candidate::Computed(f) => Candidate::Computed(Arc::clone(f)),
        }
    }
}

impl<A> fmt::Debug for Candidate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Literal(k) => f.debug_tuple("Literal").field(k).finish(),
            Candidate::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<A> fmt::Display for Candidate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Literal(k) => write!(f, "{k}"),
            Candidate::Computed(_) => f.write_str("<computed>"),
        }
    }
}

impl<A> From<Key> for Candidate<A> {
    fn from(value: Key) -> Self {
        Candidate::Literal(value)
    }
}

/// Literal conversions shared by [`Slot`] and [`Candidate`].
macro_rules! literal_key_conversions {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Slot {
                fn from(value: $ty) -> Self {
                    Slot::Key(Key::from(value))
                }
            }

            impl<A> From<$ty> for Candidate<A> {
                fn from(value: $ty) -> Self {
                    Candidate::Literal(Key::from(value))
                }
            }
        )*
    };
}

literal_key_conversions!(&str, String, Arc<str>, i64, i32, u16, usize);

/// Registry-wide fallback key policy, chosen at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultPolicy {
    /// No global default; a missing key with no explicit default is undispatchable
    #[default]
    None,
    /// Fall back to this key (it need not be registered yet)
    Fixed(Key),
    /// Bind to whichever key is registered first, then behave as `Fixed`
    AutoFirstRegistered,
}

impl DefaultPolicy {
    /// The currently bound default key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match self {
            DefaultPolicy::Fixed(k) => Some(k),
            DefaultPolicy::None | DefaultPolicy::AutoFirstRegistered => None,
        }
    }
}
