//! # Key Resolution
//!
//! Composable key transforms ("mutators") applied to a dispatch candidate
//! before it is looked up in a registry.
//!
//! A resolution starts from a [`Candidate`] and is folded left to right
//! through an ordered list of mutators. Each mutator receives the previous
//! step's [`Resolution`] and returns the next one:
//!
//! ```rust
//! use brrtdispatch::dispatcher::{Candidate, Key};
//! use brrtdispatch::resolve::{self, Resolution};
//!
//! let registered = vec![Key::from("user.show"), Key::from("user.list")];
//! let args = ();
//! let call = resolve::call_if_callable(&args);
//! let search = resolve::match_registered_against_pattern(&registered);
//! let first = resolve::first_or_default(None);
//!
//! let res = resolve::fold(Candidate::from("^user\\."), &[&call, &search, &first]);
//! assert_eq!(res.into_key(), Some(Key::from("user.show")));
//! ```
//!
//! Mutators are not required to be pure. [`call_if_callable`] evaluates a
//! computed candidate with the live arguments, so folding the same nominal
//! candidate twice can yield two different keys.
//!
//! ## Patterns
//!
//! Pattern mutators use [`regex`] syntax and are unanchored: `user` matches
//! `poweruser`. Anchor with `^...$` for whole-key matches. A string that is
//! not a valid pattern never matches anything.

use crate::dispatcher::{Candidate, Key};
use regex::Regex;
use tracing::debug;

/// Intermediate value threaded through the mutators.
pub enum Resolution<A> {
    /// Nothing resolved
    Absent,
    /// A candidate that has not been evaluated yet
    Pending(Candidate<A>),
    /// A single key
    One(Key),
    /// A set of keys, in registration order
    Many(Vec<Key>),
}

impl<A> Resolution<A> {
    /// The single resolved key.
    ///
    /// `Many` collapses to its first element; `Pending` and `Absent` yield `None`.
    #[must_use]
    pub fn into_key(self) -> Option<Key> {
        match self {
            Resolution::One(k) => Some(k),
            Resolution::Many(keys) => keys.into_iter().next(),
            Resolution::Absent | Resolution::Pending(_) => None,
        }
    }

    /// Every resolved key.
    #[must_use]
    pub fn into_keys(self) -> Vec<Key> {
        match self {
            Resolution::One(k) => vec![k],
            Resolution::Many(keys) => keys,
            Resolution::Absent | Resolution::Pending(_) => Vec::new(),
        }
    }

    /// Whether nothing was resolved.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Resolution::Absent => true,
            Resolution::Many(keys) => keys.is_empty(),
            Resolution::Pending(_) | Resolution::One(_) => false,
        }
    }
}

impl<A> From<Candidate<A>> for Resolution<A> {
    fn from(candidate: Candidate<A>) -> Self {
        match candidate {
            Candidate::Literal(k) => Resolution::One(k),
            computed @ Candidate::Computed(_) => Resolution::Pending(computed),
        }
    }
}

impl<A> std::fmt::Debug for Resolution<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Absent => f.write_str("Absent"),
            Resolution::Pending(c) => f.debug_tuple("Pending").field(c).finish(),
            Resolution::One(k) => f.debug_tuple("One").field(k).finish(),
            Resolution::Many(keys) => f.debug_tuple("Many").field(keys).finish(),
        }
    }
}

/// A single resolution step.
pub type Mutator<'m, A> = &'m dyn Fn(Resolution<A>) -> Resolution<A>;

/// Fold `candidate` through `mutators`, left to right.
pub fn fold<A>(candidate: Candidate<A>, mutators: &[Mutator<'_, A>]) -> Resolution<A> {
    mutators
        .iter()
        .fold(Resolution::from(candidate), |acc, mutator| mutator(acc))
}

/// Evaluate a computed candidate with `args`; everything else passes through.
pub fn call_if_callable<A>(args: &A) -> impl Fn(Resolution<A>) -> Resolution<A> + '_ {
    move |res| match res {
        Resolution::Pending(Candidate::Computed(compute)) => match compute(args) {
            Some(key) => Resolution::One(key),
            None => Resolution::Absent,
        },
        Resolution::Pending(Candidate::Literal(key)) => Resolution::One(key),
        other => other,
    }
}

/// Treat the resolved key as a pattern and return the registered keys it matches.
///
/// Registered keys are only ever matched against, never compiled.
pub fn match_registered_against_pattern<A>(
    registered: &[Key],
) -> impl Fn(Resolution<A>) -> Resolution<A> + '_ {
    move |res| {
        let patterns = match res {
            Resolution::One(k) => vec![k],
            Resolution::Many(keys) => keys,
            Resolution::Absent | Resolution::Pending(_) => Vec::new(),
        };
        let compiled: Vec<Regex> = patterns
            .iter()
            .filter_map(|p| compile_key_pattern(p))
            .collect();
        Resolution::Many(
            registered
                .iter()
                .filter(|key| {
                    let text = key.as_text();
                    compiled.iter().any(|re| re.is_match(&text))
                })
                .cloned()
                .collect(),
        )
    }
}

/// Treat every registered key as a pattern and return those matching the resolved key.
///
/// `patterns` pairs each registered key with its compiled form; keys that do
/// not compile are simply left out of the slice by the caller.
pub fn match_pattern_against_registered<A>(
    patterns: &[(Key, Regex)],
) -> impl Fn(Resolution<A>) -> Resolution<A> + '_ {
    move |res| {
        let subject = match res {
            Resolution::One(k) => k,
            Resolution::Many(keys) => match keys.into_iter().next() {
                Some(k) => k,
                None => return Resolution::Many(Vec::new()),
            },
            Resolution::Absent | Resolution::Pending(_) => return Resolution::Many(Vec::new()),
        };
        let text = subject.as_text();
        Resolution::Many(
            patterns
                .iter()
                .filter(|(_, re)| re.is_match(&text))
                .map(|(key, _)| key.clone())
                .collect(),
        )
    }
}

/// Collapse a set of keys to its first element, or `fallback` when empty.
pub fn first_or_default<A>(fallback: Option<Key>) -> impl Fn(Resolution<A>) -> Resolution<A> {
    move |res| {
        let picked = match res {
            Resolution::One(k) => Some(k),
            Resolution::Many(keys) => keys.into_iter().next(),
            Resolution::Absent | Resolution::Pending(_) => None,
        };
        match picked.or_else(|| fallback.clone()) {
            Some(k) => Resolution::One(k),
            None => Resolution::Absent,
        }
    }
}

/// Compile a key's text as a pattern; invalid patterns yield `None`.
pub fn compile_key_pattern(key: &Key) -> Option<Regex> {
    match Regex::new(&key.as_text()) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(key = %key, error = %e, "Key is not a valid pattern");
            None
        }
    }
}
