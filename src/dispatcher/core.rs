//! Dispatcher core module - registry, fallback chain and dispatch strategies.
//!
//! Every strategy funnels through the same three-tier lookup:
//!
//! 1. the requested key, after evaluating it if it is computed
//! 2. the explicit default passed to the call
//! 3. the dispatcher's global default key
//!
//! If none of the three is registered the call fails with
//! [`UndispatchableError`]. Handler failures are reported separately as
//! [`DispatchError::Handler`].

use super::error::{DispatchError, UndispatchableError};
use super::key::{Candidate, DefaultPolicy, Key, Slot};
use crate::resolve::{self, Mutator, Resolution};
use dashmap::DashMap;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered handler.
///
/// Implemented for every `Fn(A) -> Result<R, E>` closure. Implement it by hand
/// on a struct when the handler should also be reachable as a delegate object
/// (see [`Dispatcher::delegate`]).
pub trait Handler<A, R, E>: Send + Sync + 'static {
    /// Invoke the handler with the dispatch arguments.
    fn call(&self, args: A) -> Result<R, E>;
}

impl<A, R, E, F> Handler<A, R, E> for F
where
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
{
    fn call(&self, args: A) -> Result<R, E> {
        self(args)
    }
}

/// Conversion from one pipeline stage's output into the next stage's arguments.
pub trait Spread<A> {
    /// Turn a stage result into the argument value for the next stage.
    fn spread(self) -> A;
}

impl<A> Spread<A> for A {
    fn spread(self) -> A {
        self
    }
}

/// JSON results spread into positional arguments.
///
/// An array becomes one argument per element; any other value becomes the
/// only argument. A handler that wants to pass a literal list on as a single
/// argument returns it wrapped in a one-element array: `[[1, 2]]`.
impl Spread<Vec<Value>> for Value {
    fn spread(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items,
            other => vec![other],
        }
    }
}

/// Which results [`Dispatcher::dispatch_to_all`] hands back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReturnKeys {
    /// Every result, keyed by dispatched key
    #[default]
    All,
    /// Only the result for this key
    One(Key),
    /// Only the results for these keys
    Some(Vec<Key>),
}

/// Results of a broadcast dispatch, narrowed by [`ReturnKeys`].
#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast<R> {
    /// Every result in dispatch order
    All(IndexMap<Key, R>),
    /// The single requested result; `None` if that key was not dispatched
    One(Option<R>),
    /// The intersection of the requested keys and the dispatched keys
    Some(IndexMap<Key, R>),
}

impl<R> Broadcast<R> {
    /// The results as a map, for `All` and `Some` outputs.
    #[must_use]
    pub fn into_map(self) -> Option<IndexMap<Key, R>> {
        match self {
            Broadcast::All(map) | Broadcast::Some(map) => Some(map),
            Broadcast::One(_) => None,
        }
    }

    /// The single result, for `One` outputs.
    #[must_use]
    pub fn into_one(self) -> Option<R> {
        match self {
            Broadcast::One(value) => value,
            Broadcast::All(_) | Broadcast::Some(_) => None,
        }
    }
}

/// Registry entry: the callable view and the object view of one handler.
struct Entry<A, R, E> {
    handler: Arc<dyn Handler<A, R, E>>,
    object: Arc<dyn Any + Send + Sync>,
}

/// Outcome of the three-tier lookup.
struct Selected<'d, A, R, E> {
    /// What the requested candidate resolved to, if anything
    requested: Option<Key>,
    /// Key of the handler that will actually run
    key: &'d Key,
    entry: &'d Entry<A, R, E>,
}

/// Ordered key-to-handler registry with fallback-aware dispatch strategies.
///
/// # Phases
///
/// Registration takes `&mut self` and is expected to happen up front. Every
/// dispatch method takes `&self`, so once built a dispatcher can be shared
/// (e.g. in an `Arc`) and dispatched from any number of threads.
///
/// # Ordering
///
/// Insertion order is preserved and meaningful: it is the iteration order of
/// [`dispatch_to_first`](Self::dispatch_to_first),
/// [`dispatch_to_all`](Self::dispatch_to_all) and
/// [`dispatch_to_pipe`](Self::dispatch_to_pipe) when no explicit key list is
/// given, and it decides which key [`DefaultPolicy::AutoFirstRegistered`]
/// binds to. Replacing a handler keeps its original position.
pub struct Dispatcher<A, R, E> {
    entries: IndexMap<Key, Entry<A, R, E>>,
    default: DefaultPolicy,
    /// Next anonymous numeric slot
    next_slot: i64,
    /// Compiled key patterns; `None` marks keys that are not valid patterns
    patterns: DashMap<Key, Option<Regex>>,
}

impl<A: 'static, R: 'static, E: 'static> Default for Dispatcher<A, R, E> {
    fn default() -> Self {
        Self::new(DefaultPolicy::None)
    }
}

impl<A, R, E> std::fmt::Debug for Dispatcher<A, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

impl<A: 'static, R: 'static, E: 'static> Dispatcher<A, R, E> {
    /// Create an empty dispatcher with the given global default policy.
    #[must_use]
    pub fn new(default: DefaultPolicy) -> Self {
        Dispatcher {
            entries: IndexMap::new(),
            default,
            next_slot: 0,
            patterns: DashMap::new(),
        }
    }

    /// Create a dispatcher pre-seeded from a key-to-handler mapping.
    ///
    /// Seeding goes through [`register`](Self::register), so
    /// `AutoFirstRegistered` binds to the first seeded key.
    pub fn with_handlers<S, H, I>(default: DefaultPolicy, handlers: I) -> Self
    where
        S: Into<Slot>,
        H: Handler<A, R, E>,
        I: IntoIterator<Item = (S, H)>,
    {
        let mut dispatcher = Self::new(default);
        for (slot, handler) in handlers {
            dispatcher.register(slot, handler);
        }
        dispatcher
    }

    /// Register `handler` under `slot` and return the key it was stored under.
    ///
    /// **IMPORTANT**: registering an existing key replaces its handler but
    /// keeps its position in the registry.
    pub fn register<H>(&mut self, slot: impl Into<Slot>, handler: H) -> Key
    where
        H: Handler<A, R, E>,
    {
        let key = match slot.into() {
            Slot::Auto => self.next_anonymous_key(),
            Slot::Key(key) => key,
        };

        if let Key::Int(n) = key {
            if n >= self.next_slot {
                self.next_slot = n.saturating_add(1);
            }
        }

        if self.default == DefaultPolicy::AutoFirstRegistered && self.entries.is_empty() {
            debug!(key = %key, "Global default key bound to first registered key");
            self.default = DefaultPolicy::Fixed(key.clone());
        }

        let handler = Arc::new(handler);
        let entry = Entry {
            handler: Arc::clone(&handler) as Arc<dyn Handler<A, R, E>>,
            object: handler as Arc<dyn Any + Send + Sync>,
        };

        if self.entries.insert(key.clone(), entry).is_some() {
            warn!(
                key = %key,
                total_handlers = self.entries.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                key = %key,
                total_handlers = self.entries.len(),
                "Handler registered successfully"
            );
        }

        key
    }

    /// Key for an anonymous registration; never an occupied key.
    ///
    /// Normally one past the largest integer key seen. Once that slot is
    /// taken (after `i64::MAX` was registered), the lowest free non-negative
    /// integer is used instead.
    fn next_anonymous_key(&self) -> Key {
        let next = Key::Int(self.next_slot);
        if !self.entries.contains_key(&next) {
            return next;
        }
        let free = (0..=i64::MAX)
            .map(Key::Int)
            .find(|key| !self.entries.contains_key(key))
            .unwrap_or(next);
        debug!(key = %free, "Anonymous slots exhausted, reusing lowest free slot");
        free
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// The bound global default key, if any.
    #[must_use]
    pub fn default_key(&self) -> Option<&Key> {
        self.default.key()
    }

    /// Registered keys paired with their compiled patterns.
    ///
    /// Keys that are not valid patterns are left out. Compiled patterns are
    /// cached, so this is cheap after the first call for a given key set.
    #[must_use]
    pub fn key_patterns(&self) -> Vec<(Key, Regex)> {
        self.entries
            .keys()
            .filter_map(|key| {
                let compiled = self
                    .patterns
                    .entry(key.clone())
                    .or_insert_with(|| resolve::compile_key_pattern(key))
                    .clone();
                compiled.map(|re| (key.clone(), re))
            })
            .collect()
    }

    /// The object registered under `key`, if it is a `T`.
    ///
    /// This is the explicit replacement for forwarding arbitrary member calls
    /// to a registered object: callers that need more than invocation ask for
    /// the object and call it directly.
    #[must_use]
    pub fn delegate<T: Any + Send + Sync>(&self, key: &Key) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        Arc::clone(&entry.object).downcast::<T>().ok()
    }

    /// Object view of the handler `candidate` evaluates to, without fallback.
    pub(crate) fn delegate_object(
        &self,
        candidate: &Candidate<A>,
        args: &A,
    ) -> Option<Arc<dyn Any + Send + Sync>> {
        let key = self.resolve_key(candidate, args)?;
        self.entries.get(&key).map(|entry| Arc::clone(&entry.object))
    }

    /// Fold `candidate` through `mutators`.
    ///
    /// Resolution is not idempotent when a mutator evaluates a computed
    /// candidate; see [`crate::resolve`].
    pub fn resolve(&self, candidate: Candidate<A>, mutators: &[Mutator<'_, A>]) -> Resolution<A> {
        resolve::fold(candidate, mutators)
    }

    /// Resolve a single candidate to a concrete key (call-if-callable only).
    fn resolve_key(&self, candidate: &Candidate<A>, args: &A) -> Option<Key> {
        let call = resolve::call_if_callable(args);
        resolve::fold(candidate.clone(), &[&call]).into_key()
    }

    /// Whether `candidate`, once evaluated with `args`, names a registered handler.
    #[must_use]
    pub fn is_dispatchable(&self, candidate: &Candidate<A>, args: &A) -> bool {
        self.resolve_key(candidate, args)
            .is_some_and(|key| self.entries.contains_key(&key))
    }

    /// Look up an already resolved key.
    fn lookup(&self, key: &Key) -> Option<(&Key, &Entry<A, R, E>)> {
        self.entries.get_key_value(key)
    }

    /// Explicit default, then global default.
    fn select_default(
        &self,
        explicit_default: Option<&Candidate<A>>,
        args: &A,
    ) -> Option<(&Key, &Entry<A, R, E>)> {
        if let Some(default) = explicit_default {
            if let Some(found) = self
                .resolve_key(default, args)
                .and_then(|key| self.lookup(&key))
            {
                debug!(default_key = %found.0, "Falling back to explicit default key");
                return Some(found);
            }
        }

        let found = self.default.key().and_then(|key| self.lookup(key));
        if let Some((key, _)) = found {
            debug!(default_key = %key, "Falling back to global default key");
        }
        found
    }

    /// The full three-tier lookup for one candidate.
    fn select(
        &self,
        candidate: &Candidate<A>,
        args: &A,
        explicit_default: Option<&Candidate<A>>,
    ) -> Result<Selected<'_, A, R, E>, UndispatchableError> {
        let requested = self.resolve_key(candidate, args);

        if let Some((key, entry)) = requested.as_ref().and_then(|k| self.lookup(k)) {
            return Ok(Selected {
                requested,
                key,
                entry,
            });
        }

        debug!(candidate = %candidate, resolved = ?requested, "Key not dispatchable");

        match self.select_default(explicit_default, args) {
            Some((key, entry)) => Ok(Selected {
                requested,
                key,
                entry,
            }),
            None => {
                let shown = requested
                    .as_ref()
                    .map_or_else(|| candidate.to_string(), Key::to_string);
                warn!(
                    requested = %shown,
                    available_handlers = self.entries.len(),
                    "Undispatchable key"
                );
                Err(UndispatchableError::new(Some(shown)))
            }
        }
    }

    fn invoke(&self, key: &Key, entry: &Entry<A, R, E>, args: A) -> Result<R, DispatchError<E>> {
        debug!(key = %key, "Dispatching to handler");
        entry.handler.call(args).map_err(DispatchError::Handler)
    }

    /// Candidate list for the list-based strategies: explicit or every registered key.
    fn candidates(&self, keys: Option<&[Candidate<A>]>) -> Vec<Candidate<A>> {
        match keys {
            Some(keys) => keys.to_vec(),
            None => self
                .entries
                .keys()
                .cloned()
                .map(Candidate::Literal)
                .collect(),
        }
    }

    /// Dispatch to one key with the three-tier fallback.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Undispatchable`] if neither the key nor either default
    /// is registered; [`DispatchError::Handler`] if the selected handler fails.
    pub fn dispatch_to_key(
        &self,
        key: impl Into<Candidate<A>>,
        args: A,
        explicit_default: Option<Candidate<A>>,
    ) -> Result<R, DispatchError<E>> {
        let candidate = key.into();
        let selected = self.select(&candidate, &args, explicit_default.as_ref())?;
        self.invoke(selected.key, selected.entry, args)
    }

    /// Dispatch to the first registered key whose pattern matches `subject`.
    ///
    /// Registered keys are treated as regular expressions (compiled once and
    /// cached, see [`key_patterns`](Self::key_patterns)) and tried in
    /// registration order. With no match the explicit default and then the
    /// global default are tried.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Undispatchable`] if no key matches and neither default
    /// is registered; [`DispatchError::Handler`] if the selected handler fails.
    pub fn dispatch_to_matching(
        &self,
        subject: &str,
        args: A,
        explicit_default: Option<Candidate<A>>,
    ) -> Result<R, DispatchError<E>> {
        let patterns = self.key_patterns();
        let search = resolve::match_pattern_against_registered::<A>(&patterns);
        let first = resolve::first_or_default::<A>(None);

        if let Some(key) = self
            .resolve(Candidate::from(subject), &[&search, &first])
            .into_key()
        {
            debug!(subject, key = %key, "Subject matched key pattern");
            return self.dispatch_to_key(key, args, explicit_default);
        }

        match self.select_default(explicit_default.as_ref(), &args) {
            Some((key, entry)) => self.invoke(key, entry, args),
            None => {
                warn!(
                    subject,
                    available_handlers = self.entries.len(),
                    "No key pattern matches subject"
                );
                Err(UndispatchableError::new(Some(subject.to_string())).into())
            }
        }
    }

    /// Dispatch to the first dispatchable key among `keys`.
    ///
    /// With `keys == None` the registered keys are tried in registration
    /// order. Candidates that evaluate to no key are skipped. If none is
    /// registered the explicit default and then the global default are tried.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Undispatchable`] if nothing, including both defaults,
    /// can be dispatched.
    pub fn dispatch_to_first(
        &self,
        keys: Option<&[Candidate<A>]>,
        args: A,
        explicit_default: Option<Candidate<A>>,
    ) -> Result<R, DispatchError<E>> {
        let candidates = self.candidates(keys);

        for candidate in &candidates {
            let Some(resolved) = self.resolve_key(candidate, &args) else {
                continue;
            };
            if let Some((key, entry)) = self.lookup(&resolved) {
                return self.invoke(key, entry, args);
            }
        }

        match self.select_default(explicit_default.as_ref(), &args) {
            Some((key, entry)) => self.invoke(key, entry, args),
            None => {
                let tried = candidates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!(candidates = %tried, "No candidate key is dispatchable");
                Err(UndispatchableError::new(Some(tried)).into())
            }
        }
    }

    /// Dispatch pipeline: feed each stage's result into the next stage.
    ///
    /// The first key receives `args`; every later key receives the previous
    /// result converted with [`Spread`]. Each stage uses the three-tier
    /// fallback. Returns the last stage's result.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Undispatchable`] for an empty pipeline or a stage that
    /// cannot be dispatched; [`DispatchError::Handler`] for the first failing stage.
    pub fn dispatch_to_pipe(
        &self,
        keys: Option<&[Candidate<A>]>,
        args: A,
        explicit_default: Option<Candidate<A>>,
    ) -> Result<R, DispatchError<E>>
    where
        R: Spread<A>,
    {
        let candidates = self.candidates(keys);
        let mut stages = candidates.iter();
        let Some(first) = stages.next() else {
            warn!("Empty dispatch pipeline");
            return Err(UndispatchableError::new(None).into());
        };

        let selected = self.select(first, &args, explicit_default.as_ref())?;
        let mut output = self.invoke(selected.key, selected.entry, args)?;

        for (stage, candidate) in stages.enumerate() {
            let next_args = output.spread();
            let selected = self.select(candidate, &next_args, explicit_default.as_ref())?;
            debug!(stage = stage + 1, key = %selected.key, "Pipeline stage");
            output = self.invoke(selected.key, selected.entry, next_args)?;
        }

        Ok(output)
    }
}

impl<A: Clone + 'static, R: 'static, E: 'static> Dispatcher<A, R, E> {
    /// Dispatch every candidate in turn and collect the results.
    ///
    /// Each candidate goes through the three-tier fallback, so a missing key
    /// is not fatal while a default resolves. Results are keyed by the
    /// requested key (a computed candidate is keyed by what it evaluated to,
    /// or by the default key that handled it). Handlers run sequentially in
    /// candidate order.
    ///
    /// # Errors
    ///
    /// The first [`DispatchError`] encountered; earlier handlers have already run.
    pub fn dispatch_to_all(
        &self,
        keys: Option<&[Candidate<A>]>,
        args: A,
        explicit_default: Option<Candidate<A>>,
        returns: ReturnKeys,
    ) -> Result<Broadcast<R>, DispatchError<E>> {
        let candidates = self.candidates(keys);
        let mut results: IndexMap<Key, R> = IndexMap::with_capacity(candidates.len());

        for candidate in &candidates {
            let selected = self.select(candidate, &args, explicit_default.as_ref())?;
            let result_key = selected
                .requested
                .clone()
                .unwrap_or_else(|| selected.key.clone());
            let value = self.invoke(selected.key, selected.entry, args.clone())?;
            results.insert(result_key, value);
        }

        Ok(match returns {
            ReturnKeys::All => Broadcast::All(results),
            ReturnKeys::One(key) => Broadcast::One(results.shift_remove(&key)),
            ReturnKeys::Some(keys) => Broadcast::Some(
                results
                    .into_iter()
                    .filter(|(key, _)| keys.contains(key))
                    .collect(),
            ),
        })
    }
}
