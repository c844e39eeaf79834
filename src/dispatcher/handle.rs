//! Reusable handles closing over a dispatch strategy.
//!
//! A handle fixes the key (or key list), the explicit default and, for
//! list strategies, the output selection, and can then be invoked any number
//! of times with fresh arguments. Handles may also name a *delegate key*:
//! the object registered under it is returned by
//! [`Invocable::as_delegate`], so a handle can stand in for that object
//! while only its invocation is redirected.

use super::core::{Broadcast, Dispatcher, ReturnKeys, Spread};
use super::error::{DispatchError, UndispatchableError};
use super::key::Candidate;
use std::any::Any;
use std::sync::Arc;

/// Something that can be invoked like a handler and may stand in for a
/// registered object.
pub trait Invocable<A> {
    /// Successful invocation result
    type Output;
    /// Invocation failure
    type Error;

    /// Run the handle's strategy with `args`.
    fn invoke(&self, args: A) -> Result<Self::Output, Self::Error>;

    /// The delegate object, if a delegate key was configured.
    ///
    /// # Errors
    ///
    /// [`UndispatchableError`] if a delegate key is configured but is not
    /// registered once evaluated with `args`.
    fn as_delegate(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError>;

    /// The delegate object downcast to `T`; `Ok(None)` if there is no
    /// delegate or it is not a `T`.
    ///
    /// # Errors
    ///
    /// Same as [`as_delegate`](Self::as_delegate).
    fn delegate<T: Any + Send + Sync>(
        &self,
        args: &A,
    ) -> Result<Option<Arc<T>>, UndispatchableError>
    where
        Self: Sized,
    {
        Ok(self
            .as_delegate(args)?
            .and_then(|object| object.downcast::<T>().ok()))
    }
}

/// State shared by every handle kind.
struct HandleCore<'d, A, R, E> {
    dispatcher: &'d Dispatcher<A, R, E>,
    default: Option<Candidate<A>>,
    delegate: Option<Candidate<A>>,
}

impl<A: 'static, R: 'static, E: 'static> HandleCore<'_, A, R, E> {
    fn delegate_object(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError> {
        match &self.delegate {
            None => Ok(None),
            Some(candidate) => self
                .dispatcher
                .delegate_object(candidate, args)
                .map(Some)
                .ok_or_else(|| UndispatchableError::new(Some(candidate.to_string()))),
        }
    }
}

/// Handle for [`Dispatcher::dispatch_to_key`].
pub struct KeyHandle<'d, A, R, E> {
    core: HandleCore<'d, A, R, E>,
    key: Candidate<A>,
}

/// Handle for [`Dispatcher::dispatch_to_first`].
pub struct FirstHandle<'d, A, R, E> {
    core: HandleCore<'d, A, R, E>,
    keys: Option<Vec<Candidate<A>>>,
}

/// Handle for [`Dispatcher::dispatch_to_all`].
pub struct AllHandle<'d, A, R, E> {
    core: HandleCore<'d, A, R, E>,
    keys: Option<Vec<Candidate<A>>>,
    returns: ReturnKeys,
}

/// Handle for [`Dispatcher::dispatch_to_pipe`].
pub struct PipeHandle<'d, A, R, E> {
    core: HandleCore<'d, A, R, E>,
    keys: Option<Vec<Candidate<A>>>,
}

macro_rules! delegating_to {
    ($($handle:ident),*) => {
        $(
            impl<A, R, E> $handle<'_, A, R, E> {
                /// Expose the object registered under `key` through
                /// [`Invocable::as_delegate`].
                #[must_use]
                pub fn delegating_to(mut self, key: impl Into<Candidate<A>>) -> Self {
                    self.core.delegate = Some(key.into());
                    self
                }
            }
        )*
    };
}

delegating_to!(KeyHandle, FirstHandle, AllHandle, PipeHandle);

impl<A: 'static, R: 'static, E: 'static> Invocable<A> for KeyHandle<'_, A, R, E> {
    type Output = R;
    type Error = DispatchError<E>;

    fn invoke(&self, args: A) -> Result<R, DispatchError<E>> {
        self.core
            .dispatcher
            .dispatch_to_key(self.key.clone(), args, self.core.default.clone())
    }

    fn as_delegate(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError> {
        self.core.delegate_object(args)
    }
}

impl<A: 'static, R: 'static, E: 'static> Invocable<A> for FirstHandle<'_, A, R, E> {
    type Output = R;
    type Error = DispatchError<E>;

    fn invoke(&self, args: A) -> Result<R, DispatchError<E>> {
        self.core.dispatcher.dispatch_to_first(
            self.keys.as_deref(),
            args,
            self.core.default.clone(),
        )
    }

    fn as_delegate(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError> {
        self.core.delegate_object(args)
    }
}

impl<A: Clone + 'static, R: 'static, E: 'static> Invocable<A> for AllHandle<'_, A, R, E> {
    type Output = Broadcast<R>;
    type Error = DispatchError<E>;

    fn invoke(&self, args: A) -> Result<Broadcast<R>, DispatchError<E>> {
        self.core.dispatcher.dispatch_to_all(
            self.keys.as_deref(),
            args,
            self.core.default.clone(),
            self.returns.clone(),
        )
    }

    fn as_delegate(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError> {
        self.core.delegate_object(args)
    }
}

impl<A: 'static, R: Spread<A> + 'static, E: 'static> Invocable<A> for PipeHandle<'_, A, R, E> {
    type Output = R;
    type Error = DispatchError<E>;

    fn invoke(&self, args: A) -> Result<R, DispatchError<E>> {
        self.core.dispatcher.dispatch_to_pipe(
            self.keys.as_deref(),
            args,
            self.core.default.clone(),
        )
    }

    fn as_delegate(
        &self,
        args: &A,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, UndispatchableError> {
        self.core.delegate_object(args)
    }
}

impl<A: 'static, R: 'static, E: 'static> Dispatcher<A, R, E> {
    fn core(&self, default: Option<Candidate<A>>) -> HandleCore<'_, A, R, E> {
        HandleCore {
            dispatcher: self,
            default,
            delegate: None,
        }
    }

    /// Reusable handle for [`dispatch_to_key`](Self::dispatch_to_key).
    #[must_use]
    pub fn handler_for_key(
        &self,
        key: impl Into<Candidate<A>>,
        explicit_default: Option<Candidate<A>>,
    ) -> KeyHandle<'_, A, R, E> {
        KeyHandle {
            core: self.core(explicit_default),
            key: key.into(),
        }
    }

    /// Reusable handle for [`dispatch_to_first`](Self::dispatch_to_first).
    #[must_use]
    pub fn handler_for_first(
        &self,
        keys: Option<Vec<Candidate<A>>>,
        explicit_default: Option<Candidate<A>>,
    ) -> FirstHandle<'_, A, R, E> {
        FirstHandle {
            core: self.core(explicit_default),
            keys,
        }
    }

    /// Reusable handle for [`dispatch_to_all`](Self::dispatch_to_all).
    #[must_use]
    pub fn handler_for_all(
        &self,
        keys: Option<Vec<Candidate<A>>>,
        explicit_default: Option<Candidate<A>>,
        returns: ReturnKeys,
    ) -> AllHandle<'_, A, R, E> {
        AllHandle {
            core: self.core(explicit_default),
            keys,
            returns,
        }
    }

    /// Reusable handle for [`dispatch_to_pipe`](Self::dispatch_to_pipe).
    #[must_use]
    pub fn handler_for_pipe(
        &self,
        keys: Option<Vec<Candidate<A>>>,
        explicit_default: Option<Candidate<A>>,
    ) -> PipeHandle<'_, A, R, E> {
        PipeHandle {
            core: self.core(explicit_default),
            keys,
        }
    }
}
