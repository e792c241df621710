//! Hook signatures and control flow

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::Context;
use crate::handlers::{ApiError, Reply};

/// What a hook or core step tells the phase runner to do next
#[derive(Debug)]
pub enum Flow {
    /// Run the next hook or step
    Continue,
    /// Skip the rest of the current phase and move on to the next phase
    Skip,
    /// The response is ready; skip every remaining hook, step and phase
    Complete(Reply),
}

impl Flow {
    /// `Ok(Flow::Continue)`, for the common hook return
    pub fn proceed() -> HookResult {
        Ok(Self::Continue)
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Skip => write!(f, "skip"),
            Self::Complete(_) => write!(f, "complete"),
        }
    }
}

/// Result of a hook; an error aborts the whole action
pub type HookResult = Result<Flow, ApiError>;

/// A function run before or after a phase's core step
#[async_trait]
pub trait Hook: Send + Sync {
    /// Inspect or mutate the context
    async fn call(&self, ctx: &mut Context) -> HookResult;
}

struct AsyncFnHook<F>(F);

#[async_trait]
impl<F> Hook for AsyncFnHook<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HookResult> + Send + Sync,
{
    async fn call(&self, ctx: &mut Context) -> HookResult {
        (self.0)(ctx).await
    }
}

struct SyncFnHook<F>(F);

#[async_trait]
impl<F> Hook for SyncFnHook<F>
where
    F: Fn(&mut Context) -> HookResult + Send + Sync,
{
    async fn call(&self, ctx: &mut Context) -> HookResult {
        (self.0)(ctx)
    }
}

/// Wrap an async closure as a hook
///
/// ```rust
/// use acton_rest::pipeline::{hook, Flow};
///
/// let stamp = hook(|ctx| {
///     Box::pin(async move {
///         ctx.attributes.insert("source".into(), "api".into());
///         Flow::proceed()
///     })
/// });
/// # let _ = stamp;
/// ```
pub fn hook<F>(f: F) -> AsyncHook
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HookResult> + Send + Sync + 'static,
{
    AsyncHook(Box::new(AsyncFnHook(f)))
}

/// Wrap a synchronous closure as a hook
///
/// ```rust
/// use acton_rest::pipeline::{sync_hook, Flow};
///
/// let shallow = sync_hook(|ctx| {
///     ctx.shallow = true;
///     Flow::proceed()
/// });
/// # let _ = shallow;
/// ```
pub fn sync_hook<F>(f: F) -> AsyncHook
where
    F: Fn(&mut Context) -> HookResult + Send + Sync + 'static,
{
    AsyncHook(Box::new(SyncFnHook(f)))
}

/// A boxed hook built from a closure
pub struct AsyncHook(Box<dyn Hook>);

#[async_trait]
impl Hook for AsyncHook {
    async fn call(&self, ctx: &mut Context) -> HookResult {
        self.0.call(ctx).await
    }
}

impl fmt::Debug for AsyncHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncHook(..)")
    }
}
