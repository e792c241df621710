//! Hookable request pipeline
//!
//! Every action runs three [`Phase`]s in order: fetch, write, send. Each phase
//! runs its before-hooks, the action's core step, then its after-hooks, all
//! against one per-request [`Context`]. Hooks return a [`Flow`] to continue,
//! skip the rest of the phase, or complete the request with their own reply.
//!
//! # Example
//!
//! ```rust
//! use acton_rest::pipeline::{sync_hook, Flow, Phase, PhaseName};
//!
//! let mut fetch = Phase::new(PhaseName::Fetch);
//! fetch.before(sync_hook(|ctx| {
//!     ctx.count = Some(10);
//!     Flow::proceed()
//! }));
//! ```

mod context;
mod hook;
mod phase;

pub use context::{ActionState, Context, RequestParts, ResponseParts};
pub use hook::{hook, sync_hook, AsyncHook, Flow, Hook, HookResult};
pub use phase::{HookPosition, Phase, PhaseCore, PhaseName};
