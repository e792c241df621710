//! Named pipeline stages with before/after hook slots

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Context, Flow, Hook, HookResult};
use crate::handlers::{ApiError, Reply};

/// The three stages every action runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseName {
    /// Load records
    Fetch,
    /// Persist changes
    Write,
    /// Build the response
    Send,
}

impl PhaseName {
    /// Execution order
    pub const ALL: [PhaseName; 3] = [Self::Fetch, Self::Write, Self::Send];
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Write => write!(f, "write"),
            Self::Send => write!(f, "send"),
        }
    }
}

/// Whether a hook runs before or after the core step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPosition {
    /// Before the core step
    Before,
    /// After the core step
    After,
}

impl fmt::Display for HookPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

/// The core step of a phase, supplied by an action controller
#[async_trait]
pub trait PhaseCore: Send + Sync {
    /// Run the core step of `phase`
    async fn run_core(&self, phase: PhaseName, ctx: &mut Context) -> HookResult;
}

/// One named stage of one action
///
/// Hooks are appended during setup. Once the owning resource is turned into a
/// router the phase is shared read-only by every request.
#[derive(Clone)]
pub struct Phase {
    name: PhaseName,
    before: Vec<Arc<dyn Hook>>,
    after: Vec<Arc<dyn Hook>>,
}

impl Phase {
    /// An empty phase
    pub fn new(name: PhaseName) -> Self {
        Self {
            name,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Phase name
    pub fn name(&self) -> PhaseName {
        self.name
    }

    /// Append a hook to the given slot
    pub fn add(&mut self, position: HookPosition, hook: Arc<dyn Hook>) {
        match position {
            HookPosition::Before => self.before.push(hook),
            HookPosition::After => self.after.push(hook),
        }
    }

    /// Append a before-hook
    pub fn before(&mut self, hook: impl Hook + 'static) -> &mut Self {
        self.before.push(Arc::new(hook));
        self
    }

    /// Append an after-hook
    pub fn after(&mut self, hook: impl Hook + 'static) -> &mut Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Number of registered hooks in a slot
    pub fn hook_count(&self, position: HookPosition) -> usize {
        match position {
            HookPosition::Before => self.before.len(),
            HookPosition::After => self.after.len(),
        }
    }

    /// Run before-hooks, the core step, then after-hooks
    ///
    /// Returns `Some(reply)` when a hook or the core completed the request
    /// early, `None` to move on to the next phase. The first error aborts the
    /// remaining hooks.
    pub async fn run(
        &self,
        core: &dyn PhaseCore,
        ctx: &mut Context,
    ) -> Result<Option<Reply>, ApiError> {
        let name = self.name();

        for (index, hook) in self.before.iter().enumerate() {
            let flow = hook.call(ctx).await?;
            tracing::trace!(phase = %name, position = "before", index, flow = %flow, "Hook finished");
            match flow {
                Flow::Continue => {}
                Flow::Skip => return Ok(None),
                Flow::Complete(reply) => return Ok(Some(reply)),
            }
        }

        match core.run_core(name, ctx).await? {
            Flow::Continue => {}
            Flow::Skip => return Ok(None),
            Flow::Complete(reply) => return Ok(Some(reply)),
        }

        for (index, hook) in self.after.iter().enumerate() {
            let flow = hook.call(ctx).await?;
            tracing::trace!(phase = %name, position = "after", index, flow = %flow, "Hook finished");
            match flow {
                Flow::Continue => {}
                Flow::Skip => return Ok(None),
                Flow::Complete(reply) => return Ok(Some(reply)),
            }
        }

        Ok(None)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
