//! Lifecycle states and the transitions allowed between them.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a registry entry.
///
/// ```text
/// Discovered → Registered → Initialized ⇄ Executing
///                  │             │            │
///                  └──────┬──────┴────────────┘
///                         ▼
///                Failed ─────► ShutDown
/// ```
///
/// `ShutDown` is terminal. `Failed` only leads to `ShutDown`, through an
/// explicit deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Found by a scan; not yet recorded in a registry.
    Discovered,
    /// Recorded in a registry; no live instance.
    Registered,
    /// Instance exists and `initialize` succeeded.
    Initialized,
    /// An execution chain is in flight.
    Executing,
    /// `shutdown` has run and the instance is released.
    ShutDown,
    /// A lifecycle method failed; the entry needs re-registration.
    Failed,
}

impl PluginState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Registered => "registered",
            Self::Initialized => "initialized",
            Self::Executing => "executing",
            Self::ShutDown => "shut_down",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Registered)
                | (
                    Self::Registered,
                    Self::Initialized | Self::Failed | Self::ShutDown
                )
                | (
                    Self::Initialized,
                    Self::Executing | Self::Failed | Self::ShutDown
                )
                | (Self::Executing, Self::Initialized | Self::Failed)
                | (Self::Failed, Self::ShutDown)
        )
    }

    /// Returns `true` for states that never change again without a new
    /// registration.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ShutDown | Self::Failed)
    }

    /// Returns `true` when a name in this state may be registered again.
    #[must_use]
    pub const fn allows_reregistration(self) -> bool {
        matches!(self, Self::ShutDown)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names each plugin method the registry invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    /// The factory constructing the instance.
    Instantiate,
    /// [`Plugin::initialize`](crate::Plugin::initialize).
    Initialize,
    /// [`Plugin::before_execute`](crate::Plugin::before_execute).
    BeforeExecute,
    /// [`Plugin::execute`](crate::Plugin::execute).
    Execute,
    /// [`Plugin::after_execute`](crate::Plugin::after_execute).
    AfterExecute,
    /// [`Plugin::shutdown`](crate::Plugin::shutdown).
    Shutdown,
}

impl LifecycleHook {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instantiate => "instantiate",
            Self::Initialize => "initialize",
            Self::BeforeExecute => "before_execute",
            Self::Execute => "execute",
            Self::AfterExecute => "after_execute",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
