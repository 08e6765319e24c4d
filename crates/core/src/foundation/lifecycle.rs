use std::fmt;

/// Lifecycle states of a running scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initializing,
    Running,
    Disposing,
    Disposed,
    Failed,
}

impl LifecycleState {
    /// Whether per-frame updates may be dispatched in this state
    pub fn accepts_updates(&self) -> bool {
        matches!(self, LifecycleState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Disposed | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::Disposing => "disposing",
            LifecycleState::Disposed => "disposed",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_accepts_updates() {
        assert!(LifecycleState::Running.accepts_updates());
        assert!(!LifecycleState::Created.accepts_updates());
        assert!(!LifecycleState::Disposed.accepts_updates());
        assert!(LifecycleState::Failed.is_terminal());
        assert_eq!(LifecycleState::Disposing.to_string(), "disposing");
    }
}
