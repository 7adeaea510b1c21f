// ============================================================================
// Resolve State
// ============================================================================
//
// Lifecycle tag carried by every handle:
//
//   NEW ──> TRANSIENT ──> RESOLVED
//    │                     ▲   │
//    ├──> GHOST ──> RESOLVING  ├──> UPDATING ──> RESOLVED
//    │      │                  ├──> GHOST
//    │      └──> UPDATING      └──> DESTROYED
//    │      └──> DESTROYED
//    └──> VALUE
//
// The part-resolved and serializing states are kept only so that codes
// read from older sources still parse; nothing transitions into them.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolveState {
    New,
    Transient,
    Ghost,
    Resolving,
    /// Deprecated.
    ResolvingPart,
    /// Deprecated.
    PartResolved,
    Resolved,
    Updating,
    Value,
    Destroyed,
    SerializingTransient,
    SerializingGhost,
    SerializingPartResolved,
    SerializingResolved,
}

impl ResolveState {
    pub const ALL: [ResolveState; 14] = [
        ResolveState::New,
        ResolveState::Transient,
        ResolveState::Ghost,
        ResolveState::Resolving,
        ResolveState::ResolvingPart,
        ResolveState::PartResolved,
        ResolveState::Resolved,
        ResolveState::Updating,
        ResolveState::Value,
        ResolveState::Destroyed,
        ResolveState::SerializingTransient,
        ResolveState::SerializingGhost,
        ResolveState::SerializingPartResolved,
        ResolveState::SerializingResolved,
    ];

    /// Short stable tag, used in log output and dumps.
    pub fn code(&self) -> &'static str {
        match self {
            Self::New => "N",
            Self::Transient => "T",
            Self::Ghost => "G",
            Self::Resolving => "~R",
            Self::ResolvingPart => "~P",
            Self::PartResolved => "Pr",
            Self::Resolved => "R",
            Self::Updating => "U",
            Self::Value => "V",
            Self::Destroyed => "D",
            Self::SerializingTransient => "ST",
            Self::SerializingGhost => "SG",
            Self::SerializingPartResolved => "SP",
            Self::SerializingResolved => "SR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Transient => "TRANSIENT",
            Self::Ghost => "GHOST",
            Self::Resolving => "RESOLVING",
            Self::ResolvingPart => "RESOLVING_PART",
            Self::PartResolved => "PART_RESOLVED",
            Self::Resolved => "RESOLVED",
            Self::Updating => "UPDATING",
            Self::Value => "VALUE",
            Self::Destroyed => "DESTROYED",
            Self::SerializingTransient => "SERIALIZING_TRANSIENT",
            Self::SerializingGhost => "SERIALIZING_GHOST",
            Self::SerializingPartResolved => "SERIALIZING_PART_RESOLVED",
            Self::SerializingResolved => "SERIALIZING_RESOLVED",
        }
    }

    /// Whether loading the full state of the object is meaningful from here.
    pub fn could_resolve(&self) -> bool {
        matches!(
            self,
            Self::Ghost
                | Self::Resolving
                | Self::ResolvingPart
                | Self::Updating
                | Self::SerializingGhost
                | Self::SerializingPartResolved
        )
    }

    /// The state a transitional state collapses to once its operation completes.
    pub fn end_state(&self) -> Option<ResolveState> {
        match self {
            Self::Resolving | Self::Updating => Some(Self::Resolved),
            _ => None,
        }
    }

    pub fn is_transitional(&self) -> bool {
        self.end_state().is_some()
    }

    pub fn is_valid_to_change_to(&self, target: ResolveState) -> bool {
        use ResolveState::*;
        matches!(
            (*self, target),
            (New, Ghost | Transient | Value)
                | (Ghost, Resolving | Destroyed | Updating)
                | (Transient, Resolved)
                | (Resolving, Resolved)
                | (Resolved, Ghost | Destroyed | Updating)
                | (Updating, Resolved)
        )
    }

    /// States in which the object is known to the store.
    pub fn represents_persistent(&self) -> bool {
        matches!(
            self,
            Self::Ghost
                | Self::Resolving
                | Self::ResolvingPart
                | Self::PartResolved
                | Self::Resolved
                | Self::Updating
                | Self::SerializingGhost
                | Self::SerializingPartResolved
                | Self::SerializingResolved
        )
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self, Self::Ghost)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving)
    }

    pub fn is_updating(&self) -> bool {
        matches!(self, Self::Updating)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value)
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    pub fn is_serializing(&self) -> bool {
        matches!(
            self,
            Self::SerializingTransient
                | Self::SerializingGhost
                | Self::SerializingPartResolved
                | Self::SerializingResolved
        )
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
