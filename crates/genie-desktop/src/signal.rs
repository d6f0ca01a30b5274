//! Session-scoped one-shot completion signals

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityMap};
use crate::scheduler::SessionId;

/// A flag that can be raised once and never lowered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OneShot {
    set: bool,
}

impl OneShot {
    /// Raise the flag; returns true only for the call that raised it
    #[inline]
    pub fn fire(&mut self) -> bool {
        let first = !self.set;
        self.set = true;
        first
    }

    /// Check if the flag has been raised
    #[inline]
    pub fn is_set(&self) -> bool {
        self.set
    }
}

/// Per-entity reveal completion flags for one session
///
/// A new session always starts with every flag lowered; the previous
/// session's flags are dropped with it.
#[derive(Clone, Debug)]
pub struct RevealSignals {
    session: SessionId,
    flags: EntityMap<OneShot>,
}

impl RevealSignals {
    /// Fresh signals for a session
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            flags: EntityMap::default(),
        }
    }

    /// Owning session
    #[inline]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Mark an entity's reveal complete; true if this was the first time
    pub fn complete(&mut self, id: EntityId) -> bool {
        self.flags[id].fire()
    }

    /// Check if an entity's reveal has completed
    #[inline]
    pub fn is_complete(&self, id: EntityId) -> bool {
        self.flags[id].is_set()
    }

    /// Page-visible view of the flags
    pub fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            session: self.session,
            hello_belt_done: self.is_complete(EntityId::Hello),
            typing_done_about: self.is_complete(EntityId::About),
            typing_done_contact: self.is_complete(EntityId::Contact),
        }
    }
}

/// Flags published to the page under their historical global names
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealSnapshot {
    pub session: SessionId,
    #[serde(rename = "HELLO_BELT_DONE")]
    pub hello_belt_done: bool,
    #[serde(rename = "TYPING_DONE_about-win")]
    pub typing_done_about: bool,
    #[serde(rename = "TYPING_DONE_contact-win")]
    pub typing_done_contact: bool,
}
