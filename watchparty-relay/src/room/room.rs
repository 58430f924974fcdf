use std::collections::HashSet;
use watchparty_core::MemberId;

/// Relay-side membership of one room token.
#[derive(Debug, Default)]
pub struct Room {
    members: HashSet<MemberId>,
    host: Option<MemberId>,
    host_left: bool,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` and returns everyone who was already present.
    pub(crate) fn admit(&mut self, member: MemberId, as_host: bool) -> Vec<MemberId> {
        let existing = self.members();
        if as_host && self.host.is_none() {
            self.host = Some(member.clone());
        }
        self.members.insert(member);
        existing
    }

    /// Removes `member`, returning whether it was the room's host.
    pub(crate) fn release(&mut self, member: &MemberId) -> bool {
        self.members.remove(member);
        if self.host.as_ref() == Some(member) {
            self.host = None;
            self.host_left = true;
            return true;
        }
        false
    }

    pub fn members(&self) -> Vec<MemberId> {
        let mut members: Vec<MemberId> = self.members.iter().cloned().collect();
        members.sort();
        members
    }

    pub fn host(&self) -> Option<&MemberId> {
        self.host.as_ref()
    }

    /// True once the member that joined as host has disconnected.
    pub fn host_left(&self) -> bool {
        self.host_left
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
