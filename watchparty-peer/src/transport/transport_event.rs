use crate::media::TrackKind;
use std::fmt;
use watchparty_core::{IceCandidate, MemberId};

/// Identifies one incarnation of a peer entry. A remote identity that leaves
/// and comes back gets a new generation, so late events from the old
/// connection can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryTag {
    pub remote: MemberId,
    pub generation: u64,
}

impl fmt::Display for EntryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.remote, self.generation)
    }
}

/// Events a transport raises for the session's event loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local candidate was gathered and must reach the remote through the relay.
    CandidateGenerated(EntryTag, IceCandidate),

    /// The remote started sending media.
    RemoteTrack {
        tag: EntryTag,
        track_id: String,
        kind: TrackKind,
    },

    /// The underlying connection failed beyond recovery.
    Failed(EntryTag),
}
