use crate::config::RegistryConfig;
use crate::error::RelayError;
use crate::room::directory::Listing;
use crate::room::room::Room;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use watchparty_core::{MemberId, RoomToken, SessionRole, SignalMessage};

/// Outgoing half of one accepted connection. Frames are already-encoded JSON text.
pub type MemberSender = mpsc::UnboundedSender<String>;

struct Connection {
    tx: MemberSender,
    room: Option<RoomToken>,
}

pub(crate) struct RegistryInner {
    pub(crate) config: RegistryConfig,
    connections: DashMap<MemberId, Connection>,
    pub(crate) rooms: DashMap<RoomToken, Room>,
    pub(crate) listings: DashMap<RoomToken, Listing>,
}

/// Connection-to-room bookkeeping of one relay process.
///
/// Lock order is `listings`, then `rooms`, then `connections`; no guard on a
/// later map is ever held while touching an earlier one.
#[derive(Clone)]
pub struct RoomRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                connections: DashMap::new(),
                rooms: DashMap::new(),
                listings: DashMap::new(),
            }),
        }
    }

    /// Assigns a fresh identity to an accepted connection.
    pub fn register_connection(&self, tx: MemberSender) -> Result<MemberId, RelayError> {
        let attempts = self.inner.config.max_id_attempts.max(1);

        for _ in 0..attempts {
            let candidate = MemberId::generate(self.inner.config.member_id_len);
            match self.inner.connections.entry(candidate.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Connection { tx, room: None });
                    return Ok(candidate);
                }
                Entry::Occupied(_) => {
                    warn!("Member identity collision on {}, drawing again", candidate);
                }
            }
        }

        Err(RelayError::IdentityExhausted { attempts })
    }

    /// Registers `member` in `room`, creating the room if needed.
    ///
    /// The newcomer receives `welcome`, then one `user-joined` per existing
    /// member; every existing member receives one `user-joined` for the newcomer.
    pub fn join(
        &self,
        member: &MemberId,
        room: &RoomToken,
        role: SessionRole,
    ) -> Result<Vec<MemberId>, RelayError> {
        {
            let mut conn = self
                .inner
                .connections
                .get_mut(member)
                .ok_or_else(|| RelayError::UnknownMember(member.clone()))?;
            if let Some(current) = &conn.room {
                return Err(RelayError::AlreadyJoined {
                    member: member.clone(),
                    room: current.clone(),
                });
            }
            conn.room = Some(room.clone());
        }

        let mut entry = self.inner.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room);
            Room::new()
        });
        let existing = entry.admit(member.clone(), role == SessionRole::Host);

        self.send_signal(
            member,
            &SignalMessage::Welcome {
                member_id: member.clone(),
            },
        );
        for other in &existing {
            self.send_signal(
                other,
                &SignalMessage::UserJoined {
                    remote_id: member.clone(),
                },
            );
            self.send_signal(
                member,
                &SignalMessage::UserJoined {
                    remote_id: other.clone(),
                },
            );
        }
        drop(entry);

        self.mark_live(room);
        info!(
            "Member {} joined room {} ({} already present)",
            member,
            room,
            existing.len()
        );
        Ok(existing)
    }

    /// Forwards `frame` unchanged to every other open member of the sender's room.
    /// Returns how many members it was handed to.
    pub fn relay(&self, sender: &MemberId, frame: &str) -> Result<usize, RelayError> {
        let room = self
            .inner
            .connections
            .get(sender)
            .ok_or_else(|| RelayError::UnknownMember(sender.clone()))?
            .room
            .clone()
            .ok_or_else(|| RelayError::NotInRoom(sender.clone()))?;

        let recipients = match self.inner.rooms.get(&room) {
            Some(entry) => entry.members(),
            None => return Err(RelayError::NotInRoom(sender.clone())),
        };

        let delivered = recipients
            .iter()
            .filter(|id| *id != sender)
            .filter(|id| self.send_raw(id, frame.to_owned()))
            .count();
        debug!("Relayed frame from {} to {} members", sender, delivered);
        Ok(delivered)
    }

    /// Drops `member`; deletes its room when it empties, otherwise tells the
    /// remaining members it left (and that the host left, if it was the host).
    pub fn disconnect(&self, member: &MemberId) {
        let Some((_, conn)) = self.inner.connections.remove(member) else {
            return;
        };
        let Some(room) = conn.room else {
            return;
        };

        let (emptied, was_host) = match self.inner.rooms.get_mut(&room) {
            Some(mut entry) => {
                let was_host = entry.release(member);
                if entry.is_empty() {
                    (true, was_host)
                } else {
                    for other in entry.members() {
                        self.send_signal(
                            &other,
                            &SignalMessage::UserLeft {
                                remote_id: member.clone(),
                            },
                        );
                        if was_host {
                            self.send_signal(
                                &other,
                                &SignalMessage::HostLeft {
                                    remote_id: member.clone(),
                                },
                            );
                        }
                    }
                    (false, was_host)
                }
            }
            None => (false, false),
        };

        let removed = emptied && self.inner.rooms.remove_if(&room, |_, r| r.is_empty()).is_some();
        if removed {
            info!("Room {} is empty, removing it", room);
        }
        if removed || was_host {
            self.delist(&room);
        }
    }

    /// Sorted member identities of `room`, or `None` if the room does not exist.
    pub fn room_members(&self, room: &RoomToken) -> Option<Vec<MemberId>> {
        self.inner.rooms.get(room).map(|entry| entry.members())
    }

    pub fn room_host(&self, room: &RoomToken) -> Option<MemberId> {
        self.inner
            .rooms
            .get(room)
            .and_then(|entry| entry.host().cloned())
    }

    pub fn contains_room(&self, room: &RoomToken) -> bool {
        self.inner.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    fn send_signal(&self, member: &MemberId, msg: &SignalMessage) {
        match msg.to_json() {
            Ok(json) => {
                if !self.send_raw(member, json) {
                    debug!("Skipped {} for closed member {}", msg.action(), member);
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }

    fn send_raw(&self, member: &MemberId, frame: String) -> bool {
        match self.inner.connections.get(member) {
            Some(conn) => conn.tx.send(frame).is_ok(),
            None => false,
        }
    }
}
