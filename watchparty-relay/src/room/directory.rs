use crate::room::registry::RoomRegistry;
use dashmap::mapref::entry::Entry;
use std::time::Instant;
use tracing::{debug, info};
use watchparty_core::{RoomResponse, RoomToken};

const ROOM_EXISTS: &str = "Room already exists";
const ROOM_NOT_FOUND: &str = "Room not found";

/// A room announced through the directory.
#[derive(Debug, Clone)]
pub(crate) struct Listing {
    pub content_url: Option<String>,
    /// Set while nobody has registered in the room yet.
    pub reserved_at: Option<Instant>,
}

/// Room directory used by hosts and guests before they open a relay connection.
///
/// A created room is only a reservation until its first member registers;
/// after that the live room table is the source of truth. A listing dies with
/// its room, or as soon as the host disconnects.
impl RoomRegistry {
    pub fn create_room(&self, room: RoomToken, content_url: Option<String>) -> RoomResponse {
        self.prune_reservations();

        match self.inner.listings.entry(room) {
            Entry::Occupied(_) => RoomResponse::failed(ROOM_EXISTS),
            Entry::Vacant(slot) => {
                if self.contains_room(slot.key()) {
                    return RoomResponse::failed(ROOM_EXISTS);
                }
                info!("Room {} reserved", slot.key());
                slot.insert(Listing {
                    content_url,
                    reserved_at: Some(Instant::now()),
                });
                RoomResponse::ok()
            }
        }
    }

    pub fn join_room(&self, room: &RoomToken) -> RoomResponse {
        self.prune_reservations();

        let host_left = self.inner.rooms.get(room).map(|entry| entry.host_left());
        let listed = self
            .inner
            .listings
            .get(room)
            .map(|listing| listing.content_url.clone());

        match (host_left, listed) {
            (Some(true), _) => {
                debug!("Join for room {} after its host left", room);
                RoomResponse::failed(ROOM_NOT_FOUND)
            }
            (Some(false), content_url) => RoomResponse::joined(content_url.flatten()),
            (None, Some(content_url)) => RoomResponse::joined(content_url),
            (None, None) => {
                debug!("Join for unknown room {}", room);
                RoomResponse::failed(ROOM_NOT_FOUND)
            }
        }
    }

    pub fn is_reserved(&self, room: &RoomToken) -> bool {
        self.inner
            .listings
            .get(room)
            .is_some_and(|listing| listing.reserved_at.is_some())
    }

    pub fn is_listed(&self, room: &RoomToken) -> bool {
        self.inner.listings.contains_key(room)
    }

    pub(crate) fn mark_live(&self, room: &RoomToken) {
        if let Some(mut listing) = self.inner.listings.get_mut(room) {
            listing.reserved_at = None;
        }
    }

    pub(crate) fn delist(&self, room: &RoomToken) {
        if self.inner.listings.remove(room).is_some() {
            info!("Room {} removed from the directory", room);
        }
    }

    fn prune_reservations(&self) {
        let ttl = self.inner.config.reservation_ttl;
        self.inner
            .listings
            .retain(|_, listing| listing.reserved_at.is_none_or(|at| at.elapsed() < ttl));
    }
}
