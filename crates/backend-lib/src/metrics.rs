// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const ROOMS_ACTIVE: &str = "rooms.active";
pub const ROOM_JOINED: &str = "room.joined";
pub const ROOM_LEFT: &str = "room.left";
pub const EVENT_BROADCAST: &str = "event.broadcast";
pub const EVENT_DELIVERED: &str = "event.delivered";
pub const EVENT_DROPPED: &str = "event.dropped";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_ACTIVE: &str = "session.active";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const RATE_LIMITED: &str = "http.rate_limited";
