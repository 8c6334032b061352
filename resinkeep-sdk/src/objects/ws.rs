//! WebSocket frames for the change stream.
//!
//! Any read endpoint (`/api/v1/{resource}` or `/api/v1/{resource}/{id}`)
//! upgrades to a WebSocket when asked to. The connection is then
//! subscribed to the matching topic.
//!
//! # Protocol
//!
//! 1. Whenever a matching entity is created, updated or deleted, the
//!    server pushes a [`ChangeEvent`] text frame.
//! 2. Every non-empty frame sent by the client is answered with a
//!    [`LivenessStatus`] frame, `{"status":"healthy"}`.
//! 3. When the server shuts down, or the connection falls too far behind,
//!    the server sends a close frame (see [`WsCloseCode`]).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::container::ContainerResponse;
use super::material_type::MaterialTypeResponse;
use super::vendor::VendorResponse;
use super::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Added,
    Updated,
    Deleted,
}

/// Entity snapshot carried by a [`ChangeEvent`].
///
/// Untagged: the event's `resource` field tells which variant to expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    // Container first: its snapshot is a superset of the others' required keys.
    Container(ContainerResponse),
    MaterialType(MaterialTypeResponse),
    Vendor(VendorResponse),
}

impl EventPayload {
    pub fn resource(&self) -> Resource {
        match self {
            EventPayload::Container(_) => Resource::Container,
            EventPayload::MaterialType(_) => Resource::MaterialType,
            EventPayload::Vendor(_) => Resource::Vendor,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            EventPayload::Container(c) => c.id,
            EventPayload::MaterialType(m) => m.id,
            EventPayload::Vendor(v) => v.id,
        }
    }
}

/// Server-to-client change notification.
///
/// ```json
/// {"type":"UPDATED","resource":"container","date":"2024-05-01T12:00:00Z","payload":{ ... }}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub resource: Resource,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub payload: EventPayload,
}

impl ChangeEvent {
    pub fn new(kind: EventKind, payload: EventPayload, date: OffsetDateTime) -> Self {
        Self {
            kind,
            resource: payload.resource(),
            date,
            payload,
        }
    }
}

/// Acknowledgement sent in reply to every inbound client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessStatus {
    pub status: String,
}

impl LivenessStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// WebSocket close codes used by the change stream.
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;

    /// The server is shutting down, or dropped a connection that stopped
    /// draining its queue.
    pub const GOING_AWAY: u16 = 1001;

    pub const INTERNAL_ERROR: u16 = 1011;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor() -> VendorResponse {
        VendorResponse {
            id: 3,
            registered: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            name: "Anycubic".to_string(),
            comment: None,
            empty_container_weight: Some(110.0),
        }
    }

    #[test]
    fn test_change_event_wire_shape() {
        let event = ChangeEvent::new(
            EventKind::Deleted,
            EventPayload::Vendor(vendor()),
            OffsetDateTime::from_unix_timestamp(1_700_000_060).unwrap(),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "DELETED");
        assert_eq!(value["resource"], "vendor");
        assert_eq!(value["date"], "2023-11-14T22:14:20Z");
        assert_eq!(value["payload"]["name"], "Anycubic");
        assert!(value["payload"].get("comment").is_none());
    }

    #[test]
    fn test_vendor_payload_decodes_as_vendor() {
        let event = ChangeEvent::new(
            EventKind::Added,
            EventPayload::Vendor(vendor()),
            OffsetDateTime::from_unix_timestamp(1_700_000_060).unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let decoded: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.payload.resource(), Resource::Vendor);
        assert_eq!(decoded.payload.id(), 3);
    }

    #[test]
    fn test_liveness_payload() {
        assert_eq!(
            serde_json::to_string(&LivenessStatus::healthy()).unwrap(),
            r#"{"status":"healthy"}"#
        );
    }
}
