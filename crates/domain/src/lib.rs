//! Domain layer for the hotel staff dashboard.
//!
//! This crate provides the operational entities kept live on the dashboard:
//! - [`Record`] trait decoding database rows with the dashboard's defaults
//! - Guest profiles, guest requests, service requests, rooms and notifications
//! - [`RealtimePayload`] decoding of database change notifications

pub mod error;
pub mod guest_profile;
pub mod guest_request;
pub mod notification;
pub mod realtime;
pub mod record;
pub mod room;
pub mod service_request;

pub use common::EntityKind;
pub use error::{DomainError, Result};
pub use guest_profile::{GuestEntity, GuestPreferences, GuestProfile, GuestSummary};
pub use guest_request::{ConversationMessage, GuestRequest, MessageSender, RequestPriority, RequestStatus};
pub use notification::Notification;
pub use realtime::{ChangeKind, RealtimePayload};
pub use record::{Record, decode_rows};
pub use room::{HousekeepingStatus, Room, RoomScheduleEntry, RoomStatus};
pub use service_request::{
    AuthorType, CreatedBy, ServiceRequest, ServiceRequestPriority, ServiceRequestStatus,
    ServiceRequestUpdate,
};
