use serde::{Deserialize, Serialize};

/// Token identifying one activation of a synchronizer binding.
///
/// Every activation and every deactivation advances the generation, so a
/// completion that captured an older token can tell it has been superseded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Creates a generation from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the generation of a binding that has never been activated.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next generation.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw generation value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen({})", self.0)
    }
}

/// The operational collections kept in sync on the staff dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    GuestProfiles,
    GuestRequests,
    ServiceRequests,
    Rooms,
    Notifications,
}

impl EntityKind {
    /// Every kind, in the order the dashboard lists them.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::GuestProfiles,
        EntityKind::GuestRequests,
        EntityKind::ServiceRequests,
        EntityKind::Rooms,
        EntityKind::Notifications,
    ];

    /// Name of the backing database table.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::GuestProfiles => "guest_profiles",
            EntityKind::GuestRequests => "guest_requests",
            EntityKind::ServiceRequests => "service_requests",
            EntityKind::Rooms => "rooms",
            EntityKind::Notifications => "notifications",
        }
    }

    /// URL segment used by the HTTP surface.
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::GuestProfiles => "guest-profiles",
            EntityKind::GuestRequests => "guest-requests",
            EntityKind::ServiceRequests => "service-requests",
            EntityKind::Rooms => "rooms",
            EntityKind::Notifications => "notifications",
        }
    }

    /// Realtime channel name for the table.
    pub fn channel(&self) -> String {
        format!("public:{}", self.table())
    }

    /// Looks a kind up by table name.
    pub fn from_table(table: &str) -> Result<Self, UnknownEntityKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.table() == table)
            .ok_or_else(|| UnknownEntityKind(table.to_string()))
    }

    /// Looks a kind up by URL segment.
    pub fn from_slug(slug: &str) -> Result<Self, UnknownEntityKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| UnknownEntityKind(slug.to_string()))
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Returned when a table name or URL segment names no known collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityKind(pub String);

impl std::fmt::Display for UnknownEntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown collection: {}", self.0)
    }
}

impl std::error::Error for UnknownEntityKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_advances() {
        let generation = Generation::initial();
        assert_eq!(generation.as_u64(), 0);
        assert_eq!(generation.next().next(), Generation::new(2));
        assert!(generation < generation.next());
    }

    #[test]
    fn generation_display() {
        assert_eq!(Generation::new(7).to_string(), "gen(7)");
    }

    #[test]
    fn kind_lookup_by_table_and_slug() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_table(kind.table()), Ok(kind));
            assert_eq!(EntityKind::from_slug(kind.slug()), Ok(kind));
        }
        assert_eq!(
            EntityKind::from_table("menu_items"),
            Err(UnknownEntityKind("menu_items".to_string()))
        );
    }

    #[test]
    fn kind_channel_name() {
        assert_eq!(EntityKind::Rooms.channel(), "public:rooms");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::GuestRequests).unwrap();
        assert_eq!(json, "\"guest_requests\"");
    }
}
