//! # Record Identity Newtypes
//!
//! Newtype wrappers for every record identifier in the nurse-call model.
//! You cannot pass a `PatientId` where a `BedId` is expected, which matters
//! most in the occupancy path where both travel side by side.
//!
//! All identifiers are opaque UUIDs. They serialize transparently as the
//! hyphenated UUID string so stored rows and snapshot files stay readable.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            /// Accepts either the bare UUID or the prefixed display form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .strip_prefix(concat!($prefix, ":"))
                    .unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| ValidationError::InvalidIdentifier {
                        kind: $prefix,
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

uuid_id!(
    /// Identifier of a hospital.
    HospitalId,
    "hospital"
);
uuid_id!(
    /// Identifier of a building within a hospital.
    BuildingId,
    "building"
);
uuid_id!(
    /// Identifier of a floor within a building.
    FloorId,
    "floor"
);
uuid_id!(
    /// Identifier of a ward on a floor.
    WardId,
    "ward"
);
uuid_id!(
    /// Identifier of a bed. The key of every occupancy decision.
    BedId,
    "bed"
);
uuid_id!(
    /// Identifier of a bedside call device.
    DeviceId,
    "device"
);
uuid_id!(
    /// Identifier of a nursing staff team.
    StaffTeamId,
    "team"
);
uuid_id!(
    /// Identifier of a nurse record (distinct from the nurse's staff badge).
    NurseId,
    "nurse"
);
uuid_id!(
    /// Identifier of a supervisor record.
    SupervisorId,
    "supervisor"
);
uuid_id!(
    /// Identifier of a patient.
    PatientId,
    "patient"
);
uuid_id!(
    /// Identifier of a logged nurse call.
    CallId,
    "call"
);
uuid_id!(
    /// Identifier of a team-to-ward assignment.
    TeamAssignmentId,
    "assignment"
);
uuid_id!(
    /// Identifier of a login account.
    UserId,
    "user"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(BedId::new(), BedId::new());
        assert_ne!(PatientId::new(), PatientId::new());
    }

    #[test]
    fn display_carries_namespace_prefix() {
        let uuid = Uuid::nil();
        assert_eq!(
            BedId::from_uuid(uuid).to_string(),
            "bed:00000000-0000-0000-0000-000000000000"
        );
        assert!(PatientId::from_uuid(uuid).to_string().starts_with("patient:"));
    }

    #[test]
    fn from_str_accepts_bare_and_prefixed_forms() {
        let id = BedId::new();
        let bare: BedId = id.as_uuid().to_string().parse().unwrap();
        let prefixed: BedId = id.to_string().parse().unwrap();
        assert_eq!(bare, id);
        assert_eq!(prefixed, id);
    }

    #[test]
    fn from_str_rejects_foreign_prefix() {
        let id = PatientId::new();
        let err = id.to_string().parse::<BedId>().unwrap_err();
        assert!(err.to_string().contains("bed"), "got: {err}");
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = WardId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let back: WardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
