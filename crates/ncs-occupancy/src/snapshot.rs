//! # Occupancy Snapshots
//!
//! Beds and patients serialized to a single YAML or JSON file. The format is
//! picked from the file extension (`.json` is JSON, anything else YAML).
//!
//! Each bed carries at most [`HISTORY_LIMIT`] of its most recent transitions.
//! Older entries are dropped when a store is snapshotted.
//!
//! Loading does not enforce occupancy invariants. A snapshot exported from a
//! drifted database must load as-is so the audit can report on it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use ncs_core::Patient;
use ncs_state::Bed;

use crate::error::OccupancyError;

/// Transitions kept per bed in a snapshot.
pub const HISTORY_LIMIT: usize = 32;

/// Beds and patients at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    #[serde(default)]
    pub beds: Vec<Bed>,
    #[serde(default)]
    pub patients: Vec<Patient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl OccupancySnapshot {
    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self, OccupancyError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OccupancyError::Storage(format!("reading {}: {e}", path.display())))?;
        let snapshot = match Format::for_path(path) {
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| OccupancyError::Storage(format!("parsing {}: {e}", path.display())))?,
            Format::Yaml => serde_yaml::from_str(&content)
                .map_err(|e| OccupancyError::Storage(format!("parsing {}: {e}", path.display())))?,
        };
        Ok(snapshot)
    }

    /// Write the snapshot, replacing the file only once the new content is
    /// fully written.
    pub fn save(&self, path: &Path) -> Result<(), OccupancyError> {
        let content = match Format::for_path(path) {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| OccupancyError::Storage(format!("serializing snapshot: {e}")))?,
            Format::Yaml => serde_yaml::to_string(self)
                .map_err(|e| OccupancyError::Storage(format!("serializing snapshot: {e}")))?,
        };
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, content)
            .map_err(|e| OccupancyError::Storage(format!("writing {}: {e}", staging.display())))?;
        std::fs::rename(&staging, path)
            .map_err(|e| OccupancyError::Storage(format!("replacing {}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_core::WardId;
    use ncs_state::BedStatus;

    fn sample() -> OccupancySnapshot {
        let bed = Bed::new(WardId::new(), "4B").unwrap();
        let mut patient = Patient::new("Ruth", 71, "F").unwrap();
        patient.bed = Some(bed.id);
        OccupancySnapshot {
            beds: vec![bed],
            patients: vec![patient],
        }
    }

    #[test]
    fn yaml_file_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ward.yaml");
        let snap = sample();
        snap.save(&path).unwrap();
        assert_eq!(OccupancySnapshot::load(&path).unwrap(), snap);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn json_chosen_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ward.JSON");
        sample().save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('{'));
        assert_eq!(OccupancySnapshot::load(&path).unwrap().beds.len(), 1);
    }

    #[test]
    fn drifted_snapshot_loads_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.yaml");
        let mut snap = sample();
        snap.beds[0].status = BedStatus::Available;
        snap.patients.push({
            let mut p = Patient::new("Second", 20, "M").unwrap();
            p.bed = Some(snap.beds[0].id);
            p
        });
        snap.save(&path).unwrap();
        let loaded = OccupancySnapshot::load(&path).unwrap();
        assert_eq!(loaded.patients.len(), 2);
        assert_eq!(loaded.beds[0].status, BedStatus::Available);
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("min.yaml");
        std::fs::write(
            &path,
            "beds:\n  - id: 00000000-0000-0000-0000-0000000000aa\n    number: \"1\"\n    ward: 00000000-0000-0000-0000-0000000000bb\n",
        )
        .unwrap();
        let snap = OccupancySnapshot::load(&path).unwrap();
        assert_eq!(snap.beds[0].status, BedStatus::Available);
        assert_eq!(snap.beds[0].version, 0);
        assert!(snap.patients.is_empty());
    }

    #[test]
    fn missing_file_is_storage_error() {
        let err = OccupancySnapshot::load(Path::new("/nonexistent/ward.yaml")).unwrap_err();
        assert!(matches!(err, OccupancyError::Storage(_)));
    }
}
