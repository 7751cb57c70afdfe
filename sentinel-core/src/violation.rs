//! Violation records as captured by the cooldown logger and persisted by the store.

use crate::section::CameraSection;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format for timestamps in API payloads.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact format used in artifact file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Separator used when persisting item lists.
pub const ITEM_SEPARATOR: &str = ", ";

/// A violation accepted by the cooldown logger, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewViolation {
    pub camera_section: CameraSection,
    pub detected_items: Vec<String>,
    pub missing_items: Vec<String>,
    pub timestamp: NaiveDateTime,
    pub image_path: Option<String>,
}

impl NewViolation {
    pub fn detected_gear(&self) -> String {
        self.detected_items.join(ITEM_SEPARATOR)
    }

    pub fn missing_gear(&self) -> String {
        self.missing_items.join(ITEM_SEPARATOR)
    }
}

/// A persisted violation. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: u64,
    pub camera_location: CameraSection,
    pub detected_gear: String,
    pub missing_gear: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl ViolationRecord {
    pub fn from_new(id: u64, new: &NewViolation) -> Self {
        Self {
            id,
            camera_location: new.camera_section,
            detected_gear: new.detected_gear(),
            missing_gear: new.missing_gear(),
            timestamp: new.timestamp,
            image_path: new.image_path.clone(),
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Newest first; ties broken by id so the order is total.
pub fn sort_newest_first(records: &mut [ViolationRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_items_are_comma_joined() {
        let new = NewViolation {
            camera_section: CameraSection::Gate,
            detected_items: vec!["Person".into(), "NO-Hardhat".into(), "NO-Mask".into()],
            missing_items: vec!["Hardhat".into(), "Mask".into()],
            timestamp: at(9, 30, 0),
            image_path: None,
        };
        let record = ViolationRecord::from_new(7, &new);
        assert_eq!(record.detected_gear, "Person, NO-Hardhat, NO-Mask");
        assert_eq!(record.missing_gear, "Hardhat, Mask");
        assert_eq!(record.camera_location, CameraSection::Gate);
        assert_eq!(record.formatted_timestamp(), "2025-03-14 09:30:00");
    }

    #[test]
    fn test_sort_newest_first() {
        let mk = |id, ts| ViolationRecord {
            id,
            camera_location: CameraSection::Machine,
            detected_gear: String::new(),
            missing_gear: String::new(),
            timestamp: ts,
            image_path: None,
        };
        let mut records = vec![mk(1, at(8, 0, 0)), mk(2, at(10, 0, 0)), mk(3, at(9, 0, 0)), mk(4, at(10, 0, 0))];
        sort_newest_first(&mut records);
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }
}
