//! Persisted session record and its JSON encoding.

use serde::{Deserialize, Serialize};
use siegeline_core::{CellCoord, Difficulty, TowerKind};
use siegeline_world::{RestoreError, RestoredState, RestoredTower};
use thiserror::Error;

/// Record layout version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Tower entry inside a [`SaveRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTower {
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Upper-left cell of the footprint.
    pub origin: CellCoord,
    /// Level in effect. A pending upgrade is not persisted.
    pub level: u8,
    /// Currency invested, which drives the refund.
    pub invested: u32,
}

/// Everything needed to resume a session between waves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Layout version; must equal [`SAVE_VERSION`].
    pub version: u32,
    /// Currency held.
    pub currency: u32,
    /// Score accumulated.
    pub score: u64,
    /// Base health remaining.
    pub base_health: u32,
    /// Last announced wave.
    pub wave: u32,
    /// Difficulty of the session.
    pub difficulty: Difficulty,
    /// Towers standing on the grid.
    pub towers: Vec<SavedTower>,
    /// Grid occupancy, one string of `'#'` and `'.'` per row.
    pub occupancy: Vec<String>,
}

impl SaveRecord {
    /// Decodes a record, checking the version before the rest of the payload.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::UnsupportedVersion`] when the version differs from
    /// [`SAVE_VERSION`] and [`SaveError::Json`] when the payload is malformed.
    pub fn decode(payload: &str) -> Result<Self, SaveError> {
        let header: SaveHeader = serde_json::from_str(payload)?;
        if header.version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: header.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(serde_json::from_str(payload)?)
    }

    /// Encodes the record as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn into_restored(self) -> RestoredState {
        RestoredState {
            currency: self.currency,
            score: self.score,
            base_health: self.base_health,
            wave: self.wave,
            occupancy: self.occupancy,
            towers: self
                .towers
                .into_iter()
                .map(|tower| RestoredTower {
                    kind: tower.kind,
                    origin: tower.origin,
                    level: tower.level,
                    invested: tower.invested,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct SaveHeader {
    version: u32,
}

/// Failures raised while loading a saved session.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The payload is not a well-formed record.
    #[error("malformed save record: {0}")]
    Json(#[from] serde_json::Error),
    /// The record was written by an incompatible layout version.
    #[error("unsupported save version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the payload.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// The record does not describe a valid session for the configured grid.
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SaveRecord {
        SaveRecord {
            version: SAVE_VERSION,
            currency: 420,
            score: 1337,
            base_health: 12,
            wave: 4,
            difficulty: Difficulty::Hard,
            towers: vec![SavedTower {
                kind: TowerKind::Cannon,
                origin: CellCoord::new(3, 3),
                level: 2,
                invested: 180,
            }],
            occupancy: vec!["#.#".to_owned(), "...".to_owned()],
        }
    }

    #[test]
    fn encoded_records_decode_unchanged() {
        let encoded = record().encode().expect("encode");
        assert_eq!(SaveRecord::decode(&encoded).expect("decode"), record());
    }

    #[test]
    fn version_is_checked_before_the_body() {
        let error = SaveRecord::decode(r#"{"version": 7}"#).expect_err("rejected");
        assert!(matches!(
            error,
            SaveError::UnsupportedVersion {
                found: 7,
                expected: SAVE_VERSION
            }
        ));
    }

    #[test]
    fn malformed_payloads_surface_json_errors() {
        assert!(matches!(
            SaveRecord::decode("not json"),
            Err(SaveError::Json(_))
        ));
        assert!(matches!(
            SaveRecord::decode(r#"{"version": 1}"#),
            Err(SaveError::Json(_))
        ));
    }
}
