//! Fuel station records and their one-time validation
//!
//! Raw records come from an external store with optional coordinates. They
//! are validated exactly once into a [`StationSet`]; only the valid half ever
//! reaches a spatial index, while invalid records are kept for reporting.

use crate::utils;
use std::collections::HashSet;
use std::fmt;

/// A station record as supplied by the data source
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawStation {
    pub id: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: Option<f64>,
}

impl RawStation {
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        price: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            latitude,
            longitude,
            price,
        }
    }
}

/// A validated station with finite, in-range coordinates
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuelStation {
    pub id: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    /// Current price, `None` when the source has no price for this station
    pub price: Option<f64>,
}

/// Why a raw record was excluded from the search
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvalidReason {
    MissingCoordinate,
    NonFiniteCoordinate,
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    DuplicateId,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InvalidReason::MissingCoordinate => "missing coordinate",
            InvalidReason::NonFiniteCoordinate => "non-finite coordinate",
            InvalidReason::LatitudeOutOfRange => "latitude outside [-90, 90]",
            InvalidReason::LongitudeOutOfRange => "longitude outside [-180, 180]",
            InvalidReason::DuplicateId => "duplicate station id",
        };
        f.write_str(text)
    }
}

/// A rejected record together with the reason it was rejected
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvalidStation {
    pub record: RawStation,
    pub reason: InvalidReason,
}

/// Result of validating a batch of raw station records
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationSet {
    valid: Vec<FuelStation>,
    invalid: Vec<InvalidStation>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl StationSet {
    /// Split raw records into valid stations and rejected records
    ///
    /// Never fails: a malformed record is moved to the invalid list with its
    /// reason. The first record carrying a given id wins; later ones are
    /// rejected as duplicates.
    pub fn validate(records: Vec<RawStation>) -> Self {
        let total = records.len();
        let mut valid = Vec::with_capacity(total);
        let mut invalid = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::with_capacity(total);

        for record in records {
            match check_record(&record) {
                Ok((lat, lon)) => {
                    if !seen_ids.insert(record.id.clone()) {
                        invalid.push(InvalidStation {
                            record,
                            reason: InvalidReason::DuplicateId,
                        });
                        continue;
                    }
                    valid.push(FuelStation {
                        id: record.id,
                        address: record.address,
                        lat,
                        lon,
                        price: record.price,
                    });
                }
                Err(reason) => invalid.push(InvalidStation { record, reason }),
            }
        }

        tracing::info!(
            total,
            valid = valid.len(),
            invalid = invalid.len(),
            "Station validation finished"
        );
        for rejected in &invalid {
            tracing::debug!(
                id = %rejected.record.id,
                address = %rejected.record.address,
                reason = %rejected.reason,
                "Station excluded from search"
            );
        }

        Self { valid, invalid }
    }

    /// Stations eligible for spatial search
    #[inline]
    pub fn valid(&self) -> &[FuelStation] {
        &self.valid
    }

    /// Rejected records with reasons
    #[inline]
    pub fn invalid(&self) -> &[InvalidStation] {
        &self.invalid
    }

    /// Total number of records that went through validation
    #[inline]
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

fn check_record(record: &RawStation) -> Result<(f64, f64), InvalidReason> {
    let (Some(lat), Some(lon)) = (record.latitude, record.longitude) else {
        return Err(InvalidReason::MissingCoordinate);
    };
    if !lat.is_finite() || !lon.is_finite() {
        return Err(InvalidReason::NonFiniteCoordinate);
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(InvalidReason::LatitudeOutOfRange);
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(InvalidReason::LongitudeOutOfRange);
    }
    debug_assert!(utils::is_valid_wgs84(lat, lon));
    Ok((lat, lon))
}
