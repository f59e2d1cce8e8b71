//! Marker validation and the in-memory/persisted marker record for
//! `POST /markers` / `GET /markers`.

use serde_json::json;
use tw_core::Coord;
use tw_mobility::Marker;
use tw_output::StoredRecord;

use crate::dto::{CoordDto, CreateMarkerRequest, MarkerTypeDto, StoredMarkerDto};
use crate::error::{ServiceError, ServiceResult};

/// Reject coordinates outside the WGS84 domain — malformed coordinates
/// are rejected at the boundary, before they ever reach the simulation
/// core.
pub fn validate_coordinates(coordinate: Coord) -> ServiceResult<()> {
    if !(-180.0..=180.0).contains(&coordinate.lng) || !(-90.0..=90.0).contains(&coordinate.lat) {
        return Err(ServiceError::InvalidMarker {
            reason: format!("coordinates out of range: ({}, {})", coordinate.lng, coordinate.lat),
        });
    }
    Ok(())
}

/// The JSON payload `SqliteStore::insert_marker` persists: just the
/// client-supplied fields, since the store assigns `id`/`created_at` itself.
pub fn marker_payload(req: &CreateMarkerRequest) -> serde_json::Value {
    json!({ "type": req.kind, "coordinates": req.coordinates })
}

/// Reconstruct a wire-facing marker from a persisted record.
pub fn record_to_dto(record: &StoredRecord) -> ServiceResult<StoredMarkerDto> {
    let kind: MarkerTypeDto = serde_json::from_value(record.payload["type"].clone())?;
    let coordinates: CoordDto = serde_json::from_value(record.payload["coordinates"].clone())?;
    Ok(StoredMarkerDto { id: record.id.clone(), kind, coordinates, created_at: record.created_at.clone() })
}

/// Reconstruct a domain marker — what the orchestrator consumes — from a
/// persisted record.
pub fn record_to_marker(record: &StoredRecord) -> ServiceResult<Marker> {
    let kind: MarkerTypeDto = serde_json::from_value(record.payload["type"].clone())?;
    let coordinates: CoordDto = serde_json::from_value(record.payload["coordinates"].clone())?;
    Ok(Marker { kind: kind.into(), coordinate: coordinates.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{CoordDto, MarkerTypeDto};

    #[test]
    fn valid_coordinates_pass() {
        assert!(validate_coordinates(Coord::new(10.0, 45.0)).is_ok());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(validate_coordinates(Coord::new(400.0, 45.0)).is_err());
    }

    #[test]
    fn record_round_trips_through_dto_and_marker() {
        let req = CreateMarkerRequest { kind: MarkerTypeDto::Construction, coordinates: CoordDto { lng: 10.0, lat: 45.0 } };
        let record = StoredRecord { id: "m1".into(), created_at: "2026-01-01T00:00:00Z".into(), payload: marker_payload(&req) };

        let dto = record_to_dto(&record).unwrap();
        assert_eq!(dto.id, "m1");
        assert_eq!(dto.coordinates.lng, 10.0);

        let marker = record_to_marker(&record).unwrap();
        assert_eq!(marker.coordinate, Coord::new(10.0, 45.0));
    }
}
