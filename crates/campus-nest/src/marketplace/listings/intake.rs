use std::collections::HashSet;

use super::domain::{ListingDetails, RoomType};

/// Validation errors raised before a submission is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("monthly price must be greater than zero")]
    ZeroPrice,
    #[error("room type '{0}' must have a label and a price above zero")]
    InvalidRoomType(String),
    #[error("room type '{0}' is listed more than once")]
    DuplicateRoomType(String),
}

/// Guard responsible for producing sanitized `ListingDetails`.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn sanitize(&self, mut details: ListingDetails) -> Result<ListingDetails, IntakeViolation> {
        details.title = required(details.title, "title")?;
        details.description = required(details.description, "description")?;
        details.address = required(details.address, "address")?;
        details.location = required(details.location, "location")?;

        if details.price == 0 {
            return Err(IntakeViolation::ZeroPrice);
        }

        let mut seen = HashSet::new();
        let mut rooms = Vec::with_capacity(details.room_types.len());
        for room in details.room_types {
            let label = room.label.trim().to_string();
            if label.is_empty() || room.price == 0 {
                return Err(IntakeViolation::InvalidRoomType(label));
            }
            if !seen.insert(label.to_ascii_lowercase()) {
                return Err(IntakeViolation::DuplicateRoomType(label));
            }
            rooms.push(RoomType { label, ..room });
        }
        details.room_types = rooms;

        details.amenities = tidy(details.amenities);
        details.rules = tidy(details.rules);

        Ok(details)
    }
}

fn required(value: String, field: &'static str) -> Result<String, IntakeViolation> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IntakeViolation::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn tidy(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
