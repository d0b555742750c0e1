use serde::Serialize;

use crate::marketplace::listings::ListingDetails;

/// Commission bounds applied to every booking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionPolicy {
    pub default_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            default_rate: 7.5,
            min_rate: 5.0,
            max_rate: 10.0,
        }
    }
}

impl CommissionPolicy {
    pub fn is_consistent(&self) -> bool {
        self.min_rate.is_finite()
            && self.max_rate.is_finite()
            && self.min_rate >= 0.0
            && self.min_rate <= self.max_rate
            && self.default_rate >= self.min_rate
            && self.default_rate <= self.max_rate
    }

    /// Caller-supplied rate, or the default when none was given.
    pub fn resolve_rate(&self, requested: Option<f64>) -> Result<f64, PricingError> {
        match requested {
            None => Ok(self.default_rate),
            Some(rate) if rate.is_finite() && rate >= self.min_rate && rate <= self.max_rate => {
                Ok(rate)
            }
            Some(rate) => Err(PricingError::RateOutOfRange {
                rate,
                min: self.min_rate,
                max: self.max_rate,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("commission rate {rate} must lie within [{min}, {max}]")]
    RateOutOfRange { rate: f64, min: f64, max: f64 },
    #[error("room type '{0}' is not offered by this property")]
    UnknownRoomType(String),
}

/// Price breakdown persisted with a booking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base: u32,
    pub commission_rate: f64,
    pub commission_amount: u32,
    pub kit_price: u32,
    pub total: u32,
}

/// Room-type price when a room type is selected, else the listing price.
pub fn base_price(details: &ListingDetails, room_type: Option<&str>) -> Result<u32, PricingError> {
    match room_type {
        None => Ok(details.price),
        Some(label) => details
            .room(label)
            .map(|room| room.price)
            .ok_or_else(|| PricingError::UnknownRoomType(label.to_string())),
    }
}

/// `round(base * rate / 100)`, halves rounded away from zero.
pub fn commission_for(base: u32, rate: f64) -> u32 {
    (f64::from(base) * rate / 100.0).round() as u32
}

pub fn quote(base: u32, rate: f64, kit_price: u32) -> PriceQuote {
    let commission_amount = commission_for(base, rate);
    PriceQuote {
        base,
        commission_rate: rate,
        commission_amount,
        kit_price,
        total: base
            .saturating_add(commission_amount)
            .saturating_add(kit_price),
    }
}
