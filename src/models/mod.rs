use serde::{Deserialize, Serialize};

/// Physical dimensions of a listing, in square/cubic meters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub living_area: f64,
    pub balcony_area: Option<f64>,
    pub external_storage: Option<f64>,
    pub volume: Option<f64>,
}

/// Room counts. The schema allows fractional values (Dutch listings
/// advertise e.g. "3.5 kamers"), so these stay f64 rather than integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rooms {
    pub total_rooms: Option<f64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
}

/// Location information for a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetails {
    pub neighborhood: String,
}

/// Asking price in euros
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetails {
    pub price: f64,
    pub price_per_square_meter: Option<f64>,
}

/// Structured result of extracting one listing page.
///
/// A record is either fully present and schema-valid or it does not exist;
/// extraction failure never produces a partially-filled record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub dimensions: Dimensions,
    pub rooms: Rooms,
    pub location_details: LocationDetails,
    pub price_details: PriceDetails,
}

/// Outcome of validating an extraction response against the record schema.
#[derive(Debug)]
pub enum SchemaCheck {
    Valid(PropertyRecord),
    Violation(String),
}

impl PropertyRecord {
    /// Parse and validate a raw extraction response. Anything that does not
    /// deserialize into the full record shape, or breaks a required-field
    /// constraint, is a violation.
    pub fn check(value: serde_json::Value) -> SchemaCheck {
        let record: PropertyRecord = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => return SchemaCheck::Violation(format!("not schema-conformant: {e}")),
        };
        if !record.dimensions.living_area.is_finite() || record.dimensions.living_area <= 0.0 {
            return SchemaCheck::Violation(format!(
                "livingArea must be positive, got {}",
                record.dimensions.living_area
            ));
        }
        if !record.price_details.price.is_finite() || record.price_details.price <= 0.0 {
            return SchemaCheck::Violation(format!(
                "price must be positive, got {}",
                record.price_details.price
            ));
        }
        if record.location_details.neighborhood.trim().is_empty() {
            return SchemaCheck::Violation("neighborhood is empty".to_string());
        }
        SchemaCheck::Valid(record)
    }

    /// JSON schema handed to the LLM as its required output contract.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dimensions": {
                    "type": "object",
                    "properties": {
                        "livingArea": { "type": "number" },
                        "balconyArea": { "type": ["number", "null"] },
                        "externalStorage": { "type": ["number", "null"] },
                        "volume": { "type": ["number", "null"] }
                    },
                    "required": ["livingArea", "balconyArea", "externalStorage", "volume"],
                    "additionalProperties": false
                },
                "rooms": {
                    "type": "object",
                    "properties": {
                        "totalRooms": { "type": ["number", "null"] },
                        "bedrooms": { "type": ["number", "null"] },
                        "bathrooms": { "type": ["number", "null"] }
                    },
                    "required": ["totalRooms", "bedrooms", "bathrooms"],
                    "additionalProperties": false
                },
                "locationDetails": {
                    "type": "object",
                    "properties": {
                        "neighborhood": { "type": "string" }
                    },
                    "required": ["neighborhood"],
                    "additionalProperties": false
                },
                "priceDetails": {
                    "type": "object",
                    "properties": {
                        "price": { "type": "number" },
                        "pricePerSquareMeter": { "type": ["number", "null"] }
                    },
                    "required": ["price", "pricePerSquareMeter"],
                    "additionalProperties": false
                }
            },
            "required": ["dimensions", "rooms", "locationDetails", "priceDetails"],
            "additionalProperties": false
        })
    }
}

/// Measurement name every point is written under.
pub const MEASUREMENT: &str = "real_estate";

/// Flattened, store-ready view of one record: one tag plus nine numeric
/// fields. Optional fields the listing did not report become exactly 0.0;
/// the store therefore cannot distinguish "no balcony" from "balcony of
/// unknown size" (see DESIGN.md).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub neighborhood: String,
    pub living_area: f64,
    pub balcony_area: f64,
    pub external_storage: f64,
    pub volume: f64,
    pub total_rooms: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub price: f64,
    pub price_per_sqm: f64,
}

impl MetricPoint {
    pub fn from_record(record: &PropertyRecord) -> Self {
        Self {
            neighborhood: record.location_details.neighborhood.clone(),
            living_area: record.dimensions.living_area,
            balcony_area: record.dimensions.balcony_area.unwrap_or(0.0),
            external_storage: record.dimensions.external_storage.unwrap_or(0.0),
            volume: record.dimensions.volume.unwrap_or(0.0),
            total_rooms: record.rooms.total_rooms.unwrap_or(0.0),
            bedrooms: record.rooms.bedrooms.unwrap_or(0.0),
            bathrooms: record.rooms.bathrooms.unwrap_or(0.0),
            price: record.price_details.price,
            price_per_sqm: record.price_details.price_per_square_meter.unwrap_or(0.0),
        }
    }

    /// Field names and values in fixed order, for line-protocol rendering.
    pub fn fields(&self) -> [(&'static str, f64); 9] {
        [
            ("living_area", self.living_area),
            ("balcony_area", self.balcony_area),
            ("external_storage", self.external_storage),
            ("volume", self.volume),
            ("total_rooms", self.total_rooms),
            ("bedrooms", self.bedrooms),
            ("bathrooms", self.bathrooms),
            ("price", self.price),
            ("price_per_sqm", self.price_per_sqm),
        ]
    }
}
