// src/load/record.rs

use duckdb::ToSql;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// One row of the registration extract, keyed by CSV header.
///
/// Empty text fields come through as `None`. The integer fields are `None`
/// when blank, non-numeric or out of range for the column.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "VIN (1-10)")]
    pub vin: Option<String>,
    #[serde(rename = "County")]
    pub county: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Postal Code")]
    pub postal_code: Option<String>,
    #[serde(rename = "Model Year", default, deserialize_with = "lenient_int")]
    pub model_year: Option<i32>,
    #[serde(rename = "Make")]
    pub make: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "Electric Vehicle Type")]
    pub electric_vehicle_type: Option<String>,
    #[serde(rename = "Clean Alternative Fuel Vehicle (CAFV) Eligibility")]
    pub cafv_eligibility: Option<String>,
    #[serde(rename = "Electric Range", default, deserialize_with = "lenient_int")]
    pub electric_range: Option<i32>,
    #[serde(rename = "Base MSRP", default, deserialize_with = "lenient_int")]
    pub base_msrp: Option<i32>,
    #[serde(rename = "Legislative District")]
    pub legislative_district: Option<String>,
    #[serde(rename = "DOL Vehicle ID", default, deserialize_with = "lenient_int")]
    pub dol_vehicle_id: Option<i64>,
    #[serde(rename = "Vehicle Location")]
    pub vehicle_location: Option<String>,
    #[serde(rename = "Electric Utility")]
    pub electric_utility: Option<String>,
    #[serde(rename = "2020 Census Tract")]
    pub census_tract: Option<String>,
}

impl VehicleRecord {
    /// Bind parameters in the column order of [`super::schema::COLUMNS`].
    pub fn params(&self) -> [&dyn ToSql; 17] {
        [
            &self.vin,
            &self.county,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.model_year,
            &self.make,
            &self.model,
            &self.electric_vehicle_type,
            &self.cafv_eligibility,
            &self.electric_range,
            &self.base_msrp,
            &self.legislative_district,
            &self.dol_vehicle_id,
            &self.vehicle_location,
            &self.electric_utility,
            &self.census_tract,
        ]
    }
}

/// Integer coercion: surrounding whitespace is ignored, anything that does
/// not parse into `T` becomes `None` instead of failing the row.
fn lenient_int<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}
