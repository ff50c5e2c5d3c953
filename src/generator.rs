//! Generator records and the results of resolving them.
use crate::id::define_id_type;
use crate::reserve::{FuelCategory, ReserveAllocation, ReserveConfigError};
use crate::technology::{ClassificationError, ModelClassID};
use crate::units::{ActivePower, UnitConverter, UnitError, UnitKind};
use indexmap::IndexMap;
use thiserror::Error;

define_id_type! {RegionID}

/// A row of generator data, keyed by canonical column name
pub type RawRecord = IndexMap<String, String>;

/// Canonical column names with a fixed meaning
pub mod field {
    /// The generator's fuel
    pub const FUEL: &str = "fuel";
    /// The generator's prime mover code
    pub const PRIME_MOVER: &str = "prime_mover";
    /// Rated capacity
    pub const CAPACITY: &str = "capacity";
    /// Unit symbol for `capacity`
    pub const CAPACITY_UNIT: &str = "capacity_unit";
    /// Region the generator is in
    pub const REGION: &str = "region";
    /// Model year
    pub const YEAR: &str = "year";

    /// All of the above
    pub const ALL: [&str; 6] = [FUEL, PRIME_MOVER, CAPACITY, CAPACITY_UNIT, REGION, YEAR];
}

/// Reasons a single generator record could not be resolved
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// A required field is absent or blank
    #[error("Missing value for `{0}`")]
    MissingField(&'static str),
    /// A field could not be parsed or is out of range
    #[error("Invalid value for `{field}`: '{value}'")]
    InvalidValue {
        /// The field
        field: &'static str,
        /// The raw value
        value: String,
    },
    /// The capacity unit is not a unit of power
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// No model class could be chosen
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    /// Reserve contributions could not be computed
    #[error(transparent)]
    Reserve(#[from] ReserveConfigError),
}

/// The attributes of a generator used to resolve it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorDescriptor {
    /// Fuel type (e.g. `NATURAL_GAS`)
    pub fuel: Option<String>,
    /// Prime mover code (e.g. CC)
    pub prime_mover: Option<String>,
    /// Rated capacity
    pub capacity: ActivePower,
    /// The region the generator is in
    pub region: RegionID,
    /// The model year
    pub year: u32,
    /// Any other columns, passed through untouched
    pub attributes: IndexMap<String, String>,
}

/// Treat blank strings as missing
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

impl GeneratorDescriptor {
    /// Create a new [`GeneratorDescriptor`] with no extra attributes
    pub fn new(
        fuel: Option<&str>,
        prime_mover: Option<&str>,
        capacity: ActivePower,
        region: RegionID,
        year: u32,
    ) -> Self {
        Self {
            fuel: non_blank(fuel),
            prime_mover: non_blank(prime_mover),
            capacity,
            region,
            year,
            attributes: IndexMap::new(),
        }
    }

    /// Build a descriptor from a record whose columns have already been normalised.
    ///
    /// The capacity unit must be a unit of [`UnitKind::ActivePower`] and the capacity must be a
    /// positive number.
    pub fn from_record(record: &RawRecord, units: &UnitConverter) -> Result<Self, RecordError> {
        let required = |name: &'static str| {
            non_blank(record.get(name).map(String::as_str)).ok_or(RecordError::MissingField(name))
        };
        let invalid = |field: &'static str, value: String| RecordError::InvalidValue { field, value };

        let capacity_unit = required(field::CAPACITY_UNIT)?;
        units.expect_kind(&capacity_unit, UnitKind::ActivePower)?;

        let capacity_raw = required(field::CAPACITY)?;
        let capacity = capacity_raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| invalid(field::CAPACITY, capacity_raw.clone()))?;

        let year_raw = required(field::YEAR)?;
        let year = year_raw
            .parse()
            .map_err(|_| invalid(field::YEAR, year_raw.clone()))?;

        let mut descriptor = Self::new(
            record.get(field::FUEL).map(String::as_str),
            record.get(field::PRIME_MOVER).map(String::as_str),
            ActivePower(capacity),
            required(field::REGION)?.into(),
            year,
        );
        descriptor.attributes = record
            .iter()
            .filter(|(name, _)| !field::ALL.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(descriptor)
    }
}

/// A generator with its model class and reserve contributions
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGenerator {
    /// The generator as read
    pub descriptor: GeneratorDescriptor,
    /// The model class assigned to the generator
    pub model_class: ModelClassID,
    /// The category used to look up reserve contributions
    pub fuel_category: FuelCategory,
    /// Fraction of capacity contributed to each reserve type
    pub reserves: ReserveAllocation,
}
