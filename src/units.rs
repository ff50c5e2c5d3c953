//! Quantity kinds for unit-bearing fields and the types used to carry their values.
//!
//! Raw records tag numeric fields with unit symbols (e.g. "MW"). The [`UnitConverter`] maps a
//! symbol onto the [`UnitKind`] it measures, using the unit map from the configuration. Scaling a
//! value (e.g. by `load_scalar`) is left to the caller: this module only establishes *what* a
//! value is.
use crate::config::Configuration;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

/// The canonical kinds of quantity a unit symbol can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum UnitKind {
    /// Real power (e.g. MW)
    ActivePower,
    /// Reactive power (e.g. `MVAr`)
    ReactivePower,
    /// Apparent power (e.g. MVA)
    ApparentPower,
    /// Energy (e.g. `MWh`)
    Energy,
    /// A duration (e.g. hours)
    Time,
    /// Money (e.g. $)
    Currency,
    /// A percentage
    Percentage,
    /// A pure number
    Dimensionless,
    /// Fuel use per unit energy (e.g. `MMBtu/MWh`)
    HeatRate,
    /// Cost per unit energy (e.g. `$/MWh`)
    FuelPrice,
    /// Mass emitted per unit energy (e.g. `kg/MWh`)
    EmissionRate,
    /// A length (e.g. miles)
    Distance,
    /// Electrical potential (e.g. kV)
    Voltage,
}

/// Indicates that a unit symbol is not present in the configured unit map
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown unit symbol '{0}'")]
pub struct UnknownUnitError(pub String);

/// Errors arising when checking the unit of a field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    /// The symbol is not in the unit map
    #[error(transparent)]
    Unknown(#[from] UnknownUnitError),
    /// The symbol is known, but measures a different kind of quantity
    #[error("Unit '{symbol}' measures {found}, but {expected} was expected")]
    WrongKind {
        /// The offending symbol
        symbol: String,
        /// The kind required by the field
        expected: UnitKind,
        /// The kind the symbol actually measures
        found: UnitKind,
    },
}

/// Resolves raw unit symbols to [`UnitKind`]s
#[derive(Clone, Copy)]
pub struct UnitConverter<'a> {
    config: &'a Configuration,
}

impl<'a> UnitConverter<'a> {
    /// Create a new [`UnitConverter`] reading from `config`
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Get the kind of quantity measured by `symbol`.
    ///
    /// Lookup is exact: "MW" and "mW" are different units.
    pub fn resolve(&self, symbol: &str) -> Result<UnitKind, UnknownUnitError> {
        self.config
            .unit_map()
            .get(symbol)
            .copied()
            .ok_or_else(|| UnknownUnitError(symbol.to_string()))
    }

    /// Resolve `symbol`, checking that it measures the `expected` kind of quantity
    pub fn expect_kind(&self, symbol: &str, expected: UnitKind) -> Result<UnitKind, UnitError> {
        let found = self.resolve(symbol)?;
        if found != expected {
            return Err(UnitError::WrongKind {
                symbol: symbol.to_string(),
                expected,
                found,
            });
        }

        Ok(found)
    }
}

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Serialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is neither infinite nor NaN
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }
    };
}

unit_struct!(Dimensionless);
unit_struct!(ActivePower);

impl std::ops::Mul<Dimensionless> for ActivePower {
    type Output = ActivePower;

    fn mul(self, rhs: Dimensionless) -> ActivePower {
        ActivePower(self.0 * rhs.0)
    }
}
