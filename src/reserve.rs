//! Operating reserves and the contributions generators make towards them.
//!
//! Each fuel category (load, wind, solar or default) has a table giving, for each reserve type,
//! the fraction of a generator's rated capacity which counts towards that reserve. The
//! [`ReserveAllocator`] takes the table for a generator's category and applies the rules from the
//! configuration: disabled reserve types and ineligible model classes contribute nothing, and if
//! reserves are mutually exclusive, only the reserve type with the highest value of reserve
//! (VORS) is kept.
use crate::config::Configuration;
use crate::generator::GeneratorDescriptor;
use crate::technology::ModelClassID;
use crate::units::{ActivePower, Dimensionless};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use itertools::Itertools;
use log::trace;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

/// The types of operating reserve
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReserveType {
    /// Synchronised reserve available within minutes
    Spinning,
    /// Reserve held to cover forecast error for variable generation
    Flexibility,
    /// Reserve for second-to-second balancing
    Regulation,
    /// Reserve for the loss of the largest unit
    Contingency,
    /// A combined reserve product
    Combo,
}

/// Parameters describing a [`ReserveType`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveMetadata {
    /// How long the reserve must be sustained for, in seconds
    pub duration: f64,
    /// How quickly the reserve must respond, in seconds
    pub time_frame: f64,
    /// Value of reserve scalar (money per MW)
    pub vors: f64,
    /// Weighting for loss of load risk
    pub load_risk: u32,
}

/// A three-valued flag, used for enabling and disabling reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "TriStateRaw")]
pub enum TriState {
    /// Explicitly switched off
    Disabled,
    /// Not specified
    #[default]
    NotSet,
    /// Explicitly switched on
    Enabled,
}

/// The ways a [`TriState`] can be written in the configuration file
#[derive(Deserialize)]
#[serde(untagged)]
enum TriStateRaw {
    Bool(bool),
    Int(i64),
    Label(String),
}

impl TryFrom<TriStateRaw> for TriState {
    type Error = String;

    fn try_from(value: TriStateRaw) -> Result<Self, Self::Error> {
        match value {
            TriStateRaw::Bool(false) | TriStateRaw::Int(-1) => Ok(Self::Disabled),
            TriStateRaw::Int(0) => Ok(Self::NotSet),
            TriStateRaw::Bool(true) | TriStateRaw::Int(1) => Ok(Self::Enabled),
            TriStateRaw::Int(value) => Err(format!(
                "Invalid flag value {value}: must be -1 (disabled), 0 (not set) or 1 (enabled)"
            )),
            TriStateRaw::Label(label) => match label.to_lowercase().as_str() {
                "disabled" => Ok(Self::Disabled),
                "not_set" => Ok(Self::NotSet),
                "enabled" => Ok(Self::Enabled),
                _ => Err(format!("Invalid flag value '{label}'")),
            },
        }
    }
}

/// Whether each reserve type is enabled
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReserveEnablement {
    /// Setting for all reserve types
    pub global: TriState,
    /// Settings for individual reserve types
    pub per_type: IndexMap<ReserveType, TriState>,
}

impl ReserveEnablement {
    /// The effective setting for `reserve`.
    ///
    /// A reserve is disabled if either the global or its own flag says so. Otherwise an explicit
    /// flag wins over one which is not set.
    pub fn resolve(&self, reserve: ReserveType) -> TriState {
        let own = self.per_type.get(&reserve).copied().unwrap_or_default();
        match (self.global, own) {
            (TriState::Disabled, _) | (_, TriState::Disabled) => TriState::Disabled,
            (TriState::Enabled, _) | (_, TriState::Enabled) => TriState::Enabled,
            (TriState::NotSet, TriState::NotSet) => TriState::NotSet,
        }
    }

    /// Whether `reserve` may receive contributions
    pub fn is_enabled(&self, reserve: ReserveType) -> bool {
        self.resolve(reserve) != TriState::Disabled
    }
}

/// A coarse grouping of fuels used to select a reserve contribution table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, DeserializeLabeledStringEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum FuelCategory {
    /// Load
    #[string = "load"]
    Load,
    /// Wind generation
    #[string = "wind"]
    Wind,
    /// Solar generation
    #[string = "solar"]
    Solar,
    /// Everything else
    #[string = "default"]
    Default,
}

impl FuelCategory {
    /// The category of `descriptor`'s fuel
    pub fn for_descriptor(config: &Configuration, descriptor: &GeneratorDescriptor) -> Self {
        config.fuel_category(descriptor.fuel.as_deref())
    }
}

/// The fraction of rated capacity contributed to each reserve type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReserveContributionTable(pub IndexMap<ReserveType, Dimensionless>);

impl ReserveContributionTable {
    /// Get the fraction for `reserve`, if the table has an entry for it
    pub fn get(&self, reserve: ReserveType) -> Option<Dimensionless> {
        self.0.get(&reserve).copied()
    }

    /// Iterate over the entries in the table
    pub fn iter(&self) -> impl Iterator<Item = (ReserveType, Dimensionless)> + '_ {
        self.0.iter().map(|(reserve, fraction)| (*reserve, *fraction))
    }
}

/// Problems with the reserve tables in the configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReserveConfigError {
    /// A reserve type is used without being fully described
    #[error("Reserve type {reserve} has no entry in `{section}`")]
    MissingMetadata {
        /// The reserve type
        reserve: ReserveType,
        /// The configuration section lacking an entry
        section: &'static str,
    },
    /// Mutually exclusive reserves can't be chosen between because their VORS are equal
    #[error(
        "Reserve types {} have the same VORS ({vors}), so one cannot be chosen when reserves are \
        mutually exclusive",
        .reserves.iter().join(", ")
    )]
    VorsTie {
        /// The reserve types sharing the highest VORS
        reserves: Vec<ReserveType>,
        /// The shared VORS
        vors: f64,
    },
}

/// The fraction of a generator's capacity contributed to each reserve type
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveAllocation(IndexMap<ReserveType, Dimensionless>);

impl ReserveAllocation {
    /// The fraction contributed to `reserve` (zero if the reserve type is unknown)
    pub fn get(&self, reserve: ReserveType) -> Dimensionless {
        self.0.get(&reserve).copied().unwrap_or(Dimensionless(0.0))
    }

    /// Iterate over every reserve type and its fraction
    pub fn iter(&self) -> impl Iterator<Item = (ReserveType, Dimensionless)> + '_ {
        self.0.iter().map(|(reserve, fraction)| (*reserve, *fraction))
    }

    /// Iterate over the reserve types with a nonzero contribution
    pub fn iter_contributing(&self) -> impl Iterator<Item = (ReserveType, Dimensionless)> + '_ {
        self.iter().filter(|(_, fraction)| fraction.value() > 0.0)
    }

    /// The capacity a generator of size `capacity` contributes to `reserve`
    pub fn capacity_for(&self, reserve: ReserveType, capacity: ActivePower) -> ActivePower {
        capacity * self.get(reserve)
    }
}

/// Look up the VORS for `reserve`
fn get_vors(config: &Configuration, reserve: ReserveType) -> Result<f64, ReserveConfigError> {
    config
        .reserve_metadata(reserve)
        .map(|metadata| metadata.vors)
        .ok_or(ReserveConfigError::MissingMetadata {
            reserve,
            section: "reserve_vors",
        })
}

/// Fractions from `table` after disabled reserves and ineligible generators are zeroed.
///
/// Every reserve type known to the configuration is included.
pub(crate) fn effective_fractions(
    config: &Configuration,
    table: &ReserveContributionTable,
    eligible: bool,
) -> Result<IndexMap<ReserveType, Dimensionless>, ReserveConfigError> {
    let mut fractions: IndexMap<_, _> = config
        .reserve_types()
        .map(|reserve| (reserve, Dimensionless(0.0)))
        .collect();

    for (reserve, fraction) in table.iter() {
        if config.reserve_metadata(reserve).is_none() {
            return Err(ReserveConfigError::MissingMetadata {
                reserve,
                section: "reserve_duration",
            });
        }

        if eligible && config.reserve_is_enabled(reserve) {
            fractions.insert(reserve, fraction);
        }
    }

    Ok(fractions)
}

/// Zero every fraction apart from the nonzero one with the highest VORS
pub(crate) fn apply_mutual_exclusivity(
    config: &Configuration,
    fractions: &mut IndexMap<ReserveType, Dimensionless>,
) -> Result<(), ReserveConfigError> {
    let mut ranked: Vec<_> = fractions
        .iter()
        .filter(|(_, fraction)| fraction.value() > 0.0)
        .map(|(reserve, _)| get_vors(config, *reserve).map(|vors| (*reserve, vors)))
        .collect::<Result<_, _>>()?;
    ranked.sort_by(|(_, vors1), (_, vors2)| vors2.total_cmp(vors1));

    let Some(&(chosen, best)) = ranked.first() else {
        // Nothing to choose between
        return Ok(());
    };

    let tied = ranked
        .iter()
        .filter(|(_, vors)| approx_eq!(f64, *vors, best, ulps = 4))
        .map(|(reserve, _)| *reserve)
        .collect_vec();
    if tied.len() > 1 {
        return Err(ReserveConfigError::VorsTie {
            reserves: tied,
            vors: best,
        });
    }

    for (reserve, fraction) in &mut *fractions {
        if *reserve != chosen {
            *fraction = Dimensionless(0.0);
        }
    }

    Ok(())
}

/// Check that every category's table can be applied to an eligible generator.
///
/// This catches missing metadata and VORS ties when the configuration is loaded rather than part
/// way through a batch of records.
pub(crate) fn check_reserve_tables(config: &Configuration) -> Result<(), ReserveConfigError> {
    for category in FuelCategory::iter() {
        let mut fractions = effective_fractions(config, config.reserve_table(category), true)?;
        if config.reserve_mutually_exclusive() {
            apply_mutual_exclusivity(config, &mut fractions)?;
        }
    }

    Ok(())
}

/// Computes the reserve contributions of generators
#[derive(Clone, Copy)]
pub struct ReserveAllocator<'a> {
    config: &'a Configuration,
}

impl<'a> ReserveAllocator<'a> {
    /// Create a new [`ReserveAllocator`] reading from `config`
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Get the fraction of capacity `descriptor` contributes to each reserve type.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The generator
    /// * `class` - The model class the generator has been assigned
    /// * `category` - The generator's fuel category
    pub fn allocate(
        &self,
        descriptor: &GeneratorDescriptor,
        class: &ModelClassID,
        category: FuelCategory,
    ) -> Result<ReserveAllocation, ReserveConfigError> {
        let table = self.config.reserve_table(category);
        let eligible = self.config.is_reserve_eligible(class);
        let mut fractions = effective_fractions(self.config, table, eligible)?;
        if self.config.reserve_mutually_exclusive() {
            apply_mutual_exclusivity(self.config, &mut fractions)?;
        }

        trace!(
            "Reserves for {class} generator in region {} ({category}): {}",
            descriptor.region,
            fractions
                .iter()
                .map(|(reserve, fraction)| format!("{reserve}={fraction}"))
                .join(", ")
        );

        Ok(ReserveAllocation(fractions))
    }
}
