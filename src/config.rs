//! The immutable configuration shared by every stage of record resolution.
//!
//! A configuration document (TOML or JSON) is first deserialised into raw structs mirroring the
//! file layout, then checked and converted into a [`Configuration`]. Any problem with the
//! document is reported here, before a single record is processed.
use crate::id::IDCollection;
use crate::input::{input_err_msg, read_document};
use crate::reserve::{
    FuelCategory, ReserveConfigError, ReserveContributionTable, ReserveEnablement,
    ReserveMetadata, ReserveType, TriState, check_reserve_tables,
};
use crate::technology::{ModelClassID, Pattern, PatternRule};
use crate::units::{Dimensionless, UnitKind};
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use strum::IntoEnumIterator;
use thiserror::Error;
use unicase::UniCase;

pub mod overrides;
use overrides::merge_overrides;

/// Problems with a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is missing a required section or a section has the wrong shape
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    /// `generator_models` is empty
    #[error("No generator models are defined")]
    NoModels,
    /// A generator model has no pattern rules
    #[error("Generator model {0} has no patterns")]
    NoPatterns(ModelClassID),
    /// A pattern rule has neither a fuel nor a type
    #[error("Pattern {index} of generator model {class} has neither a fuel nor a type")]
    EmptyPattern {
        /// The generator model
        class: ModelClassID,
        /// The position of the rule within the model's list
        index: usize,
    },
    /// A reserve type name is not recognised
    #[error("Unknown reserve type '{name}' in `{section}`")]
    UnknownReserveType {
        /// The unrecognised name
        name: String,
        /// The section it appears in
        section: &'static str,
    },
    /// Two keys of a section name the same reserve type
    #[error("Reserve type {reserve} is given more than once in `{section}` (as '{name}')")]
    DuplicateReserveType {
        /// The reserve type
        reserve: ReserveType,
        /// The repeated key, as written
        name: String,
        /// The section it appears in
        section: &'static str,
    },
    /// A unit map entry refers to an unknown kind of quantity
    #[error("Unit '{symbol}' has unknown kind '{kind}'")]
    UnknownUnitKind {
        /// The unit symbol
        symbol: String,
        /// The unrecognised kind
        kind: String,
    },
    /// Two column aliases differ only by case
    #[error("Column alias '{0}' is defined more than once")]
    DuplicateAlias(String),
    /// A fuel is listed under more than one category
    #[error("Fuel '{fuel}' is listed under both {first} and {second}")]
    DuplicateFuel {
        /// The fuel
        fuel: String,
        /// The first category it appears in
        first: FuelCategory,
        /// The second category it appears in
        second: FuelCategory,
    },
    /// A generator model named elsewhere in the document is not defined
    #[error("Unknown generator model '{0}' in `reserve_ineligible_models`")]
    UnknownModel(String),
    /// A value is out of range
    #[error("Invalid value for `{field}`: {message}")]
    InvalidValue {
        /// Where the value appears
        field: String,
        /// What is wrong with it
        message: String,
    },
    /// The reserve tables are inconsistent
    #[error(transparent)]
    Reserve(#[from] ReserveConfigError),
}

/// Scalars which downstream stages apply to generator and load data
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarParameters {
    /// Multiplier for load profiles
    pub load_scalar: f64,
    /// Fraction of load lost in distribution
    pub distribution_losses: f64,
}

impl Default for ScalarParameters {
    fn default() -> Self {
        Self {
            load_scalar: 1.0,
            distribution_losses: 0.0,
        }
    }
}

/// A pattern rule as written in the configuration document
#[derive(Deserialize)]
struct PatternRaw {
    #[serde(default)]
    fuel: Option<String>,
    #[serde(default, rename = "type")]
    prime_mover: Option<String>,
}

/// `reserve_is_enabled` may be one flag for all reserves or a table of flags
#[derive(Deserialize)]
#[serde(untagged)]
enum EnablementRaw {
    Global(TriState),
    PerType(IndexMap<String, TriState>),
}

impl Default for EnablementRaw {
    fn default() -> Self {
        Self::Global(TriState::NotSet)
    }
}

/// Read a boolean flag which may also be written as an integer (nonzero is true)
fn deserialise_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserialiser) {
        Ok(Flag::Bool(value)) => Ok(value),
        Ok(Flag::Int(value)) => Ok(value != 0),
        Err(_) => Err(D::Error::custom("expected a boolean or an integer")),
    }
}

fn default_load_scalar() -> f64 {
    1.0
}

fn default_fuel_categories() -> IndexMap<FuelCategory, Vec<String>> {
    [
        (FuelCategory::Wind, vec!["wind".to_string()]),
        (FuelCategory::Solar, vec!["solar".to_string()]),
    ]
    .into_iter()
    .collect()
}

/// The configuration document as written
#[derive(Deserialize)]
struct ConfigurationRaw {
    generator_models: IndexMap<String, Vec<PatternRaw>>,
    load_reserves: IndexMap<String, f64>,
    #[serde(default)]
    wind_reserves: Option<IndexMap<String, f64>>,
    #[serde(default)]
    solar_reserves: Option<IndexMap<String, f64>>,
    #[serde(default)]
    default_reserves: Option<IndexMap<String, f64>>,
    reserve_duration: IndexMap<String, f64>,
    reserve_time_frame: IndexMap<String, f64>,
    reserve_vors: IndexMap<String, f64>,
    reserve_load_risk: IndexMap<String, u32>,
    #[serde(default)]
    reserve_is_enabled: EnablementRaw,
    #[serde(default, deserialize_with = "deserialise_flag")]
    reserve_mutually_exclusive: bool,
    #[serde(default)]
    reserve_ineligible_models: Vec<String>,
    unit_map: IndexMap<String, String>,
    default_column_mapping: IndexMap<String, String>,
    valid_headers: Vec<String>,
    #[serde(default = "default_load_scalar")]
    load_scalar: f64,
    #[serde(default)]
    distribution_losses: f64,
    #[serde(default = "default_fuel_categories")]
    fuel_categories: IndexMap<FuelCategory, Vec<String>>,
}

/// All of the tables and parameters used to resolve generator records
#[derive(Debug, Clone)]
pub struct Configuration {
    generator_models: IndexMap<ModelClassID, Vec<PatternRule>>,
    load_reserves: ReserveContributionTable,
    reserve_tables: HashMap<FuelCategory, ReserveContributionTable>,
    reserve_metadata: IndexMap<ReserveType, ReserveMetadata>,
    reserve_enablement: ReserveEnablement,
    reserve_mutually_exclusive: bool,
    reserve_ineligible_models: IndexSet<ModelClassID>,
    unit_map: IndexMap<String, UnitKind>,
    column_mapping: IndexMap<String, String>,
    valid_headers: IndexSet<String>,
    scalars: ScalarParameters,
    fuel_categories: HashMap<UniCase<String>, FuelCategory>,
}

impl Configuration {
    /// Read a configuration document from `path`, merging in the document at `overrides` if given.
    ///
    /// Documents may be TOML (`.toml`) or JSON (`.json`).
    pub fn from_path(path: &Path, overrides: Option<&Path>) -> Result<Self> {
        let mut document = read_document(path)?;
        if let Some(overrides) = overrides {
            debug!("Applying configuration overrides from {}", overrides.display());
            document = merge_overrides(document, read_document(overrides)?);
        }

        Self::load(document).with_context(|| input_err_msg(path))
    }

    /// Build a [`Configuration`] from a parsed configuration document
    pub fn load(document: Value) -> Result<Self, ConfigError> {
        let raw: ConfigurationRaw = serde_json::from_value(document)?;

        let generator_models = read_generator_models(raw.generator_models)?;
        warn_duplicate_rules(&generator_models);

        let load_reserves = read_reserve_table(raw.load_reserves, "load_reserves")?;
        let mut reserve_tables = HashMap::new();
        for (category, table, section) in [
            (FuelCategory::Wind, raw.wind_reserves, "wind_reserves"),
            (FuelCategory::Solar, raw.solar_reserves, "solar_reserves"),
            (FuelCategory::Default, raw.default_reserves, "default_reserves"),
        ] {
            if let Some(table) = table {
                reserve_tables.insert(category, read_reserve_table(table, section)?);
            }
        }

        let reserve_enablement = match raw.reserve_is_enabled {
            EnablementRaw::Global(global) => ReserveEnablement {
                global,
                ..Default::default()
            },
            EnablementRaw::PerType(flags) => ReserveEnablement {
                global: TriState::NotSet,
                per_type: parse_reserve_keys(flags, "reserve_is_enabled")?,
            },
        };

        let referenced = load_reserves
            .iter()
            .chain(reserve_tables.values().flat_map(ReserveContributionTable::iter))
            .map(|(reserve, _)| reserve)
            .chain(reserve_enablement.per_type.keys().copied());
        let reserve_metadata = read_reserve_metadata(
            referenced,
            raw.reserve_duration,
            raw.reserve_time_frame,
            raw.reserve_vors,
            raw.reserve_load_risk,
        )?;

        let reserve_ineligible_models: IndexSet<ModelClassID> = raw
            .reserve_ineligible_models
            .iter()
            .map(|name| {
                generator_models
                    .get_id_by_str(name)
                    .map_err(|_| ConfigError::UnknownModel(name.clone()))
            })
            .collect::<Result<_, _>>()?;

        let config = Self {
            generator_models,
            load_reserves,
            reserve_tables,
            reserve_metadata,
            reserve_enablement,
            reserve_mutually_exclusive: raw.reserve_mutually_exclusive,
            reserve_ineligible_models,
            unit_map: read_unit_map(raw.unit_map)?,
            column_mapping: read_column_mapping(raw.default_column_mapping)?,
            valid_headers: raw.valid_headers.into_iter().collect(),
            scalars: read_scalars(raw.load_scalar, raw.distribution_losses)?,
            fuel_categories: invert_fuel_categories(raw.fuel_categories)?,
        };
        check_reserve_tables(&config)?;

        debug!(
            "Configuration loaded with {} generator models and {} reserve types",
            config.generator_models.len(),
            config.reserve_metadata.len()
        );

        Ok(config)
    }

    /// The generator model classes, in the order they were declared
    pub fn model_classes(&self) -> impl Iterator<Item = &ModelClassID> {
        self.generator_models.keys()
    }

    /// The pattern rules for `class` (empty if the class is unknown)
    pub fn patterns_for(&self, class: &ModelClassID) -> &[PatternRule] {
        self.generator_models.get(class).map_or(&[], Vec::as_slice)
    }

    /// The contribution table used for generators in `category`.
    ///
    /// Categories without their own table fall back to the default table, then the load table.
    pub fn reserve_table(&self, category: FuelCategory) -> &ReserveContributionTable {
        if category == FuelCategory::Load {
            return &self.load_reserves;
        }

        self.reserve_tables
            .get(&category)
            .or_else(|| self.reserve_tables.get(&FuelCategory::Default))
            .unwrap_or(&self.load_reserves)
    }

    /// Every reserve type described by the configuration
    pub fn reserve_types(&self) -> impl Iterator<Item = ReserveType> + '_ {
        self.reserve_metadata.keys().copied()
    }

    /// The metadata for `reserve`, if it is described by the configuration
    pub fn reserve_metadata(&self, reserve: ReserveType) -> Option<&ReserveMetadata> {
        self.reserve_metadata.get(&reserve)
    }

    /// The effective enablement flag for `reserve`
    pub fn reserve_enablement(&self, reserve: ReserveType) -> TriState {
        self.reserve_enablement.resolve(reserve)
    }

    /// Whether generators may contribute to `reserve`
    pub fn reserve_is_enabled(&self, reserve: ReserveType) -> bool {
        self.reserve_enablement.is_enabled(reserve)
    }

    /// Whether a generator may contribute to at most one reserve type
    pub fn reserve_mutually_exclusive(&self) -> bool {
        self.reserve_mutually_exclusive
    }

    /// Whether generators of `class` may contribute to reserves at all
    pub fn is_reserve_eligible(&self, class: &ModelClassID) -> bool {
        !self.reserve_ineligible_models.contains(class)
    }

    /// Map from unit symbols to the kinds of quantity they measure
    pub fn unit_map(&self) -> &IndexMap<String, UnitKind> {
        &self.unit_map
    }

    /// Map from lower-case column aliases to canonical column names
    pub fn column_mapping(&self) -> &IndexMap<String, String> {
        &self.column_mapping
    }

    /// Column names accepted as they are
    pub fn valid_headers(&self) -> &IndexSet<String> {
        &self.valid_headers
    }

    /// Scalar parameters
    pub fn scalars(&self) -> &ScalarParameters {
        &self.scalars
    }

    /// The category of `fuel`. Missing and unlisted fuels are in [`FuelCategory::Default`].
    pub fn fuel_category(&self, fuel: Option<&str>) -> FuelCategory {
        fuel.and_then(|fuel| {
            self.fuel_categories
                .get(&UniCase::new(fuel.trim().to_string()))
                .copied()
        })
        .unwrap_or(FuelCategory::Default)
    }
}

fn read_generator_models(
    models: IndexMap<String, Vec<PatternRaw>>,
) -> Result<IndexMap<ModelClassID, Vec<PatternRule>>, ConfigError> {
    if models.is_empty() {
        return Err(ConfigError::NoModels);
    }

    let mut out = IndexMap::new();
    for (name, patterns) in models {
        let class = ModelClassID::from(name);
        if patterns.is_empty() {
            return Err(ConfigError::NoPatterns(class));
        }

        let mut rules = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.into_iter().enumerate() {
            let rule = PatternRule::new(
                Pattern::from(pattern.fuel),
                Pattern::from(pattern.prime_mover),
            );
            if !rule.fuel.is_concrete() && !rule.prime_mover.is_concrete() {
                return Err(ConfigError::EmptyPattern { class, index });
            }
            rules.push(rule);
        }
        out.insert(class, rules);
    }

    Ok(out)
}

/// A pattern as it is matched: concrete values compare without regard to case
fn match_key(pattern: &Pattern) -> Option<UniCase<&str>> {
    match pattern {
        Pattern::Concrete(value) => Some(UniCase::new(value.as_str())),
        Pattern::Wildcard => None,
    }
}

/// Rules which match exactly the same generators as a rule declared earlier by another class.
///
/// Returns the later rule, the class which declared it first and the later class.
fn find_duplicate_rules(
    models: &IndexMap<ModelClassID, Vec<PatternRule>>,
) -> Vec<(&PatternRule, &ModelClassID, &ModelClassID)> {
    let mut seen = HashMap::new();
    let mut duplicates = Vec::new();
    for (class, rule) in models
        .iter()
        .flat_map(|(class, rules)| rules.iter().map(move |rule| (class, rule)))
    {
        let key = (match_key(&rule.fuel), match_key(&rule.prime_mover));
        match seen.get(&key) {
            Some(&first) if first != class => duplicates.push((rule, first, class)),
            Some(_) => {}
            None => {
                seen.insert(key, class);
            }
        }
    }

    duplicates
}

/// Identical rules in different classes can never be told apart
fn warn_duplicate_rules(models: &IndexMap<ModelClassID, Vec<PatternRule>>) {
    for (rule, first, class) in find_duplicate_rules(models) {
        warn!(
            "Pattern {rule} is declared by both {first} and {class}: matching generators \
            will be reported as ambiguous"
        );
    }
}

/// Convert the keys of a section from reserve type names.
///
/// Names are case-insensitive, so two keys may name the same reserve type; this is an error.
fn parse_reserve_keys<V>(
    section_values: IndexMap<String, V>,
    section: &'static str,
) -> Result<IndexMap<ReserveType, V>, ConfigError> {
    let mut out = IndexMap::with_capacity(section_values.len());
    for (name, value) in section_values {
        let Ok(reserve) = ReserveType::from_str(&name) else {
            return Err(ConfigError::UnknownReserveType { name, section });
        };
        if out.contains_key(&reserve) {
            return Err(ConfigError::DuplicateReserveType {
                reserve,
                name,
                section,
            });
        }
        out.insert(reserve, value);
    }

    Ok(out)
}

fn read_reserve_table(
    table: IndexMap<String, f64>,
    section: &'static str,
) -> Result<ReserveContributionTable, ConfigError> {
    let table = parse_reserve_keys(table, section)?;
    for (reserve, fraction) in &table {
        if !(0.0..=1.0).contains(fraction) {
            return Err(ConfigError::InvalidValue {
                field: format!("{section}.{reserve}"),
                message: format!("{fraction} is not between 0 and 1"),
            });
        }
    }

    Ok(ReserveContributionTable(
        table
            .into_iter()
            .map(|(reserve, fraction)| (reserve, Dimensionless(fraction)))
            .collect(),
    ))
}

fn check_positive(value: f64, section: &str, reserve: ReserveType) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: format!("{section}.{reserve}"),
            message: format!("{value} must be a positive number"),
        })
    }
}

/// Collate the four metadata sections.
///
/// Every reserve type named in a contribution table, the per-type enablement table or any
/// metadata section must appear in all four sections.
fn read_reserve_metadata(
    referenced: impl Iterator<Item = ReserveType>,
    duration: IndexMap<String, f64>,
    time_frame: IndexMap<String, f64>,
    vors: IndexMap<String, f64>,
    load_risk: IndexMap<String, u32>,
) -> Result<IndexMap<ReserveType, ReserveMetadata>, ConfigError> {
    let duration = parse_reserve_keys(duration, "reserve_duration")?;
    let time_frame = parse_reserve_keys(time_frame, "reserve_time_frame")?;
    let vors = parse_reserve_keys(vors, "reserve_vors")?;
    let load_risk = parse_reserve_keys(load_risk, "reserve_load_risk")?;

    let known: IndexSet<ReserveType> = referenced
        .chain(duration.keys().copied())
        .chain(time_frame.keys().copied())
        .chain(vors.keys().copied())
        .chain(load_risk.keys().copied())
        .collect();

    let missing = |reserve, section| ReserveConfigError::MissingMetadata { reserve, section };
    let mut metadata = IndexMap::new();
    for reserve in ReserveType::iter().filter(|reserve| known.contains(reserve)) {
        let entry = ReserveMetadata {
            duration: *duration
                .get(&reserve)
                .ok_or_else(|| missing(reserve, "reserve_duration"))?,
            time_frame: *time_frame
                .get(&reserve)
                .ok_or_else(|| missing(reserve, "reserve_time_frame"))?,
            vors: *vors
                .get(&reserve)
                .ok_or_else(|| missing(reserve, "reserve_vors"))?,
            load_risk: *load_risk
                .get(&reserve)
                .ok_or_else(|| missing(reserve, "reserve_load_risk"))?,
        };

        check_positive(entry.duration, "reserve_duration", reserve)?;
        check_positive(entry.time_frame, "reserve_time_frame", reserve)?;
        if !entry.vors.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: format!("reserve_vors.{reserve}"),
                message: format!("{} is not a finite number", entry.vors),
            });
        }

        metadata.insert(reserve, entry);
    }

    Ok(metadata)
}

fn read_unit_map(
    unit_map: IndexMap<String, String>,
) -> Result<IndexMap<String, UnitKind>, ConfigError> {
    unit_map
        .into_iter()
        .map(|(symbol, kind)| match UnitKind::from_str(&kind) {
            Ok(unit_kind) => Ok((symbol, unit_kind)),
            Err(_) => Err(ConfigError::UnknownUnitKind { symbol, kind }),
        })
        .collect()
}

fn read_column_mapping(
    mapping: IndexMap<String, String>,
) -> Result<IndexMap<String, String>, ConfigError> {
    let mut out = IndexMap::with_capacity(mapping.len());
    for (alias, canonical) in mapping {
        let alias = alias.trim().to_lowercase();
        if out.contains_key(&alias) {
            return Err(ConfigError::DuplicateAlias(alias));
        }
        out.insert(alias, canonical);
    }

    Ok(out)
}

fn read_scalars(
    load_scalar: f64,
    distribution_losses: f64,
) -> Result<ScalarParameters, ConfigError> {
    if !(load_scalar.is_finite() && load_scalar > 0.0) {
        return Err(ConfigError::InvalidValue {
            field: "load_scalar".into(),
            message: format!("{load_scalar} must be a positive number"),
        });
    }
    if !(0.0..1.0).contains(&distribution_losses) {
        return Err(ConfigError::InvalidValue {
            field: "distribution_losses".into(),
            message: format!("{distribution_losses} must be at least 0 and less than 1"),
        });
    }

    Ok(ScalarParameters {
        load_scalar,
        distribution_losses,
    })
}

/// Turn the category -> fuels table into a fuel -> category lookup
fn invert_fuel_categories(
    categories: IndexMap<FuelCategory, Vec<String>>,
) -> Result<HashMap<UniCase<String>, FuelCategory>, ConfigError> {
    let mut out = HashMap::new();
    for (category, fuels) in categories {
        for fuel in fuels {
            let key = UniCase::new(fuel.trim().to_string());
            if let Some(first) = out.insert(key, category)
                && first != category
            {
                return Err(ConfigError::DuplicateFuel {
                    fuel,
                    first,
                    second: category,
                });
            }
        }
    }

    Ok(out)
}
