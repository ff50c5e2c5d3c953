//! Classification of generators into model classes (archetypes such as `ThermalStandard`).
//!
//! Each model class declared in the configuration owns a list of [`PatternRule`]s. A rule has a
//! fuel pattern and a prime mover pattern, each of which is either a concrete value or a
//! wildcard. A generator is assigned to the class whose matching rules are the most specific,
//! i.e. have the most concrete fields. If the most specific matches belong to more than one
//! class, the configuration is ambiguous for that generator and classification fails; the order
//! in which rules are declared never breaks a tie.
use crate::config::Configuration;
use crate::generator::GeneratorDescriptor;
use crate::id::define_id_type;
use itertools::Itertools;
use log::trace;
use std::fmt;
use thiserror::Error;

define_id_type! {ModelClassID}

/// One field of a [`PatternRule`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches only this value (ignoring case and surrounding whitespace)
    Concrete(String),
    /// Matches anything, including a missing value
    Wildcard,
}

impl Pattern {
    /// How much this pattern contributes to a rule's specificity for `value`.
    ///
    /// Returns `None` if the pattern does not match.
    fn score(&self, value: Option<&str>) -> Option<u8> {
        match self {
            Self::Wildcard => Some(0),
            Self::Concrete(pattern) => value
                .filter(|value| unicase::eq(pattern.as_str(), value.trim()))
                .map(|_| 1),
        }
    }

    /// Whether this is a concrete pattern
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Concrete(_))
    }
}

impl From<Option<String>> for Pattern {
    /// A missing or blank value is a wildcard
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            None | Some("") => Self::Wildcard,
            Some(value) => Self::Concrete(value.to_string()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(value) => write!(f, "{value}"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

/// A rule assigning generators with a given fuel and prime mover to a model class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternRule {
    /// Pattern for the generator's fuel
    pub fuel: Pattern,
    /// Pattern for the generator's prime mover
    pub prime_mover: Pattern,
}

impl PatternRule {
    /// Create a new [`PatternRule`]
    pub fn new(fuel: Pattern, prime_mover: Pattern) -> Self {
        Self { fuel, prime_mover }
    }

    /// The number of concrete fields in this rule which match `descriptor`.
    ///
    /// Returns `None` if any concrete field doesn't match.
    pub fn specificity(&self, descriptor: &GeneratorDescriptor) -> Option<u8> {
        let fuel = self.fuel.score(descriptor.fuel.as_deref())?;
        let prime_mover = self.prime_mover.score(descriptor.prime_mover.as_deref())?;
        Some(fuel + prime_mover)
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fuel: {}, type: {})", self.fuel, self.prime_mover)
    }
}

/// A rule which matched a generator, along with its score
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    /// The class the rule belongs to
    pub class: &'a ModelClassID,
    /// The matching rule
    pub rule: &'a PatternRule,
    /// The number of concrete fields which matched
    pub specificity: u8,
}

/// Show an optional descriptor field in an error message
fn describe(value: Option<&String>) -> &str {
    value.map_or("<none>", String::as_str)
}

/// Reasons why a generator could not be assigned a model class
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    /// No rule matched the generator
    #[error(
        "No generator model matches fuel {} and prime mover {}",
        describe(.fuel.as_ref()),
        describe(.prime_mover.as_ref())
    )]
    Unclassifiable {
        /// The generator's fuel
        fuel: Option<String>,
        /// The generator's prime mover
        prime_mover: Option<String>,
    },
    /// Equally specific rules from different classes matched the generator
    #[error(
        "Fuel {} and prime mover {} are matched equally well by generator models {}",
        describe(.fuel.as_ref()),
        describe(.prime_mover.as_ref()),
        .classes.iter().join(", ")
    )]
    Ambiguous {
        /// The generator's fuel
        fuel: Option<String>,
        /// The generator's prime mover
        prime_mover: Option<String>,
        /// The competing classes, in configuration order
        classes: Vec<ModelClassID>,
    },
}

/// Assigns model classes to generators
#[derive(Clone, Copy)]
pub struct TechnologyClassifier<'a> {
    config: &'a Configuration,
}

impl<'a> TechnologyClassifier<'a> {
    /// Create a new [`TechnologyClassifier`] reading from `config`
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Every rule which matches `descriptor`, in configuration order
    pub fn candidates(&self, descriptor: &GeneratorDescriptor) -> Vec<Candidate<'a>> {
        self.config
            .model_classes()
            .flat_map(|class| {
                self.config
                    .patterns_for(class)
                    .iter()
                    .map(move |rule| (class, rule))
            })
            .filter_map(|(class, rule)| {
                let specificity = rule.specificity(descriptor)?;
                Some(Candidate {
                    class,
                    rule,
                    specificity,
                })
            })
            .collect()
    }

    /// Get the model class for `descriptor`
    pub fn classify(
        &self,
        descriptor: &GeneratorDescriptor,
    ) -> Result<ModelClassID, ClassificationError> {
        let candidates = self.candidates(descriptor);
        let Some(best) = candidates.iter().map(|c| c.specificity).max() else {
            return Err(ClassificationError::Unclassifiable {
                fuel: descriptor.fuel.clone(),
                prime_mover: descriptor.prime_mover.clone(),
            });
        };

        let mut classes = candidates
            .into_iter()
            .filter(|c| c.specificity == best)
            .map(|c| c.class)
            .unique()
            .cloned()
            .collect_vec();
        if classes.len() > 1 {
            return Err(ClassificationError::Ambiguous {
                fuel: descriptor.fuel.clone(),
                prime_mover: descriptor.prime_mover.clone(),
                classes,
            });
        }

        // There is at least one candidate with the best score
        let class = classes.swap_remove(0);
        trace!(
            "Fuel {} and prime mover {} classified as {class}",
            describe(descriptor.fuel.as_ref()),
            describe(descriptor.prime_mover.as_ref())
        );

        Ok(class)
    }

    /// Classify each of `descriptors`.
    ///
    /// Failure to classify one descriptor does not affect the others.
    pub fn classify_all<'d, I>(
        &self,
        descriptors: I,
    ) -> impl Iterator<Item = Result<ModelClassID, ClassificationError>>
    where
        I: IntoIterator<Item = &'d GeneratorDescriptor>,
    {
        let classifier = *self;
        descriptors
            .into_iter()
            .map(move |descriptor| classifier.classify(descriptor))
    }
}
