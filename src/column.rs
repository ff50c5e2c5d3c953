//! Normalisation of incoming column headers onto canonical field names.
use crate::config::Configuration;
use indexmap::IndexSet;
use log::trace;
use thiserror::Error;

/// Indicates that a header is neither a known alias nor an accepted header
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unrecognised column '{0}'")]
pub struct UnrecognizedColumnError(pub String);

/// Errors arising when normalising a full header row
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColumnError {
    /// A single header could not be normalised
    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedColumnError),
    /// Two raw headers were mapped onto the same canonical name
    #[error("Columns '{first}' and '{second}' both map to '{canonical}'")]
    Duplicate {
        /// The canonical name
        canonical: String,
        /// The first raw header mapping to `canonical`
        first: String,
        /// The second raw header mapping to `canonical`
        second: String,
    },
}

/// Maps raw headers onto canonical field names
#[derive(Clone, Copy)]
pub struct ColumnMapper<'a> {
    config: &'a Configuration,
}

impl<'a> ColumnMapper<'a> {
    /// Create a new [`ColumnMapper`] reading from `config`
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Get the canonical name for `header`.
    ///
    /// Aliases are matched case-insensitively. A header which is not an alias must appear in the
    /// list of valid headers exactly as written.
    pub fn normalize(&self, header: &str) -> Result<String, UnrecognizedColumnError> {
        let header = header.trim();
        if let Some(canonical) = self
            .config
            .column_mapping()
            .get(header.to_lowercase().as_str())
        {
            trace!("Column '{header}' renamed to '{canonical}'");
            return Ok(canonical.clone());
        }

        if self.config.valid_headers().contains(header) {
            return Ok(header.to_string());
        }

        Err(UnrecognizedColumnError(header.to_string()))
    }

    /// Normalise a whole header row, checking that no two columns end up with the same name
    pub fn normalize_all<'h, I>(&self, headers: I) -> Result<Vec<String>, ColumnError>
    where
        I: IntoIterator<Item = &'h str>,
    {
        let mut raw_headers: Vec<&str> = Vec::new();
        let mut canonical: IndexSet<String> = IndexSet::new();
        for header in headers {
            let name = self.normalize(header)?;
            let (index, inserted) = canonical.insert_full(name);
            if !inserted {
                return Err(ColumnError::Duplicate {
                    canonical: canonical[index].clone(),
                    first: raw_headers[index].to_string(),
                    second: header.to_string(),
                });
            }
            raw_headers.push(header);
        }

        Ok(canonical.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::config;
    use rstest::rstest;

    #[rstest]
    #[case("fueltype", "fuel")]
    #[case("FuelType", "fuel")]
    #[case("  pm ", "prime_mover")]
    #[case("*i", "fuel")]
    #[case("cap", "capacity")]
    #[case("region", "region")]
    #[case("name", "name")]
    fn test_normalize(config: Configuration, #[case] header: &str, #[case] expected: &str) {
        assert_eq!(ColumnMapper::new(&config).normalize(header).unwrap(), expected);
    }

    #[rstest]
    #[case("Region")] // whitelist is case-sensitive
    #[case("colour")]
    fn test_normalize_unrecognised(config: Configuration, #[case] header: &str) {
        assert_eq!(
            ColumnMapper::new(&config).normalize(header),
            Err(UnrecognizedColumnError(header.to_string()))
        );
    }

    #[rstest]
    fn test_normalize_is_repeatable(config: Configuration) {
        let mapper = ColumnMapper::new(&config);
        assert_eq!(mapper.normalize("PM"), mapper.normalize("PM"));
    }

    #[rstest]
    fn test_normalize_all(config: Configuration) {
        let mapper = ColumnMapper::new(&config);
        assert_eq!(
            mapper
                .normalize_all(["name", "fueltype", "pm", "cap", "units", "r", "t"])
                .unwrap(),
            [
                "name",
                "fuel",
                "prime_mover",
                "capacity",
                "capacity_unit",
                "region",
                "year"
            ]
        );
    }

    #[rstest]
    fn test_normalize_all_duplicate(config: Configuration) {
        let mapper = ColumnMapper::new(&config);
        assert_eq!(
            mapper.normalize_all(["fueltype", "region", "*i"]),
            Err(ColumnError::Duplicate {
                canonical: "fuel".into(),
                first: "fueltype".into(),
                second: "*i".into(),
            })
        );
    }

    #[rstest]
    fn test_normalize_all_unrecognised(config: Configuration) {
        assert_eq!(
            ColumnMapper::new(&config).normalize_all(["fuel", "bogus"]),
            Err(ColumnError::Unrecognized(UnrecognizedColumnError(
                "bogus".into()
            )))
        );
    }
}
