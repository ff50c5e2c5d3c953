//! Common routines for reading input files.
use crate::column::ColumnMapper;
use crate::generator::RawRecord;
use anyhow::{Context, Result, bail, ensure};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Format an error message to include the file path.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a configuration document, which may be TOML or JSON depending on its extension
pub fn read_document(file_path: &Path) -> Result<Value> {
    match file_path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => read_toml(file_path),
        Some("json") => {
            let json_str =
                fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
            serde_json::from_str(&json_str).with_context(|| input_err_msg(file_path))
        }
        _ => bail!(
            "Unsupported file type for {}: expected .toml or .json",
            file_path.display()
        ),
    }
}

/// Read generator records from a CSV file.
///
/// Column headers are normalised with `mapper`, so the returned records are keyed by canonical
/// column name. Empty cells are left out of the record.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
/// * `mapper` - Maps the file's headers onto canonical names
pub fn read_generator_records(file_path: &Path, mapper: &ColumnMapper) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;

    let headers = reader
        .headers()
        .with_context(|| input_err_msg(file_path))?
        .clone();
    let columns = mapper
        .normalize_all(headers.iter())
        .with_context(|| input_err_msg(file_path))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| input_err_msg(file_path))?;
        let record: RawRecord = columns
            .iter()
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        records.push(record);
    }
    ensure!(
        !records.is_empty(),
        "{}: CSV file cannot be empty",
        input_err_msg(file_path)
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::fixture::{assert_error, config};
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        a: u32,
        b: String,
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "a = 1\nb = \"hello\"").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                a: 1,
                b: "hello".to_string()
            }
        );

        // Missing field
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "a = 1").unwrap();
        }
        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_document() {
        let dir = tempdir().unwrap();
        let toml_path = dir.path().join("config.toml");
        fs::write(&toml_path, "a = 1\n[b]\nc = [1, 2]\n").unwrap();
        let json_path = dir.path().join("config.json");
        fs::write(&json_path, r#"{"a": 1, "b": {"c": [1, 2]}}"#).unwrap();

        assert_eq!(
            read_document(&toml_path).unwrap(),
            read_document(&json_path).unwrap()
        );

        let yaml_path = dir.path().join("config.yaml");
        fs::write(&yaml_path, "a: 1\n").unwrap();
        assert!(read_document(&yaml_path).is_err());
    }

    #[rstest]
    fn test_read_generator_records(config: Configuration) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators.csv");
        fs::write(
            &file_path,
            "name,FuelType,PM,cap,units,r,t\nwind_1,WIND,,80,MW,p1,2030\n",
        )
        .unwrap();

        let records = read_generator_records(&file_path, &ColumnMapper::new(&config)).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["fuel"], "WIND");
        assert_eq!(record["capacity_unit"], "MW");
        assert_eq!(record["year"], "2030");
        assert!(!record.contains_key("prime_mover"));
    }

    #[rstest]
    fn test_read_generator_records_bad_header(config: Configuration) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators.csv");
        fs::write(&file_path, "name,colour\nplant,blue\n").unwrap();
        assert_error!(
            read_generator_records(&file_path, &ColumnMapper::new(&config)),
            input_err_msg(&file_path)
        );
    }

    #[rstest]
    fn test_read_generator_records_empty(config: Configuration) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators.csv");
        fs::write(&file_path, "fuel,capacity\n").unwrap();
        assert!(read_generator_records(&file_path, &ColumnMapper::new(&config)).is_err());
    }
}
