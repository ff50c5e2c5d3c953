//! The module responsible for writing output data to disk.
use crate::config::Configuration;
use crate::generator::ResolvedGenerator;
use anyhow::{Context, Result};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "r2x_results";

/// The output file name for resolved generators
pub const RESOLVED_GENERATORS_FILE_NAME: &str = "resolved_generators.csv";

/// Columns which precede the reserve columns in the output file
const FIXED_COLUMNS: [&str; 6] = [
    "region",
    "year",
    "fuel",
    "prime_mover",
    "model_class",
    "capacity",
];

/// Get the default output directory for the generator file at `input_path`
pub fn get_output_dir(input_path: &Path) -> Result<PathBuf> {
    let name = input_path
        .file_stem()
        .context("Input path has no file name")?
        .to_str()
        .context("Invalid chars in input file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, name].iter().collect())
}

/// Create a new output directory, if it does not already exist.
///
/// Returns `true` if the directory already existed and will be overwritten. An existing,
/// non-empty directory is an error unless `allow_overwrite` is set.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Directory exists and is empty: nothing to do
            return Ok(false);
        }

        anyhow::ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please specify --overwrite to \
            overwrite it."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write resolved generators to `resolved_generators.csv` in `output_dir`.
///
/// There is one column for each reserve type known to `config`, giving the fraction of the
/// generator's capacity contributed to that reserve.
pub fn write_resolved_generators(
    output_dir: &Path,
    config: &Configuration,
    generators: &[ResolvedGenerator],
) -> Result<PathBuf> {
    let file_path = output_dir.join(RESOLVED_GENERATORS_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;

    let reserve_types = config.reserve_types().collect_vec();
    let header = FIXED_COLUMNS
        .iter()
        .map(ToString::to_string)
        .chain(reserve_types.iter().map(ToString::to_string));
    writer.write_record(header)?;

    for generator in generators {
        let descriptor = &generator.descriptor;
        let row = [
            descriptor.region.to_string(),
            descriptor.year.to_string(),
            descriptor.fuel.clone().unwrap_or_default(),
            descriptor.prime_mover.clone().unwrap_or_default(),
            generator.model_class.to_string(),
            descriptor.capacity.to_string(),
        ]
        .into_iter()
        .chain(
            reserve_types
                .iter()
                .map(|reserve| generator.reserves.get(*reserve).to_string()),
        );
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{config, descriptor};
    use crate::resolve::Resolver;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_get_output_dir() {
        assert_eq!(
            get_output_dir(Path::new("data/generators.csv")).unwrap(),
            Path::new("r2x_results/generators")
        );
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        let result = create_output_directory(&output_dir, false).unwrap();
        assert!(!result);
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&output_dir).unwrap();
        assert!(!create_output_directory(&output_dir, false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing_with_files() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("file.txt"), "contents").unwrap();

        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(output_dir.join("file.txt").exists());

        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(output_dir.is_dir());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[rstest]
    fn test_write_resolved_generators(config: Configuration) {
        let resolver = Resolver::new(&config);
        let generators = [
            resolver
                .resolve(descriptor(Some("NATURAL_GAS"), Some("CC")))
                .unwrap(),
            resolver.resolve(descriptor(Some("WIND"), None)).unwrap(),
        ];

        let dir = tempdir().unwrap();
        let file_path = write_resolved_generators(dir.path(), &config, &generators).unwrap();
        let contents = fs::read_to_string(file_path).unwrap();
        assert_eq!(
            contents,
            "region,year,fuel,prime_mover,model_class,capacity,SPINNING,FLEXIBILITY,REGULATION\n\
            p1,2030,NATURAL_GAS,CC,ThermalStandard,100,0.1,0,0.05\n\
            p1,2030,WIND,,RenewableDispatch,100,0,0.1,0.02\n"
        );
    }
}
