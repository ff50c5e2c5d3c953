//! Integration tests for the `translate` command.
use r2x::cli::{TranslateOpts, TranslateSummary, handle_translate_command, translate};
use r2x::log::is_logger_initialised;
use r2x::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const CONFIG_PATH: &str = "tests/data/config.toml";
const GENERATORS_PATH: &str = "tests/data/generators.csv";
const OVERRIDES_PATH: &str = "tests/data/overrides.json";

fn read_output(summary: &TranslateSummary) -> String {
    fs::read_to_string(&summary.output_file).unwrap()
}

/// An integration test for the `translate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_translate_command() {
    unsafe { std::env::set_var("R2X_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    // Save results to non-existent directory to check that directory creation works
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("results");
    let opts = TranslateOpts {
        output_dir: Some(output_dir.clone()),
        ..Default::default()
    };
    handle_translate_command(
        Path::new(CONFIG_PATH),
        Path::new(GENERATORS_PATH),
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    assert!(is_logger_initialised());
    assert!(output_dir.join("resolved_generators.csv").is_file());
    assert!(output_dir.join("r2x_info.log").is_file());
}

#[test]
fn test_translate() {
    let dir = tempdir().unwrap();
    let summary = translate(
        Path::new(CONFIG_PATH),
        None,
        Path::new(GENERATORS_PATH),
        dir.path(),
        false,
    )
    .unwrap();

    assert_eq!(summary.resolved, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        read_output(&summary),
        "region,year,fuel,prime_mover,model_class,capacity,SPINNING,FLEXIBILITY,REGULATION\n\
        p1,2030,NATURAL_GAS,CC,ThermalStandard,250,0.1,0,0.05\n\
        p1,2030,solar,PV,RenewableDispatch,100,0,0.04,0\n\
        p2,2030,WIND,,RenewableDispatch,80,0,0.1,0.02\n\
        p2,2030,STORAGE,,GenericBattery,50,0.1,0,0.05\n"
    );
}

#[test]
fn test_translate_with_overrides() {
    let dir = tempdir().unwrap();
    let summary = translate(
        Path::new(CONFIG_PATH),
        Some(Path::new(OVERRIDES_PATH)),
        Path::new(GENERATORS_PATH),
        dir.path(),
        false,
    )
    .unwrap();

    // Reserves are mutually exclusive, so each generator contributes to at most one
    assert_eq!(
        read_output(&summary),
        "region,year,fuel,prime_mover,model_class,capacity,SPINNING,FLEXIBILITY,REGULATION\n\
        p1,2030,NATURAL_GAS,CC,ThermalStandard,250,0,0,0.05\n\
        p1,2030,solar,PV,RenewableDispatch,100,0,0.04,0\n\
        p2,2030,WIND,,RenewableDispatch,80,0,0.15,0\n\
        p2,2030,STORAGE,,GenericBattery,50,0,0,0.05\n"
    );
}

#[test]
fn test_translate_strict() {
    let dir = tempdir().unwrap();
    let result = translate(
        Path::new(CONFIG_PATH),
        None,
        Path::new(GENERATORS_PATH),
        dir.path(),
        true,
    );
    assert_eq!(
        result.unwrap_err().to_string(),
        format!("Failed to resolve row 6 of {GENERATORS_PATH}")
    );
    assert!(!dir.path().join("resolved_generators.csv").exists());
}

#[test]
fn test_translate_bad_config() {
    let dir = tempdir().unwrap();
    let config_path: PathBuf = dir.path().join("config.toml");
    fs::write(&config_path, "valid_headers = []\n").unwrap();
    let result = translate(
        &config_path,
        None,
        Path::new(GENERATORS_PATH),
        dir.path(),
        false,
    );
    assert_eq!(
        result.unwrap_err().to_string(),
        "Failed to load configuration."
    );
}
