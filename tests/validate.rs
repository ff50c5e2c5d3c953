//! Integration tests for the `validate` command.
use r2x::cli::handle_validate_command;
use r2x::log::is_logger_initialised;
use r2x::settings::Settings;
use std::path::Path;

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("R2X_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(
        Path::new("tests/data/config.toml"),
        Some(Path::new("tests/data/overrides.json")),
        Some(Settings::default()),
    )
    .unwrap();

    assert!(is_logger_initialised());

    // Second time will fail because the logging is already initialised
    assert_eq!(
        handle_validate_command(
            Path::new("tests/data/config.toml"),
            None,
            Some(Settings::default())
        )
        .unwrap_err()
        .chain()
        .next()
        .unwrap()
        .to_string(),
        "Failed to initialise logging."
    );
}
