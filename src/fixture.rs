//! Fixtures for tests
use crate::config::Configuration;
use crate::generator::GeneratorDescriptor;
use crate::units::ActivePower;
use rstest::fixture;
use serde_json::{Value, json};

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A configuration document covering every section
#[fixture]
pub fn config_value() -> Value {
    json!({
        "generator_models": {
            "ThermalStandard": [
                {"fuel": "NATURAL_GAS", "type": "CC"},
                {"fuel": "NATURAL_GAS", "type": "GT"},
                {"fuel": "COAL", "type": null},
                {"fuel": "NUCLEAR", "type": "ST"}
            ],
            "RenewableDispatch": [
                {"fuel": "SOLAR", "type": "PV"},
                {"fuel": "WIND", "type": null}
            ],
            "RenewableNonDispatch": [
                {"fuel": "SOLAR", "type": "RTPV"}
            ],
            "HydroDispatch": [
                {"fuel": "WATER", "type": "HY"}
            ],
            "HydroPumpedStorage": [
                {"fuel": "WATER", "type": "PS"}
            ],
            "GenericBattery": [
                {"fuel": "STORAGE", "type": null},
                {"fuel": null, "type": "BA"}
            ]
        },
        "load_reserves": {"SPINNING": 0.1, "REGULATION": 0.05},
        "wind_reserves": {"FLEXIBILITY": 0.1, "REGULATION": 0.02},
        "solar_reserves": {"FLEXIBILITY": 0.04},
        "reserve_duration": {"SPINNING": 3600.0, "FLEXIBILITY": 3600.0, "REGULATION": 300.0},
        "reserve_time_frame": {"SPINNING": 600.0, "FLEXIBILITY": 3600.0, "REGULATION": 300.0},
        "reserve_vors": {"SPINNING": 1000.0, "FLEXIBILITY": 500.0, "REGULATION": 1200.0},
        "reserve_load_risk": {"SPINNING": 6, "FLEXIBILITY": 0, "REGULATION": 2},
        "reserve_is_enabled": 0,
        "reserve_mutually_exclusive": false,
        "reserve_ineligible_models": ["RenewableNonDispatch"],
        "unit_map": {
            "MW": "ActivePower",
            "MWh": "Energy",
            "$/MWh": "FuelPrice",
            "%": "Percentage",
            "h": "Time",
            "MMBtu/MWh": "HeatRate"
        },
        "default_column_mapping": {
            "fueltype": "fuel",
            "*i": "fuel",
            "pm": "prime_mover",
            "type": "prime_mover",
            "cap": "capacity",
            "units": "capacity_unit",
            "r": "region",
            "*r": "region",
            "t": "year",
            "allt": "year"
        },
        "valid_headers": [
            "fuel",
            "prime_mover",
            "capacity",
            "capacity_unit",
            "region",
            "year",
            "name",
            "heat_rate"
        ]
    })
}

#[fixture]
pub fn config(config_value: Value) -> Configuration {
    Configuration::load(config_value).unwrap()
}

/// A 100 MW generator in region p1 for 2030
pub fn descriptor(fuel: Option<&str>, prime_mover: Option<&str>) -> GeneratorDescriptor {
    GeneratorDescriptor::new(fuel, prime_mover, ActivePower(100.0), "p1".into(), 2030)
}
