//! Shared fixtures for unit tests

use crate::config::ImportConfig;
use crate::run::RunContext;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const TEST_CONFIG: &str = include_str!("../tests/fixtures/test_config.yaml");

pub fn sample_config() -> ImportConfig {
    ImportConfig::from_yaml(TEST_CONFIG).unwrap()
}

pub fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

pub fn sample_run(config: &ImportConfig) -> RunContext {
    RunContext::new(config, sample_date(), BTreeMap::new())
}
