/// Defaults and environment variable names shared by the config layer and the CLI

pub const DEFAULT_INPUT: &str = "dataset.csv";
pub const DEFAULT_DATABASE: &str = "usage.db";
pub const DEFAULT_CONFIG_FILE: &str = "usage_etl.toml";
pub const DEFAULT_DELIMITER: char = ',';

// Environment overrides
pub const ENV_INPUT: &str = "USAGE_ETL_INPUT";
pub const ENV_DATABASE: &str = "USAGE_ETL_DATABASE";
pub const ENV_DELIMITER: &str = "USAGE_ETL_DELIMITER";
pub const ENV_RUN_DATE: &str = "USAGE_ETL_RUN_DATE";
pub const ENV_LOAD_FAILS: &str = "USAGE_ETL_LOAD_FAILS";

/// Cell values treated as null in addition to blank cells
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// Date format used for the run date on the command line and in config
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";
