//! Product-wide constants for L2T STARS

/// Output cell size of the fused product, in meters
pub const TARGET_RESOLUTION: u32 = 70;

/// Coarse VIIRS NDVI cell size, in meters
pub const NDVI_RESOLUTION: u32 = 490;

/// Coarse VIIRS albedo cell size, in meters
pub const ALBEDO_RESOLUTION: u32 = 980;

/// Days of source observations required before the target date
pub const SPINUP_DAYS: i64 = 7;

pub const WORKING_DIRECTORY: &str = ".";
pub const STARS_SOURCES_DIRECTORY: &str = "L2T_STARS_SOURCES";
pub const STARS_INDICES_DIRECTORY: &str = "L2T_STARS_INDICES";
pub const STARS_MODEL_DIRECTORY: &str = "L2T_STARS_MODEL";
pub const DOWNSAMPLED_DIRECTORY: &str = "downsampled";
pub const RUNCONFIG_DIRECTORY: &str = "runconfig";
pub const OUTPUT_DIRECTORY: &str = "output";

pub const L2T_STARS_SHORT_NAME: &str = "ECO_L2T_STARS";
pub const L2T_STARS_LONG_NAME: &str =
    "ECOSTRESS Tiled Ancillary NDVI and Albedo L2 Global 70 m";

pub const PGE_NAME: &str = "L2T_STARS";
pub const DEFAULT_BUILD: &str = "0700";
pub const DEFAULT_PRODUCT_COUNTER: u32 = 1;
pub const DEFAULT_COLLECTION: u8 = 3;

/// Environment variables that point the subprocess at the host's GDAL install
pub const GDAL_CONFLICT_VARIABLES: [&str; 2] = ["GDAL_DATA", "GDAL_DRIVER_PATH"];

/// Environment variable carrying the Julia thread count
pub const THREADS_VARIABLE: &str = "JULIA_NUM_THREADS";

pub const DEFAULT_NUM_WORKERS: usize = 4;
