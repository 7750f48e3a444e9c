//! Canonical file and directory layout for L2T STARS inputs, model state and outputs
//!
//! Every function here is pure: the same arguments always give the same path and
//! nothing touches the filesystem. Callers that intend to write at a derived path
//! create its parent with [`ensure_parent_directory`].

use crate::daterange::DateArg;
use crate::types::{StarsError, StarsResult};
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn check_cell_size(cell_size: u32) -> StarsResult<()> {
    if cell_size == 0 {
        return Err(StarsError::InvalidArgument(
            "cell size must be a positive number of meters".to_string(),
        ));
    }
    Ok(())
}

/// `{directory}/{YYYY}/{YYYY-MM-DD}/{tile}`
fn dated_tile_directory(directory: &Path, date: NaiveDate, tile: &str) -> PathBuf {
    directory
        .join(date.year().to_string())
        .join(iso(date))
        .join(tile)
}

/// Path of a fused STARS raster for one variable, date and tile
pub fn generate_filename<P: AsRef<Path>, D: DateArg>(
    directory: P,
    variable: &str,
    date_utc: D,
    tile: &str,
    cell_size: u32,
) -> StarsResult<PathBuf> {
    check_cell_size(cell_size)?;
    let date = date_utc.to_date()?;
    let filename = format!("STARS_{}_{}_{}m.tif", variable, tile, cell_size);

    Ok(dated_tile_directory(directory.as_ref(), date, tile).join(filename))
}

/// Path of a source raster resampled to the coarse or fine grid
pub fn generate_downsampled_filename<P: AsRef<Path>, D: DateArg>(
    directory: P,
    variable: &str,
    date_utc: D,
    tile: &str,
    cell_size: u32,
) -> StarsResult<PathBuf> {
    check_cell_size(cell_size)?;
    let date = date_utc.to_date()?;
    let filename = format!("{}_{}_{}m.tif", variable, tile, cell_size);

    Ok(dated_tile_directory(directory.as_ref(), date, tile).join(filename))
}

/// Directory holding the fusion model state for one tile and date
pub fn generate_model_state_tile_date_directory<P: AsRef<Path>, D: DateArg>(
    model_directory: P,
    tile: &str,
    date_utc: D,
) -> StarsResult<PathBuf> {
    let date = date_utc.to_date()?;
    Ok(model_directory.as_ref().join(tile).join(iso(date)))
}

/// Path of one model-state raster (posterior of this run, prior of the next)
pub fn generate_model_state_filename<P: AsRef<Path>, D: DateArg>(
    model_directory: P,
    variable: &str,
    date_utc: D,
    tile: &str,
    cell_size: u32,
) -> StarsResult<PathBuf> {
    check_cell_size(cell_size)?;
    let directory = generate_model_state_tile_date_directory(model_directory, tile, date_utc)?;
    Ok(directory.join(format!("STARS_{}_{}_{}m.tif", variable, tile, cell_size)))
}

/// Directory receiving the packaged granule for one tile and date
pub fn generate_output_directory<P: AsRef<Path>, D: DateArg>(
    working_directory: P,
    date_utc: D,
    tile: &str,
) -> StarsResult<PathBuf> {
    let date = date_utc.to_date()?;
    Ok(working_directory.as_ref().join(iso(date)).join(tile))
}

/// Directory where granules of one source (e.g. HLS, VIIRS) are staged
pub fn generate_input_staging_directory<P: AsRef<Path>, D: DateArg>(
    sources_directory: P,
    tile: &str,
    date_utc: D,
    source: &str,
) -> StarsResult<PathBuf> {
    let date = date_utc.to_date()?;
    Ok(sources_directory
        .as_ref()
        .join(source)
        .join(tile)
        .join(iso(date)))
}

/// Coarse and fine input directories the toolchain scans for one product
pub fn generate_fusion_input_directories<P: AsRef<Path>>(
    downsampled_directory: P,
    product_name: &str,
) -> (PathBuf, PathBuf) {
    let base = downsampled_directory.as_ref().join(product_name);
    (base.join("coarse"), base.join("fine"))
}

/// Create the parent directory of `path` if it does not exist yet
pub fn ensure_parent_directory<P: AsRef<Path>>(path: P) -> StarsResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Expand a leading `~` to the user's home directory
pub fn expand_user<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_layout() {
        let path = generate_filename("/data/out", "NDVI", "2024-10-30", "11SPS", 70).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/out/2024/2024-10-30/11SPS/STARS_NDVI_11SPS_70m.tif")
        );
    }

    #[test]
    fn test_zero_cell_size_rejected() {
        assert!(generate_filename("/data", "NDVI", "2024-10-30", "11SPS", 0).is_err());
    }

    #[test]
    fn test_model_state_filename_sits_in_state_directory() {
        let directory =
            generate_model_state_tile_date_directory("/model", "11SPS", "2024-10-29").unwrap();
        let filename =
            generate_model_state_filename("/model", "NDVI.UQ", "2024-10-29", "11SPS", 70).unwrap();
        assert_eq!(directory, PathBuf::from("/model/11SPS/2024-10-29"));
        assert_eq!(filename.parent().unwrap(), directory);
    }

    #[test]
    fn test_expand_user_leaves_absolute_paths() {
        assert_eq!(expand_user("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
