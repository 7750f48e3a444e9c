//! ECOSTRESS granule names, L2T STARS granule archives and granule lookup

use crate::constants::DEFAULT_COLLECTION;
use crate::io::filenames::ensure_parent_directory;
use crate::types::{StarsError, StarsLayer, StarsResult};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

fn granule_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^ECOv(?P<collection>\d{3})_(?P<product>L2T_[A-Z]+)_(?:(?P<orbit>\d{5})_(?P<scene>\d{3})_)?(?P<tile>\d{2}[A-Z]{3})_(?P<date>\d{8})(?:T(?P<time>\d{6}))?_(?P<build>\d{4})_(?P<iteration>\d{2})$",
        )
        .expect("granule pattern is a valid regex")
    })
}

/// Parsed ECOSTRESS tiled granule name
///
/// `ECOv002_L2T_LSTE_35820_012_11SPS_20241030T174217_0713_01` or
/// `ECOv003_L2T_STARS_11SPS_20241029_0700_01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleId {
    pub collection: u8,
    pub product: String,
    pub orbit: Option<u32>,
    pub scene: Option<u32>,
    pub tile: String,
    pub date_utc: NaiveDate,
    pub time_utc: Option<NaiveDateTime>,
    pub build: String,
    pub iteration: u32,
}

impl GranuleId {
    /// Identifier of the L2T STARS granule produced for a tile and date
    pub fn l2t_stars(tile: &str, date_utc: NaiveDate, build: &str, product_counter: u32) -> Self {
        Self {
            collection: DEFAULT_COLLECTION,
            product: "L2T_STARS".to_string(),
            orbit: None,
            scene: None,
            tile: tile.to_string(),
            date_utc,
            time_utc: None,
            build: build.to_string(),
            iteration: product_counter,
        }
    }

    pub fn parse(name: &str) -> StarsResult<Self> {
        let caps = granule_pattern()
            .captures(name)
            .ok_or_else(|| StarsError::InvalidGranule(name.to_string()))?;

        let invalid = || StarsError::InvalidGranule(name.to_string());
        let number = |key: &str| -> StarsResult<Option<u32>> {
            caps.name(key)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| invalid()))
                .transpose()
        };

        let date_utc = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d").map_err(|_| invalid())?;
        let time_utc = match caps.name("time") {
            Some(time) => Some(
                NaiveDateTime::parse_from_str(
                    &format!("{}T{}", &caps["date"], time.as_str()),
                    "%Y%m%dT%H%M%S",
                )
                .map_err(|_| invalid())?,
            ),
            None => None,
        };

        Ok(Self {
            collection: caps["collection"].parse().map_err(|_| invalid())?,
            product: caps["product"].to_string(),
            orbit: number("orbit")?,
            scene: number("scene")?,
            tile: caps["tile"].to_string(),
            date_utc,
            time_utc,
            build: caps["build"].to_string(),
            iteration: number("iteration")?.unwrap_or(1),
        })
    }

    /// Parse the granule name from a product path, ignoring directories and extensions
    pub fn from_path<P: AsRef<Path>>(path: P) -> StarsResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StarsError::InvalidGranule(path.display().to_string()))?;
        let stem = name.split('.').next().unwrap_or(name);
        Self::parse(stem)
    }

    pub fn is_product(&self, product: &str) -> bool {
        self.product == product
    }
}

impl std::fmt::Display for GranuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ECOv{:03}_{}_", self.collection, self.product)?;
        if let (Some(orbit), Some(scene)) = (self.orbit, self.scene) {
            write!(f, "{:05}_{:03}_", orbit, scene)?;
        }
        write!(f, "{}_", self.tile)?;
        match self.time_utc {
            Some(time) => write!(f, "{}", time.format("%Y%m%dT%H%M%S"))?,
            None => write!(f, "{}", self.date_utc.format("%Y%m%d"))?,
        }
        write!(f, "_{}_{:02}", self.build, self.iteration)
    }
}

/// Reader for a packaged L2T STARS granule (zip archive of GeoTIFF layers)
pub struct StarsArchive {
    path: PathBuf,
    id: GranuleId,
    archive: ZipArchive<File>,
}

impl StarsArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> StarsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let id = GranuleId::from_path(&path)?;
        if !id.is_product("L2T_STARS") {
            return Err(StarsError::InvalidGranule(format!(
                "{} is a {} granule, expected L2T_STARS",
                path.display(),
                id.product
            )));
        }

        let file = File::open(&path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| StarsError::Archive(format!("Failed to open {}: {}", path.display(), e)))?;

        Ok(Self { path, id, archive })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn granule_id(&self) -> &GranuleId {
        &self.id
    }

    pub fn tile(&self) -> &str {
        &self.id.tile
    }

    pub fn date_utc(&self) -> NaiveDate {
        self.id.date_utc
    }

    pub fn list_files(&mut self) -> StarsResult<Vec<String>> {
        let mut files = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index(i)
                .map_err(|e| StarsError::Archive(format!("Failed to access entry {}: {}", i, e)))?;
            files.push(file.name().to_string());
        }
        Ok(files)
    }

    /// Archive member holding `layer`, if the granule carries it
    pub fn find_layer(&mut self, layer: StarsLayer) -> StarsResult<Option<String>> {
        let suffix = format!("_{}.tif", layer.archive_suffix());
        Ok(self
            .list_files()?
            .into_iter()
            .find(|name| name.ends_with(&suffix)))
    }

    /// Copy `layer` out of the archive to `destination`
    ///
    /// Returns `false` when the granule does not carry the layer. The file is
    /// written under a temporary name and renamed into place.
    pub fn extract_layer<P: AsRef<Path>>(&mut self, layer: StarsLayer, destination: P) -> StarsResult<bool> {
        let member = match self.find_layer(layer)? {
            Some(member) => member,
            None => return Ok(false),
        };
        let destination = destination.as_ref();
        ensure_parent_directory(destination)?;

        let parent = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        {
            let mut entry = self
                .archive
                .by_name(&member)
                .map_err(|e| StarsError::Archive(format!("Failed to read {}: {}", member, e)))?;
            std::io::copy(&mut entry, staged.as_file_mut())?;
        }
        staged.persist(destination).map_err(|e| StarsError::Io(e.error))?;

        log::debug!("Extracted {} to {}", member, destination.display());
        Ok(true)
    }

    /// Raw bytes of an archive member
    pub fn read_member(&mut self, member: &str) -> StarsResult<Vec<u8>> {
        let mut entry = self
            .archive
            .by_name(member)
            .map_err(|e| StarsError::Archive(format!("Failed to read {}: {}", member, e)))?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Write a granule archive `{output_directory}/{id}.zip` holding the given layers
///
/// Members are named `{id}/{id}_{suffix}.tif`, the layout [`StarsArchive`] reads.
pub fn package_granule<P: AsRef<Path>>(
    output_directory: P,
    id: &GranuleId,
    layers: &[(StarsLayer, PathBuf)],
) -> StarsResult<PathBuf> {
    let output_directory = output_directory.as_ref();
    std::fs::create_dir_all(output_directory)?;
    let archive_path = output_directory.join(format!("{}.zip", id));

    let staged = tempfile::NamedTempFile::new_in(output_directory)?;
    let mut writer = ZipWriter::new(staged);
    let options = FileOptions::default();

    for (layer, source) in layers {
        let member = format!("{id}/{id}_{}.tif", layer.archive_suffix(), id = id);
        writer
            .start_file(member.as_str(), options)
            .map_err(|e| StarsError::Archive(format!("Failed to add {}: {}", member, e)))?;
        let mut input = File::open(source)?;
        std::io::copy(&mut input, &mut writer)?;
    }

    let mut staged = writer
        .finish()
        .map_err(|e| StarsError::Archive(format!("Failed to finish {}: {}", archive_path.display(), e)))?;
    staged.flush()?;
    staged.persist(&archive_path).map_err(|e| StarsError::Io(e.error))?;

    log::info!("Wrote granule {} ({} layers)", archive_path.display(), layers.len());
    Ok(archive_path)
}

/// A granule available on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granule {
    pub id: GranuleId,
    pub product_filename: PathBuf,
}

/// What to fetch from the granule download service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleQuery {
    pub product: String,
    pub tile: String,
    pub acquisition_date: NaiveDate,
    pub orbit: Option<u32>,
    pub scene: Option<u32>,
}

/// Source of ECOSTRESS granules (the CMR download service lives outside this crate)
pub trait GranuleDownloader {
    fn download_granule(&self, query: &GranuleQuery, parent_directory: &Path) -> StarsResult<Granule>;
}

/// Serves granules already present in a local directory tree
#[derive(Debug, Clone)]
pub struct LocalGranuleDirectory {
    root: PathBuf,
}

impl LocalGranuleDirectory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn matches(id: &GranuleId, query: &GranuleQuery) -> bool {
        id.product == query.product
            && id.tile == query.tile
            && id.date_utc == query.acquisition_date
            && query.orbit.map_or(true, |orbit| id.orbit == Some(orbit))
            && query.scene.map_or(true, |scene| id.scene == Some(scene))
    }
}

impl GranuleDownloader for LocalGranuleDirectory {
    fn download_granule(&self, query: &GranuleQuery, parent_directory: &Path) -> StarsResult<Granule> {
        for directory in [parent_directory, self.root.as_path()] {
            let entries = match std::fs::read_dir(directory) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            let mut found: Vec<Granule> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter_map(|path| {
                    let id = GranuleId::from_path(&path).ok()?;
                    Self::matches(&id, query).then_some(Granule { id, product_filename: path })
                })
                .collect();
            // highest build and iteration wins
            found.sort_by(|a, b| (&a.id.build, a.id.iteration).cmp(&(&b.id.build, b.id.iteration)));
            if let Some(granule) = found.pop() {
                log::info!("Found {} at {}", granule.id, granule.product_filename.display());
                return Ok(granule);
            }
        }

        Err(StarsError::InputFilesInaccessible(format!(
            "no {} granule for tile {} on {} under {}",
            query.product,
            query.tile,
            query.acquisition_date,
            self.root.display()
        )))
    }
}
