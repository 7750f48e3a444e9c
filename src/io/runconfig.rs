//! PGE run-config XML: generation and parsing

use crate::constants::{
    DEFAULT_BUILD, DEFAULT_PRODUCT_COUNTER, OUTPUT_DIRECTORY, PGE_NAME, RUNCONFIG_DIRECTORY,
    STARS_INDICES_DIRECTORY, STARS_MODEL_DIRECTORY, STARS_SOURCES_DIRECTORY,
};
use crate::io::filenames::{ensure_parent_directory, expand_user};
use crate::io::granule::{GranuleDownloader, GranuleId, GranuleQuery};
use crate::types::{StarsError, StarsResult};
use chrono::{NaiveDate, Utc};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root `<input>` element of a PGE run-config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "input")]
pub struct RunConfigDocument {
    #[serde(rename = "group", default)]
    pub groups: Vec<RunConfigGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfigGroup {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "scalar", default)]
    pub scalars: Vec<RunConfigScalar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfigScalar {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl RunConfigDocument {
    pub fn parse(xml_content: &str) -> StarsResult<Self> {
        from_str::<RunConfigDocument>(xml_content)
            .map_err(|e| StarsError::XmlParsing(format!("Failed to parse run-config XML: {}", e)))
    }

    pub fn to_xml(&self) -> StarsResult<String> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 4);
        self.serialize(serializer)
            .map_err(|e| StarsError::XmlParsing(format!("Failed to write run-config XML: {}", e)))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", body))
    }

    /// Append a scalar, creating its group on first use
    pub fn set(&mut self, group: &str, name: &str, value: impl Into<String>) {
        let scalar = RunConfigScalar {
            name: name.to_string(),
            value: value.into(),
        };
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.scalars.push(scalar),
            None => self.groups.push(RunConfigGroup {
                name: group.to_string(),
                scalars: vec![scalar],
            }),
        }
    }

    pub fn get(&self, group: &str, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .filter(|g| g.name == group)
            .flat_map(|g| g.scalars.iter())
            .find(|s| s.name == name)
            .map(|s| s.value.trim())
    }

    /// Value of a scalar that must be present and non-empty
    pub fn require(&self, group: &str, name: &str) -> StarsResult<&str> {
        match self.get(group, name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StarsError::MissingRunconfigField {
                group: group.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

/// Inputs for writing an L2T STARS run-config
#[derive(Debug, Clone)]
pub struct RunConfigRequest {
    pub l2t_lste_filename: PathBuf,
    pub prior_l2t_stars_filename: Option<PathBuf>,
    pub working_directory: PathBuf,
    pub sources_directory: Option<PathBuf>,
    pub indices_directory: Option<PathBuf>,
    pub model_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub runconfig_filename: Option<PathBuf>,
    pub build: String,
    pub product_counter: u32,
}

impl RunConfigRequest {
    pub fn new<P: Into<PathBuf>, W: Into<PathBuf>>(l2t_lste_filename: P, working_directory: W) -> Self {
        Self {
            l2t_lste_filename: l2t_lste_filename.into(),
            prior_l2t_stars_filename: None,
            working_directory: working_directory.into(),
            sources_directory: None,
            indices_directory: None,
            model_directory: None,
            output_directory: None,
            runconfig_filename: None,
            build: DEFAULT_BUILD.to_string(),
            product_counter: DEFAULT_PRODUCT_COUNTER,
        }
    }

    pub fn with_prior<P: Into<PathBuf>>(mut self, prior_l2t_stars_filename: P) -> Self {
        self.prior_l2t_stars_filename = Some(prior_l2t_stars_filename.into());
        self
    }
}

fn absolute(path: &Path) -> PathBuf {
    let expanded = expand_user(path);
    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Write the run-config for one L2T_LSTE granule and return its path
///
/// An existing run-config at the target path is reused as-is.
pub fn generate_runconfig(request: &RunConfigRequest) -> StarsResult<PathBuf> {
    let lste_filename = absolute(&request.l2t_lste_filename);
    if !lste_filename.exists() {
        return Err(StarsError::InputFilesInaccessible(format!(
            "L2T_LSTE file not found: {}",
            lste_filename.display()
        )));
    }
    let lste_id = GranuleId::from_path(&lste_filename)?;
    let granule_id = GranuleId::l2t_stars(&lste_id.tile, lste_id.date_utc, &request.build, request.product_counter);

    let working_directory = absolute(&request.working_directory);
    let resolve = |given: &Option<PathBuf>, default: &str| match given {
        Some(path) => absolute(path),
        None => working_directory.join(default),
    };
    let sources_directory = resolve(&request.sources_directory, STARS_SOURCES_DIRECTORY);
    let indices_directory = resolve(&request.indices_directory, STARS_INDICES_DIRECTORY);
    let model_directory = resolve(&request.model_directory, STARS_MODEL_DIRECTORY);
    let output_directory = resolve(&request.output_directory, OUTPUT_DIRECTORY);

    let runconfig_filename = match &request.runconfig_filename {
        Some(path) => absolute(path),
        None => working_directory
            .join(RUNCONFIG_DIRECTORY)
            .join(format!("{}.xml", granule_id)),
    };

    if runconfig_filename.exists() {
        log::info!("run-config already exists: {}", runconfig_filename.display());
        return Ok(runconfig_filename);
    }

    log::info!("generating run-config for {}: {}", granule_id, runconfig_filename.display());

    let mut document = RunConfigDocument::default();
    document.set("PGENameGroup", "PGEName", PGE_NAME);
    document.set("PGENameGroup", "PGEVersion", crate::VERSION);
    document.set("StaticAncillaryFileGroup", "L2T_STARS_WORKING", path_value(&working_directory));
    document.set("StaticAncillaryFileGroup", "L2T_STARS_SOURCES", path_value(&sources_directory));
    document.set("StaticAncillaryFileGroup", "L2T_STARS_INDICES", path_value(&indices_directory));
    document.set("StaticAncillaryFileGroup", "L2T_STARS_MODEL", path_value(&model_directory));
    document.set("ProductPathGroup", "ProductPath", path_value(&output_directory));
    document.set("InputFileGroup", "L2T_LSTE", path_value(&lste_filename));
    if let Some(prior) = &request.prior_l2t_stars_filename {
        document.set("InputFileGroup", "L2T_STARS_PRIOR", path_value(&absolute(prior)));
    }
    document.set("Geometry", "LandTile", lste_id.tile.clone());
    document.set(
        "ProductionDateTime",
        "ProductionDateTime",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    );
    document.set("JobIdentification", "BuildID", request.build.clone());
    document.set("JobIdentification", "ProductCounter", request.product_counter.to_string());

    ensure_parent_directory(&runconfig_filename)?;
    std::fs::write(&runconfig_filename, document.to_xml()?)?;

    Ok(runconfig_filename)
}

/// Fetch the L2T_LSTE granule (and optionally a prior L2T STARS granule), then write the run-config
pub fn generate_runconfig_with_download<D: GranuleDownloader>(
    downloader: &D,
    lste_query: &GranuleQuery,
    prior_query: Option<&GranuleQuery>,
    working_directory: &Path,
) -> StarsResult<PathBuf> {
    let lste = downloader.download_granule(lste_query, working_directory)?;
    let mut request = RunConfigRequest::new(lste.product_filename, working_directory);

    if let Some(query) = prior_query {
        match downloader.download_granule(query, working_directory) {
            Ok(prior) => request = request.with_prior(prior.product_filename),
            Err(e) => log::warn!("no prior L2T STARS granule available: {}", e),
        }
    }

    generate_runconfig(&request)
}

/// Parsed L2T STARS run-config
#[derive(Debug, Clone, PartialEq)]
pub struct L2TSTARSConfig {
    pub runconfig_filename: PathBuf,
    pub working_directory: PathBuf,
    pub sources_directory: PathBuf,
    pub indices_directory: PathBuf,
    pub model_directory: PathBuf,
    pub output_directory: PathBuf,
    pub l2t_lste_filename: PathBuf,
    pub l2t_stars_prior_filename: Option<PathBuf>,
    pub tile: String,
    pub date_utc: NaiveDate,
    pub build: String,
    pub product_counter: u32,
    pub granule_id: GranuleId,
}

impl L2TSTARSConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> StarsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StarsError::MissingRunconfigFile(path.to_path_buf()));
        }
        log::info!("Reading run-config: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_document(&RunConfigDocument::parse(&content)?, path)
    }

    pub fn from_document(document: &RunConfigDocument, runconfig_filename: &Path) -> StarsResult<Self> {
        let path = |group: &str, name: &str| -> StarsResult<PathBuf> {
            Ok(absolute(Path::new(document.require(group, name)?)))
        };

        let l2t_lste_filename = path("InputFileGroup", "L2T_LSTE")?;
        let l2t_stars_prior_filename = document
            .get("InputFileGroup", "L2T_STARS_PRIOR")
            .filter(|value| !value.is_empty())
            .map(|value| absolute(Path::new(value)));

        let lste_id = GranuleId::from_path(&l2t_lste_filename)?;
        let tile = match document.get("Geometry", "LandTile") {
            Some(tile) if !tile.is_empty() => tile.to_string(),
            _ => lste_id.tile.clone(),
        };
        if tile != lste_id.tile {
            log::warn!("run-config tile {} differs from L2T_LSTE tile {}", tile, lste_id.tile);
        }

        let build = document.require("JobIdentification", "BuildID")?.to_string();
        let product_counter = document
            .require("JobIdentification", "ProductCounter")?
            .parse::<u32>()
            .map_err(|e| StarsError::XmlParsing(format!("invalid ProductCounter: {}", e)))?;
        let granule_id = GranuleId::l2t_stars(&tile, lste_id.date_utc, &build, product_counter);

        Ok(Self {
            runconfig_filename: runconfig_filename.to_path_buf(),
            working_directory: path("StaticAncillaryFileGroup", "L2T_STARS_WORKING")?,
            sources_directory: path("StaticAncillaryFileGroup", "L2T_STARS_SOURCES")?,
            indices_directory: path("StaticAncillaryFileGroup", "L2T_STARS_INDICES")?,
            model_directory: path("StaticAncillaryFileGroup", "L2T_STARS_MODEL")?,
            output_directory: path("ProductPathGroup", "ProductPath")?,
            l2t_lste_filename,
            l2t_stars_prior_filename,
            tile,
            date_utc: lste_id.date_utc,
            build,
            product_counter,
            granule_id,
        })
    }

    /// Path of the packaged output granule
    pub fn l2t_stars_zip_filename(&self) -> PathBuf {
        self.output_directory.join(format!("{}.zip", self.granule_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_get_and_require() {
        let mut document = RunConfigDocument::default();
        document.set("Geometry", "LandTile", "11SPS");
        document.set("InputFileGroup", "L2T_STARS_PRIOR", "");

        assert_eq!(document.get("Geometry", "LandTile"), Some("11SPS"));
        assert!(document.get("Geometry", "Missing").is_none());
        assert!(matches!(
            document.require("InputFileGroup", "L2T_STARS_PRIOR"),
            Err(StarsError::MissingRunconfigField { .. })
        ));
    }

    #[test]
    fn test_parse_handwritten_runconfig() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<input>
    <group name="Geometry">
        <scalar name="LandTile">11SPS</scalar>
    </group>
    <group name="JobIdentification">
        <scalar name="BuildID">0700</scalar>
        <scalar name="ProductCounter">1</scalar>
    </group>
</input>"#;
        let document = RunConfigDocument::parse(xml).unwrap();
        assert_eq!(document.groups.len(), 2);
        assert_eq!(document.get("JobIdentification", "BuildID"), Some("0700"));
    }

    #[test]
    fn test_missing_lste_field() {
        let document = RunConfigDocument::default();
        let result = L2TSTARSConfig::from_document(&document, Path::new("runconfig.xml"));
        assert!(matches!(
            result,
            Err(StarsError::MissingRunconfigField { ref name, .. }) if name == "L2T_LSTE"
        ));
    }
}
