//! Prior resolution: reuse of the previous run's model state
//!
//! The fusion step is fed either the complete set of prior layers or nothing.
//! A partial prior would mix stale and fresh state, so any missing file makes
//! the resolver fall back to [`Prior::none`].

use crate::io::filenames::generate_model_state_filename;
use crate::io::granule::StarsArchive;
use crate::types::{LayerKind, StarsLayer, StarsResult, Variable};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// All-or-nothing view of a group of related optional values
///
/// Returns every value when all are present, `None` when any one is missing.
pub fn complete_group<T, const N: usize>(fields: [Option<T>; N]) -> Option<[T; N]> {
    let mut values = Vec::with_capacity(N);
    for field in fields {
        values.push(field?);
    }
    values.try_into().ok()
}

/// Value, uncertainty, flag, bias and bias-uncertainty rasters of one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePrior {
    pub value: PathBuf,
    pub uncertainty: PathBuf,
    pub flag: PathBuf,
    pub bias: PathBuf,
    pub bias_uncertainty: PathBuf,
}

impl VariablePrior {
    pub fn get(&self, kind: LayerKind) -> &Path {
        match kind {
            LayerKind::Value => &self.value,
            LayerKind::Uncertainty => &self.uncertainty,
            LayerKind::Flag => &self.flag,
            LayerKind::Bias => &self.bias,
            LayerKind::BiasUncertainty => &self.bias_uncertainty,
        }
    }

    fn from_array([value, uncertainty, flag, bias, bias_uncertainty]: [PathBuf; 5]) -> Self {
        Self {
            value,
            uncertainty,
            flag,
            bias,
            bias_uncertainty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorLayers {
    pub ndvi: VariablePrior,
    pub albedo: VariablePrior,
}

impl PriorLayers {
    pub fn variable(&self, variable: Variable) -> &VariablePrior {
        match variable {
            Variable::NDVI => &self.ndvi,
            Variable::Albedo => &self.albedo,
        }
    }

    pub fn get(&self, layer: StarsLayer) -> &Path {
        self.variable(layer.variable).get(layer.kind)
    }
}

/// Previous-run output used to seed the current fusion run
///
/// Either every layer path, the date and the archive are known (`using_prior`)
/// or none of them are.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prior {
    pub prior_date_utc: Option<NaiveDate>,
    pub l2t_stars_prior_filename: Option<PathBuf>,
    layers: Option<PriorLayers>,
}

impl Prior {
    /// The record used when no prior is available
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(prior_date_utc: NaiveDate, l2t_stars_prior_filename: PathBuf, layers: PriorLayers) -> Self {
        Self {
            prior_date_utc: Some(prior_date_utc),
            l2t_stars_prior_filename: Some(l2t_stars_prior_filename),
            layers: Some(layers),
        }
    }

    pub fn using_prior(&self) -> bool {
        self.layers.is_some()
    }

    pub fn layers(&self) -> Option<&PriorLayers> {
        self.layers.as_ref()
    }

    pub fn layer(&self, layer: StarsLayer) -> Option<&Path> {
        self.layers.as_ref().map(|layers| layers.get(layer))
    }

    pub fn prior_ndvi_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::NDVI, LayerKind::Value))
    }

    pub fn prior_ndvi_uq_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::NDVI, LayerKind::Uncertainty))
    }

    pub fn prior_ndvi_flag_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::NDVI, LayerKind::Flag))
    }

    pub fn prior_ndvi_bias_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::NDVI, LayerKind::Bias))
    }

    pub fn prior_ndvi_bias_uq_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::NDVI, LayerKind::BiasUncertainty))
    }

    pub fn prior_albedo_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::Albedo, LayerKind::Value))
    }

    pub fn prior_albedo_uq_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::Albedo, LayerKind::Uncertainty))
    }

    pub fn prior_albedo_flag_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::Albedo, LayerKind::Flag))
    }

    pub fn prior_albedo_bias_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::Albedo, LayerKind::Bias))
    }

    pub fn prior_albedo_bias_uq_filename(&self) -> Option<&Path> {
        self.layer(StarsLayer::new(Variable::Albedo, LayerKind::BiasUncertainty))
    }
}

/// Model-state path of every prior layer for a tile and prior date
pub fn prior_layer_paths(
    tile: &str,
    target_resolution: u32,
    model_directory: &Path,
    prior_date_utc: NaiveDate,
) -> StarsResult<Vec<(StarsLayer, PathBuf)>> {
    StarsLayer::all()
        .into_iter()
        .map(|layer| {
            let path = generate_model_state_filename(
                model_directory,
                &layer.state_variable(),
                prior_date_utc,
                tile,
                target_resolution,
            )?;
            Ok((layer, path))
        })
        .collect()
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        log::warn!("prior file not found: {}", path.display());
        None
    }
}

/// Fill model-state layers that are missing on disk from the prior archive
fn stage_from_archive(archive: &mut StarsArchive, paths: &[(StarsLayer, PathBuf)]) {
    for (layer, path) in paths {
        if path.exists() {
            continue;
        }
        match archive.extract_layer(*layer, path) {
            Ok(true) => log::info!("staged prior {} from {}", layer.state_variable(), archive.path().display()),
            Ok(false) => log::debug!("prior archive has no {} layer", layer.archive_suffix()),
            Err(e) => log::warn!("failed to stage prior {}: {}", layer.state_variable(), e),
        }
    }
}

/// Determine whether a usable prior exists for this run
///
/// Returns [`Prior::none`] when no archive is given, when the archive is
/// missing, unreadable or for another tile, or when any layer is absent.
pub fn resolve_prior<P: AsRef<Path>>(
    tile: &str,
    target_resolution: u32,
    model_directory: P,
    l2t_stars_prior_filename: Option<&Path>,
) -> StarsResult<Prior> {
    let archive_path = match l2t_stars_prior_filename {
        Some(path) => path,
        None => {
            log::info!("no prior L2T STARS granule given");
            return Ok(Prior::none());
        }
    };

    if !archive_path.exists() {
        log::warn!("prior L2T STARS granule not found: {}", archive_path.display());
        return Ok(Prior::none());
    }

    let mut archive = match StarsArchive::open(archive_path) {
        Ok(archive) => archive,
        Err(e) => {
            log::warn!("unable to use prior {}: {}", archive_path.display(), e);
            return Ok(Prior::none());
        }
    };

    if archive.tile() != tile {
        log::warn!(
            "prior granule {} is for tile {}, not {}",
            archive_path.display(),
            archive.tile(),
            tile
        );
        return Ok(Prior::none());
    }

    let prior_date_utc = archive.date_utc();
    let paths = prior_layer_paths(tile, target_resolution, model_directory.as_ref(), prior_date_utc)?;
    stage_from_archive(&mut archive, &paths);

    let mut ndvi = paths
        .iter()
        .filter(|(layer, _)| layer.variable == Variable::NDVI)
        .map(|(_, path)| existing(path.clone()));
    let mut albedo = paths
        .iter()
        .filter(|(layer, _)| layer.variable == Variable::Albedo)
        .map(|(_, path)| existing(path.clone()));

    let ndvi: [Option<PathBuf>; 5] = std::array::from_fn(|_| ndvi.next().flatten());
    let albedo: [Option<PathBuf>; 5] = std::array::from_fn(|_| albedo.next().flatten());

    match (complete_group(ndvi), complete_group(albedo)) {
        (Some(ndvi), Some(albedo)) => {
            log::info!("using prior from {} ({})", archive_path.display(), prior_date_utc);
            Ok(Prior::new(
                prior_date_utc,
                archive_path.to_path_buf(),
                PriorLayers {
                    ndvi: VariablePrior::from_array(ndvi),
                    albedo: VariablePrior::from_array(albedo),
                },
            ))
        }
        _ => {
            log::warn!("incomplete prior for {} on {}, running without prior", tile, prior_date_utc);
            Ok(Prior::none())
        }
    }
}
