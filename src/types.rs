use crate::exit_codes;
use std::path::PathBuf;

/// Surface variables produced by the L2T STARS fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    NDVI,
    Albedo,
}

impl Variable {
    /// Name used in filenames and on the toolchain command line
    pub fn name(&self) -> &'static str {
        match self {
            Variable::NDVI => "NDVI",
            Variable::Albedo => "albedo",
        }
    }

    /// Resolution of the coarse (VIIRS) input for this variable, in meters
    pub fn coarse_cell_size(&self) -> u32 {
        match self {
            Variable::NDVI => crate::constants::NDVI_RESOLUTION,
            Variable::Albedo => crate::constants::ALBEDO_RESOLUTION,
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Role of a raster within one variable's model state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Value,
    Uncertainty,
    Flag,
    Bias,
    BiasUncertainty,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Value,
        LayerKind::Uncertainty,
        LayerKind::Flag,
        LayerKind::Bias,
        LayerKind::BiasUncertainty,
    ];
}

/// One raster layer of an L2T STARS granule or model state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarsLayer {
    pub variable: Variable,
    pub kind: LayerKind,
}

impl StarsLayer {
    pub const fn new(variable: Variable, kind: LayerKind) -> Self {
        Self { variable, kind }
    }

    /// All ten layers, NDVI first
    pub fn all() -> Vec<StarsLayer> {
        [Variable::NDVI, Variable::Albedo]
            .iter()
            .flat_map(|variable| LayerKind::ALL.iter().map(move |kind| StarsLayer::new(*variable, *kind)))
            .collect()
    }

    /// Suffix of the layer inside a granule archive, e.g. `NDVI-bias-UQ`
    pub fn archive_suffix(&self) -> String {
        let name = self.variable.name();
        match self.kind {
            LayerKind::Value => name.to_string(),
            LayerKind::Uncertainty => format!("{}-UQ", name),
            LayerKind::Flag => format!("{}-flag", name),
            LayerKind::Bias => format!("{}-bias", name),
            LayerKind::BiasUncertainty => format!("{}-bias-UQ", name),
        }
    }

    /// Variable name used for the layer's model-state file, e.g. `NDVI.bias.UQ`
    pub fn state_variable(&self) -> String {
        let name = self.variable.name();
        match self.kind {
            LayerKind::Value => name.to_string(),
            LayerKind::Uncertainty => format!("{}.UQ", name),
            LayerKind::Flag => format!("{}.flag", name),
            LayerKind::Bias => format!("{}.bias", name),
            LayerKind::BiasUncertainty => format!("{}.bias.UQ", name),
        }
    }
}

/// Thread count handed to the Julia runtime through `JULIA_NUM_THREADS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threads {
    #[default]
    Auto,
    Count(usize),
}

impl std::fmt::Display for Threads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threads::Auto => write!(f, "auto"),
            Threads::Count(n) => write!(f, "{}", n),
        }
    }
}

impl std::str::FromStr for Threads {
    type Err = StarsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Threads::Auto);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Threads::Count(n)),
            _ => Err(StarsError::InvalidArgument(format!(
                "thread count must be a positive integer or \"auto\", got {:?}",
                s
            ))),
        }
    }
}

/// Error types for L2T STARS orchestration
#[derive(Debug, thiserror::Error)]
pub enum StarsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid date {input:?}: {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid granule name: {0}")]
    InvalidGranule(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Run-config file not found: {}", .0.display())]
    MissingRunconfigFile(PathBuf),

    #[error("Run-config is missing field {group}/{name}")]
    MissingRunconfigField { group: String, name: String },

    #[error("Input files inaccessible: {0}")]
    InputFilesInaccessible(String),

    #[error("Blank output: {0}")]
    BlankOutput(String),

    #[error("Data fusion for {variable} exited with code {code:?}")]
    DataFusionFailed { variable: String, code: Option<i32> },
}

impl StarsError {
    /// Process exit code reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            StarsError::MissingRunconfigFile(_) => exit_codes::MISSING_RUNCONFIG_FILE,
            StarsError::XmlParsing(_) => exit_codes::UNABLE_TO_PARSE_RUNCONFIG,
            StarsError::MissingRunconfigField { .. } => exit_codes::MISSING_RUNCONFIG_FIELD,
            StarsError::InputFilesInaccessible(_) | StarsError::InvalidGranule(_) => {
                exit_codes::INPUT_FILES_INACCESSIBLE
            }
            StarsError::BlankOutput(_) => exit_codes::BLANK_OUTPUT,
            StarsError::DataFusionFailed { .. } => exit_codes::DATA_FUSION_FAILED,
            _ => exit_codes::UNCLASSIFIED_FAILURE_EXIT_CODE,
        }
    }
}

/// Result type for L2T STARS operations
pub type StarsResult<T> = Result<T, StarsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads_parse_and_display() {
        assert_eq!("auto".parse::<Threads>().unwrap(), Threads::Auto);
        assert_eq!("8".parse::<Threads>().unwrap(), Threads::Count(8));
        assert_eq!(Threads::Count(8).to_string(), "8");
        assert_eq!(Threads::Auto.to_string(), "auto");
        assert!("0".parse::<Threads>().is_err());
        assert!("many".parse::<Threads>().is_err());
    }

    #[test]
    fn test_layer_names() {
        let layers = StarsLayer::all();
        assert_eq!(layers.len(), 10);

        let bias_uq = StarsLayer::new(Variable::Albedo, LayerKind::BiasUncertainty);
        assert_eq!(bias_uq.archive_suffix(), "albedo-bias-UQ");
        assert_eq!(bias_uq.state_variable(), "albedo.bias.UQ");
        assert_eq!(layers[0].archive_suffix(), "NDVI");
    }

    #[test]
    fn test_error_exit_codes() {
        let err = StarsError::BlankOutput("NDVI".to_string());
        assert_eq!(err.exit_code(), exit_codes::BLANK_OUTPUT);

        let err = StarsError::InvalidArgument("x".to_string());
        assert_eq!(err.exit_code(), exit_codes::UNCLASSIFIED_FAILURE_EXIT_CODE);
    }
}
