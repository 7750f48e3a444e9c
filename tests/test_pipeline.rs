use l2t_stars::config::PipelineOptions;
use l2t_stars::core::pipeline::{run_from_runconfig, run_l2t_stars};
use l2t_stars::io::granule::StarsArchive;
use l2t_stars::io::process::{ExitStatus, ProcessCommand, ProcessRunner, RecordingProcessRunner};
use l2t_stars::io::runconfig::{generate_runconfig, L2TSTARSConfig, RunConfigRequest};
use l2t_stars::{exit_codes, LayerKind, StarsLayer, StarsResult, Variable};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

const LSTE_1029: &str = "ECOv002_L2T_LSTE_35805_011_11SPS_20241029T182233_0713_01";
const LSTE_1030: &str = "ECOv002_L2T_LSTE_35820_012_11SPS_20241030T174217_0713_01";

/// Stands in for the Julia toolchain by writing the five posterior rasters it is asked for
#[derive(Default)]
struct FusionSimulator {
    calls: Mutex<Vec<ProcessCommand>>,
}

impl FusionSimulator {
    fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for FusionSimulator {
    fn run(&self, command: &ProcessCommand) -> StarsResult<ExitStatus> {
        for posterior in &command.args[12..17] {
            std::fs::write(posterior, format!("{} {}", command.args[2], command.args[3]))?;
        }
        self.calls.lock().unwrap().push(command.clone());
        Ok(ExitStatus::Success)
    }
}

struct Workspace {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    fn working(&self) -> PathBuf {
        self.root.join("working")
    }

    fn lste(&self, name: &str) -> PathBuf {
        let inputs = self.root.join("inputs");
        std::fs::create_dir_all(&inputs).unwrap();
        let path = inputs.join(format!("{}.zip", name));
        std::fs::write(&path, b"LSTE").unwrap();
        path
    }

    fn runconfig(&self, lste_name: &str, prior: Option<&Path>) -> PathBuf {
        let mut request = RunConfigRequest::new(self.lste(lste_name), self.working());
        request.prior_l2t_stars_filename = prior.map(Path::to_path_buf);
        generate_runconfig(&request).unwrap()
    }
}

#[test]
fn test_end_to_end_without_prior() {
    let workspace = Workspace::new();
    let runconfig = workspace.runconfig(LSTE_1030, None);
    let config = L2TSTARSConfig::from_file(&runconfig).unwrap();
    let simulator = FusionSimulator::default();

    let code = run_l2t_stars(&config, &PipelineOptions::default(), &simulator).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let calls = simulator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args[3], "490");
    assert_eq!(calls[1].args[3], "980");
    for call in &calls {
        assert_eq!(call.args[4], "70");
        assert_eq!(call.args[6], "2024-10-23");
        assert_eq!(call.args[9], "2024-10-30");
        assert_eq!(call.args.len(), 17);
    }

    let zip_filename = config.l2t_stars_zip_filename();
    let mut archive = StarsArchive::open(&zip_filename).unwrap();
    let files = archive.list_files().unwrap();
    assert_eq!(files.len(), 10);
    assert!(files.contains(&format!("{id}/{id}_albedo-bias-UQ.tif", id = config.granule_id)));
    let ndvi = archive
        .find_layer(StarsLayer::new(Variable::NDVI, LayerKind::Value))
        .unwrap()
        .expect("NDVI layer missing");
    assert_eq!(archive.read_member(&ndvi).unwrap(), b"11SPS 490");

    // posterior state is packaged, then removed
    assert!(!config.model_directory.join("11SPS").join("2024-10-30").exists());
}

#[test]
fn test_existing_output_short_circuits() {
    let workspace = Workspace::new();
    let runconfig = workspace.runconfig(LSTE_1030, None);
    let config = L2TSTARSConfig::from_file(&runconfig).unwrap();
    std::fs::create_dir_all(&config.output_directory).unwrap();
    std::fs::write(config.l2t_stars_zip_filename(), b"done").unwrap();

    let runner = RecordingProcessRunner::new();
    let code = run_from_runconfig(&runconfig, &PipelineOptions::default(), &runner);
    assert_eq!(code, exit_codes::SUCCESS);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_previous_granule_seeds_next_day() {
    let workspace = Workspace::new();
    let options = PipelineOptions::default();

    let first = L2TSTARSConfig::from_file(workspace.runconfig(LSTE_1029, None)).unwrap();
    let simulator = FusionSimulator::default();
    run_l2t_stars(&first, &options, &simulator).unwrap();
    let prior_granule = first.l2t_stars_zip_filename();
    assert!(prior_granule.exists());

    let second = L2TSTARSConfig::from_file(workspace.runconfig(LSTE_1030, Some(&prior_granule))).unwrap();
    let simulator = FusionSimulator::default();
    let code = run_l2t_stars(&second, &options, &simulator).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let calls = simulator.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.args.len(), 21);
        assert!(call.args[17].contains("2024-10-29"));
    }
    assert!(calls[0].args[17].ends_with("STARS_NDVI_11SPS_70m.tif"));
    assert!(calls[1].args[20].ends_with("STARS_albedo.bias.UQ_11SPS_70m.tif"));

    // staged prior state is removed after the run
    assert!(!second.model_directory.join("11SPS").join("2024-10-29").exists());
}

#[test]
fn test_fusion_failure_exit_code() {
    let workspace = Workspace::new();
    let runconfig = workspace.runconfig(LSTE_1030, None);
    let runner = RecordingProcessRunner::new();
    runner.push_response(ExitStatus::Failed(1));

    let code = run_from_runconfig(&runconfig, &PipelineOptions::default(), &runner);
    assert_eq!(code, exit_codes::DATA_FUSION_FAILED);
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_missing_posterior_is_blank_output() {
    let workspace = Workspace::new();
    let runconfig = workspace.runconfig(LSTE_1030, None);
    let runner = RecordingProcessRunner::new();

    let code = run_from_runconfig(&runconfig, &PipelineOptions::default(), &runner);
    assert_eq!(code, exit_codes::BLANK_OUTPUT);
}

#[test]
fn test_missing_inputs_and_runconfig() {
    let workspace = Workspace::new();
    let runner = RecordingProcessRunner::new();
    let options = PipelineOptions::default();

    let code = run_from_runconfig(workspace.root.join("absent.xml"), &options, &runner);
    assert_eq!(code, exit_codes::MISSING_RUNCONFIG_FILE);

    let runconfig = workspace.runconfig(LSTE_1030, None);
    let config = L2TSTARSConfig::from_file(&runconfig).unwrap();
    std::fs::remove_file(&config.l2t_lste_filename).unwrap();
    let code = run_from_runconfig(&runconfig, &options, &runner);
    assert_eq!(code, exit_codes::INPUT_FILES_INACCESSIBLE);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_oversized_spinup_fails_without_launch() {
    let workspace = Workspace::new();
    let runconfig = workspace.runconfig(LSTE_1030, None);
    let runner = RecordingProcessRunner::new();
    let options = PipelineOptions {
        hls_spinup_days: 1_000_000_000_000,
        ..PipelineOptions::default()
    };

    let code = run_from_runconfig(&runconfig, &options, &runner);
    assert_eq!(code, exit_codes::UNCLASSIFIED_FAILURE_EXIT_CODE);
    assert!(runner.calls().is_empty());
}
