use chrono::NaiveDate;
use l2t_stars::config::ToolchainConfig;
use l2t_stars::constants::THREADS_VARIABLE;
use l2t_stars::core::brdf::{BrdfInvoker, BrdfRequest};
use l2t_stars::io::process::{ExitStatus, RecordingProcessRunner};
use l2t_stars::{StarsError, Threads};
use l2t_stars::core::environment::Environment;
use std::ffi::OsStr;
use std::path::PathBuf;
use tempfile::TempDir;

fn request(directory: &std::path::Path) -> BrdfRequest {
    BrdfRequest {
        band: "NIR".to_string(),
        h: 8,
        v: 5,
        tile_width_cells: 2400,
        start_date: NaiveDate::from_ymd_opt(2024, 10, 14).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 10, 30).unwrap(),
        reflectance_directory: directory.join("reflectance"),
        solar_zenith_directory: directory.join("SZA"),
        sensor_zenith_directory: directory.join("VZA"),
        relative_azimuth_directory: directory.join("RAA"),
        sza_filename: directory.join("SZA.tif"),
        output_directory: directory.join("output"),
        initialize_julia: false,
        threads: Threads::Count(4),
    }
}

fn invoker() -> BrdfInvoker<RecordingProcessRunner> {
    let toolchain = ToolchainConfig {
        vnp43nrt_project_directory: PathBuf::from("/opt/VNP43NRT_jl"),
        ..ToolchainConfig::default()
    };
    let mut env = Environment::new();
    env.insert("GDAL_DATA".into(), "/some/gdal/path".into());
    env.insert("HOME".into(), "/home/stars".into());
    BrdfInvoker::new(RecordingProcessRunner::new(), toolchain).with_base_environment(env)
}

#[test]
fn test_brdf_command_line() {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let invoker = invoker();

    let status = invoker.invoke(&request(temp_dir.path())).unwrap();
    assert!(status.success());

    let calls = invoker.runner().calls();
    assert_eq!(calls.len(), 1);
    let command = &calls[0];
    assert_eq!(command.args[0], "--project=/opt/VNP43NRT_jl");
    assert_eq!(command.args[1], "/opt/VNP43NRT_jl/process_VNP43NRT.jl");
    assert_eq!(&command.args[2..8], &["NIR", "8", "5", "2400", "2024-10-14", "2024-10-30"]);
    assert_eq!(PathBuf::from(&command.args[12]), temp_dir.path().join("SZA.tif"));
    assert_eq!(PathBuf::from(&command.args[13]), temp_dir.path().join("output"));
    assert_eq!(command.args.len(), 14);

    assert!(command.env_var("GDAL_DATA").is_none());
    assert_eq!(command.env_var("HOME"), Some(OsStr::new("/home/stars")));
    assert_eq!(command.env_var(THREADS_VARIABLE), Some(OsStr::new("4")));
}

#[test]
fn test_brdf_failure_returned_as_status() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let invoker = invoker();
    invoker.runner().push_response(ExitStatus::Failed(2));

    let status = invoker.invoke(&request(temp_dir.path())).unwrap();
    assert_eq!(status, ExitStatus::Failed(2));
}

#[test]
fn test_brdf_instantiate_before_run() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let invoker = invoker();
    let mut req = request(temp_dir.path());
    req.initialize_julia = true;

    invoker.invoke(&req).unwrap();
    let calls = invoker.runner().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args, vec!["--project=/opt/VNP43NRT_jl", "-e", "using Pkg; Pkg.instantiate()"]);
    assert_eq!(calls[1].args[2], "NIR");
}

#[test]
fn test_brdf_invalid_tile_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let invoker = invoker();
    let mut req = request(temp_dir.path());
    req.h = 36;

    assert!(matches!(invoker.invoke(&req), Err(StarsError::InvalidArgument(_))));
    assert!(invoker.runner().calls().is_empty());
}
