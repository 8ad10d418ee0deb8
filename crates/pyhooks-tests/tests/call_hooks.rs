//! End-to-end hook calls against the complete sample backend.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use pyhooks::{ConfigSettings, HookError};
use pyhooks_tests::harness::{
    config_with_pythonpath, get_hooks, get_hooks_with_config, is_python_available, CountingRunner,
};

fn zip_names(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).expect("not a zip archive");
    archive.file_names().map(str::to_string).collect()
}

fn tar_gz_names(path: &Path) -> Vec<String> {
    let decoder = flate2::read::GzDecoder::new(File::open(path).unwrap());
    let mut archive = tar::Archive::new(decoder);
    archive
        .entries()
        .expect("not a tar archive")
        .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_missing_backend_gives_exception() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let empty = tempfile::tempdir().unwrap();
    let hooks = get_hooks_with_config("pkg1", config_with_pythonpath(empty.path()));

    let err = hooks.get_requires_for_build_wheel(None).unwrap_err();
    match err {
        HookError::BackendUnavailable { backend, traceback } => {
            assert_eq!(backend, "buildsys");
            assert!(traceback.contains("buildsys"), "traceback: {traceback}");
        }
        other => panic!("expected BackendUnavailable, got {other}"),
    }

    let out = tempfile::tempdir().unwrap();
    assert!(matches!(
        hooks.build_sdist(out.path(), None),
        Err(HookError::BackendUnavailable { .. })
    ));
}

#[test]
fn test_get_requires_for_build_wheel() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let res = hooks
        .get_requires_for_build_wheel(Some(&ConfigSettings::new()))
        .unwrap();
    assert_eq!(res, vec!["wheelwright".to_string()]);
}

#[test]
fn test_get_requires_for_build_sdist() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let res = hooks.get_requires_for_build_sdist(None).unwrap();
    assert_eq!(res, vec!["frog".to_string()]);
}

#[test]
fn test_prepare_metadata_for_build_wheel() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let metadata_dir = tempfile::tempdir().unwrap();
    let name = hooks
        .prepare_metadata_for_build_wheel(metadata_dir.path(), None, false)
        .unwrap();

    assert_eq!(name, "pkg1-0.5.dist-info");
    assert!(metadata_dir.path().join(&name).join("METADATA").is_file());
}

#[test]
fn test_build_wheel() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let build_dir = tempfile::tempdir().unwrap();
    let whl_file = hooks.build_wheel(build_dir.path(), None, None).unwrap();

    assert!(whl_file.ends_with(".whl"));
    assert!(!whl_file.contains(std::path::MAIN_SEPARATOR));

    let whl_path = build_dir.path().join(&whl_file);
    assert!(whl_path.is_file());
    let names = zip_names(&whl_path);
    assert!(names.contains(&"pkg1-0.5.dist-info/METADATA".to_string()));
    assert!(names.contains(&"pkg1.py".to_string()));
}

#[test]
fn test_build_sdist() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let sdist_dir = tempfile::tempdir().unwrap();
    let sdist = hooks.build_sdist(sdist_dir.path(), None).unwrap();

    assert!(sdist.ends_with(".tar.gz"));
    assert!(!sdist.contains(std::path::MAIN_SEPARATOR));

    let sdist_path = sdist_dir.path().join(&sdist);
    assert!(sdist_path.is_file());
    assert!(tar_gz_names(&sdist_path).contains(&"pkg1-0.5/pyproject.toml".to_string()));
}

#[test]
fn test_build_sdist_unsupported() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let hooks = get_hooks("pkg1");
    let sdist_dir = tempfile::tempdir().unwrap();
    let settings = ConfigSettings::new().with("test_unsupported", true);

    match hooks.build_sdist(sdist_dir.path(), Some(&settings)) {
        Err(HookError::UnsupportedOperation { message }) => {
            assert_eq!(
                message.as_deref(),
                Some("sdist builds were refused by request")
            );
        }
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
    assert!(std::fs::read_dir(sdist_dir.path()).unwrap().next().is_none());
}

#[test]
fn test_runner_replaced_on_error() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let runner = Arc::new(CountingRunner::default());
    let mut hooks = get_hooks("pkg1").with_runner(runner.clone());

    hooks.get_requires_for_build_wheel(None).unwrap();
    assert_eq!(runner.take_calls(), 1);

    let runner2 = Arc::new(CountingRunner::default());
    let result = hooks.with_subprocess_runner(runner2.clone(), |hooks| {
        hooks.get_requires_for_build_wheel(None)?;
        assert_eq!(runner2.take_calls(), 1);
        Err::<(), _>(HookError::unsupported(Some("raised inside the scope")))
    });
    assert!(result.is_err());

    hooks.get_requires_for_build_wheel(None).unwrap();
    assert_eq!(runner.take_calls(), 1);
    assert_eq!(runner2.take_calls(), 0);
}

#[test]
fn test_config_settings_reach_the_backend() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    // The backend only refuses when it sees the setting, so a refusal proves
    // the mapping crossed the boundary intact.
    let hooks = get_hooks("pkg1");
    let sdist_dir = tempfile::tempdir().unwrap();
    let settings = ConfigSettings::from_serializable(&serde_json::json!({
        "test_unsupported": 1,
        "nested": {"list": [1, 2, 3]},
    }))
    .unwrap();
    assert!(matches!(
        hooks.build_sdist(sdist_dir.path(), Some(&settings)),
        Err(HookError::UnsupportedOperation { .. })
    ));
}
