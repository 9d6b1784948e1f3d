//! Command implementations.

mod info;
mod inspect;
mod run;
mod validate;

pub use info::run_info;
pub use inspect::run_inspect;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use contracts::DatasetBlueprint;

use crate::error::CliError;

/// Load and validate a configuration file
fn load_blueprint(path: &Path) -> Result<DatasetBlueprint, CliError> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

/// One-line camera description, e.g. `2048x1024 fov 70°`
fn describe_camera(camera: &contracts::CameraConfig) -> String {
    format!("{}x{} fov {}°", camera.width, camera.height, camera.fov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = load_blueprint(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[world]\nmap = \"Town01\"\ndelta_seconds = 0.0").unwrap();

        let err = load_blueprint(file.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigValidation { .. }), "got {err:?}");
    }
}
