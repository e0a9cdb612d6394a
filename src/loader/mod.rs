//! Reads service scripts from disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Extension of service script files.
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Errors that can occur while reading scripts.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Error when reading the directory or a script file.
    #[error("Failed to read script file: {0}")]
    IoError(#[from] std::io::Error),

    /// The configured location is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// One script read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    /// File stem, used as the service's display name.
    pub name: String,
    /// Where the script was read from.
    pub path: PathBuf,
    /// The script text.
    pub source: String,
}

/// Reads every `.rhai` file directly inside a directory.
pub struct ScriptLoader {
    dir: PathBuf,
}

impl ScriptLoader {
    /// Creates a new `ScriptLoader`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Loads the scripts, ordered by file name. Subdirectories and files with
    /// other extensions are ignored.
    pub fn load(&self) -> Result<Vec<ScriptFile>, LoaderError> {
        if !self.dir.is_dir() {
            return Err(LoaderError::NotADirectory(self.dir.clone()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && Self::is_script_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        paths.into_iter().map(Self::read_script).collect()
    }

    /// Reads a single script file.
    pub fn read_script(path: PathBuf) -> Result<ScriptFile, LoaderError> {
        let source = fs::read_to_string(&path)?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        Ok(ScriptFile { name, path, source })
    }

    /// Checks if the file has the script extension.
    fn is_script_file(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
        let path = dir.path().join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_scripts_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "users.rhai", "setRespData(1);");
        create_test_file(&dir, "audit.rhai", "setRespData(2);");
        create_test_file(&dir, "notes.txt", "ignored");
        fs::create_dir(dir.path().join("nested.rhai")).unwrap();

        let scripts = ScriptLoader::new(dir.path().to_path_buf()).load().unwrap();
        let names: Vec<&str> = scripts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["audit", "users"]);
        assert_eq!(scripts[1].source, "setRespData(1);");
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(ScriptLoader::new(dir.path().to_path_buf()).load().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = ScriptLoader::new(dir.path().join("missing")).load();
        assert!(matches!(result, Err(LoaderError::NotADirectory(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = ScriptLoader::read_script(dir.path().join("gone.rhai"));
        assert!(matches!(result, Err(LoaderError::IoError(_))));
    }
}
