use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{HrvTrackError, ImportExportError, Result};

pub mod validation;
pub mod whoop_csv;

pub use whoop_csv::{parse_whoop_csv, validate_whoop_csv, CsvValidation, ParseOutcome};

/// Trait for importing readings from different export formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import candidate readings from the file
    fn import_file(&self, file_path: &Path) -> Result<ParseOutcome>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> =
            vec![Box::new(whoop_csv::WhoopCsvImporter::new())];

        Self { importers }
    }

    fn importer_for(&self, file_path: &Path) -> Option<&dyn ImportFormat> {
        self.importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .map(|importer| importer.as_ref())
    }

    fn unsupported(file_path: &Path) -> HrvTrackError {
        let format = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("unknown")
            .to_string();
        ImportExportError::UnsupportedFormat { format }.into()
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<ParseOutcome> {
        let importer = self
            .importer_for(file_path)
            .ok_or_else(|| Self::unsupported(file_path))?;

        info!(
            file = %file_path.display(),
            format = importer.get_format_name(),
            "Importing file"
        );
        importer.import_file(file_path)
    }

    /// Import all supported files from a directory.
    ///
    /// Files that fail are logged and skipped. Readings from different
    /// files are concatenated as-is; resolving dates that appear in more
    /// than one file is left to the repository merge.
    pub fn import_directory(&self, dir_path: &Path) -> Result<ParseOutcome> {
        let mut combined = ParseOutcome::default();

        let files = self.collect_importable_files(dir_path)?;

        if files.is_empty() {
            info!(dir = %dir_path.display(), "No importable files found");
            return Ok(combined);
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for file_path in files {
            let file_name = file_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            pb.set_message(format!("Processing {}", file_name));

            match self.import_file(&file_path) {
                Ok(outcome) => {
                    info!(
                        file = %file_name,
                        readings = outcome.readings.len(),
                        skipped = outcome.skipped_rows,
                        "Imported file"
                    );
                    combined.merge(outcome);
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Failed to import file");
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Import complete");
        Ok(combined)
    }

    /// Collect all files that can be imported from a directory, sorted by name
    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        if !dir_path.is_dir() {
            return Err(ImportExportError::InvalidStructure {
                reason: format!("path is not a directory: {}", dir_path.display()),
            }
            .into());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.importer_for(&path).is_some() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Validate a file without importing
    pub fn validate_file(&self, file_path: &Path) -> Result<()> {
        let importer = self
            .importer_for(file_path)
            .ok_or_else(|| Self::unsupported(file_path))?;

        let outcome = importer.import_file(file_path)?;
        info!(
            file = %file_path.display(),
            readings = outcome.readings.len(),
            "File is valid"
        );
        Ok(())
    }

    /// Check if this manager can import a given file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importer_for(file_path).is_some()
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const EXPORT: &str = "Cycle start time,Heart rate variability (ms)\n\
                          2024-01-01 06:00:00,45.5\n\
                          2024-01-02 06:00:00,48.2\n";

    #[test]
    fn test_import_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("physiological_cycles.csv");
        fs::write(&path, EXPORT).unwrap();

        let manager = ImportManager::new();
        let outcome = manager.import_file(&path).unwrap();
        assert_eq!(outcome.readings.len(), 2);
        assert!(manager.validate_file(&path).is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let manager = ImportManager::new();
        let err = manager.import_file(Path::new("export.xlsx")).unwrap_err();
        assert!(matches!(
            err,
            HrvTrackError::ImportExport(ImportExportError::UnsupportedFormat { .. })
        ));
        assert!(!manager.can_import_file(Path::new("export.xlsx")));
    }

    #[test]
    fn test_import_directory_skips_bad_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), EXPORT).unwrap();
        fs::write(dir.path().join("b.csv"), "Date,Value\n2024-01-01,45\n").unwrap();
        fs::write(
            dir.path().join("c.csv"),
            "Cycle start time,Heart rate variability (ms)\n2024-01-02 06:00:00,50.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let manager = ImportManager::new();
        let outcome = manager.import_directory(dir.path()).unwrap();

        // b.csv fails validation; a.csv and c.csv share 2024-01-02
        assert_eq!(outcome.readings.len(), 3);
        assert_eq!(outcome.skipped_rows, 0);
    }

    #[test]
    fn test_import_directory_requires_directory() {
        let manager = ImportManager::new();
        assert!(manager.import_directory(Path::new("/definitely/not/here")).is_err());
    }
}
