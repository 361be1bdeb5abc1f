//! Batch runner: applies the cut-out pipeline to every photo in a folder.
//!
//! Files are processed one at a time in listing order. A failure at any
//! stage is recorded against that file, leaves no output behind, and the
//! batch moves on to the next file.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::compose::{compose, Composite};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::naming::OutputNames;
use crate::segmentation::Segmenter;

/// Extensions accepted as input photos (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// List the supported photos in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be read.
pub fn collect_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_supported_image(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// What happened to one input file.
#[derive(Debug)]
pub struct FileOutcome {
    /// The input photo.
    pub input: PathBuf,
    /// Where the result was written, on success.
    pub output: Option<PathBuf>,
    /// Error kind label (see [`Error::kind`]), on failure.
    pub error_kind: Option<&'static str>,
    /// Human-readable status message.
    pub message: String,
}

impl FileOutcome {
    /// Whether the file was written successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.output.is_some()
    }
}

/// Progress after each file, success or failure.
#[derive(Debug)]
pub struct Progress<'a> {
    /// Files finished so far, including this one.
    pub processed: usize,
    /// Files in the batch.
    pub total: usize,
    /// The file that just finished.
    pub outcome: &'a FileOutcome,
}

/// Summary of one batch run.
#[derive(Debug)]
pub struct BatchResult {
    /// Folder the outputs were written to.
    pub output_dir: PathBuf,
    /// Files attempted.
    pub attempted: usize,
    /// Files written.
    pub succeeded: usize,
    /// Files that failed at some stage.
    pub failed: usize,
    /// Per-file outcomes in listing order.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchResult {
    fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    /// True when there was no eligible input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }
}

/// Runs segmentation, extraction and composition over a list of photos.
pub struct BatchRunner<S> {
    segmenter: S,
    config: RunConfig,
}

impl<S: Segmenter> BatchRunner<S> {
    /// Create a runner for an already validated configuration.
    pub fn new(segmenter: S, config: RunConfig) -> Self {
        Self { segmenter, config }
    }

    /// The configuration this runner applies.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the full pipeline on one encoded photo.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails.
    pub fn process_bytes(&self, input: &[u8]) -> Result<Composite> {
        let segmented = self.segmenter.remove_background(input)?;
        let subject = extract(&segmented)?;
        compose(&subject, &self.config)
    }

    /// Process `inputs` in order and write PNGs into `output_dir`.
    ///
    /// `on_progress` is called after every file. Per-file failures are
    /// recorded in the result and never abort the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] only if `output_dir` cannot be created.
    pub fn run<F>(&self, inputs: &[PathBuf], output_dir: &Path, mut on_progress: F) -> Result<BatchResult>
    where
        F: FnMut(&Progress<'_>),
    {
        fs::create_dir_all(output_dir)?;

        let mut result = BatchResult::new(output_dir);
        if inputs.is_empty() {
            log::info!("no eligible input photos");
            return Ok(result);
        }

        log::info!(
            "processing {} photo(s) into {}",
            inputs.len(),
            output_dir.display()
        );

        let mut names = OutputNames::new();
        let total = inputs.len();

        for (idx, input) in inputs.iter().enumerate() {
            let outcome = match self.process_file(input, output_dir, &mut names) {
                Ok(output) => {
                    result.succeeded += 1;
                    FileOutcome {
                        input: input.clone(),
                        output: Some(output),
                        error_kind: None,
                        message: "Background removed".to_string(),
                    }
                }
                Err(e) => {
                    log::warn!("{}: {} error: {e}", input.display(), e.kind());
                    result.failed += 1;
                    FileOutcome {
                        input: input.clone(),
                        output: None,
                        error_kind: Some(e.kind()),
                        message: e.to_string(),
                    }
                }
            };
            result.attempted += 1;

            on_progress(&Progress {
                processed: idx + 1,
                total,
                outcome: &outcome,
            });
            result.outcomes.push(outcome);
        }

        log::info!(
            "finished: {} succeeded, {} failed of {}",
            result.succeeded,
            result.failed,
            result.attempted
        );
        Ok(result)
    }

    fn process_file(&self, input: &Path, output_dir: &Path, names: &mut OutputNames) -> Result<PathBuf> {
        let bytes = fs::read(input)?;
        let composite = self.process_bytes(&bytes)?;
        let encoded = encode_png(composite)?;

        let name = names.claim(input);
        let output = output_dir.join(&name);
        if let Err(e) = write_atomically(&output, &encoded) {
            names.release(&name);
            return Err(e);
        }
        log::debug!("{} -> {}", input.display(), output.display());
        Ok(output)
    }
}

/// Encode a composite as PNG, RGBA or RGB as produced.
///
/// # Errors
///
/// Returns [`Error::Image`] if encoding fails.
pub fn encode_png(composite: Composite) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    composite
        .into_dynamic()
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
    Ok(encoded)
}

/// Write via a `.part` sibling and rename, so a failed write leaves nothing behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(Error::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.bmp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn collect_input_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "c.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = collect_input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.PNG", "b.jpg", "c.webp"]);
    }

    #[test]
    fn collect_input_files_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_input_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing-subdir").join("out.png");
        assert!(write_atomically(&target, b"data").is_err());
        assert!(!dir.path().join("missing-subdir").exists());
    }

    #[test]
    fn write_atomically_replaces_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.png");
        write_atomically(&target, b"data").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"data");
        assert!(!dir.path().join("out.png.part").exists());
    }
}
