//! Output naming policy.
//!
//! Folder names encode the run configuration, file names keep the input's
//! stem with a `.png` extension. Inputs that share a stem (`photo.jpg` and
//! `photo.webp`) get deterministic numeric suffixes in listing order.

use std::collections::HashSet;
use std::path::Path;

use crate::config::RunConfig;

/// Folder name for a run, e.g. `FinishedPhotos_Opaque_512x512`.
#[must_use]
pub fn output_folder_name(config: &RunConfig) -> String {
    let mode = if config.transparent_background() {
        "Transparent"
    } else {
        "Opaque"
    };
    format!("FinishedPhotos_{mode}_{}", config.size().label())
}

/// Output file name for an input: its stem with a `.png` extension.
///
/// Example: `"holiday/beach.JPG"` becomes `"beach.png"`.
#[must_use]
pub fn output_file_name(input: &Path) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    format!("{stem}.png")
}

/// Output names handed out so far in one run.
#[derive(Debug, Default)]
pub struct OutputNames {
    claimed: HashSet<String>,
}

impl OutputNames {
    /// Create an empty set of claimed names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an output name for `input`.
    ///
    /// The first claimant of `photo.png` keeps it; later ones get
    /// `photo_2.png`, `photo_3.png` and so on.
    pub fn claim(&mut self, input: &Path) -> String {
        let base = output_file_name(input);
        if self.claimed.insert(base.clone()) {
            return base;
        }

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let mut n = 2u32;
        loop {
            let candidate = format!("{stem}_{n}.png");
            if self.claimed.insert(candidate.clone()) {
                log::warn!(
                    "{} collides with an earlier output, writing {candidate}",
                    input.display()
                );
                return candidate;
            }
            n += 1;
        }
    }

    /// Give a name back, e.g. after the file it was claimed for failed.
    pub fn release(&mut self, name: &str) {
        self.claimed.remove(name);
    }
}
