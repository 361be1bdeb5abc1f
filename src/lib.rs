//! Batch background removal for product and portrait photos.
//!
//! Each photo goes through an external segmentation model, is cropped to the
//! tight bounding box of its non-transparent pixels, padded by a proportional
//! bevel, and optionally fitted onto a fixed-size canvas (transparent or a
//! solid color). Results are written as PNGs into a folder named after the
//! run configuration.
//!
//! # Quick Start
//!
//! ```no_run
//! use subject_cutout::{compose, extract, AlphaPassthrough, RunConfig, Segmenter, SizeSelection};
//!
//! let config = RunConfig::default()
//!     .with_size(SizeSelection::Preset(512, 512))
//!     .expect("valid size");
//! let photo = std::fs::read("cutout.png").unwrap();
//! let segmented = AlphaPassthrough.remove_background(&photo).unwrap();
//! let subject = extract(&segmented).unwrap();
//! let composite = compose(&subject, &config).unwrap();
//! composite.into_dynamic().save("centered.png").unwrap();
//! ```
//!
//! # Batches
//!
//! ```no_run
//! use std::path::Path;
//! use subject_cutout::{collect_input_files, output_folder_name, BatchRunner, CommandSegmenter, RunConfig};
//!
//! let config = RunConfig::default();
//! let inputs = collect_input_files(Path::new("RawPhotos")).unwrap();
//! let output_dir = Path::new(".").join(output_folder_name(&config));
//! let runner = BatchRunner::new(CommandSegmenter::default(), config);
//! let result = runner
//!     .run(&inputs, &output_dir, |p| eprintln!("Processed {}/{}", p.processed, p.total))
//!     .unwrap();
//! println!("{} succeeded, {} failed", result.succeeded, result.failed);
//! ```

#![deny(missing_docs)]

pub mod batch;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
pub mod naming;
pub mod segmentation;

pub use batch::{
    collect_input_files, is_supported_image, BatchResult, BatchRunner, FileOutcome, Progress,
};
pub use compose::{compose, Composite};
pub use config::{parse_bevel, parse_color, RunConfig, SizeSelection};
pub use error::{Error, Result};
pub use extract::{bounding_box, extract, BoundingBox};
pub use naming::{output_file_name, output_folder_name};
pub use segmentation::{AlphaPassthrough, CommandSegmenter, Segmenter};
