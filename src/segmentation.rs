//! Background removal boundary.
//!
//! The segmentation model is opaque: encoded image bytes go in, encoded image
//! bytes with an alpha channel come out, and the alpha channel is the subject
//! mask. Anything that can fail on either side of that call is reported as
//! [`Error::Segmentation`].

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// Something that removes the background from an encoded photo.
pub trait Segmenter {
    /// Return the encoded cut-out, with the subject mask in its alpha channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Segmentation`] if the input cannot be processed.
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>>;
}

impl<F> Segmenter for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        self(input)
    }
}

/// Runs an external background-removal tool over stdin/stdout.
///
/// The default invocation is `rembg i - -`, which reads the photo from stdin
/// and writes a PNG cut-out to stdout.
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: String,
    args: Vec<String>,
}

impl Default for CommandSegmenter {
    fn default() -> Self {
        Self::new("rembg", ["i", "-", "-"])
    }
}

impl CommandSegmenter {
    /// Create a segmenter that runs `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a whitespace-separated command line such as `"rembg i - -"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the command line is empty.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::ConfigValidation("model command is empty".to_string()))?;
        Ok(Self::new(program, parts))
    }

    /// The executable this segmenter runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Segmenter for CommandSegmenter {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Segmentation(format!("failed to start `{}`: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Segmentation("child stdin unavailable".to_string()))?;

        // Feed stdin from a second thread so a full stdout pipe cannot deadlock us.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output
            .map_err(|e| Error::Segmentation(format!("`{}` did not finish: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Segmentation(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::Segmentation(format!(
                    "failed to send image to `{}`: {e}",
                    self.program
                )));
            }
            Err(_) => {
                return Err(Error::Segmentation("stdin writer panicked".to_string()));
            }
        }

        if output.stdout.is_empty() {
            return Err(Error::Segmentation(format!(
                "`{}` produced no output",
                self.program
            )));
        }

        log::debug!(
            "{} returned {} bytes for a {}-byte input",
            self.program,
            output.stdout.len(),
            input.len()
        );
        Ok(output.stdout)
    }
}

/// Keeps whatever alpha the input already has.
///
/// Useful for photos that were cut out beforehand: the input is decoded and
/// re-encoded as an RGBA PNG. Inputs without alpha come out fully opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaPassthrough;

impl Segmenter for AlphaPassthrough {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(input)
            .map_err(|e| Error::Segmentation(format!("unreadable input image: {e}")))?;
        let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());

        let mut encoded = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| Error::Segmentation(format!("failed to re-encode image: {e}")))?;
        Ok(encoded)
    }
}
