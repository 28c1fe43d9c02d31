//! Pass orchestration over single files and whole directories.

use super::{
    output_base, pass_output_path, AttributionBackend, BackendSession, InputKind, Pass,
    DEFAULT_OUTPUT_DIR,
};
use crate::config::{AttributionSpec, DEFAULT_PDF_DPI};
use crate::error::AttributionError;
use crate::progress::{self, ProgressCallback};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One input that could not be processed during a directory run.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: AttributionError,
}

/// Aggregated result of a run: every written file plus per-file failures.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the two passes for each input through a backend.
pub struct Attributor<B: AttributionBackend> {
    backend: B,
    spec: AttributionSpec,
    dpi: u32,
    progress: ProgressCallback,
}

impl<B: AttributionBackend> Attributor<B> {
    pub fn new(backend: B, spec: AttributionSpec) -> Self {
        Self {
            backend,
            spec,
            dpi: DEFAULT_PDF_DPI,
            progress: progress::noop(),
        }
    }

    /// DPI used to explode and re-assemble PDFs. Default: 300.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn spec(&self) -> &AttributionSpec {
        &self.spec
    }

    /// Process a file or a directory.
    ///
    /// For a file, any error is returned. For a directory, per-file errors
    /// are collected in the outcome and only directory-level errors are
    /// returned.
    pub async fn process_path(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<BatchOutcome, AttributionError> {
        if !input.exists() {
            return Err(AttributionError::InputNotFound {
                path: input.to_path_buf(),
            });
        }
        self.backend.preflight().await?;

        if input.is_dir() {
            self.process_directory(input, output).await
        } else {
            let outputs = self.process_file(input, output).await?;
            Ok(BatchOutcome {
                outputs,
                failures: Vec::new(),
            })
        }
    }

    /// Run both passes over one file and return the two output paths.
    ///
    /// The backend session is closed whether or not processing succeeded.
    pub async fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<Vec<PathBuf>, AttributionError> {
        let kind = InputKind::from_path(input).ok_or_else(|| AttributionError::UnsupportedFormat {
            path: input.to_path_buf(),
        })?;
        if !input.is_file() {
            return Err(AttributionError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let start = Instant::now();
        let base = output_base(input, output);
        info!("Processing {} ({})", input.display(), self.backend.name());

        let mut session = self.backend.open_session()?;
        let result = match kind {
            InputKind::Image => self.run_image(&mut session, input, &base).await,
            InputKind::Pdf => self.run_pdf(&mut session, input, &base).await,
        };
        let closed = session.close();

        match (result, closed) {
            (Ok(outputs), Ok(())) => {
                debug!(
                    "Finished {} in {}ms",
                    input.display(),
                    start.elapsed().as_millis()
                );
                Ok(outputs)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(ce) = closed {
                    warn!("Cleanup after failure also failed: {}", ce);
                }
                Err(e)
            }
        }
    }

    /// Process every supported file directly inside `dir`.
    ///
    /// Outputs go to `output_dir`, default `<dir>/attributed`.
    pub async fn process_directory(
        &self,
        dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<BatchOutcome, AttributionError> {
        if !dir.is_dir() {
            return Err(AttributionError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        let out_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.join(DEFAULT_OUTPUT_DIR));
        std::fs::create_dir_all(&out_dir).map_err(|e| AttributionError::io(&out_dir, e))?;

        let inputs = collect_inputs(dir)?;
        if inputs.is_empty() {
            warn!("No supported files in {}", dir.display());
        }
        info!(
            "Found {} files in {} → {}",
            inputs.len(),
            dir.display(),
            out_dir.display()
        );

        let total = inputs.len();
        self.progress.on_batch_start(total);
        let mut outcome = BatchOutcome::default();

        for (i, input) in inputs.iter().enumerate() {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.progress.on_item_start(i + 1, total, &name);

            let target = out_dir.join(&name);
            match self.process_file(input, Some(&target)).await {
                Ok(paths) => {
                    self.progress.on_item_complete(i + 1, total, &name);
                    outcome.outputs.extend(paths);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", input.display(), e);
                    self.progress.on_item_error(i + 1, total, &name, &e.to_string());
                    outcome.failures.push(FileFailure {
                        path: input.clone(),
                        error: e,
                    });
                }
            }
        }

        self.progress
            .on_batch_complete(total, total - outcome.failures.len());
        info!(
            "Processed {} files: {} outputs, {} failures",
            total,
            outcome.outputs.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    async fn run_image(
        &self,
        session: &mut B::Session,
        input: &Path,
        base: &Path,
    ) -> Result<Vec<PathBuf>, AttributionError> {
        let mut previous = session.load(input).await?;
        let mut outputs = Vec::with_capacity(Pass::ALL.len());

        for pass in Pass::ALL {
            let rotated = session.rotate(&previous, pass.rotation_delta()).await?;
            let stamped = session.stamp(&rotated, &self.spec).await?;
            let out = pass_output_path(base, pass, InputKind::Image, input);
            session.save(&stamped, &out).await?;
            info!(
                "Pass {} ({}°) → {}",
                pass.ordinal(),
                pass.cumulative_angle(),
                out.display()
            );
            outputs.push(out);
            // The next pass rotates the unstamped raster.
            previous = rotated;
        }
        Ok(outputs)
    }

    async fn run_pdf(
        &self,
        session: &mut B::Session,
        input: &Path,
        base: &Path,
    ) -> Result<Vec<PathBuf>, AttributionError> {
        let pages = session.explode(input, self.dpi).await?;
        let total = pages.len();
        let mut per_pass: Vec<Vec<<B::Session as BackendSession>::Raster>> =
            Pass::ALL.iter().map(|_| Vec::with_capacity(total)).collect();

        for (i, page) in pages.into_iter().enumerate() {
            let mut previous = page;
            for (slot, pass) in Pass::ALL.into_iter().enumerate() {
                let rotated = session.rotate(&previous, pass.rotation_delta()).await?;
                let stamped = session.stamp(&rotated, &self.spec).await?;
                per_pass[slot].push(stamped);
                previous = rotated;
            }
            debug!("Page {}/{} stamped", i + 1, total);
        }

        let mut outputs = Vec::with_capacity(Pass::ALL.len());
        for (pass, stamped) in Pass::ALL.into_iter().zip(per_pass) {
            let out = pass_output_path(base, pass, InputKind::Pdf, input);
            session.assemble(&stamped, &out, self.dpi).await?;
            info!("Pass {} ({} pages) → {}", pass.ordinal(), total, out.display());
            outputs.push(out);
        }
        Ok(outputs)
    }
}

/// Regular files directly inside `dir` with a supported extension, sorted.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>, AttributionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| AttributionError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && InputKind::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::native::NativeBackend;
    use crate::attribution::text::TextRenderer;
    use image::{Rgb, RgbImage};

    fn native() -> Attributor<NativeBackend> {
        Attributor::new(
            NativeBackend::with_renderer(TextRenderer::Bitmap),
            AttributionSpec::default(),
        )
    }

    #[test]
    fn collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.pdf", "notes.txt", "d.gif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let names: Vec<String> = collect_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.pdf"]);
    }

    #[tokio::test]
    async fn image_produces_two_passes_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        let original = RgbImage::from_pixel(60, 40, Rgb([120, 130, 140]));
        original.save(&input).unwrap();

        let outputs = native().process_file(&input, None).await.unwrap();
        assert_eq!(
            outputs,
            vec![dir.path().join("photo_pass1.png"), dir.path().join("photo_pass2.png")]
        );

        let pass1 = image::open(&outputs[0]).unwrap();
        assert_eq!((pass1.width(), pass1.height()), (40, 60));
        let pass2 = image::open(&outputs[1]).unwrap();
        let expected = crate::attribution::raster::rotate(&original, 340.0);
        assert_eq!((pass2.width(), pass2.height()), expected.dimensions());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.txt");
        std::fs::write(&input, b"hello").unwrap();
        let err = native().process_file(&input, None).await.unwrap_err();
        assert!(matches!(err, AttributionError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let err = native()
            .process_path(Path::new("/no/such/file.png"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttributionError::InputNotFound { .. }));
    }
}
