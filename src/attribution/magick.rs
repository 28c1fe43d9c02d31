//! ImageMagick backend: every step is one `convert` invocation over files.
//!
//! A session owns a private scratch directory holding its intermediate PNGs.
//! The directory is removed by [`BackendSession::close`] after every file
//! and, failing that, when the session is dropped. Each subprocess runs
//! under a time limit and is killed when the limit expires.

use super::raster::JPEG_QUALITY;
use super::{AttributionBackend, BackendSession};
use crate::config::{AttributionSpec, MagickConfig};
use crate::error::AttributionError;
use crate::persist::staging_path;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, Level};

/// Prefix of every scratch directory, visible in `ls -a` of the scratch root.
pub const SCRATCH_PREFIX: &str = ".attribution-";

/// Backend that shells out to ImageMagick.
#[derive(Debug, Clone)]
pub struct MagickBackend {
    config: Arc<MagickConfig>,
}

impl MagickBackend {
    pub fn new(config: MagickConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &MagickConfig {
        &self.config
    }
}

impl Default for MagickBackend {
    fn default() -> Self {
        Self::new(MagickConfig::default())
    }
}

#[async_trait]
impl AttributionBackend for MagickBackend {
    type Session = MagickSession;

    fn name(&self) -> &'static str {
        "magick"
    }

    /// Fails with [`AttributionError::ToolUnavailable`] unless `convert -version` runs.
    async fn preflight(&self) -> Result<(), AttributionError> {
        let program = &self.config.convert_bin;
        match run_tool(program, &[arg("-version")], self.config.image_timeout).await {
            Ok(()) => Ok(()),
            Err(AttributionError::SubprocessFailed { .. }) => Err(AttributionError::ToolUnavailable {
                program: program.clone(),
            }),
            Err(e) => Err(e),
        }
    }

    fn open_session(&self) -> Result<MagickSession, AttributionError> {
        let scratch = ScratchDir::create(self.config.scratch_root.as_deref())?;
        Ok(MagickSession {
            config: Arc::clone(&self.config),
            scratch,
            counter: 0,
        })
    }
}

/// Private temporary directory of one session. Removal is idempotent.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, AttributionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| AttributionError::io(root, e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| AttributionError::io(root.unwrap_or(Path::new("<tmp>")), e))?;

        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir: Some(dir) })
    }

    /// Directory path, `None` once cleaned up.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Remove the directory and everything in it. A second call is a no-op.
    pub fn cleanup(&mut self) -> Result<(), AttributionError> {
        match self.dir.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(|e| AttributionError::io(&path, e))?;
                debug!("Removed scratch directory {}", path.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Per-file context of the ImageMagick backend.
///
/// Rasters are PNG files inside the session's scratch directory.
#[derive(Debug)]
pub struct MagickSession {
    config: Arc<MagickConfig>,
    scratch: ScratchDir,
    counter: u32,
}

impl MagickSession {
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.path()
    }

    fn next_path(&mut self, tag: &str) -> Result<PathBuf, AttributionError> {
        let dir = self
            .scratch
            .path()
            .ok_or_else(|| AttributionError::Internal("scratch directory already removed".into()))?;
        self.counter += 1;
        Ok(dir.join(format!("{:03}_{}.png", self.counter, tag)))
    }

    async fn convert(&self, args: Vec<OsString>, limit: Duration) -> Result<(), AttributionError> {
        run_tool(&self.config.convert_bin, &args, limit).await
    }

    /// Run `convert` with `args` followed by a staging path beside `out`,
    /// then rename the result over `out`. A failed or timed-out run leaves
    /// `out` untouched.
    async fn convert_into(
        &self,
        mut args: Vec<OsString>,
        out: &Path,
        limit: Duration,
    ) -> Result<(), AttributionError> {
        let staged = staging_path(out).map_err(|e| AttributionError::io(out, e))?;
        args.push(arg(&*staged));
        self.convert(args, limit).await?;
        staged
            .persist(out)
            .map_err(|e| AttributionError::io(out, e.error))
    }

    async fn log_dimensions(&self, what: &str, path: &Path) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        let mut cmd = Command::new(&self.config.identify_bin);
        cmd.args([OsStr::new("-format"), OsStr::new("%wx%h"), path.as_os_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Ok(Ok(out)) = tokio::time::timeout(self.config.image_timeout, cmd.output()).await {
            if out.status.success() {
                debug!("{} → {}", what, String::from_utf8_lossy(&out.stdout).trim());
            }
        }
    }
}

impl Drop for MagickSession {
    fn drop(&mut self) {
        if let Err(e) = self.scratch.cleanup() {
            tracing::warn!("{}", e);
        }
    }
}

#[async_trait]
impl BackendSession for MagickSession {
    type Raster = PathBuf;

    async fn load(&mut self, path: &Path) -> Result<PathBuf, AttributionError> {
        if !path.is_file() {
            return Err(AttributionError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let out = self.next_path("load")?;
        let args = vec![
            arg(path),
            arg("-background"),
            arg("white"),
            arg("-alpha"),
            arg("remove"),
            arg("-alpha"),
            arg("off"),
            arg(&out),
        ];
        self.convert(args, self.config.image_timeout).await?;
        self.log_dimensions("Loaded", &out).await;
        Ok(out)
    }

    async fn rotate(&mut self, raster: &PathBuf, angle: f64) -> Result<PathBuf, AttributionError> {
        let out = self.next_path("rotate")?;
        self.convert(rotate_args(raster, angle, &out), self.config.image_timeout)
            .await?;
        self.log_dimensions(&format!("Rotated {angle}°"), &out).await;
        Ok(out)
    }

    async fn stamp(
        &mut self,
        raster: &PathBuf,
        spec: &AttributionSpec,
    ) -> Result<PathBuf, AttributionError> {
        let out = self.next_path("stamp")?;
        self.convert(stamp_args(raster, spec, &out), self.config.image_timeout)
            .await?;
        Ok(out)
    }

    async fn save(&mut self, raster: &PathBuf, path: &Path) -> Result<(), AttributionError> {
        let mut args = vec![arg(raster)];
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if is_jpeg {
            args.push(arg("-quality"));
            args.push(arg(JPEG_QUALITY.to_string()));
        }
        self.convert_into(args, path, self.config.image_timeout).await?;
        debug!("Saved → {}", path.display());
        Ok(())
    }

    async fn explode(&mut self, pdf: &Path, dpi: u32) -> Result<Vec<PathBuf>, AttributionError> {
        if !pdf.is_file() {
            return Err(AttributionError::InputNotFound {
                path: pdf.to_path_buf(),
            });
        }
        let dir = self.next_path("pages")?.with_extension("");
        std::fs::create_dir_all(&dir).map_err(|e| AttributionError::io(&dir, e))?;

        let args = vec![
            arg("-density"),
            arg(dpi.to_string()),
            arg(pdf),
            arg("-background"),
            arg("white"),
            arg("-alpha"),
            arg("remove"),
            arg(dir.join("page_%03d.png")),
        ];
        self.convert(args, self.config.document_timeout).await?;

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(&dir)
            .map_err(|e| AttributionError::io(&dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|p| page_number(&p).map(|n| (n, p)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);
        let pages: Vec<PathBuf> = pages.into_iter().map(|(_, p)| p).collect();

        if pages.is_empty() {
            return Err(AttributionError::EmptyDocument {
                path: pdf.to_path_buf(),
            });
        }
        debug!("Exploded {} → {} pages", pdf.display(), pages.len());
        Ok(pages)
    }

    async fn assemble(
        &mut self,
        pages: &[PathBuf],
        out: &Path,
        dpi: u32,
    ) -> Result<(), AttributionError> {
        if pages.is_empty() {
            return Err(AttributionError::PdfWrite {
                path: out.to_path_buf(),
                detail: "no pages to assemble".into(),
            });
        }
        let mut args = vec![arg("-density"), arg(dpi.to_string())];
        args.extend(pages.iter().map(arg));
        self.convert_into(args, out, self.config.document_timeout).await?;
        debug!("Assembled {} pages → {}", pages.len(), out.display());
        Ok(())
    }

    fn close(mut self) -> Result<(), AttributionError> {
        self.scratch.cleanup()
    }
}

fn arg(s: impl AsRef<OsStr>) -> OsString {
    s.as_ref().to_os_string()
}

/// `-rotate` turns clockwise, so the angle is negated.
fn rotate_args(input: &Path, angle: f64, out: &Path) -> Vec<OsString> {
    vec![
        arg(input),
        arg("-background"),
        arg("white"),
        arg("-rotate"),
        arg(format!("{}", -angle)),
        arg("-alpha"),
        arg("remove"),
        arg(out),
    ]
}

/// Offsets are measured from the bottom-left corner under `SouthWest`
/// gravity, so a downward shadow offset reduces the y offset.
fn stamp_args(input: &Path, spec: &AttributionSpec, out: &Path) -> Vec<OsString> {
    let p = spec.padding as i64;
    let (dx, dy) = spec.shadow_offset;
    vec![
        arg(input),
        arg("-gravity"),
        arg("SouthWest"),
        arg("-pointsize"),
        arg(spec.font_size.to_string()),
        arg("-fill"),
        arg("black"),
        arg("-annotate"),
        arg(geometry(p, p)),
        arg(&spec.text),
        arg("-fill"),
        arg("white"),
        arg("-annotate"),
        arg(geometry(p + dx as i64, p - dy as i64)),
        arg(&spec.text),
        arg(out),
    ]
}

/// Index of an exploded `page_NNN.png`. Past 999 pages the digits widen,
/// so ordering goes by the number rather than the name.
fn page_number(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("page_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

fn geometry(x: i64, y: i64) -> String {
    format!("{x:+}{y:+}")
}

/// Run `program` with `args`, bounded by `limit`.
///
/// A missing executable maps to [`AttributionError::ToolUnavailable`]; a
/// nonzero exit carries the tool's stderr. On timeout the child is killed.
pub async fn run_tool(
    program: &str,
    args: &[OsString],
    limit: Duration,
) -> Result<(), AttributionError> {
    debug!("Running {} {:?}", program, args);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AttributionError::ToolUnavailable {
                    program: program.to_string(),
                }
            } else {
                AttributionError::io(program, e)
            }
        })?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| AttributionError::io(program, e))?,
        Err(_) => {
            return Err(AttributionError::SubprocessTimeout {
                program: program.to_string(),
                secs: limit.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AttributionError::SubprocessFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: if stderr.is_empty() {
                "no output".to_string()
            } else {
                stderr
            },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn rotation_is_negated_for_imagemagick() {
        let args = strings(&rotate_args(Path::new("in.png"), 90.0, Path::new("out.png")));
        assert_eq!(
            args,
            vec!["in.png", "-background", "white", "-rotate", "-90", "-alpha", "remove", "out.png"]
        );
    }

    #[test]
    fn stamp_offsets_follow_southwest_gravity() {
        let spec = AttributionSpec::default();
        let args = strings(&stamp_args(Path::new("in.png"), &spec, Path::new("out.png")));
        let annotates: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-annotate")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(annotates, vec!["+10+10", "+12+7"]);
        assert!(args.contains(&"Dr. Tara Salman".to_string()));
        assert!(args.contains(&"20".to_string()));
    }

    #[test]
    fn exploded_pages_order_by_number() {
        let mut names = vec!["page_1000.png", "page_101.png", "page_000.png", "page_099.png"];
        names.sort_by_key(|n| page_number(Path::new(n)));
        assert_eq!(names, vec!["page_000.png", "page_099.png", "page_101.png", "page_1000.png"]);
        assert_eq!(page_number(Path::new("/scratch/001_pages/page_007.png")), Some(7));
        assert_eq!(page_number(Path::new("page_x.png")), None);
        assert_eq!(page_number(Path::new("cover.png")), None);
    }

    #[test]
    fn negative_geometry_keeps_sign() {
        assert_eq!(geometry(3, -1), "+3-1");
    }

    #[test]
    fn scratch_cleanup_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
        let path = scratch.path().unwrap().to_path_buf();
        assert!(path.starts_with(root.path()));
        assert!(path.is_dir());

        scratch.cleanup().unwrap();
        assert!(!path.exists());
        assert!(scratch.path().is_none());
        scratch.cleanup().unwrap();
    }

    #[test]
    fn session_scratch_removed_on_close_and_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let backend = MagickBackend::new(MagickConfig {
            scratch_root: Some(root.path().to_path_buf()),
            ..MagickConfig::default()
        });

        let closed = backend.open_session().unwrap();
        let closed_path = closed.scratch_path().unwrap().to_path_buf();
        closed.close().unwrap();
        assert!(!closed_path.exists());

        let dropped = backend.open_session().unwrap();
        let dropped_path = dropped.scratch_path().unwrap().to_path_buf();
        drop(dropped);
        assert!(!dropped_path.exists());

        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_binary_is_tool_unavailable() {
        let backend = MagickBackend::new(MagickConfig {
            convert_bin: "definitely-not-imagemagick-xyz".into(),
            ..MagickConfig::default()
        });
        let err = backend.preflight().await.unwrap_err();
        assert!(matches!(err, AttributionError::ToolUnavailable { .. }), "{err}");
    }

    /// A session whose `convert` is `sh`: the "raster" handed to `save` is a
    /// shell script that receives the remaining arguments.
    #[cfg(unix)]
    fn shell_session(root: &Path) -> MagickSession {
        MagickBackend::new(MagickConfig {
            convert_bin: "sh".into(),
            scratch_root: Some(root.join("scratch")),
            ..MagickConfig::default()
        })
        .open_session()
        .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_save_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "for last; do :; done\nprintf partial > \"$last\"\nexit 1\n").unwrap();
        let out_dir = dir.path().join("attributed");
        let target = out_dir.join("photo_pass1.jpg");

        let mut session = shell_session(dir.path());
        let err = session.save(&script, &target).await.unwrap_err();
        assert!(matches!(err, AttributionError::SubprocessFailed { .. }), "{err}");
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);

        let err = session
            .assemble(&[script.clone()], &out_dir.join("doc_pass1.pdf"), 72)
            .await
            .unwrap_err();
        assert!(matches!(err, AttributionError::SubprocessFailed { .. }), "{err}");
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
        session.close().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_save_lands_at_target() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "for last; do :; done\nprintf done > \"$last\"\n").unwrap();
        let target = dir.path().join("attributed").join("photo_pass2.png");

        let mut session = shell_session(dir.path());
        session.save(&script, &target).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "done");
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
        session.close().unwrap();
    }
}
