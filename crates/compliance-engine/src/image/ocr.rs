//! Optical text recognition backends
//!
//! The detector only talks to `OcrEngine`. Which implementation it gets is
//! decided once, at construction, by `detect_backend`.

use image::{DynamicImage, ImageFormat};
use shared_types::Region;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long one Tesseract run may take before it is killed
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR unavailable: {0}")]
    Unavailable(String),

    #[error("OCR backend failed: {0}")]
    Backend(String),
}

/// One recognized line of text
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    /// Bounding box in the coordinates of the image passed to `recognize`
    pub region: Option<Region>,
    pub confidence: f32,
}

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError>;
}

/// Stand-in used when no OCR backend is installed
#[derive(Debug, Clone, Default)]
pub struct UnavailableOcr {
    reason: String,
}

impl UnavailableOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrEngine for UnavailableOcr {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
        let reason = if self.reason.is_empty() {
            "no OCR backend configured"
        } else {
            &self.reason
        };
        Err(OcrError::Unavailable(reason.to_string()))
    }
}

/// Tesseract invoked as a subprocess, PNG on stdin and TSV on stdout.
/// A run that outlives the timeout is killed and reported as a backend
/// failure.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `<program> --version` runs successfully
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::Backend(format!("PNG encoding failed: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::Unavailable(format!(
                    "{} not found",
                    self.program.display()
                )),
                _ => OcrError::Backend(e.to_string()),
            })?;

        // Feed stdin and drain both pipes off-thread so a full pipe never
        // stalls the deadline loop
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&png)?;
            }
            Ok(())
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_deadline(&mut child, self.timeout)?;
        let written = writer
            .join()
            .map_err(|_| OcrError::Backend("stdin writer panicked".to_string()))?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(OcrError::Backend(
                String::from_utf8_lossy(&stderr).trim().to_string(),
            ));
        }
        written.map_err(|e| OcrError::Backend(format!("writing image to OCR: {}", e)))?;

        Ok(parse_tsv(&String::from_utf8_lossy(&stdout)))
    }
}

/// Read a child pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for `child` until `timeout` elapses, then kill it. The child is
/// always reaped before this returns.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, OcrError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "OCR process killed");
                return Err(OcrError::Backend(format!(
                    "timed out after {} ms",
                    timeout.as_millis()
                )));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::Backend(e.to_string()));
            }
        }
    }
}

/// Tesseract when it is on PATH, otherwise the unavailable stub
pub fn detect_backend() -> Box<dyn OcrEngine> {
    let tesseract = TesseractCli::default();
    if tesseract.is_available() {
        tracing::debug!("using tesseract OCR backend");
        Box::new(tesseract)
    } else {
        tracing::warn!("tesseract not found, OCR stage disabled");
        Box::new(UnavailableOcr::new("tesseract executable not found"))
    }
}

/// Group word rows (level 5) of Tesseract TSV output into lines
pub fn parse_tsv(tsv: &str) -> Vec<OcrLine> {
    struct Pending {
        key: (u32, u32, u32, u32),
        words: Vec<String>,
        region: Region,
        confidence: f32,
    }

    let mut lines: Vec<Pending> = Vec::new();
    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<u32>().ok();
        let (Some(page), Some(block), Some(par), Some(line)) = (num(1), num(2), num(3), num(4))
        else {
            continue;
        };
        let (Some(x), Some(y), Some(width), Some(height)) = (num(6), num(7), num(8), num(9))
        else {
            continue;
        };
        let confidence = cols[10].trim().parse::<f32>().unwrap_or(-1.0);
        let word = cols[11].trim();
        if word.is_empty() || confidence < 0.0 {
            continue;
        }

        let key = (page, block, par, line);
        let region = Region {
            x,
            y,
            width,
            height,
        };
        match lines.last_mut() {
            Some(pending) if pending.key == key => {
                pending.words.push(word.to_string());
                pending.region = union(&pending.region, &region);
                pending.confidence = pending.confidence.min(confidence);
            }
            _ => lines.push(Pending {
                key,
                words: vec![word.to_string()],
                region,
                confidence,
            }),
        }
    }

    lines
        .into_iter()
        .map(|p| OcrLine {
            text: p.words.join(" "),
            region: Some(p.region),
            confidence: p.confidence,
        })
        .collect()
}

fn union(a: &Region, b: &Region) -> Region {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    Region {
        x,
        y,
        width: a.right().max(b.right()) - x,
        height: a.bottom().max(b.bottom()) - y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t400\t30\t20\t91.5\tAI\n\
             5\t1\t1\t1\t1\t2\t45\t402\t90\t22\t88.0\tGenerated\n\
             5\t1\t2\t1\t1\t1\t300\t20\t50\t10\t70.0\tLogo\n",
            HEADER
        );
        let lines = parse_tsv(&tsv);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "AI Generated");
        assert_eq!(
            lines[0].region,
            Some(Region {
                x: 10,
                y: 400,
                width: 125,
                height: 24
            })
        );
        assert_eq!(lines[0].confidence, 88.0);
        assert_eq!(lines[1].text, "Logo");
    }

    #[test]
    fn test_parse_tsv_skips_blank_and_malformed_rows() {
        let tsv = format!("{}\n5\t1\t1\t1\t1\t1\t0\t0\t5\t5\t95\t \n5\tx\n", HEADER);
        assert!(parse_tsv(&tsv).is_empty());
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn test_unavailable_stub_reports_reason() {
        let image = DynamicImage::new_luma8(4, 4);
        let err = UnavailableOcr::new("not installed")
            .recognize(&image)
            .unwrap_err();
        assert_eq!(err, OcrError::Unavailable("not installed".to_string()));
        assert_eq!(err.to_string(), "OCR unavailable: not installed");
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_process_is_killed_at_deadline() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let started = Instant::now();
        let err = wait_with_deadline(&mut child, Duration::from_millis(100)).unwrap_err();
        assert_eq!(err, OcrError::Backend("timed out after 100 ms".to_string()));
        assert!(started.elapsed() < Duration::from_secs(4));
        // Already reaped
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_that_ignores_stdin_is_reaped() {
        // Incompressible pixels so the PNG overflows the pipe buffer
        let mut state = 0x2545_F491u32;
        let noise = image::GrayImage::from_fn(512, 512, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            image::Luma([(state >> 16) as u8])
        });
        let engine = TesseractCli::new("true").with_timeout(Duration::from_secs(10));
        let err = engine
            .recognize(&DynamicImage::ImageLuma8(noise))
            .unwrap_err();
        assert!(
            matches!(&err, OcrError::Backend(msg) if msg.starts_with("writing image to OCR")),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = TesseractCli::new("/nonexistent/tesseract-binary");
        assert!(!engine.is_available());
        let err = engine.recognize(&DynamicImage::new_luma8(4, 4)).unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }
}
