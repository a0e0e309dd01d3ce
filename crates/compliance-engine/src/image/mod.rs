//! AI-label detection on homepage images
//!
//! Three stages feed one decision. Metadata and OCR contribute text evidence,
//! the visual heuristics and OCR contribute candidate regions. Coverage is
//! the largest candidate's share of the image area. A stage that cannot run
//! leaves a finding behind and the others carry on.

pub mod metadata;
pub mod ocr;
pub mod visual;

use crate::config::ImageConfig;
use crate::scoring::round2;
use crate::signals::contains_keyword;
use image::{DynamicImage, GenericImageView};
use ocr::{OcrEngine, OcrError, OcrLine};
use shared_types::{Finding, ImageAnalysisResult, LabelRegion, Region};
use thiserror::Error;
use visual::Corner;

pub const SOURCE_OCR: &str = "ocr";

const METADATA_WEIGHT: f64 = 50.0;
const VISUAL_WEIGHT: f64 = 25.0;
const OCR_WEIGHT: f64 = 25.0;
const COMPLIANT_COVERAGE: f64 = 10.0;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image data is empty")]
    Empty,

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has zero area")]
    ZeroArea,
}

/// Raw image bytes plus where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub source_url: String,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(source_url: &str, bytes: Vec<u8>) -> Self {
        Self {
            source_url: source_url.to_string(),
            bytes,
        }
    }
}

/// A label must exist and cover at least 10% of the image
pub fn complies_with_ten_percent(has_label: bool, coverage: f64) -> bool {
    has_label && coverage >= COMPLIANT_COVERAGE
}

/// Percent of `width` x `height` covered by `area`, 2 decimals
pub fn coverage_percent(area: u64, width: u32, height: u32) -> f64 {
    let total = width as u64 * height as u64;
    if total == 0 {
        return 0.0;
    }
    round2(area as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

pub struct ImageLabelDetector {
    config: ImageConfig,
    ocr: Box<dyn OcrEngine>,
}

impl ImageLabelDetector {
    pub fn new(config: ImageConfig, ocr: Box<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }

    pub fn ocr_backend(&self) -> &str {
        self.ocr.name()
    }

    /// Analyze one image. Never fails; undecodable input yields
    /// `success: false` with the reason in `error`.
    pub fn analyze(&self, bytes: &[u8]) -> ImageAnalysisResult {
        match self.try_analyze(bytes) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "image analysis failed");
                ImageAnalysisResult::failure(err.to_string())
            }
        }
    }

    pub fn analyze_candidate(&self, candidate: &ImageCandidate) -> ImageAnalysisResult {
        let mut result = self.analyze(&candidate.bytes);
        if !candidate.source_url.is_empty() {
            result.source_url = Some(candidate.source_url.clone());
        }
        result
    }

    /// Analyze every candidate and keep the most favourable result:
    /// compliant, then labelled with the larger coverage, then the first
    /// decodable image, then the first failure
    pub fn analyze_candidates(&self, candidates: &[ImageCandidate]) -> ImageAnalysisResult {
        let mut best: Option<(u8, f64, ImageAnalysisResult)> = None;
        for candidate in candidates {
            let result = self.analyze_candidate(candidate);
            let tier = if result.complies_with_10_percent {
                3
            } else if result.has_label {
                2
            } else if result.success {
                1
            } else {
                0
            };
            let better = match &best {
                None => true,
                Some((best_tier, best_coverage, _)) => {
                    tier > *best_tier || (tier == *best_tier && result.label_coverage > *best_coverage)
                }
            };
            if better {
                best = Some((tier, result.label_coverage, result));
            }
        }

        match best {
            Some((_, _, result)) => result,
            None => ImageAnalysisResult::failure("No homepage image available"),
        }
    }

    fn try_analyze(&self, bytes: &[u8]) -> Result<ImageAnalysisResult, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let image = image::load_from_memory(bytes)?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroArea);
        }

        let mut signals = Vec::new();
        let mut regions: Vec<LabelRegion> = Vec::new();

        // Metadata
        let metadata_fields = metadata::ai_fields(bytes, &self.config.vocabulary);
        tracing::debug!(stage = "metadata", matched = !metadata_fields.is_empty(), "image stage done");
        signals.push(if metadata_fields.is_empty() {
            Finding::miss("No AI-related metadata found", METADATA_WEIGHT)
        } else {
            let listed: Vec<String> = metadata_fields
                .iter()
                .map(|f| format!("{}: {}", f.field, f.value))
                .collect();
            Finding::hit(
                format!("AI-related metadata found ({})", listed.join("; ")),
                METADATA_WEIGHT,
            )
        });

        // Visual heuristics on a bounded luma frame
        let gray = if width.max(height) > self.config.max_dimension {
            image
                .thumbnail(self.config.max_dimension, self.config.max_dimension)
                .to_luma8()
        } else {
            image.to_luma8()
        };
        let scale_x = width as f64 / gray.width() as f64;
        let scale_y = height as f64 / gray.height() as f64;
        let report = visual::analyze(&gray, &self.config);
        tracing::debug!(
            stage = "visual",
            matched = !report.candidates.is_empty(),
            largest = report.candidates.iter().map(|c| c.region.area()).max().unwrap_or(0),
            "image stage done"
        );
        for candidate in &report.candidates {
            let region = scale_region(&candidate.region, scale_x, scale_y, width, height);
            regions.push(label_region(candidate.source, region, width, height));
        }
        signals.push(if report.candidates.is_empty() {
            Finding::miss("No overlay region detected", VISUAL_WEIGHT)
        } else {
            Finding::hit(
                format!(
                    "Detected {} potential label region(s) by visual analysis",
                    report.candidates.len()
                ),
                VISUAL_WEIGHT,
            )
        });
        for corner in &report.anomalous_corners {
            let explained = report
                .candidates
                .iter()
                .any(|c| c.source == visual::SOURCE_CORNER && touches(&c.region, *corner, &gray));
            if !explained {
                signals.push(Finding::note(format!(
                    "Brightness anomaly in {} corner without a bounded region",
                    corner.name()
                )));
            }
        }

        // OCR
        let mut ocr_lines: Vec<String> = Vec::new();
        match self.recognize_all(&image) {
            Ok(lines) => {
                for line in lines {
                    let matches = self
                        .config
                        .vocabulary
                        .iter()
                        .any(|term| contains_keyword(&line.text, term));
                    if !matches {
                        continue;
                    }
                    if let Some(region) = line.region {
                        let region = clip(&region, width, height);
                        if region.area() > 0 {
                            regions.push(label_region(SOURCE_OCR, region, width, height));
                        }
                    }
                    if !ocr_lines.contains(&line.text) {
                        ocr_lines.push(line.text);
                    }
                }
                tracing::debug!(stage = "ocr", matched = !ocr_lines.is_empty(), "image stage done");
                signals.push(if ocr_lines.is_empty() {
                    Finding::miss("No AI-related text found by OCR", OCR_WEIGHT)
                } else {
                    Finding::hit(
                        format!("AI-related text found by OCR: '{}'", ocr_lines.join("', '")),
                        OCR_WEIGHT,
                    )
                });
            }
            Err(err) => {
                match err {
                    OcrError::Unavailable(_) => {
                        tracing::debug!(backend = self.ocr.name(), error = %err, "OCR stage skipped")
                    }
                    OcrError::Backend(_) => {
                        tracing::warn!(backend = self.ocr.name(), error = %err, "OCR backend failed")
                    }
                }
                signals.push(Finding::miss(err.to_string(), OCR_WEIGHT));
            }
        }

        let has_label =
            !metadata_fields.is_empty() || !report.candidates.is_empty() || !ocr_lines.is_empty();
        let largest = regions.iter().map(|r| r.region.area()).max().unwrap_or(0);
        let label_coverage = coverage_percent(largest, width, height);

        tracing::debug!(
            width,
            height,
            has_label,
            label_coverage,
            regions = regions.len(),
            "image analyzed"
        );

        Ok(ImageAnalysisResult {
            success: true,
            has_label,
            label_coverage,
            complies_with_10_percent: complies_with_ten_percent(has_label, label_coverage),
            signals,
            error: None,
            source_url: None,
            dimensions: Some((width, height)),
            metadata_fields,
            ocr_lines,
            regions,
        })
    }

    /// Full frame first, then each corner crop. Regions come back in full
    /// image coordinates. Only a full-frame failure aborts the stage.
    fn recognize_all(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
        let mut lines = self.ocr.recognize(image)?;

        let (width, height) = image.dimensions();
        let crop_w = ((width as f64 * self.config.ocr_corner_fraction).round() as u32).clamp(1, width);
        let crop_h =
            ((height as f64 * self.config.ocr_corner_fraction).round() as u32).clamp(1, height);
        for corner in Corner::ALL {
            let window = corner.window(width, height, crop_w, crop_h);
            let crop = image.crop_imm(window.x, window.y, window.width, window.height);
            match self.ocr.recognize(&crop) {
                Ok(found) => lines.extend(found.into_iter().map(|mut line| {
                    if let Some(region) = line.region.as_mut() {
                        region.x += window.x;
                        region.y += window.y;
                    }
                    line
                })),
                Err(err) => {
                    tracing::debug!(corner = corner.name(), error = %err, "corner OCR failed");
                }
            }
        }
        Ok(lines)
    }
}

fn label_region(source: &str, region: Region, width: u32, height: u32) -> LabelRegion {
    LabelRegion {
        source: source.to_string(),
        coverage_percent: coverage_percent(region.area(), width, height),
        region,
    }
}

fn scale_region(region: &Region, sx: f64, sy: f64, width: u32, height: u32) -> Region {
    let scaled = Region {
        x: (region.x as f64 * sx).round() as u32,
        y: (region.y as f64 * sy).round() as u32,
        width: ((region.width as f64 * sx).round() as u32).max(1),
        height: ((region.height as f64 * sy).round() as u32).max(1),
    };
    clip(&scaled, width, height)
}

fn clip(region: &Region, width: u32, height: u32) -> Region {
    let x = region.x.min(width);
    let y = region.y.min(height);
    Region {
        x,
        y,
        width: region.width.min(width - x),
        height: region.height.min(height - y),
    }
}

/// Whether `region` lies in the quadrant of `corner`
fn touches(region: &Region, corner: Corner, frame: &image::GrayImage) -> bool {
    let (width, height) = frame.dimensions();
    let quadrant = corner.window(width, height, width.div_ceil(2), height.div_ceil(2));
    region.intersection(&quadrant).is_some()
}
