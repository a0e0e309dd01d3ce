//! Pixel heuristics for overlay labels
//!
//! Three independent passes over an 8-bit luma frame:
//! - patches flush with a corner (or seeded by a corner brightness
//!   anomaly), grown into a region by flood fill;
//! - edge-dense corners (text or a logo drawn over the photo);
//! - uniform rectangles outlined by strong edges anywhere in the frame.
//!
//! Regions are in the coordinates of the frame passed in.

use crate::config::ImageConfig;
use image::GrayImage;
use shared_types::Region;
use std::collections::VecDeque;

pub const SOURCE_CORNER: &str = "corner";
pub const SOURCE_EDGES: &str = "edges";
pub const SOURCE_OVERLAY: &str = "overlay";

/// A flood fill must cover this share of its own bounding box
const MIN_FILL_RATIO: f64 = 0.4;
/// Edge density a corner needs regardless of how busy the frame is
const MIN_CORNER_EDGE_DENSITY: f64 = 0.05;
/// Shrink applied to an outlined rectangle before testing its interior
const INTERIOR_INSET: u32 = 2;
/// Candidate regions overlapping an earlier one this much are duplicates
const DUPLICATE_IOU: f64 = 0.5;
const MIN_ASPECT: f64 = 0.2;
const MAX_ASPECT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }

    /// The outermost pixel of this corner
    pub fn pixel(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        let x = match self {
            Corner::TopLeft | Corner::BottomLeft => 0,
            Corner::TopRight | Corner::BottomRight => frame_width.saturating_sub(1),
        };
        let y = match self {
            Corner::TopLeft | Corner::TopRight => 0,
            Corner::BottomLeft | Corner::BottomRight => frame_height.saturating_sub(1),
        };
        (x, y)
    }

    /// `width` x `height` window flush with this corner of a frame
    pub fn window(&self, frame_width: u32, frame_height: u32, width: u32, height: u32) -> Region {
        let width = width.min(frame_width);
        let height = height.min(frame_height);
        let x = match self {
            Corner::TopLeft | Corner::BottomLeft => 0,
            Corner::TopRight | Corner::BottomRight => frame_width - width,
        };
        let y = match self {
            Corner::TopLeft | Corner::TopRight => 0,
            Corner::BottomLeft | Corner::BottomRight => frame_height - height,
        };
        Region {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualCandidate {
    pub source: &'static str,
    pub region: Region,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualReport {
    /// Corners whose mean brightness departs from the rest of the frame
    pub anomalous_corners: Vec<Corner>,
    pub candidates: Vec<VisualCandidate>,
}

impl VisualReport {
    fn push(&mut self, source: &'static str, region: Region) {
        if self
            .candidates
            .iter()
            .any(|c| c.region.iou(&region) >= DUPLICATE_IOU)
        {
            return;
        }
        self.candidates.push(VisualCandidate { source, region });
    }
}

/// Binary Sobel edge map, borders replicated
pub struct EdgeMap {
    width: u32,
    height: u32,
    edges: Vec<bool>,
}

impl EdgeMap {
    pub fn sobel(gray: &GrayImage, threshold: u32) -> Self {
        let (width, height) = gray.dimensions();
        let px = |x: i64, y: i64| -> i32 {
            let cx = x.clamp(0, width as i64 - 1) as u32;
            let cy = y.clamp(0, height as i64 - 1) as u32;
            gray.get_pixel(cx, cy)[0] as i32
        };

        let mut edges = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let gx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                    - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
                let gy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                    - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
                edges.push(gx.unsigned_abs() + gy.unsigned_abs() >= threshold);
            }
        }
        Self {
            width,
            height,
            edges,
        }
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.edges[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn density(&self) -> f64 {
        if self.edges.is_empty() {
            return 0.0;
        }
        self.edges.iter().filter(|&&e| e).count() as f64 / self.edges.len() as f64
    }

    fn count_in(&self, region: &Region) -> u64 {
        pixels(region).filter(|&(x, y)| self.is_edge(x, y)).count() as u64
    }

    /// Bounding box of the edge pixels inside `region`
    fn bbox_in(&self, region: &Region) -> Option<Region> {
        bounding_box(pixels(region).filter(|&(x, y)| self.is_edge(x, y)))
    }

    /// Bounding boxes of 8-connected edge components
    fn components(&self) -> Vec<Region> {
        let mut seen = vec![false; self.edges.len()];
        let mut boxes = Vec::new();
        let idx = |x: u32, y: u32| (y as usize) * (self.width as usize) + x as usize;

        for y in 0..self.height {
            for x in 0..self.width {
                if !self.is_edge(x, y) || seen[idx(x, y)] {
                    continue;
                }
                seen[idx(x, y)] = true;
                let mut queue = VecDeque::from([(x, y)]);
                let mut members = Vec::new();
                while let Some((cx, cy)) = queue.pop_front() {
                    members.push((cx, cy));
                    for (nx, ny) in neighbours8(cx, cy, self.width, self.height) {
                        if self.is_edge(nx, ny) && !seen[idx(nx, ny)] {
                            seen[idx(nx, ny)] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }
                boxes.extend(bounding_box(members.into_iter()));
            }
        }
        boxes
    }

    /// Share of `region`'s inner border that is edge, counting only the
    /// sides that do not lie on the frame border
    fn border_edge_ratio(&self, region: &Region) -> Option<f64> {
        let mut border = Vec::new();
        if region.x > 0 {
            border.extend((region.y..region.bottom()).map(|y| (region.x, y)));
        }
        if region.right() < self.width {
            border.extend((region.y..region.bottom()).map(|y| (region.right() - 1, y)));
        }
        if region.y > 0 {
            border.extend((region.x..region.right()).map(|x| (x, region.y)));
        }
        if region.bottom() < self.height {
            border.extend((region.x..region.right()).map(|x| (x, region.bottom() - 1)));
        }
        if border.is_empty() {
            return None;
        }
        let edges = border.iter().filter(|&&(x, y)| self.is_edge(x, y)).count();
        Some(edges as f64 / border.len() as f64)
    }
}

/// Run all visual passes over `gray`
pub fn analyze(gray: &GrayImage, config: &ImageConfig) -> VisualReport {
    let (width, height) = gray.dimensions();
    let mut report = VisualReport::default();
    if width == 0 || height == 0 {
        return report;
    }

    let edges = EdgeMap::sobel(gray, config.edge_threshold);
    let side = ((width.min(height) as f64 * config.corner_fraction).round() as u32).max(1);
    let windows: Vec<(Corner, Region)> = Corner::ALL
        .iter()
        .map(|&c| (c, c.window(width, height, side, side)))
        .collect();

    let corner_regions: Vec<Region> = windows.iter().map(|(_, w)| *w).collect();
    let background = mean_outside(gray, &corner_regions);
    let frame_edge_density = edges.density();
    let corner_edge_floor = (2.0 * frame_edge_density).max(MIN_CORNER_EDGE_DENSITY);

    for (corner, window) in &windows {
        let mut seeds = vec![corner.pixel(width, height)];
        if (mean_in(gray, window) - background).abs() > config.brightness_delta {
            report.anomalous_corners.push(*corner);
            seeds.extend(most_deviant(gray, window, background));
        }
        for seed in seeds {
            if let Some(region) = grow_corner(gray, &edges, seed, config) {
                report.push(SOURCE_CORNER, region);
            }
        }

        let density = edges.count_in(window) as f64 / window.area().max(1) as f64;
        if density >= corner_edge_floor {
            if let Some(bbox) = edges.bbox_in(window) {
                if size_ok(&bbox, width, height, config) {
                    report.push(SOURCE_EDGES, bbox);
                }
            }
        }
    }

    let frame_mean = mean_in(
        gray,
        &Region {
            x: 0,
            y: 0,
            width,
            height,
        },
    );
    for bbox in edges.components() {
        if !size_ok(&bbox, width, height, config) {
            continue;
        }
        let aspect = bbox.width as f64 / bbox.height.max(1) as f64;
        if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
            continue;
        }
        let Some(interior_mean) = uniform_interior(gray, &bbox, config) else {
            continue;
        };
        if (interior_mean - frame_mean).abs() >= config.brightness_delta {
            report.push(SOURCE_OVERLAY, bbox);
        }
    }

    report
}

/// Pixel of `window` furthest from the background luma, earliest on ties
fn most_deviant(gray: &GrayImage, window: &Region, background: f64) -> Option<(u32, u32)> {
    pixels(window).max_by(|&(ax, ay), &(bx, by)| {
        let a = (gray.get_pixel(ax, ay)[0] as f64 - background).abs();
        let b = (gray.get_pixel(bx, by)[0] as f64 - background).abs();
        a.total_cmp(&b).then(std::cmp::Ordering::Greater)
    })
}

/// Flood fill from `seed` and keep the fill when it looks like a solid,
/// sharply bounded patch that stands out from the rest of the frame.
///
/// There is no upper size bound: a patch may cover most of the frame as
/// long as it leaves part of every row or every column untouched, so a
/// larger label never scores less than a smaller one.
fn grow_corner(
    gray: &GrayImage,
    edges: &EdgeMap,
    seed: (u32, u32),
    config: &ImageConfig,
) -> Option<Region> {
    let (width, height) = gray.dimensions();
    let (region, filled) = flood_fill(gray, seed, config.fill_tolerance);
    if (filled as f64) < MIN_FILL_RATIO * region.area() as f64 {
        return None;
    }
    // Spanning the whole frame in either direction makes it background
    if region.width >= width || region.height >= height {
        return None;
    }
    let fraction = region.area() as f64 / (width as u64 * height as u64) as f64;
    if fraction < config.min_region_fraction {
        return None;
    }
    if (mean_in(gray, &region) - mean_outside(gray, &[region])).abs() <= config.brightness_delta {
        return None;
    }
    match edges.border_edge_ratio(&region) {
        Some(ratio) if ratio >= config.boundary_edge_ratio => Some(region),
        _ => None,
    }
}

/// 4-connected fill of pixels within `tolerance` of the seed value.
/// Returns the bounding box and the number of filled pixels.
fn flood_fill(gray: &GrayImage, seed: (u32, u32), tolerance: u8) -> (Region, u64) {
    let (width, height) = gray.dimensions();
    let target = gray.get_pixel(seed.0, seed.1)[0];
    let mut seen = vec![false; (width as usize) * (height as usize)];
    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed.0, seed.1, seed.0, seed.1);
    let mut filled = 0u64;
    let mut queue = VecDeque::from([seed]);
    seen[idx(seed.0, seed.1)] = true;

    while let Some((x, y)) = queue.pop_front() {
        filled += 1;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= width || ny >= height || seen[idx(nx, ny)] {
                continue;
            }
            if gray.get_pixel(nx, ny)[0].abs_diff(target) <= tolerance {
                seen[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    (
        Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
        filled,
    )
}

/// Mean of the inset interior when enough of it sits near its median
fn uniform_interior(gray: &GrayImage, bbox: &Region, config: &ImageConfig) -> Option<f64> {
    if bbox.width <= 2 * INTERIOR_INSET || bbox.height <= 2 * INTERIOR_INSET {
        return None;
    }
    let interior = Region {
        x: bbox.x + INTERIOR_INSET,
        y: bbox.y + INTERIOR_INSET,
        width: bbox.width - 2 * INTERIOR_INSET,
        height: bbox.height - 2 * INTERIOR_INSET,
    };

    let mut histogram = [0u64; 256];
    let mut sum = 0u64;
    for (x, y) in pixels(&interior) {
        let v = gray.get_pixel(x, y)[0];
        histogram[v as usize] += 1;
        sum += v as u64;
    }
    let total = interior.area();
    let mut running = 0;
    let median = histogram
        .iter()
        .position(|&count| {
            running += count;
            running * 2 >= total
        })
        .unwrap_or(0) as i32;

    let tolerance = config.fill_tolerance as i32;
    let near: u64 = histogram
        .iter()
        .enumerate()
        .filter(|(v, _)| (*v as i32 - median).abs() <= tolerance)
        .map(|(_, &count)| count)
        .sum();

    if (near as f64) < config.uniform_fraction * total as f64 {
        return None;
    }
    Some(sum as f64 / total as f64)
}

fn size_ok(region: &Region, width: u32, height: u32, config: &ImageConfig) -> bool {
    let fraction = region.area() as f64 / (width as u64 * height as u64) as f64;
    fraction >= config.min_region_fraction && fraction <= config.max_region_fraction
}

fn mean_in(gray: &GrayImage, region: &Region) -> f64 {
    let area = region.area();
    if area == 0 {
        return 0.0;
    }
    let sum: u64 = pixels(region).map(|(x, y)| gray.get_pixel(x, y)[0] as u64).sum();
    sum as f64 / area as f64
}

/// Mean brightness of the pixels outside every excluded window; the whole
/// frame when nothing is left
fn mean_outside(gray: &GrayImage, excluded: &[Region]) -> f64 {
    let (width, height) = gray.dimensions();
    let mut sum = 0u64;
    let mut count = 0u64;
    for (x, y, p) in gray.enumerate_pixels() {
        let inside = excluded
            .iter()
            .any(|r| x >= r.x && x < r.right() && y >= r.y && y < r.bottom());
        if !inside {
            sum += p[0] as u64;
            count += 1;
        }
    }
    if count == 0 {
        return mean_in(
            gray,
            &Region {
                x: 0,
                y: 0,
                width,
                height,
            },
        );
    }
    sum as f64 / count as f64
}

fn pixels(region: &Region) -> impl Iterator<Item = (u32, u32)> {
    let (x0, x1, y0, y1) = (region.x, region.right(), region.y, region.bottom());
    (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
}

fn bounding_box(points: impl Iterator<Item = (u32, u32)>) -> Option<Region> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y) in points {
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| Region {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    })
}

fn neighbours8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    (-1i64..=1)
        .flat_map(move |dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            (nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64)
                .then_some((nx as u32, ny as u32))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pretty_assertions::assert_eq;

    fn canvas(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    fn fill(img: &mut GrayImage, region: Region, value: u8) {
        for (x, y) in pixels(&region) {
            img.put_pixel(x, y, Luma([value]));
        }
    }

    fn block(x: u32, y: u32, size: u32) -> Region {
        Region {
            x,
            y,
            width: size,
            height: size,
        }
    }

    #[test]
    fn test_corner_windows() {
        assert_eq!(Corner::TopLeft.window(100, 80, 10, 10), block(0, 0, 10));
        assert_eq!(Corner::BottomRight.window(100, 80, 10, 10), block(90, 70, 10));
        assert_eq!(Corner::TopRight.window(5, 5, 10, 10), block(0, 0, 5));
    }

    #[test]
    fn test_plain_frame_has_no_candidates() {
        let report = analyze(&canvas(200, 150, 128), &ImageConfig::default());
        assert_eq!(report, VisualReport::default());
    }

    #[test]
    fn test_corner_block_is_found_exactly() {
        let mut img = canvas(400, 400, 100);
        fill(&mut img, block(0, 0, 40), 255);
        let report = analyze(&img, &ImageConfig::default());
        assert_eq!(report.anomalous_corners, vec![Corner::TopLeft]);
        assert_eq!(
            report.candidates[0],
            VisualCandidate {
                source: SOURCE_CORNER,
                region: block(0, 0, 40)
            }
        );
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn test_bottom_right_block_larger_than_window() {
        let mut img = canvas(400, 300, 40);
        fill(&mut img, block(300, 200, 100), 230);
        let report = analyze(&img, &ImageConfig::default());
        assert_eq!(report.anomalous_corners, vec![Corner::BottomRight]);
        assert_eq!(report.candidates[0].region, block(300, 200, 100));
    }

    #[test]
    fn test_corner_patch_larger_than_half_the_frame() {
        let mut img = canvas(400, 400, 100);
        fill(&mut img, block(0, 0, 380), 255);
        let report = analyze(&img, &ImageConfig::default());
        assert_eq!(report.candidates[0].source, SOURCE_CORNER);
        assert_eq!(report.candidates[0].region, block(0, 0, 380));
    }

    #[test]
    fn test_band_across_the_frame_is_background() {
        let mut img = canvas(300, 200, 60);
        fill(
            &mut img,
            Region {
                x: 0,
                y: 0,
                width: 300,
                height: 120,
            },
            220,
        );
        let report = analyze(&img, &ImageConfig::default());
        assert!(report.candidates.iter().all(|c| c.source != SOURCE_CORNER));
    }

    #[test]
    fn test_gradient_is_anomaly_without_region() {
        let mut img = canvas(400, 400, 0);
        for (x, _, p) in img.enumerate_pixels_mut() {
            *p = Luma([(x * 255 / 399) as u8]);
        }
        let report = analyze(&img, &ImageConfig::default());
        assert!(!report.anomalous_corners.is_empty());
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn test_mid_frame_overlay() {
        let mut img = canvas(400, 400, 90);
        fill(
            &mut img,
            Region {
                x: 150,
                y: 170,
                width: 100,
                height: 60,
            },
            240,
        );
        let report = analyze(&img, &ImageConfig::default());
        assert!(report.anomalous_corners.is_empty());
        assert_eq!(report.candidates.len(), 1);
        let found = &report.candidates[0];
        assert_eq!(found.source, SOURCE_OVERLAY);
        let expected = Region {
            x: 150,
            y: 170,
            width: 100,
            height: 60,
        };
        assert!(found.region.iou(&expected) > 0.9, "{:?}", found.region);
    }

    #[test]
    fn test_flood_fill_counts_pixels() {
        let mut img = canvas(20, 20, 0);
        fill(&mut img, block(2, 3, 5), 200);
        let (region, filled) = flood_fill(&img, (4, 4), 10);
        assert_eq!(region, block(2, 3, 5));
        assert_eq!(filled, 25);
    }

    #[test]
    fn test_sobel_marks_step_edges_only() {
        let mut img = canvas(10, 10, 0);
        fill(
            &mut img,
            Region {
                x: 5,
                y: 0,
                width: 5,
                height: 10,
            },
            255,
        );
        let edges = EdgeMap::sobel(&img, 100);
        assert!(edges.is_edge(4, 5));
        assert!(edges.is_edge(5, 5));
        assert!(!edges.is_edge(0, 5));
        assert!(!edges.is_edge(9, 5));
    }
}
