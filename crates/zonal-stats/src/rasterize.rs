//! Rasterization of a single zone geometry onto grid cells.
//!
//! ```text
//! geometry ──► bbox ──► GridSpec::crop_window ──► local mask ──► nonzero ──► + (start_row, start_col)
//! ```
//!
//! Only the crop window is visited, and each window row is filled by a
//! scanline pass over the ring edges reaching it, so the cost grows with
//! window cells plus edges rather than with their product.

use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};
use zonal_common::{CropWindow, GeoTransform, GridSpec};

use crate::error::{Result, ZonalError};
use crate::geometry::{rect_to_bbox, ZoneGeometry};
use crate::types::CellIndexSet;

/// Fraction of the cell size trimmed off each side before an overlap test,
/// so that contact along a shared edge does not count as overlap.
const TOUCH_TOLERANCE: f64 = 1e-6;

/// Policy deciding which cells a geometry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RasterizeMode {
    /// Every cell whose interior the geometry overlaps.
    #[default]
    AllTouched,
    /// Only cells whose center lies inside the geometry (boundary inclusive).
    CenterOnly,
}

impl std::str::FromStr for RasterizeMode {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all_touched" => Ok(RasterizeMode::AllTouched),
            "center_only" => Ok(RasterizeMode::CenterOnly),
            other => Err(ZonalError::config(format!(
                "unknown rasterization mode '{}', expected all_touched or center_only",
                other
            ))),
        }
    }
}

/// Boolean mask over a crop window, row-major.
#[derive(Debug)]
struct WindowMask {
    window: CropWindow,
    cells: Vec<bool>,
}

impl WindowMask {
    /// Global (row, col) of every covered cell.
    fn nonzero(&self) -> (Vec<usize>, Vec<usize>) {
        let cols = self.window.cols();
        let mut rows_out = Vec::new();
        let mut cols_out = Vec::new();
        for (i, _) in self.cells.iter().enumerate().filter(|&(_, &hit)| hit) {
            rows_out.push(self.window.start_row + i / cols);
            cols_out.push(self.window.start_col + i % cols);
        }
        (rows_out, cols_out)
    }
}

/// Map one geometry to the grid cells it covers.
///
/// `polygon` is the position of the geometry in its set and is only used to
/// report an internal-consistency failure.
pub fn rasterize_geometry(
    polygon: usize,
    geometry: &ZoneGeometry,
    spec: &GridSpec,
    mode: RasterizeMode,
) -> Result<CellIndexSet> {
    let footprint = geometry.footprint(&spec.transform);
    let bbox = match footprint.bounding_rect() {
        Some(rect) => rect_to_bbox(&rect),
        None => return Ok(CellIndexSet::empty()),
    };

    let window = spec.crop_window(&bbox);
    let mask = rasterize_window(&footprint, window, &spec.transform, mode);
    let (rows, cols) = mask.nonzero();

    if rows.is_empty() {
        return Ok(CellIndexSet::empty());
    }

    if let Some((row, col)) = rows
        .iter()
        .zip(cols.iter())
        .map(|(&r, &c)| (r, c))
        .find(|&(r, c)| !spec.contains_index(r, c))
    {
        return Err(ZonalError::IndexOutOfBounds {
            polygon,
            row,
            col,
            rows: spec.rows,
            cols: spec.cols,
        });
    }

    Ok(CellIndexSet::from_parts(rows, cols))
}

/// One ring segment, tagged with the polygon part it belongs to.
#[derive(Debug, Clone, Copy)]
struct Edge {
    part: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Edge {
    fn y_range(&self) -> (f64, f64) {
        (self.y0.min(self.y1), self.y0.max(self.y1))
    }

    /// X-extent of the part of this edge lying within `lo <= y <= hi`.
    fn x_extent(&self, lo: f64, hi: f64) -> Option<(f64, f64)> {
        let (ymin, ymax) = self.y_range();
        if ymax < lo || ymin > hi {
            return None;
        }
        if self.y0 == self.y1 {
            return Some((self.x0.min(self.x1), self.x0.max(self.x1)));
        }
        let xa = self.x_at(ymin.max(lo));
        let xb = self.x_at(ymax.min(hi));
        Some((xa.min(xb), xa.max(xb)))
    }

    /// Crossing with the horizontal line `y`, counting the lower endpoint only.
    fn crossing(&self, y: f64) -> Option<f64> {
        ((self.y0 > y) != (self.y1 > y)).then(|| self.x_at(y))
    }

    fn x_at(&self, y: f64) -> f64 {
        self.x0 + (y - self.y0) * (self.x1 - self.x0) / (self.y1 - self.y0)
    }
}

fn footprint_edges(footprint: &MultiPolygon<f64>) -> Vec<Edge> {
    footprint
        .iter()
        .enumerate()
        .flat_map(|(part, polygon)| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .flat_map(move |ring| {
                    ring.lines().map(move |line| Edge {
                        part,
                        x0: line.start.x,
                        y0: line.start.y,
                        x1: line.end.x,
                        y1: line.end.y,
                    })
                })
        })
        .collect()
}

/// Cell geometry of a crop window.
#[derive(Debug)]
struct Scan {
    left: f64,
    top: f64,
    dlon: f64,
    dlat: f64,
    rows: usize,
    cols: usize,
}

impl Scan {
    fn new(window: &CropWindow, transform: &GeoTransform) -> Self {
        Self {
            left: transform.origin_lon + transform.dlon * window.start_col as f64,
            top: transform.origin_lat - transform.dlat * window.start_row as f64,
            dlon: transform.dlon,
            dlat: transform.dlat,
            rows: window.rows(),
            cols: window.cols(),
        }
    }

    fn center_y(&self, row: usize) -> f64 {
        self.top - self.dlat * (row as f64 + 0.5)
    }

    /// Y-range of a row, trimmed by `trim` on both sides.
    fn strip(&self, row: usize, trim: f64) -> (f64, f64) {
        let top = self.top - self.dlat * row as f64;
        (top - self.dlat + trim, top - trim)
    }

    /// Group edge indices by the window rows their y-range reaches.
    ///
    /// Rows are widened by one on each side; callers re-test exactly.
    fn bucket(&self, edges: &[Edge]) -> Vec<Vec<usize>> {
        let mut buckets = vec![Vec::new(); self.rows];
        let last = self.rows as f64 - 1.0;
        for (i, edge) in edges.iter().enumerate() {
            let (ymin, ymax) = edge.y_range();
            let first = ((self.top - ymax) / self.dlat).floor() - 1.0;
            let end = ((self.top - ymin) / self.dlat).floor() + 1.0;
            if end < 0.0 || first > last {
                continue;
            }
            for bucket in &mut buckets[first.max(0.0) as usize..=end.min(last) as usize] {
                bucket.push(i);
            }
        }
        buckets
    }

    /// Columns whose center x lies within `[a, b]`.
    fn center_cols(&self, a: f64, b: f64) -> Option<(usize, usize)> {
        let first = ((a - self.left) / self.dlon - 0.5).ceil();
        let last = ((b - self.left) / self.dlon - 0.5).floor();
        self.clamp_cols(first, last)
    }

    /// Columns whose x-range, trimmed by `trim`, meets `[a, b]`.
    fn touched_cols(&self, a: f64, b: f64, trim: f64) -> Option<(usize, usize)> {
        let first = ((a + trim - self.left) / self.dlon - 1.0).ceil();
        let last = ((b - trim - self.left) / self.dlon).floor();
        self.clamp_cols(first, last)
    }

    fn clamp_cols(&self, first: f64, last: f64) -> Option<(usize, usize)> {
        let first = first.max(0.0);
        let last = last.min(self.cols as f64 - 1.0);
        (first <= last).then(|| (first as usize, last as usize))
    }
}

/// Scanline rasterization of `footprint` over the crop window.
///
/// Per row, cells are covered when a ring edge passes through them (the
/// trimmed row strip in `AllTouched`, the center line in `CenterOnly`) or when
/// their center falls between an even-odd pair of crossings of the center
/// line. A cell no edge passes through is entirely inside or outside its
/// polygon part, so its center decides.
fn rasterize_window(
    footprint: &MultiPolygon<f64>,
    window: CropWindow,
    transform: &GeoTransform,
    mode: RasterizeMode,
) -> WindowMask {
    let scan = Scan::new(&window, transform);
    let trim = TOUCH_TOLERANCE * transform.dlon.min(transform.dlat);
    let edges = footprint_edges(footprint);
    let buckets = scan.bucket(&edges);

    let mut cells = vec![false; scan.rows * scan.cols];
    let mut crossings: Vec<(usize, f64)> = Vec::new();

    for (row, bucket) in buckets.iter().enumerate() {
        let line = &mut cells[row * scan.cols..(row + 1) * scan.cols];
        let y = scan.center_y(row);
        let (lo, hi) = match mode {
            RasterizeMode::AllTouched => scan.strip(row, trim),
            RasterizeMode::CenterOnly => (y, y),
        };

        crossings.clear();
        for edge in bucket.iter().map(|&i| &edges[i]) {
            if let Some((a, b)) = edge.x_extent(lo, hi) {
                let span = match mode {
                    RasterizeMode::AllTouched => scan.touched_cols(a, b, trim),
                    RasterizeMode::CenterOnly => scan.center_cols(a, b),
                };
                fill(line, span);
            }
            if let Some(x) = edge.crossing(y) {
                crossings.push((edge.part, x));
            }
        }

        // Closed rings cross a line an even number of times per part.
        crossings.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        for pair in crossings.chunks_exact(2) {
            fill(line, scan.center_cols(pair[0].1, pair[1].1));
        }
    }

    WindowMask { window, cells }
}

fn fill(line: &mut [bool], span: Option<(usize, usize)>) {
    if let Some((first, last)) = span {
        line[first..=last].iter_mut().for_each(|cell| *cell = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, MultiPoint};

    fn unit_spec(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(rows, cols, GeoTransform::new(0.0, 0.0, 1.0, 1.0)).unwrap()
    }

    fn cells(set: &CellIndexSet) -> Vec<(usize, usize)> {
        set.iter().collect()
    }

    #[test]
    fn test_aligned_box_all_touched_excludes_edge_neighbours() {
        let zone = ZoneGeometry::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: -2.0),
            (x: 0.0, y: -2.0),
            (x: 0.0, y: 0.0),
        ]);
        let set = rasterize_geometry(0, &zone, &unit_spec(4, 4), RasterizeMode::AllTouched).unwrap();
        assert_eq!(cells(&set), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_all_touched_vs_center_only() {
        // Triangle covering the top-left half of a 2x2 block
        let zone = ZoneGeometry::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: -2.0),
            (x: 0.0, y: 0.0),
        ]);
        let spec = unit_spec(4, 4);

        let touched = rasterize_geometry(0, &zone, &spec, RasterizeMode::AllTouched).unwrap();
        assert_eq!(cells(&touched), vec![(0, 0), (0, 1), (1, 0)]);

        // Centers (0.5,-0.5) inside; (1.5,-0.5) and (0.5,-1.5) lie on the hypotenuse
        let centered = rasterize_geometry(0, &zone, &spec, RasterizeMode::CenterOnly).unwrap();
        assert_eq!(cells(&centered), vec![(0, 0), (0, 1), (1, 0)]);

        let small = ZoneGeometry::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.9, y: 0.0),
            (x: 0.0, y: -1.9),
            (x: 0.0, y: 0.0),
        ]);
        let centered = rasterize_geometry(0, &small, &spec, RasterizeMode::CenterOnly).unwrap();
        assert_eq!(cells(&centered), vec![(0, 0)]);
    }

    #[test]
    fn test_polygon_outside_grid_is_empty() {
        let zone = ZoneGeometry::from(polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 9.0),
            (x: 10.0, y: 10.0),
        ]);
        for mode in [RasterizeMode::AllTouched, RasterizeMode::CenterOnly] {
            let set = rasterize_geometry(0, &zone, &unit_spec(4, 4), mode).unwrap();
            assert!(set.is_empty());
        }
    }

    #[test]
    fn test_point_maps_to_enclosing_cell_in_both_modes() {
        let zone = ZoneGeometry::from(point!(x: 2.0, y: -2.0));
        for mode in [RasterizeMode::AllTouched, RasterizeMode::CenterOnly] {
            let set = rasterize_geometry(0, &zone, &unit_spec(4, 4), mode).unwrap();
            assert_eq!(cells(&set), vec![(2, 2)]);
        }
    }

    #[test]
    fn test_point_outside_grid_is_empty() {
        let zone = ZoneGeometry::Point(MultiPoint::new(vec![point!(x: -5.0, y: 3.0)]));
        let set = rasterize_geometry(0, &zone, &unit_spec(4, 4), RasterizeMode::AllTouched).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_sliver_inside_one_cell() {
        let zone = ZoneGeometry::from(polygon![
            (x: 1.2, y: -1.2),
            (x: 1.3, y: -1.2),
            (x: 1.3, y: -1.3),
            (x: 1.2, y: -1.2),
        ]);
        let spec = unit_spec(4, 4);
        let touched = rasterize_geometry(0, &zone, &spec, RasterizeMode::AllTouched).unwrap();
        assert_eq!(cells(&touched), vec![(1, 1)]);

        let centered = rasterize_geometry(0, &zone, &spec, RasterizeMode::CenterOnly).unwrap();
        assert!(centered.is_empty());
    }

    /// Wobbly ring of `n` vertices around (cx, cy).
    fn wobbly_ring(n: usize, cx: f64, cy: f64, rx: f64, ry: f64) -> geo::Polygon<f64> {
        let coords: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                let r = 1.0 + 0.08 * (7.0 * a).sin() + 0.03 * (31.0 * a).cos();
                (cx + rx * r * a.cos(), cy + ry * r * a.sin())
            })
            .collect();
        geo::Polygon::new(coords.into(), vec![])
    }

    /// Cells covered according to the geo predicates, cell by cell.
    fn covered_by_predicate(
        zone: &MultiPolygon<f64>,
        spec: &GridSpec,
        mode: RasterizeMode,
    ) -> Vec<(usize, usize)> {
        use geo::Intersects;
        let t = &spec.transform;
        let trim = TOUCH_TOLERANCE * t.dlon.min(t.dlat);
        let mut out = Vec::new();
        for row in 0..spec.rows {
            for col in 0..spec.cols {
                let hit = match mode {
                    RasterizeMode::AllTouched => {
                        let cell = t.cell_bounds(row, col).shrink(trim);
                        zone.intersects(&crate::geometry::bbox_to_rect(&cell).to_polygon())
                    }
                    RasterizeMode::CenterOnly => {
                        let (x, y) = t.cell_center(row, col);
                        zone.intersects(&geo::Point::new(x, y))
                    }
                };
                if hit {
                    out.push((row, col));
                }
            }
        }
        out
    }

    #[test]
    fn test_scanline_matches_cell_predicates() {
        let spec = GridSpec::new(40, 50, GeoTransform::new(0.0, 0.0, 0.25, 0.2)).unwrap();
        let outer = wobbly_ring(300, 6.1, -4.05, 4.3, 2.9);
        let hole = wobbly_ring(60, 6.3, -3.9, 1.1, 0.7);
        let island = wobbly_ring(40, 11.07, -6.93, 0.6, 0.45);
        let zone = MultiPolygon::new(vec![
            geo::Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]),
            island,
        ]);
        let geometry = ZoneGeometry::Polygon(zone.clone());

        for mode in [RasterizeMode::AllTouched, RasterizeMode::CenterOnly] {
            let set = rasterize_geometry(0, &geometry, &spec, mode).unwrap();
            assert_eq!(cells(&set), covered_by_predicate(&zone, &spec, mode), "{:?}", mode);
        }
    }

    #[test]
    fn test_hole_cells_are_excluded() {
        let zone = ZoneGeometry::from(polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 3.0, y: 0.0),
                (x: 3.0, y: -3.0),
                (x: 0.0, y: -3.0),
                (x: 0.0, y: 0.0),
            ],
            interiors: [[
                (x: 1.0, y: -1.0),
                (x: 2.0, y: -1.0),
                (x: 2.0, y: -2.0),
                (x: 1.0, y: -2.0),
                (x: 1.0, y: -1.0),
            ]],
        ));
        let set = rasterize_geometry(0, &zone, &unit_spec(4, 4), RasterizeMode::CenterOnly).unwrap();
        assert_eq!(set.len(), 8);
        assert!(!cells(&set).contains(&(1, 1)));
    }

    #[test]
    fn test_detailed_polygon_on_fine_grid_is_fast() {
        // ~1 km grid over the conterminous US and a county-sized outline
        let spec = GridSpec::new(2500, 5900, GeoTransform::new(-125.0, 50.0, 0.01, 0.01)).unwrap();
        let outline = wobbly_ring(4000, -100.0, 38.0, 1.5, 1.0);
        let area = geo::Area::unsigned_area(&outline);
        let zone = ZoneGeometry::from(outline);

        let started = std::time::Instant::now();
        let centered = rasterize_geometry(0, &zone, &spec, RasterizeMode::CenterOnly).unwrap();
        let touched = rasterize_geometry(0, &zone, &spec, RasterizeMode::AllTouched).unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed.as_secs_f64() < 2.0, "rasterization took {:?}", elapsed);
        let expected = area / (0.01 * 0.01);
        assert!((centered.len() as f64 - expected).abs() < 0.01 * expected);
        assert!(touched.len() > centered.len());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("center_only".parse::<RasterizeMode>().unwrap(), RasterizeMode::CenterOnly);
        assert!("nearest".parse::<RasterizeMode>().is_err());
    }
}
