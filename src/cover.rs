//! Enumeration of the grid cells covering a projected geometry.
//!
//! Candidate cells come from the geometry's projected bounding box. Each
//! row of candidates is bisected over column ranges: ranges disjoint from
//! the geometry are dropped, ranges fully inside it are emitted whole, and
//! short ranges are tested cell by cell. Tiles come out north to south,
//! west to east within a row.

use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use geo::{Coord, Rect};
use rayon::prelude::*;

use crate::crs::UtmZone;
use crate::error::TileError;
use crate::geometry::Footprint;
use crate::grid::Grid;
use crate::tile::Tile;

/// Column ranges at most this wide are tested cell by cell.
const LEAF_WIDTH: i64 = 3;

/// A lazily enumerated set of tiles covering one geometry.
///
/// Cloning is cheap; the projected geometry is shared.
#[derive(Clone, Debug)]
pub struct TileCover {
    grid: Grid,
    zone: UtmZone,
    footprint: Arc<Footprint>,
    rows: Range<i64>,
    cols: Range<i64>,
}

/// Half-open index range of the cells overlapping `[min, max]` along one
/// axis, never empty.
fn index_range(min: f64, max: f64, width: f64) -> Range<i64> {
    let start = (min / width).floor() as i64;
    let end = ((max / width).ceil() as i64).max(start + 1);
    start..end
}

impl TileCover {
    pub(crate) fn new(grid: Grid, zone: UtmZone, footprint: Footprint) -> Result<Self, TileError> {
        let bounds = footprint
            .bounds()
            .ok_or_else(|| TileError::InvalidGeometry("geometry is empty".into()))?;
        let w = grid.cell_width();
        let cols = index_range(
            bounds.min().x - zone.false_easting(),
            bounds.max().x - zone.false_easting(),
            w,
        );
        let rows = index_range(
            bounds.min().y - zone.false_northing(),
            bounds.max().y - zone.false_northing(),
            w,
        );
        tracing::debug!(
            zone = %zone,
            grid = %grid,
            rows = ?rows,
            cols = ?cols,
            "planned tile cover"
        );
        Ok(Self {
            grid,
            zone,
            footprint: Arc::new(footprint),
            rows,
            cols,
        })
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// Grid rows spanned by the geometry's bounding box.
    pub fn row_range(&self) -> Range<i64> {
        self.rows.clone()
    }

    pub fn col_range(&self) -> Range<i64> {
        self.cols.clone()
    }

    /// Upper bound on the number of tiles: every cell of the bounding box.
    /// Saturates at `u64::MAX`.
    pub fn candidate_count(&self) -> u64 {
        let rows = self.rows.end.abs_diff(self.rows.start);
        let cols = self.cols.end.abs_diff(self.cols.start);
        rows.saturating_mul(cols)
    }

    /// Start a fresh enumeration.
    pub fn iter(&self) -> Tiles {
        Tiles {
            cover: self.clone(),
            next_row: self.rows.end - 1,
            row: self.rows.end - 1,
            cols: Vec::new().into_iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = String> {
        self.iter().map(|tile| tile.key().to_string())
    }

    /// Materialize every tile using the rayon pool, in iteration order.
    pub fn par_tiles(&self) -> Vec<Tile> {
        let n_rows = (self.rows.end - self.rows.start) as usize;
        (0..n_rows)
            .into_par_iter()
            .flat_map_iter(|k| {
                let row = self.rows.end - 1 - k as i64;
                self.row_cols(row)
                    .into_iter()
                    .map(move |col| self.grid.tile(self.zone, col, row))
            })
            .collect()
    }

    /// Unpadded ground extent of cells `cols` in `row`.
    fn span(&self, row: i64, cols: Range<i64>) -> Rect<f64> {
        let w = self.grid.cell_width();
        let x0 = self.zone.false_easting();
        let y0 = self.zone.false_northing();
        Rect::new(
            Coord {
                x: x0 + cols.start as f64 * w,
                y: y0 + row as f64 * w,
            },
            Coord {
                x: x0 + cols.end as f64 * w,
                y: y0 + (row + 1) as f64 * w,
            },
        )
    }

    /// Columns of `row` whose cells intersect the geometry, ascending.
    fn row_cols(&self, row: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut stack = vec![self.cols.clone()];
        while let Some(cols) = stack.pop() {
            if !self.footprint.intersects_rect(&self.span(row, cols.clone())) {
                continue;
            }
            if cols.end - cols.start <= LEAF_WIDTH {
                out.extend(
                    cols.filter(|&c| self.footprint.intersects_rect(&self.span(row, c..c + 1))),
                );
                continue;
            }
            if self.footprint.contains_rect(&self.span(row, cols.clone())) {
                out.extend(cols);
                continue;
            }
            let mid = cols.start + (cols.end - cols.start) / 2;
            // left half is popped first
            stack.push(mid..cols.end);
            stack.push(cols.start..mid);
        }
        out
    }
}

impl IntoIterator for &TileCover {
    type Item = Tile;
    type IntoIter = Tiles;

    fn into_iter(self) -> Tiles {
        self.iter()
    }
}

impl IntoIterator for TileCover {
    type Item = Tile;
    type IntoIter = Tiles;

    fn into_iter(self) -> Tiles {
        self.iter()
    }
}

/// Iterator over a [`TileCover`], holding at most one row of columns.
#[derive(Clone, Debug)]
pub struct Tiles {
    cover: TileCover,
    next_row: i64,
    row: i64,
    cols: std::vec::IntoIter<i64>,
}

impl Iterator for Tiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        loop {
            if let Some(col) = self.cols.next() {
                return Some(self.cover.grid.tile(self.cover.zone, col, self.row));
            }
            if self.next_row < self.cover.rows.start {
                return None;
            }
            self.row = self.next_row;
            self.next_row -= 1;
            let cols = self.cover.row_cols(self.row);
            tracing::trace!(row = self.row, tiles = cols.len(), "enumerated row");
            self.cols = cols.into_iter();
        }
    }
}

impl FusedIterator for Tiles {}
