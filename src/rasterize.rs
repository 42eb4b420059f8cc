//! Rasterization of lon/lat shapes onto a tile's padded pixel grid.
//!
//! Each shape is projected into the tile's pixel space and burned with a
//! quadtree over pixel blocks: blocks the shape misses are skipped, blocks it
//! covers are filled at once, and blocks of at most 3x3 pixels are tested
//! pixel by pixel.

use geo::{Coord, Rect};
use ndarray::{s, Array2, ArrayViewMut2};
use num_traits::{Num, NumCast};

use crate::error::TileError;
use crate::geometry::{Footprint, Geometry};
use crate::tile::Tile;

/// Blocks at most this many pixels on each side are tested pixel by pixel.
const LEAF_SIZE: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RasterizeMode {
    /// Overwrite pixels with the shape's value.
    #[default]
    Burn,
    /// Add the shape's value to pixels.
    Add,
}

impl RasterizeMode {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "burn" => Some(Self::Burn),
            "add" => Some(Self::Add),
            _ => None,
        }
    }
}

/// Rasterize `shapes` into a new `tile_extent` x `tile_extent` array.
///
/// Without `values`, burning writes `i + 1` for the i-th shape and adding
/// adds 1. A pixel is affected when its center lies in the shape, or with
/// `all_touched` when any part of it touches the shape.
pub fn rasterize_shapes<T>(
    tile: &Tile,
    shapes: &[Geometry],
    values: Option<&[T]>,
    mode: RasterizeMode,
    all_touched: bool,
) -> Result<Array2<T>, TileError>
where
    T: Copy + Num + NumCast,
{
    let n = tile.tile_extent() as usize;
    let mut out = Array2::zeros((n, n));
    rasterize_into(tile, shapes, values, mode, all_touched, out.view_mut())?;
    Ok(out)
}

/// Like [`rasterize_shapes`], writing into an existing array.
pub fn rasterize_into<T>(
    tile: &Tile,
    shapes: &[Geometry],
    values: Option<&[T]>,
    mode: RasterizeMode,
    all_touched: bool,
    mut out: ArrayViewMut2<'_, T>,
) -> Result<(), TileError>
where
    T: Copy + Num + NumCast,
{
    let n = tile.tile_extent() as usize;
    if out.dim() != (n, n) {
        return Err(TileError::InvalidParameter(format!(
            "output array is {:?}, expected ({n}, {n})",
            out.dim()
        )));
    }
    let values = shape_values(shapes.len(), values, mode)?;

    let bounds = tile.padded_bounds();
    let resolution = tile.resolution();
    let to_pixel = move |c: Coord<f64>| Coord {
        x: (c.x - bounds.min_x) / resolution,
        y: (bounds.max_y - c.y) / resolution,
    };

    let mut total = 0;
    for (shape, value) in shapes.iter().zip(values) {
        shape.validate()?;
        let footprint = shape.project(&tile.zone())?.map(to_pixel);
        let burned = burn(&footprint, value, mode, all_touched, &mut out);
        tracing::trace!(tile = %tile, pixels = burned, "rasterized shape");
        total += burned;
    }
    tracing::debug!(
        tile = %tile,
        shapes = shapes.len(),
        pixels = total,
        ?mode,
        all_touched,
        "rasterized shapes"
    );
    Ok(())
}

fn shape_values<T>(
    count: usize,
    values: Option<&[T]>,
    mode: RasterizeMode,
) -> Result<Vec<T>, TileError>
where
    T: Copy + Num + NumCast,
{
    match values {
        Some(v) if v.len() != count => Err(TileError::InvalidParameter(format!(
            "expected {count} values, one per shape, got {}",
            v.len()
        ))),
        Some(v) => Ok(v.to_vec()),
        None => match mode {
            RasterizeMode::Add => Ok(vec![T::one(); count]),
            RasterizeMode::Burn => (1..=count)
                .map(|i| {
                    <T as NumCast>::from(i).ok_or_else(|| {
                        TileError::InvalidParameter(format!(
                            "shape index {i} does not fit the output type"
                        ))
                    })
                })
                .collect(),
        },
    }
}

fn pixel_rect(min_col: f64, min_row: f64, max_col: f64, max_row: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: min_col,
            y: min_row,
        },
        Coord {
            x: max_col,
            y: max_row,
        },
    )
}

/// A block of pixels `[min_col, max_col) x [min_row, max_row)`.
#[derive(Clone, Copy, Debug)]
struct Node {
    min_col: usize,
    min_row: usize,
    max_col: usize,
    max_row: usize,
}

impl Node {
    fn width(&self) -> usize {
        self.max_col - self.min_col
    }

    fn height(&self) -> usize {
        self.max_row - self.min_row
    }

    /// Box that must lie inside the shape for every pixel to be affected.
    fn inner(&self, all_touched: bool) -> Option<Rect<f64>> {
        let inset = if all_touched { 1.0 } else { 0.5 };
        let (c0, r0) = (self.min_col as f64 + inset, self.min_row as f64 + inset);
        let (c1, r1) = (self.max_col as f64 - inset, self.max_row as f64 - inset);
        (c0 < c1 && r0 < r1).then(|| pixel_rect(c0, r0, c1, r1))
    }

    fn outer(&self) -> Rect<f64> {
        pixel_rect(
            self.min_col as f64,
            self.min_row as f64,
            self.max_col as f64,
            self.max_row as f64,
        )
    }

    fn split(&self, stack: &mut Vec<Node>) {
        let mid_col = (self.min_col + self.max_col) / 2;
        let mid_row = (self.min_row + self.max_row) / 2;
        let with = |min_col, min_row, max_col, max_row| Node {
            min_col,
            min_row,
            max_col,
            max_row,
        };
        if self.height() <= 1 {
            stack.push(with(self.min_col, self.min_row, mid_col, self.max_row));
            stack.push(with(mid_col, self.min_row, self.max_col, self.max_row));
        } else if self.width() <= 1 {
            stack.push(with(self.min_col, self.min_row, self.max_col, mid_row));
            stack.push(with(self.min_col, mid_row, self.max_col, self.max_row));
        } else {
            stack.push(with(self.min_col, self.min_row, mid_col, mid_row));
            stack.push(with(mid_col, self.min_row, self.max_col, mid_row));
            stack.push(with(self.min_col, mid_row, mid_col, self.max_row));
            stack.push(with(mid_col, mid_row, self.max_col, self.max_row));
        }
    }
}

/// Burn one pixel-space footprint; returns the number of pixels affected.
fn burn<T>(
    footprint: &Footprint,
    value: T,
    mode: RasterizeMode,
    all_touched: bool,
    out: &mut ArrayViewMut2<'_, T>,
) -> usize
where
    T: Copy + Num,
{
    let (rows, cols) = out.dim();
    let mut affected = 0;
    let mut stack = vec![Node {
        min_col: 0,
        min_row: 0,
        max_col: cols,
        max_row: rows,
    }];

    while let Some(node) = stack.pop() {
        if node.width() == 0 || node.height() == 0 {
            continue;
        }
        if node.width() <= LEAF_SIZE && node.height() <= LEAF_SIZE {
            for row in node.min_row..node.max_row {
                for col in node.min_col..node.max_col {
                    let hit = if all_touched {
                        let (c, r) = (col as f64, row as f64);
                        footprint.intersects_rect(&pixel_rect(c, r, c + 1.0, r + 1.0))
                    } else {
                        footprint.intersects_coord(Coord {
                            x: col as f64 + 0.5,
                            y: row as f64 + 0.5,
                        })
                    };
                    if hit {
                        let px = &mut out[[row, col]];
                        *px = match mode {
                            RasterizeMode::Burn => value,
                            RasterizeMode::Add => *px + value,
                        };
                        affected += 1;
                    }
                }
            }
        } else if node
            .inner(all_touched)
            .is_some_and(|inner| footprint.contains_rect(&inner))
        {
            let mut block =
                out.slice_mut(s![node.min_row..node.max_row, node.min_col..node.max_col]);
            match mode {
                RasterizeMode::Burn => block.fill(value),
                RasterizeMode::Add => block.mapv_inplace(|v| v + value),
            }
            affected += node.width() * node.height();
        } else if footprint.intersects_rect(&node.outer()) {
            node.split(&mut stack);
        }
    }
    affected
}
