//! Deterministic tiling of the globe into padded, square UTM tiles.
//!
//! A [`Grid`] (resolution, tile size, pad) divides every UTM zone into
//! cells anchored at the zone origin. Tiles are named by stable string keys
//! such as `2048:16:30.0:15:3:80`, so the same region always yields the same
//! tiles.
//!
//! ```no_run
//! use dltile::{Geometry, Grid};
//!
//! let grid = Grid::new(30.0, 2048, 16)?;
//! let aoi: Geometry = r#"{"type": "Point", "coordinates": [-90.2, 44.8]}"#.parse()?;
//! for tile in grid.tiles_from_geometry(&aoi)?.iter() {
//!     println!("{} {:?}", tile, tile.padded_bounds());
//! }
//! # Ok::<(), dltile::TileError>(())
//! ```

pub mod affine;
pub mod context;
pub mod cover;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod proj;
pub mod rasterize;
pub mod tile;
pub mod transform;

pub use affine::Affine;
pub use context::{Bounds, GeoContext};
pub use cover::{TileCover, Tiles};
pub use crs::{resolve_crs, Hemisphere, UtmZone};
pub use error::{ProjError, TileError};
pub use geometry::{GeoInterface, Geometry};
pub use grid::Grid;
pub use rasterize::{rasterize_into, rasterize_shapes, RasterizeMode};
pub use tile::{AssignOptions, Subtiles, SubtileOptions, Tile, TileKey};
pub use transform::PixelTransform;
