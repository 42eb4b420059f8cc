use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dltile::{rasterize_shapes, Geometry, Grid, RasterizeMode, Tile};

const WISCONSIN: &str = r#"{"type": "Polygon", "coordinates": [[
    [-90.1897158, 44.2267595], [-87.9570052, 43.8067829],
    [-88.5766841, 42.1269533], [-90.7457357, 42.5435965],
    [-90.1897158, 44.2267595]]]}"#;

fn make_shape() -> Geometry {
    WISCONSIN.parse().unwrap()
}

fn bench_tiles_from_geometry(c: &mut Criterion) {
    let shape = make_shape();
    for &resolution in &[60.0, 30.0, 10.0] {
        let grid = Grid::new(resolution, 1024, 16).unwrap();
        c.bench_function(&format!("cover_sequential_{resolution}m"), |b| {
            b.iter(|| black_box(grid.tiles_from_geometry(&shape).unwrap().iter().count()));
        });
        c.bench_function(&format!("cover_parallel_{resolution}m"), |b| {
            b.iter(|| black_box(grid.tiles_from_geometry(&shape).unwrap().par_tiles().len()));
        });
    }
}

fn bench_key_parse(c: &mut Criterion) {
    c.bench_function("tile_from_key", |b| {
        b.iter(|| black_box(Tile::from_key(black_box("2048:16:30.0:15:3:80")).unwrap()));
    });
}

fn bench_pixel_transforms(c: &mut Criterion) {
    let tile = Tile::from_key("2048:16:30.0:15:3:80").unwrap();
    let transform = tile.transform().unwrap();
    let rows: Vec<f64> = (0..10_000).map(|i| (i % 2080) as f64).collect();
    let cols: Vec<f64> = (0..10_000).map(|i| (i / 5 % 2080) as f64).collect();

    c.bench_function("rowcols_to_lonlats_10k", |b| {
        b.iter(|| black_box(transform.rowcols_to_lonlats(&rows, &cols).unwrap()));
    });

    let lonlats = transform.rowcols_to_lonlats(&rows, &cols).unwrap();
    let (lons, lats): (Vec<f64>, Vec<f64>) = lonlats.into_iter().unzip();
    c.bench_function("lonlats_to_rowcols_10k", |b| {
        b.iter(|| black_box(transform.lonlats_to_rowcols(&lons, &lats).unwrap()));
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let shape = make_shape();
    let tile = Grid::new(30.0, 512, 0)
        .unwrap()
        .tile_from_lonlat(-89.5, 43.2)
        .unwrap();
    let shapes = [shape];
    for &all_touched in &[false, true] {
        c.bench_function(&format!("rasterize_512_all_touched_{all_touched}"), |b| {
            b.iter(|| {
                black_box(
                    rasterize_shapes::<u8>(&tile, &shapes, None, RasterizeMode::Burn, all_touched)
                        .unwrap(),
                )
            });
        });
    }
}

criterion_group!(
    benches,
    bench_tiles_from_geometry,
    bench_key_parse,
    bench_pixel_transforms,
    bench_rasterize,
);
criterion_main!(benches);
