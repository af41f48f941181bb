use ndarray::{ArrayD, IxDyn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    coord::Coord,
    cube::Cube,
    lazy::Payload,
    metadata::CubeMetadata,
};

/// Deterministic pseudo-random temperatures for a given seed.
pub(crate) fn random_data(shape: &[usize], seed: u64) -> ArrayD<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = shape.iter().product();
    let values: Vec<f64> = (0..len).map(|_| rng.gen_range(200.0..320.0)).collect();
    ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
}

/// A 2x3 latitude/longitude cube with no scalar coordinates.
pub(crate) fn grid_cube(name: &str, seed: u64) -> Cube {
    let payload = Payload::from(random_data(&[2, 3], seed));
    Cube::new(CubeMetadata::new(name, "K"), payload)
        .with_dim_coord(0, Coord::new("latitude", "degrees", vec![-10.0, 10.0]))
        .unwrap()
        .with_dim_coord(1, Coord::new("longitude", "degrees", vec![0.0, 120.0, 240.0]))
        .unwrap()
}

/// A grid cube carrying one scalar coordinate, e.g. `altitude = 1`.
pub(crate) fn scalar_cube(name: &str, coord: &str, value: f64, seed: u64) -> Cube {
    grid_cube(name, seed)
        .with_scalar_coord(Coord::scalar(coord, "m", value))
        .unwrap()
}

/// A time/latitude cube fragment: `len` instants from `t0` spaced by
/// `step`, optionally with contiguous cell bounds.
pub(crate) fn time_series(
    name: &str,
    t0: i64,
    len: usize,
    step: i64,
    bounded: bool,
    seed: u64,
) -> Cube {
    let instants: Vec<i64> = (0..len).map(|index| t0 + (index as i64) * step).collect();
    let mut time = Coord::from_values("time", "seconds since 1970-01-01", &instants);
    if bounded {
        let bounds = instants
            .iter()
            .map(|&instant| (instant as f64, (instant + step) as f64))
            .collect();
        time = time.with_bounds(bounds).unwrap();
    }
    let payload = Payload::from(random_data(&[len, 2], seed));
    Cube::new(CubeMetadata::new(name, "K"), payload)
        .with_dim_coord(0, time)
        .unwrap()
        .with_dim_coord(1, Coord::new("latitude", "degrees", vec![-10.0, 10.0]))
        .unwrap()
}
