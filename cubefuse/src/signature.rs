use crate::{
    coord::Coord,
    cube::{AuxCoord, Cube},
    lazy::Dtype,
    metadata::{CoordMetadata, CubeMetadata},
};

/// Everything that must match for two cubes to merge, with scalar
/// coordinate values deliberately left out: those are the values a merge
/// stacks into a new dimension.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MergeKey {
    metadata: CubeMetadata,
    dtype: Dtype,
    shape: Vec<usize>,
    dim_coords: Vec<(usize, Coord)>,
    aux_coords: Vec<AuxCoord>,
    cell_measures: Vec<AuxCoord>,
    ancillary_variables: Vec<AuxCoord>,
    scalars: Vec<ScalarDef>,
}

/// A scalar coordinate's identity without its value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScalarDef {
    metadata: CoordMetadata,
    bounded: bool,
    circular: bool,
}

pub(crate) fn merge_key(cube: &Cube) -> MergeKey {
    let mut scalars: Vec<ScalarDef> = cube
        .scalar_coords()
        .map(|entry| ScalarDef {
            metadata: entry.coord.metadata.clone(),
            bounded: entry.coord.bounds.is_some(),
            circular: entry.coord.circular,
        })
        .collect();
    scalars.sort_by(|a, b| a.metadata.name().cmp(b.metadata.name()));

    MergeKey {
        metadata: cube.metadata().clone(),
        dtype: cube.payload().dtype(),
        shape: cube.shape(),
        dim_coords: dim_coord_entries(cube),
        aux_coords: sorted_by_name(
            cube.aux_coords()
                .iter()
                .filter(|entry| !entry.dims.is_empty())
                .cloned()
                .collect(),
        ),
        cell_measures: sorted_by_name(cube.cell_measures().to_vec()),
        ancillary_variables: sorted_by_name(cube.ancillary_variables().to_vec()),
        scalars,
    }
}

/// Everything that must match for two cubes to concatenate along `axis`:
/// the extended dimension coordinate and anything else spanning that axis
/// contribute identity only, not values or extent.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConcatKey {
    axis: usize,
    metadata: CubeMetadata,
    dtype: Dtype,
    shape_rest: Vec<usize>,
    axis_coord: ScalarDef,
    dim_coords_rest: Vec<(usize, Coord)>,
    aux_static: Vec<AuxCoord>,
    aux_spanning: Vec<SpanningDef>,
    measures_static: Vec<AuxCoord>,
    measures_spanning: Vec<SpanningDef>,
    ancillary_static: Vec<AuxCoord>,
    ancillary_spanning: Vec<SpanningDef>,
}

/// Identity of an auxiliary entry that spans the concatenation axis.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpanningDef {
    metadata: CoordMetadata,
    dims: Vec<usize>,
    bounded: bool,
    circular: bool,
}

/// `None` when `axis` carries no dimension coordinate; such an axis cannot
/// be a concatenation candidate.
pub(crate) fn concat_key(cube: &Cube, axis: usize) -> Option<ConcatKey> {
    let axis_coord = cube.dim_coord(axis)?;

    let mut shape_rest = cube.shape();
    shape_rest.remove(axis);

    let (aux_static, aux_spanning) = split_spanning(cube.aux_coords(), axis);
    let (measures_static, measures_spanning) = split_spanning(cube.cell_measures(), axis);
    let (ancillary_static, ancillary_spanning) = split_spanning(cube.ancillary_variables(), axis);

    Some(ConcatKey {
        axis,
        metadata: cube.metadata().clone(),
        dtype: cube.payload().dtype(),
        shape_rest,
        axis_coord: ScalarDef {
            metadata: axis_coord.metadata.clone(),
            bounded: axis_coord.bounds.is_some(),
            circular: axis_coord.circular,
        },
        dim_coords_rest: dim_coord_entries(cube)
            .into_iter()
            .filter(|(dim, _)| *dim != axis)
            .collect(),
        aux_static,
        aux_spanning,
        measures_static,
        measures_spanning,
        ancillary_static,
        ancillary_spanning,
    })
}

fn dim_coord_entries(cube: &Cube) -> Vec<(usize, Coord)> {
    (0..cube.ndim())
        .filter_map(|dim| cube.dim_coord(dim).map(|coord| (dim, coord.clone())))
        .collect()
}

fn sorted_by_name(mut entries: Vec<AuxCoord>) -> Vec<AuxCoord> {
    entries.sort_by(|a, b| a.coord.name().cmp(b.coord.name()));
    entries
}

fn split_spanning(entries: &[AuxCoord], axis: usize) -> (Vec<AuxCoord>, Vec<SpanningDef>) {
    let mut fixed = vec![];
    let mut spanning = vec![];
    for entry in entries {
        if entry.dims.contains(&axis) {
            spanning.push(SpanningDef {
                metadata: entry.coord.metadata.clone(),
                dims: entry.dims.clone(),
                bounded: entry.coord.bounds.is_some(),
                circular: entry.coord.circular,
            });
        } else {
            fixed.push(entry.clone());
        }
    }
    fixed.sort_by(|a, b| a.coord.name().cmp(b.coord.name()));
    spanning.sort_by(|a, b| a.metadata.name().cmp(b.metadata.name()));
    (fixed, spanning)
}

/// Group items by key equality, keeping first-seen key order. Membership is
/// independent of input order; only the order of groups follows it.
pub(crate) fn group_by<K, T>(items: impl IntoIterator<Item = (K, T)>) -> Vec<(K, Vec<T>)>
where
    K: PartialEq,
{
    let mut groups: Vec<(K, Vec<T>)> = vec![];
    for (key, item) in items {
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(item),
            None => groups.push((key, vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_merge_key_ignores_scalar_values() {
        let a = testing::scalar_cube("air_temperature", "altitude", 1.0, 1);
        let b = testing::scalar_cube("air_temperature", "altitude", 2.0, 2);
        assert_eq!(merge_key(&a), merge_key(&b));
    }

    #[test]
    fn test_merge_key_sees_metadata() {
        let a = testing::scalar_cube("air_temperature", "altitude", 1.0, 1);
        let b = testing::scalar_cube("air_pressure", "altitude", 1.0, 1);
        assert_ne!(merge_key(&a), merge_key(&b));
    }

    #[test]
    fn test_merge_key_sees_bounds_presence() {
        let a = testing::scalar_cube("air_temperature", "altitude", 1.0, 1);
        let mut b = testing::scalar_cube("air_temperature", "altitude", 2.0, 2);
        let bounded = b.aux_coords[0]
            .coord
            .clone()
            .with_bounds(vec![(1.5, 2.5)])
            .unwrap();
        b.aux_coords[0].coord = bounded;
        assert_ne!(merge_key(&a), merge_key(&b));
    }

    #[test]
    fn test_concat_key_ignores_axis_extent() {
        let a = testing::time_series("air_temperature", 0, 3, 10, true, 1);
        let b = testing::time_series("air_temperature", 30, 5, 10, true, 2);
        assert_eq!(concat_key(&a, 0), concat_key(&b, 0));
    }

    #[test]
    fn test_concat_key_requires_dim_coord() {
        let a = testing::time_series("air_temperature", 0, 3, 10, true, 1);
        assert!(concat_key(&a, 0).is_some());
        assert!(concat_key(&a, 1).is_some());
        assert!(concat_key(&a, 2).is_none());
    }

    #[test]
    fn test_group_by_membership_ignores_order() {
        let forward = group_by(vec![(1, "a"), (2, "b"), (1, "c")]);
        assert_eq!(forward.len(), 2);
        assert_eq!(forward[0].1, vec!["a", "c"]);
        let backward = group_by(vec![(1, "c"), (1, "a"), (2, "b")]);
        assert_eq!(backward.len(), 2);
    }
}
