use tracing::{debug, trace};

use crate::{
    coord::{fmt_value, Coord, Direction},
    cube::{AuxCoord, Cube},
    errors::{Error, Result},
    lazy::Payload,
    signature::{concat_key, ConcatKey},
};

/// How point-only coordinates (no cell bounds) must meet at fragment
/// junctions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContiguityPolicy {
    /// Any strictly monotonic, non-overlapping interleaving is accepted.
    #[default]
    Permissive,
    /// Junction gaps must equal the neighbouring fragment's point spacing.
    Strict,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConcatenateOptions {
    pub contiguity: ContiguityPolicy,
}

/// Concatenate a collection of cubes by extending dimension coordinates.
///
/// Cubes are grouped by everything except the extent of one dimension
/// coordinate (and the values of anything else spanning that dimension).
/// Each group's fragments are ordered by their leading edge in a single
/// shared direction and joined end-to-end; consecutive fragments must not
/// overlap, and with bounds present the trailing cell edge of one fragment
/// must meet the leading edge of the next. Cubes without a partner pass
/// through unchanged.
///
/// Groups are combined independently; a failure in one group is reported
/// only after every group has been attempted.
pub fn concatenate(cubes: &[Cube], options: ConcatenateOptions) -> Result<Vec<Cube>> {
    if cubes.is_empty() {
        return Ok(vec![]);
    }

    let mut protos: Vec<Proto> = vec![];
    for cube in cubes {
        let keys: Vec<(usize, ConcatKey)> = (0..cube.ndim())
            .filter_map(|axis| concat_key(cube, axis).map(|key| (axis, key)))
            .collect();

        let mut joined = false;
        for proto in protos.iter_mut() {
            if let Some(axis) = proto.matching_axis(&keys) {
                proto.axis = Some(axis);
                proto.keys.retain(|(dim, _)| *dim == axis);
                proto.members.push(cube);
                joined = true;
                break;
            }
        }
        if !joined {
            protos.push(Proto {
                axis: None,
                keys,
                members: vec![cube],
            });
        }
    }
    debug!(
        cubes = cubes.len(),
        groups = protos.len(),
        "grouped cubes for concatenation"
    );

    let mut joined = Vec::with_capacity(protos.len());
    let mut failure = None;
    for proto in protos {
        if proto.members.len() == 1 {
            joined.push(proto.members[0].clone());
        } else if let Some(axis) = proto.axis {
            match concatenate_group(axis, &proto.members, options) {
                Ok(cube) => joined.push(cube),
                Err(err) => failure = failure.or(Some(err)),
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(joined),
    }
}

/// A group under construction. Until a second member joins, every axis
/// with a dimension coordinate is still a candidate; the first partnered
/// pair locks the axis.
struct Proto<'a> {
    axis: Option<usize>,
    keys: Vec<(usize, ConcatKey)>,
    members: Vec<&'a Cube>,
}

impl Proto<'_> {
    fn matching_axis(&self, keys: &[(usize, ConcatKey)]) -> Option<usize> {
        match self.axis {
            Some(axis) => keys
                .iter()
                .find(|(dim, key)| {
                    *dim == axis
                        && self
                            .keys
                            .iter()
                            .any(|(proto_dim, proto_key)| *proto_dim == axis && proto_key == key)
                })
                .map(|(dim, _)| *dim),
            None => keys
                .iter()
                .find(|(dim, key)| {
                    self.keys
                        .iter()
                        .any(|(proto_dim, proto_key)| proto_dim == dim && proto_key == key)
                })
                .map(|(dim, _)| *dim),
        }
    }
}

fn concatenate_group(axis: usize, members: &[&Cube], options: ConcatenateOptions) -> Result<Cube> {
    let mut coords = Vec::with_capacity(members.len());
    for member in members {
        let coord = member.dim_coord(axis).ok_or_else(|| {
            Error::Coordinate(format!(
                "dimension {axis} has no coordinate on a group member"
            ))
        })?;
        coords.push(coord);
    }
    let coord_name = coords[0].name().to_string();

    // One shared direction across every fragment that has one.
    let mut direction = None;
    for coord in &coords {
        if let Some(found) = coord.direction() {
            match direction {
                None => direction = Some(found),
                Some(chosen) if chosen != found => {
                    return Err(Error::NonMonotonic {
                        coord: coord_name.clone(),
                        detail: "fragments disagree on direction".to_string(),
                    });
                }
                _ => {}
            }
        }
    }
    let direction = direction.unwrap_or(Direction::Ascending);

    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&left, &right| {
        let a = coords[left].first_point();
        let b = coords[right].first_point();
        match direction {
            Direction::Ascending => a.total_cmp(&b),
            Direction::Descending => b.total_cmp(&a),
        }
    });

    for pair in order.windows(2) {
        let a = coords[pair[0]];
        let b = coords[pair[1]];
        check_junction(a, b, direction, options.contiguity, &coord_name)?;
    }

    let sorted: Vec<&Cube> = order.iter().map(|&index| members[index]).collect();
    let ordered_coords: Vec<&Coord> = order.iter().map(|&index| coords[index]).collect();
    trace!(
        coord = coord_name.as_str(),
        axis,
        fragments = sorted.len(),
        "joining cube fragments"
    );
    assemble(axis, &sorted, &ordered_coords)
}

/// Validate the junction between two consecutive fragments.
fn check_junction(
    a: &Coord,
    b: &Coord,
    direction: Direction,
    contiguity: ContiguityPolicy,
    coord_name: &str,
) -> Result<()> {
    let ordered = match direction {
        Direction::Ascending => a.last_point() < b.first_point(),
        Direction::Descending => a.last_point() > b.first_point(),
    };
    if !ordered {
        return Err(Error::NonMonotonic {
            coord: coord_name.to_string(),
            detail: format!(
                "spans [{}, {}] and [{}, {}] overlap",
                fmt_value(a.first_point()),
                fmt_value(a.last_point()),
                fmt_value(b.first_point()),
                fmt_value(b.last_point())
            ),
        });
    }

    if let (Some(trailing), Some(leading)) = (a.trailing_edge(), b.leading_edge()) {
        if trailing != leading {
            return Err(Error::NonMonotonic {
                coord: coord_name.to_string(),
                detail: format!(
                    "bounds are not contiguous: cell edge {} does not meet {}",
                    fmt_value(trailing),
                    fmt_value(leading)
                ),
            });
        }
        return Ok(());
    }

    if contiguity == ContiguityPolicy::Strict {
        let step = a.tail_step().or_else(|| b.head_step());
        if let Some(step) = step {
            let gap = b.first_point() - a.last_point();
            if gap != step {
                return Err(Error::NonMonotonic {
                    coord: coord_name.to_string(),
                    detail: format!(
                        "gap {} between {} and {} does not match point spacing {}",
                        fmt_value(gap),
                        fmt_value(a.last_point()),
                        fmt_value(b.first_point()),
                        fmt_value(step)
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Build the extended cube from fragments already in junction order.
fn assemble(axis: usize, sorted: &[&Cube], ordered_coords: &[&Coord]) -> Result<Cube> {
    let template = sorted[0];

    let parts: Vec<Payload> = sorted.iter().map(|member| member.payload().clone()).collect();
    let payload = Payload::concatenated(axis, parts)?;

    let joined_coord = Coord::concat_along(ordered_coords, 0)?;

    let mut dim_coords = template.dim_coords.clone();
    dim_coords[axis] = Some(joined_coord);

    let aux_coords = extended_entries(sorted, |cube| &cube.aux_coords, axis)?;
    let cell_measures = extended_entries(sorted, |cube| &cube.cell_measures, axis)?;
    let ancillary_variables = extended_entries(sorted, |cube| &cube.ancillary_variables, axis)?;

    Ok(Cube {
        metadata: template.metadata.clone(),
        payload,
        dim_coords,
        aux_coords,
        cell_measures,
        ancillary_variables,
    })
}

/// Copy a list of auxiliary entries from the leading fragment, extending
/// any entry that spans the concatenation axis with the matching entries
/// of the remaining fragments.
fn extended_entries<'a, F>(sorted: &[&'a Cube], list: F, axis: usize) -> Result<Vec<AuxCoord>>
where
    F: Fn(&'a Cube) -> &'a Vec<AuxCoord>,
{
    list(sorted[0])
        .iter()
        .map(|entry| {
            let Some(position) = entry.dims.iter().position(|&dim| dim == axis) else {
                return Ok(entry.clone());
            };
            let mut parts: Vec<&Coord> = Vec::with_capacity(sorted.len());
            for member in sorted {
                let found = list(member)
                    .iter()
                    .find(|candidate| candidate.coord.name() == entry.coord.name())
                    .ok_or_else(|| {
                        Error::Coordinate(format!(
                            "coordinate '{}' missing from a fragment",
                            entry.coord.name()
                        ))
                    })?;
                parts.push(&found.coord);
            }
            Ok(AuxCoord {
                coord: Coord::concat_along(&parts, position)?,
                dims: entry.dims.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_singleton_passes_through() {
        let cube = testing::time_series("air_temperature", 0, 3, 10, true, 1);
        let joined = concatenate(&[cube.clone()], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined, vec![cube]);
    }

    #[test]
    fn test_bounded_fragments_join_in_any_order() {
        let a = testing::time_series("air_temperature", 0, 1, 10, true, 1);
        let b = testing::time_series("air_temperature", 10, 1, 10, true, 2);
        let c = testing::time_series("air_temperature", 20, 1, 10, true, 3);

        let joined = concatenate(&[b, c, a], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined.len(), 1);
        let result = &joined[0];
        assert_eq!(result.shape(), vec![3, 2]);

        let time = result.dim_coord(0).unwrap();
        assert_eq!(time.points.as_slice().unwrap(), &[0.0, 10.0, 20.0]);
        assert_eq!(time.leading_edge(), Some(0.0));
        assert_eq!(time.trailing_edge(), Some(30.0));
    }

    #[test]
    fn test_bounds_gap_is_rejected() {
        let a = testing::time_series("air_temperature", 0, 1, 10, true, 1);
        let c = testing::time_series("air_temperature", 20, 1, 10, true, 3);
        let err = concatenate(&[a, c], ConcatenateOptions::default()).unwrap_err();
        match err {
            Error::NonMonotonic { coord, detail } => {
                assert_eq!(coord, "time");
                assert!(detail.contains("not contiguous"));
            }
            other => panic!("expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_overlap_is_rejected() {
        let a = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let b = testing::time_series("air_temperature", 20, 3, 10, false, 2);
        let err = concatenate(&[a, b], ConcatenateOptions::default()).unwrap_err();
        match err {
            Error::NonMonotonic { detail, .. } => assert!(detail.contains("overlap")),
            other => panic!("expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_point_gap_is_permitted_by_default() {
        let a = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let b = testing::time_series("air_temperature", 100, 3, 10, false, 2);
        let joined = concatenate(&[a, b], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined.len(), 1);
        let time = joined[0].dim_coord(0).unwrap();
        assert_eq!(
            time.points.as_slice().unwrap(),
            &[0.0, 10.0, 20.0, 100.0, 110.0, 120.0]
        );
    }

    #[test]
    fn test_point_gap_is_rejected_when_strict() {
        let a = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let b = testing::time_series("air_temperature", 100, 3, 10, false, 2);
        let options = ConcatenateOptions {
            contiguity: ContiguityPolicy::Strict,
        };
        let err = concatenate(&[a, b], options).unwrap_err();
        match err {
            Error::NonMonotonic { detail, .. } => {
                assert!(detail.contains("does not match point spacing"));
            }
            other => panic!("expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_adjacent_fragments_pass_strict_policy() {
        let a = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let b = testing::time_series("air_temperature", 30, 3, 10, false, 2);
        let options = ConcatenateOptions {
            contiguity: ContiguityPolicy::Strict,
        };
        let joined = concatenate(&[b, a], options).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].shape(), vec![6, 2]);
    }

    #[test]
    fn test_direction_disagreement_is_rejected() {
        let ascending = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let descending = testing::time_series("air_temperature", 70, 3, -10, false, 2);
        let err = concatenate(&[ascending, descending], ConcatenateOptions::default()).unwrap_err();
        match err {
            Error::NonMonotonic { detail, .. } => assert!(detail.contains("direction")),
            other => panic!("expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_descending_fragments_stay_descending() {
        let high = testing::time_series("air_temperature", 50, 3, -10, false, 1);
        let low = testing::time_series("air_temperature", 20, 3, -10, false, 2);
        let joined = concatenate(&[low, high], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined.len(), 1);
        let time = joined[0].dim_coord(0).unwrap();
        assert_eq!(
            time.points.as_slice().unwrap(),
            &[50.0, 40.0, 30.0, 20.0, 10.0, 0.0]
        );
        assert_eq!(time.direction(), Some(Direction::Descending));
    }

    #[test]
    fn test_unrelated_cubes_pass_through() {
        let a = testing::time_series("air_temperature", 0, 3, 10, false, 1);
        let other = testing::time_series("air_pressure", 30, 3, 10, false, 2);
        let joined = concatenate(&[a.clone(), other.clone()], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined, vec![a, other]);
    }

    #[test]
    fn test_cube_without_dim_coords_passes_through() {
        let cube = testing::grid_cube("air_temperature", 1);
        let bare = Cube::new(cube.metadata.clone(), cube.payload.clone());
        let joined = concatenate(&[bare.clone()], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined, vec![bare]);
    }

    #[test]
    fn test_spanning_aux_coord_is_extended() {
        let with_period = |cube: Cube, start: f64| {
            let len = cube.shape()[0];
            let points: Vec<f64> = (0..len).map(|i| start + i as f64).collect();
            cube.with_aux_coord(Coord::new("forecast_period", "h", points), &[0])
                .unwrap()
        };
        let a = with_period(testing::time_series("air_temperature", 0, 2, 10, true, 1), 0.0);
        let b = with_period(testing::time_series("air_temperature", 20, 2, 10, true, 2), 2.0);

        let joined = concatenate(&[b, a], ConcatenateOptions::default()).unwrap();
        assert_eq!(joined.len(), 1);
        let period = joined[0].coord("forecast_period").unwrap();
        assert_eq!(period.points.as_slice().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
    }

    mod properties {
        use proptest::prelude::*;
        use proptest::sample::subsequence;
        use proptest::test_runner::Config;

        use super::*;

        proptest! {
            #![proptest_config(Config::with_cases(64))]
            #[test]
            fn any_contiguous_partition_reassembles(
                cuts in subsequence((1..12_usize).collect::<Vec<_>>(), 0..4)
            ) {
                let mut edges = vec![0];
                edges.extend(cuts);
                edges.push(12);

                let fragments: Vec<Cube> = edges
                    .windows(2)
                    .enumerate()
                    .map(|(index, window)| {
                        testing::time_series(
                            "air_temperature",
                            window[0] as i64 * 10,
                            window[1] - window[0],
                            10,
                            true,
                            index as u64,
                        )
                    })
                    .collect();

                let joined = concatenate(&fragments, ConcatenateOptions::default()).unwrap();
                prop_assert_eq!(joined.len(), 1);
                let time = joined[0].dim_coord(0).unwrap();
                let expected: Vec<f64> = (0..12).map(|i| (i * 10) as f64).collect();
                prop_assert_eq!(time.points.as_slice().unwrap(), expected.as_slice());
                prop_assert_eq!(joined[0].shape(), vec![12, 2]);
            }
        }
    }
}
