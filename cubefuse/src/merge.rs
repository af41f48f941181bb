use ndarray::{Array1, ArrayD, IxDyn};
use tracing::{debug, trace};

use crate::{
    coord::{fmt_value, Coord},
    cube::{AuxCoord, Cube},
    errors::{Error, Result},
    lazy::Payload,
    metadata::quoted_list,
    signature::{group_by, merge_key},
};

/// Merge a collection of cubes by stacking scalar coordinate values into
/// new dimensions.
///
/// Cubes are grouped by everything except their scalar coordinate values.
/// Each group whose members differ in exactly one scalar coordinate is
/// stacked, ascending by that coordinate's value, along a new leading
/// dimension; the input order of cubes never affects the result. Groups of
/// one pass through unchanged. With `unique` set, a repeated stacked value
/// within a group is an error.
///
/// Groups are combined independently; a failure in one group is reported
/// only after every group has been attempted.
pub fn merge(cubes: &[Cube], unique: bool) -> Result<Vec<Cube>> {
    if cubes.is_empty() {
        return Ok(vec![]);
    }

    let groups = group_by(cubes.iter().map(|cube| (merge_key(cube), cube)));
    debug!(
        cubes = cubes.len(),
        groups = groups.len(),
        "grouped cubes for merge"
    );

    let mut merged = Vec::with_capacity(groups.len());
    let mut failure = None;
    for (_, members) in groups {
        if members.len() == 1 {
            merged.push(members[0].clone());
            continue;
        }
        match merge_group(&members, unique) {
            Ok(cube) => merged.push(cube),
            Err(err) => failure = failure.or(Some(err)),
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(merged),
    }
}

fn merge_group(members: &[&Cube], unique: bool) -> Result<Cube> {
    let template = members[0];
    let mut varying: Vec<String> = vec![];
    for entry in template.scalar_coords() {
        let name = entry.coord.name();
        let differs = members[1..]
            .iter()
            .any(|member| member.scalar_coord(name) != Some(&entry.coord));
        if differs {
            varying.push(name.to_string());
        }
    }

    match varying.len() {
        0 => merge_identical(members, unique),
        1 => merge_on_scalar(members, &varying[0], unique),
        _ => Err(Error::IncompatibleMetadata(format!(
            "scalar coordinates {} all differ within the '{}' group; merge can stack exactly one",
            quoted_list(&varying),
            template.name()
        ))),
    }
}

/// A group with no distinguishing scalar coordinate. With `unique` this is
/// a duplicate; otherwise the cubes stack along an anonymous new dimension.
fn merge_identical(members: &[&Cube], unique: bool) -> Result<Cube> {
    let template = members[0];
    if unique {
        return Err(Error::DuplicateData {
            name: template.name().to_string(),
            detail: "with identical metadata and scalar coordinates".to_string(),
        });
    }
    trace!(
        name = template.name(),
        count = members.len(),
        "stacking identical cubes along an anonymous dimension"
    );
    assemble(members, None, None)
}

fn merge_on_scalar(members: &[&Cube], coord_name: &str, unique: bool) -> Result<Cube> {
    let template = members[0];
    let mut entries: Vec<(f64, Option<(f64, f64)>, &Cube)> = Vec::with_capacity(members.len());
    for member in members {
        let coord = member.scalar_coord(coord_name).ok_or_else(|| {
            Error::Coordinate(format!(
                "scalar coordinate '{coord_name}' missing from a group member"
            ))
        })?;
        let bound = coord.bounds.as_ref().map(|bounds| (bounds[[0, 0]], bounds[[0, 1]]));
        entries.push((coord.first_point(), bound, member));
    }

    // Ascending by stacked value; sort_by is stable, so equal values keep
    // their input order.
    entries.sort_by(|a, b| a.0.total_cmp(&b.0));

    if unique {
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                let detail = if pair[0].2.payload() == pair[1].2.payload() {
                    format!(
                        "with scalar coordinate {}={} and identical data",
                        coord_name,
                        fmt_value(pair[0].0)
                    )
                } else {
                    format!(
                        "with coincident scalar coordinate {}={} and differing data",
                        coord_name,
                        fmt_value(pair[0].0)
                    )
                };
                return Err(Error::DuplicateData {
                    name: template.name().to_string(),
                    detail,
                });
            }
        }
    }

    let scalar = template.scalar_coord(coord_name).ok_or_else(|| {
        Error::Coordinate(format!(
            "scalar coordinate '{coord_name}' missing from a group member"
        ))
    })?;
    let points: Vec<f64> = entries.iter().map(|entry| entry.0).collect();
    let bounds = if entries.iter().all(|entry| entry.1.is_some()) {
        let flat: Vec<f64> = entries
            .iter()
            .filter_map(|entry| entry.1)
            .flat_map(|(leading, trailing)| [leading, trailing])
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(&[entries.len(), 2]), flat)
            .map_err(|err| Error::Shape(err.to_string()))?;
        Some(array)
    } else {
        None
    };
    let coord = Coord {
        metadata: scalar.metadata.clone(),
        points: Array1::from(points).into_dyn(),
        bounds,
        circular: scalar.circular,
    };

    let sorted: Vec<&Cube> = entries.iter().map(|entry| entry.2).collect();
    trace!(
        name = template.name(),
        coord = coord_name,
        count = sorted.len(),
        "stacking cubes along a promoted scalar coordinate"
    );
    assemble(&sorted, Some(coord_name), Some(coord))
}

/// Build the merged cube: stack payloads along a new leading axis, shift
/// every dimension mapping up by one and promote the stacked coordinate.
/// A promoted coordinate that is no longer strictly monotonic (repeated
/// values, `unique` off) becomes an auxiliary coordinate on the new
/// dimension.
fn assemble(sorted: &[&Cube], promoted: Option<&str>, coord: Option<Coord>) -> Result<Cube> {
    let template = sorted[0];
    let parts: Vec<Payload> = sorted.iter().map(|member| member.payload().clone()).collect();
    let payload = Payload::stacked(0, parts)?;

    let mut dim_coords: Vec<Option<Coord>> = Vec::with_capacity(template.ndim() + 1);
    let mut aux_coords: Vec<AuxCoord> = vec![];
    match coord {
        Some(coord) if coord.is_strictly_monotonic() => dim_coords.push(Some(coord)),
        Some(coord) => {
            dim_coords.push(None);
            aux_coords.push(AuxCoord {
                coord,
                dims: vec![0],
            });
        }
        None => dim_coords.push(None),
    }
    dim_coords.extend(template.dim_coords.iter().cloned());

    aux_coords.extend(
        template
            .aux_coords
            .iter()
            .filter(|entry| promoted != Some(entry.coord.name()))
            .map(shift_dims),
    );
    let cell_measures = template.cell_measures.iter().map(shift_dims).collect();
    let ancillary_variables = template.ancillary_variables.iter().map(shift_dims).collect();

    Ok(Cube {
        metadata: template.metadata.clone(),
        payload,
        dim_coords,
        aux_coords,
        cell_measures,
        ancillary_variables,
    })
}

fn shift_dims(entry: &AuxCoord) -> AuxCoord {
    AuxCoord {
        coord: entry.coord.clone(),
        dims: entry.dims.iter().map(|dim| dim + 1).collect(),
    }
}
