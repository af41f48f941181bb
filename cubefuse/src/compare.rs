use crate::{
    coord::{fmt_value, Coord, Direction},
    cube::{AuxCoord, Cube},
    metadata::quoted_list,
    signature::{concat_key, merge_key},
};

/// How a pair of cubes relate for combination purposes.
#[derive(Clone, Debug, PartialEq)]
pub enum Relation {
    /// Equal in metadata, coordinates and data.
    Identical,
    /// Equal everywhere except the value of one scalar coordinate.
    Mergeable { coord: String },
    /// Equal everywhere except the extent of one dimension coordinate,
    /// whose combined points can be totally ordered without duplication.
    Concatenable { axis: usize, coord: String },
    /// Anything else; `reason` names the first discriminating field.
    Incompatible { reason: String },
}

/// Decide whether two cubes are identical, mergeable, concatenable or
/// incompatible. The first discrepancy found wins.
pub fn classify(a: &Cube, b: &Cube) -> Relation {
    if merge_key(a) == merge_key(b) {
        let mut varying = varying_scalars(a, b);
        return match varying.len() {
            0 => {
                if a.payload() == b.payload() {
                    Relation::Identical
                } else {
                    Relation::Incompatible {
                        reason: "cubes share all metadata but carry different data".to_string(),
                    }
                }
            }
            1 => Relation::Mergeable {
                coord: varying.remove(0),
            },
            _ => Relation::Incompatible {
                reason: format!("scalar coordinates {} all differ", quoted_list(&varying)),
            },
        };
    }

    let ndim = a.ndim().min(b.ndim());
    for axis in 0..ndim {
        let (Some(key_a), Some(key_b)) = (concat_key(a, axis), concat_key(b, axis)) else {
            continue;
        };
        if key_a != key_b {
            continue;
        }
        let (Some(coord_a), Some(coord_b)) = (a.dim_coord(axis), b.dim_coord(axis)) else {
            continue;
        };
        return match joinable(coord_a, coord_b) {
            Ok(()) => Relation::Concatenable {
                axis,
                coord: coord_a.name().to_string(),
            },
            Err(reason) => Relation::Incompatible { reason },
        };
    }

    match describe_difference(a, b) {
        Some(reason) => Relation::Incompatible { reason },
        None => Relation::Identical,
    }
}

/// Scalar coordinates of `a` whose value on `b` differs.
pub(crate) fn varying_scalars(a: &Cube, b: &Cube) -> Vec<String> {
    a.scalar_coords()
        .filter(|entry| b.scalar_coord(entry.coord.name()) != Some(&entry.coord))
        .map(|entry| entry.coord.name().to_string())
        .collect()
}

/// Can two fragments of one dimension coordinate interleave into a single
/// monotonic series?
fn joinable(a: &Coord, b: &Coord) -> Result<(), String> {
    let direction = match (a.direction(), b.direction()) {
        (Some(left), Some(right)) if left != right => {
            return Err(format!(
                "coordinate '{}' fragments disagree on direction",
                a.name()
            ));
        }
        (Some(direction), _) | (_, Some(direction)) => direction,
        (None, None) => Direction::Ascending,
    };
    let disjoint = match direction {
        Direction::Ascending => {
            a.last_point() < b.first_point() || b.last_point() < a.first_point()
        }
        Direction::Descending => {
            a.last_point() > b.first_point() || b.last_point() > a.first_point()
        }
    };
    if disjoint {
        Ok(())
    } else {
        Err(format!(
            "coordinate '{}' spans [{}, {}] and [{}, {}] overlap",
            a.name(),
            fmt_value(a.first_point()),
            fmt_value(a.last_point()),
            fmt_value(b.first_point()),
            fmt_value(b.last_point())
        ))
    }
}

/// The first discriminating difference between two cubes, walking fields
/// in a fixed order: cube metadata, element type, dimensionality, dimension
/// coordinates, shape, scalar values, auxiliary entries, then data.
/// `None` when the cubes are fully equal.
pub(crate) fn describe_difference(a: &Cube, b: &Cube) -> Option<String> {
    if let Some(diff) = a.metadata().difference(b.metadata()).into_iter().next() {
        return Some(diff);
    }
    if a.payload().dtype() != b.payload().dtype() {
        return Some(format!(
            "data types differ: {:?} != {:?}",
            a.payload().dtype(),
            b.payload().dtype()
        ));
    }
    if a.ndim() != b.ndim() {
        return Some(format!(
            "dimensionality differs: {} != {}",
            a.ndim(),
            b.ndim()
        ));
    }
    for axis in 0..a.ndim() {
        match (a.dim_coord(axis), b.dim_coord(axis)) {
            (Some(coord_a), Some(coord_b)) => {
                if let Some(diff) = coord_difference("dimension coordinate", coord_a, coord_b) {
                    return Some(diff);
                }
            }
            (None, None) => {}
            _ => {
                return Some(format!(
                    "dimension {axis} has a coordinate on only one cube"
                ));
            }
        }
    }
    if a.shape() != b.shape() {
        return Some(format!("shape differs: {:?} != {:?}", a.shape(), b.shape()));
    }

    let a_scalars: Vec<&AuxCoord> = a.scalar_coords().collect();
    let b_scalars: Vec<&AuxCoord> = b.scalar_coords().collect();
    if let Some(diff) = aux_difference("scalar coordinate", &a_scalars, &b_scalars) {
        return Some(diff);
    }
    let a_aux: Vec<&AuxCoord> = a.aux_coords().iter().filter(|e| !e.dims.is_empty()).collect();
    let b_aux: Vec<&AuxCoord> = b.aux_coords().iter().filter(|e| !e.dims.is_empty()).collect();
    if let Some(diff) = aux_difference("auxiliary coordinate", &a_aux, &b_aux) {
        return Some(diff);
    }
    let a_measures: Vec<&AuxCoord> = a.cell_measures().iter().collect();
    let b_measures: Vec<&AuxCoord> = b.cell_measures().iter().collect();
    if let Some(diff) = aux_difference("cell measure", &a_measures, &b_measures) {
        return Some(diff);
    }
    let a_ancillary: Vec<&AuxCoord> = a.ancillary_variables().iter().collect();
    let b_ancillary: Vec<&AuxCoord> = b.ancillary_variables().iter().collect();
    if let Some(diff) = aux_difference("ancillary variable", &a_ancillary, &b_ancillary) {
        return Some(diff);
    }

    if a.payload() != b.payload() {
        return Some("data payloads differ".to_string());
    }
    None
}

fn aux_difference(label: &str, xs: &[&AuxCoord], ys: &[&AuxCoord]) -> Option<String> {
    let mut names: Vec<&str> = xs
        .iter()
        .map(|entry| entry.coord.name())
        .chain(ys.iter().map(|entry| entry.coord.name()))
        .collect();
    names.sort_unstable();
    names.dedup();

    for name in names {
        let x = xs.iter().find(|entry| entry.coord.name() == name);
        let y = ys.iter().find(|entry| entry.coord.name() == name);
        match (x, y) {
            (Some(x), Some(y)) => {
                if x.dims != y.dims {
                    return Some(format!(
                        "{} '{}' maps different dimensions: {:?} != {:?}",
                        label, name, x.dims, y.dims
                    ));
                }
                if let Some(diff) = coord_difference(label, &x.coord, &y.coord) {
                    return Some(diff);
                }
            }
            _ => return Some(format!("{label} '{name}' missing from one cube")),
        }
    }
    None
}

fn coord_difference(label: &str, x: &Coord, y: &Coord) -> Option<String> {
    if x.name() != y.name() {
        return Some(format!(
            "{} names differ: '{}' != '{}'",
            label,
            x.name(),
            y.name()
        ));
    }
    if let Some(diff) = x.metadata.difference(&y.metadata).into_iter().next() {
        return Some(format!("{} '{}': {}", label, x.name(), diff));
    }
    if x.circular != y.circular {
        return Some(format!(
            "{} '{}' circular flags differ",
            label,
            x.name()
        ));
    }
    if x.points.shape() != y.points.shape() {
        return Some(format!(
            "{} '{}' lengths differ: {} != {}",
            label,
            x.name(),
            x.len(),
            y.len()
        ));
    }
    if x.points != y.points {
        if x.len() == 1 && y.len() == 1 {
            return Some(format!(
                "{} '{}' values differ: {} != {}",
                label,
                x.name(),
                fmt_value(x.first_point()),
                fmt_value(y.first_point())
            ));
        }
        return Some(format!("{} '{}' points differ", label, x.name()));
    }
    match (&x.bounds, &y.bounds) {
        (Some(left), Some(right)) if left != right => {
            Some(format!("{} '{}' bounds differ", label, x.name()))
        }
        (Some(_), None) | (None, Some(_)) => Some(format!(
            "{} '{}' has bounds on only one cube",
            label,
            x.name()
        )),
        _ => None,
    }
}
