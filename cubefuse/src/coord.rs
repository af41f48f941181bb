use ndarray::{concatenate, Array1, ArrayD, Axis, IxDyn};
use num_traits::ToPrimitive;

use crate::{
    errors::{Error, Result},
    metadata::{AttrValue, CoordMetadata},
};

/// Direction of travel of a monotonic coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A labelled coordinate: points, optional cell bounds and identity.
///
/// Dimension coordinates are one-dimensional and strictly monotonic;
/// auxiliary coordinates may map any number of data dimensions, including
/// none (a scalar coordinate with a single point). When bounds are present
/// they have one `(leading, trailing)` pair per point, with the edges
/// following the coordinate's direction of travel.
#[derive(Clone, Debug, PartialEq)]
pub struct Coord {
    pub metadata: CoordMetadata,
    pub points: ArrayD<f64>,
    pub bounds: Option<ArrayD<f64>>,
    pub circular: bool,
}

impl Coord {
    pub fn new(name: &str, units: &str, points: Vec<f64>) -> Self {
        Self {
            metadata: CoordMetadata::new(name, units),
            points: Array1::from(points).into_dyn(),
            bounds: None,
            circular: false,
        }
    }

    /// A coordinate with a single point, mapped to no data dimension.
    pub fn scalar(name: &str, units: &str, value: f64) -> Self {
        Self::new(name, units, vec![value])
    }

    /// Build points from any numeric sequence, e.g. integer epoch seconds.
    pub fn from_values<T: ToPrimitive>(name: &str, units: &str, values: &[T]) -> Self {
        let points = values
            .iter()
            .map(|value| value.to_f64().unwrap_or(f64::NAN))
            .collect();
        Self::new(name, units, points)
    }

    pub fn with_bounds(mut self, bounds: Vec<(f64, f64)>) -> Result<Self> {
        if bounds.len() != self.points.len() {
            return Err(Error::Coordinate(format!(
                "coordinate '{}' has {} points but {} bounds pairs",
                self.name(),
                self.points.len(),
                bounds.len()
            )));
        }
        let mut shape = self.points.shape().to_vec();
        shape.push(2);
        let flat: Vec<f64> = bounds
            .iter()
            .flat_map(|&(leading, trailing)| [leading, trailing])
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(&shape), flat)
            .map_err(|err| Error::Shape(err.to_string()))?;
        self.bounds = Some(array);
        Ok(self)
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.metadata.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn units(&self) -> &str {
        &self.metadata.units
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Direction of a one-dimensional, strictly monotonic coordinate with
    /// at least two points. `None` otherwise.
    pub fn direction(&self) -> Option<Direction> {
        if self.points.ndim() != 1 || self.len() < 2 {
            return None;
        }
        let points: Vec<f64> = self.points.iter().copied().collect();
        let mut ascending = true;
        let mut descending = true;
        for pair in points.windows(2) {
            if pair[0] >= pair[1] {
                ascending = false;
            }
            if pair[0] <= pair[1] {
                descending = false;
            }
        }
        match (ascending, descending) {
            (true, _) => Some(Direction::Ascending),
            (_, true) => Some(Direction::Descending),
            _ => None,
        }
    }

    /// Zero or one points always count as monotonic.
    pub fn is_strictly_monotonic(&self) -> bool {
        self.len() < 2 || self.direction().is_some()
    }

    /// First point of a one-dimensional coordinate.
    pub fn first_point(&self) -> f64 {
        self.points[[0]]
    }

    /// Last point of a one-dimensional coordinate.
    pub fn last_point(&self) -> f64 {
        self.points[[self.len() - 1]]
    }

    pub(crate) fn leading_edge(&self) -> Option<f64> {
        self.bounds.as_ref().map(|bounds| bounds[[0, 0]])
    }

    pub(crate) fn trailing_edge(&self) -> Option<f64> {
        self.bounds.as_ref().map(|bounds| bounds[[self.len() - 1, 1]])
    }

    /// Spacing of the final interval, when there is one.
    pub(crate) fn tail_step(&self) -> Option<f64> {
        if self.points.ndim() != 1 || self.len() < 2 {
            return None;
        }
        Some(self.points[[self.len() - 1]] - self.points[[self.len() - 2]])
    }

    /// Spacing of the first interval, when there is one.
    pub(crate) fn head_step(&self) -> Option<f64> {
        if self.points.ndim() != 1 || self.len() < 2 {
            return None;
        }
        Some(self.points[[1]] - self.points[[0]])
    }

    /// Join coordinate fragments end-to-end along one axis of their points.
    /// Fragments must agree on bounds presence; identity is taken from the
    /// first fragment.
    pub(crate) fn concat_along(parts: &[&Coord], axis: usize) -> Result<Coord> {
        let first = *parts
            .first()
            .ok_or_else(|| Error::Shape("cannot join an empty list of coordinates".to_string()))?;

        let views: Vec<_> = parts.iter().map(|coord| coord.points.view()).collect();
        let points = concatenate(Axis(axis), &views).map_err(|err| Error::Shape(err.to_string()))?;

        let mut bound_views = Vec::with_capacity(parts.len());
        for coord in parts {
            if let Some(bounds) = &coord.bounds {
                bound_views.push(bounds.view());
            }
        }
        let bounds = if bound_views.is_empty() {
            None
        } else if bound_views.len() == parts.len() {
            Some(concatenate(Axis(axis), &bound_views).map_err(|err| Error::Shape(err.to_string()))?)
        } else {
            return Err(Error::IncompatibleMetadata(format!(
                "coordinate '{}' has bounds on some fragments only",
                first.name()
            )));
        };

        Ok(Coord {
            metadata: first.metadata.clone(),
            points,
            bounds,
            circular: first.circular,
        })
    }
}

/// Render a point value the way it was most likely written: integral
/// values without a trailing ".0".
pub(crate) fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        assert_eq!(
            Coord::new("time", "s", vec![0.0, 1.0, 2.0]).direction(),
            Some(Direction::Ascending)
        );
        assert_eq!(
            Coord::new("depth", "m", vec![30.0, 20.0, 10.0]).direction(),
            Some(Direction::Descending)
        );
        assert_eq!(Coord::new("time", "s", vec![0.0, 2.0, 1.0]).direction(), None);
        assert_eq!(Coord::new("time", "s", vec![5.0]).direction(), None);
    }

    #[test]
    fn test_strict_monotonicity_rejects_repeats() {
        assert!(Coord::new("time", "s", vec![0.0, 1.0, 2.0]).is_strictly_monotonic());
        assert!(Coord::scalar("z", "m", 1.0).is_strictly_monotonic());
        assert!(!Coord::new("time", "s", vec![0.0, 1.0, 1.0]).is_strictly_monotonic());
    }

    #[test]
    fn test_from_integer_values() {
        let coord = Coord::from_values("time", "seconds since 1970-01-01", &[1000000_i64, 1003600]);
        assert_eq!(coord.first_point(), 1000000.0);
        assert_eq!(coord.last_point(), 1003600.0);
    }

    #[test]
    fn test_bounds_length_must_match_points() {
        let result = Coord::new("time", "s", vec![0.0, 1.0]).with_bounds(vec![(0.0, 1.0)]);
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_bound_edges() {
        let coord = Coord::new("time", "s", vec![5.0, 15.0])
            .with_bounds(vec![(0.0, 10.0), (10.0, 20.0)])
            .unwrap();
        assert_eq!(coord.leading_edge(), Some(0.0));
        assert_eq!(coord.trailing_edge(), Some(20.0));
    }

    #[test]
    fn test_concat_along_joins_points_and_bounds() {
        let a = Coord::new("time", "s", vec![5.0, 15.0])
            .with_bounds(vec![(0.0, 10.0), (10.0, 20.0)])
            .unwrap();
        let b = Coord::new("time", "s", vec![25.0])
            .with_bounds(vec![(20.0, 30.0)])
            .unwrap();
        let joined = Coord::concat_along(&[&a, &b], 0).unwrap();
        assert_eq!(joined.points.as_slice().unwrap(), &[5.0, 15.0, 25.0]);
        assert_eq!(joined.leading_edge(), Some(0.0));
        assert_eq!(joined.trailing_edge(), Some(30.0));
    }

    #[test]
    fn test_concat_along_rejects_mixed_bounds() {
        let a = Coord::new("time", "s", vec![5.0])
            .with_bounds(vec![(0.0, 10.0)])
            .unwrap();
        let b = Coord::new("time", "s", vec![15.0]);
        let result = Coord::concat_along(&[&a, &b], 0);
        assert!(matches!(result, Err(Error::IncompatibleMetadata(_))));
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(1.0), "1");
        assert_eq!(fmt_value(-3.0), "-3");
        assert_eq!(fmt_value(1.5), "1.5");
    }
}
