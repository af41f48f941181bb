use crate::{
    coord::Coord,
    errors::{Error, Result},
    lazy::Payload,
    metadata::CubeMetadata,
};

/// A coordinate together with the data dimensions it maps. An empty `dims`
/// marks a scalar coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxCoord {
    pub coord: Coord,
    pub dims: Vec<usize>,
}

/// One labelled N-dimensional array: a data payload plus coordinate
/// metadata describing each dimension and cell.
///
/// Cubes are immutable values. Combining operations never modify their
/// inputs; they build fresh cubes from them. Coordinate names are unique
/// within a cube and every dimension coordinate's length matches the
/// payload extent of its dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    pub(crate) metadata: CubeMetadata,
    pub(crate) payload: Payload,
    pub(crate) dim_coords: Vec<Option<Coord>>,
    pub(crate) aux_coords: Vec<AuxCoord>,
    pub(crate) cell_measures: Vec<AuxCoord>,
    pub(crate) ancillary_variables: Vec<AuxCoord>,
}

impl Cube {
    pub fn new(metadata: CubeMetadata, payload: Payload) -> Self {
        let ndim = payload.ndim();
        Self {
            metadata,
            payload,
            dim_coords: vec![None; ndim],
            aux_coords: vec![],
            cell_measures: vec![],
            ancillary_variables: vec![],
        }
    }

    /// Attach a dimension coordinate to one data dimension.
    pub fn with_dim_coord(mut self, dim: usize, coord: Coord) -> Result<Self> {
        if dim >= self.ndim() {
            return Err(Error::Coordinate(format!(
                "dimension {} out of range for a {}-dimensional cube",
                dim,
                self.ndim()
            )));
        }
        if let Some(existing) = &self.dim_coords[dim] {
            return Err(Error::Coordinate(format!(
                "dimension {} already has coordinate '{}'",
                dim,
                existing.name()
            )));
        }
        if coord.points.ndim() != 1 {
            return Err(Error::Coordinate(format!(
                "dimension coordinate '{}' must be one-dimensional",
                coord.name()
            )));
        }
        if coord.len() != self.shape()[dim] {
            return Err(Error::Coordinate(format!(
                "dimension coordinate '{}' has {} points but dimension {} has length {}",
                coord.name(),
                coord.len(),
                dim,
                self.shape()[dim]
            )));
        }
        if !coord.is_strictly_monotonic() {
            return Err(Error::Coordinate(format!(
                "dimension coordinate '{}' must be strictly monotonic",
                coord.name()
            )));
        }
        self.check_name_free(coord.name())?;
        self.dim_coords[dim] = Some(coord);
        Ok(self)
    }

    /// Attach an auxiliary coordinate mapping the given data dimensions.
    pub fn with_aux_coord(mut self, coord: Coord, dims: &[usize]) -> Result<Self> {
        let entry = self.validated_entry(coord, dims)?;
        self.aux_coords.push(entry);
        Ok(self)
    }

    /// Attach a scalar coordinate: a single cell mapped to no dimension.
    pub fn with_scalar_coord(self, coord: Coord) -> Result<Self> {
        self.with_aux_coord(coord, &[])
    }

    pub fn with_cell_measure(mut self, coord: Coord, dims: &[usize]) -> Result<Self> {
        let entry = self.validated_entry(coord, dims)?;
        self.cell_measures.push(entry);
        Ok(self)
    }

    pub fn with_ancillary_variable(mut self, coord: Coord, dims: &[usize]) -> Result<Self> {
        let entry = self.validated_entry(coord, dims)?;
        self.ancillary_variables.push(entry);
        Ok(self)
    }

    fn validated_entry(&self, coord: Coord, dims: &[usize]) -> Result<AuxCoord> {
        for &dim in dims {
            if dim >= self.ndim() {
                return Err(Error::Coordinate(format!(
                    "dimension {} out of range for a {}-dimensional cube",
                    dim,
                    self.ndim()
                )));
            }
        }
        if dims.is_empty() {
            if coord.len() != 1 {
                return Err(Error::Coordinate(format!(
                    "scalar coordinate '{}' must have exactly one point, not {}",
                    coord.name(),
                    coord.len()
                )));
            }
        } else {
            let shape = self.shape();
            let expected: Vec<usize> = dims.iter().map(|&dim| shape[dim]).collect();
            if coord.points.shape() != expected.as_slice() {
                return Err(Error::Coordinate(format!(
                    "coordinate '{}' has point shape {:?} but maps dimensions of shape {:?}",
                    coord.name(),
                    coord.points.shape(),
                    expected
                )));
            }
        }
        self.check_name_free(coord.name())?;
        Ok(AuxCoord {
            coord,
            dims: dims.to_vec(),
        })
    }

    fn check_name_free(&self, name: &str) -> Result<()> {
        let taken = self.coord(name).is_some()
            || self.cell_measures.iter().any(|entry| entry.coord.name() == name)
            || self
                .ancillary_variables
                .iter()
                .any(|entry| entry.coord.name() == name);
        if taken {
            return Err(Error::Coordinate(format!(
                "coordinate name '{name}' is already in use"
            )));
        }
        Ok(())
    }

    pub fn metadata(&self) -> &CubeMetadata {
        &self.metadata
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn shape(&self) -> Vec<usize> {
        self.payload.shape()
    }

    pub fn ndim(&self) -> usize {
        self.payload.ndim()
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn dim_coord(&self, dim: usize) -> Option<&Coord> {
        self.dim_coords.get(dim).and_then(Option::as_ref)
    }

    /// Look up a dimension or auxiliary coordinate by name.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .flatten()
            .find(|coord| coord.name() == name)
            .or_else(|| {
                self.aux_coords
                    .iter()
                    .map(|entry| &entry.coord)
                    .find(|coord| coord.name() == name)
            })
    }

    pub fn scalar_coord(&self, name: &str) -> Option<&Coord> {
        self.scalar_coords()
            .map(|entry| &entry.coord)
            .find(|coord| coord.name() == name)
    }

    pub fn scalar_coords(&self) -> impl Iterator<Item = &AuxCoord> {
        self.aux_coords.iter().filter(|entry| entry.dims.is_empty())
    }

    pub fn aux_coords(&self) -> &[AuxCoord] {
        &self.aux_coords
    }

    pub fn cell_measures(&self) -> &[AuxCoord] {
        &self.cell_measures
    }

    pub fn ancillary_variables(&self) -> &[AuxCoord] {
        &self.ancillary_variables
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn};

    use super::*;
    use crate::coord::Coord;

    fn payload_2x3() -> Payload {
        Payload::from(ArrayD::from_elem(IxDyn(&[2, 3]), 0.0))
    }

    fn metadata() -> CubeMetadata {
        CubeMetadata::new("air_temperature", "K")
    }

    #[test]
    fn test_dim_coord_length_must_match_shape() {
        let result = Cube::new(metadata(), payload_2x3())
            .with_dim_coord(0, Coord::new("latitude", "degrees", vec![0.0, 10.0, 20.0]));
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_dim_coord_must_be_monotonic() {
        let result = Cube::new(metadata(), payload_2x3())
            .with_dim_coord(1, Coord::new("longitude", "degrees", vec![0.0, 20.0, 10.0]));
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_coordinate_names_are_unique() {
        let result = Cube::new(metadata(), payload_2x3())
            .with_dim_coord(0, Coord::new("latitude", "degrees", vec![0.0, 10.0]))
            .unwrap()
            .with_scalar_coord(Coord::scalar("latitude", "degrees", 5.0));
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_scalar_coordinate_has_one_point() {
        let result = Cube::new(metadata(), payload_2x3())
            .with_scalar_coord(Coord::new("height", "m", vec![1.0, 2.0]));
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_aux_coord_shape_must_match_mapped_dims() {
        let result = Cube::new(metadata(), payload_2x3())
            .with_aux_coord(Coord::new("model_level", "1", vec![1.0, 2.0]), &[1]);
        assert!(matches!(result, Err(Error::Coordinate(_))));
    }

    #[test]
    fn test_coord_lookup() {
        let cube = Cube::new(metadata(), payload_2x3())
            .with_dim_coord(0, Coord::new("latitude", "degrees", vec![0.0, 10.0]))
            .unwrap()
            .with_scalar_coord(Coord::scalar("height", "m", 1.5))
            .unwrap();
        assert_eq!(cube.coord("latitude").unwrap().len(), 2);
        assert_eq!(cube.scalar_coord("height").unwrap().first_point(), 1.5);
        assert!(cube.coord("longitude").is_none());
        assert_eq!(cube.scalar_coords().count(), 1);
    }
}
