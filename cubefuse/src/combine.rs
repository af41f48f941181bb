use tracing::debug;

use crate::{
    compare::describe_difference,
    concatenate::{concatenate, ConcatenateOptions, ContiguityPolicy},
    cube::Cube,
    errors::{Error, Result},
    merge::merge,
};

/// Which combination strategy to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineMode {
    Merge,
    Concatenate,
}

#[derive(Clone, Copy, Debug)]
pub struct CombineOptions {
    pub mode: CombineMode,
    /// Merge only: reject repeated stacked coordinate values.
    pub unique: bool,
    /// Concatenate only: junction policy for point-only coordinates.
    pub contiguity: ContiguityPolicy,
}

impl CombineOptions {
    pub fn new(mode: CombineMode) -> Self {
        Self {
            mode,
            unique: true,
            contiguity: ContiguityPolicy::default(),
        }
    }
}

/// Combine a cube collection, one result per compatible group. Singletons
/// pass through unchanged, so a heterogeneous collection is not an error.
pub fn combine(cubes: &[Cube], mode: CombineMode) -> Result<Vec<Cube>> {
    combine_with(cubes, &CombineOptions::new(mode))
}

pub fn combine_with(cubes: &[Cube], options: &CombineOptions) -> Result<Vec<Cube>> {
    match options.mode {
        CombineMode::Merge => merge(cubes, options.unique),
        CombineMode::Concatenate => concatenate(
            cubes,
            ConcatenateOptions {
                contiguity: options.contiguity,
            },
        ),
    }
}

/// Combine a cube collection that must consolidate to exactly one cube.
///
/// Zero input cubes fail immediately. When more than one cube survives,
/// the failure reports one diagnostic per surviving pair, naming the pair's
/// phenomena and the first field that kept them apart.
pub fn combine_single(cubes: &[Cube], mode: CombineMode) -> Result<Cube> {
    combine_single_with(cubes, &CombineOptions::new(mode))
}

pub fn combine_single_with(cubes: &[Cube], options: &CombineOptions) -> Result<Cube> {
    if cubes.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut results = combine_with(cubes, options)?;
    if results.len() == 1 {
        return Ok(results.remove(0));
    }

    let mut details = vec![];
    for left in 0..results.len() {
        for right in (left + 1)..results.len() {
            let reason = describe_difference(&results[left], &results[right])
                .unwrap_or_else(|| "no discriminating field found".to_string());
            details.push(format!(
                "'{}' != '{}': {}",
                results[left].name(),
                results[right].name(),
                reason
            ));
        }
    }
    debug!(count = results.len(), "combine left multiple cubes");
    Err(Error::MultipleResults {
        count: results.len(),
        details,
    })
}
