mod combine;
mod compare;
mod concatenate;
mod coord;
mod cube;
mod errors;
mod lazy;
mod merge;
mod metadata;
mod signature;

#[cfg(test)]
mod testing;

pub use combine::combine;
pub use combine::combine_single;
pub use combine::combine_single_with;
pub use combine::combine_with;
pub use combine::CombineMode;
pub use combine::CombineOptions;
pub use compare::classify;
pub use compare::Relation;
pub use concatenate::concatenate;
pub use concatenate::ConcatenateOptions;
pub use concatenate::ContiguityPolicy;
pub use coord::Coord;
pub use coord::Direction;
pub use cube::AuxCoord;
pub use cube::Cube;
pub use errors::Error;
pub use errors::Result;
pub use lazy::Dtype;
pub use lazy::Lazy;
pub use lazy::Payload;
pub use merge::merge;
pub use metadata::AttrValue;
pub use metadata::Attributes;
pub use metadata::CellMethod;
pub use metadata::CoordMetadata;
pub use metadata::CubeMetadata;
