use ndarray::{concatenate, stack, ArrayD, Axis};
use paste::paste;

use crate::errors::{Error, Result};

/// A deferred array computation. Shapes are always known without forcing
/// evaluation; combining nodes never touches element data until
/// [`Lazy::realize`] is called.
///
/// Structural equality of two graphs stands in for element-wise equality
/// of their results, so duplicate detection never forces a computation.
#[derive(Clone, Debug, PartialEq)]
pub enum Lazy<T> {
    Real(ArrayD<T>),
    Stack { axis: usize, parts: Vec<Lazy<T>> },
    Concat { axis: usize, parts: Vec<Lazy<T>> },
}

impl<T: Clone> Lazy<T> {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Lazy::Real(array) => array.shape().to_vec(),
            Lazy::Stack { axis, parts } => {
                let mut shape = parts[0].shape();
                shape.insert(*axis, parts.len());
                shape
            }
            Lazy::Concat { axis, parts } => {
                let mut shape = parts[0].shape();
                shape[*axis] = parts.iter().map(|part| part.shape()[*axis]).sum();
                shape
            }
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Defer stacking `parts` along a brand-new axis. All parts must share
    /// one shape and `axis` must be at most their dimensionality.
    pub fn stacked(axis: usize, parts: Vec<Lazy<T>>) -> Result<Self> {
        let first = match parts.first() {
            Some(part) => part.shape(),
            None => return Err(Error::Shape("cannot stack an empty list of arrays".to_string())),
        };
        if axis > first.len() {
            return Err(Error::Shape(format!(
                "stack axis {} out of range for shape {:?}",
                axis, first
            )));
        }
        for part in &parts[1..] {
            if part.shape() != first {
                return Err(Error::Shape(format!(
                    "cannot stack shapes {:?} and {:?}",
                    first,
                    part.shape()
                )));
            }
        }
        Ok(Lazy::Stack { axis, parts })
    }

    /// Defer joining `parts` end-to-end along an existing axis. All parts
    /// must share their shape everywhere except `axis`.
    pub fn concatenated(axis: usize, parts: Vec<Lazy<T>>) -> Result<Self> {
        let first = match parts.first() {
            Some(part) => part.shape(),
            None => {
                return Err(Error::Shape(
                    "cannot concatenate an empty list of arrays".to_string(),
                ))
            }
        };
        if axis >= first.len() {
            return Err(Error::Shape(format!(
                "concatenation axis {} out of range for shape {:?}",
                axis, first
            )));
        }
        for part in &parts[1..] {
            let shape = part.shape();
            let compatible = shape.len() == first.len()
                && shape
                    .iter()
                    .zip(&first)
                    .enumerate()
                    .all(|(dim, (a, b))| dim == axis || a == b);
            if !compatible {
                return Err(Error::Shape(format!(
                    "cannot concatenate shapes {:?} and {:?} along axis {}",
                    first, shape, axis
                )));
            }
        }
        Ok(Lazy::Concat { axis, parts })
    }

    /// Force the computation into a dense array.
    pub fn realize(&self) -> ArrayD<T> {
        match self {
            Lazy::Real(array) => array.clone(),
            Lazy::Stack { axis, parts } => {
                let realized: Vec<ArrayD<T>> = parts.iter().map(Lazy::realize).collect();
                let views: Vec<_> = realized.iter().map(ArrayD::view).collect();
                stack(Axis(*axis), &views).expect("parts validated at construction")
            }
            Lazy::Concat { axis, parts } => {
                let realized: Vec<ArrayD<T>> = parts.iter().map(Lazy::realize).collect();
                let views: Vec<_> = realized.iter().map(ArrayD::view).collect();
                concatenate(Axis(*axis), &views).expect("parts validated at construction")
            }
        }
    }
}

/// The element type carried by a [`Payload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtype {
    I32,
    I64,
    F32,
    F64,
}

/// A cube's data: a deferred array tagged with its element type.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    I32(Lazy<i32>),
    I64(Lazy<i64>),
    F32(Lazy<f32>),
    F64(Lazy<f64>),
}

macro_rules! payload_dispatch {
    ($(($variant:ident, $t:ident)),+ $(,)?) => {
        paste! {
            impl Payload {
                $(
                    pub fn [<new_ $t>](data: ArrayD<$t>) -> Self {
                        Payload::$variant(Lazy::Real(data))
                    }

                    pub fn [<as_ $t>](&self) -> Option<&Lazy<$t>> {
                        match self {
                            Payload::$variant(lazy) => Some(lazy),
                            _ => None,
                        }
                    }
                )+

                pub fn dtype(&self) -> Dtype {
                    match self {
                        $(Payload::$variant(_) => Dtype::$variant,)+
                    }
                }

                pub fn shape(&self) -> Vec<usize> {
                    match self {
                        $(Payload::$variant(lazy) => lazy.shape(),)+
                    }
                }

                pub fn ndim(&self) -> usize {
                    self.shape().len()
                }

                /// Stack payloads along a brand-new axis. All payloads must
                /// carry the same element type.
                pub fn stacked(axis: usize, parts: Vec<Payload>) -> Result<Payload> {
                    match parts.first() {
                        None => Err(Error::Shape("cannot stack an empty list of arrays".to_string())),
                        $(
                            Some(Payload::$variant(_)) => {
                                let inner = parts
                                    .into_iter()
                                    .map(|part| match part {
                                        Payload::$variant(lazy) => Ok(lazy),
                                        other => Err(Error::Shape(format!(
                                            "cannot combine {:?} data with {:?} data",
                                            Dtype::$variant,
                                            other.dtype()
                                        ))),
                                    })
                                    .collect::<Result<Vec<_>>>()?;
                                Ok(Payload::$variant(Lazy::stacked(axis, inner)?))
                            }
                        )+
                    }
                }

                /// Join payloads end-to-end along an existing axis. All
                /// payloads must carry the same element type.
                pub fn concatenated(axis: usize, parts: Vec<Payload>) -> Result<Payload> {
                    match parts.first() {
                        None => Err(Error::Shape("cannot concatenate an empty list of arrays".to_string())),
                        $(
                            Some(Payload::$variant(_)) => {
                                let inner = parts
                                    .into_iter()
                                    .map(|part| match part {
                                        Payload::$variant(lazy) => Ok(lazy),
                                        other => Err(Error::Shape(format!(
                                            "cannot combine {:?} data with {:?} data",
                                            Dtype::$variant,
                                            other.dtype()
                                        ))),
                                    })
                                    .collect::<Result<Vec<_>>>()?;
                                Ok(Payload::$variant(Lazy::concatenated(axis, inner)?))
                            }
                        )+
                    }
                }
            }

            $(
                impl From<ArrayD<$t>> for Payload {
                    fn from(data: ArrayD<$t>) -> Self {
                        Payload::$variant(Lazy::Real(data))
                    }
                }
            )+
        }
    };
}

payload_dispatch!((I32, i32), (I64, i64), (F32, f32), (F64, f64));
