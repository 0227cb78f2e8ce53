//! Image and volume containers
//!
//! All filters in this crate operate on [`ImageField`]: a batched,
//! single-channel-per-plane scalar field backed by a flat `Vec<f64>`.
//! Conceptually the shape is `[batch, channel, height, width]` for 2D data
//! and `[batch, channel, depth, height, width]` for 3D data, stored row-major
//! with x (width) as the fastest axis:
//!
//! 2D: `idx = x + width * y`
//! 3D: `idx = x + width * (y + height * z)`
//!
//! Whether a field is 2D or 3D is decided once, at construction, through
//! [`GridShape`]. Everything downstream matches on the variant; only the
//! dynamic-rank constructors (`from_shape_vec`, `from_ndarray`) ever inspect
//! a rank at runtime.

use ndarray::{ArrayD, IxDyn};

use crate::error::FilterError;

/// Spatial extent of a field.
///
/// Axes are indexed in storage order, outermost first: in 2D axis 0 is y
/// (height) and axis 1 is x (width); in 3D axis 0 is z (depth), axis 1 is y,
/// axis 2 is x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridShape {
    /// A 2D grid of `height` rows by `width` columns.
    TwoD { height: usize, width: usize },
    /// A 3D grid of `depth` slices, each `height` by `width`.
    ThreeD { depth: usize, height: usize, width: usize },
}

impl GridShape {
    /// Number of spatial axes (2 or 3).
    #[inline]
    pub fn ndim(&self) -> usize {
        match self {
            GridShape::TwoD { .. } => 2,
            GridShape::ThreeD { .. } => 3,
        }
    }

    /// Total number of pixels (voxels) in one plane of the grid.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        match *self {
            GridShape::TwoD { height, width } => height * width,
            GridShape::ThreeD {
                depth,
                height,
                width,
            } => depth * height * width,
        }
    }

    /// Length of the given axis (storage order, outermost first).
    ///
    /// Returns `ShapeMismatch` when the axis index is out of range for this
    /// grid's rank.
    pub fn axis_len(&self, axis: usize) -> Result<usize, FilterError> {
        match (*self, axis) {
            (GridShape::TwoD { height, .. }, 0) => Ok(height),
            (GridShape::TwoD { width, .. }, 1) => Ok(width),
            (GridShape::ThreeD { depth, .. }, 0) => Ok(depth),
            (GridShape::ThreeD { height, .. }, 1) => Ok(height),
            (GridShape::ThreeD { width, .. }, 2) => Ok(width),
            _ => Err(FilterError::ShapeMismatch {
                what: "axis index",
                expected: self.ndim(),
                got: axis,
            }),
        }
    }

    /// Element stride of the given axis in a flat plane.
    pub fn axis_stride(&self, axis: usize) -> Result<usize, FilterError> {
        match (*self, axis) {
            (GridShape::TwoD { width, .. }, 0) => Ok(width),
            (GridShape::TwoD { .. }, 1) => Ok(1),
            (GridShape::ThreeD { height, width, .. }, 0) => Ok(height * width),
            (GridShape::ThreeD { width, .. }, 1) => Ok(width),
            (GridShape::ThreeD { .. }, 2) => Ok(1),
            _ => Err(FilterError::ShapeMismatch {
                what: "axis index",
                expected: self.ndim(),
                got: axis,
            }),
        }
    }

    /// Spatial dimensions in storage order.
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            GridShape::TwoD { height, width } => vec![height, width],
            GridShape::ThreeD {
                depth,
                height,
                width,
            } => vec![depth, height, width],
        }
    }
}

/// A batched scalar image or volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageField {
    batch: usize,
    channels: usize,
    grid: GridShape,
    data: Vec<f64>,
}

impl ImageField {
    /// Create a zero-filled field.
    pub fn zeros(batch: usize, channels: usize, grid: GridShape) -> Self {
        let len = batch * channels * grid.num_pixels();
        ImageField {
            batch,
            channels,
            grid,
            data: vec![0.0; len],
        }
    }

    /// Build a field from raw storage.
    ///
    /// # Arguments
    /// * `batch`, `channels` - Leading dimensions
    /// * `grid` - Spatial extent
    /// * `data` - Flat values, length `batch * channels * grid.num_pixels()`
    pub fn from_parts(
        batch: usize,
        channels: usize,
        grid: GridShape,
        data: Vec<f64>,
    ) -> Result<Self, FilterError> {
        let expected = batch * channels * grid.num_pixels();
        if data.len() != expected {
            return Err(FilterError::ShapeMismatch {
                what: "field data length",
                expected,
                got: data.len(),
            });
        }
        Ok(ImageField {
            batch,
            channels,
            grid,
            data,
        })
    }

    /// Build a single-image 2D field (batch 1, channel 1).
    pub fn from_vec_2d(height: usize, width: usize, data: Vec<f64>) -> Result<Self, FilterError> {
        ImageField::from_parts(1, 1, GridShape::TwoD { height, width }, data)
    }

    /// Build a single-volume 3D field (batch 1, channel 1).
    pub fn from_vec_3d(
        depth: usize,
        height: usize,
        width: usize,
        data: Vec<f64>,
    ) -> Result<Self, FilterError> {
        ImageField::from_parts(
            1,
            1,
            GridShape::ThreeD {
                depth,
                height,
                width,
            },
            data,
        )
    }

    /// Build a field from a dynamic shape.
    ///
    /// The rank decides the dimensionality: 4 means `[b, c, h, w]`, 5 means
    /// `[b, c, d, h, w]`. Any other rank is rejected with `InvalidDimension`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self, FilterError> {
        let grid = match *shape {
            [_, _, height, width] => GridShape::TwoD { height, width },
            [_, _, depth, height, width] => GridShape::ThreeD {
                depth,
                height,
                width,
            },
            _ => {
                return Err(FilterError::InvalidDimension { rank: shape.len() });
            }
        };
        ImageField::from_parts(shape[0], shape[1], grid, data)
    }

    /// Import from an `ndarray` array of rank 4 (2D) or 5 (3D).
    pub fn from_ndarray(arr: &ArrayD<f64>) -> Result<Self, FilterError> {
        let data: Vec<f64> = arr.iter().copied().collect();
        ImageField::from_shape_vec(arr.shape(), data)
    }

    /// Export to an `ndarray` array of rank 4 (2D) or 5 (3D).
    pub fn to_ndarray(&self) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(&self.shape()), self.data.clone())
            .expect("field storage length always matches its shape")
    }

    /// Full shape `[batch, channel, *spatial]`.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.batch, self.channels];
        shape.extend(self.grid.dims());
        shape
    }

    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Number of spatial axes (2 or 3).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.grid.ndim()
    }

    /// Total number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat storage, batches outermost, x fastest.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume the field, returning its flat storage.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// One spatial plane: the values of batch item `b`, channel `c`.
    #[inline]
    pub fn plane(&self, b: usize, c: usize) -> &[f64] {
        let n = self.grid.num_pixels();
        let start = (b * self.channels + c) * n;
        &self.data[start..start + n]
    }

    #[inline]
    pub fn plane_mut(&mut self, b: usize, c: usize) -> &mut [f64] {
        let n = self.grid.num_pixels();
        let start = (b * self.channels + c) * n;
        &mut self.data[start..start + n]
    }
}
