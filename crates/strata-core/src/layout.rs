//! Layout descriptors: how logical elements map to buffer bytes.
//!
//! Descriptors are always expressed in engine-native order, which is
//! row-major over the *reversed* logical shape. A contiguous `[2, 3]`
//! tensor therefore has native dims `[3, 2]` and native strides `[2, 1]`;
//! clients see strides `[1, 2]` once they are reversed back.

use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::engine::NativeType;
use crate::error::StrataError;
use crate::shape::Shape;
use crate::Result;

pub type Dims = SmallVec<[usize; 4]>;

/// Physical format family of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Plain strided layout. Strides are in elements, native order.
    Blocked { strides: Dims },
    /// Engine-private layout. The reference engine stores these densely in
    /// row-major order, but clients get no stride information.
    Opaque { tag: u32 },
}

impl FormatKind {
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Blocked { .. } => "blocked",
            FormatKind::Opaque { .. } => "opaque",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Blocked { strides } => write!(f, "blocked{:?}", strides.as_slice()),
            FormatKind::Opaque { tag } => write!(f, "opaque#{tag}"),
        }
    }
}

/// Element type, dimensions and physical placement of a memory buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutDescriptor {
    native_type: NativeType,
    dims: Dims,
    format: FormatKind,
    /// Offset of the first element, in elements.
    offset: usize,
}

/// Dense row-major strides for `dims`.
pub fn row_major_strides(dims: &[usize]) -> Dims {
    let ndim = dims.len();
    let mut strides: Dims = smallvec![0; ndim];
    let mut acc = 1usize;
    for i in (0..ndim).rev() {
        strides[i] = acc;
        acc *= dims[i];
    }
    strides
}

impl LayoutDescriptor {
    /// Blocked descriptor with explicit native strides.
    pub fn new(native_type: NativeType, dims: &[usize], strides: &[usize]) -> Result<Self> {
        if dims.len() != strides.len() {
            return Err(StrataError::InvalidLayout(format!(
                "{} dims but {} strides",
                dims.len(),
                strides.len()
            )));
        }
        Ok(Self {
            native_type,
            dims: SmallVec::from_slice(dims),
            format: FormatKind::Blocked {
                strides: SmallVec::from_slice(strides),
            },
            offset: 0,
        })
    }

    /// Engine-private descriptor.
    pub fn opaque(native_type: NativeType, dims: &[usize], tag: u32) -> Self {
        Self {
            native_type,
            dims: SmallVec::from_slice(dims),
            format: FormatKind::Opaque { tag },
            offset: 0,
        }
    }

    /// The canonical contiguous descriptor for a logical shape.
    ///
    /// Scalars are described as a single-element 1-d buffer.
    pub fn contiguous(shape: &Shape, native_type: NativeType) -> Self {
        let dims: Dims = if shape.is_scalar() {
            smallvec![1]
        } else {
            shape.reversed()
        };
        let strides = row_major_strides(&dims);
        Self {
            native_type,
            dims,
            format: FormatKind::Blocked { strides },
            offset: 0,
        }
    }

    pub fn native_type(&self) -> NativeType {
        self.native_type
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn format(&self) -> &FormatKind {
        &self.format
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Native strides, if the layout is blocked.
    pub fn strides(&self) -> Option<&[usize]> {
        match &self.format {
            FormatKind::Blocked { strides } => Some(strides),
            FormatKind::Opaque { .. } => None,
        }
    }

    /// Strides the reference engine actually uses to address elements.
    pub fn physical_strides(&self) -> Dims {
        match &self.format {
            FormatKind::Blocked { strides } => strides.clone(),
            FormatKind::Opaque { .. } => row_major_strides(&self.dims),
        }
    }

    /// Whether elements occupy `[0, elements)` in row-major order.
    pub fn is_dense(&self) -> bool {
        if self.offset != 0 {
            return false;
        }
        match &self.format {
            FormatKind::Blocked { strides } => {
                self.dims
                    .iter()
                    .zip(strides.iter())
                    .zip(row_major_strides(&self.dims).iter())
                    .all(|((&d, &s), &dense)| d <= 1 || s == dense)
            }
            FormatKind::Opaque { .. } => true,
        }
    }

    /// Number of elements between the buffer start and one past the last
    /// addressed element.
    pub fn span_elements(&self) -> Result<usize> {
        if self.dims.iter().any(|&d| d == 0) {
            return Ok(0);
        }
        let strides = self.physical_strides();
        let mut last = self.offset;
        for (&d, &s) in self.dims.iter().zip(strides.iter()) {
            let reach = (d - 1)
                .checked_mul(s)
                .and_then(|r| last.checked_add(r))
                .ok_or_else(|| StrataError::Engine(format!("layout span overflows: {self}")))?;
            last = reach;
        }
        last.checked_add(1)
            .ok_or_else(|| StrataError::Engine(format!("layout span overflows: {self}")))
    }

    /// Bytes a buffer needs to hold this layout.
    pub fn span_bytes(&self) -> Result<usize> {
        self.span_elements()?
            .checked_mul(self.native_type.size())
            .ok_or_else(|| StrataError::Engine(format!("layout span overflows: {self}")))
    }

    /// A window into this layout: `dims` elements starting at `offsets`.
    ///
    /// Only blocked layouts can be windowed.
    pub fn submemory(&self, dims: &[usize], offsets: &[usize]) -> Result<Self> {
        let strides = self.strides().ok_or_else(|| {
            StrataError::InvalidLayout(format!(
                "cannot take a submemory of a {} layout",
                self.format.name()
            ))
        })?;
        if dims.len() != self.ndim() || offsets.len() != self.ndim() {
            return Err(StrataError::InvalidLayout(format!(
                "submemory rank {} does not match layout rank {}",
                dims.len(),
                self.ndim()
            )));
        }
        let mut offset = self.offset;
        for axis in 0..self.ndim() {
            if offsets[axis] + dims[axis] > self.dims[axis] {
                return Err(StrataError::InvalidLayout(format!(
                    "submemory [{}..{}) exceeds extent {} on axis {axis}",
                    offsets[axis],
                    offsets[axis] + dims[axis],
                    self.dims[axis]
                )));
            }
            offset += offsets[axis] * strides[axis];
        }
        Ok(Self {
            native_type: self.native_type,
            dims: SmallVec::from_slice(dims),
            format: self.format.clone(),
            offset,
        })
    }
}

impl fmt::Display for LayoutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?} {} +{}",
            self.native_type,
            self.dims.as_slice(),
            self.format,
            self.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_reverses_shape() {
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[2, 3, 4]), NativeType::F32);
        assert_eq!(layout.dims(), &[4, 3, 2]);
        assert_eq!(layout.strides().unwrap(), &[6, 2, 1]);
        assert!(layout.is_dense());
        assert_eq!(layout.span_bytes().unwrap(), 24 * 4);
    }

    #[test]
    fn test_scalar_layout() {
        let layout = LayoutDescriptor::contiguous(&Shape::scalar(), NativeType::F64);
        assert_eq!(layout.dims(), &[1]);
        assert_eq!(layout.elements(), 1);
        assert_eq!(layout.span_bytes().unwrap(), 8);
    }

    #[test]
    fn test_empty_span() {
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[0]), NativeType::F32);
        assert_eq!(layout.span_bytes().unwrap(), 0);
    }

    #[test]
    fn test_padded_layout() {
        let layout = LayoutDescriptor::new(NativeType::U8, &[2, 3], &[4, 1]).unwrap();
        assert!(!layout.is_dense());
        assert_eq!(layout.span_elements().unwrap(), 7);
    }

    #[test]
    fn test_rank_stride_mismatch() {
        assert!(LayoutDescriptor::new(NativeType::U8, &[2, 3], &[1]).is_err());
    }

    #[test]
    fn test_submemory() {
        let layout = LayoutDescriptor::contiguous(&Shape::new(&[4, 3]), NativeType::F32);
        let sub = layout.submemory(&[1, 2], &[2, 1]).unwrap();
        assert_eq!(sub.dims(), &[1, 2]);
        assert_eq!(sub.offset(), 2 * 4 + 1);
        assert!(!sub.is_dense());

        assert!(layout.submemory(&[4, 3], &[1, 0]).is_err());
        assert!(layout.submemory(&[1], &[0]).is_err());
    }

    #[test]
    fn test_opaque_layout() {
        let layout = LayoutDescriptor::opaque(NativeType::F32, &[2, 2], 7);
        assert!(layout.strides().is_none());
        assert_eq!(layout.physical_strides().as_slice(), &[2, 1]);
        assert_eq!(layout.format().name(), "opaque");
        assert!(layout.submemory(&[1, 1], &[0, 0]).is_err());
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
        assert!(row_major_strides(&[]).is_empty());
    }
}
