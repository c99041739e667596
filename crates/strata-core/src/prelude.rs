//! Convenience re-exports for common strata-core types.
//!
//! ```rust
//! use strata_core::prelude::*;
//! ```

pub use crate::Backend;
pub use crate::BackendConfig;
pub use crate::DType;
pub use crate::Location;
pub use crate::Shape;
pub use crate::StrataError;
pub use crate::Tensor;
pub use crate::TensorAdapter;
pub use crate::Result;
