/// Errors returned at registration and view-setup time.
///
/// The per-frame path never surfaces these to the render loop; it logs and
/// skips the view instead.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CullingError {
    /// Width must be a positive multiple of 8, height a positive multiple of 4
    #[error("invalid resolution {width}x{height}: width must be a multiple of 8 and height a multiple of 4")]
    InvalidResolution { width: u32, height: u32 },

    /// Perspective views need a finite, positive near clip
    #[error("invalid near clip distance: {0}")]
    InvalidNearClip(f32),

    /// View-projection matrix contains NaN or infinity
    #[error("view-projection matrix is not finite")]
    NonFiniteMatrix,

    /// Index buffer does not describe whole triangles
    #[error("index count {0} is not a multiple of 3")]
    IndexCountNotMultipleOfThree(usize),

    /// Index refers past the end of the vertex buffer
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// Occludee chunks hold at most 128 instances
    #[error("occludee chunk is full ({count} instances)")]
    TooManyInstances { count: usize },
}
