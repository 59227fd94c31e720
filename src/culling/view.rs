/// Per-frame view parameters supplied by the host renderer
use crate::error::CullingError;
use glam::Mat4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Stable handle for a culled view: camera/light identity plus cascade split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub id: u64,
    pub split: u32,
}

impl ViewKey {
    pub fn new(id: u64) -> Self {
        Self { id, split: 0 }
    }

    pub fn with_split(id: u64, split: u32) -> Self {
        Self { id, split }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewParams {
    pub key: ViewKey,
    /// World to clip space
    pub view_projection: Mat4,
    pub near_clip: f32,
    pub projection: Projection,
    /// Resolution of the depth buffer in pixels
    pub width: u32,
    pub height: u32,
}

impl ViewParams {
    pub fn validate(&self) -> Result<(), CullingError> {
        if self.width == 0 || self.height == 0 || self.width % 8 != 0 || self.height % 4 != 0 {
            return Err(CullingError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.projection == Projection::Perspective
            && !(self.near_clip.is_finite() && self.near_clip > 0.0)
        {
            return Err(CullingError::InvalidNearClip(self.near_clip));
        }
        if !self.view_projection.is_finite() {
            return Err(CullingError::NonFiniteMatrix);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(width: u32, height: u32, near_clip: f32) -> ViewParams {
        ViewParams {
            key: ViewKey::new(1),
            view_projection: Mat4::IDENTITY,
            near_clip,
            projection: Projection::Perspective,
            width,
            height,
        }
    }

    #[test]
    fn resolution_must_align_to_subtiles() {
        assert!(params(256, 128, 0.1).validate().is_ok());
        assert_eq!(
            params(250, 128, 0.1).validate(),
            Err(CullingError::InvalidResolution { width: 250, height: 128 })
        );
        assert!(params(256, 126, 0.1).validate().is_err());
        assert!(params(0, 0, 0.1).validate().is_err());
    }

    #[test]
    fn near_clip_only_matters_for_perspective() {
        assert!(params(64, 64, 0.0).validate().is_err());
        assert!(params(64, 64, f32::NAN).validate().is_err());

        let mut ortho = params(64, 64, 0.0);
        ortho.projection = Projection::Orthographic;
        assert!(ortho.validate().is_ok());
    }
}
