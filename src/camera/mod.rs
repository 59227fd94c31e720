/// Camera producing per-frame culling view parameters
/// Perspective and orthographic lenses, yaw/pitch orientation
use crate::culling::{Projection, ViewKey, ViewParams};
use glam::{Mat4, Quat, Vec3, Vec4};

pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // Rotation around Y axis (radians)
    pub pitch: f32, // Rotation around X axis (radians)
    pub projection: Projection,
    /// Vertical field of view (perspective)
    pub fov: f32,
    /// Visible height in world units (orthographic)
    pub ortho_height: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            projection: Projection::Perspective,
            fov: 70.0f32.to_radians(),
            ortho_height: 10.0,
            near: 0.1,
            far: 1000.0,
            aspect_ratio,
        }
    }

    pub fn orthographic(position: Vec3, aspect_ratio: f32, height: f32) -> Self {
        Self {
            projection: Projection::Orthographic,
            ortho_height: height,
            ..Self::new(position, aspect_ratio)
        }
    }

    /// Update camera orientation to look at a specific target point.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let view_matrix = Mat4::look_at_rh(self.position, target, up);
        let rotation_quat = Quat::from_mat4(&view_matrix.inverse());
        let (yaw, pitch, _roll) = rotation_quat.to_euler(glam::EulerRot::YXZ);
        self.yaw = yaw;
        self.pitch = pitch;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_quat();
        let target = self.position + rotation * Vec3::NEG_Z;
        Mat4::look_at_rh(self.position, target, rotation * Vec3::Y)
    }

    /// Depth maps to `[0, 1]`; perspective clip `w` is the view distance
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far),
            Projection::Orthographic => {
                let half_h = self.ortho_height * 0.5;
                let half_w = half_h * self.aspect_ratio;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * Vec3::NEG_Z
    }

    fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Parameters for one culled view at `width` x `height` pixels
    pub fn view_params(&self, key: ViewKey, width: u32, height: u32) -> ViewParams {
        ViewParams {
            key,
            view_projection: self.view_projection_matrix(),
            near_clip: self.near,
            projection: self.projection,
            width,
            height,
        }
    }

    pub fn extract_frustum(&self) -> Frustum {
        Frustum::from_view(&self.view_projection_matrix(), self.projection, self.near)
    }
}

/// View volume as 5 world-space planes for whole-box rejection
/// Planes are stored in Hessian normal form: ax + by + cz + d = 0
/// where (a,b,c) is the inward-facing normal. There is no far plane.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// left, right, bottom, top, near
    pub planes: [Vec4; 5],
}

impl Frustum {
    /// Gribb-Hartmann extraction from a view-projection matrix, with the near
    /// plane placed where clipping puts it (`w = near` or `z = 0`)
    pub fn from_view(vp: &Mat4, projection: Projection, near_clip: f32) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let near = match projection {
            Projection::Perspective => row3 - Vec4::new(0.0, 0.0, 0.0, near_clip),
            Projection::Orthographic => row2,
        };

        Self {
            planes: [
                Self::normalize_plane(row3 + row0),
                Self::normalize_plane(row3 - row0),
                Self::normalize_plane(row3 + row1),
                Self::normalize_plane(row3 - row1),
                Self::normalize_plane(near),
            ],
        }
    }

    #[inline]
    fn normalize_plane(plane: Vec4) -> Vec4 {
        let normal_length = plane.truncate().length();
        if normal_length > 0.0001 {
            plane / normal_length
        } else {
            plane
        }
    }

    /// Test if an AABB intersects the frustum
    /// Returns true if the box is at least partially inside
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let p = Vec3::new(
                if plane.x > 0.0 { max.x } else { min.x },
                if plane.y > 0.0 { max.y } else { min.y },
                if plane.z > 0.0 { max.z } else { min.z },
            );
            plane.truncate().dot(p) + plane.w >= 0.0
        })
    }
}
