//! Transform component for the ECS system
//!
//! Pure data component holding an entity's local transform, relative to its
//! scene graph parent (or to the world for roots).

use crate::ecs::Component;
use crate::foundation::math::{Mat4, Quat, Transform as MathTransform, Vec3};

/// ECS Transform component
///
/// Position, rotation and scale relative to the parent node. World
/// transforms are derived by the scene graph, never stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    /// Local position (Y-up right-handed)
    pub position: Vec3,

    /// Local rotation quaternion
    pub rotation: Quat,

    /// Local scale factors
    pub scale: Vec3,
}

impl Component for TransformComponent {
    const NAME: &'static str = "Transform";
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl TransformComponent {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to foundation math Transform for calculations
    pub fn to_math_transform(&self) -> MathTransform {
        MathTransform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Create from foundation math Transform
    pub fn from_math_transform(transform: &MathTransform) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }

    /// Convert to transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        self.to_math_transform().to_matrix()
    }

    /// Builder pattern: Set scale (uniform)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Rotate in place about `axis` by `angle` radians
    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        let delta = Quat::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle);
        self.rotation = delta * self.rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_math_transform_conversion() {
        let component = TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0)).with_uniform_scale(2.0);
        let back = TransformComponent::from_math_transform(&component.to_math_transform());
        assert_eq!(back, component);
    }

    #[test]
    fn test_rotate_accumulates() {
        let mut transform = TransformComponent::identity();
        transform.rotate(Vec3::y(), std::f32::consts::FRAC_PI_4);
        transform.rotate(Vec3::y(), std::f32::consts::FRAC_PI_4);

        let forward = transform.rotation * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(forward, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }
}
