use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Rendering parameters loaded with the app config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Linear RGB sky colour.
    pub clear_color: [f32; 3],
    /// Frame rate cap. 0 disables the cap.
    pub fps_cap: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            near: 0.1,
            far: 10_000.0,
            clear_color: [0.4, 0.7, 1.0],
            fps_cap: 120,
        }
    }
}

/// Perspective projection with a 0..1 depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    width: u32,
    height: u32,
}

impl Projection {
    pub fn new(config: &RenderConfig, width: u32, height: u32) -> Self {
        Self {
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Returns true if the size changed. Zero sizes (minimized windows) are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect(), self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.fov_degrees, 70.0);
        assert_eq!(config.near, 0.1);
        assert_eq!(config.far, 10_000.0);
        assert_eq!(config.fps_cap, 120);
    }

    #[test]
    fn depth_range_is_zero_to_one() {
        let p = Projection::new(&RenderConfig::default(), 1920, 1080);
        let m = p.matrix();
        let near = m.project_point3(Vec3::new(0.0, 0.0, -0.1));
        let far = m.project_point3(Vec3::new(0.0, 0.0, -10_000.0));
        assert!(near.z.abs() < 1e-4, "near z = {}", near.z);
        assert!((far.z - 1.0).abs() < 1e-4, "far z = {}", far.z);
    }

    #[test]
    fn resize_reports_change() {
        let mut p = Projection::new(&RenderConfig::default(), 800, 600);
        assert!(!p.resize(800, 600));
        assert!(!p.resize(0, 600));
        assert!(p.resize(1024, 512));
        assert_eq!(p.aspect(), 2.0);
    }

    #[test]
    fn config_from_partial_json() {
        let config: RenderConfig = serde_json::from_str(r#"{ "fov_degrees": 90.0 }"#).unwrap();
        assert_eq!(config.fov_degrees, 90.0);
        assert_eq!(config.clear_color, [0.4, 0.7, 1.0]);
    }
}
