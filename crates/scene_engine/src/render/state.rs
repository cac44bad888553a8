//! Fixed-function render state
//!
//! The state a backend applies before drawing a frame: depth testing,
//! face culling, the clear color and the viewport.

use bitflags::bitflags;

use crate::core::config::RendererConfig;

bitflags! {
    /// Pipeline features switched on for a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u32 {
        /// Depth test against the depth buffer
        const DEPTH_TEST = 1 << 0;
        /// Discard faces selected by [`CullFace`]
        const CULL_FACE = 1 << 1;
    }
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    /// Pass when nearer
    Less,
    /// Pass when nearer or equal
    LessEqual,
    /// Always pass
    Always,
}

/// Faces removed by culling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    /// Counter-clockwise
    Ccw,
    /// Clockwise
    Cw,
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge
    pub x: u32,
    /// Bottom edge
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole surface
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width over height, 1.0 for a degenerate viewport
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Complete fixed-function state for a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Enabled features
    pub flags: RenderFlags,
    /// Depth comparison
    pub depth_func: DepthFunc,
    /// Culled faces
    pub cull_face: CullFace,
    /// Front face winding
    pub front_face: FrontFace,
    /// Clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Viewport
    pub viewport: Viewport,
}

impl RenderState {
    /// State described by the renderer configuration for a surface size
    pub fn from_config(config: &RendererConfig, width: u32, height: u32) -> Self {
        let mut flags = RenderFlags::empty();
        flags.set(RenderFlags::DEPTH_TEST, config.depth_test);
        flags.set(RenderFlags::CULL_FACE, config.cull_back_faces);
        Self {
            flags,
            depth_func: DepthFunc::LessEqual,
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            clear_color: config.clear_color,
            viewport: Viewport::full(width, height),
        }
    }

    /// Resize the viewport to cover a surface
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::full(width, height);
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default(), 0, 0)
    }
}
