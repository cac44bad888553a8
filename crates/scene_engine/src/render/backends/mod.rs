//! Backend implementations for the render module

pub mod headless;

pub use headless::{HeadlessBackend, MeshRecord, RecordedFrame};
