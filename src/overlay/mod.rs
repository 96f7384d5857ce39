pub mod boundary;
pub mod clipboard;
pub mod crop;
pub mod messages;
pub mod model;
pub mod orchestrator;
pub mod preview;
pub mod raster;
pub mod store;
pub mod surface;

pub use surface::{KeyCommand, OverlaySurface, SurfaceOptions};
