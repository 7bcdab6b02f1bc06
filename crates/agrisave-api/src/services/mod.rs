//! Gateway services.

pub mod previews;
pub mod reaper;
pub mod sessions;
pub mod surfaces;

pub use previews::{Preview, PreviewStore};
pub use reaper::IdleReaper;
pub use sessions::SessionStore;
pub use surfaces::{SurfaceRuntime, SurfaceService, SurfaceSnapshot};
