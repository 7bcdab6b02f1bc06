//! Request handlers.

pub mod camera;
pub mod classify;
pub mod health;
pub mod multipart;
pub mod previews;
pub mod sessions;
pub mod surfaces;

pub use health::*;
