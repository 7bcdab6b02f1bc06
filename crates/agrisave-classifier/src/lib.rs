//! Client for the leaf health classification backend.
//!
//! This crate provides:
//! - Multipart image upload to `POST {base}/classify`
//! - Typed parsing of the classification result
//! - External cancellation of in-flight requests
//! - Backend health probing

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;


pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{classify_url, ClassifierClient, ClassifyOptions, IMAGE_FIELD};
pub use config::ClassifierConfig;
pub use error::{ClassifierError, ClassifierResult};
