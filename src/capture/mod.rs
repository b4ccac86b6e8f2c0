//! Live document-to-texture capture pipeline.
//!
//! A [`CaptureSession`] throttles and single-flights snapshots of an
//! external document (reached through [`DocumentSource`]) into a shared
//! [`CaptureCanvas`], which the screen binding exposes to the rendering
//! collaborator as an emissive texture.

pub mod canvas;
pub mod session;
pub mod source;

pub use canvas::{CaptureCanvas, SamplingParams, ScreenTexture, TextureFilter, TextureWrap};
pub use session::CaptureSession;
pub use source::{CaptureOptions, DocumentEvent, DocumentSource, PushedDocument};
