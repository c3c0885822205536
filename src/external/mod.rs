//! External collaborator integrations.
//!
//! Document rendering and conversion are delegated to well-known external
//! binaries (poppler-utils, qpdf, img2pdf, LibreOffice) behind the
//! [`DocumentEngine`] trait. The codecs themselves are out of scope for this
//! crate; adapters only orchestrate the calls and map failures.

pub mod engine;

pub use engine::{CommandDocumentEngine, DocumentEngine, ExternalToolError, ImageFormat};
