//! Bundled collaborators and the feedback post-processing stage.
//!
//! The orchestrator in [`crate::submit`] only sees the traits in
//! [`crate::backend`]; this module holds one concrete implementation of each
//! plus the pure steps that turn a model answer into [`crate::Feedback`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ storage ──▶ render/encode ──▶ storage ──▶ llm ──▶ postprocess
//! (file)    (upload)    (PNG preview)     (upload)   (VLM)   (JSON parse)
//! ```
//!
//! 1. [`input`]:   read a local résumé file into a [`crate::Blob`]
//! 2. [`storage`]: local document store and record stores
//! 3. [`render`]:  rasterise pages with pdfium; runs in `spawn_blocking`
//! 4. [`encode`]:  PNG-encode pages and base64-wrap them for the vision API
//! 5. [`llm`]:     the only stage that calls a model
//! 6. [`postprocess`]: normalise the payload shape and parse the feedback JSON

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod storage;
