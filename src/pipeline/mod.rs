//! Pipeline stages from paper to section mapping.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ orchestrator ──▶ postprocess ──▶ parser
//! (URL/path)  (pdfium|base64)  (rounds + retry)  (cleanup)   (sections)
//! ```
//!
//! 1. [`input`]  canonicalises the user-supplied path or URL to a local file
//! 2. [`extract`] reads the text layer (in `spawn_blocking`, pdfium is not
//!    async-safe) or hands the raw file to [`encode`]
//! 3. [`orchestrator`] drives the title, bulk and retry rounds; the only
//!    stage with network I/O
//! 4. [`retry`] is the bounded-attempts helper every round uses
//! 5. [`postprocess`] fixes model quirks (fences, decorated headings) before
//!    the reply is parsed

pub mod encode;
pub mod extract;
pub mod input;
pub mod orchestrator;
pub mod postprocess;
pub mod retry;
