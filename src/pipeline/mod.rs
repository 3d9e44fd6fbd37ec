//! The transcription pipeline, stage by stage.
//!
//! ```text
//! input ──► render ──► extract ──► window ──► correct ──► assemble
//!   │         │       (ocr /        │      (schedule)        │
//!   │         │        encode)      │          │             │
//! validate  rasterise  raw text   freeze    bounded      ordered
//! the PDF   pages      per page   context   concurrent   transcript
//!                                 windows   correction
//! ```
//!
//! Stages are deliberately independent modules with narrow data handoffs
//! (`Vec<RawPage>` → `Vec<CorrectionTask>` → `BTreeMap<usize, PageResult>`),
//! so each is testable without the others and without a live LLM.
//! [`crate::transcribe`] wires them together.

pub mod assemble;
pub mod correct;
pub mod encode;
pub mod extract;
pub mod input;
pub mod ocr;
pub mod render;
pub mod schedule;
pub mod window;
