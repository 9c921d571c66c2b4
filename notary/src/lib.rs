//! PACTUM notary
//!
//! Atomic double-spend prevention: for a given input reference, at most one
//! transaction ever receives a successful notarization, however submissions
//! race. Also attests transaction time windows.

pub mod service;

pub use service::{Clock, Notarizer, NotaryRequest, NotaryService, SystemClock};
