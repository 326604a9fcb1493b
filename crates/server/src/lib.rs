//! HTTP surface of the sizefit conversion service.
//!
//! Accepts uploads, hands them to the core job runner and serves the
//! converted files back.

pub mod api;
pub mod metrics;
pub mod state;
pub mod storage;
