//! Core library for the InnoVision School web service: the public enrollment
//! intake pipeline, on-demand confirmation documents, email notification, and
//! the authenticated admin query surface.

pub mod config;
pub mod error;
pub mod limit;
pub mod telemetry;
pub mod workflows;
