//! Weaver Gateway: AI chat orchestration for the Tale Weaver studio.
//!
//! One HTTP service that fronts multiple AI providers behind a single chat
//! surface. Requests are routed by intent, enriched with a composed persona
//! instruction, retried with model fallback, and observable through a
//! bounded in-memory trace ring.

pub mod config;
pub mod orchestrator;
pub mod persona;
pub mod provider;
pub mod registry;
pub mod routing;
pub mod server;
pub mod trace;
