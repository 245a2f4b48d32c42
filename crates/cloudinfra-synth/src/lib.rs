//! cloudinfra-synth - Multi-region canary and fault injection synthesizer
//!
//! This crate resolves per-region configuration profiles and synthesizes one
//! deployment template per region: canary artifact storage, synthetic HTTP
//! canaries, and (in the primary region only) execution roles and the fault
//! injection experiment catalog.

pub mod aws;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod synth;
pub mod testing;
pub mod topology;
