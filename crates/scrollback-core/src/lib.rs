//! Core library for scrollback: turns the structured log stream of a
//! package-installation engine into terminal frames.
//!
//! Events flow one way: [`classifier`] routes each [`events::LogEvent`],
//! [`signals`] and [`diff`] derive the panel contents, and the
//! [`merge`] engine recombines every panel into a [`merge::Frame`].
//! [`reporter::Reporter`] wires these together; [`stream`] drives it from
//! an async event source.

pub mod classifier;
pub mod config;
pub mod diff;
pub mod error;
pub mod events;
pub mod format;
pub mod merge;
pub mod reporter;
pub mod signals;
pub mod stream;
