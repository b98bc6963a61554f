//! avfs - Virtual AVI files over decoded clips
//!
//! This library crate exposes configuration and clip construction for the
//! CLI and for integration testing. The container synthesis itself lives in
//! `avfs-media`.

pub mod clip;
pub mod config;
