//! # UI Module
//!
//! This module contains all UI components for the harmonica ear trainer.

pub mod harp_holes;
pub mod main_display;
