/*
 * This module provides the application logic layer, centered around
 * `TrayAppLogic` which acts as the Presenter/Controller between the tray
 * flyout, the persisted settings and the platform layer.
 * Unit tests for `TrayAppLogic` are in `handler_tests.rs`.
 */
pub mod handler;
pub mod ui_constants;

#[cfg(test)]
mod handler_tests;

pub use handler::TrayAppLogic;
