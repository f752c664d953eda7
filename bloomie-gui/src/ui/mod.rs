//! UI rendering modules.
//!
//! Contains the UI rendering logic split into separate modules:
//! - `panels`: Top bar with the tab switcher and the status bar
//! - `setup_tab`: Experiment form, connection and reactor names
//! - `measurement_tab`: Recording controls, annotation and plot settings
//! - `plot_view`: The OD plot
//! - `dialogs`: Overwrite and close prompts

mod dialogs;
mod measurement_tab;
mod panels;
mod plot_view;
mod setup_tab;
pub mod theme;
