// Library exports for usbide
// This allows the modules to be imported in tests and external code

pub mod assistant;
pub mod config;
pub mod console;
pub mod document;
pub mod environment;
pub mod error;
pub mod incident;
pub mod install;
pub mod layout;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod tools;
pub mod tui;
pub mod utils;
pub mod workbench;
