//! Application service tests
//!
//! Session synchronization, install staging and the shell controller wired
//! to in-memory collaborators.

mod install_staging;
mod shell_controller;
