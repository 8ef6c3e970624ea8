//! Configuration management module
//!
//! This module handles the project manifest shared by all subcommands and
//! the framework metadata table.

pub mod framework;
pub mod manifest;

pub use framework::Framework;
pub use manifest::{AwsSection, ContainerSection, Manifest, Project, WebappSection};
