//! Minimal launcher CLI: `sheriffd [config_file [script_name]]`, parsed
//! once at startup with a clap derive struct.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML config file to load at startup.
    config_file: Option<PathBuf>,

    /// Name of a script to execute immediately after loading the config.
    script_name: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config_file(&self) -> Option<&PathBuf> {
        self.config_file.as_ref()
    }

    pub fn script_name(&self) -> Option<&str> {
        self.script_name.as_deref()
    }
}
