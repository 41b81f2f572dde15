//! REPL Configuration
//!
//! Optional TOML configuration loaded from `~/.staxr.toml` (or a path given
//! with `--config`). Everything has a default, so a missing file is not an
//! error; a malformed one is.
//!
//! ```toml
//! # Segment sizes in bytes (the defaults fill the canonical 64 KiB image)
//! stack_bytes = 16384
//! rstack_bytes = 4096
//! string_bytes = 12288
//! code_bytes = 32768
//!
//! # Abort any evaluation after this many dispatched instructions
//! step_budget = 1000000
//!
//! banner = false
//! history_file = "/tmp/staxr_history"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use stax_vm::SegmentLayout;

/// Config file name looked up in the home directory.
const CONFIG_FILE: &str = ".staxr.toml";

/// History file name used when the config does not override it.
const HISTORY_FILE: &str = ".staxr_history";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    /// Operand stack segment size in bytes.
    pub stack_bytes: usize,
    /// Return stack segment size in bytes.
    pub rstack_bytes: usize,
    /// Interned string segment size in bytes.
    pub string_bytes: usize,
    /// Bytecode segment size in bytes.
    pub code_bytes: usize,
    /// Optional instruction budget per evaluation.
    pub step_budget: Option<u64>,
    /// Print the startup banner.
    pub banner: bool,
    /// Where to persist REPL history (defaults to ~/.staxr_history).
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        let layout = SegmentLayout::default();
        ReplConfig {
            stack_bytes: layout.stack,
            rstack_bytes: layout.rstack,
            string_bytes: layout.strings,
            code_bytes: layout.code,
            step_budget: None,
            banner: true,
            history_file: None,
        }
    }
}

impl ReplConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse config: {e}"))
    }

    /// Load configuration: an explicit path must exist; the default home
    /// location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config '{}': {e}", path.display()))?;
            return Self::from_toml(&text);
        }
        if let Some(path) = home::home_dir().map(|h| h.join(CONFIG_FILE))
            && let Ok(text) = std::fs::read_to_string(&path)
        {
            return Self::from_toml(&text);
        }
        Ok(Self::default())
    }

    /// The segment layout this config describes.
    pub fn layout(&self) -> SegmentLayout {
        SegmentLayout {
            stack: self.stack_bytes,
            rstack: self.rstack_bytes,
            strings: self.string_bytes,
            code: self.code_bytes,
        }
    }

    /// Where to read/write REPL history, if anywhere.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| home::home_dir().map(|h| h.join(HISTORY_FILE)))
    }
}
