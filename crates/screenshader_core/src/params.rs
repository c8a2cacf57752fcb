//! Runtime shader parameters
//!
//! A plain text file of `name value` lines is polled for modification and
//! applied to the post-process program as float uniforms.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use smallvec::SmallVec;

use crate::platform::UniformLocation;

/// Default location of the parameter file
pub const DEFAULT_PARAMS_PATH: &str = "/tmp/screenshader.params";

/// Iterations between modification checks
pub const DEFAULT_POLL_EVERY: u32 = 30;

/// Entries kept per file
pub const MAX_PARAMS: usize = 16;

/// Longest accepted parameter name in bytes
pub const MAX_NAME_LEN: usize = 63;

/// One named float uniform
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f32,
    /// `None` when the current program has no uniform by this name
    pub location: Option<UniformLocation>,
}

/// Ordered parameters, at most [`MAX_PARAMS`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: SmallVec<[Parameter; MAX_PARAMS]>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file contents
    ///
    /// The first token of a line is the name and the second must be a float.
    /// Extra tokens are ignored. Blank lines, `#` comments, malformed lines
    /// and overlong names are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut entries = SmallVec::new();
        for line in contents.lines() {
            if entries.len() >= MAX_PARAMS {
                break;
            }
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (Some(name), Some(value)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            if name.len() > MAX_NAME_LEN {
                continue;
            }
            let Ok(value) = value.parse::<f32>() else {
                continue;
            };
            entries.push(Parameter {
                name: name.to_string(),
                value,
                location: None,
            });
        }
        Self { entries }
    }

    /// Look up every name's uniform location
    pub fn resolve_locations<F>(&mut self, mut lookup: F)
    where
        F: FnMut(&str) -> Option<UniformLocation>,
    {
        for param in &mut self.entries {
            param.location = lookup(&param.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Watches the parameter file by modification time
#[derive(Debug)]
pub struct ParameterStore {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    counter: u32,
    poll_every: u32,
}

impl ParameterStore {
    pub fn new(path: impl Into<PathBuf>, poll_every: u32) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
            counter: 0,
            poll_every: poll_every.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count one loop iteration, true when a check is due
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.poll_every {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    /// Re-read the file if its modification time changed
    ///
    /// Returns `None` when the file is missing, unreadable or unchanged, in
    /// which case the current set stays in effect.
    pub fn poll(&mut self) -> Option<ParameterSet> {
        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()?;
        if self.last_modified == Some(modified) {
            return None;
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };
        self.last_modified = Some(modified);
        let set = ParameterSet::parse(&contents);
        tracing::info!("Loaded {} params from {}", set.len(), self.path.display());
        Some(set)
    }
}
