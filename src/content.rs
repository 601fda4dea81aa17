//! Content pools: fixed lists of candidate message texts.
//!
//! A pool is a JSON array of strings loaded once per run. Emptiness is a
//! configuration error and is rejected at load time, never at first pick.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::rng::RandomSource;

#[derive(Debug, Clone)]
pub struct ContentPool {
    name: String,
    items: Vec<String>,
}

impl ContentPool {
    /// Load a named pool from a JSON array-of-strings file.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read content pool '{}' from {:?}", name, path))?;
        let items: Vec<String> = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Content pool '{}' in {:?} is not a JSON array of strings",
                name, path
            )
        })?;
        Self::from_items(name, items)
    }

    pub fn from_items(name: &str, items: Vec<String>) -> Result<Self> {
        if items.is_empty() {
            bail!("Content pool '{}' is empty", name);
        }
        Ok(Self {
            name: name.to_string(),
            items,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Uniformly random element. The pool is non-empty by construction.
    pub fn pick(&self, rng: &dyn RandomSource) -> &str {
        &self.items[rng.roll(self.items.len())]
    }
}
