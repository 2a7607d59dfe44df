//! Page-level initialization of the dynamic blocks feature.
//!
//! A page supplies the raw schema plus the dependency bindings found on its
//! controls and blocks. Schema errors disable the whole feature and produce a
//! single banner; malformed bindings only disable themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::engine::DependencyEngine;
use crate::schema::{BlockSet, SchemaError};

/// Banner text shown when the block schema is malformed.
pub const SCHEMA_ERROR_BANNER: &str = "Dynamic block structure error";

/// Dependency bindings declared on a page.
///
/// Each value is either the JSON text of the attribute or the already
/// parsed JSON value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bindings {
    /// Source control name to its control dependency map
    #[serde(default)]
    pub controls: BTreeMap<String, Value>,

    /// Block id to its block dependency
    #[serde(default)]
    pub blocks: BTreeMap<String, Value>,
}

/// Dismissible error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub message: String,
    pub dismissible: bool,
}

/// Outcome of page initialization.
#[derive(Debug)]
pub enum PageInit {
    /// Schema valid; dynamic behavior enabled.
    Enabled(DependencyEngine),
    /// Schema invalid; dynamic behavior disabled for the whole page.
    Disabled { banner: Banner, error: SchemaError },
}

impl PageInit {
    pub fn engine(&self) -> Option<&DependencyEngine> {
        match self {
            PageInit::Enabled(engine) => Some(engine),
            PageInit::Disabled { .. } => None,
        }
    }

    pub fn banner(&self) -> Option<&Banner> {
        match self {
            PageInit::Enabled(_) => None,
            PageInit::Disabled { banner, .. } => Some(banner),
        }
    }
}

/// Validate the page's schema and build its engine.
pub fn load_page(raw_schema: &str, bindings: &Bindings) -> PageInit {
    match BlockSet::from_json(raw_schema) {
        Ok(blocks) => PageInit::Enabled(build_engine(blocks, bindings)),
        Err(e) => {
            error!(error = %e, "dynamic blocks validation failed");
            PageInit::Disabled {
                banner: Banner {
                    message: SCHEMA_ERROR_BANNER.to_string(),
                    dismissible: true,
                },
                error: e,
            }
        }
    }
}

/// Build an engine for an already validated schema.
pub fn build_engine(blocks: BlockSet, bindings: &Bindings) -> DependencyEngine {
    let mut builder = DependencyEngine::builder(blocks);
    for (control, value) in &bindings.controls {
        builder = builder.control_value(control.as_str(), value);
    }
    for (block, value) in &bindings.blocks {
        builder = builder.block_value(block.as_str(), value);
    }

    let engine = builder.build();
    info!(
        blocks = engine.blocks().len(),
        controls = engine.control_dependencies().len(),
        block_dependencies = engine.block_dependencies().len(),
        skipped = engine.skipped_bindings().len(),
        "dynamic blocks initialized"
    );
    engine
}
