//! # dynablocks-core
//!
//! Schema validation and dependency evaluation for dynamic form blocks.
//!
//! A dynamic block is a labeled group of form fields whose visibility,
//! required-ness and enabled state depend on the values of other fields.
//! This crate answers, for the current field values:
//! - Which blocks are shown?
//! - Which fields are enabled and required?
//! - Which values must be cleared?
//!
//! ## Key Guarantees
//!
//! 1. **Fail-fast schemas**: a malformed schema disables the feature before
//!    any rule runs
//! 2. **Never throws at runtime**: conditions with bad operands evaluate to
//!    `false`; malformed bindings are skipped
//! 3. **Pure**: state is a function of schema and current values; repeated
//!    evaluation yields identical updates
//! 4. **Deterministic priority**: block-level rules override control-level
//!    rules regardless of event order
//!
//! ## Example
//!
//! ```rust,ignore
//! use dynablocks_core::{load_page, Bindings, InMemoryForm, PageInit};
//!
//! let page = load_page(&schema_json, &bindings);
//! if let PageInit::Enabled(engine) = page {
//!     let mut form = InMemoryForm::from_schema(engine.blocks(), &values);
//!     engine.initialize(&mut form);
//!
//!     form.set_value("country", "US");
//!     engine.on_change("country", &mut form);
//! }
//! ```

pub mod adapter;
pub mod condition;
pub mod dispatch;
pub mod engine;
pub mod page;
pub mod schema;

// Re-export main types at crate root
pub use adapter::{FormAdapter, FormView, InMemoryForm};
pub use condition::evaluate as evaluate_condition;
pub use dispatch::{ChangeEvent, ChangeQueue};
pub use engine::{
    compute_block_visibility, compute_control_effects, compute_field_rules, BlockState,
    BlockStateUpdate, DependencyEngine, DependencyParseError, EngineBuilder, FieldState,
    FieldStateUpdate, FormState, StateUpdates, ValueChange,
};
pub use page::{build_engine, load_page, Banner, Bindings, PageInit, SCHEMA_ERROR_BANNER};
pub use schema::{
    AllowedValues, BlockDependency, BlockSchema, BlockSet, ConditionKind, ConditionSpec,
    ControlDependencyMap, ErrorKind, FieldSchema, FieldType, SchemaError, SchemaValidator,
    ValidationError,
};
