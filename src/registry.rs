//! Registries of form types and workflow instructions.
//!
//! Handlers are registered on a [`RegistryBuilder`] under a string key and
//! frozen into an immutable [`Registry`]. [`Registries`] bundles both kinds
//! and is passed explicitly to [`TaskView::compose`](crate::view::TaskView::compose),
//! which looks every key up once. There is no process-wide registry.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use manual_tasks::registry::{Instruction, Registries};
//!
//! struct Webhook;
//!
//! impl Instruction for Webhook {
//!     fn kind(&self) -> &str { "webhook" }
//!     fn title(&self) -> &str { "Webhook" }
//! }
//!
//! let registries = Registries::builder()
//!     .instruction(Arc::new(Webhook))
//!     .unwrap()
//!     .build();
//! assert!(registries.instructions().get("webhook").is_some());
//! assert!(registries.form_types().get("customForm").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ManualTaskError, Result};
use crate::types::{FormBlockConfig, UserJob};

/// Collects handlers before freezing them into a [`Registry`].
pub struct RegistryBuilder<T: ?Sized> {
    kind: &'static str,
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> RegistryBuilder<T> {
    /// Creates an empty builder; `kind` names the handlers in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    /// Registers `handler` under `key`. A key can be registered once.
    pub fn register(mut self, key: impl Into<String>, handler: Arc<T>) -> Result<Self> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(ManualTaskError::DuplicateRegistration { kind: self.kind, key });
        }
        self.entries.insert(key, handler);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry<T> {
        Registry {
            kind: self.kind,
            entries: self.entries,
        }
    }
}

/// Immutable string-keyed handler map.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Looks a handler up.
    pub fn get(&self, key: &str) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("keys", &self.keys())
            .finish()
    }
}

/// A kind of form block a manual node can hold.
pub trait ManualFormType: Send + Sync {
    /// Registry key, matching a form block's `type`.
    fn key(&self) -> &str;

    /// Display title.
    fn title(&self) -> &str;

    /// Checks a block's configuration.
    fn check_block(&self, _block_key: &str, _config: &FormBlockConfig) -> Result<()> {
        Ok(())
    }

    /// Values the form starts with: what the job recorded for this block,
    /// or nothing.
    fn initial_values(&self, job: &UserJob, block_key: &str) -> Map<String, Value> {
        job.result.form(block_key).cloned().unwrap_or_default()
    }
}

/// A workflow node type whose output can feed a manual form.
pub trait Instruction: Send + Sync {
    /// Node `type` this handler serves.
    fn kind(&self) -> &str;

    /// Display title.
    fn title(&self) -> &str;

    /// Whether downstream forms can reference this node's output.
    fn provides_variables(&self) -> bool {
        true
    }
}

/// Free-form values stored only in the job result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomForm;

impl ManualFormType for CustomForm {
    fn key(&self) -> &str {
        "customForm"
    }

    fn title(&self) -> &str {
        "Custom form"
    }
}

/// A form that creates a record in a collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateRecordForm;

impl ManualFormType for CreateRecordForm {
    fn key(&self) -> &str {
        "createRecord"
    }

    fn title(&self) -> &str {
        "Create record form"
    }

    fn check_block(&self, block_key: &str, config: &FormBlockConfig) -> Result<()> {
        require_collection(self.key(), block_key, config)
    }
}

/// A form that updates a record in a collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRecordForm;

impl ManualFormType for UpdateRecordForm {
    fn key(&self) -> &str {
        "updateRecord"
    }

    fn title(&self) -> &str {
        "Update record form"
    }

    fn check_block(&self, block_key: &str, config: &FormBlockConfig) -> Result<()> {
        require_collection(self.key(), block_key, config)
    }
}

fn require_collection(form_type: &str, block_key: &str, config: &FormBlockConfig) -> Result<()> {
    match config.collection.as_deref() {
        Some(c) if !c.is_empty() => Ok(()),
        _ => Err(ManualTaskError::InvalidFormBlock {
            block: block_key.to_string(),
            reason: format!("{form_type} needs a collection"),
        }),
    }
}

/// A built-in instruction described by its key and title only.
#[derive(Debug, Clone)]
pub struct BuiltinInstruction {
    kind: &'static str,
    title: &'static str,
    provides_variables: bool,
}

impl Instruction for BuiltinInstruction {
    fn kind(&self) -> &str {
        self.kind
    }

    fn title(&self) -> &str {
        self.title
    }

    fn provides_variables(&self) -> bool {
        self.provides_variables
    }
}

const BUILTIN_INSTRUCTIONS: &[BuiltinInstruction] = &[
    BuiltinInstruction {
        kind: "manual",
        title: "Manual process",
        provides_variables: true,
    },
    BuiltinInstruction {
        kind: "calculation",
        title: "Calculation",
        provides_variables: true,
    },
    BuiltinInstruction {
        kind: "query",
        title: "Query record",
        provides_variables: true,
    },
    BuiltinInstruction {
        kind: "create",
        title: "Create record",
        provides_variables: true,
    },
    BuiltinInstruction {
        kind: "update",
        title: "Update record",
        provides_variables: true,
    },
    BuiltinInstruction {
        kind: "condition",
        title: "Condition",
        provides_variables: false,
    },
    BuiltinInstruction {
        kind: "parallel",
        title: "Parallel branch",
        provides_variables: false,
    },
];

/// Form type and instruction registries for view composition.
#[derive(Debug)]
pub struct Registries {
    form_types: Registry<dyn ManualFormType>,
    instructions: Registry<dyn Instruction>,
}

impl Registries {
    /// Built-in form types and instructions.
    pub fn with_defaults() -> Self {
        Self::builder().build()
    }

    /// Starts from the built-ins; add handlers and call
    /// [`RegistriesBuilder::build`].
    pub fn builder() -> RegistriesBuilder {
        RegistriesBuilder::with_defaults()
    }

    /// Form type registry.
    pub fn form_types(&self) -> &Registry<dyn ManualFormType> {
        &self.form_types
    }

    /// Instruction registry.
    pub fn instructions(&self) -> &Registry<dyn Instruction> {
        &self.instructions
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for [`Registries`].
pub struct RegistriesBuilder {
    form_types: RegistryBuilder<dyn ManualFormType>,
    instructions: RegistryBuilder<dyn Instruction>,
}

impl RegistriesBuilder {
    /// Empty builder without the built-ins.
    pub fn empty() -> Self {
        Self {
            form_types: RegistryBuilder::new("form type"),
            instructions: RegistryBuilder::new("instruction"),
        }
    }

    fn with_defaults() -> Self {
        let mut form_types: HashMap<String, Arc<dyn ManualFormType>> = HashMap::new();
        let builtin_forms: [Arc<dyn ManualFormType>; 3] = [
            Arc::new(CustomForm),
            Arc::new(CreateRecordForm),
            Arc::new(UpdateRecordForm),
        ];
        for form in builtin_forms {
            form_types.insert(form.key().to_string(), form);
        }

        let mut instructions: HashMap<String, Arc<dyn Instruction>> = HashMap::new();
        for instruction in BUILTIN_INSTRUCTIONS {
            instructions.insert(instruction.kind.to_string(), Arc::new(instruction.clone()));
        }

        Self {
            form_types: RegistryBuilder {
                kind: "form type",
                entries: form_types,
            },
            instructions: RegistryBuilder {
                kind: "instruction",
                entries: instructions,
            },
        }
    }

    /// Registers a form type under its own key.
    pub fn form_type(mut self, form_type: Arc<dyn ManualFormType>) -> Result<Self> {
        let key = form_type.key().to_string();
        self.form_types = self.form_types.register(key, form_type)?;
        Ok(self)
    }

    /// Registers an instruction under its node type.
    pub fn instruction(mut self, instruction: Arc<dyn Instruction>) -> Result<Self> {
        let key = instruction.kind().to_string();
        self.instructions = self.instructions.register(key, instruction)?;
        Ok(self)
    }

    /// Freezes both registries.
    pub fn build(self) -> Registries {
        Registries {
            form_types: self.form_types.build(),
            instructions: self.instructions.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_register_builtin_form_types() {
        let registries = Registries::with_defaults();
        assert_eq!(
            registries.form_types().keys(),
            vec!["createRecord", "customForm", "updateRecord"]
        );
        assert!(registries.instructions().contains("manual"));
        assert!(!registries.instructions().get("condition").unwrap().provides_variables());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Registries::builder()
            .form_type(Arc::new(CustomForm))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ManualTaskError::DuplicateRegistration { kind: "form type", .. }
        ));
    }

    #[test]
    fn empty_builder_has_nothing() {
        let registries = RegistriesBuilder::empty().build();
        assert!(registries.form_types().is_empty());
        assert_eq!(registries.instructions().len(), 0);
    }

    #[test]
    fn record_forms_need_a_collection() {
        let config: FormBlockConfig = serde_json::from_value(json!({ "type": "createRecord" })).unwrap();
        assert!(CreateRecordForm.check_block("f", &config).is_err());
        assert!(CustomForm.check_block("f", &config).is_ok());

        let config: FormBlockConfig =
            serde_json::from_value(json!({ "type": "updateRecord", "collection": "posts" })).unwrap();
        assert!(UpdateRecordForm.check_block("f", &config).is_ok());
    }

    #[test]
    fn initial_values_come_from_the_job_result() {
        let mut job = UserJob::pending(1, 10);
        job.result.forms.insert("f".into(), json!({ "a": 1 }));
        assert_eq!(CustomForm.initial_values(&job, "f")["a"], json!(1));
        assert!(CustomForm.initial_values(&job, "g").is_empty());
    }
}
