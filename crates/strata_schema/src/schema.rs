//! Declarative schemas and their builder.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::types::FieldType;
use crate::validator;

/// Check run against a parsed object. Returns the failure message.
pub type RuleFn = Arc<dyn Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync>;

/// A declared field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
}

/// What to do with keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    /// Drop them silently.
    #[default]
    Strip,
    /// Fail with `UnknownField`.
    Reject,
}

/// One alternative of a tagged union: a named set of fields.
#[derive(Debug, Clone)]
pub struct VariantGroup {
    pub name: String,
    pub fields: Vec<String>,
}

impl VariantGroup {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, fields: &[S]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }

    /// A group made of a single field of the same name.
    pub fn single(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            fields: vec![field],
        }
    }

    /// A group is selected when any of its fields is present.
    pub fn is_present(&self, object: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .any(|f| object.get(f).is_some_and(|v| !v.is_null()))
    }
}

/// Mutually exclusive field groups.
#[derive(Debug, Clone)]
pub struct VariantRule {
    pub groups: Vec<VariantGroup>,
    /// When false, selecting no group is allowed.
    pub required: bool,
}

impl VariantRule {
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }
}

/// A schema-level rule spanning several fields.
#[derive(Clone)]
pub struct CrossFieldRule {
    pub name: String,
    pub fields: Vec<String>,
    pub check: RuleFn,
}

impl fmt::Debug for CrossFieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Shape and constraint description of a configuration object.
///
/// Built once through [`SchemaBuilder`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    variants: Vec<VariantRule>,
    rules: Vec<CrossFieldRule>,
    unknown_keys: UnknownKeys,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn variants(&self) -> &[VariantRule] {
        &self.variants
    }

    pub fn rules(&self) -> &[CrossFieldRule] {
        &self.rules
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }
}

/// Builder for [`Schema`]. Declaration order is validation order.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    variants: Vec<VariantRule>,
    rules: Vec<CrossFieldRule>,
    unknown_keys: UnknownKeys,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            variants: Vec::new(),
            rules: Vec::new(),
            unknown_keys: UnknownKeys::default(),
        }
    }

    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: true,
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: false,
            default: None,
        });
        self
    }

    /// Optional field substituted with `default` when absent.
    pub fn with_default(mut self, name: impl Into<String>, ty: FieldType, default: Value) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        });
        self
    }

    /// Exactly one of the given single-field groups must be present.
    pub fn exactly_one_of<S: AsRef<str>>(self, fields: &[S]) -> Self {
        let groups = fields.iter().map(|f| VariantGroup::single(f.as_ref())).collect();
        self.variant(groups, true)
    }

    /// At most one of the given single-field groups may be present.
    pub fn at_most_one_of<S: AsRef<str>>(self, fields: &[S]) -> Self {
        let groups = fields.iter().map(|f| VariantGroup::single(f.as_ref())).collect();
        self.variant(groups, false)
    }

    /// Exactly one of several multi-field groups must be present.
    pub fn exactly_one_of_groups(self, groups: Vec<VariantGroup>) -> Self {
        self.variant(groups, true)
    }

    fn variant(mut self, groups: Vec<VariantGroup>, required: bool) -> Self {
        self.variants.push(VariantRule { groups, required });
        self
    }

    /// Add a cross-field rule. `fields` lists every field the rule reads.
    pub fn rule<S: AsRef<str>>(
        mut self,
        name: impl Into<String>,
        fields: &[S],
        check: impl Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(CrossFieldRule {
            name: name.into(),
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            check: Arc::new(check),
        });
        self
    }

    pub fn reject_unknown(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Reject;
        self
    }

    /// Finish the schema, checking its declaration invariants.
    pub fn build(self) -> SchemaResult<Schema> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for variant in &self.variants {
            for group in &variant.groups {
                for field in &group.fields {
                    if !seen.contains(field.as_str()) {
                        return Err(SchemaError::UndeclaredField {
                            schema: self.name.clone(),
                            rule: format!("variant {}", group.name),
                            field: field.clone(),
                        });
                    }
                }
            }
        }

        for rule in &self.rules {
            for field in &rule.fields {
                if !seen.contains(field.as_str()) {
                    return Err(SchemaError::UndeclaredField {
                        schema: self.name.clone(),
                        rule: rule.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        for field in &self.fields {
            if let Some(default) = &field.default {
                validator::check_value(&field.ty, default, &field.name).map_err(|e| {
                    SchemaError::InvalidDefault {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        reason: e.to_string(),
                    }
                })?;
            }
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
            variants: self.variants,
            rules: self.rules,
            unknown_keys: self.unknown_keys,
        })
    }
}
