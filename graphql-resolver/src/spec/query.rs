//! Request parsing.
//!
//! A [`Query`] is the parsed form of a request document: its operations, their
//! variable definitions and their selection sets.

use apollo_parser::cst;
use apollo_parser::cst::CstNode;
use indexmap::IndexMap;

use crate::configuration::Configuration;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::node_name;
use crate::spec::FieldType;
use crate::spec::Selection;
use crate::spec::SpecError;

pub(crate) const TYPENAME: &str = "__typename";

/// A parsed request document.
#[derive(Debug)]
pub struct Query {
    operations: Vec<Operation>,
}

impl Query {
    /// Parses `query`, honoring the parser limits of `configuration`.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn parse(query: &str, configuration: &Configuration) -> Result<Self, SpecError> {
        let parser = apollo_parser::Parser::new(query)
            .recursion_limit(configuration.limits.parser_recursion_limit)
            .token_limit(configuration.limits.parser_token_limit);
        let tree = parser.parse();

        // Trace log recursion limit data
        let recursion_limit = tree.recursion_limit();
        tracing::trace!(?recursion_limit, "recursion limit data");

        let errors = tree.errors().collect::<Vec<_>>();
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|err| err.message())
                .collect::<Vec<_>>()
                .join(", ");
            let locations = errors
                .iter()
                .map(|err| Location::from_offset(query, err.index()))
                .collect();
            tracing::debug!("parsing error(s): {}", message);
            return Err(SpecError::ParsingError { message, locations });
        }

        let document = tree.document();
        let operations = document
            .definitions()
            .map(|definition| match definition {
                cst::Definition::OperationDefinition(operation) => Operation::from_ast(operation),
                cst::Definition::FragmentDefinition(_) => {
                    Err(SpecError::UnsupportedDefinition("fragment definitions"))
                }
                _ => Err(SpecError::UnsupportedDefinition("type system definitions")),
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        if operations.is_empty() {
            return Err(SpecError::NoOperation);
        }

        Ok(Query { operations })
    }

    /// Selects the operation to execute.
    ///
    /// Without a name, the document must contain a single operation.
    pub(crate) fn operation(&self, name: Option<&str>) -> Result<&Operation, SpecError> {
        let operation = match name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string()))?,
            None => match self.operations.as_slice() {
                [operation] => operation,
                _ => return Err(SpecError::MissingOperationName),
            },
        };

        match operation.kind {
            OperationKind::Query => Ok(operation),
            kind => Err(SpecError::UnsupportedOperation(kind.as_str())),
        }
    }
}

/// The type of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VariableDefinition {
    pub(crate) ty: FieldType,
    pub(crate) default_value: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct Operation {
    pub(crate) name: Option<String>,
    pub(crate) kind: OperationKind,
    pub(crate) variables: IndexMap<String, VariableDefinition>,
    pub(crate) selection_set: Vec<Selection>,
}

impl Operation {
    // Spec: https://spec.graphql.org/October2021/#sec-Language.Operations
    fn from_ast(operation: cst::OperationDefinition) -> Result<Self, SpecError> {
        let name = operation.name().map(|x| x.text().to_string());

        let kind = operation
            .operation_type()
            .and_then(|op| {
                op.query_token()
                    .map(|_| OperationKind::Query)
                    .or_else(|| op.mutation_token().map(|_| OperationKind::Mutation))
                    .or_else(|| op.subscription_token().map(|_| OperationKind::Subscription))
            })
            .unwrap_or(OperationKind::Query);

        let selection_set = operation
            .selection_set()
            .map(|selection_set| Selection::from_selection_set(selection_set, 0))
            .transpose()?
            .unwrap_or_default();

        let variables = operation
            .variable_definitions()
            .iter()
            .flat_map(|x| x.variable_definitions())
            .map(|definition| {
                let name = node_name(definition.variable().and_then(|v| v.name()))?;
                let ty: FieldType = definition
                    .ty()
                    .ok_or_else(|| SpecError::InvalidType(name.clone()))?
                    .try_into()?;
                Ok((
                    name,
                    VariableDefinition {
                        ty,
                        default_value: parse_default_value(&definition),
                    },
                ))
            })
            .collect::<Result<IndexMap<_, _>, SpecError>>()?;

        let operation = Operation {
            name,
            kind,
            variables,
            selection_set,
        };
        operation.check_variables_defined()?;
        Ok(operation)
    }

    fn check_variables_defined(&self) -> Result<(), SpecError> {
        let mut used = Vec::new();
        for selection in &self.selection_set {
            selection.variables_used(&mut used);
        }
        match used
            .into_iter()
            .find(|name| !self.variables.contains_key(*name))
        {
            Some(variable) => Err(SpecError::UndefinedVariable {
                variable: variable.to_string(),
                operation: self.name.clone().unwrap_or_else(|| "anonymous".to_string()),
            }),
            None => Ok(()),
        }
    }

    /// Checks the provided variables against their definitions and applies defaults.
    ///
    /// Variables the operation does not declare are dropped.
    pub(crate) fn coerce_variables(&self, provided: &Object) -> Result<Object, SpecError> {
        let mut coerced = Object::new();
        for (name, definition) in &self.variables {
            match provided.get(name.as_str()) {
                Some(value) => {
                    if definition.ty.validate_input_value(value).is_err() {
                        return Err(SpecError::InvalidVariable(format!(
                            "invalid type for variable: '{name}', expected {}",
                            definition.ty
                        )));
                    }
                    coerced.insert(name.as_str(), value.clone());
                }
                None => match &definition.default_value {
                    Some(default) => {
                        coerced.insert(name.as_str(), default.clone());
                    }
                    None if definition.ty.is_non_null() => {
                        return Err(SpecError::InvalidVariable(format!(
                            "missing value for non null variable '{name}'"
                        )));
                    }
                    None => {}
                },
            }
        }
        Ok(coerced)
    }

    /// Deepest field nesting of the operation.
    pub(crate) fn depth(&self) -> u32 {
        self.selection_set
            .iter()
            .map(Selection::depth)
            .max()
            .unwrap_or(0)
    }
}

fn parse_default_value(definition: &cst::VariableDefinition) -> Option<Value> {
    definition
        .default_value()
        .and_then(|v| v.value())
        .and_then(|value| parse_value(&value))
}

/// Converts a constant value to JSON.
///
/// Returns `None` if it contains a variable or a number that does not fit in 64 bits.
pub(crate) fn parse_value(value: &cst::Value) -> Option<Value> {
    match value {
        cst::Value::Variable(_) => None,
        cst::Value::StringValue(s) => Some(String::from(s.clone()).into()),
        cst::Value::FloatValue(f) => f
            .syntax()
            .to_string()
            .trim()
            .parse::<f64>()
            .ok()
            .map(Into::into),
        cst::Value::IntValue(i) => {
            let s = i.syntax().to_string();
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Into::into)
                .or_else(|| s.parse::<u64>().ok().map(Into::into))
        }
        cst::Value::BooleanValue(b) => {
            match (b.true_token().is_some(), b.false_token().is_some()) {
                (true, false) => Some(Value::Bool(true)),
                (false, true) => Some(Value::Bool(false)),
                _ => None,
            }
        }
        cst::Value::NullValue(_) => Some(Value::Null),
        cst::Value::EnumValue(e) => e.name().map(|n| n.text().to_string().into()),
        cst::Value::ListValue(l) => l
            .values()
            .map(|v| parse_value(&v))
            .collect::<Option<_>>()
            .map(Value::Array),
        cst::Value::ObjectValue(o) => o
            .object_fields()
            .map(|field| match (field.name(), field.value()) {
                (Some(name), Some(value)) => {
                    parse_value(&value).map(|v| (name.text().to_string().into(), v))
                }
                _ => None,
            })
            .collect::<Option<_>>()
            .map(Value::Object),
    }
}
