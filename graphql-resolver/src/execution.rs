//! The resolution engine.
//!
//! A request is parsed into a [`Query`], its operation is selected and its
//! variables coerced. The selection set is then resolved depth-first against
//! the root query type: every field is looked up in the schema, its arguments
//! are bound, its resolver is awaited and the returned value is completed
//! against the declared type of the field.
//!
//! Failures before execution starts abort the whole request and the response
//! carries no data. Failures during execution are localized: the failing field
//! is left out of the data and an error with its path is appended to the
//! response errors, in resolution order.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use static_assertions::assert_impl_all;

use crate::configuration::Configuration;
use crate::context::Context;
use crate::error::FieldError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::resolver::ResolveInfo;
use crate::spec::Argument;
use crate::spec::Field;
use crate::spec::FieldType;
use crate::spec::ObjectType;
use crate::spec::Operation;
use crate::spec::Query;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SpecError;

assert_impl_all!(Engine: Send, Sync);
assert_impl_all!(Context: Send, Sync);

/// Resolves requests against a [`Schema`].
///
/// An `Engine` is immutable and can be shared between tasks behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Engine {
    schema: Arc<Schema>,
    configuration: Arc<Configuration>,
}

#[buildstructor::buildstructor]
impl Engine {
    #[builder(visibility = "pub")]
    fn new(schema: Schema, configuration: Option<Configuration>) -> Self {
        Self {
            schema: Arc::new(schema),
            configuration: Arc::new(configuration.unwrap_or_default()),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Resolves `request`. Never fails: errors are reported in the [`Response`].
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn execute(&self, request: impl Into<Request>, context: &Context) -> Response {
        let request = request.into();
        execute_request(&self.schema, &self.configuration, &request, context).await
    }
}

/// Resolves a request string against `schema` with the default configuration.
pub async fn execute(schema: &Schema, request: &str, context: &Context) -> Response {
    execute_request(
        schema,
        &Configuration::default(),
        &Request::from(request),
        context,
    )
    .await
}

async fn execute_request(
    schema: &Schema,
    configuration: &Configuration,
    request: &Request,
    context: &Context,
) -> Response {
    let query = match request.query.as_deref() {
        Some(query) => query,
        None => return failure(SpecError::MissingQuery),
    };
    let query = match Query::parse(query, configuration) {
        Ok(query) => query,
        Err(error) => return failure(error),
    };
    let (operation, variables) = match prepare(&query, configuration, request) {
        Ok(prepared) => prepared,
        Err(error) => return failure(error),
    };

    let execution = Execution {
        schema,
        context,
        variables: &variables,
    };
    let mut errors = Vec::new();
    let data = execution
        .execute_selection_set(
            schema.query_type(),
            &Value::Null,
            &operation.selection_set,
            &Path::empty(),
            &mut errors,
        )
        .await;

    tracing::debug!(errors = errors.len(), "request resolved");
    Response::builder()
        .data(Value::Object(data))
        .errors(errors)
        .build()
}

fn prepare<'q>(
    query: &'q Query,
    configuration: &Configuration,
    request: &Request,
) -> Result<(&'q Operation, Object), SpecError> {
    let operation = query.operation(request.operation_name.as_deref())?;
    if let Some(limit) = configuration.limits.max_depth {
        let depth = operation.depth();
        if depth > limit {
            return Err(SpecError::MaxDepthExceeded { depth, limit });
        }
    }
    let variables = operation.coerce_variables(&request.variables)?;
    Ok((operation, variables))
}

fn failure(error: SpecError) -> Response {
    tracing::debug!(%error, "request could not be executed");
    let mut graphql_error = error.to_graphql_error(None);
    graphql_error.locations = error.locations().to_vec();
    Response::builder().error(graphql_error).build()
}

/// A field error and the response path it belongs to.
#[derive(Debug)]
struct FieldFailure {
    path: Path,
    error: FieldError,
}

impl FieldFailure {
    fn new(path: &Path, error: impl Into<FieldError>) -> Self {
        Self {
            path: path.clone(),
            error: error.into(),
        }
    }

    fn into_graphql_error(self) -> Error {
        tracing::debug!(path = %self.path, error = %self.error, "field error");
        self.error.to_graphql_error(Some(self.path))
    }
}

/// State of a single resolution pass.
struct Execution<'a> {
    schema: &'a Schema,
    context: &'a Context,
    variables: &'a Object,
}

impl<'a> Execution<'a> {
    fn execute_selection_set<'b>(
        &'b self,
        object_type: &'b ObjectType,
        source: &'b Value,
        selection_set: &'b [Selection],
        path: &'b Path,
        errors: &'b mut Vec<Error>,
    ) -> BoxFuture<'b, Object> {
        async move {
            let mut output = Object::new();
            for selection in selection_set {
                if selection.include_skip.should_skip(self.variables) {
                    continue;
                }
                let key = selection.response_key();

                if selection.is_typename_field() {
                    output.insert(key, Value::String(object_type.name().into()));
                    continue;
                }

                let field_path = path.join(key);
                match self
                    .resolve_field(object_type, source, selection, &field_path, errors)
                    .await
                {
                    Ok(value) => match output.get_mut(key) {
                        // the same response key selected twice
                        Some(existing) => existing.deep_merge(value),
                        None => {
                            output.insert(key, value);
                        }
                    },
                    Err(failure) => errors.push(failure.into_graphql_error()),
                }
            }
            output
        }
        .boxed()
    }

    async fn resolve_field(
        &self,
        object_type: &ObjectType,
        source: &Value,
        selection: &Selection,
        path: &Path,
        errors: &mut Vec<Error>,
    ) -> Result<Value, FieldFailure> {
        let field = object_type.field(&selection.name).ok_or_else(|| {
            FieldFailure::new(
                path,
                FieldError::FieldNotFound {
                    type_name: object_type.name().to_string(),
                    field: selection.name.clone(),
                },
            )
        })?;

        match (field.ty().inner_type_name(), &selection.selection_set) {
            (Some(_), None) => {
                return Err(FieldFailure::new(
                    path,
                    FieldError::MissingSubselection {
                        field: field.name().to_string(),
                        ty: field.ty().to_string(),
                    },
                ))
            }
            (None, Some(_)) => {
                return Err(FieldFailure::new(
                    path,
                    FieldError::UnexpectedSubselection {
                        field: field.name().to_string(),
                        ty: field.ty().to_string(),
                    },
                ))
            }
            _ => {}
        }

        let arguments = self
            .coerce_arguments(object_type, field, selection)
            .map_err(|error| FieldFailure::new(path, error))?;

        let resolved = match field.resolver() {
            Some(resolver) => {
                let info = ResolveInfo {
                    context: self.context,
                    source,
                    arguments: &arguments,
                    field_name: field.name(),
                    parent_type: object_type.name(),
                    path,
                };
                resolver
                    .resolve(&info)
                    .await
                    .map_err(|error| FieldFailure::new(path, error))?
            }
            // default resolver: read the parent value
            None => source
                .as_object()
                .and_then(|parent| parent.get(field.name()))
                .cloned()
                .unwrap_or_default(),
        };
        tracing::trace!(%path, "resolved field");

        self.complete_value(
            object_type.name(),
            field.name(),
            field.ty(),
            resolved,
            selection.selection_set.as_deref().unwrap_or_default(),
            path.clone(),
            errors,
        )
        .await
    }

    /// Binds the arguments of `selection`, applies defaults and checks every value
    /// against the declared argument type.
    fn coerce_arguments(
        &self,
        object_type: &ObjectType,
        field: &Field,
        selection: &Selection,
    ) -> Result<Object, FieldError> {
        if let Some((name, _)) = selection
            .arguments
            .iter()
            .find(|(name, _)| field.get_argument(name).is_none())
        {
            return Err(FieldError::UnknownArgument {
                type_name: object_type.name().to_string(),
                field: field.name().to_string(),
                argument: name.clone(),
            });
        }

        let invalid_argument = |argument: &Argument| FieldError::InvalidArgument {
            type_name: object_type.name().to_string(),
            field: field.name().to_string(),
            argument: argument.name().to_string(),
            ty: argument.ty().to_string(),
        };

        let mut coerced = Object::new();
        for argument in field.arguments() {
            let provided = match selection
                .arguments
                .iter()
                .find(|(name, _)| name == argument.name())
            {
                Some((_, value)) => value
                    .bind(self.variables)
                    .map_err(|_| invalid_argument(argument))?,
                None => None,
            };
            let value = match (provided, argument.default()) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) if argument.is_required() => {
                    return Err(FieldError::MissingArgument {
                        type_name: object_type.name().to_string(),
                        field: field.name().to_string(),
                        argument: argument.name().to_string(),
                        ty: argument.ty().to_string(),
                    })
                }
                (None, None) => continue,
            };
            if argument.ty().validate_input_value(&value).is_err() {
                return Err(invalid_argument(argument));
            }
            coerced.insert(argument.name(), value);
        }
        Ok(coerced)
    }

    /// <https://spec.graphql.org/October2021/#CompleteValue()>
    #[allow(clippy::too_many_arguments)]
    fn complete_value<'b>(
        &'b self,
        parent_type: &'b str,
        field_name: &'b str,
        ty: &'b FieldType,
        value: Value,
        selection_set: &'b [Selection],
        path: Path,
        errors: &'b mut Vec<Error>,
    ) -> BoxFuture<'b, Result<Value, FieldFailure>> {
        async move {
            match ty {
                FieldType::NonNull(inner_ty) => {
                    if value.is_null() {
                        let error = match path.last() {
                            Some(PathElement::Index(index)) => FieldError::InvalidValue(format!(
                                "Cannot return null for non-nullable array element of type {inner_ty} at index {index}"
                            )),
                            _ => FieldError::NonNullableField {
                                type_name: parent_type.to_string(),
                                field: field_name.to_string(),
                            },
                        };
                        return Err(FieldFailure::new(&path, error));
                    }
                    self.complete_value(
                        parent_type,
                        field_name,
                        inner_ty,
                        value,
                        selection_set,
                        path,
                        errors,
                    )
                    .await
                }
                _ if value.is_null() => Ok(Value::Null),
                FieldType::List(inner_ty) => {
                    let items = match value {
                        Value::Array(items) => items,
                        other => {
                            return Err(FieldFailure::new(
                                &path,
                                FieldError::InvalidValue(format!(
                                    "Resolver returned {other}, expected {ty}"
                                )),
                            ))
                        }
                    };
                    let mut completed = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let item_path = path.join(index);
                        match self
                            .complete_value(
                                parent_type,
                                field_name,
                                inner_ty,
                                item,
                                selection_set,
                                item_path,
                                errors,
                            )
                            .await
                        {
                            Ok(item) => completed.push(item),
                            // a nullable item is replaced by null, a non-null one fails the list
                            Err(failure) if !inner_ty.is_non_null() => {
                                errors.push(failure.into_graphql_error());
                                completed.push(Value::Null);
                            }
                            Err(failure) => return Err(failure),
                        }
                    }
                    Ok(Value::Array(completed))
                }
                FieldType::Named(name) => {
                    let object_type = self.schema.object_type(name).ok_or_else(|| {
                        FieldFailure::new(
                            &path,
                            FieldError::InvalidValue(format!("Undefined type {name}")),
                        )
                    })?;
                    let source: Result<Object, String> = ensure_object!(value);
                    let source = Value::Object(source.map_err(|message| {
                        FieldFailure::new(
                            &path,
                            FieldError::InvalidValue(format!(
                                "Resolver returned a value of type {name}: {message}"
                            )),
                        )
                    })?);
                    let output = self
                        .execute_selection_set(object_type, &source, selection_set, &path, errors)
                        .await;
                    Ok(Value::Object(output))
                }
                scalar => complete_scalar(scalar, value)
                    .map_err(|message| FieldFailure::new(&path, FieldError::InvalidValue(message))),
            }
        }
        .boxed()
    }
}

// Built-in scalars are checked strictly. The only conversions are Int to Float
// and Int to ID, which do not lose information.
fn complete_scalar(ty: &FieldType, value: Value) -> Result<Value, String> {
    match ty {
        // https://spec.graphql.org/October2021/#sec-Int.Result-Coercion
        FieldType::Int => match value.as_i64() {
            Some(int) if i32::try_from(int).is_ok() => Ok(value),
            Some(_) => Err(format!("Resolver returned {value} which overflows Int")),
            None => Err(format!("Resolver returned {value}, expected Int")),
        },
        // https://spec.graphql.org/October2021/#sec-Float.Result-Coercion
        FieldType::Float if value.is_valid_float_input() => Ok(value),
        // https://spec.graphql.org/October2021/#sec-String.Result-Coercion
        FieldType::String if value.is_string() => Ok(value),
        // https://spec.graphql.org/October2021/#sec-Boolean.Result-Coercion
        FieldType::Boolean if value.is_boolean() => Ok(value),
        // https://spec.graphql.org/October2021/#sec-ID.Result-Coercion
        FieldType::Id => match &value {
            Value::String(_) => Ok(value),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string().into()))
            }
            _ => Err(format!("Resolver returned {value}, expected ID")),
        },
        _ => Err(format!("Resolver returned {value}, expected {ty}")),
    }
}
