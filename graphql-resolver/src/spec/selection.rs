use apollo_parser::cst;
use apollo_parser::cst::CstNode;

use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::query::parse_value;
use crate::spec::InvalidValue;
use crate::spec::SpecError;
use crate::spec::TYPENAME;

/// A field selected by the request.
///
/// Selections are not checked against the schema when parsed: unknown
/// fields and bad arguments are reported per field during execution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) arguments: Vec<(String, InputValue)>,
    pub(crate) selection_set: Option<Vec<Selection>>,
    pub(crate) include_skip: IncludeSkip,
}

impl Selection {
    pub(crate) fn from_ast(
        selection: cst::Selection,
        mut count: usize,
    ) -> Result<Option<Self>, SpecError> {
        // The RECURSION_LIMIT is chosen to be:
        //   < # expected to cause stack overflow &&
        //   > # expected in a legitimate query
        const RECURSION_LIMIT: usize = 512;
        if count > RECURSION_LIMIT {
            tracing::error!("selection processing recursion limit({RECURSION_LIMIT}) exceeded");
            return Err(SpecError::RecursionLimitExceeded);
        }
        count += 1;

        match selection {
            // Spec: https://spec.graphql.org/October2021/#Field
            cst::Selection::Field(field) => {
                let include_skip = IncludeSkip::parse(field.directives());
                if include_skip.statically_skipped() {
                    return Ok(None);
                }

                let name = node_name(field.name())?;
                let alias = field
                    .alias()
                    .map(|alias| node_name(alias.name()))
                    .transpose()?;

                let arguments = field
                    .arguments()
                    .iter()
                    .flat_map(|arguments| arguments.arguments())
                    .map(|argument| {
                        let name = node_name(argument.name())?;
                        let value = argument
                            .value()
                            .map(|value| InputValue::from_ast(&value))
                            .transpose()?
                            .unwrap_or(InputValue::Constant(Value::Null));
                        Ok((name, value))
                    })
                    .collect::<Result<Vec<_>, SpecError>>()?;

                let selection_set = field
                    .selection_set()
                    .map(|selection_set| Self::from_selection_set(selection_set, count))
                    .transpose()?;

                Ok(Some(Self {
                    name,
                    alias,
                    arguments,
                    selection_set,
                    include_skip,
                }))
            }
            cst::Selection::InlineFragment(_) => {
                Err(SpecError::UnsupportedDefinition("inline fragments"))
            }
            cst::Selection::FragmentSpread(_) => {
                Err(SpecError::UnsupportedDefinition("fragment spreads"))
            }
        }
    }

    /// Parses every selection of the set, dropping the statically skipped ones.
    pub(crate) fn from_selection_set(
        selection_set: cst::SelectionSet,
        count: usize,
    ) -> Result<Vec<Self>, SpecError> {
        selection_set
            .selections()
            .map(|selection| Self::from_ast(selection, count))
            .collect::<Result<Vec<Option<_>>, _>>()
            .map(|selections| selections.into_iter().flatten().collect())
    }

    /// The key of this field in the response: its alias, or its name.
    pub(crate) fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn is_typename_field(&self) -> bool {
        self.name == TYPENAME
    }

    /// Number of nested field levels, this one included.
    pub(crate) fn depth(&self) -> u32 {
        1 + self
            .selection_set
            .iter()
            .flatten()
            .map(Selection::depth)
            .max()
            .unwrap_or(0)
    }

    /// Collects the names of the variables referenced by this selection and its children.
    pub(crate) fn variables_used<'a>(&'a self, names: &mut Vec<&'a str>) {
        for (_, value) in &self.arguments {
            value.variables_used(names);
        }
        self.include_skip.variables_used(names);
        for selection in self.selection_set.iter().flatten() {
            selection.variables_used(names);
        }
    }
}

pub(crate) fn node_name(name: Option<cst::Name>) -> Result<String, SpecError> {
    name.map(|name| name.text().to_string())
        .ok_or_else(|| SpecError::ParsingError {
            message: "expected a name".to_string(),
            locations: Vec::new(),
        })
}

/// An argument value as written in the request: a constant, or something
/// that contains variables and must be bound before execution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputValue {
    Variable(String),
    Constant(Value),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
    /// A literal with no JSON representation, such as an int beyond 64 bits.
    /// Rejected when the argument is bound.
    Invalid(String),
}

impl InputValue {
    fn from_ast(value: &cst::Value) -> Result<Self, SpecError> {
        Ok(match value {
            cst::Value::Variable(variable) => InputValue::Variable(node_name(variable.name())?),
            cst::Value::ListValue(list) => InputValue::List(
                list.values()
                    .map(|value| InputValue::from_ast(&value))
                    .collect::<Result<_, _>>()?,
            ),
            cst::Value::ObjectValue(object) => InputValue::Object(
                object
                    .object_fields()
                    .map(|field| {
                        let name = node_name(field.name())?;
                        let value = field
                            .value()
                            .map(|value| InputValue::from_ast(&value))
                            .transpose()?
                            .unwrap_or(InputValue::Constant(Value::Null));
                        Ok((name, value))
                    })
                    .collect::<Result<_, SpecError>>()?,
            ),
            constant => match parse_value(constant) {
                Some(value) => InputValue::Constant(value),
                None => InputValue::Invalid(constant.syntax().to_string().trim().to_string()),
            },
        })
    }

    /// Replaces variables by their coerced values.
    ///
    /// Returns `Ok(None)` for a variable that was neither provided nor defaulted:
    /// the argument then counts as absent.
    pub(crate) fn bind(&self, variables: &Object) -> Result<Option<Value>, InvalidValue> {
        Ok(match self {
            InputValue::Variable(name) => variables.get(name.as_str()).cloned(),
            InputValue::Constant(value) => Some(value.clone()),
            InputValue::List(values) => Some(Value::Array(
                values
                    .iter()
                    .map(|value| Ok(value.bind(variables)?.unwrap_or(Value::Null)))
                    .collect::<Result<_, InvalidValue>>()?,
            )),
            InputValue::Object(fields) => {
                let mut object = Object::new();
                for (name, value) in fields {
                    if let Some(value) = value.bind(variables)? {
                        object.insert(name.as_str(), value);
                    }
                }
                Some(Value::Object(object))
            }
            InputValue::Invalid(literal) => {
                tracing::debug!(%literal, "argument literal has no JSON representation");
                return Err(InvalidValue);
            }
        })
    }

    fn variables_used<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            InputValue::Variable(name) => names.push(name),
            InputValue::Constant(_) | InputValue::Invalid(_) => {}
            InputValue::List(values) => values.iter().for_each(|v| v.variables_used(names)),
            InputValue::Object(fields) => fields.iter().for_each(|(_, v)| v.variables_used(names)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Condition {
    Yes,
    No,
    Variable(String),
}

impl IncludeSkip {
    pub(crate) fn parse(directives: Option<cst::Directives>) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in directives.iter().flat_map(|d| d.directives()) {
            let name = directive.name().map(|name| name.text().to_string());
            match name.as_deref() {
                Some("include") if include.is_none() => include = Condition::parse(&directive),
                Some("skip") if skip.is_none() => skip = Condition::parse(&directive),
                _ => {}
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    pub(crate) fn statically_skipped(&self) -> bool {
        matches!(self.skip, Condition::Yes) || matches!(self.include, Condition::No)
    }

    pub(crate) fn should_skip(&self, variables: &Object) -> bool {
        // Using .unwrap_or is legit here because
        // the operation's variables have already been coerced
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }

    fn variables_used<'a>(&'a self, names: &mut Vec<&'a str>) {
        for condition in [&self.include, &self.skip] {
            if let Condition::Variable(name) = condition {
                names.push(name);
            }
        }
    }
}

impl Default for IncludeSkip {
    fn default() -> Self {
        Self {
            include: Condition::Yes,
            skip: Condition::No,
        }
    }
}

impl Condition {
    pub(crate) fn parse(directive: &cst::Directive) -> Option<Self> {
        let value = directive
            .arguments()?
            .arguments()
            .find(|argument| {
                argument
                    .name()
                    .map(|name| name.text().to_string() == "if")
                    .unwrap_or(false)
            })?
            .value()?;
        match value {
            cst::Value::BooleanValue(b) => {
                match (b.true_token().is_some(), b.false_token().is_some()) {
                    (true, false) => Some(Condition::Yes),
                    (false, true) => Some(Condition::No),
                    _ => None,
                }
            }
            cst::Value::Variable(variable) => variable
                .name()
                .map(|name| Condition::Variable(name.text().to_string())),
            _ => None,
        }
    }

    pub(crate) fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    fn selections(query: &str) -> Result<Vec<Selection>, SpecError> {
        let tree = apollo_parser::Parser::new(query).parse();
        assert_eq!(tree.errors().count(), 0);
        let selection_set = tree
            .document()
            .definitions()
            .find_map(|definition| match definition {
                cst::Definition::OperationDefinition(operation) => operation.selection_set(),
                _ => None,
            })
            .unwrap();
        Selection::from_selection_set(selection_set, 0)
    }

    #[test]
    fn fields_aliases_and_arguments() {
        let selections =
            selections(r#"{ me: user(login: "alice", tags: [$tag, "b"]) { login permissions } hello }"#)
                .unwrap();
        assert_eq!(selections.len(), 2);

        let user = &selections[0];
        assert_eq!(user.name, "user");
        assert_eq!(user.response_key(), "me");
        assert_eq!(user.depth(), 2);
        assert_eq!(
            user.arguments[0],
            ("login".to_string(), InputValue::Constant(json!("alice")))
        );
        assert_eq!(
            user.arguments[1].1,
            InputValue::List(vec![
                InputValue::Variable("tag".to_string()),
                InputValue::Constant(json!("b")),
            ])
        );
        let mut used = Vec::new();
        user.variables_used(&mut used);
        assert_eq!(used, ["tag"]);

        let hello = &selections[1];
        assert_eq!(hello.response_key(), "hello");
        assert_eq!(hello.selection_set, None);
        assert_eq!(hello.depth(), 1);
    }

    #[test]
    fn bind_variables() {
        let value = InputValue::List(vec![
            InputValue::Variable("tag".to_string()),
            InputValue::Variable("missing".to_string()),
        ]);
        let mut variables = Object::new();
        variables.insert("tag", json!("a"));
        assert_eq!(value.bind(&variables), Ok(Some(json!(["a", null]))));
        assert_eq!(
            InputValue::Variable("missing".to_string()).bind(&variables),
            Ok(None)
        );
    }

    #[test]
    fn out_of_range_literals_fail_when_bound() {
        let selections = selections("{ count(value: [1, 99999999999999999999]) }").unwrap();
        let (_, value) = &selections[0].arguments[0];
        assert_eq!(
            value,
            &InputValue::List(vec![
                InputValue::Constant(json!(1)),
                InputValue::Invalid("99999999999999999999".to_string()),
            ])
        );
        assert_eq!(value.bind(&Object::new()), Err(InvalidValue));
    }

    #[test]
    fn include_skip() {
        let selections = selections(
            "{ a @skip(if: true) b @include(if: false) c @skip(if: false) d @include(if: $show) }",
        )
        .unwrap();
        assert_eq!(
            selections
                .iter()
                .map(Selection::response_key)
                .collect::<Vec<_>>(),
            ["c", "d"]
        );

        let d = &selections[1];
        let mut variables = Object::new();
        assert!(!d.include_skip.should_skip(&variables));
        variables.insert("show", json!(false));
        assert!(d.include_skip.should_skip(&variables));
        assert!(!selections[0].include_skip.should_skip(&variables));
    }

    #[test]
    fn fragments_are_rejected() {
        assert_eq!(
            selections("{ ... on Query { hello } }").unwrap_err(),
            SpecError::UnsupportedDefinition("inline fragments")
        );
        assert_eq!(
            selections("{ ...Parts }").unwrap_err(),
            SpecError::UnsupportedDefinition("fragment spreads")
        );
    }
}
