//! Engine configuration.
//!
//! Can be created through `serde::Deserialize` from YAML with [`Configuration::from_yaml`],
//! or inline in Rust code with the builders.

use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not parse configuration: {0}
    InvalidYaml(#[from] serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration of the resolution engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Limits applied to incoming requests.
    pub limits: Limits,

    /// Behavior of the `user` resolvers.
    pub users: Users,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(limits: Option<Limits>, users: Option<Users>) -> Self {
        Self {
            limits: limits.unwrap_or_default(),
            users: users.unwrap_or_default(),
        }
    }

    /// Parses a YAML document. An empty document yields the default configuration.
    pub fn from_yaml(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        if raw_yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let configuration: Self = serde_yaml::from_str(raw_yaml)?;
        configuration.validate()?;
        Ok(configuration)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.limits.parser_recursion_limit == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid limits.parser_recursion_limit",
                error: "must be greater than zero".to_string(),
            });
        }
        if self.limits.parser_token_limit == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid limits.parser_token_limit",
                error: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// The JSON schema of the YAML configuration.
    pub fn json_schema() -> RootSchema {
        let settings = SchemaSettings::draft2019_09().with(|s| {
            s.option_nullable = true;
            s.option_add_null_type = false;
            s.inline_subschemas = true;
        });
        settings.into_generator().into_root_schema_for::<Configuration>()
    }
}

/// Request limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum recursion depth of the request parser
    /// default: 500
    pub parser_recursion_limit: usize,

    /// Maximum number of tokens in a request
    /// default: 15000
    pub parser_token_limit: usize,

    /// Maximum nesting of selected fields. Unlimited when absent.
    pub max_depth: Option<u32>,
}

#[buildstructor::buildstructor]
impl Limits {
    #[builder(visibility = "pub")]
    fn new(
        parser_recursion_limit: Option<usize>,
        parser_token_limit: Option<usize>,
        max_depth: Option<u32>,
    ) -> Self {
        Self {
            parser_recursion_limit: parser_recursion_limit
                .unwrap_or_else(default_parser_recursion_limit),
            parser_token_limit: parser_token_limit.unwrap_or_else(default_parser_token_limit),
            max_depth,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::builder().build()
    }
}

fn default_parser_recursion_limit() -> usize {
    // `apollo-parser`'s own default
    500
}

fn default_parser_token_limit() -> usize {
    15_000
}

/// Configuration of the `user` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Users {
    /// What `user(login:)` returns when no row matches the login
    /// default: zero_value
    pub missing_user: MissingUser,
}

#[buildstructor::buildstructor]
impl Users {
    #[builder(visibility = "pub")]
    fn new(missing_user: Option<MissingUser>) -> Self {
        Self {
            missing_user: missing_user.unwrap_or_default(),
        }
    }
}

/// Result of a user lookup that matched no row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingUser {
    /// A user whose string fields are all empty.
    #[default]
    ZeroValue,
    /// `null`.
    Null,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let configuration = Configuration::from_yaml("").unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.limits.parser_recursion_limit, 500);
        assert_eq!(configuration.limits.parser_token_limit, 15_000);
        assert_eq!(configuration.limits.max_depth, None);
        assert_eq!(configuration.users.missing_user, MissingUser::ZeroValue);
    }

    #[test]
    fn from_yaml() {
        let configuration = Configuration::from_yaml(
            r#"
limits:
  max_depth: 4
users:
  missing_user: "null"
"#,
        )
        .unwrap();
        assert_eq!(
            configuration,
            Configuration::builder()
                .limits(Limits::builder().max_depth(4u32).build())
                .users(Users::builder().missing_user(MissingUser::Null).build())
                .build()
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Configuration::from_yaml("limits:\n  max_width: 3\n").unwrap_err();
        assert!(matches!(error, ConfigurationError::InvalidYaml(_)));
        assert!(error.to_string().contains("max_width"));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let error = Configuration::from_yaml("limits:\n  parser_token_limit: 0\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid limits.parser_token_limit: must be greater than zero"
        );
    }

    #[test]
    fn schema_generation() {
        let schema = serde_json::to_value(Configuration::json_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["limits"].is_object());
        assert!(properties["users"].is_object());
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
