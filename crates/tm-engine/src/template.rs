//! Script templating with minijinja.

use crate::context::Variables;
use crate::error::{EngineError, EngineResult};
use minijinja::{Environment, UndefinedBehavior};

/// Render `content` against `variables`.
///
/// Undefined variables fail the render instead of expanding to nothing.
pub fn render_script(name: &str, content: &str, variables: &Variables) -> EngineResult<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.render_str(content, variables)
        .map_err(|e| EngineError::Render {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_yaml::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_render_substitutes_variables() {
        let sql = render_script(
            "V001__init.sql",
            "CREATE SCHEMA {{ env }}_core;",
            &vars(&[("env", "dev")]),
        )
        .unwrap();
        assert_eq!(sql, "CREATE SCHEMA dev_core;");
    }

    #[test]
    fn test_render_undefined_variable_fails() {
        let err = render_script("V001__init.sql", "SELECT {{ missing }}", &vars(&[]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Render { .. }));
        assert!(err.to_string().contains("V001__init.sql"));
    }

    #[test]
    fn test_render_plain_sql_unchanged() {
        let sql = "INSERT INTO t VALUES ('a;b');";
        assert_eq!(render_script("x", sql, &vars(&[])).unwrap(), sql);
    }
}
