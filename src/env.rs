use std::collections::HashMap;
use std::env;

/// Source of environment variable values.
///
/// An unset variable and a variable set to the empty string are treated the
/// same way by the binder, so implementations are free to return either
/// `None` or `Some(String::new())` for both.
pub trait Environment {
    fn get(&self, name: &str) -> Option<String>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        // Values that are not valid unicode are treated as unset
        env::var(name).ok()
    }
}

impl<F> Environment for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Look a variable up, folding the empty string into `None`.
pub(crate) fn lookup<E: Environment + ?Sized>(env: &E, name: &str) -> Option<String> {
    env.get(name).filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_env_existing_key() {
        env::set_var("FLAGENV_TEST_PROCESS_ENV", "test_value");

        assert_eq!(
            ProcessEnv.get("FLAGENV_TEST_PROCESS_ENV"),
            Some(String::from("test_value"))
        );

        env::remove_var("FLAGENV_TEST_PROCESS_ENV");
    }

    #[test]
    fn test_process_env_nonexistent_key() {
        env::remove_var("FLAGENV_TEST_NONEXISTENT");

        assert_eq!(ProcessEnv.get("FLAGENV_TEST_NONEXISTENT"), None);
    }

    #[test]
    fn test_lookup_folds_empty_values() {
        let vars = HashMap::from([
            (String::from("EMPTY"), String::new()),
            (String::from("SET"), String::from("value")),
        ]);

        assert_eq!(lookup(&vars, "EMPTY"), None);
        assert_eq!(lookup(&vars, "MISSING"), None);
        assert_eq!(lookup(&vars, "SET"), Some(String::from("value")));
    }

    #[test]
    fn test_closure_environment() {
        let env = |name: &str| (name == "KEY").then(|| String::from("value"));

        assert_eq!(lookup(&env, "KEY"), Some(String::from("value")));
        assert_eq!(lookup(&env, "OTHER"), None);
    }
}
