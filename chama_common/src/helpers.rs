use std::{env, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses an environment variable. Returns `None` if the variable is not set, and `Err` with a
/// descriptive message if it is set but cannot be parsed.
pub fn env_var_parsed<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|_| format!("{name} has an invalid value: '{s}'")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some(" off ".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn parsed_env_vars() {
        env::set_var("CHAMA_COMMON_TEST_PORT", "8080");
        env::set_var("CHAMA_COMMON_TEST_BAD", "eighty");
        assert_eq!(env_var_parsed::<u16>("CHAMA_COMMON_TEST_PORT"), Ok(Some(8080)));
        assert!(env_var_parsed::<u16>("CHAMA_COMMON_TEST_BAD").is_err());
        assert_eq!(env_var_parsed::<u16>("CHAMA_COMMON_TEST_UNSET"), Ok(None));
    }
}
