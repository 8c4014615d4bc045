use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub cors: Option<String>,
    pub booking_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StartupError {}

impl HandlerConfig {
    pub fn load() -> Result<Self, StartupError> {
        Self::from_kv(&std::env::vars().collect())
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, StartupError> {
        let cors = kv
            .get("BLP_CORS")
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let booking_table = table_name(kv, "BLP_BOOKING_TABLE", "blp-booking")?;

        Ok(Self {
            cors,
            booking_table,
        })
    }
}

fn table_name(
    kv: &HashMap<String, String>,
    key: &'static str,
    default: &str,
) -> Result<String, StartupError> {
    match kv.get(key) {
        None => Ok(default.to_string()),
        Some(value) => {
            let value = value.trim();
            if value.is_empty() {
                return Err(StartupError {
                    code: "ERR_INVALID_CONFIG",
                    message: format!("{key} must be non-empty when set"),
                });
            }
            Ok(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = HandlerConfig::from_kv(&HashMap::new()).unwrap();
        assert_eq!(config.cors, None);
        assert_eq!(config.booking_table, "blp-booking");
    }

    #[test]
    fn values_are_trimmed() {
        let kv = HashMap::from([
            ("BLP_CORS".to_string(), " * ".to_string()),
            ("BLP_BOOKING_TABLE".to_string(), " bookings-dev ".to_string()),
        ]);
        let config = HandlerConfig::from_kv(&kv).unwrap();
        assert_eq!(config.cors.as_deref(), Some("*"));
        assert_eq!(config.booking_table, "bookings-dev");
    }

    #[test]
    fn blank_table_override_refuses_startup() {
        let kv = HashMap::from([("BLP_BOOKING_TABLE".to_string(), "   ".to_string())]);
        let err = HandlerConfig::from_kv(&kv).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }
}
