use std::collections::HashMap;

/// Default allow-list: the operational Cognito groups.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERVISOR: &str = "supervisor";

#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub cors: Option<String>,
    pub bag_table: String,
    pub allowed_roles: Vec<String>,
    pub pool_id_parameter: String,
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

        let bag_table = nonempty_or_default(kv, "BLP_BAG_TABLE", "blp-bag")?;
        let pool_id_parameter =
            nonempty_or_default(kv, "BLP_POOL_ID_PARAMETER", "cognito_user_pool_id")?;
        let allowed_roles = parse_allowed_roles(kv.get("BLP_ALLOWED_ROLES"))?;

        Ok(Self {
            cors,
            bag_table,
            allowed_roles,
            pool_id_parameter,
        })
    }
}

fn parse_allowed_roles(value: Option<&String>) -> Result<Vec<String>, StartupError> {
    let Some(value) = value else {
        return Ok(vec![ROLE_ADMIN.to_string(), ROLE_SUPERVISOR.to_string()]);
    };

    let roles: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();

    if roles.is_empty() {
        return Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "BLP_ALLOWED_ROLES must name at least one role when set".to_string(),
        });
    }

    Ok(roles)
}

fn nonempty_or_default(
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
    fn defaults_allow_the_operational_groups() {
        let config = HandlerConfig::from_kv(&HashMap::new()).unwrap();
        assert_eq!(config.bag_table, "blp-bag");
        assert_eq!(config.allowed_roles, vec!["admin", "supervisor"]);
        assert_eq!(config.pool_id_parameter, "cognito_user_pool_id");
        assert_eq!(config.cors, None);
    }

    #[test]
    fn allowed_roles_parse_from_a_comma_list() {
        let kv = HashMap::from([(
            "BLP_ALLOWED_ROLES".to_string(),
            "admin, auditor ,".to_string(),
        )]);
        let config = HandlerConfig::from_kv(&kv).unwrap();
        assert_eq!(config.allowed_roles, vec!["admin", "auditor"]);
    }

    #[test]
    fn empty_allow_list_refuses_startup() {
        let kv = HashMap::from([("BLP_ALLOWED_ROLES".to_string(), " , ".to_string())]);
        let err = HandlerConfig::from_kv(&kv).unwrap_err();
        assert_eq!(err.code, "ERR_INVALID_CONFIG");
    }
}
