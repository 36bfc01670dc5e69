use serde::{Deserialize, Serialize};

fn default_value_template() -> String {
    "updated #{id}".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseDetails {
    /// Postgres connection string, e.g. `postgres://localhost:5432/app`.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_ssl: Option<bool>,
}

impl DatabaseDetails {
    /// Username and password to apply on top of the url. An absent or blank username
    /// means the url's own user is kept and the password is ignored.
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        let username = self.username.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some((username, self.password.as_deref()))
    }

    pub fn disable_ssl(&self) -> bool {
        self.disable_ssl.unwrap_or(false)
    }
}

/// The table and columns touched by the update.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TargetDetails {
    /// `table` or `schema.table`.
    pub table: String,

    pub key_column: String,

    pub value_column: String,

    /// Text written to `value_column`; every `{id}` is replaced with the row's identifier.
    #[serde(default = "default_value_template")]
    pub value_template: String,
}

impl TargetDetails {
    pub fn render_value(&self, id: i64) -> String {
        self.value_template.replace("{id}", &id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(username: Option<&str>, password: Option<&str>) -> DatabaseDetails {
        DatabaseDetails {
            url: "postgres://localhost:5432/app".to_string(),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            disable_ssl: None,
        }
    }

    #[test]
    fn test_credentials() {
        assert_eq!(database(None, Some("secret")).credentials(), None);
        assert_eq!(database(Some("  "), Some("secret")).credentials(), None);
        assert_eq!(database(Some("app"), None).credentials(), Some(("app", None)));
        assert_eq!(
            database(Some("app"), Some("secret")).credentials(),
            Some(("app", Some("secret")))
        );
    }

    #[test]
    fn test_render_value() {
        let target: TargetDetails = serde_yaml::from_str(
            r#"
            table: events
            key_column: code
            value_column: remarks
            "#,
        )
        .unwrap();

        assert_eq!(target.render_value(42), "updated #42");

        let target = TargetDetails { value_template: "{id}-{id}".to_string(), ..target };
        assert_eq!(target.render_value(-1), "-1--1");
    }
}
