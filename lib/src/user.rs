/// The identity the store attaches to a write request. `name` is `None`
/// (or empty) for anonymous requests.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct User {
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl User {
    pub fn new(name: &str) -> User {
        User {
            name: Some(name.to_string()),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(name: &str, roles: &[&str]) -> User {
        User {
            name: Some(name.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(String::as_str).filter(|n| !n.is_empty())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Admins {
    pub names: Vec<String>,
    pub roles: Vec<String>,
}

/// Trust context for the database being written to.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DbContext {
    pub admins: Admins,
}
