use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_COURIER: &str = "courier";

/// The two principal kinds the console knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Courier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => ROLE_MANAGER,
            Role::Courier => ROLE_COURIER,
        }
    }

    /// Parses the `role` claim. Anything outside the two known variants is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            ROLE_MANAGER => Some(Role::Manager),
            ROLE_COURIER => Some(Role::Courier),
            _ => None,
        }
    }

    /// Maps the legacy `isManager` flag onto the role space.
    pub fn from_manager_flag(is_manager: bool) -> Self {
        if is_manager {
            Role::Manager
        } else {
            Role::Courier
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse(" courier "), Some(Role::Courier));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn manager_flag_maps_to_roles() {
        assert_eq!(Role::from_manager_flag(true), Role::Manager);
        assert_eq!(Role::from_manager_flag(false), Role::Courier);
    }
}
