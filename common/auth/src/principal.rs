use serde::Serialize;

use crate::claims::Claims;
use crate::roles::Role;

/// The application-facing identity. Derived from [`Claims`] and never holds secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub login: String,
    pub role: Role,
    pub scoped_cities: Vec<String>,
}

impl Principal {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Managers are unscoped; couriers only see their assigned cities.
    pub fn covers_city(&self, city: &str) -> bool {
        match self.role {
            Role::Manager => true,
            Role::Courier => self.scoped_cities.iter().any(|scoped| scoped == city),
        }
    }
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.subject_id.clone(),
            login: claims.login.clone(),
            role: claims.role,
            scoped_cities: claims.scoped_cities.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_is_limited_to_scoped_cities() {
        let courier = Principal {
            id: "2".into(),
            login: "courier1".into(),
            role: Role::Courier,
            scoped_cities: vec!["Bocholt".into(), "Köln".into()],
        };
        assert!(courier.covers_city("Köln"));
        assert!(!courier.covers_city("Essen"));
        assert!(!courier.is_manager());
    }

    #[test]
    fn manager_covers_every_city() {
        let manager = Principal {
            id: "1".into(),
            login: "manager".into(),
            role: Role::Manager,
            scoped_cities: Vec::new(),
        };
        assert!(manager.covers_city("Essen"));
    }
}
