//! Users, roles, and the storage scope a role may read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Individual,
  CorporateEmployee,
  CorporateAdmin,
  Admin,
}

/// Which records a read may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
  /// Records owned by one customer.
  Own(Uuid),
  /// Records whose `company_name` matches — the corporate-pooled view.
  Company(String),
  /// Every record across tenants.
  All,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
  pub id:           Uuid,
  pub email:        String,
  pub role:         Role,
  pub company_name: Option<String>,
}

impl CurrentUser {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// The widest scope this caller may request.
  ///
  /// A corporate admin without a company on file falls back to their own
  /// records rather than widening to everything.
  pub fn scope(&self) -> Scope {
    match (self.role, &self.company_name) {
      (Role::Admin, _) => Scope::All,
      (Role::CorporateAdmin, Some(company)) => Scope::Company(company.clone()),
      _ => Scope::Own(self.id),
    }
  }

  /// Whether this caller may see a record owned by `owner` filed under
  /// `company`.
  pub fn can_read(&self, owner: Uuid, company: Option<&str>) -> bool {
    match self.scope() {
      Scope::All => true,
      Scope::Company(c) => owner == self.id || company == Some(c.as_str()),
      Scope::Own(id) => owner == id,
    }
  }
}

/// A stored account, including the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
  pub user:          CurrentUser,
  /// argon2 PHC string.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::PolicyStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub email:         String,
  pub role:          Role,
  pub company_name:  Option<String>,
  pub password_hash: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(role: Role, company: Option<&str>) -> CurrentUser {
    CurrentUser {
      id: Uuid::new_v4(),
      email: "someone@example.com".into(),
      role,
      company_name: company.map(str::to_owned),
    }
  }

  #[test]
  fn admin_reads_everything() {
    assert_eq!(user(Role::Admin, None).scope(), Scope::All);
  }

  #[test]
  fn corporate_admin_reads_company_pool() {
    let u = user(Role::CorporateAdmin, Some("Acme"));
    assert_eq!(u.scope(), Scope::Company("Acme".into()));
    assert!(u.can_read(Uuid::new_v4(), Some("Acme")));
    assert!(!u.can_read(Uuid::new_v4(), Some("Globex")));
  }

  #[test]
  fn employees_and_individuals_read_own() {
    let e = user(Role::CorporateEmployee, Some("Acme"));
    assert_eq!(e.scope(), Scope::Own(e.id));
    assert!(!e.can_read(Uuid::new_v4(), Some("Acme")));

    let i = user(Role::Individual, None);
    assert!(i.can_read(i.id, None));
  }

  #[test]
  fn corporate_admin_without_company_is_narrowed() {
    let u = user(Role::CorporateAdmin, None);
    assert_eq!(u.scope(), Scope::Own(u.id));
  }
}
