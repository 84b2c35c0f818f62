//! In-process user table shared by the memory and file backends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::MATCH_ANY_DOMAIN;
use crate::storage::{LookupKey, StorageError, StorageResult};
use crate::user::User;

/// Users keyed by Guid, with the uniqueness rules every backend must enforce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct UserTable {
    users: HashMap<String, User>,
}

impl UserTable {
    pub(crate) fn len(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub(crate) fn find(&self, domain: &str, key: LookupKey, value: &str) -> StorageResult<&User> {
        if value.is_empty() {
            return Err(StorageError::NotFound);
        }
        let in_domain = |user: &User| domain == MATCH_ANY_DOMAIN || user.domain() == domain;
        let found = match key {
            LookupKey::Guid => self.users.get(value).filter(|u| in_domain(*u)),
            _ => self
                .users
                .values()
                .find(|u| in_domain(*u) && key.value_of(*u) == value),
        };
        found.ok_or(StorageError::NotFound)
    }

    fn check_unique(&self, user: &User) -> StorageResult<()> {
        for other in self.users.values() {
            if other.guid() == user.guid() {
                continue;
            }
            let conflict = if other.domain() == user.domain()
                && other.login_name() == user.login_name()
            {
                Some(LookupKey::LoginName)
            } else if other.domain() == user.domain()
                && !user.email().is_empty()
                && other.email() == user.email()
            {
                Some(LookupKey::Email)
            } else if !user.token().is_empty() && other.token() == user.token() {
                Some(LookupKey::Token)
            } else {
                None
            };
            if let Some(key) = conflict {
                return Err(StorageError::Conflict {
                    field: key.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, user: &User) -> StorageResult<()> {
        if self.users.contains_key(user.guid()) {
            return Err(StorageError::Conflict {
                field: LookupKey::Guid.to_string(),
            });
        }
        self.check_unique(user)?;
        self.users.insert(user.guid().to_string(), user.clone());
        Ok(())
    }

    pub(crate) fn update(&mut self, user: &User) -> StorageResult<()> {
        if !self.users.contains_key(user.guid()) {
            return Err(StorageError::NotFound);
        }
        self.check_unique(user)?;
        self.users.insert(user.guid().to_string(), user.clone());
        Ok(())
    }
}
