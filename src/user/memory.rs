//! Volatile user store.

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::user::error::{IdentityError, Result};
use crate::user::{User, UserStore};

/// [`UserStore`] keeping every record in process memory.
///
/// Identifiers are ObjectId hex strings so that they are interchangeable with
/// [`crate::user::MongoUserStore`] ones.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<String, User>, email: &str, except: &str) -> bool {
    users
        .values()
        .any(|user| user.enabled && user.email == email && user.id != except)
}

fn enabled(user: Option<&mut User>) -> Result<&mut User> {
    match user {
        Some(user) if user.enabled => Ok(user),
        Some(_) => Err(IdentityError::DisabledUser),
        None => Err(IdentityError::NotFound),
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        if user.enabled && email_taken(&users, &user.email, "") {
            return Err(IdentityError::EmailTaken);
        }

        let user = User {
            id: ObjectId::new().to_hex(),
            ..user
        };
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> Result<User> {
        match self.users.read().await.get(id) {
            Some(user) if user.enabled => Ok(user.clone()),
            Some(_) => Err(IdentityError::DisabledUser),
            None => Err(IdentityError::NotFound),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        let users = self.users.read().await;
        let mut disabled = false;

        for user in users.values().filter(|user| user.email == email) {
            if user.enabled {
                return Ok(user.clone());
            }
            disabled = true;
        }

        if disabled {
            Err(IdentityError::DisabledUser)
        } else {
            Err(IdentityError::NotFound)
        }
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        enabled(users.get_mut(&user.id))?;
        if email_taken(&users, &user.email, &user.id) {
            return Err(IdentityError::EmailTaken);
        }

        let stored = enabled(users.get_mut(&user.id))?;
        stored.dni = user.dni;
        stored.type_dni = user.type_dni;
        stored.name = user.name;
        stored.email = user.email;
        stored.password = user.password;
        stored.address = user.address;
        stored.phone = user.phone;
        stored.updated_at = user.updated_at;

        Ok(stored.clone())
    }

    async fn update_token(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        let stored = enabled(users.get_mut(&user.id))?;
        stored.token = user.token;
        stored.refresh_token = user.refresh_token;
        stored.updated_at = user.updated_at;

        Ok(stored.clone())
    }

    async fn soft_delete(&self, id: &str) -> Result<()> {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.enabled = false;
                Ok(())
            },
            None => Err(IdentityError::NotFound),
        }
    }

    async fn hard_delete(&self, id: &str) -> Result<()> {
        self.users
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(IdentityError::NothingDeleted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
