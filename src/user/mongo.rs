//! MongoDB-backed user store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::user::error::{IdentityError, Result, ToPersistence};
use crate::user::{DniType, User, UserStore};

const COLLECTION: &str = "users";
const EMAIL_INDEX: &str = "email_enabled_unique";
const DUPLICATE_KEY: i32 = 11000;

/// Persisted shape of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    dni: i64,
    type_dni: DniType,
    name: String,
    email: String,
    password: String,
    address: String,
    phone: i64,
    enabled: bool,
    token: String,
    refresh_token: String,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl UserDocument {
    fn new(id: ObjectId, user: &User) -> Result<Self> {
        Ok(Self {
            id,
            dni: i64::try_from(user.dni).catch()?,
            type_dni: user.type_dni,
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            address: user.address.clone(),
            phone: i64::try_from(user.phone).catch()?,
            enabled: user.enabled,
            token: user.token.clone(),
            refresh_token: user.refresh_token.clone(),
            created_at: to_bson_date(user.created_at),
            updated_at: to_bson_date(user.updated_at),
        })
    }
}

impl TryFrom<UserDocument> for User {
    type Error = IdentityError;

    /// Stored values outside the domain ranges are reported, never clamped.
    fn try_from(document: UserDocument) -> Result<Self> {
        Ok(Self {
            id: document.id.to_hex(),
            dni: u64::try_from(document.dni).catch()?,
            type_dni: document.type_dni,
            name: document.name,
            email: document.email,
            password: document.password,
            address: document.address,
            phone: u64::try_from(document.phone).catch()?,
            enabled: document.enabled,
            token: document.token,
            refresh_token: document.refresh_token,
            created_at: from_bson_date(document.created_at)?,
            updated_at: from_bson_date(document.updated_at)?,
        })
    }
}

fn to_bson_date(date: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(date.timestamp_millis())
}

fn from_bson_date(date: bson::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).ok_or_else(|| {
        IdentityError::Persistence(format!("date out of range: {date}").into())
    })
}

fn object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(err)) => {
            err.code == DUPLICATE_KEY
        },
        MongoErrorKind::Command(err) => err.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn write_error(err: MongoError) -> IdentityError {
    if is_duplicate_key(&err) {
        IdentityError::EmailTaken
    } else {
        IdentityError::persistence(err)
    }
}

/// [`UserStore`] on a MongoDB `users` collection.
#[derive(Clone, Debug)]
pub struct MongoUserStore {
    db: Database,
    users: Collection<UserDocument>,
}

impl MongoUserStore {
    /// Connect to `address`, select database `name` and make sure the email
    /// index exists.
    pub async fn new(address: &str, name: &str) -> Result<Self> {
        let client = Client::with_uri_str(address).await.catch()?;
        let db = client.database(name);
        let store = Self {
            users: db.collection(COLLECTION),
            db,
        };

        store.create_indexes().await?;
        Ok(store)
    }

    async fn create_indexes(&self) -> Result<()> {
        // Only enabled users own their email.
        let options = IndexOptions::builder()
            .name(EMAIL_INDEX.to_owned())
            .unique(true)
            .partial_filter_expression(doc! { "enabled": true })
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(options)
            .build();

        self.users.create_index(index).await.catch()?;
        Ok(())
    }

    /// Explain why an enabled-only write matched nothing.
    async fn missing(&self, id: ObjectId) -> IdentityError {
        match self.users.find_one(doc! { "_id": id }).await {
            Ok(Some(_)) => IdentityError::DisabledUser,
            Ok(None) => IdentityError::NotFound,
            Err(err) => IdentityError::persistence(err),
        }
    }

    async fn update_enabled(&self, id: &str, set: Document) -> Result<User> {
        let Some(id) = object_id(id) else {
            return Err(IdentityError::NotFound);
        };

        let updated = self
            .users
            .find_one_and_update(
                doc! { "_id": id, "enabled": true },
                doc! { "$set": set },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(write_error)?;

        match updated {
            Some(document) => document.try_into(),
            None => Err(self.missing(id).await),
        }
    }
}

fn found(document: Option<UserDocument>) -> Result<User> {
    match document {
        Some(document) if document.enabled => document.try_into(),
        Some(_) => Err(IdentityError::DisabledUser),
        None => Err(IdentityError::NotFound),
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create(&self, user: User) -> Result<User> {
        let document = UserDocument::new(ObjectId::new(), &user)?;

        self.users
            .insert_one(&document)
            .await
            .map_err(write_error)?;

        tracing::debug!(user_id = %document.id, "user document inserted");
        document.try_into()
    }

    async fn get_by_id(&self, id: &str) -> Result<User> {
        let Some(id) = object_id(id) else {
            return Err(IdentityError::NotFound);
        };

        found(self.users.find_one(doc! { "_id": id }).await.catch()?)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        // Enabled record first, a disabled one only when nothing else matches.
        let document = self
            .users
            .find_one(doc! { "email": email })
            .sort(doc! { "enabled": -1 })
            .await
            .catch()?;

        found(document)
    }

    async fn update(&self, user: User) -> Result<User> {
        let dni = i64::try_from(user.dni).catch()?;
        let phone = i64::try_from(user.phone).catch()?;
        let set = doc! {
            "dni": dni,
            "typeDni": user.type_dni.as_str(),
            "name": user.name,
            "email": user.email,
            "password": user.password,
            "address": user.address,
            "phone": phone,
            "updatedAt": to_bson_date(user.updated_at),
        };

        self.update_enabled(&user.id, set).await
    }

    async fn update_token(&self, user: User) -> Result<User> {
        let set = doc! {
            "token": user.token,
            "refreshToken": user.refresh_token,
            "updatedAt": to_bson_date(user.updated_at),
        };

        self.update_enabled(&user.id, set).await
    }

    async fn soft_delete(&self, id: &str) -> Result<()> {
        let Some(id) = object_id(id) else {
            return Err(IdentityError::NotFound);
        };

        let result = self
            .users
            .update_one(doc! { "_id": id }, doc! { "$set": { "enabled": false } })
            .await
            .catch()?;

        if result.matched_count == 0 {
            return Err(IdentityError::NotFound);
        }

        Ok(())
    }

    async fn hard_delete(&self, id: &str) -> Result<()> {
        let Some(id) = object_id(id) else {
            return Err(IdentityError::NothingDeleted);
        };

        let result = self.users.delete_one(doc! { "_id": id }).await.catch()?;
        if result.deleted_count == 0 {
            return Err(IdentityError::NothingDeleted);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await.catch()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::user::error::ErrorKind;

    fn user() -> User {
        let user = User::fixture("a@x.com");
        // BSON dates keep millisecond precision.
        let now = from_bson_date(to_bson_date(user.created_at)).unwrap();

        User {
            created_at: now,
            updated_at: now,
            ..user
        }
    }

    fn document() -> UserDocument {
        UserDocument::new(ObjectId::new(), &user()).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let document = bson::to_document(&document()).unwrap();

        for key in [
            "_id",
            "dni",
            "typeDni",
            "name",
            "email",
            "password",
            "address",
            "phone",
            "enabled",
            "token",
            "refreshToken",
            "createdAt",
            "updatedAt",
        ] {
            assert!(document.contains_key(key), "missing {key}");
        }
        assert_eq!(document.get_str("typeDni").unwrap(), "CC");
        assert!(document.get_datetime("createdAt").is_ok());
    }

    #[test]
    fn test_document_to_user() {
        let id = ObjectId::new();
        let user = user();
        let stored = User::try_from(UserDocument::new(id, &user).unwrap()).unwrap();

        assert_eq!(stored, User {
            id: id.to_hex(),
            ..user
        });
    }

    #[test]
    fn test_oversized_dni() {
        let user = User {
            dni: u64::MAX,
            ..user()
        };

        assert!(matches!(
            UserDocument::new(ObjectId::new(), &user),
            Err(IdentityError::Persistence(_))
        ));
    }

    #[test]
    fn test_corrupted_document() {
        for document in [
            UserDocument {
                dni: -1,
                ..document()
            },
            UserDocument {
                phone: -1234567890,
                ..document()
            },
            UserDocument {
                updated_at: bson::DateTime::MAX,
                ..document()
            },
        ] {
            assert_eq!(
                User::try_from(document).unwrap_err().kind(),
                ErrorKind::Persistence
            );
        }
    }

    #[test]
    fn test_object_id() {
        let id = ObjectId::new();

        assert_eq!(object_id(&id.to_hex()), Some(id));
        assert_eq!(object_id("admin"), None);
        assert_eq!(object_id(""), None);
    }

    /// Store on a throwaway database, or `None` when `MONGO_URI` is unset.
    async fn live_store() -> Option<MongoUserStore> {
        let address = std::env::var("MONGO_URI").ok()?;
        let name = format!("identity_test_{}", ObjectId::new().to_hex());

        Some(MongoUserStore::new(&address, &name).await.unwrap())
    }

    async fn teardown(store: MongoUserStore) {
        store.db.drop().await.unwrap();
    }

    #[tokio::test]
    async fn test_live_create_and_get() {
        let Some(store) = live_store().await else {
            return;
        };
        store.ping().await.unwrap();

        let user = store.create(user()).await.unwrap();
        assert!(ObjectId::parse_str(&user.id).is_ok());
        assert_eq!(store.get_by_id(&user.id).await.unwrap(), user);
        assert_eq!(store.get_by_email("a@x.com").await.unwrap(), user);

        let unknown = ObjectId::new().to_hex();
        for id in ["", "not-hex", unknown.as_str()] {
            assert_eq!(
                store.get_by_id(id).await.unwrap_err().kind(),
                ErrorKind::NotFound
            );
        }
        assert_eq!(
            store.get_by_email("b@x.com").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_live_enabled_email_is_unique() {
        let Some(store) = live_store().await else {
            return;
        };
        let first = store.create(user()).await.unwrap();

        assert_eq!(
            store.create(user()).await.unwrap_err().kind(),
            ErrorKind::EmailTaken
        );

        // Freed once the owner is disabled; lookups prefer the enabled one.
        store.soft_delete(&first.id).await.unwrap();
        let second = store.create(user()).await.unwrap();
        assert_eq!(store.get_by_email("a@x.com").await.unwrap(), second);

        // Taking an enabled email through an update.
        let other = store
            .create(User {
                email: "b@x.com".into(),
                ..user()
            })
            .await
            .unwrap();
        assert_eq!(
            store
                .update(User {
                    email: "a@x.com".into(),
                    ..other
                })
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::EmailTaken
        );

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_live_soft_then_hard_delete() {
        let Some(store) = live_store().await else {
            return;
        };
        let user = store.create(user()).await.unwrap();

        store.soft_delete(&user.id).await.unwrap();
        store.soft_delete(&user.id).await.unwrap();
        assert_eq!(
            store.get_by_id(&user.id).await.unwrap_err().kind(),
            ErrorKind::DisabledUser
        );
        assert_eq!(
            store.get_by_email("a@x.com").await.unwrap_err().kind(),
            ErrorKind::DisabledUser
        );

        store.hard_delete(&user.id).await.unwrap();
        assert_eq!(
            store.get_by_id(&user.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        for id in [user.id.as_str(), "not-hex"] {
            assert_eq!(
                store.hard_delete(id).await.unwrap_err().kind(),
                ErrorKind::NothingDeleted
            );
            assert_eq!(
                store.soft_delete(id).await.unwrap_err().kind(),
                ErrorKind::NotFound
            );
        }

        teardown(store).await;
    }

    #[tokio::test]
    async fn test_live_update() {
        let Some(store) = live_store().await else {
            return;
        };
        let user = store.create(user()).await.unwrap();
        let later = user.updated_at + Duration::minutes(5);

        let updated = store
            .update(User {
                name: "Sam Roe".into(),
                type_dni: DniType::Nit,
                token: "ignored".into(),
                enabled: false,
                created_at: later,
                updated_at: later,
                ..user.clone()
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Sam Roe");
        assert_eq!(updated.type_dni, DniType::Nit);
        assert_eq!(updated.token, user.token);
        assert!(updated.enabled);
        assert_eq!(updated.created_at, user.created_at);
        assert_eq!(updated.updated_at, later);

        let rotated = store
            .update_token(User {
                name: "Ignored".into(),
                token: "new-access".into(),
                refresh_token: "new-refresh".into(),
                ..updated.clone()
            })
            .await
            .unwrap();
        assert_eq!(rotated.name, "Sam Roe");
        assert_eq!(rotated.token, "new-access");
        assert_eq!(rotated.refresh_token, "new-refresh");

        store.soft_delete(&user.id).await.unwrap();
        assert_eq!(
            store.update(user.clone()).await.unwrap_err().kind(),
            ErrorKind::DisabledUser
        );
        assert_eq!(
            store.update_token(user.clone()).await.unwrap_err().kind(),
            ErrorKind::DisabledUser
        );
        let missing = User {
            id: ObjectId::new().to_hex(),
            ..user
        };
        assert_eq!(
            store.update(missing).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        teardown(store).await;
    }
}
