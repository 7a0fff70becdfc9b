//! The `users` collection.

use chrono::Utc;
use secrecy::SecretString;
use shardvault_core::curve::Point;
use shardvault_types::records::{UserRecord, UserRole, UserStatus};

use super::database::{Collection, DbError};

/// Handle to the user store.
#[derive(Clone)]
pub struct UserStore {
    collection: Collection,
}

impl UserStore {
    /// Wraps the `users` collection.
    pub fn new(collection: Collection) -> Self {
        UserStore { collection }
    }

    /// Looks up a user by id.
    pub fn get(&self, id: &str) -> Result<Option<UserRecord>, DbError> {
        self.collection.get(id)
    }

    /// Looks up a user by username.
    pub fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DbError> {
        Ok(self
            .collection
            .scan::<UserRecord>()?
            .into_iter()
            .find(|user| user.username == username))
    }

    /// Inserts a fresh user record, failing on id collision.
    pub fn insert(
        &self,
        id: &str,
        username: String,
        password: SecretString,
    ) -> Result<(), DbError> {
        let now = Utc::now().timestamp_millis();
        let record = UserRecord {
            id: id.to_owned(),
            username,
            password,
            public_key: None,
            status: UserStatus::Active,
            role: UserRole::User,
            avatar: None,
            created_at: now,
            last_login: now,
        };
        self.collection.insert_unique(id, &record)
    }

    /// Bumps the last-login timestamp.
    pub fn touch_login(&self, id: &str) -> Result<bool, DbError> {
        self.collection.update::<UserRecord>(id, |user| {
            user.last_login = Utc::now().timestamp_millis();
        })
    }

    /// Stores the user's ECC public key.
    pub fn set_public_key(&self, id: &str, public_key: Point) -> Result<bool, DbError> {
        self.collection.update::<UserRecord>(id, |user| {
            user.public_key = Some(public_key);
        })
    }

    /// Stores the user's avatar.
    pub fn set_avatar(&self, id: &str, avatar: String) -> Result<bool, DbError> {
        self.collection.update::<UserRecord>(id, |user| {
            user.avatar = Some(avatar);
        })
    }
}
