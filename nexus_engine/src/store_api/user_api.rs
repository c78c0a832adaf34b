use std::fmt::Debug;

use crate::{
    db_types::{User, UserProfile},
    traits::UserManagement,
    StoreError,
};

/// Keeps the local copy of identity provider profiles.
pub struct UserApi<B> {
    db: B,
}

impl<B: Debug> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi ({:?})", self.db)
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Stores the profile under `user_id`, which always wins over whatever id the profile document carries.
    pub async fn sync_profile(&self, user_id: &str, mut profile: UserProfile) -> Result<User, StoreError> {
        profile.id = user_id.to_string();
        self.db.upsert_user(&profile).await
    }
}
