use crate::{
    db_types::{User, UserProfile},
    StoreError,
};

#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Inserts the profile, or refreshes every profile field if a user with the same id already exists.
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, StoreError>;
}
