use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::db_types::{User, UserProfile};

impl FromRow<'_, SqliteRow> for User {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let phones: String = row.try_get("business_phones")?;
        let business_phones =
            serde_json::from_str(&phones).map_err(|e| sqlx::Error::ColumnDecode {
                index: "business_phones".into(),
                source: Box::new(e),
            })?;
        let profile = UserProfile {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            given_name: row.try_get("given_name")?,
            surname: row.try_get("surname")?,
            job_title: row.try_get("job_title")?,
            mail: row.try_get("mail")?,
            mobile_phone: row.try_get("mobile_phone")?,
            office_location: row.try_get("office_location")?,
            preferred_language: row.try_get("preferred_language")?,
            user_principal_name: row.try_get("user_principal_name")?,
            business_phones,
        };
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        Ok(User { profile, created_at, updated_at })
    }
}

/// Inserts the profile, or overwrites every profile column of the existing row with the same id.
/// `created_at` is kept from the first insert.
///
/// The upsert is run to completion before the stored row is read back, so that the write is committed by the time
/// the connection returns to the pool.
pub async fn upsert_user(profile: &UserProfile, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let phones = serde_json::to_string(&profile.business_phones).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (
            id,
            display_name,
            given_name,
            surname,
            job_title,
            mail,
            mobile_phone,
            office_location,
            preferred_language,
            user_principal_name,
            business_phones,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        ON CONFLICT (id) DO UPDATE SET
            display_name = excluded.display_name,
            given_name = excluded.given_name,
            surname = excluded.surname,
            job_title = excluded.job_title,
            mail = excluded.mail,
            mobile_phone = excluded.mobile_phone,
            office_location = excluded.office_location,
            preferred_language = excluded.preferred_language,
            user_principal_name = excluded.user_principal_name,
            business_phones = excluded.business_phones,
            updated_at = excluded.updated_at;
        "#,
    )
    .bind(&profile.id)
    .bind(&profile.display_name)
    .bind(&profile.given_name)
    .bind(&profile.surname)
    .bind(&profile.job_title)
    .bind(&profile.mail)
    .bind(&profile.mobile_phone)
    .bind(&profile.office_location)
    .bind(&profile.preferred_language)
    .bind(&profile.user_principal_name)
    .bind(phones)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    fetch_user(&profile.id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}
