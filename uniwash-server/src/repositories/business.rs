use std::sync::Arc;

use sqlx::Error;

use crate::configs::Storage;
use crate::models::BusinessRole;

pub struct BusinessRepository {
    storage: Arc<Storage>,
}

impl BusinessRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl BusinessRepository {
    pub async fn find_role(&self, user_id: i32, business_id: i32) -> Result<Option<BusinessRole>, Error> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM business_members WHERE user_id = $1 AND business_id = $2",
        )
        .bind(user_id)
        .bind(business_id)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(role.and_then(|role| role.parse().ok()))
    }
}
