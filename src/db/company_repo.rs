// src/db/company_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::company::Company};

#[derive(Clone, Default)]
pub struct CompanyRepository;

impl CompanyRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE company_id = $1")
            .bind(company_id)
            .fetch_optional(executor)
            .await?;

        Ok(company)
    }
}
