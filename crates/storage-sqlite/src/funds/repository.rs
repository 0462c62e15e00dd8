use diesel::prelude::*;
use std::sync::Arc;

use super::model::FundDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use fundledger_core::errors::{DatabaseError, Error, Result};
use fundledger_core::funds::{Fund, FundRepositoryTrait};

#[derive(Clone)]
pub struct FundRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl FundRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Inserts or replaces a fund definition.
    pub async fn save(&self, fund: Fund) -> Result<Fund> {
        use crate::schema::funds::dsl::*;

        let db_model = FundDB::from(fund.clone());
        self.writer
            .exec(move |conn| {
                diesel::replace_into(funds)
                    .values(&db_model)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        Ok(fund)
    }
}

impl FundRepositoryTrait for FundRepository {
    fn get_by_id(&self, input_fund_id: &str) -> Result<Fund> {
        use crate::schema::funds::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let fund_db = funds
            .find(input_fund_id)
            .first::<FundDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| {
                Error::Database(DatabaseError::NotFound(format!(
                    "Fund not found: {}",
                    input_fund_id
                )))
            })?;
        Ok(Fund::from(fund_db))
    }

    fn list(&self) -> Result<Vec<Fund>> {
        use crate::schema::funds::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let rows = funds
            .order(name.asc())
            .load::<FundDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Fund::from).collect())
    }

    fn list_production_funds(&self) -> Result<Vec<Fund>> {
        use crate::schema::funds::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let rows = funds
            .filter(is_production.eq(true))
            .order(name.asc())
            .load::<FundDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Fund::from).collect())
    }
}
