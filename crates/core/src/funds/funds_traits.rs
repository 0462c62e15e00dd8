use super::funds_model::Fund;
use crate::errors::Result;

/// Trait defining the contract for fund repository operations.
pub trait FundRepositoryTrait: Send + Sync {
    fn get_by_id(&self, fund_id: &str) -> Result<Fund>;
    fn list(&self) -> Result<Vec<Fund>>;
    /// Funds eligible for scheduled price synchronization.
    fn list_production_funds(&self) -> Result<Vec<Fund>>;
}
