//! Company REST API boundary

pub mod types;
pub mod client;

#[cfg(test)]
pub(crate) mod fake;

use crate::error::Result;
use async_trait::async_trait;
use types::*;

pub use client::HttpCompanyApi;

/// Operations the client needs from the company server
///
/// Every method branches on the response envelope's `success` flag and
/// returns `AppError::Application` with the server message on failure.
#[async_trait]
pub trait CompanyApi: Send + Sync {
    /// `POST /api/companies/search`; an empty request matches everything
    async fn search_companies(&self, request: &CompanySearchRequest) -> Result<Vec<Company>>;

    /// `POST /api/companies/search-by-name`
    async fn search_by_name(&self, company_name: &str) -> Result<Vec<ExternalCompanyCandidate>>;

    /// `GET /api/companies/{id}`
    async fn get_company_detail(&self, id: i64) -> Result<CompanyDetail>;

    /// `POST /api/companies/create`
    async fn create_company(&self, form: &CompanyForm) -> Result<WriteAck>;

    /// `PUT /api/companies/{id}/update`
    async fn update_company(&self, id: i64, form: &CompanyForm) -> Result<WriteAck>;

    /// `GET /api/companies/{id}/check-dependencies`
    async fn check_dependencies(&self, id: i64) -> Result<DependencySnapshot>;

    /// `DELETE /api/companies/{id}/delete`; cascades server-side
    async fn delete_company(&self, id: i64) -> Result<WriteAck>;

    /// `POST /api/companies/register`
    async fn register_company(&self, request: &RegisterRequest) -> Result<WriteAck>;

    /// `POST /api/stock-data/fetch/{symbol}`
    async fn fetch_stock_data(&self, symbol: &str, force_update: bool) -> Result<WriteAck>;

    /// `POST /api/stock-data/fetch`; refreshes every company, or only
    /// `request.symbols` when given
    async fn fetch_all_stock_data(&self, request: &BulkFetchRequest) -> Result<BulkFetchResponse>;

    /// `GET /api/stock-data/status`
    async fn data_status(&self) -> Result<DataStatus>;
}
