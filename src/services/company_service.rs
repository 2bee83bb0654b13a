//! Company Service
//!
//! Cache loading and filtering, detail view, and every write against the
//! company API. Writes never patch the cache; a successful write is
//! followed by a full reload.

use crate::api::types::{
    BulkFetchRequest, BulkFetchResponse, Company, CompanyDetail, CompanyForm,
    CompanySearchRequest, DataStatus, ExternalCompanyCandidate, RegisterRequest, WriteAck,
};
use crate::cache::CompanyFilter;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::validation;
use serde::Deserialize;
use tracing::{error, info, warn};

/// Operator input for create/update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyInput {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub market: Option<String>,
}

impl CompanyInput {
    pub fn validate(&self) -> Result<CompanyForm> {
        Ok(CompanyForm {
            symbol: validation::validate_symbol(&self.symbol)?,
            name: validation::validate_company_name(&self.name)?,
            sector: validation::normalize_optional(self.sector.as_deref()),
            market: validation::normalize_optional(self.market.as_deref()),
        })
    }
}

/// Operator input for registration with optional price/financial data
///
/// `equity_ratio_pct`, `roe_pct` and `roa_pct` are percentages as typed
/// (e.g. `12.5`); they are sent to the server as fractions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub market: Option<String>,
    pub price: Option<f64>,
    pub price_date: Option<String>,
    pub volume: Option<i64>,
    pub pbr: Option<f64>,
    pub per: Option<f64>,
    pub equity_ratio_pct: Option<f64>,
    pub roe_pct: Option<f64>,
    pub roa_pct: Option<f64>,
    pub report_date: Option<String>,
}

impl RegistrationForm {
    /// Prefill from an external search hit
    pub fn from_candidate(candidate: &ExternalCompanyCandidate) -> Self {
        Self {
            symbol: candidate.symbol.clone(),
            name: candidate.name.clone(),
            sector: candidate.sector.clone(),
            market: candidate.market.clone(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<RegisterRequest> {
        let price_date = match self.price_date.as_deref() {
            Some(date) => validation::validate_date(date, "価格日付")?,
            None => None,
        };
        let report_date = match self.report_date.as_deref() {
            Some(date) => validation::validate_date(date, "報告日付")?,
            None => None,
        };

        Ok(RegisterRequest {
            symbol: validation::validate_symbol(&self.symbol)?,
            name: validation::validate_company_name(&self.name)?,
            sector: validation::normalize_optional(self.sector.as_deref()),
            market: validation::normalize_optional(self.market.as_deref()),
            price: self.price.map(validation::validate_price).transpose()?,
            price_date,
            volume: self.volume.map(validation::validate_volume).transpose()?,
            pbr: self.pbr.map(validation::validate_pbr).transpose()?,
            per: self.per.map(validation::validate_per).transpose()?,
            equity_ratio: self
                .equity_ratio_pct
                .map(validation::validate_equity_ratio_percent)
                .transpose()?,
            roe: self.roe_pct.map(validation::validate_roe_percent).transpose()?,
            roa: self.roa_pct.map(validation::validate_roa_percent).transpose()?,
            report_date,
        })
    }
}

/// Company service for business logic
pub struct CompanyService;

impl CompanyService {
    /// Replace the cache with the server's full company list
    ///
    /// On failure the previous cache contents stay in place.
    pub async fn load(state: &AppState) -> Result<usize> {
        info!("CompanyService::load");

        match state.api.search_companies(&CompanySearchRequest::default()).await {
            Ok(companies) => Ok(state.companies.replace(companies)),
            Err(e) => {
                error!("Failed to load companies: {}", e);
                state
                    .notifications
                    .danger(format!("企業一覧の読み込みに失敗しました: {}", e));
                Err(e)
            }
        }
    }

    /// Local filter over the cache
    pub fn filter(state: &AppState, filter: &CompanyFilter) -> Vec<Company> {
        state.companies.filter(filter)
    }

    /// Local lookup; `None` means "not currently cached"
    pub fn find_by_id(state: &AppState, id: i64) -> Option<Company> {
        state.companies.find_by_id(id)
    }

    /// Full reload after a successful write
    ///
    /// The write itself already succeeded, so a reload failure is reported
    /// but not propagated.
    pub async fn upsert_after_write(state: &AppState) {
        if let Err(e) = Self::load(state).await {
            warn!("Cache reload after write failed: {}", e);
        }
    }

    /// Search the external listing by company name
    pub async fn search_external(
        state: &AppState,
        company_name: &str,
    ) -> Result<Vec<ExternalCompanyCandidate>> {
        info!("CompanyService::search_external - {}", company_name);

        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(Self::reject(
                state,
                AppError::Validation("企業名を入力してください".to_string()),
            ));
        }

        state
            .api
            .search_by_name(company_name)
            .await
            .map_err(|e| Self::report(state, "企業検索", e))
    }

    /// Open the detail view for a cached company
    ///
    /// Returns `Ok(None)` when the view was closed or switched to another
    /// company while the request was in flight.
    pub async fn open_detail(state: &AppState, id: i64) -> Result<Option<CompanyDetail>> {
        info!("CompanyService::open_detail - {}", id);

        if state.companies.find_by_id(id).is_none() {
            return Err(Self::reject(state, AppError::StaleReference(id)));
        }

        let generation = state.open_detail_view(id);

        let result = state.api.get_company_detail(id).await;

        if !state.is_detail_current(id, generation) {
            warn!(
                "Discarding detail response for company {} (request {} superseded)",
                id, generation
            );
            return Ok(None);
        }

        match result {
            Ok(detail) => Ok(Some(detail)),
            Err(e) => {
                state.close_detail_view();
                Err(Self::report(state, "企業詳細の取得", e))
            }
        }
    }

    pub fn close_detail(state: &AppState) {
        state.close_detail_view();
    }

    /// Open the edit form for a cached company
    pub fn begin_edit(state: &AppState, id: i64) -> Result<Company> {
        let company = state
            .companies
            .find_by_id(id)
            .ok_or_else(|| Self::reject(state, AppError::StaleReference(id)))?;

        state.set_editing(Some(company.clone()));
        Ok(company)
    }

    pub fn cancel_edit(state: &AppState) {
        state.set_editing(None);
    }

    /// Create a company from manual input
    pub async fn create(state: &AppState, input: &CompanyInput) -> Result<WriteAck> {
        info!("CompanyService::create - {}", input.symbol);

        let form = input.validate().map_err(|e| Self::reject(state, e))?;

        if let Some(existing) = state.companies.find_by_symbol(&form.symbol) {
            return Err(Self::reject(
                state,
                AppError::Validation(format!(
                    "企業コード {} は既に登録されています ({})",
                    existing.symbol, existing.name
                )),
            ));
        }

        let ack = state
            .api
            .create_company(&form)
            .await
            .map_err(|e| Self::report(state, "企業の登録", e))?;

        state.notifications.success(
            ack.message
                .clone()
                .unwrap_or_else(|| format!("{} を登録しました", form.name)),
        );
        Self::upsert_after_write(state).await;

        Ok(ack)
    }

    /// Save the company currently open in the edit form
    pub async fn save_edit(state: &AppState, input: &CompanyInput) -> Result<WriteAck> {
        let editing = state.get_editing().ok_or_else(|| {
            Self::reject(
                state,
                AppError::InvalidState("編集中の企業がありません".to_string()),
            )
        })?;

        let ack = Self::update(state, editing.id, input).await?;
        state.set_editing(None);
        Ok(ack)
    }

    /// Update a cached company
    pub async fn update(state: &AppState, id: i64, input: &CompanyInput) -> Result<WriteAck> {
        info!("CompanyService::update - {}", id);

        if state.companies.find_by_id(id).is_none() {
            return Err(Self::reject(state, AppError::StaleReference(id)));
        }

        let form = input.validate().map_err(|e| Self::reject(state, e))?;

        let ack = state
            .api
            .update_company(id, &form)
            .await
            .map_err(|e| Self::report(state, "企業情報の更新", e))?;

        state.notifications.success(
            ack.message
                .clone()
                .unwrap_or_else(|| format!("{} を更新しました", form.name)),
        );
        Self::upsert_after_write(state).await;

        Ok(ack)
    }

    /// Register (create or update by symbol) with optional price/financial data
    pub async fn register(state: &AppState, form: &RegistrationForm) -> Result<WriteAck> {
        info!("CompanyService::register - {}", form.symbol);

        let request = form.validate().map_err(|e| Self::reject(state, e))?;

        let ack = state
            .api
            .register_company(&request)
            .await
            .map_err(|e| Self::report(state, "企業データの登録", e))?;

        state.notifications.success(
            ack.message
                .clone()
                .unwrap_or_else(|| format!("{} を登録しました", request.name)),
        );
        Self::upsert_after_write(state).await;

        Ok(ack)
    }

    /// Ask the server to refresh price/financial data for one symbol
    pub async fn fetch_stock_data(
        state: &AppState,
        symbol: &str,
        force_update: bool,
    ) -> Result<WriteAck> {
        info!("CompanyService::fetch_stock_data - {} force={}", symbol, force_update);

        let symbol = validation::validate_symbol(symbol).map_err(|e| Self::reject(state, e))?;

        let ack = state
            .api
            .fetch_stock_data(&symbol, force_update)
            .await
            .map_err(|e| Self::report(state, "株価データの取得", e))?;

        state.notifications.success(
            ack.message
                .clone()
                .unwrap_or_else(|| format!("{} のデータを取得しました", symbol)),
        );
        Self::upsert_after_write(state).await;

        Ok(ack)
    }

    /// Ask the server to refresh every company, or only `symbols` when given
    ///
    /// The cache is reloaded once afterwards. Per-company failures do not
    /// fail the call; they are reported in the returned details.
    pub async fn fetch_all_stock_data(
        state: &AppState,
        symbols: &[String],
        force_update: bool,
        max_companies: Option<u32>,
    ) -> Result<BulkFetchResponse> {
        info!(
            "CompanyService::fetch_all_stock_data - {} symbols force={} max={:?}",
            symbols.len(),
            force_update,
            max_companies
        );

        if max_companies == Some(0) {
            return Err(Self::reject(
                state,
                AppError::Validation("最大件数は1以上で指定してください".to_string()),
            ));
        }

        let symbols = symbols
            .iter()
            .map(|s| validation::validate_symbol(s))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Self::reject(state, e))?;

        let request = BulkFetchRequest {
            force_update,
            max_companies,
            symbols,
        };

        let response = state
            .api
            .fetch_all_stock_data(&request)
            .await
            .map_err(|e| Self::report(state, "株価データの一括取得", e))?;

        let summary = &response.summary;
        let text = format!(
            "{} (成功 {} / エラー {} / スキップ {})",
            response
                .message
                .clone()
                .unwrap_or_else(|| format!("{}社の処理が完了しました", summary.total)),
            summary.success,
            summary.error,
            summary.skipped
        );
        if summary.error > 0 {
            for failed in response.failed_details() {
                warn!("Stock data fetch failed for {}: {:?}", failed.symbol, failed.message);
            }
            state.notifications.warning(text);
        } else {
            state.notifications.success(text);
        }

        Self::upsert_after_write(state).await;

        Ok(response)
    }

    pub async fn data_status(state: &AppState) -> Result<DataStatus> {
        info!("CompanyService::data_status");

        state
            .api
            .data_status()
            .await
            .map_err(|e| Self::report(state, "データ状況の取得", e))
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    /// Client-side rejection: nothing was sent
    fn reject(state: &AppState, err: AppError) -> AppError {
        warn!("Rejected before request: {}", err);
        state.notifications.warning(err.to_string());
        err
    }

    /// Network or application failure from the API
    fn report(state: &AppState, action: &str, err: AppError) -> AppError {
        error!("{} failed: {}", action, err);
        state
            .notifications
            .danger(format!("{}に失敗しました: {}", action, err));
        err
    }
}
