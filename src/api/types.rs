//! Wire types for the company REST API
//!
//! The server omits joined fields when there is no data and sends `""` for
//! an unset sector/market, so everything optional is an `Option` here.

use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Custom (De)serializers
// ============================================================================

/// Treat `""` (and whitespace) the same as a missing string
fn deserialize_empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Counts sometimes arrive as `null` for empty tables
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// The server's create/update handlers expect `""` rather than `null`
fn serialize_none_as_empty<S>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

// ============================================================================
// Envelope
// ============================================================================

/// `{success, data?, message?, error?, count?, company_id?}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub company_id: Option<i64>,
}

impl<T> ApiEnvelope<T> {
    /// Branch on `success` before anything touches the payload
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        let message = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "Request failed".to_string());
        Err(AppError::Application(message))
    }

    /// Successful envelope that must carry `data`
    pub fn into_data(self) -> Result<T> {
        self.into_result()?
            .data
            .ok_or_else(|| AppError::Application("No data in response".to_string()))
    }
}

/// Acknowledgement of a write call
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAck {
    pub message: Option<String>,
    pub company_id: Option<i64>,
}

impl<T> From<ApiEnvelope<T>> for WriteAck {
    fn from(envelope: ApiEnvelope<T>) -> Self {
        Self {
            message: envelope.message,
            company_id: envelope.company_id,
        }
    }
}

// ============================================================================
// Companies
// ============================================================================

/// Company row with the latest price/financial snapshot joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub market: Option<String>,

    // Latest price
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_date: Option<String>,
    #[serde(default)]
    pub volume: Option<i64>,

    // Latest financial metrics
    #[serde(default)]
    pub pbr: Option<f64>,
    #[serde(default)]
    pub per: Option<f64>,
    #[serde(default)]
    pub equity_ratio: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub roa: Option<f64>,
    #[serde(default)]
    pub report_date: Option<String>,

    // Price statistics for the current month / year / all time
    #[serde(default)]
    pub monthly_min: Option<f64>,
    #[serde(default)]
    pub monthly_max: Option<f64>,
    #[serde(default)]
    pub yearly_min: Option<f64>,
    #[serde(default)]
    pub yearly_max: Option<f64>,
    #[serde(default)]
    pub all_time_min: Option<f64>,
    #[serde(default)]
    pub all_time_max: Option<f64>,

    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Company {
    /// Minimal company, used where only identity matters
    pub fn new(id: i64, symbol: &str, name: &str) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: None,
            market: None,
            current_price: None,
            price_date: None,
            volume: None,
            pbr: None,
            per: None,
            equity_ratio: None,
            roe: None,
            roa: None,
            report_date: None,
            monthly_min: None,
            monthly_max: None,
            yearly_min: None,
            yearly_max: None,
            all_time_min: None,
            all_time_max: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }
}

/// Search filter sent to `/api/companies/search`; empty means match-all
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanySearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

/// Candidate from the external name search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCompanyCandidate {
    pub symbol: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub market: Option<String>,
    #[serde(default)]
    pub already_registered: bool,
}

/// Body of create/update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyForm {
    pub symbol: String,
    pub name: String,
    #[serde(serialize_with = "serialize_none_as_empty")]
    pub sector: Option<String>,
    #[serde(serialize_with = "serialize_none_as_empty")]
    pub market: Option<String>,
}

/// Body of `/api/companies/register`
///
/// Optional fields are omitted entirely when absent: the server decides
/// whether to write a price/financial row by key presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per: Option<f64>,
    /// Fraction, not percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_ratio: Option<f64>,
    /// Fraction, not percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roe: Option<f64>,
    /// Fraction, not percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
}

// ============================================================================
// Company detail
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price_date: String,
    pub price: f64,
    #[serde(default)]
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistic {
    /// `monthly`, `yearly` or `all_time`
    pub period_type: String,
    /// `YYYY-MM`, `YYYY` or `all`
    pub period_value: String,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub pbr: Option<f64>,
    #[serde(default)]
    pub per: Option<f64>,
    #[serde(default)]
    pub equity_ratio: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub roa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    #[serde(default)]
    pub indicator_date: Option<String>,
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd: Option<f64>,
    #[serde(default)]
    pub sma_25: Option<f64>,
    #[serde(default)]
    pub sma_75: Option<f64>,
    #[serde(default)]
    pub bollinger_upper: Option<f64>,
    #[serde(default)]
    pub bollinger_lower: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    #[serde(default)]
    pub price_statistics: Vec<PriceStatistic>,
    #[serde(default)]
    pub financial_metrics: Option<FinancialMetrics>,
    #[serde(default)]
    pub technical_indicators: Option<TechnicalIndicators>,
}

// ============================================================================
// Dependencies
// ============================================================================

/// Subordinate table that references a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyCategory {
    StockPrices,
    FinancialMetrics,
    PriceStatistics,
    TechnicalIndicators,
}

impl DependencyCategory {
    pub const ALL: [DependencyCategory; 4] = [
        DependencyCategory::StockPrices,
        DependencyCategory::FinancialMetrics,
        DependencyCategory::PriceStatistics,
        DependencyCategory::TechnicalIndicators,
    ];

    /// Wire key
    pub fn key(&self) -> &'static str {
        match self {
            DependencyCategory::StockPrices => "stock_prices",
            DependencyCategory::FinancialMetrics => "financial_metrics",
            DependencyCategory::PriceStatistics => "price_statistics",
            DependencyCategory::TechnicalIndicators => "technical_indicators",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            DependencyCategory::StockPrices => "株価データ",
            DependencyCategory::FinancialMetrics => "財務指標",
            DependencyCategory::PriceStatistics => "価格統計",
            DependencyCategory::TechnicalIndicators => "テクニカル指標",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCounts {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub stock_prices: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub financial_metrics: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub price_statistics: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub technical_indicators: u64,
}

impl DependencyCounts {
    pub fn get(&self, category: DependencyCategory) -> u64 {
        match category {
            DependencyCategory::StockPrices => self.stock_prices,
            DependencyCategory::FinancialMetrics => self.financial_metrics,
            DependencyCategory::PriceStatistics => self.price_statistics,
            DependencyCategory::TechnicalIndicators => self.technical_indicators,
        }
    }

    pub fn sum(&self) -> u64 {
        DependencyCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Company identity as echoed by the dependency check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: i64,
    pub symbol: String,
    pub name: String,
}

/// Server-computed blast radius of deleting one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySnapshot {
    pub company: CompanyRef,
    #[serde(default)]
    pub dependencies: DependencyCounts,
    #[serde(default)]
    pub has_dependencies: bool,
    #[serde(default)]
    pub total_data_count: u64,
}

impl DependencySnapshot {
    /// Categories with at least one row, in display order
    pub fn nonzero_categories(&self) -> Vec<(DependencyCategory, u64)> {
        DependencyCategory::ALL
            .iter()
            .map(|c| (*c, self.dependencies.get(*c)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

// ============================================================================
// Data status
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStatus {
    pub total_companies: u64,
    #[serde(default)]
    pub companies_with_price_data: u64,
    #[serde(default)]
    pub companies_with_financial_data: u64,
    #[serde(default)]
    pub companies_need_update: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

// ============================================================================
// Bulk stock data refresh
// ============================================================================

/// Body of `POST /api/stock-data/fetch`; no symbols means every company
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkFetchRequest {
    pub force_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_companies: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchSummary {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total: u64,
    /// Only reported when specific symbols were requested
    #[serde(default)]
    pub found_companies: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub success: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub error: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub skipped: u64,
}

/// Per-company outcome: `status` is `success`, `error` or `skipped`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchDetail {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Bulk refresh answer; `summary` and `details` sit beside `success`
/// rather than under `data`
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFetchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub summary: FetchSummary,
    #[serde(default)]
    pub details: Vec<FetchDetail>,
}

impl BulkFetchResponse {
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        let message = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "Request failed".to_string());
        Err(AppError::Application(message))
    }

    pub fn failed_details(&self) -> impl Iterator<Item = &FetchDetail> {
        self.details.iter().filter(|d| d.status == "error")
    }
}
