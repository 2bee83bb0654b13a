//! In-memory `CompanyApi` used by service and protocol tests

use crate::api::types::*;
use crate::api::CompanyApi;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

/// Server-side state plus a log of every call made against it
#[derive(Default)]
pub struct FakeCompanyApi {
    companies: Mutex<Vec<Company>>,
    dependencies: Mutex<HashMap<i64, DependencyCounts>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<i64>,
    dependency_gate: Mutex<Option<Arc<Notify>>>,
    detail_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeCompanyApi {
    pub fn with_companies(companies: Vec<Company>) -> Self {
        let next_id = companies.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Self {
            companies: Mutex::new(companies),
            next_id: Mutex::new(next_id),
            ..Default::default()
        }
    }

    pub fn set_dependencies(&self, id: i64, counts: DependencyCounts) {
        self.dependencies.lock().insert(id, counts);
    }

    /// Make the named operation answer `success: false`
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().remove(operation);
    }

    /// Hold dependency checks until the returned handle is notified
    pub fn gate_dependency_check(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.dependency_gate.lock() = Some(gate.clone());
        gate
    }

    /// Hold detail fetches until the returned handle is notified
    pub fn gate_detail(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.detail_gate.lock() = Some(gate.clone());
        gate
    }

    /// Server-side mutation that bypasses the client
    pub fn rename_on_server(&self, id: i64, name: &str) {
        if let Some(company) = self.companies.lock().iter_mut().find(|c| c.id == id) {
            company.name = name.to_string();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(operation) {
            return Err(AppError::Application(format!("{} failed", operation)));
        }
        Ok(())
    }

    fn ack(message: &str) -> WriteAck {
        WriteAck {
            message: Some(message.to_string()),
            company_id: None,
        }
    }
}

#[async_trait]
impl CompanyApi for FakeCompanyApi {
    async fn search_companies(&self, request: &CompanySearchRequest) -> Result<Vec<Company>> {
        self.record("search", "POST /api/companies/search".to_string())?;

        let symbol = request.symbol.clone().unwrap_or_default();
        Ok(self
            .companies
            .lock()
            .iter()
            .filter(|c| c.symbol.contains(&symbol))
            .cloned()
            .collect())
    }

    async fn search_by_name(&self, company_name: &str) -> Result<Vec<ExternalCompanyCandidate>> {
        self.record("search_by_name", "POST /api/companies/search-by-name".to_string())?;

        let registered: HashSet<String> =
            self.companies.lock().iter().map(|c| c.symbol.clone()).collect();

        let candidates = [("7203", "トヨタ自動車"), ("7267", "本田技研工業")];
        Ok(candidates
            .iter()
            .filter(|(_, name)| name.contains(company_name))
            .map(|(symbol, name)| ExternalCompanyCandidate {
                symbol: symbol.to_string(),
                name: name.to_string(),
                sector: Some("輸送用機器".to_string()),
                market: Some("プライム".to_string()),
                already_registered: registered.contains(*symbol),
            })
            .collect())
    }

    async fn get_company_detail(&self, id: i64) -> Result<CompanyDetail> {
        self.record("detail", format!("GET /api/companies/{}", id))?;

        let gate = self.detail_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let company = self
            .companies
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::Application("企業が見つかりません".to_string()))?;

        Ok(CompanyDetail {
            company,
            price_history: Vec::new(),
            price_statistics: Vec::new(),
            financial_metrics: None,
            technical_indicators: None,
        })
    }

    async fn create_company(&self, form: &CompanyForm) -> Result<WriteAck> {
        self.record("create", "POST /api/companies/create".to_string())?;

        let id = {
            let mut next_id = self.next_id.lock();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let mut company = Company::new(id, &form.symbol, &form.name);
        company.sector = form.sector.clone();
        company.market = form.market.clone();
        self.companies.lock().push(company);

        Ok(Self::ack("企業を登録しました"))
    }

    async fn update_company(&self, id: i64, form: &CompanyForm) -> Result<WriteAck> {
        self.record("update", format!("PUT /api/companies/{}/update", id))?;

        let mut companies = self.companies.lock();
        let company = companies
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::Application("企業が見つかりません".to_string()))?;
        company.symbol = form.symbol.clone();
        company.name = form.name.clone();
        company.sector = form.sector.clone();
        company.market = form.market.clone();

        Ok(Self::ack("企業情報を更新しました"))
    }

    async fn check_dependencies(&self, id: i64) -> Result<DependencySnapshot> {
        self.record("check", format!("GET /api/companies/{}/check-dependencies", id))?;

        let gate = self.dependency_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let company = self
            .companies
            .lock()
            .iter()
            .find(|c| c.id == id)
            .map(|c| CompanyRef {
                id: c.id,
                symbol: c.symbol.clone(),
                name: c.name.clone(),
            })
            .ok_or_else(|| AppError::Application("企業が見つかりません".to_string()))?;

        let dependencies = self.dependencies.lock().get(&id).cloned().unwrap_or_default();
        let total_data_count = dependencies.sum();

        Ok(DependencySnapshot {
            company,
            has_dependencies: total_data_count > 0,
            total_data_count,
            dependencies,
        })
    }

    async fn delete_company(&self, id: i64) -> Result<WriteAck> {
        self.record("delete", format!("DELETE /api/companies/{}/delete", id))?;

        self.companies.lock().retain(|c| c.id != id);
        self.dependencies.lock().remove(&id);

        Ok(Self::ack("企業を削除しました"))
    }

    async fn register_company(&self, request: &RegisterRequest) -> Result<WriteAck> {
        self.record("register", "POST /api/companies/register".to_string())?;

        let existing = self
            .companies
            .lock()
            .iter()
            .find(|c| c.symbol == request.symbol)
            .map(|c| c.id);

        let id = match existing {
            Some(id) => id,
            None => {
                let mut next_id = self.next_id.lock();
                let id = *next_id;
                *next_id += 1;
                id
            }
        };

        let mut companies = self.companies.lock();
        companies.retain(|c| c.id != id);
        let mut company = Company::new(id, &request.symbol, &request.name);
        company.sector = request.sector.clone();
        company.market = request.market.clone();
        company.current_price = request.price;
        company.roe = request.roe;
        companies.push(company);

        Ok(WriteAck {
            message: Some("企業データが正常に登録されました".to_string()),
            company_id: Some(id),
        })
    }

    async fn fetch_stock_data(&self, symbol: &str, force_update: bool) -> Result<WriteAck> {
        self.record(
            "fetch",
            format!("POST /api/stock-data/fetch/{} force={}", symbol, force_update),
        )?;

        let mut companies = self.companies.lock();
        let company = companies
            .iter_mut()
            .find(|c| c.symbol == symbol)
            .ok_or_else(|| {
                AppError::Application(format!("企業コード {} は登録されていません", symbol))
            })?;
        company.current_price = Some(company.current_price.unwrap_or(1000.0) + 10.0);

        Ok(Self::ack("データを取得しました"))
    }

    async fn fetch_all_stock_data(&self, request: &BulkFetchRequest) -> Result<BulkFetchResponse> {
        self.record(
            "fetch_all",
            format!(
                "POST /api/stock-data/fetch force={} max={:?} symbols={:?}",
                request.force_update, request.max_companies, request.symbols
            ),
        )?;

        let mut companies = self.companies.lock();
        let mut details = Vec::new();

        let targets: Vec<String> = if request.symbols.is_empty() {
            let limit = request.max_companies.map(|m| m as usize).unwrap_or(usize::MAX);
            companies.iter().take(limit).map(|c| c.symbol.clone()).collect()
        } else {
            request.symbols.clone()
        };

        for symbol in &targets {
            match companies.iter_mut().find(|c| &c.symbol == symbol) {
                Some(company) => {
                    company.current_price = Some(company.current_price.unwrap_or(1000.0) + 10.0);
                    details.push(FetchDetail {
                        symbol: symbol.clone(),
                        status: "success".to_string(),
                        message: None,
                    });
                }
                None => details.push(FetchDetail {
                    symbol: symbol.clone(),
                    status: "error".to_string(),
                    message: Some(format!("企業コード {} は登録されていません", symbol)),
                }),
            }
        }

        let success = details.iter().filter(|d| d.status == "success").count() as u64;
        let summary = FetchSummary {
            total: targets.len() as u64,
            found_companies: (!request.symbols.is_empty()).then_some(success),
            success,
            error: targets.len() as u64 - success,
            skipped: 0,
        };

        Ok(BulkFetchResponse {
            success: true,
            message: Some(format!("{}社の処理が完了しました", targets.len())),
            error: None,
            summary,
            details,
        })
    }

    async fn data_status(&self) -> Result<DataStatus> {
        self.record("status", "GET /api/stock-data/status".to_string())?;

        let companies = self.companies.lock();
        let with_price = companies.iter().filter(|c| c.current_price.is_some()).count() as u64;
        let with_financial = companies.iter().filter(|c| c.roe.is_some()).count() as u64;

        Ok(DataStatus {
            total_companies: companies.len() as u64,
            companies_with_price_data: with_price,
            companies_with_financial_data: with_financial,
            companies_need_update: companies.len() as u64 - with_price,
            last_updated: None,
        })
    }
}
