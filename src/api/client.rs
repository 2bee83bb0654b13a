//! reqwest-backed company API client

use crate::api::types::*;
use crate::api::CompanyApi;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP implementation of [`CompanyApi`]
pub struct HttpCompanyApi {
    client: Client,
    base_url: Url,
}

impl HttpCompanyApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        // `Url::join` replaces the last segment unless the base ends in '/'
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.base_url()?, config.request_timeout())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>> {
        Self::read_json::<ApiEnvelope<T>>(response).await
    }

    /// Decode the body even for non-2xx answers, which still carry `error`
    async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R> {
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<R>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(AppError::Application(format!(
                "Server returned HTTP {}",
                status
            ))),
            Err(e) => Err(AppError::Serialization(e)),
        }
    }
}

#[async_trait]
impl CompanyApi for HttpCompanyApi {
    async fn search_companies(&self, request: &CompanySearchRequest) -> Result<Vec<Company>> {
        let url = self.endpoint("api/companies/search")?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(request).send().await?;
        let envelope = Self::read_envelope::<Vec<Company>>(response).await?.into_result()?;

        Ok(envelope.data.unwrap_or_default())
    }

    async fn search_by_name(&self, company_name: &str) -> Result<Vec<ExternalCompanyCandidate>> {
        let url = self.endpoint("api/companies/search-by-name")?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&json!({ "company_name": company_name }))
            .send()
            .await?;
        let envelope = Self::read_envelope::<Vec<ExternalCompanyCandidate>>(response)
            .await?
            .into_result()?;

        Ok(envelope.data.unwrap_or_default())
    }

    async fn get_company_detail(&self, id: i64) -> Result<CompanyDetail> {
        let url = self.endpoint(&format!("api/companies/{}", id))?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        Self::read_envelope::<CompanyDetail>(response).await?.into_data()
    }

    async fn create_company(&self, form: &CompanyForm) -> Result<WriteAck> {
        let url = self.endpoint("api/companies/create")?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(form).send().await?;
        let envelope = Self::read_envelope::<serde_json::Value>(response).await?.into_result()?;

        Ok(envelope.into())
    }

    async fn update_company(&self, id: i64, form: &CompanyForm) -> Result<WriteAck> {
        let url = self.endpoint(&format!("api/companies/{}/update", id))?;
        debug!("PUT {}", url);

        let response = self.client.put(url).json(form).send().await?;
        let envelope = Self::read_envelope::<serde_json::Value>(response).await?.into_result()?;

        Ok(envelope.into())
    }

    async fn check_dependencies(&self, id: i64) -> Result<DependencySnapshot> {
        let url = self.endpoint(&format!("api/companies/{}/check-dependencies", id))?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        Self::read_envelope::<DependencySnapshot>(response).await?.into_data()
    }

    async fn delete_company(&self, id: i64) -> Result<WriteAck> {
        let url = self.endpoint(&format!("api/companies/{}/delete", id))?;
        debug!("DELETE {}", url);

        let response = self.client.delete(url).send().await?;
        let envelope = Self::read_envelope::<serde_json::Value>(response).await?.into_result()?;

        Ok(envelope.into())
    }

    async fn register_company(&self, request: &RegisterRequest) -> Result<WriteAck> {
        let url = self.endpoint("api/companies/register")?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(request).send().await?;
        let envelope = Self::read_envelope::<serde_json::Value>(response).await?.into_result()?;

        Ok(envelope.into())
    }

    async fn fetch_stock_data(&self, symbol: &str, force_update: bool) -> Result<WriteAck> {
        let url = self.endpoint(&format!("api/stock-data/fetch/{}", symbol))?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&json!({ "force_update": force_update }))
            .send()
            .await?;
        let envelope = Self::read_envelope::<serde_json::Value>(response).await?.into_result()?;

        Ok(envelope.into())
    }

    async fn fetch_all_stock_data(&self, request: &BulkFetchRequest) -> Result<BulkFetchResponse> {
        let url = self.endpoint("api/stock-data/fetch")?;
        debug!("POST {} ({} symbols)", url, request.symbols.len());

        let response = self.client.post(url).json(request).send().await?;
        Self::read_json::<BulkFetchResponse>(response).await?.into_result()
    }

    async fn data_status(&self) -> Result<DataStatus> {
        let url = self.endpoint("api/stock-data/status")?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        Self::read_envelope::<DataStatus>(response).await?.into_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Json, Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{delete, get, post, put},
        Router,
    };
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    type Calls = Arc<Mutex<Vec<String>>>;

    async fn search(State(calls): State<Calls>, Json(body): Json<Value>) -> impl IntoResponse {
        calls.lock().push(format!("search {}", body));
        Json(json!({
            "success": true,
            "count": 2,
            "data": [
                {"id": 1, "symbol": "7203", "name": "トヨタ自動車", "sector": "輸送用機器"},
                {"id": 2, "symbol": "6758", "name": "ソニーグループ", "sector": ""}
            ]
        }))
    }

    async fn detail(Path(id): Path<i64>) -> impl IntoResponse {
        if id == 404 {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": "企業が見つかりません"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {"id": id, "symbol": "7203", "name": "トヨタ自動車", "price_history": []}
            })),
        )
    }

    async fn update(
        State(calls): State<Calls>,
        Path(id): Path<i64>,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        calls.lock().push(format!("update {} {}", id, body["sector"]));
        Json(json!({"success": true, "message": "企業情報を更新しました"}))
    }

    async fn check(Path(id): Path<i64>) -> impl IntoResponse {
        Json(json!({
            "success": true,
            "data": {
                "has_dependencies": true,
                "dependencies": {"stock_prices": 120, "financial_metrics": 4, "price_statistics": 2, "technical_indicators": 0},
                "total_data_count": 126,
                "company": {"id": id, "symbol": "7203", "name": "トヨタ自動車"}
            }
        }))
    }

    async fn remove(State(calls): State<Calls>, Path(id): Path<i64>) -> impl IntoResponse {
        calls.lock().push(format!("delete {}", id));
        Json(json!({"success": true, "message": "削除しました"}))
    }

    async fn register(Json(body): Json<Value>) -> impl IntoResponse {
        if body.get("price").is_some() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "price rejected"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({"success": true, "message": "登録しました", "company_id": 77})),
        )
    }

    async fn bulk_fetch(State(calls): State<Calls>, Json(body): Json<Value>) -> impl IntoResponse {
        calls.lock().push(format!("bulk {}", body));
        let symbols = body["symbols"].as_array().cloned().unwrap_or_default();
        if symbols.is_empty() {
            return Json(json!({
                "success": true,
                "message": "2社の処理が完了しました",
                "summary": {"total": 2, "success": 1, "error": 0, "skipped": 1},
                "details": [
                    {"symbol": "7203", "status": "success", "message": ""},
                    {"symbol": "6758", "status": "skipped", "message": "最新データが既に存在"}
                ]
            }));
        }
        Json(json!({
            "success": true,
            "message": format!("{}件の企業データ取得処理が完了しました", symbols.len()),
            "summary": {"total": symbols.len(), "found_companies": 0, "success": 0, "error": symbols.len(), "skipped": 0},
            "details": symbols.iter().map(|s| json!({
                "symbol": s,
                "status": "error",
                "message": format!("企業コード {} は登録されていません", s.as_str().unwrap_or_default())
            })).collect::<Vec<_>>()
        }))
    }

    async fn spawn_server() -> (HttpCompanyApi, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/api/companies/search", post(search))
            .route("/api/companies/:id", get(detail))
            .route("/api/companies/:id/update", put(update))
            .route("/api/companies/:id/check-dependencies", get(check))
            .route("/api/companies/:id/delete", delete(remove))
            .route("/api/companies/register", post(register))
            .route("/api/stock-data/fetch", post(bulk_fetch))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{}", addr)).unwrap();
        let api = HttpCompanyApi::new(base, Duration::from_secs(5)).unwrap();
        (api, calls)
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = HttpCompanyApi::new(
            Url::parse("http://example.com/kabu").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            api.endpoint("api/companies/1").unwrap().as_str(),
            "http://example.com/kabu/api/companies/1"
        );
    }

    #[tokio::test]
    async fn test_search_all_sends_empty_body() {
        let (api, calls) = spawn_server().await;

        let companies = api
            .search_companies(&CompanySearchRequest::default())
            .await
            .unwrap();

        assert_eq!(companies.len(), 2);
        assert_eq!(companies[1].sector, None);
        assert_eq!(calls.lock().as_slice(), ["search {}"]);
    }

    #[tokio::test]
    async fn test_not_found_detail_is_application_error() {
        let (api, _) = spawn_server().await;

        let detail = api.get_company_detail(1).await.unwrap();
        assert_eq!(detail.company.id, 1);

        let err = api.get_company_detail(404).await.unwrap_err();
        match err {
            AppError::Application(msg) => assert_eq!(msg, "企業が見つかりません"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_hit_expected_routes() {
        let (api, calls) = spawn_server().await;

        let form = CompanyForm {
            symbol: "7203".to_string(),
            name: "トヨタ自動車".to_string(),
            sector: None,
            market: None,
        };
        let ack = api.update_company(1, &form).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("企業情報を更新しました"));

        api.delete_company(1).await.unwrap();

        assert_eq!(calls.lock().as_slice(), ["update 1 \"\"", "delete 1"]);
    }

    #[tokio::test]
    async fn test_check_dependencies() {
        let (api, _) = spawn_server().await;

        let snapshot = api.check_dependencies(1).await.unwrap();
        assert!(snapshot.has_dependencies);
        assert_eq!(snapshot.total_data_count, 126);
        assert_eq!(snapshot.company.symbol, "7203");
    }

    #[tokio::test]
    async fn test_register_reports_company_id_and_errors() {
        let (api, _) = spawn_server().await;

        let request = RegisterRequest {
            symbol: "9984".to_string(),
            name: "ソフトバンクグループ".to_string(),
            ..Default::default()
        };
        let ack = api.register_company(&request).await.unwrap();
        assert_eq!(ack.company_id, Some(77));

        let with_price = RegisterRequest {
            price: Some(7000.0),
            ..request
        };
        let err = api.register_company(&with_price).await.unwrap_err();
        assert_eq!(err.to_string(), "price rejected");
    }

    #[tokio::test]
    async fn test_unrouted_endpoint_reports_status() {
        let (api, _) = spawn_server().await;

        // axum answers 404 with an empty body
        let err = api.data_status().await.unwrap_err();
        match err {
            AppError::Application(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpCompanyApi::new(
            Url::parse(&format!("http://{}", addr)).unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = api.check_dependencies(1).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn test_bulk_fetch_reads_summary_and_details() {
        let (api, calls) = spawn_server().await;

        let all = api
            .fetch_all_stock_data(&BulkFetchRequest {
                force_update: true,
                max_companies: Some(5),
                symbols: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(all.summary.total, 2);
        assert_eq!(all.summary.skipped, 1);
        assert_eq!(all.details.len(), 2);

        let some = api
            .fetch_all_stock_data(&BulkFetchRequest {
                symbols: vec!["9999".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(some.summary.found_companies, Some(0));
        assert_eq!(some.failed_details().count(), 1);

        let calls = calls.lock();
        assert_eq!(calls[0], r#"bulk {"force_update":true,"max_companies":5}"#);
        assert_eq!(calls[1], r#"bulk {"force_update":false,"symbols":["9999"]}"#);
    }

    #[tokio::test]
    async fn test_silent_server_times_out_as_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept and hold connections without ever answering
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let api = HttpCompanyApi::new(
            Url::parse(&format!("http://{}", addr)).unwrap(),
            Duration::from_millis(200),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = api.data_status().await.unwrap_err();

        match err {
            AppError::Network(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
