//! Application state management

use crate::api::{CompanyApi, HttpCompanyApi};
use crate::api::types::Company;
use crate::cache::CompanyCache;
use crate::config::AppConfig;
use crate::deletion::{DeleteStage, DeletionGuard, DeletionPrompt};
use crate::error::Result;
use crate::notify::NotificationCenter;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Controller/store shared by every command handler
///
/// Locks are held only for the duration of a read or a transition, never
/// across an `.await`; each continuation re-checks state before applying
/// a response.
pub struct AppState {
    /// Company REST API
    pub api: Arc<dyn CompanyApi>,

    /// Mirror of the server's company list
    pub companies: CompanyCache,

    /// The one in-flight delete attempt
    pub deletion: Mutex<DeletionGuard>,

    /// Visible notifications
    pub notifications: Arc<NotificationCenter>,

    /// Company open in the edit form
    pub editing: RwLock<Option<Company>>,

    /// Detail view currently open
    pub detail: RwLock<DetailView>,
}

/// Open detail view; `generation` bumps on every open and close so a
/// response can tell whether its own request is still the one shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailView {
    pub company_id: Option<i64>,
    pub generation: u64,
}

impl AppState {
    /// Create state backed by the HTTP API described in `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let api = Arc::new(HttpCompanyApi::from_config(&config)?);
        Ok(Self::with_api(config, api))
    }

    /// Create state around any API implementation
    pub fn with_api(config: AppConfig, api: Arc<dyn CompanyApi>) -> Self {
        let notifications = Arc::new(NotificationCenter::new(config.notification_duration()));

        Self {
            api,
            companies: CompanyCache::new(),
            deletion: Mutex::new(DeletionGuard::new()),
            notifications,
            editing: RwLock::new(None),
            detail: RwLock::new(DetailView::default()),
        }
    }

    pub fn delete_stage(&self) -> DeleteStage {
        self.deletion.lock().stage()
    }

    pub fn deletion_prompt(&self) -> DeletionPrompt {
        DeletionPrompt::from_guard(&self.deletion.lock())
    }

    pub fn get_editing(&self) -> Option<Company> {
        self.editing.read().clone()
    }

    pub fn set_editing(&self, company: Option<Company>) {
        *self.editing.write() = company;
    }

    pub fn get_current_detail_id(&self) -> Option<i64> {
        self.detail.read().company_id
    }

    /// Show `id` in the detail view and return the request generation
    pub fn open_detail_view(&self, id: i64) -> u64 {
        let mut detail = self.detail.write();
        detail.generation += 1;
        detail.company_id = Some(id);
        detail.generation
    }

    pub fn close_detail_view(&self) {
        let mut detail = self.detail.write();
        detail.generation += 1;
        detail.company_id = None;
    }

    /// Whether the request issued as `generation` for `id` is still on screen
    pub fn is_detail_current(&self, id: i64, generation: u64) -> bool {
        let detail = self.detail.read();
        detail.company_id == Some(id) && detail.generation == generation
    }
}
