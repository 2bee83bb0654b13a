//! Deletion Service
//!
//! Drives the [`DeletionGuard`](crate::deletion::DeletionGuard) against the
//! company API: issues the dependency check, applies its answer only to the
//! attempt that asked for it, and performs the single delete call.

use crate::api::types::WriteAck;
use crate::deletion::{DeleteStage, DeletionEvent, DeletionPrompt, Effect};
use crate::error::{AppError, Result};
use crate::services::CompanyService;
use crate::state::AppState;
use tracing::{error, info, warn};

/// Deletion service for the guarded delete flow
pub struct DeletionService;

impl DeletionService {
    /// Start a delete for a cached company and load its dependency counts
    ///
    /// Any open delete attempt is abandoned. The returned prompt is either a
    /// dependency warning or, for a company with no dependent rows, the
    /// final confirmation.
    pub async fn begin(state: &AppState, company_id: i64) -> Result<DeletionPrompt> {
        info!("DeletionService::begin - {}", company_id);

        let company = match state.companies.find_by_id(company_id) {
            Some(company) => company,
            None => {
                state.deletion.lock().reset();
                state
                    .notifications
                    .warning(format!("企業が見つかりません (ID: {})", company_id));
                return Err(AppError::StaleReference(company_id));
            }
        };

        let effect = state.deletion.lock().dispatch(DeletionEvent::Begin(company));
        let attempt = match effect.map_err(|e| Self::reject(state, e))? {
            Effect::CheckDependencies { attempt, .. } => attempt,
            other => {
                return Err(AppError::Internal(format!(
                    "Unexpected effect on begin: {:?}",
                    other
                )))
            }
        };

        let result = state.api.check_dependencies(company_id).await;

        let mut guard = state.deletion.lock();
        let current = guard.attempt() == attempt && guard.stage() == DeleteStage::DependenciesChecked;
        if !current {
            warn!(
                "Discarding dependency result for company {} (attempt {} superseded)",
                company_id, attempt
            );
            drop(guard);
            return Ok(state.deletion_prompt());
        }

        match result {
            Ok(snapshot) => {
                if let Err(e) = guard.dispatch(DeletionEvent::DependenciesLoaded { attempt, snapshot }) {
                    guard.reset();
                    drop(guard);
                    error!("Dependency result rejected: {}", e);
                    state
                        .notifications
                        .danger(format!("関連データの確認に失敗しました: {}", e));
                    return Err(e);
                }
                drop(guard);
                Ok(state.deletion_prompt())
            }
            Err(e) => {
                guard.reset();
                drop(guard);
                error!("Dependency check failed for company {}: {}", company_id, e);
                state
                    .notifications
                    .danger(format!("関連データの確認に失敗しました: {}", e));
                Err(e)
            }
        }
    }

    /// Operator has read the dependency breakdown and wants to continue
    pub fn proceed(state: &AppState) -> Result<DeletionPrompt> {
        let result = state.deletion.lock().dispatch(DeletionEvent::Proceed);
        result.map_err(|e| Self::reject(state, e))?;
        Ok(state.deletion_prompt())
    }

    pub fn set_acknowledged(state: &AppState, acknowledged: bool) -> Result<DeletionPrompt> {
        let result = state
            .deletion
            .lock()
            .dispatch(DeletionEvent::SetAcknowledged(acknowledged));
        result.map_err(|e| Self::reject(state, e))?;
        Ok(state.deletion_prompt())
    }

    /// Close whatever delete dialog is open
    pub fn dismiss(state: &AppState) -> DeletionPrompt {
        info!("DeletionService::dismiss");
        state.deletion.lock().reset();
        DeletionPrompt::Closed
    }

    /// Execute the delete for the acknowledged attempt
    ///
    /// Issues exactly one delete call. Whatever the outcome, the guard
    /// returns to Idle; on success the cache is reloaded.
    pub async fn confirm(state: &AppState) -> Result<WriteAck> {
        let (effect, target) = {
            let mut guard = state.deletion.lock();
            let effect = guard.dispatch(DeletionEvent::Confirm);
            (effect, guard.target().cloned())
        };

        let (attempt, company_id) = match effect.map_err(|e| Self::reject(state, e))? {
            Effect::ExecuteDelete {
                attempt,
                company_id,
            } => (attempt, company_id),
            other => {
                return Err(AppError::Internal(format!(
                    "Unexpected effect on confirm: {:?}",
                    other
                )))
            }
        };

        info!("DeletionService::confirm - deleting company {}", company_id);
        let result = state.api.delete_company(company_id).await;

        let finished = state.deletion.lock().dispatch(DeletionEvent::Finished { attempt });
        finished?;

        let name = target
            .map(|c| format!("{} ({})", c.name, c.symbol))
            .unwrap_or_else(|| format!("ID: {}", company_id));

        match result {
            Ok(ack) => {
                state.notifications.success(
                    ack.message
                        .clone()
                        .unwrap_or_else(|| format!("{} を削除しました", name)),
                );
                CompanyService::upsert_after_write(state).await;
                Ok(ack)
            }
            Err(e) => {
                error!("Delete failed for company {}: {}", company_id, e);
                state
                    .notifications
                    .danger(format!("{} の削除に失敗しました: {}", name, e));
                Err(e)
            }
        }
    }

    fn reject(state: &AppState, err: AppError) -> AppError {
        warn!("Delete step rejected: {}", err);
        state.notifications.warning(err.to_string());
        err
    }
}
