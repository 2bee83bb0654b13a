//! Deletion guard state machine
//!
//! Pure transition logic; the service layer performs the effects it asks
//! for (dependency check, delete call) and feeds results back in.

use crate::api::types::{Company, DependencySnapshot};
use crate::error::{AppError, Result};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStage {
    Idle,
    /// Dependency check issued or answered; waiting for the operator if
    /// the company has dependent rows
    DependenciesChecked,
    FinalConfirmationPending,
    Executing,
}

/// Operator actions and API results driving the guard
#[derive(Debug, Clone)]
pub enum DeletionEvent {
    /// Delete invoked on a cached company
    Begin(Company),
    /// Dependency check answered for the given attempt
    DependenciesLoaded {
        attempt: u64,
        snapshot: DependencySnapshot,
    },
    /// Operator has seen the breakdown and wants to continue
    Proceed,
    /// Acknowledgment control toggled
    SetAcknowledged(bool),
    /// Final confirm button
    Confirm,
    /// Delete call returned (either way)
    Finished { attempt: u64 },
    /// Any dialog closed for any reason
    Dismiss,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    CheckDependencies { attempt: u64, company_id: i64 },
    ExecuteDelete { attempt: u64, company_id: i64 },
}

/// State of the single in-flight delete attempt
#[derive(Debug, Clone)]
pub struct DeletionGuard {
    stage: DeleteStage,
    target: Option<Company>,
    snapshot: Option<DependencySnapshot>,
    acknowledged: bool,
    attempt: u64,
}

impl Default for DeletionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletionGuard {
    pub fn new() -> Self {
        Self {
            stage: DeleteStage::Idle,
            target: None,
            snapshot: None,
            acknowledged: false,
            attempt: 0,
        }
    }

    pub fn stage(&self) -> DeleteStage {
        self.stage
    }

    pub fn target(&self) -> Option<&Company> {
        self.target.as_ref()
    }

    pub fn snapshot(&self) -> Option<&DependencySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Identifier of the current attempt; bumps on every `Begin`
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Single exit path: back to Idle with nothing retained
    pub fn reset(&mut self) {
        self.stage = DeleteStage::Idle;
        self.target = None;
        self.snapshot = None;
        self.acknowledged = false;
    }

    fn invalid(&self, what: &str) -> AppError {
        AppError::InvalidState(format!("{} not allowed in stage {:?}", what, self.stage))
    }

    /// Apply one event and return the effect the caller must perform
    pub fn dispatch(&mut self, event: DeletionEvent) -> Result<Effect> {
        debug!("DeletionGuard {:?} <- {:?}", self.stage, event);

        match event {
            DeletionEvent::Begin(company) => {
                if self.stage == DeleteStage::Executing {
                    return Err(self.invalid("Starting a new delete"));
                }

                self.reset();
                self.attempt += 1;
                let company_id = company.id;
                self.target = Some(company);
                self.stage = DeleteStage::DependenciesChecked;

                Ok(Effect::CheckDependencies {
                    attempt: self.attempt,
                    company_id,
                })
            }

            DeletionEvent::DependenciesLoaded { attempt, snapshot } => {
                if attempt != self.attempt
                    || self.stage != DeleteStage::DependenciesChecked
                    || self.snapshot.is_some()
                {
                    return Err(AppError::InvalidState(format!(
                        "Discarding dependency result for attempt {} (current {}, stage {:?})",
                        attempt, self.attempt, self.stage
                    )));
                }

                let target_id = self.target.as_ref().map(|c| c.id);
                if target_id != Some(snapshot.company.id) {
                    return Err(AppError::InvalidState(format!(
                        "Dependency result for company {} does not match target {:?}",
                        snapshot.company.id, target_id
                    )));
                }

                let has_dependencies = snapshot.has_dependencies;
                self.snapshot = Some(snapshot);

                if !has_dependencies {
                    self.stage = DeleteStage::FinalConfirmationPending;
                    self.acknowledged = false;
                }

                Ok(Effect::None)
            }

            DeletionEvent::Proceed => {
                let ready = self.stage == DeleteStage::DependenciesChecked
                    && self.snapshot.is_some();
                if !ready {
                    return Err(self.invalid("Proceeding past dependencies"));
                }

                self.stage = DeleteStage::FinalConfirmationPending;
                self.acknowledged = false;
                Ok(Effect::None)
            }

            DeletionEvent::SetAcknowledged(value) => {
                if self.stage != DeleteStage::FinalConfirmationPending {
                    return Err(self.invalid("Acknowledging"));
                }

                self.acknowledged = value;
                Ok(Effect::None)
            }

            DeletionEvent::Confirm => {
                if self.stage != DeleteStage::FinalConfirmationPending {
                    return Err(self.invalid("Confirming delete"));
                }
                if !self.acknowledged {
                    return Err(AppError::InvalidState(
                        "Deletion must be acknowledged before confirming".to_string(),
                    ));
                }

                let company_id = self
                    .target
                    .as_ref()
                    .map(|c| c.id)
                    .ok_or_else(|| AppError::Internal("Confirm without a target".to_string()))?;

                self.stage = DeleteStage::Executing;
                Ok(Effect::ExecuteDelete {
                    attempt: self.attempt,
                    company_id,
                })
            }

            DeletionEvent::Finished { attempt } => {
                // A dismissed or superseded attempt has already been reset
                if attempt == self.attempt && self.stage == DeleteStage::Executing {
                    self.reset();
                }
                Ok(Effect::None)
            }

            DeletionEvent::Dismiss => {
                self.reset();
                Ok(Effect::None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CompanyRef, DependencyCounts};

    fn toyota() -> Company {
        Company::new(1, "7203", "トヨタ自動車")
    }

    fn snapshot(id: i64, counts: DependencyCounts) -> DependencySnapshot {
        let total = counts.sum();
        DependencySnapshot {
            company: CompanyRef {
                id,
                symbol: "7203".to_string(),
                name: "トヨタ自動車".to_string(),
            },
            has_dependencies: total > 0,
            total_data_count: total,
            dependencies: counts,
        }
    }

    fn with_rows() -> DependencyCounts {
        DependencyCounts {
            stock_prices: 120,
            financial_metrics: 4,
            price_statistics: 2,
            technical_indicators: 0,
        }
    }

    #[test]
    fn test_begin_requests_dependency_check() {
        let mut guard = DeletionGuard::new();
        let effect = guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();

        assert_eq!(
            effect,
            Effect::CheckDependencies {
                attempt: 1,
                company_id: 1
            }
        );
        assert_eq!(guard.stage(), DeleteStage::DependenciesChecked);
        assert!(guard.snapshot().is_none());
    }

    #[test]
    fn test_no_dependencies_auto_advances() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();
        guard
            .dispatch(DeletionEvent::DependenciesLoaded {
                attempt: 1,
                snapshot: snapshot(1, DependencyCounts::default()),
            })
            .unwrap();

        assert_eq!(guard.stage(), DeleteStage::FinalConfirmationPending);
    }

    #[test]
    fn test_dependencies_require_proceed() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();

        // Cannot skip ahead before the check answers
        assert!(guard.dispatch(DeletionEvent::Proceed).is_err());

        guard
            .dispatch(DeletionEvent::DependenciesLoaded {
                attempt: 1,
                snapshot: snapshot(1, with_rows()),
            })
            .unwrap();
        assert_eq!(guard.stage(), DeleteStage::DependenciesChecked);
        assert!(guard.dispatch(DeletionEvent::Confirm).is_err());

        guard.dispatch(DeletionEvent::Proceed).unwrap();
        assert_eq!(guard.stage(), DeleteStage::FinalConfirmationPending);
        assert_eq!(guard.snapshot().unwrap().total_data_count, 126);
    }

    #[test]
    fn test_confirm_requires_acknowledgment_at_click_time() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();
        guard
            .dispatch(DeletionEvent::DependenciesLoaded {
                attempt: 1,
                snapshot: snapshot(1, DependencyCounts::default()),
            })
            .unwrap();

        assert!(guard.dispatch(DeletionEvent::Confirm).is_err());

        // Checked then unchecked still blocks
        guard.dispatch(DeletionEvent::SetAcknowledged(true)).unwrap();
        guard.dispatch(DeletionEvent::SetAcknowledged(false)).unwrap();
        assert!(guard.dispatch(DeletionEvent::Confirm).is_err());
        assert_eq!(guard.stage(), DeleteStage::FinalConfirmationPending);

        guard.dispatch(DeletionEvent::SetAcknowledged(true)).unwrap();
        let effect = guard.dispatch(DeletionEvent::Confirm).unwrap();
        assert_eq!(
            effect,
            Effect::ExecuteDelete {
                attempt: 1,
                company_id: 1
            }
        );
        assert_eq!(guard.stage(), DeleteStage::Executing);

        // At most one destructive call per attempt
        assert!(guard.dispatch(DeletionEvent::Confirm).is_err());
        assert!(guard.dispatch(DeletionEvent::Begin(toyota())).is_err());

        guard.dispatch(DeletionEvent::Finished { attempt: 1 }).unwrap();
        assert_eq!(guard.stage(), DeleteStage::Idle);
        assert!(guard.target().is_none());
    }

    #[test]
    fn test_dismiss_resets_everything() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();
        guard
            .dispatch(DeletionEvent::DependenciesLoaded {
                attempt: 1,
                snapshot: snapshot(1, with_rows()),
            })
            .unwrap();
        guard.dispatch(DeletionEvent::Proceed).unwrap();
        guard.dispatch(DeletionEvent::SetAcknowledged(true)).unwrap();

        guard.dispatch(DeletionEvent::Dismiss).unwrap();

        assert_eq!(guard.stage(), DeleteStage::Idle);
        assert!(guard.target().is_none());
        assert!(guard.snapshot().is_none());
        assert!(!guard.is_acknowledged());
        assert!(guard.dispatch(DeletionEvent::Proceed).is_err());
        assert!(guard.dispatch(DeletionEvent::Confirm).is_err());
    }

    #[test]
    fn test_late_dependency_result_is_rejected() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();
        guard.dispatch(DeletionEvent::Dismiss).unwrap();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();

        let stale = guard.dispatch(DeletionEvent::DependenciesLoaded {
            attempt: 1,
            snapshot: snapshot(1, with_rows()),
        });
        assert!(stale.is_err());
        assert!(guard.snapshot().is_none());

        guard
            .dispatch(DeletionEvent::DependenciesLoaded {
                attempt: 2,
                snapshot: snapshot(1, with_rows()),
            })
            .unwrap();
        assert!(guard.snapshot().is_some());
    }

    #[test]
    fn test_snapshot_for_other_company_is_rejected() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();

        let result = guard.dispatch(DeletionEvent::DependenciesLoaded {
            attempt: 1,
            snapshot: snapshot(2, with_rows()),
        });
        assert!(result.is_err());
        assert_eq!(guard.stage(), DeleteStage::DependenciesChecked);
    }

    #[test]
    fn test_finished_for_old_attempt_is_ignored() {
        let mut guard = DeletionGuard::new();
        guard.dispatch(DeletionEvent::Begin(toyota())).unwrap();
        guard.dispatch(DeletionEvent::Finished { attempt: 0 }).unwrap();
        assert_eq!(guard.stage(), DeleteStage::DependenciesChecked);
    }
}
