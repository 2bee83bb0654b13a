//! What the operator is shown at each step of a delete

use crate::api::types::{Company, DependencySnapshot};
use crate::deletion::guard::{DeleteStage, DeletionGuard};
use crate::format::format_volume;
use serde::Serialize;

/// Summary used by the final confirmation dialog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationSummary {
    pub company_id: i64,
    pub symbol: String,
    pub name: String,
    pub total_data_count: u64,
    /// Nonzero categories only
    pub categories: Vec<(String, u64)>,
    pub acknowledged: bool,
}

impl ConfirmationSummary {
    pub fn from_snapshot(company: &Company, snapshot: &DependencySnapshot, acknowledged: bool) -> Self {
        Self {
            company_id: company.id,
            symbol: company.symbol.clone(),
            name: company.name.clone(),
            total_data_count: snapshot.total_data_count,
            categories: category_rows(snapshot),
            acknowledged,
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "削除対象: {} ({}) [ID: {}]",
            self.name, self.symbol, self.company_id
        )];

        if self.total_data_count > 0 {
            lines.push(format!(
                "関連データ {} 件も同時に削除されます",
                format_volume(Some(self.total_data_count as i64))
            ));
            for (label, count) in &self.categories {
                lines.push(format!("  - {}: {} 件", label, count));
            }
        } else {
            lines.push("関連データはありません".to_string());
        }

        let mark = if self.acknowledged { "x" } else { " " };
        lines.push(format!("[{}] この操作は取り消せないことを理解しました", mark));
        lines.join("\n")
    }
}

fn category_rows(snapshot: &DependencySnapshot) -> Vec<(String, u64)> {
    snapshot
        .nonzero_categories()
        .into_iter()
        .map(|(category, count)| (category.label().to_string(), count))
        .collect()
}

/// Current dialog for the delete flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DeletionPrompt {
    /// Nothing open
    Closed,
    /// Dependency check in flight
    Checking { company_id: i64 },
    /// Company has dependent rows; operator must explicitly proceed
    DependencyWarning {
        company_id: i64,
        symbol: String,
        name: String,
        total_data_count: u64,
        categories: Vec<(String, u64)>,
    },
    FinalConfirmation(ConfirmationSummary),
    /// Delete call in flight
    Deleting { company_id: i64 },
}

impl DeletionPrompt {
    /// Derive the dialog from guard state; both stages read the same snapshot
    pub fn from_guard(guard: &DeletionGuard) -> Self {
        let target = match guard.target() {
            Some(target) => target,
            None => return DeletionPrompt::Closed,
        };

        match (guard.stage(), guard.snapshot()) {
            (DeleteStage::Idle, _) => DeletionPrompt::Closed,
            (DeleteStage::DependenciesChecked, None) => DeletionPrompt::Checking {
                company_id: target.id,
            },
            (DeleteStage::DependenciesChecked, Some(snapshot)) => {
                DeletionPrompt::DependencyWarning {
                    company_id: target.id,
                    symbol: target.symbol.clone(),
                    name: target.name.clone(),
                    total_data_count: snapshot.total_data_count,
                    categories: category_rows(snapshot),
                }
            }
            (DeleteStage::FinalConfirmationPending, Some(snapshot)) => {
                DeletionPrompt::FinalConfirmation(ConfirmationSummary::from_snapshot(
                    target,
                    snapshot,
                    guard.is_acknowledged(),
                ))
            }
            (DeleteStage::FinalConfirmationPending, None) => DeletionPrompt::Closed,
            (DeleteStage::Executing, _) => DeletionPrompt::Deleting {
                company_id: target.id,
            },
        }
    }

    pub fn render(&self) -> String {
        match self {
            DeletionPrompt::Closed => String::new(),
            DeletionPrompt::Checking { company_id } => {
                format!("関連データを確認中... [ID: {}]", company_id)
            }
            DeletionPrompt::DependencyWarning {
                symbol,
                name,
                total_data_count,
                categories,
                ..
            } => {
                let mut lines = vec![
                    format!("{} ({}) には関連データがあります", name, symbol),
                    format!("合計: {} 件", total_data_count),
                ];
                for (label, count) in categories {
                    lines.push(format!("  - {}: {} 件", label, count));
                }
                lines.push("続行するには proceed、中止するには cancel".to_string());
                lines.join("\n")
            }
            DeletionPrompt::FinalConfirmation(summary) => summary.render(),
            DeletionPrompt::Deleting { company_id } => format!("削除中... [ID: {}]", company_id),
        }
    }
}
