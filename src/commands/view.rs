//! Plain-text rendering of command results

use crate::api::types::{
    BulkFetchResponse, Company, CompanyDetail, DataStatus, ExternalCompanyCandidate, WriteAck,
};
use crate::error::{AppError, ErrorResponse};
use crate::format::{
    format_currency, format_date, format_percentage, format_ratio, format_volume, today_tokyo,
};
use crate::notify::Notification;

const NONE_TEXT: &str = "-";

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|s| !s.is_empty()).unwrap_or(NONE_TEXT)
}

/// Company list with the filtered/total count footer
pub fn company_table(companies: &[Company], total: usize) -> String {
    let mut lines = vec![format!(
        "{:>5}  {:<6} {:<24} {:<12} {:>10} {:>8} {:>8} {:>8}",
        "ID", "コード", "企業名", "業種", "株価", "PBR", "PER", "ROE"
    )];

    for company in companies {
        lines.push(format!(
            "{:>5}  {:<6} {:<24} {:<12} {:>10} {:>8} {:>8} {:>8}",
            company.id,
            company.symbol,
            company.name,
            or_dash(company.sector.as_deref()),
            format_currency(company.current_price),
            format_ratio(company.pbr),
            format_ratio(company.per),
            format_percentage(company.roe),
        ));
    }

    lines.push(format!("{} / {} 社", companies.len(), total));
    lines.join("\n")
}

pub fn company_detail(detail: &CompanyDetail) -> String {
    let c = &detail.company;
    let mut lines = vec![
        format!("{} ({}) [ID: {}]", c.name, c.symbol, c.id),
        format!(
            "業種: {}  市場: {}",
            or_dash(c.sector.as_deref()),
            or_dash(c.market.as_deref())
        ),
        format!(
            "株価: {} ({})  出来高: {}",
            format_currency(c.current_price),
            format_date(c.price_date.as_deref()),
            format_volume(c.volume)
        ),
    ];

    if let Some(metrics) = &detail.financial_metrics {
        lines.push(format!(
            "財務指標 ({}): PBR {}  PER {}  自己資本比率 {}  ROE {}  ROA {}",
            format_date(metrics.report_date.as_deref()),
            format_ratio(metrics.pbr),
            format_ratio(metrics.per),
            format_percentage(metrics.equity_ratio),
            format_percentage(metrics.roe),
            format_percentage(metrics.roa),
        ));
    }

    if !detail.price_statistics.is_empty() {
        lines.push("価格統計:".to_string());
        for stat in &detail.price_statistics {
            lines.push(format!(
                "  {} {}: 安値 {}  高値 {}  平均 {}",
                stat.period_type,
                stat.period_value,
                format_currency(stat.min_price),
                format_currency(stat.max_price),
                format_currency(stat.avg_price),
            ));
        }
    }

    if let Some(ti) = &detail.technical_indicators {
        lines.push(format!(
            "テクニカル指標 ({}): RSI {}  MACD {}  SMA25 {}  SMA75 {}",
            format_date(ti.indicator_date.as_deref()),
            ti.rsi.map(|v| format!("{:.2}", v)).unwrap_or_else(|| NONE_TEXT.to_string()),
            ti.macd.map(|v| format!("{:.2}", v)).unwrap_or_else(|| NONE_TEXT.to_string()),
            format_currency(ti.sma_25),
            format_currency(ti.sma_75),
        ));
    }

    if let Some(latest) = detail.price_history.first() {
        lines.push(format!(
            "株価履歴: {} 件 (最新 {} {})",
            detail.price_history.len(),
            format_date(Some(&latest.price_date)),
            format_currency(Some(latest.price))
        ));
    }

    lines.join("\n")
}

pub fn candidate_table(candidates: &[ExternalCompanyCandidate]) -> String {
    if candidates.is_empty() {
        return "該当する企業が見つかりませんでした".to_string();
    }

    candidates
        .iter()
        .map(|c| {
            let mark = if c.already_registered { "登録済" } else { "未登録" };
            format!(
                "{:<6} {:<24} {:<12} {:<10} [{}]",
                c.symbol,
                c.name,
                or_dash(c.sector.as_deref()),
                or_dash(c.market.as_deref()),
                mark
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn edit_form(company: &Company) -> String {
    format!(
        "編集中: [ID: {}] symbol={} name={} sector={} market={}\n変更は save key=value、中止は discard",
        company.id,
        company.symbol,
        company.name,
        or_dash(company.sector.as_deref()),
        or_dash(company.market.as_deref()),
    )
}

pub fn ack(ack: &WriteAck) -> String {
    match (&ack.message, ack.company_id) {
        (Some(message), Some(id)) => format!("{} [ID: {}]", message, id),
        (Some(message), None) => message.clone(),
        (None, Some(id)) => format!("完了 [ID: {}]", id),
        (None, None) => "完了".to_string(),
    }
}

/// Bulk refresh outcome with one line per failed company
pub fn bulk_fetch(response: &BulkFetchResponse) -> String {
    let summary = &response.summary;
    let mut lines = Vec::new();

    if let Some(message) = &response.message {
        lines.push(message.clone());
    }
    lines.push(format!(
        "対象 {} / 成功 {} / エラー {} / スキップ {}",
        summary.total, summary.success, summary.error, summary.skipped
    ));

    for failed in response.failed_details() {
        lines.push(format!(
            "  - {}: {}",
            failed.symbol,
            or_dash(failed.message.as_deref())
        ));
    }

    lines.join("\n")
}

/// One-line error for the terminal, tagged with its stable code
pub fn error_line(err: &AppError) -> String {
    let response = ErrorResponse::from(err);
    format!("[{}] {}", response.code, response.message)
}

pub fn data_status(status: &DataStatus) -> String {
    [
        format!("データ状況 ({} 時点)", today_tokyo().format("%Y/%m/%d")),
        format!("登録企業数: {}", status.total_companies),
        format!("株価データあり: {}", status.companies_with_price_data),
        format!("財務データあり: {}", status.companies_with_financial_data),
        format!("要更新: {}", status.companies_need_update),
        format!("最終更新: {}", format_date(status.last_updated.as_deref())),
    ]
    .join("\n")
}

/// Visible notifications, numbered for `dismiss`
pub fn notifications(entries: &[Notification]) -> String {
    if entries.is_empty() {
        return "通知はありません".to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, n)| format!("{}. [{}] {}", i + 1, n.kind.as_str(), n.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn help() -> String {
    [
        "load                                  企業一覧を再読み込み",
        "list [symbol=] [name=] [sector=]      一覧を絞り込み表示",
        "show <ID> / close                     企業詳細を表示 / 閉じる",
        "find <企業名>                         外部データから企業を検索",
        "create <コード> <企業名> [sector=] [market=]",
        "edit <ID> / save [key=value] / discard",
        "register <コード> <企業名> [price= volume= pbr= per= equity_ratio= roe= roa= ...]",
        "fetch <コード>... [--force]           株価データを取得",
        "fetch --all [--force] [max=N]         全企業の株価データを一括取得",
        "status                                データ状況",
        "delete <ID> / proceed / ack / unack / confirm / cancel",
        "alerts / dismiss <番号> / dismiss all 通知の表示 / 消去",
        "quit",
    ]
    .join("\n")
}
