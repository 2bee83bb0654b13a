//! Operator commands
//!
//! Every operator action is a [`Command`]; [`dispatch`] is the single entry
//! point that routes it to a service and renders the result. The terminal
//! front-end builds commands with [`Command::parse`].

pub mod view;

use crate::cache::CompanyFilter;
use crate::error::{AppError, Result};
use crate::services::{CompanyInput, CompanyService, DeletionService, RegistrationForm};
use crate::state::AppState;
use std::collections::HashMap;
use tracing::debug;

/// Field changes for the company open in the edit form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPatch {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub market: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Reload the company list from the server
    Load,
    List(CompanyFilter),
    Show(i64),
    CloseDetail,
    SearchExternal(String),
    Create {
        symbol: String,
        name: String,
        sector: Option<String>,
        market: Option<String>,
    },
    Edit(i64),
    Save(EditPatch),
    CancelEdit,
    Register(Vec<(String, String)>),
    /// One symbol uses the per-symbol endpoint; several go through the bulk one
    Fetch { symbols: Vec<String>, force: bool },
    FetchAll {
        force: bool,
        max_companies: Option<u32>,
    },
    Status,
    Delete(i64),
    Proceed,
    Acknowledge(bool),
    Confirm,
    CancelDelete,
    Notifications,
    DismissNotification(usize),
    ClearNotifications,
    Help,
    Quit,
}

impl Command {
    /// Parse one line of operator input
    ///
    /// Positional arguments come first; optional fields are `key=value`.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| AppError::Validation("コマンドを入力してください".to_string()))?;
        let args = Args::new(words);

        let command = match verb.to_lowercase().as_str() {
            "load" | "reload" => Command::Load,
            "list" | "ls" => Command::List(CompanyFilter::new(
                args.option("symbol").as_deref(),
                args.option("name").as_deref(),
                args.option("sector").as_deref(),
            )),
            "show" | "detail" => Command::Show(args.id(0)?),
            "close" => Command::CloseDetail,
            "find" | "search" => {
                let name = args.positional.join(" ");
                if name.is_empty() {
                    return Err(usage("find <企業名>"));
                }
                Command::SearchExternal(name)
            }
            "create" | "add" => Command::Create {
                symbol: args.required(0, "create <企業コード> <企業名>")?,
                name: args.rest(1, "create <企業コード> <企業名>")?,
                sector: args.option("sector"),
                market: args.option("market"),
            },
            "edit" => Command::Edit(args.id(0)?),
            "save" if !args.positional.is_empty() => {
                return Err(usage("save key=value ... (空白を含む値は指定できません)"));
            }
            "save" => Command::Save(EditPatch {
                symbol: args.option("symbol"),
                name: args.option("name"),
                sector: args.option("sector"),
                market: args.option("market"),
            }),
            "discard" => Command::CancelEdit,
            "register" => {
                let mut fields = vec![
                    ("symbol".to_string(), args.required(0, "register <企業コード> <企業名> [key=value ...]")?),
                    ("name".to_string(), args.rest(1, "register <企業コード> <企業名> [key=value ...]")?),
                ];
                let mut options: Vec<_> = args
                    .options
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                options.sort();
                fields.extend(options);
                Command::Register(fields)
            }
            "fetch" if args.flag("--all") => Command::FetchAll {
                force: args.flag("--force"),
                max_companies: args
                    .option("max")
                    .map(|max| parse_number::<u32>("max", &max))
                    .transpose()?,
            },
            "fetch" => {
                let symbols = args.words();
                if symbols.is_empty() {
                    return Err(usage("fetch <企業コード>... [--force] | fetch --all [--force] [max=N]"));
                }
                Command::Fetch {
                    symbols,
                    force: args.flag("--force"),
                }
            }
            "status" => Command::Status,
            "delete" | "rm" => Command::Delete(args.id(0)?),
            "proceed" => Command::Proceed,
            "ack" => Command::Acknowledge(true),
            "unack" => Command::Acknowledge(false),
            "confirm" => Command::Confirm,
            "cancel" => Command::CancelDelete,
            "alerts" | "notifications" => Command::Notifications,
            "dismiss" if args.positional.first().map(String::as_str) == Some("all") => {
                Command::ClearNotifications
            }
            "dismiss" => {
                let position = args
                    .positional
                    .first()
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| usage("dismiss <番号>"))?;
                Command::DismissNotification(position)
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(AppError::Validation(format!(
                    "不明なコマンドです: {} (help で一覧を表示)",
                    other
                )))
            }
        };

        Ok(command)
    }
}

/// Run one command against the application state and render its output
pub async fn dispatch(state: &AppState, command: Command) -> Result<String> {
    debug!("dispatch {:?}", command);

    match command {
        Command::Load => {
            let count = CompanyService::load(state).await?;
            Ok(format!("{} 社を読み込みました", count))
        }
        Command::List(filter) => {
            let companies = CompanyService::filter(state, &filter);
            Ok(view::company_table(&companies, state.companies.len()))
        }
        Command::Show(id) => match CompanyService::open_detail(state, id).await? {
            Some(detail) => Ok(view::company_detail(&detail)),
            None => Ok(String::new()),
        },
        Command::CloseDetail => {
            CompanyService::close_detail(state);
            Ok(String::new())
        }
        Command::SearchExternal(name) => {
            let candidates = CompanyService::search_external(state, &name).await?;
            Ok(view::candidate_table(&candidates))
        }
        Command::Create {
            symbol,
            name,
            sector,
            market,
        } => {
            let input = CompanyInput {
                symbol,
                name,
                sector,
                market,
            };
            let ack = CompanyService::create(state, &input).await?;
            Ok(view::ack(&ack))
        }
        Command::Edit(id) => {
            let company = CompanyService::begin_edit(state, id)?;
            Ok(view::edit_form(&company))
        }
        Command::Save(patch) => {
            let editing = state.get_editing().ok_or_else(|| {
                AppError::InvalidState("編集中の企業がありません (edit <ID>)".to_string())
            })?;
            let input = CompanyInput {
                symbol: patch.symbol.unwrap_or(editing.symbol),
                name: patch.name.unwrap_or(editing.name),
                sector: patch.sector.or(editing.sector),
                market: patch.market.or(editing.market),
            };
            let ack = CompanyService::save_edit(state, &input).await?;
            Ok(view::ack(&ack))
        }
        Command::CancelEdit => {
            CompanyService::cancel_edit(state);
            Ok(String::new())
        }
        Command::Register(fields) => {
            let form = registration_form(&fields)?;
            let ack = CompanyService::register(state, &form).await?;
            Ok(view::ack(&ack))
        }
        Command::Fetch { symbols, force } => match symbols.as_slice() {
            [symbol] => {
                let ack = CompanyService::fetch_stock_data(state, symbol, force).await?;
                Ok(view::ack(&ack))
            }
            _ => {
                let response =
                    CompanyService::fetch_all_stock_data(state, &symbols, force, None).await?;
                Ok(view::bulk_fetch(&response))
            }
        },
        Command::FetchAll {
            force,
            max_companies,
        } => {
            let response =
                CompanyService::fetch_all_stock_data(state, &[], force, max_companies).await?;
            Ok(view::bulk_fetch(&response))
        }
        Command::Status => {
            let status = CompanyService::data_status(state).await?;
            Ok(view::data_status(&status))
        }
        Command::Delete(id) => Ok(DeletionService::begin(state, id).await?.render()),
        Command::Proceed => Ok(DeletionService::proceed(state)?.render()),
        Command::Acknowledge(value) => Ok(DeletionService::set_acknowledged(state, value)?.render()),
        Command::Confirm => {
            let ack = DeletionService::confirm(state).await?;
            Ok(view::ack(&ack))
        }
        Command::CancelDelete => Ok(DeletionService::dismiss(state).render()),
        Command::Notifications => Ok(view::notifications(&state.notifications.visible())),
        Command::DismissNotification(position) => {
            let visible = state.notifications.visible();
            let notification = position
                .checked_sub(1)
                .and_then(|index| visible.get(index))
                .ok_or_else(|| AppError::Validation(format!("通知 {} はありません", position)))?;
            state.notifications.dismiss(notification.id);
            Ok(String::new())
        }
        Command::ClearNotifications => {
            state.notifications.clear();
            Ok(String::new())
        }
        Command::Help => Ok(view::help()),
        Command::Quit => Ok(String::new()),
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

struct Args {
    positional: Vec<String>,
    options: HashMap<String, String>,
}

impl Args {
    fn new<'a>(words: impl Iterator<Item = &'a str>) -> Self {
        let mut positional = Vec::new();
        let mut options = HashMap::new();

        for word in words {
            match word.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    options.insert(key.to_lowercase(), value.to_string());
                }
                _ => positional.push(word.to_string()),
            }
        }

        Self {
            positional,
            options,
        }
    }

    fn option(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    fn flag(&self, flag: &str) -> bool {
        self.positional.iter().any(|w| w == flag)
    }

    /// Positional words, flags excluded
    fn words(&self) -> Vec<String> {
        self.positional
            .iter()
            .filter(|w| !w.starts_with("--"))
            .cloned()
            .collect()
    }

    /// Every word from `index` on, joined by single spaces
    fn rest(&self, index: usize, usage_text: &str) -> Result<String> {
        let words = self.words();
        if words.len() <= index {
            return Err(usage(usage_text));
        }
        Ok(words[index..].join(" "))
    }

    fn required(&self, index: usize, usage_text: &str) -> Result<String> {
        self.words()
            .get(index)
            .cloned()
            .ok_or_else(|| usage(usage_text))
    }

    fn id(&self, index: usize) -> Result<i64> {
        let raw = self.required(index, "<コマンド> <ID>")?;
        raw.parse::<i64>()
            .map_err(|_| AppError::Validation(format!("ID は整数で指定してください: {}", raw)))
    }
}

fn usage(text: &str) -> AppError {
    AppError::Validation(format!("使い方: {}", text))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| AppError::Validation(format!("{} は数値で指定してください: {}", key, value)))
}

/// Build a registration form from `key=value` fields
fn registration_form(fields: &[(String, String)]) -> Result<RegistrationForm> {
    let mut form = RegistrationForm::default();

    for (key, value) in fields {
        match key.as_str() {
            "symbol" => form.symbol = value.clone(),
            "name" => form.name = value.clone(),
            "sector" => form.sector = Some(value.clone()),
            "market" => form.market = Some(value.clone()),
            "price" => form.price = Some(parse_number(key, value)?),
            "price_date" => form.price_date = Some(value.clone()),
            "volume" => form.volume = Some(parse_number(key, value)?),
            "pbr" => form.pbr = Some(parse_number(key, value)?),
            "per" => form.per = Some(parse_number(key, value)?),
            "equity_ratio" => form.equity_ratio_pct = Some(parse_number(key, value)?),
            "roe" => form.roe_pct = Some(parse_number(key, value)?),
            "roa" => form.roa_pct = Some(parse_number(key, value)?),
            "report_date" => form.report_date = Some(value.clone()),
            other => {
                return Err(AppError::Validation(format!("不明な項目です: {}", other)));
            }
        }
    }

    Ok(form)
}
