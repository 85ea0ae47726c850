//! Line-driven interactive session.
//!
//! Each stdin line is one command; the snapshot is printed after it settles.
//!
//! | Line | Action |
//! |------|--------|
//! | `type [text]` | Update the search box (debounced) |
//! | `pick <symbol>` | Add a symbol, labelled from search results when possible |
//! | `drop <symbol>` | Remove a symbol |
//! | `index [name]` | Select an index, or clear it |
//! | `normalize on\|off` | Toggle normalization |
//! | `range <start\|-> <end\|->` | Set the date range, `-` for open |
//! | `submit` or empty line | Generate the chart |
//! | `reset` | Restore defaults |
//! | `dismiss` | Close the notification |
//! | `show` | Print the snapshot |
//! | `help` | List commands |
//! | `quit` | Leave |

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use klinescope_core::{
    App, AppHandle, AppSnapshot, BootstrapPhase, DateRange, FigureFileSink, IndexName,
    MemorySink, RenderSink, RequestState, Symbol, SymbolId, UserAction,
};

use crate::cli::SessionArgs;
use crate::error::CliError;
use crate::output::{render, snapshot_json};

use super::Context;

const HELP: &str = "commands: type [text] | pick <symbol> | drop <symbol> | index [name] | \
normalize on|off | range <start|-> <end|-> | submit (or empty line) | reset | dismiss | show | quit";

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Type(String),
    Pick(SymbolId),
    Drop(SymbolId),
    Index(Option<IndexName>),
    Normalize(bool),
    Range(DateRange),
    Submit,
    Reset,
    Dismiss,
    Show,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<SessionCommand, CliError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "" | "submit" => SessionCommand::Submit,
        "type" => SessionCommand::Type(rest.to_owned()),
        "pick" => SessionCommand::Pick(SymbolId::parse(rest)?),
        "drop" => SessionCommand::Drop(SymbolId::parse(rest)?),
        "index" if rest.is_empty() => SessionCommand::Index(None),
        "index" => SessionCommand::Index(Some(IndexName::new(rest)?)),
        "normalize" => match rest {
            "on" | "true" | "1" => SessionCommand::Normalize(true),
            "off" | "false" | "0" => SessionCommand::Normalize(false),
            other => {
                return Err(CliError::Command(format!(
                    "normalize expects on|off, got '{other}'"
                )))
            }
        },
        "range" => {
            let mut bounds = rest.split_whitespace().map(|bound| match bound {
                "-" => None,
                date => Some(date),
            });
            let start = bounds.next().flatten();
            let end = bounds.next().flatten();
            SessionCommand::Range(DateRange::parse(start, end)?)
        }
        "reset" => SessionCommand::Reset,
        "dismiss" => SessionCommand::Dismiss,
        "show" => SessionCommand::Show,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(CliError::Command(format!("unknown command '{other}'"))),
    };
    Ok(command)
}

pub async fn run(args: &SessionArgs, context: &Context) -> Result<(), CliError> {
    let sink: Box<dyn RenderSink> = match &args.out {
        Some(path) => Box::new(FigureFileSink::new(path)),
        None => Box::new(MemorySink::new()),
    };
    let (app, handle) = App::new(context.config.clone(), context.backend.clone(), sink);
    let session = app.spawn();

    let ready = handle
        .wait_for(|snapshot| {
            matches!(snapshot.phase, BootstrapPhase::Ready | BootstrapPhase::Failed)
        })
        .await?;
    render(&snapshot_json(&ready), context.pretty)?;
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(error) => {
                eprintln!("error: {error}");
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        if command == SessionCommand::Help {
            eprintln!("{HELP}");
            continue;
        }

        let snapshot = apply(&handle, command, context).await?;
        render(&snapshot_json(&snapshot), context.pretty)?;
    }

    handle.shutdown()?;
    if let Err(error) = session.await {
        debug!(%error, "session task ended abnormally");
    }
    Ok(())
}

async fn apply(
    handle: &AppHandle,
    command: SessionCommand,
    context: &Context,
) -> Result<AppSnapshot, CliError> {
    match command {
        SessionCommand::Type(query) => {
            handle.dispatch(UserAction::QueryChanged(query.clone()))?;
            // Give the debounce and the lookup a chance to land.
            let budget = context.config.search_debounce + Duration::from_secs(5);
            let landed = tokio::time::timeout(
                budget,
                handle.wait_for(|snapshot| {
                    snapshot
                        .search
                        .as_ref()
                        .is_some_and(|results| results.query == query)
                }),
            )
            .await;
            match landed {
                Ok(snapshot) => return Ok(snapshot?),
                Err(_) => debug!("search did not settle in time"),
            }
        }
        SessionCommand::Pick(id) => {
            let current = handle.snapshot();
            let symbol = pick_symbol(&current, id);
            handle.dispatch(UserAction::AddSymbol(symbol))?;
        }
        SessionCommand::Drop(id) => handle.dispatch(UserAction::RemoveSymbol(id))?,
        SessionCommand::Index(index) => handle.dispatch(UserAction::SetIndex(index))?,
        SessionCommand::Normalize(normalize) => {
            handle.dispatch(UserAction::SetNormalize(normalize))?
        }
        SessionCommand::Range(range) => handle.dispatch(UserAction::SetDateRange(range))?,
        SessionCommand::Submit => {
            handle.dispatch(UserAction::Submit)?;
            let submitted = handle.sync().await?;
            if submitted.request_state == RequestState::Loading {
                return Ok(handle
                    .wait_for(|snapshot| snapshot.request_state != RequestState::Loading)
                    .await?);
            }
            return Ok(submitted);
        }
        SessionCommand::Reset => handle.dispatch(UserAction::Reset)?,
        SessionCommand::Dismiss => handle.dispatch(UserAction::Dismiss)?,
        SessionCommand::Show | SessionCommand::Help | SessionCommand::Quit => {}
    }
    Ok(handle.sync().await?)
}

/// Label a picked symbol from search results or the pool, falling back to its id.
fn pick_symbol(snapshot: &AppSnapshot, id: SymbolId) -> Symbol {
    let from_search = snapshot
        .search
        .as_ref()
        .and_then(|results| results.symbols.iter().find(|symbol| symbol.id == id));
    match from_search {
        Some(symbol) => symbol.clone(),
        None => {
            let label = snapshot
                .label_for(&id)
                .map_or_else(|| id.as_str().to_owned(), str::to_owned);
            Symbol::new(id, label)
        }
    }
}
