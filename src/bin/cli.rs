//! Binary entry point for the viewgrid inspection CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use viewgrid::{
    fetch::FetchPlanner,
    filter::{
        build_initial_filter_state, merge_filter_state, parse_filter_form_state,
        serialize_filter_form_state_map, FilterState, StateMode,
    },
    graphql::{build_graphql_query_variables, generate_graphql_query},
    hasura::build_hasura_conditions,
    Capabilities, View,
};

use config::{CliConfig, Profile};
use ui::{Theme, Ui};

const DEFAULT_ROW_LIMIT: u64 = 50;

#[derive(Parser, Debug)]
#[command(
    name = "viewgrid",
    version,
    about = "Inspect view descriptors: filter state, conditions, queries and rows",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "CLI config file (defaults to $VIEWGRID_CONFIG, then the user config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Config profile supplying view, state and row limit")]
    profile: Option<String>,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Raise log verbosity (-v debug, -vv trace)"
    )]
    verbose: u8,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Theme::Auto,
        help = "Color theme for text output"
    )]
    theme: Theme,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ViewArg {
    #[arg(value_name = "VIEW", help = "View descriptor JSON (defaults to the profile's view)")]
    view: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StateArg {
    #[arg(long, value_name = "FILE", help = "Persisted filter state JSON")]
    state: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the initial filter state of a view.
    InitState {
        #[command(flatten)]
        view: ViewArg,
        #[arg(long, help = "Ignore declared initial values")]
        empty: bool,
    },
    /// Print the compiled boolean condition.
    Conditions {
        #[command(flatten)]
        view: ViewArg,
        #[command(flatten)]
        state: StateArg,
    },
    /// Print the GraphQL query document.
    Query {
        #[command(flatten)]
        view: ViewArg,
    },
    /// Print the query variables for one page.
    Variables {
        #[command(flatten)]
        view: ViewArg,
        #[command(flatten)]
        state: StateArg,
        #[arg(long, value_name = "N", help = "Rows per page")]
        row_limit: Option<u64>,
        #[arg(long, value_name = "JSON", help = "Pagination cursor as a JSON value")]
        cursor: Option<String>,
    },
    /// Merge suggested filter values into the current state.
    Merge {
        #[command(flatten)]
        view: ViewArg,
        #[arg(long, value_name = "FILE", help = "Suggested state JSON")]
        incoming: PathBuf,
        #[command(flatten)]
        state: StateArg,
    },
    /// Flatten a raw response into per-column cell data.
    Flatten {
        #[command(flatten)]
        view: ViewArg,
        #[arg(long, value_name = "FILE", help = "Raw GraphQL response JSON")]
        response: PathBuf,
        #[arg(long, value_name = "N", help = "Rows per page, for the next cursor")]
        row_limit: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("viewgrid=warn")),
        1 => EnvFilter::new("viewgrid=debug"),
        _ => EnvFilter::new("viewgrid=trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

/// Inputs shared by every command once flags, profile and config are merged.
struct Session<'a> {
    config: &'a CliConfig,
    profile: Option<&'a Profile>,
}

impl Session<'_> {
    fn view(&self, arg: &ViewArg) -> Result<View, Box<dyn Error>> {
        let path = arg
            .view
            .as_ref()
            .or_else(|| self.profile.and_then(|p| p.view.as_ref()))
            .ok_or("no view given; pass VIEW or select a profile with a view")?;
        debug!(path = %path.display(), "cli.view.load");
        let mut view = View::load(path)?;
        Capabilities::with_builtins().resolve_view(&mut view)?;
        Ok(view)
    }

    fn state(&self, arg: &StateArg, view: &View) -> Result<FilterState, Box<dyn Error>> {
        let path = arg
            .state
            .as_ref()
            .or_else(|| self.profile.and_then(|p| p.state.as_ref()));
        match path {
            Some(path) => Ok(parse_filter_form_state(&read_json(path)?, &view.filter_schema)?),
            None => Ok(build_initial_filter_state(
                &view.filter_schema,
                StateMode::WithInitialValues,
            )),
        }
    }

    fn row_limit(&self, arg: Option<u64>) -> u64 {
        arg.or_else(|| self.profile.and_then(|p| p.row_limit))
            .or_else(|| self.config.default_row_limit())
            .unwrap_or(DEFAULT_ROW_LIMIT)
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = CliConfig::load(cli.config.clone())?;
    if let Some(path) = config.path() {
        debug!(path = %path.display(), "cli.config.loaded");
    }
    let profile = config.select_profile(cli.profile.as_deref())?;
    if let Some(profile) = profile {
        debug!(profile = %profile.name, "cli.profile.selected");
    }
    let session = Session {
        config: &config,
        profile,
    };
    let ui = Ui::new(cli.theme);

    match &cli.command {
        Command::InitState { view, empty } => {
            let view = session.view(view)?;
            let mode = if *empty {
                StateMode::Empty
            } else {
                StateMode::WithInitialValues
            };
            let state = build_initial_filter_state(&view.filter_schema, mode);
            let value = serialize_filter_form_state_map(&state, &view.filter_schema)?;
            emit(cli.format, &value, || print_entries(&ui, "Filter state", &value))?;
        }
        Command::Conditions { view, state } => {
            let view = session.view(view)?;
            let state = session.state(state, &view)?;
            let condition = build_hasura_conditions(&state, &view.filter_schema)?;
            emit(cli.format, &condition, || {
                ui.block("Conditions", &pretty(&condition.to_json()))
            })?;
        }
        Command::Query { view } => {
            let view = session.view(view)?;
            let query = generate_graphql_query(&view);
            let value = json!({ "query": query });
            emit(cli.format, &value, || ui.block("Query", &query))?;
        }
        Command::Variables {
            view,
            state,
            row_limit,
            cursor,
        } => {
            let view = session.view(view)?;
            let state = session.state(state, &view)?;
            let cursor = cursor
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()?;
            let variables = build_graphql_query_variables(
                &view,
                &state,
                session.row_limit(*row_limit),
                cursor.as_ref(),
            )?;
            let value = serde_json::to_value(&variables)?;
            emit(cli.format, &value, || print_entries(&ui, "Variables", &value))?;
        }
        Command::Merge {
            view,
            incoming,
            state,
        } => {
            let view = session.view(view)?;
            let current = session.state(state, &view)?;
            let merged = merge_filter_state(&current, &read_json(incoming)?, &view.filter_schema);
            let value = serialize_filter_form_state_map(&merged, &view.filter_schema)?;
            emit(cli.format, &value, || print_entries(&ui, "Merged state", &value))?;
        }
        Command::Flatten {
            view,
            response,
            row_limit,
        } => {
            let view = session.view(view)?;
            let planner = FetchPlanner::new(&view, session.row_limit(*row_limit));
            let page = planner.page(&read_json(response)?);
            let value = json!({ "rows": page.rows, "nextCursor": page.next_cursor });
            emit(cli.format, &value, || {
                ui.list(
                    &format!("Rows ({})", page.rows.len()),
                    page.rows
                        .iter()
                        .map(|row| serde_json::to_string(row).unwrap_or_default()),
                );
                match &page.next_cursor {
                    Some(cursor) => ui.info(&format!("next cursor: {cursor}")),
                    None => ui.info("last page"),
                }
            })?;
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<Value, Box<dyn Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn print_entries(ui: &Ui, title: &str, value: &Value) {
    match value {
        Value::Object(map) => ui.section(
            title,
            map.iter().map(|(key, entry)| (key.as_str(), entry.to_string())),
        ),
        other => ui.block(title, &pretty(other)),
    }
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
