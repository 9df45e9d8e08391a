//! `tabula` - inspect tabular data files from the terminal
//!
//! Filters, sorts and pages JSON table files with the same engine the
//! interactive views use, and prints pages as fixed-width text.

mod logging;
mod table_file;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::{Path, PathBuf};
use tabula_chart::{AxisParams, XyPlotParams, default_xy_columns, is_large_table, plan_request};
use tabula_core::EngineConfig;
use tabula_table::{
    FilterExpression, TableModel, TableRequest, apply_filter_sort_page, compute_page_info, to_ipac,
    to_text_view,
};

#[derive(Parser)]
#[command(name = "tabula", version, about = "Filter, sort and page tabular data files")]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "TABULA_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging plus a JSON log file in the data directory
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one page of a table
    View {
        file: PathBuf,
        /// Filter text, e.g. "mag < 5; name like 'Alp%'"
        #[arg(long)]
        filter: Option<String>,
        /// Sort text, e.g. "DESC,mag"
        #[arg(long)]
        sort: Option<String>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long)]
        page_size: Option<i64>,
        /// Comma separated columns to keep
        #[arg(long)]
        cols: Option<String>,
        /// Logical row to highlight; selects the page containing it
        #[arg(long, conflicts_with = "page")]
        highlight: Option<i64>,
        #[arg(long, value_enum, default_value_t = Format::Ipac)]
        format: Format,
    },
    /// List the columns of a table
    Columns { file: PathBuf },
    /// Check filter text, auto-correcting it against a table's columns when one is given
    Validate {
        filter: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show the request a scatter plot of the table would make
    Plan {
        file: PathBuf,
        #[arg(long, requires = "y")]
        x: Option<String>,
        #[arg(long, requires = "x")]
        y: Option<String>,
        /// Bin grid for decimation, e.g. "100,80"
        #[arg(long, value_delimiter = ',', num_args = 2)]
        nbins: Option<Vec<u32>>,
        #[arg(long, default_value = "1")]
        chart_id: String,
    },
    /// Print the effective engine configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Fixed-width text with column headers and metadata lines
    Ipac,
    /// Bordered view of the visible columns
    Text,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        logging::LoggingConfig::verbose()
    } else {
        logging::LoggingConfig::default()
    };
    let _guard = logging::init(logging_config)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::View {
            file,
            filter,
            sort,
            page,
            page_size,
            cols,
            highlight,
            format,
        } => {
            let table = table_file::load_table(&file)?;
            let page_size = page_size.unwrap_or(config.page_size);
            if page_size <= 0 {
                bail!("--page-size must be positive");
            }
            let mut request = TableRequest::new(table.tbl_id.clone())
                .with_filters(filter.unwrap_or_default())
                .with_sort(sort.unwrap_or_default())
                .with_page((page.max(1) - 1) * page_size, page_size);
            request.incl_cols = cols;
            request.highlighted_row = highlight;
            view(&table, &request, format, &config)
        }
        Command::Columns { file } => {
            let table = table_file::load_table(&file)?;
            println!("{}", columns_table(&table));
            Ok(())
        }
        Command::Validate { filter, file } => validate(&filter, file.as_deref()),
        Command::Plan {
            file,
            x,
            y,
            nbins,
            chart_id,
        } => {
            let table = table_file::load_table(&file)?;
            let mut params = match (x, y) {
                (Some(x), Some(y)) => XyPlotParams::new(AxisParams::new(x), AxisParams::new(y)),
                _ => default_xy_columns(&table)
                    .ok_or_else(|| anyhow!("Table has no numeric columns to plot"))?,
            };
            if let Some([x_bins, y_bins]) = nbins.as_deref() {
                params = params.with_nbins(*x_bins, *y_bins);
            }
            plan(&table, &params, &chart_id, &config)
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// `--config`, else `<config_dir>/tabula/config.toml` when it exists, else defaults
fn load_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    let default_path = dirs::config_dir().map(|dir| dir.join("tabula").join("config.toml"));
    match default_path {
        Some(path) if path.exists() => EngineConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        _ => Ok(EngineConfig::default()),
    }
}

fn view(
    table: &TableModel,
    request: &TableRequest,
    format: Format,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let page = apply_filter_sort_page(table, request, config)?;
    if let Some(error) = &page.error {
        bail!("{}: {}", error.message, error.reason);
    }

    let info = compute_page_info(&page, Some(request.page_size), config);
    tracing::info!(
        tbl_id = %page.tbl_id,
        total_rows = page.total_rows,
        page = info.current_page,
        "rendering page"
    );
    if page.total_rows == 0 {
        println!("{} ({})", page.title_or_default(), page.status().label());
        return Ok(());
    }
    println!(
        "{}: rows {}-{} of {} (page {}/{}, highlighted row {})",
        page.title_or_default(),
        page.page_start() + 1,
        page.page_start() + page.rows.len() as u64,
        info.total_rows,
        page.page_start() as i64 / info.page_size + 1,
        info.total_pages,
        info.highlighted_row,
    );
    match format {
        Format::Ipac => print!("{}", to_ipac(&page)),
        Format::Text => print!("{}", to_text_view(&page)),
    }
    Ok(())
}

fn columns_table(table: &TableModel) -> Table {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_header(vec!["name", "type", "units", "label", "visibility"]);
    for col in &table.columns {
        out.add_row(vec![
            col.name.clone(),
            col.col_type.label().to_string(),
            col.units.clone().unwrap_or_default(),
            col.label.clone().unwrap_or_default(),
            if col.is_visible() { "show" } else { "hidden" }.to_string(),
        ]);
    }
    out
}

fn validate(filter: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let (valid, message) = match file {
        Some(path) => {
            let table = table_file::load_table(path)?;
            let checked = FilterExpression::validator(filter, &table.columns);
            if checked.value != filter {
                println!("corrected: {}", checked.value);
            }
            (checked.valid, checked.message)
        }
        None => {
            let checked = FilterExpression::validate(filter);
            (checked.valid, checked.message)
        }
    };
    if !valid {
        bail!("Invalid filter: {message}");
    }
    println!("valid");
    Ok(())
}

fn plan(
    table: &TableModel,
    params: &XyPlotParams,
    chart_id: &str,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let is_large = is_large_table(table.total_rows, config);
    let request =
        plan_request(params, is_large, config).to_table_request(&table.request, chart_id, config);

    println!(
        "{} rows, {} request as {}",
        table.total_rows,
        if is_large { "decimated" } else { "raw" },
        request.tbl_id
    );
    let mut out = Table::new();
    out.load_preset(UTF8_FULL).set_header(vec!["param", "value"]);
    for (key, value) in &request.params {
        out.add_row(vec![key.as_str(), value.as_str()]);
    }
    println!("{out}");
    Ok(())
}
