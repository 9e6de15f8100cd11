use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use xlsx_cursor::json_export::{self, WorkbookExport};
use xlsx_cursor::{
    ColumnDefinition, DecimalSeparator, NumberFormat, ReaderOptions, Workbook, WorksheetSelector,
    XlsxError, bind_columns, bind_columns_multi_row, header_definitions,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Excel file path
    #[arg(required = true)]
    file_path: PathBuf,

    /// Worksheet name or 1-based index
    #[arg(long, short = 's', default_value = "1")]
    sheet: String,

    /// JSON column layout (array of {caption, kind, skip, many_variant}); all
    /// header captions are read as text when omitted
    #[arg(long, short = 'l')]
    layout: Option<PathBuf>,

    /// 1-based row holding the header
    #[arg(long, default_value = "1")]
    header_row: usize,

    /// Number of header rows to search for captions
    #[arg(long, default_value = "1")]
    header_depth: usize,

    /// Column count to scan when the sheet declares fewer (or none)
    #[arg(long, short = 'm')]
    mismatch_columns: Option<usize>,

    /// Decimal separator of text numbers: 'dot' or 'comma'
    #[arg(long, default_value = "dot")]
    separator: DecimalSeparator,

    /// Rewrite the other separator before parsing numbers
    #[arg(long)]
    convert_separator: bool,

    /// Read non-date values in date columns as null instead of failing
    #[arg(long)]
    allow_non_date: bool,

    /// Write JSON to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print worksheet names and exit
    #[arg(long)]
    list_sheets: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_selector(sheet: &str) -> WorksheetSelector {
    match sheet.parse::<usize>() {
        Ok(index) => WorksheetSelector::Index(index),
        Err(_) => WorksheetSelector::Name(sheet.to_string()),
    }
}

fn load_layout(path: &Path) -> Result<Vec<ColumnDefinition>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout: {}", path.display()))?;
    let definitions: Vec<ColumnDefinition> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid layout: {}", path.display()))?;
    if definitions.is_empty() {
        anyhow::bail!("Layout {} defines no columns", path.display());
    }
    Ok(definitions)
}

// Every non-empty caption of the header row, read as text
fn header_layout(
    workbook: &mut Workbook,
    selector: WorksheetSelector,
    cli: &Cli,
) -> Result<Vec<ColumnDefinition>> {
    let mut cursor = workbook.open_worksheet(selector)?;
    if !cursor.move_to_next_rows(cli.header_row)? {
        anyhow::bail!("Sheet has no row {}", cli.header_row);
    }
    let definitions = header_definitions(&mut cursor, cli.mismatch_columns)?;
    if definitions.is_empty() {
        anyhow::bail!("Header row {} has no captions", cli.header_row);
    }
    Ok(definitions)
}

fn run(cli: &Cli) -> Result<()> {
    let mut workbook = Workbook::open(&cli.file_path)
        .with_context(|| format!("Unable to open workbook: {}", cli.file_path.display()))?;

    if cli.list_sheets {
        for name in workbook.sheet_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let selector = parse_selector(&cli.sheet);
    let mut definitions = match &cli.layout {
        Some(path) => load_layout(path)?,
        None => header_layout(&mut workbook, selector.clone(), cli)?,
    };
    let options = ReaderOptions {
        number_format: NumberFormat::new(cli.separator, cli.convert_separator),
        allow_non_date: cli.allow_non_date,
    };

    let mut cursor = workbook.open_worksheet(selector)?;
    if !cursor.move_to_next_rows(cli.header_row)? {
        anyhow::bail!("Sheet has no row {}", cli.header_row);
    }
    if cli.header_depth > 1 {
        bind_columns_multi_row(
            &mut cursor,
            &mut definitions,
            cli.header_depth,
            cli.mismatch_columns,
        )?;
    } else {
        bind_columns(&mut cursor, &mut definitions, cli.mismatch_columns)?;
    }

    let rows = json_export::export_rows(&mut cursor, &mut definitions, &options, cli.mismatch_columns)?;
    let mut export = WorkbookExport::with_capacity(1);
    export.insert(cursor.sheet_name().to_string(), rows);

    match &cli.output {
        Some(path) => json_export::write_json_to_file(&export, path)?,
        None => println!("{}", json_export::serialize_to_json(&export)?),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Err(err) = run(&cli) {
        if let Some(XlsxError::Binding(failure)) = err.downcast_ref::<XlsxError>() {
            eprintln!("{failure}");
            std::process::exit(2);
        }
        return Err(err);
    }

    Ok(())
}
