//! dataprep CLI module
//!
//! Interactive cleaning session plus the `clean`, `info` and `convert` commands.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::io::{DataLoader, DataSaver, FileFormat};
use crate::preprocessing::{
    columns_of_kind, summarize, CleaningConfig, CleaningPipeline, CleaningReport, ColumnSummary,
    ColumnType, EncoderType, ImputeStrategy,
};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn print_summary(summary: &[ColumnSummary]) {
    println!(
        "  {:<20} {:<12} {:>7} {:>8} {:>11} {:>11} {:>11}  {}",
        muted("Column"),
        muted("Kind"),
        muted("Missing"),
        muted("Distinct"),
        muted("Mean"),
        muted("Min"),
        muted("Max"),
        muted("Mode"),
    );
    println!("  {}", dim(&"─".repeat(96)));

    for col in summary {
        let kind = match col.kind {
            ColumnType::Numeric => accent("numeric"),
            ColumnType::Categorical => "categorical".truecolor(200, 160, 255),
        };
        let missing = if col.missing > 0 {
            col.missing.to_string().yellow()
        } else {
            col.missing.to_string().normal()
        };
        let mode = col
            .mode
            .as_ref()
            .map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "  {:<20} {:<12} {:>7} {:>8} {:>11} {:>11} {:>11}  {}",
            col.name,
            kind,
            missing,
            col.distinct,
            fmt_stat(col.mean),
            fmt_stat(col.min),
            fmt_stat(col.max),
            mode,
        );
    }
}

fn print_report(report: &CleaningReport) {
    section("Result");
    println!("  {:<16} {}", muted("Rows"), report.table.height());
    println!("  {:<16} {}", muted("Columns"), report.table.width());
    println!("  {:<16} {}", muted("Rows dropped"), report.dropped_rows);
    if !report.dropped_columns.is_empty() {
        println!("  {:<16} {}", muted("Cols dropped"), report.dropped_columns.join(", "));
    }
    if !report.encoded_columns.is_empty() {
        println!("  {:<16} {}", muted("Encoded"), report.encoded_columns.join(", "));
    }
    println!("  {:<16} {:.3}s", muted("Time"), report.elapsed_secs);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "dataprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean tabular data: summarize, impute, encode and convert")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options for reading sources that need more than a path
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Table to read from SQLite sources
    #[arg(long)]
    pub table: Option<String>,

    /// Group to read from HDF5 sources
    #[arg(long)]
    pub key: Option<String>,

    /// Worksheet to read from Excel sources
    #[arg(long)]
    pub sheet: Option<String>,
}

impl SourceArgs {
    fn loader(&self) -> DataLoader {
        DataLoader::new()
            .with_table(self.table.clone())
            .with_key(self.key.clone())
            .with_sheet(self.sheet.clone())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Impute missing values, encode categorical columns and save
    Clean(CleanArgs),

    /// Show shape and per-column summary statistics
    Info {
        /// Input data file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Load a file and save it in another format
    Convert {
        /// Input data file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (1-8 or name: csv, excel, json, parquet, pickle, feather, stata, html)
        #[arg(short, long)]
        format: String,

        /// Output file name without extension
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Input data file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file name without extension
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (1-8 or name)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Numeric strategy (0=drop 1=mode 2=mean 3=zero 4=min 5=max)
    #[arg(long)]
    pub numeric_strategy: Option<String>,

    /// Categorical strategy (0=drop 1=mode)
    #[arg(long)]
    pub categorical_strategy: Option<String>,

    /// Comma-separated columns to drop before cleaning
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Default encoding for categorical columns (1=label 2=onehot)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Per-column encoding, e.g. `--encode city=label` (repeatable)
    #[arg(long = "encode", value_name = "COLUMN=ENCODING")]
    pub encode: Vec<String>,

    /// JSON cleaning configuration; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl CleanArgs {
    /// Merge the optional config file with the command line flags
    pub fn to_config(&self) -> anyhow::Result<CleaningConfig> {
        let mut config = match &self.config {
            Some(path) => CleaningConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CleaningConfig::default(),
        };

        if let Some(s) = &self.numeric_strategy {
            config.numeric_strategy = ImputeStrategy::from_selector(s)?;
        }
        if let Some(s) = &self.categorical_strategy {
            config.categorical_strategy = ImputeStrategy::from_selector(s)?;
        }
        if !self.drop_columns.is_empty() {
            config.drop_columns = self.drop_columns.clone();
        }
        if let Some(e) = &self.encoding {
            config.default_encoding = EncoderType::from_selector(e)?;
        }
        for item in &self.encode {
            let (column, encoding) = parse_encode_override(item)?;
            config.encodings.insert(column, encoding);
        }
        if let Some(f) = &self.format {
            config.output_format = Some(FileFormat::from_selector(f)?);
        }
        if let Some(o) = &self.output {
            config.output_name = Some(o.clone());
        }
        if self.source.table.is_some() {
            config.table = self.source.table.clone();
        }
        if self.source.key.is_some() {
            config.key = self.source.key.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse `column=encoding`
pub fn parse_encode_override(arg: &str) -> anyhow::Result<(String, EncoderType)> {
    let Some((column, encoding)) = arg.split_once('=') else {
        bail!("invalid --encode '{}', expected COLUMN=ENCODING", arg);
    };
    let column = column.trim();
    if column.is_empty() {
        bail!("invalid --encode '{}', column name is empty", arg);
    }
    Ok((column.to_string(), EncoderType::from_selector(encoding)?))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn load(loader: &DataLoader, path: &Path) -> anyhow::Result<DataFrame> {
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let df = loader.load(path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

fn save(df: &mut DataFrame, base: &str, format: FileFormat) -> anyhow::Result<PathBuf> {
    step_run(&format!("Saving as {}", format.label()));
    let path = DataSaver::save_with_base(df, base, format)?;
    step_done(&path.display().to_string());
    Ok(path)
}

pub fn cmd_clean(args: &CleanArgs) -> anyhow::Result<()> {
    section("Clean");

    let config = args.to_config()?;
    let Some(output) = config.output_name.clone() else {
        bail!("no output name given, pass -o/--output or set output_name in the config");
    };
    let format = config.output_format.unwrap_or(FileFormat::Csv);

    let loader = DataLoader::new()
        .with_table(config.table.clone())
        .with_key(config.key.clone())
        .with_sheet(args.source.sheet.clone());
    let df = load(&loader, &args.input)?;

    step_run("Cleaning");
    let mut report = CleaningPipeline::new(config)?.run(df)?;
    step_done(&format!("{:.3}s", report.elapsed_secs));

    section("Summary");
    print_summary(&report.summary);

    println!();
    save(&mut report.table, &output, format)?;
    print_report(&report);
    println!();
    Ok(())
}

pub fn cmd_info(input: &Path, source: &SourceArgs) -> anyhow::Result<()> {
    section("Data Info");

    let df = load(&source.loader(), input)?;

    println!();
    println!("  {:<12} {}", muted("File"), input.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    print_summary(&summarize(&df));
    println!();
    Ok(())
}

pub fn cmd_convert(input: &Path, format: &str, output: &str, source: &SourceArgs) -> anyhow::Result<()> {
    section("Convert");

    let format = FileFormat::from_selector(format)?;
    let mut df = load(&source.loader(), input)?;
    save(&mut df, output, format)?;
    println!();
    Ok(())
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "┏┳┓┏━┓╺┳╸┏━┓┏━┓┏━┓┏━╸┏━┓".truecolor(120, 170, 255));
    println!("        {}", "┃┃┣━┫ ┃ ┣━┫┣━┛┣┳┛┣╸ ┣━┛".truecolor(100, 150, 240));
    println!("       {}", "╺┻┛╹ ╹ ╹ ╹ ╹╹  ╹┗╸┗━╸╹  ".truecolor(80, 130, 220));
    println!();
    println!("       {}", dim(&format!("Data cleaning  ·  v{}", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn theme() -> dialoguer::theme::ColorfulTheme {
    use dialoguer::console::{style, Style};

    dialoguer::theme::ColorfulTheme {
        active_item_prefix: style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().white().bold(),
        inactive_item_prefix: style("   ".to_string()).for_stderr(),
        inactive_item_style: Style::new().for_stderr().color256(245),
        prompt_prefix: style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: Style::new().for_stderr().white().bold(),
        ..dialoguer::theme::ColorfulTheme::default()
    }
}

fn select_strategy(
    theme: &dialoguer::theme::ColorfulTheme,
    prompt: &str,
    kind: ColumnType,
    default: ImputeStrategy,
) -> anyhow::Result<ImputeStrategy> {
    let allowed = ImputeStrategy::allowed_for(kind);
    let items: Vec<String> = allowed
        .iter()
        .map(|s| format!("{:<22}{}", s.label(), dim(&format!("[{}] {}", s.index(), s.name()))))
        .collect();
    let default_idx = allowed.iter().position(|s| *s == default).unwrap_or(0);

    let idx = dialoguer::Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&items[..])
        .default(default_idx)
        .interact()?;
    Ok(allowed[idx])
}

/// Prompt for the source, reading SQL sources from a named table
fn prompt_source(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<(PathBuf, DataFrame)> {
    use dialoguer::Input;

    let path: String = Input::with_theme(theme)
        .with_prompt("Path of the file to clean")
        .interact_text()?;
    let path = PathBuf::from(path.trim());

    let mut loader = DataLoader::new();
    match FileFormat::from_path(&path)? {
        FileFormat::Sql => {
            let table: String = Input::with_theme(theme)
                .with_prompt("Table name")
                .interact_text()?;
            loader = loader.with_table(Some(table.trim().to_string()));
        }
        FileFormat::Hdf5 => {
            let key: String = Input::with_theme(theme)
                .with_prompt("Group key")
                .default("/".to_string())
                .interact_text()?;
            loader = loader.with_key(Some(key.trim().to_string()));
        }
        _ => {}
    }

    let df = load(&loader, &path)?;
    Ok((path, df))
}

/// Split a comma separated answer into trimmed, non-empty column names
fn parse_column_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn cmd_interactive() -> anyhow::Result<()> {
    use dialoguer::{Input, Select};

    print_banner();
    let theme = theme();

    let (path, df) = prompt_source(&theme)?;

    section("Columns");
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    println!("  {}", names.join(", "));
    println!();

    let mut config = CleaningConfig::default();
    let answer: String = Input::with_theme(&theme)
        .with_prompt("Columns to drop (comma separated, empty for none)")
        .allow_empty(true)
        .interact_text()?;
    config.drop_columns = parse_column_list(&answer);

    // an unknown name ends the session
    let mut preview = df.clone();
    CleaningPipeline::new(config.clone())?.drop_columns(&mut preview)?;

    section("Summary");
    print_summary(&summarize(&preview));
    println!();

    config.numeric_strategy = select_strategy(
        &theme,
        "Missing numeric values",
        ColumnType::Numeric,
        ImputeStrategy::Mean,
    )?;
    config.categorical_strategy = select_strategy(
        &theme,
        "Missing categorical values",
        ColumnType::Categorical,
        ImputeStrategy::Mode,
    )?;

    let categorical = columns_of_kind(&preview, ColumnType::Categorical);
    if !categorical.is_empty() {
        section("Encoding");
        let options = [EncoderType::Label, EncoderType::OneHot];
        for column in &categorical {
            let idx = Select::with_theme(&theme)
                .with_prompt(format!("Encoding for '{}'", column))
                .items(&["Label encoding", "One-hot encoding"])
                .default(1)
                .interact()?;
            config.encodings.insert(column.clone(), options[idx].clone());
        }
    }

    section("Output");
    let formats: Vec<String> = FileFormat::SAVE_MENU
        .iter()
        .map(|f| format!("{:<10}{}", f.label(), dim(&format!(".{}", f.extension()))))
        .collect();
    let idx = Select::with_theme(&theme)
        .with_prompt("Save as")
        .items(&formats[..])
        .default(0)
        .interact()?;
    let format = FileFormat::SAVE_MENU[idx];

    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| format!("{}_clean", s))
        .unwrap_or_else(|| "output".to_string());
    let output: String = Input::with_theme(&theme)
        .with_prompt("Output file name (without extension)")
        .default(default_name)
        .interact_text()?;
    config.output_format = Some(format);
    config.output_name = Some(output.clone());

    println!();
    step_run("Cleaning");
    let mut report = CleaningPipeline::new(config)?.run(df)?;
    step_done(&format!("{:.3}s", report.elapsed_secs));

    let saved = save(&mut report.table, output.trim(), format)?;
    print_report(&report);
    println!();
    step_ok(&format!("Your file is ready: {}", saved.display()));
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataPrepError;
    use std::io::Write;

    fn clean_args(extra: &[&str]) -> CleanArgs {
        let mut argv = vec!["dataprep", "clean", "-i", "data.csv", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Clean(args)) => args,
            _ => panic!("expected clean command"),
        }
    }

    #[test]
    fn test_parse_encode_override() {
        let (column, encoding) = parse_encode_override("city=label").unwrap();
        assert_eq!(column, "city");
        assert_eq!(encoding, EncoderType::Label);

        assert!(parse_encode_override("city").is_err());
        assert!(parse_encode_override("=label").is_err());
        assert!(parse_encode_override("city=7").is_err());
    }

    #[test]
    fn test_clean_args_to_config() {
        let args = clean_args(&[
            "--numeric-strategy",
            "3",
            "--categorical-strategy",
            "drop",
            "--drop-columns",
            "a,b",
            "--encode",
            "city=label",
            "-f",
            "parquet",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.numeric_strategy, ImputeStrategy::Zero);
        assert_eq!(config.categorical_strategy, ImputeStrategy::Drop);
        assert_eq!(config.drop_columns, vec!["a", "b"]);
        assert_eq!(config.encoding_for("city"), &EncoderType::Label);
        assert_eq!(config.output_format, Some(FileFormat::Parquet));
        assert_eq!(config.output_name.as_deref(), Some("out"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"numeric_strategy": "max", "default_encoding": "label"}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = clean_args(&["--config", &path, "--numeric-strategy", "min"]);
        let config = args.to_config().unwrap();

        assert_eq!(config.numeric_strategy, ImputeStrategy::Min);
        assert_eq!(config.default_encoding, EncoderType::Label);
    }

    #[test]
    fn test_invalid_categorical_strategy_rejected() {
        let args = clean_args(&["--categorical-strategy", "mean"]);
        let err = args.to_config().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataPrepError>(),
            Some(DataPrepError::InvalidStrategy { kind, .. }) if kind == "categorical"
        ));
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(parse_column_list(" a, ,b ,"), vec!["a", "b"]);
        assert!(parse_column_list("").is_empty());
    }

    #[test]
    fn test_unknown_drop_column_is_an_error() {
        let df = df!("a" => &[1i64, 2]).unwrap();
        let config = CleaningConfig::new().with_drop_columns(parse_column_list("a, nope"));
        let mut preview = df.clone();
        let err = CleaningPipeline::new(config).unwrap().drop_columns(&mut preview).unwrap_err();
        assert!(matches!(err, DataPrepError::ColumnNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let args = clean_args(&["--numeric-strategy", "9"]);
        let err = args.to_config().unwrap_err();
        assert!(err.to_string().contains("Invalid strategy selector"));
    }
}
