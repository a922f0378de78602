//! rekap CLI - Attendance Recap Export
//!
//! Fetches a class's attendance for a month or semester, pivots it against the
//! roster and writes a formatted `.xlsx` recap.

mod export;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rekap_core::{AcademicYear, Category, PeriodSelector, Pivot, RecapConfig, Semester};
use rekap_render::{Emitter, RecapMeta, TextEmitter};
use rekap_store::RecordFetcher;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::export::{build_recap, layout_for, open_source, ExportOutcome, ExportRequest, ExportSession};

#[derive(Parser)]
#[command(name = "rekap")]
#[command(author, version, about = "School attendance recap export", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Attendance source: a JSON dump (.json) or an SQLite database
    #[arg(short, long, value_name = "FILE", env = "REKAP_SOURCE")]
    source: PathBuf,

    /// Class to recap
    #[arg(short, long)]
    class: String,

    /// Configuration file (school name, class teachers, page size)
    #[arg(long, value_name = "FILE", env = "REKAP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory to write the workbook into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Class teacher name for the signature block
    #[arg(long)]
    teacher: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a monthly recap with one column per recorded day
    Monthly {
        #[command(flatten)]
        source: SourceArgs,

        /// Month to export
        #[arg(short, long, value_name = "YYYY-MM")]
        month: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Export a semester recap with totals and categories
    Semester {
        #[command(flatten)]
        source: SourceArgs,

        /// Academic year, e.g. 2024/2025
        #[arg(short, long)]
        academic_year: String,

        /// 1 (July - December) or 2 (January - June)
        #[arg(long)]
        semester: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Print per-student totals without writing a workbook
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, value_name = "YYYY-MM", conflicts_with_all = ["academic_year", "semester"])]
        month: Option<String>,

        #[arg(short, long, requires = "semester")]
        academic_year: Option<String>,

        #[arg(long, requires = "academic_year")]
        semester: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = SummaryFormat::Text)]
        format: SummaryFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "rekap failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the default level
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Monthly { source, month, out } => {
            let period = PeriodSelector::parse_month(&month)?;
            cmd_export(&source, &out, period)
        }
        Commands::Semester {
            source,
            academic_year,
            semester,
            out,
        } => {
            let period = semester_period(&academic_year, &semester)?;
            cmd_export(&source, &out, period)
        }
        Commands::Summary {
            source,
            month,
            academic_year,
            semester,
            format,
        } => {
            let period = match (month, academic_year, semester) {
                (Some(month), _, _) => PeriodSelector::parse_month(&month)?,
                (None, Some(year), Some(semester)) => semester_period(&year, &semester)?,
                _ => anyhow::bail!("summary needs --month or both --academic-year and --semester"),
            };
            cmd_summary(&source, period, format)
        }
    }
}

fn semester_period(academic_year: &str, semester: &str) -> Result<PeriodSelector> {
    Ok(PeriodSelector::semester(
        AcademicYear::parse(academic_year)?,
        Semester::parse(semester)?,
    ))
}

fn load_config(source: &SourceArgs) -> Result<RecapConfig> {
    match &source.config {
        Some(path) => Ok(RecapConfig::load(path)?),
        None => Ok(RecapConfig::default()),
    }
}

fn open_fetcher(source: &SourceArgs, config: &RecapConfig) -> Result<RecordFetcher<Box<dyn rekap_store::TableStore>>> {
    let store = open_source(&source.source)
        .with_context(|| format!("cannot open source {}", source.source.display()))?;
    Ok(RecordFetcher::new(store).page_size(config.store.page_size))
}

fn cmd_export(source: &SourceArgs, out: &OutputArgs, period: PeriodSelector) -> Result<()> {
    let config = load_config(source)?;
    let fetcher = open_fetcher(source, &config)?;
    let request = ExportRequest {
        class_id: source.class.clone(),
        period,
        output_dir: out.output.clone(),
        teacher: out.teacher.clone(),
    };

    match ExportSession::new().export(&fetcher, &config, &request)? {
        ExportOutcome::Saved { path, rows } => {
            println!("Saved {} ({} students)", path.display(), rows);
        }
        ExportOutcome::NoData => {
            println!(
                "No attendance data for class {} in {}",
                request.class_id,
                period.describe()
            );
        }
    }
    Ok(())
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Serialize)]
struct SummaryReport<'a> {
    class_id: &'a str,
    period: String,
    dates: usize,
    orphaned: usize,
    students: Vec<StudentSummary<'a>>,
}

#[derive(Serialize)]
struct StudentSummary<'a> {
    student_id: &'a str,
    student_name: &'a str,
    present: u32,
    sick: u32,
    excused: u32,
    absent: u32,
    total: u32,
    percentage: u8,
    category: Category,
}

fn summary_report<'a>(class_id: &'a str, period: &PeriodSelector, pivot: &'a Pivot) -> SummaryReport<'a> {
    SummaryReport {
        class_id,
        period: period.describe(),
        dates: pivot.dates.len(),
        orphaned: pivot.orphaned,
        students: pivot
            .rows
            .iter()
            .map(|row| StudentSummary {
                student_id: &row.student_id,
                student_name: &row.student_name,
                present: row.counts.present,
                sick: row.counts.sick,
                excused: row.counts.excused,
                absent: row.counts.absent,
                total: row.total,
                percentage: row.percentage,
                category: row.category(),
            })
            .collect(),
    }
}

fn cmd_summary(source: &SourceArgs, period: PeriodSelector, format: SummaryFormat) -> Result<()> {
    let config = load_config(source)?;
    let fetcher = open_fetcher(source, &config)?;

    let Some(pivot) = build_recap(&fetcher, &config, &source.class, &period)? else {
        match format {
            SummaryFormat::Text => println!(
                "No attendance data for class {} in {}",
                source.class,
                period.describe()
            ),
            SummaryFormat::Json => println!("null"),
        }
        return Ok(());
    };

    match format {
        SummaryFormat::Text => {
            let teacher = config.teacher_for(&source.class).unwrap_or_default();
            let meta = RecapMeta::new(config.school.name.clone(), source.class.clone(), teacher, period);
            let text = TextEmitter::new().omit_footer().emit(&layout_for(&pivot, &meta))?;
            print!("{text}");
        }
        SummaryFormat::Json => {
            let report = summary_report(&source.class, &period, &pivot);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
