mod display;

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use clap::{ArgAction, Args, Parser, Subcommand};
use smartlend_core::borrower::{rows_from_json, to_record_batch};
use smartlend_core::format::strip_predictions;
use smartlend_core::table::{read_csv, write_csv};
use smartlend_core::{BorrowerRow, ErrorClass, PipelineError};
use smartlend_model::Pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "smartlend", version, about = "Loan-default risk scoring")]
struct Cli {
    /// Model artifact, loaded once at startup
    #[arg(
        long,
        global = true,
        env = "SMARTLEND_MODEL",
        default_value = "smartlend_model.json"
    )]
    model: PathBuf,

    /// Offer per-row explanations
    #[arg(
        long,
        global = true,
        env = "SMARTLEND_EXPLANATIONS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    explanations: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a table of borrowers (CSV, or JSON rows)
    Predict {
        /// Input file, or `-` for CSV on stdin
        input: PathBuf,

        /// Write the scored CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input rows to preview on stderr
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },

    /// Score one borrower entered field by field
    Score(BorrowerArgs),

    /// Explain one row of an input or scored table
    Explain {
        /// Input file, or `-` for CSV on stdin
        input: PathBuf,

        /// Zero-based data row to explain
        #[arg(long)]
        row: usize,

        /// Print the explanation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the loaded model
    Info,
}

/// The manual borrower form. Bounds follow the form's widgets.
#[derive(Args, Debug)]
struct BorrowerArgs {
    /// Age in years (18-100)
    #[arg(long, default_value_t = 18.0, value_parser = in_range(18.0, 100.0))]
    age: f64,

    /// Monthly income (>= 0)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, f64::MAX))]
    monthly_income: f64,

    /// Debt ratio (0-5)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, 5.0))]
    debt_ratio: f64,

    /// Number of dependents (>= 0)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, f64::MAX))]
    dependents: f64,

    /// Revolving utilization of unsecured lines (0-2)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, 2.0))]
    revolving_utilization: f64,

    /// Times 30-59 days late (0-10)
    #[arg(long = "late-30-59", default_value_t = 0.0, value_parser = in_range(0.0, 10.0))]
    late_30_59: f64,

    /// Times 60-89 days late (0-10)
    #[arg(long = "late-60-89", default_value_t = 0.0, value_parser = in_range(0.0, 10.0))]
    late_60_89: f64,

    /// Times 90 or more days late (0-10)
    #[arg(long = "late-90", default_value_t = 0.0, value_parser = in_range(0.0, 10.0))]
    late_90: f64,

    /// Open credit lines and loans (0-20)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, 20.0))]
    open_credit_lines: f64,

    /// Real estate loans or lines (0-10)
    #[arg(long, default_value_t = 0.0, value_parser = in_range(0.0, 10.0))]
    real_estate_loans: f64,

    /// Print the prediction as JSON (probability as a fraction)
    #[arg(long)]
    json: bool,
}

impl BorrowerArgs {
    fn to_row(&self) -> BorrowerRow {
        BorrowerRow {
            revolving_utilization: self.revolving_utilization,
            age: self.age,
            past_due_30_59: self.late_30_59,
            debt_ratio: self.debt_ratio,
            monthly_income: self.monthly_income,
            open_credit_lines: self.open_credit_lines,
            times_90_days_late: self.late_90,
            real_estate_loans: self.real_estate_loans,
            past_due_60_89: self.late_60_89,
            dependents: self.dependents,
        }
    }
}

fn in_range(min: f64, max: f64) -> impl Fn(&str) -> Result<f64, String> + Clone + Send + Sync {
    move |s: &str| {
        let value: f64 = s.trim().parse().map_err(|_| format!("`{s}` is not a number"))?;
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(value)
        } else if max == f64::MAX {
            Err(format!("must be at least {min}"))
        } else {
            Err(format!("must be between {min} and {max}"))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(&cli.model)?.with_explanations(cli.explanations);

    match cli.command {
        Command::Predict {
            input,
            output,
            preview,
        } => cmd_predict(&pipeline, &input, output.as_deref(), preview),
        Command::Score(args) => cmd_score(&pipeline, &args),
        Command::Explain { input, row, json } => cmd_explain(&pipeline, &input, row, json),
        Command::Info => {
            print!("{}", display::render_model_info(&pipeline));
            Ok(())
        }
    }
}

fn cmd_predict(
    pipeline: &Pipeline,
    input: &Path,
    output: Option<&Path>,
    preview: usize,
) -> anyhow::Result<()> {
    let batch = read_input(input)?;
    if preview > 0 {
        eprintln!("{}", display::render_preview(&batch, preview)?);
    }

    let scored = pipeline.score(&batch)?;
    eprint!("{}", display::render_results(&scored.results));

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_csv(&scored.output, BufWriter::new(file))?;
            info!(path = %path.display(), rows = scored.output.num_rows(), "wrote predictions");
        }
        None => write_csv(&scored.output, io::stdout().lock())?,
    }
    Ok(())
}

fn cmd_score(pipeline: &Pipeline, args: &BorrowerArgs) -> anyhow::Result<()> {
    let row = args.to_row();
    let scored = pipeline.score_rows(&[row])?;
    let result = scored
        .results
        .first()
        .context("model returned no prediction")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", display::render_prediction(&row, result));
    }
    Ok(())
}

fn cmd_explain(pipeline: &Pipeline, input: &Path, row: usize, json: bool) -> anyhow::Result<()> {
    let batch = strip_predictions(&read_input(input)?)?;
    let table = pipeline.validate(&batch)?;
    let explanation = pipeline.explain(&table, row)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
    } else {
        print!("{}", display::render_explanation(&explanation));
    }
    Ok(())
}

/// Read CSV from a file or stdin, or borrower rows from a `.json` file.
fn read_input(path: &Path) -> anyhow::Result<RecordBatch> {
    if path == Path::new("-") {
        return Ok(read_csv(io::stdin().lock())?);
    }

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let json: serde_json::Value = serde_json::from_reader(reader)
            .map_err(|e| PipelineError::MalformedTable(ArrowError::JsonError(e.to_string())))
            .with_context(|| format!("failed to parse borrower rows in {}", path.display()))?;
        let rows = rows_from_json(&json)?;
        return Ok(to_record_batch(&rows).map_err(PipelineError::from)?);
    }

    Ok(read_csv(reader)?)
}

/// Exit status by who has to act: 2 bad input, 1 scoring failure, 3 startup.
fn exit_code(err: &anyhow::Error) -> u8 {
    let class = err
        .chain()
        .find_map(|e| e.downcast_ref::<PipelineError>())
        .map(PipelineError::class);

    match class {
        Some(ErrorClass::Input) => 2,
        Some(ErrorClass::Startup) => 3,
        Some(ErrorClass::Scoring) | None => 1,
    }
}
