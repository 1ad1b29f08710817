//! Plain-text cards for predictions, explanations and the loaded model.
//!
//! Every renderer returns a `String`; `main` decides whether it goes to
//! stdout or stderr.

use std::fmt::Write;

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use smartlend_core::{BorrowerRow, Explanation, Label, PredictionResult, credit};
use smartlend_model::{Pipeline, Tree, TreeExplainer};

const MAX_RESULT_ROWS: usize = 10;
const BAR_WIDTH: usize = 20;

/// Probability as a percentage with two decimals, e.g. `12.34%`.
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// First `rows` rows of the uploaded table.
pub fn render_preview(batch: &RecordBatch, rows: usize) -> Result<String, ArrowError> {
    let head = batch.slice(0, rows.min(batch.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

/// Summary of a scored table plus its first results.
pub fn render_results(results: &[PredictionResult]) -> String {
    let defaults = results
        .iter()
        .filter(|r| r.label == Label::WillDefault)
        .count();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scored {} rows: {} {}, {} {}",
        results.len(),
        defaults,
        Label::WillDefault.as_str(),
        results.len() - defaults,
        Label::NoDefault.as_str()
    );
    if results.is_empty() {
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<6} {:<20} {}",
        "row",
        credit::PREDICTION_COLUMN,
        credit::PROBABILITY_COLUMN
    );
    for (i, r) in results.iter().take(MAX_RESULT_ROWS).enumerate() {
        let _ = writeln!(
            out,
            "  {:<6} {:<20} {}",
            i,
            r.label.as_flag(),
            format_probability(r.probability)
        );
    }
    if results.len() > MAX_RESULT_ROWS {
        let _ = writeln!(out, "  ... and {} more", results.len() - MAX_RESULT_ROWS);
    }
    out
}

/// Card for one manually entered borrower.
pub fn render_prediction(row: &BorrowerRow, result: &PredictionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Prediction ===");
    let _ = writeln!(out, "  {:<38} {}", "Result", result.label.as_str());
    let _ = writeln!(
        out,
        "  {:<38} {}",
        "Risk probability",
        format_probability(result.probability)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Borrower");
    for (name, value) in credit::FEATURE_NAMES.iter().zip(row.values()) {
        let _ = writeln!(out, "  {name:<38} {value}");
    }
    out
}

/// Card for one explained row, contributions ranked by magnitude.
pub fn render_explanation(explanation: &Explanation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Row {} explanation ===", explanation.row);
    let _ = writeln!(out, "  {:<38} {:.4}", "Baseline", explanation.baseline);
    let _ = writeln!(out, "  {:<38} {:.4}", "Raw score", explanation.raw_score);
    let _ = writeln!(
        out,
        "  {:<38} {}",
        "Probability",
        format_probability(explanation.probability)
    );
    let _ = writeln!(out);

    let ranked = explanation.ranked();
    let max = ranked.first().map_or(0.0, |c| c.contribution.abs());

    let _ = writeln!(out, "Contributions (largest first)");
    for c in ranked {
        let _ = writeln!(
            out,
            "  {:<38} {:>10} {:>+9.4}  {}",
            c.feature,
            c.value,
            c.contribution,
            bar(c.contribution, max)
        );
    }
    out
}

/// Kind, structure and explanation capability of the loaded model.
pub fn render_model_info(pipeline: &Pipeline) -> String {
    let model = pipeline.model();
    let mut out = String::new();
    let _ = writeln!(out, "=== SmartLend model ===");
    let _ = writeln!(out, "  {:<26} {}", "Kind", model.kind());

    if let Some(ensemble) = model.tree_ensemble() {
        let depth = ensemble.trees.iter().map(Tree::depth).max().unwrap_or(0);
        let _ = writeln!(out, "  {:<26} {}", "Trees", ensemble.n_trees());
        let _ = writeln!(out, "  {:<26} {}", "Max depth", depth);
        let _ = writeln!(out, "  {:<26} {}", "Aggregation", ensemble.aggregation.as_str());
    }
    let _ = writeln!(out, "  {:<26} {}", "Output", model.transform().as_str());
    let _ = writeln!(out, "  {:<26} {}", "Decision threshold", model.threshold());

    let status = if !pipeline.supports_explanation() {
        "disabled".to_string()
    } else {
        match TreeExplainer::new(model) {
            Ok(explainer) => {
                let _ = writeln!(out, "  {:<26} {:.4}", "Baseline", explainer.baseline());
                "available".to_string()
            }
            Err(e) => format!("unsupported ({e})"),
        }
    };
    let _ = writeln!(out, "  {:<26} {}", "Explanations", status);
    let _ = writeln!(out);

    let _ = writeln!(out, "Features");
    for (i, name) in model.schema().names().iter().enumerate() {
        let _ = writeln!(out, "  {i:<3} {name}");
    }
    out
}

fn bar(contribution: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let n = ((contribution.abs() / max) * BAR_WIDTH as f64).round() as usize;
    let ch = if contribution >= 0.0 { '+' } else { '-' };
    std::iter::repeat_n(ch, n).collect()
}
