// Terminal output for classification results.
//
// Lines are written to a caller-supplied writer, one per URL, as soon as
// each URL is classified. Color is opt-in so the same functions render
// plain text for pipes and tests.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use indicatif::ProgressBar;

use crate::pipeline::{Classification, Label, Pipeline};

/// Width of the `=` banner framing a report.
pub const BANNER_WIDTH: usize = 70;

pub fn banner() -> String {
    "=".repeat(BANNER_WIDTH)
}

/// The plain-text marker leading each result line.
pub fn marker(label: Label) -> &'static str {
    match label {
        Label::Phishing => "⚠️  PHISHING",
        Label::Benign => "✅ BENIGN",
    }
}

fn colorize_marker(label: Label) -> colored::ColoredString {
    match label {
        Label::Phishing => marker(label).red().bold(),
        Label::Benign => marker(label).green(),
    }
}

/// Format one result: `<marker> | Score: <score> | <url>`, score to 4 places.
pub fn format_line(result: &Classification, color: bool) -> String {
    let marker = if color {
        colorize_marker(result.label).to_string()
    } else {
        marker(result.label).to_string()
    };
    format!("{marker} | Score: {:.4} | {}", result.score, result.url)
}

/// Banner, title, banner.
pub fn write_header<W: Write>(out: &mut W, title: &str, color: bool) -> Result<()> {
    let title = if color {
        title.bold().to_string()
    } else {
        title.to_string()
    };
    writeln!(out, "{}", banner())?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", banner())?;
    Ok(())
}

pub fn write_footer<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", banner())?;
    Ok(())
}

/// Classify each URL in order, writing its line before moving to the next.
///
/// `progress` is advanced once per URL; pass `ProgressBar::hidden()` when no
/// bar is wanted. Lines are written with the bar suspended so they are never
/// interleaved with its redraws. The first classification error stops the run.
pub fn write_results<W: Write, S: AsRef<str>>(
    out: &mut W,
    pipeline: &Pipeline,
    urls: &[S],
    color: bool,
    progress: &ProgressBar,
) -> Result<Vec<Classification>> {
    let mut results = Vec::with_capacity(urls.len());

    for url in urls {
        let result = pipeline.classify(url.as_ref())?;
        let line = format_line(&result, color);
        progress.suspend(|| -> Result<()> {
            writeln!(out, "{line}")?;
            out.flush()?;
            Ok(())
        })?;
        progress.inc(1);
        results.push(result);
    }

    Ok(results)
}

/// The full framed report: header, one line per URL, closing banner.
pub fn write_report<W: Write, S: AsRef<str>>(
    out: &mut W,
    pipeline: &Pipeline,
    title: &str,
    urls: &[S],
    color: bool,
) -> Result<Vec<Classification>> {
    write_header(out, title, color)?;
    let results = write_results(out, pipeline, urls, color, &ProgressBar::hidden())?;
    write_footer(out)?;
    Ok(results)
}

/// Print one extracted feature vector as aligned `name value` rows.
pub fn write_features<W: Write>(
    out: &mut W,
    url: &str,
    features: &crate::features::traits::FeatureVector,
) -> Result<()> {
    writeln!(out, "Features for {}", super::truncate_chars(url, 60))?;
    for (name, value) in features.iter() {
        writeln!(out, "  {name:<22} {value:>10.4}")?;
    }
    Ok(())
}
