use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

use crate::license::{select_license_by_source, LicenseSource, PackageRecord, LICENSE_UNKNOWN};

/// Output style for the rendered license list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Markdown,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_label(label: &str) -> Option<OutputFormat> {
        match label.to_lowercase().as_str() {
            "plain" | "p" => Some(OutputFormat::Plain),
            "markdown" | "md" | "m" => Some(OutputFormat::Markdown),
            "json" | "j" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Column the rendered rows are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Count,
    License,
    Name,
    Author,
    Url,
}

impl OrderBy {
    pub fn from_label(label: &str) -> Option<OrderBy> {
        match label.to_lowercase().as_str() {
            "count" | "c" => Some(OrderBy::Count),
            "license" | "l" => Some(OrderBy::License),
            "name" | "n" => Some(OrderBy::Name),
            "author" | "a" => Some(OrderBy::Author),
            "url" | "u" => Some(OrderBy::Url),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderBy::Count => "count",
            OrderBy::License => "license",
            OrderBy::Name => "name",
            OrderBy::Author => "author",
            OrderBy::Url => "url",
        }
    }
}

/// Everything the renderers need to know about one invocation.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub source: LicenseSource,
    pub format: OutputFormat,
    pub order: OrderBy,
    pub summary: bool,
    pub with_authors: bool,
    pub with_urls: bool,
    pub with_description: bool,
    pub with_license_file: bool,
    pub no_license_path: bool,
    pub with_notice_file: bool,
    pub no_version: bool,
}

/// Columns for the current invocation, in display order.
pub fn output_fields(opts: &OutputOptions) -> Vec<&'static str> {
    if opts.summary {
        return vec!["Count", "License"];
    }

    let mut fields = vec!["Name"];
    if !opts.no_version {
        fields.push("Version");
    }

    if opts.source == LicenseSource::All {
        fields.push("License-Metadata");
        fields.push("License-Expression-Metadata");
        fields.push("License-Classifier");
    } else {
        fields.push("License");
    }

    if opts.with_authors {
        fields.push("Author");
    }
    if opts.with_urls {
        fields.push("URL");
    }
    if opts.with_description {
        fields.push("Description");
    }
    if opts.with_license_file {
        if !opts.no_license_path {
            fields.push("LicenseFile");
        }
        fields.push("LicenseText");
        if opts.with_notice_file {
            fields.push("NoticeText");
            if !opts.no_license_path {
                fields.push("NoticeFile");
            }
        }
    }

    fields
}

/// Column the rows are sorted by; falls back to Name when the requested
/// column is not part of the output.
pub fn sort_field(opts: &OutputOptions) -> &'static str {
    if opts.summary && opts.order == OrderBy::Count {
        "Count"
    } else if opts.summary || opts.order == OrderBy::License {
        "License"
    } else if opts.order == OrderBy::Author && opts.with_authors {
        "Author"
    } else if opts.order == OrderBy::Url && opts.with_urls {
        "URL"
    } else {
        "Name"
    }
}

fn display_license(record: &PackageRecord, source: LicenseSource) -> String {
    select_license_by_source(
        source,
        &record.license_classifiers,
        &record.license_meta,
        &record.license_expression,
    )
    .into_iter()
    .next()
    .unwrap_or_else(|| LICENSE_UNKNOWN.to_string())
}

fn build_row(record: &PackageRecord, fields: &[&'static str], source: LicenseSource) -> Vec<String> {
    fields
        .iter()
        .map(|field| match *field {
            "Name" => record.name.clone(),
            "Version" => record.version.clone(),
            "License" => display_license(record, source),
            "License-Metadata" => record.license_meta.clone(),
            "License-Expression-Metadata" => record.license_expression.clone(),
            "License-Classifier" => {
                if record.license_classifiers.is_empty() {
                    LICENSE_UNKNOWN.to_string()
                } else {
                    record.license_classifiers.join(", ")
                }
            }
            "Author" => record.author.clone(),
            "URL" => record.homepage.clone(),
            "Description" => record.description.clone(),
            "LicenseFile" => record.license_file.clone(),
            "LicenseText" => record.license_text.clone(),
            "NoticeFile" => record.notice_file.clone(),
            "NoticeText" => record.notice_text.clone(),
            _ => String::new(),
        })
        .collect()
}

/// Render the per-package license list in the configured format.
pub fn render_packages(records: &[PackageRecord], opts: &OutputOptions) -> String {
    let fields = output_fields(opts);
    let mut rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| build_row(record, &fields, opts.source))
        .collect();
    sort_rows(&mut rows, &fields, sort_field(opts));

    render_rows(&fields, &rows, opts.format)
}

/// Render the per-license summary (count of packages per canonical license).
pub fn render_summary(records: &[PackageRecord], opts: &OutputOptions) -> String {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        *counts.entry(display_license(record, opts.source)).or_insert(0) += 1;
    }

    let fields = vec!["Count", "License"];
    let mut rows: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(license, count)| vec![count.to_string(), license])
        .collect();
    sort_rows(&mut rows, &fields, sort_field(opts));

    render_rows(&fields, &rows, opts.format)
}

fn sort_rows(rows: &mut [Vec<String>], fields: &[&'static str], sort_by: &str) {
    let Some(index) = fields.iter().position(|f| *f == sort_by) else {
        return;
    };
    if sort_by == "Count" {
        // numeric column
        rows.sort_by_key(|row| row[index].parse::<usize>().unwrap_or(0));
    } else {
        rows.sort_by(|a, b| a[index].cmp(&b[index]));
    }
}

fn render_rows(fields: &[&'static str], rows: &[Vec<String>], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => render_plain(fields, rows),
        OutputFormat::Markdown => render_markdown(fields, rows),
        OutputFormat::Json => render_json(fields, rows),
        OutputFormat::Csv => render_csv(fields, rows),
    }
}

fn column_widths(fields: &[&'static str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = fields.iter().map(|f| f.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let cell_width = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            if cell_width > widths[i] {
                widths[i] = cell_width;
            }
        }
    }
    widths
}

fn render_plain(fields: &[&'static str], rows: &[Vec<String>]) -> String {
    let widths = column_widths(fields, rows);
    let mut output = String::new();

    let rule: String = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let format_line = |cells: &[String]| -> String {
        let mut line = String::from("|");
        for (i, cell) in cells.iter().enumerate() {
            // multi-line cells collapse to their first line in plain output
            let first = cell.lines().next().unwrap_or("");
            line.push_str(&format!(" {:<width$} |", first, width = widths[i]));
        }
        line.push('\n');
        line
    };

    output.push_str(&rule);
    output.push_str(&format_line(&fields.iter().map(|f| f.to_string()).collect::<Vec<_>>()));
    output.push_str(&rule);
    for row in rows {
        output.push_str(&format_line(row));
    }
    output.push_str(&rule);

    output
}

fn render_markdown(fields: &[&'static str], rows: &[Vec<String>]) -> String {
    let widths = column_widths(fields, rows);
    let mut output = String::new();

    let format_line = |cells: &[String]| -> String {
        let mut line = String::from("|");
        for (i, cell) in cells.iter().enumerate() {
            let first = cell.lines().next().unwrap_or("");
            line.push_str(&format!(" {:<width$} |", first, width = widths[i]));
        }
        line.push('\n');
        line
    };

    output.push_str(&format_line(&fields.iter().map(|f| f.to_string()).collect::<Vec<_>>()));
    let mut separator = String::from("|");
    for width in &widths {
        separator.push_str(&"-".repeat(width + 2));
        separator.push('|');
    }
    separator.push('\n');
    output.push_str(&separator);
    for row in rows {
        output.push_str(&format_line(row));
    }

    output
}

fn render_json(fields: &[&'static str], rows: &[Vec<String>]) -> String {
    let objects: Vec<IndexMap<&str, &str>> = rows
        .iter()
        .map(|row| fields.iter().copied().zip(row.iter().map(|s| s.as_str())).collect())
        .collect();
    serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
}

fn render_csv(fields: &[&'static str], rows: &[Vec<String>]) -> String {
    let quote = |cell: &str| format!("\"{}\"", cell.replace('"', "\"\""));
    let mut output = String::new();

    output.push_str(&fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(","));
    output.push('\n');
    for row in rows {
        output.push_str(&row.iter().map(|c| quote(c)).collect::<Vec<_>>().join(","));
        output.push('\n');
    }

    output
}

/// ANSI-colored text for terminal warnings.
pub fn output_colored(code: &str, text: &str, is_bold: bool) -> String {
    if is_bold {
        format!("\x1b[1;{}m{}\x1b[0m", code, text)
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

/// Advisory messages for option combinations that technically work but
/// produce awkward output.
pub fn create_warn_string(opts: &OutputOptions) -> String {
    let mut warn_messages = Vec::new();
    let warn = |text: &str| output_colored("33", text, false);

    if opts.with_license_file && opts.format != OutputFormat::Json {
        warn_messages.push(warn(
            "Due to the length of these fields, this option is best paired with --format=json.",
        ));
    }
    if opts.summary && (opts.with_authors || opts.with_urls) {
        warn_messages.push(warn(
            "When using this option, only --order=count or --order=license has an effect for the \
             --order option. And using --with-authors and --with-urls will be ignored.",
        ));
    }

    warn_messages.join("\n")
}

/// Write the rendered output to the requested file.
pub fn save_output(path: &Path, output: &str) -> Result<()> {
    fs::write(path, output).context("check path: --output-file")?;
    println!("created path: {}", path.display());
    Ok(())
}
