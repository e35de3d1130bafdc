//! Table and summary rendering.
//!
//! Everything renders into memory first; files are written only once the
//! whole output exists, so a failed run never leaves a partial table.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use trial_randomise::assembler::RandomisationTable;
use trial_randomise::summary::RunSummary;

use crate::Result;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Table output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Box-drawn text table
    Table,
}

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Pretty-printed JSON
    Json,
    /// Box-drawn text tables
    Table,
}

/// Render the table in `format`
pub fn render(table: &RandomisationTable, format: OutputFormat, bom: bool) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => render_csv(table, bom),
        OutputFormat::Json => render_json(table),
        OutputFormat::Table => Ok(render_text(table).into_bytes()),
    }
}

/// CSV with a header row; absent labels are empty fields
pub fn render_csv(table: &RandomisationTable, bom: bool) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if bom {
        buffer.extend_from_slice(UTF8_BOM);
    }

    let mut writer = csv::Writer::from_writer(buffer);
    writer.write_record(table.header())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// JSON array, one object per record in column order
pub fn render_json(table: &RandomisationTable) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(table.records())?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Box-drawn text table
pub fn render_text(table: &RandomisationTable) -> String {
    let header = table.header();
    let rows: Vec<Vec<&str>> = table.rows().collect();
    boxed(&header, &rows)
}

/// Render the run summary in `format`
pub fn render_summary(summary: &RunSummary, format: SummaryFormat) -> Result<String> {
    match format {
        SummaryFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        SummaryFormat::Table => Ok(summary_text(summary)),
    }
}

fn summary_text(summary: &RunSummary) -> String {
    let mut out = format!(
        "Seed {} | {} participants | block size {} | buffer {} | {} shuffles\n\n",
        summary.seed, summary.total_participants, summary.block_size, summary.buffer, summary.shuffles
    );

    let arms: Vec<&str> = summary
        .strata
        .first()
        .map(|s| s.arm_counts.iter().map(|c| c.arm.as_str()).collect())
        .unwrap_or_default();
    let mut header = vec!["Stratum", "Target"];
    header.extend(arms.iter().copied());

    let strata: Vec<Vec<String>> = summary
        .strata
        .iter()
        .map(|s| {
            let mut row = vec![s.key.to_string(), s.target.to_string()];
            row.extend(s.arm_counts.iter().map(|c| c.count.to_string()));
            row
        })
        .collect();
    out.push_str(&boxed(&header, &strata));

    let pools: Vec<Vec<String>> = summary
        .pools
        .iter()
        .map(|p| {
            vec![
                p.scope.to_string(),
                p.arm.clone(),
                p.participants.to_string(),
                p.consumption.to_string(),
                p.generated.to_string(),
                p.consumed.to_string(),
                p.remaining.to_string(),
            ]
        })
        .collect();
    out.push('\n');
    out.push_str(&boxed(
        &["Pool", "Arm", "Participants", "Units", "Generated", "Consumed", "Remaining"],
        &pools,
    ));

    out.push('\n');
    for total in summary.labels_per_arm() {
        out.push_str(&format!("Labels generated for {}: {}\n", total.arm, total.count));
    }
    out
}

fn boxed<H, C>(header: &[H], rows: &[Vec<C>]) -> String
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    let mut widths: Vec<usize> = header.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.as_ref().chars().count());
        }
    }

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(mid), right)
    };
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!(" {}{} ", cell, " ".repeat(pad))
            })
            .collect();
        format!("│{}│\n", padded.join("│"))
    };

    let mut out = rule("┌", "┬", "┐");
    out.push_str(&line(header.iter().map(AsRef::as_ref).collect()));
    out.push_str(&rule("├", "┼", "┤"));
    for row in rows {
        out.push_str(&line(row.iter().map(AsRef::as_ref).collect()));
    }
    out.push_str(&rule("└", "┴", "┘"));
    out
}

/// Path of the summary written next to `output`
pub fn summary_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".summary.json");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_core::types::{ArmRatio, Dimension, IdFormat};
    use trial_randomise::prelude::*;

    fn outcome() -> RandomisationOutcome {
        let config = RandomisationConfig::builder()
            .total_participants(8)
            .ratio(ArmRatio::balanced(&["Tratamento", "Placebo"]).unwrap())
            .dimension(Dimension::new("gender", ["Masculino", "Feminino"]))
            .block_size(2)
            .consumption(ConsumptionRates::by_dimension(
                "gender",
                [("Masculino", 2), ("Feminino", 1)],
            ))
            .id_format(IdFormat::Padded {
                prefix: "R".to_string(),
                width: 3,
            })
            .seed(42)
            .build()
            .unwrap();
        RandomisationEngine::new(config).unwrap().run().unwrap()
    }

    #[test]
    fn test_csv_with_bom() {
        let outcome = outcome();
        let bytes = render_csv(outcome.table(), true).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("randomization_id,gender,assigned_arm,resource_label_1,resource_label_2")
        );
        assert_eq!(lines.count(), 8);
    }

    #[test]
    fn test_csv_keeps_empty_second_label() {
        let outcome = outcome();
        let bytes = render_csv(outcome.table(), false).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        for record in reader.records() {
            let record = record.unwrap();
            assert_eq!(record.len(), 5);
            if &record[1] == "Feminino" {
                assert_eq!(&record[4], "");
            } else {
                assert!(!record[4].is_empty());
            }
        }
    }

    #[test]
    fn test_json_records() {
        let outcome = outcome();
        let bytes = render_json(outcome.table()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let records = value.as_array().unwrap();

        assert_eq!(records.len(), 8);
        assert_eq!(records[0]["randomization_id"], "R001");
        assert_eq!(records[7]["gender"], "Feminino");
        assert_eq!(records[7]["resource_label_2"], "");
    }

    #[test]
    fn test_text_table_shape() {
        let outcome = outcome();
        let text = render_text(outcome.table());
        let lines: Vec<&str> = text.lines().collect();

        // top rule, header, separator, 8 rows, bottom rule
        assert_eq!(lines.len(), 12);
        assert!(lines[0].starts_with('┌'));
        assert!(lines[1].contains("randomization_id"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_summary_formats() {
        let outcome = outcome();
        let json = render_summary(outcome.summary(), SummaryFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["pools"].as_array().unwrap().len(), 2);

        let text = render_summary(outcome.summary(), SummaryFormat::Table).unwrap();
        assert!(text.contains("Seed 42"));
        assert!(text.contains("Labels generated for Tratamento"));
    }

    #[test]
    fn test_summary_path() {
        assert_eq!(
            summary_path(Path::new("out/table.csv")),
            PathBuf::from("out/table.csv.summary.json")
        );
    }
}
