#![allow(clippy::format_push_string)]

use crate::diagnostics::RunDiagnostics;

pub struct DiagnosticsFormatter;

impl DiagnosticsFormatter {
    /// Renders run diagnostics as a plain-text block for the terminal.
    #[must_use]
    pub fn format(diagnostics: &RunDiagnostics) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                      RUN DIAGNOSTICS                          \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("Ingestion\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        for file in &diagnostics.files {
            output.push_str(&format!(
                "{:<28} read {:>8}  kept {:>8}  WLD {:>6}  padded {:>6}  anomalous {:>5}\n",
                file.source,
                file.rows_read,
                file.rows_kept,
                file.world_rows_dropped,
                file.codes_padded,
                file.anomalous_rows_dropped
            ));
        }
        output.push_str(&format!(
            "Total rows:            {} read, {} kept\n",
            diagnostics.total_rows_read(),
            diagnostics.total_rows_kept()
        ));
        output.push('\n');

        let counts = diagnostics.warning_counts();
        if !counts.is_empty() {
            output.push_str("Data Quality Warnings\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (kind, count) in counts {
                output.push_str(&format!("{:<36} {count}\n", format!("{kind:?}")));
            }
            output.push('\n');
        }

        if !diagnostics.joins.is_empty() {
            output.push_str("Reference Joins\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (name, stats) in &diagnostics.joins {
                output.push_str(&format!(
                    "{:<12} matched {}/{} ({:.1}%), unused reference rows {}\n",
                    name,
                    stats.matched_rows,
                    stats.primary_rows,
                    stats.match_rate() * 100.0,
                    stats.reference_rows_unused
                ));
            }
            output.push('\n');
        }

        let sample = &diagnostics.regression_sample;
        if sample.candidate_rows > 0 {
            output.push_str("Regression Sample\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!("Candidate rows:        {}\n", sample.candidate_rows));
            output.push_str(&format!("Missing GDP:           {}\n", sample.missing_gdp));
            output.push_str(&format!("Missing gravity:       {}\n", sample.missing_gravity));
            output.push_str(&format!("Usable rows:           {}\n", sample.usable_rows));
            output.push('\n');
        }

        if !diagnostics.skipped_models.is_empty() {
            output.push_str("Skipped Models\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for skipped in &diagnostics.skipped_models {
                output.push_str(&format!(
                    "{:<14} {:<18} {:<7} {}\n",
                    skipped.model,
                    skipped.dependent,
                    skipped.flow.as_str(),
                    skipped.reason
                ));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{LoadStats, MatchStats};

    #[test]
    fn test_format_includes_files_and_joins() {
        let mut diag = RunDiagnostics::new();
        diag.record_load(
            LoadStats {
                source: "ROM_2011.csv".to_string(),
                rows_read: 10,
                rows_kept: 9,
                world_rows_dropped: 1,
                ..LoadStats::default()
            },
            vec![],
        );
        diag.record_join(
            "gravity",
            MatchStats {
                primary_rows: 9,
                matched_rows: 9,
                ..MatchStats::default()
            },
        );

        let text = DiagnosticsFormatter::format(&diag);
        assert!(text.contains("ROM_2011.csv"));
        assert!(text.contains("matched 9/9 (100.0%)"));
        assert!(!text.contains("Regression Sample"));
    }

    #[test]
    fn test_format_lists_skipped_models() {
        let mut diag = RunDiagnostics::new();
        diag.record_skipped_model(crate::diagnostics::SkippedModel {
            model: "baseline".to_string(),
            dependent: "ln_trade_value".to_string(),
            flow: crate::table::TradeFlow::Export,
            reason: "baseline: 0 observations cannot identify 1 parameters".to_string(),
        });

        let text = DiagnosticsFormatter::format(&diag);
        assert!(text.contains("Skipped Models"));
        assert!(text.contains("ln_trade_value"));
        assert!(text.contains("Export"));
    }
}
