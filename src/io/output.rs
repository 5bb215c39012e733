//! Report writers for front-end rendering.

use std::io::Write;

use crate::report::CleanupReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

pub trait OutputWriter {
    fn write_report(&mut self, report: &CleanupReport) -> anyhow::Result<()>;
}

pub fn create_writer<W: Write + 'static>(format: OutputFormat, writer: W) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(writer)),
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_report(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        self.write_header(report)?;
        self.write_summary(report)?;
        self.write_size_reduction(report)?;
        self.write_risks(report)?;
        self.write_recommendations(report)?;
        self.write_errors(report)?;
        Ok(())
    }
}

impl<W: Write> MarkdownWriter<W> {
    fn write_header(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Cleanup Report")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(self.writer, "Root: {}", report.root.display())?;
        if report.dry_run {
            writeln!(self.writer)?;
            writeln!(self.writer, "**Dry run** — no files were modified.")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_summary(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        let counts = &report.counts;
        writeln!(self.writer, "## Summary")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        writeln!(self.writer, "| Planned operations | {} |", report.planned_operations)?;
        writeln!(self.writer, "| Files deleted | {} |", counts.files_deleted)?;
        writeln!(self.writer, "| Imports removed | {} |", counts.imports_removed)?;
        writeln!(self.writer, "| Methods removed | {} |", counts.methods_removed)?;
        writeln!(self.writer, "| Variables removed | {} |", counts.variables_removed)?;
        writeln!(
            self.writer,
            "| Duplicates refactored | {} |",
            counts.duplicates_refactored
        )?;
        writeln!(
            self.writer,
            "| Components created | {} |",
            counts.components_created
        )?;
        writeln!(self.writer, "| Failed operations | {} |", counts.failed_operations)?;
        writeln!(
            self.writer,
            "| Success rate | {:.0}% |",
            report.success_rate() * 100.0
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_size_reduction(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        let Some(reduction) = &report.size_reduction else {
            return Ok(());
        };
        writeln!(self.writer, "## Size Reduction")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "- Lines: {} → {} ({:.1}% reduction)",
            reduction.before.total_lines,
            reduction.after.total_lines,
            reduction.line_reduction_percent
        )?;
        writeln!(
            self.writer,
            "- Bytes: {} → {} ({:.1}% reduction)",
            reduction.before.total_bytes,
            reduction.after.total_bytes,
            reduction.byte_reduction_percent
        )?;
        writeln!(self.writer, "- Files removed: {}", reduction.files_removed)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_risks(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        if report.risk_assessments.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Risk Assessments")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Type | Level | Score | Description |")?;
        writeln!(self.writer, "|------|-------|-------|-------------|")?;
        for risk in &report.risk_assessments {
            writeln!(
                self.writer,
                "| {} | {} | {:.0} | {} |",
                risk.risk_type,
                risk.level(),
                risk.score(),
                risk.description
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_recommendations(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        if report.recommendations.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Recommendations")?;
        writeln!(self.writer)?;
        for rec in &report.recommendations {
            let marker = if rec.is_urgent() { " (urgent)" } else { "" };
            writeln!(self.writer, "### {}{marker}", rec.title)?;
            writeln!(self.writer)?;
            writeln!(self.writer, "{}", rec.description)?;
            writeln!(self.writer)?;
            for item in &rec.action_items {
                writeln!(self.writer, "- {item}")?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_errors(&mut self, report: &CleanupReport) -> anyhow::Result<()> {
        if report.errors.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Errors")?;
        writeln!(self.writer)?;
        for error in &report.errors {
            writeln!(self.writer, "- {error}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oplog::LogStatistics;
    use crate::report::{ReportGenerator, ReportInput};
    use crate::risk::ExecutionCounts;
    use std::path::PathBuf;

    fn sample_report() -> CleanupReport {
        ReportGenerator::new().generate(ReportInput {
            root: PathBuf::from("/srv/app"),
            dry_run: true,
            counts: ExecutionCounts {
                files_deleted: 25,
                imports_removed: 4,
                ..ExecutionCounts::default()
            },
            planned_operations: 29,
            errors: vec!["app/Broken.php: parse error".to_string()],
            touched_files: Vec::new(),
            size_reduction: None,
            safety: None,
            post_validation: None,
            log_statistics: LogStatistics::default(),
        })
    }

    #[test]
    fn json_writer_emits_valid_json() {
        let mut buffer = Vec::new();
        JsonWriter::new(&mut buffer).write_report(&sample_report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["counts"]["files_deleted"], 25);
    }

    #[test]
    fn markdown_writer_covers_all_sections() {
        let mut buffer = Vec::new();
        MarkdownWriter::new(&mut buffer).write_report(&sample_report()).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("# Cleanup Report"));
        assert!(text.contains("**Dry run**"));
        assert!(text.contains("| Files deleted | 25 |"));
        assert!(text.contains("## Risk Assessments"));
        assert!(text.contains("file_deletion"));
        assert!(text.contains("## Errors"));
    }
}
