//! Output formatters for run results
//!
//! Provides table, JSON, CSV and one-line summary output.

use serde::Serialize;

use crate::executor::{Attempt, BatchSummary, Delivery, UnitReport};
use crate::fixtures::Fixture;
use crate::models::{StepKind, StepRecord};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn verdict(&self, passed: bool) -> String {
        if passed {
            self.paint("✓ PASS", "32")
        } else {
            self.paint("✗ FAIL", "31")
        }
    }

    fn rate(&self, rate: f64) -> String {
        let text = format!("{rate:5.1}%");
        if rate >= 90.0 {
            self.paint(&text, "32")
        } else if rate >= 50.0 {
            self.paint(&text, "33")
        } else {
            self.paint(&text, "31")
        }
    }

    fn json<T: Serialize>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    /// Format one executed step
    pub fn format_record(&self, record: &StepRecord) -> String {
        let status = if record.outcome.passed {
            self.paint(record.status_symbol(), "32")
        } else {
            self.paint(record.status_symbol(), "31")
        };

        let mut line = format!("{} {:45}", status, record.definition.name);
        if let Some(value) = &record.outcome.measured_value {
            line.push_str(&format!(" {value}"));
            if let Some(unit) = &record.outcome.unit {
                line.push_str(&format!(" {unit}"));
            }
        }
        if let StepKind::Numeric { limits, .. } = &record.definition.kind {
            line.push_str(&format!("  {limits}"));
        }
        if let Some(fault) = &record.outcome.fault {
            line.push_str(&format!("  ({})", self.paint(fault, "33")));
        }
        line
    }

    /// Format every attempt on one unit
    pub fn format_unit(&self, report: &UnitReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_unit_table(report),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(report),
            OutputFormat::Csv => csv_rows(std::slice::from_ref(report)).unwrap_or_default(),
            OutputFormat::Summary => self.format_unit_brief(report),
        }
    }

    fn format_unit_table(&self, report: &UnitReport) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!("║  {:60}║\n", report.identity.to_string()));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        for attempt in &report.attempts {
            output.push_str(&format!(
                " Attempt {} ({})\n",
                attempt.number, attempt.result.policy()
            ));
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            for record in attempt.result.records() {
                output.push_str(&format!("   {}\n", self.format_record(record)));
            }
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "   Executed {}/{} | {} | {}\n\n",
                attempt.result.len(),
                attempt.result.defined_steps(),
                self.verdict(attempt.result.overall_passed()),
                self.delivery(&attempt.delivery)
            ));
        }

        output
    }

    fn delivery(&self, delivery: &Delivery) -> String {
        match delivery {
            Delivery::Sent(receipt) => format!("reported as {}", receipt.id),
            Delivery::Queued { path: Some(path), .. } => {
                self.paint(&format!("queued in {}", path.display()), "33")
            }
            Delivery::Queued { error, path: None } => {
                self.paint(&format!("not reported: {error}"), "31")
            }
        }
    }

    fn format_unit_brief(&self, report: &UnitReport) -> String {
        let last = report.attempts.last();
        format!(
            "{} {} - {} attempt(s), {}/{} steps passed",
            if report.passed() { "✓" } else { "✗" },
            report.identity.serial_number,
            report.attempts.len(),
            last.map(|a| a.result.passed()).unwrap_or(0),
            last.map(|a| a.result.defined_steps()).unwrap_or(0),
        )
    }

    /// Format a whole batch
    pub fn format_batch(&self, reports: &[UnitReport], summary: &BatchSummary) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut output = String::new();
                for report in reports {
                    output.push_str(&self.format_unit_table(report));
                }
                output.push_str(&self.format_batch_table(summary));
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                #[derive(Serialize)]
                struct BatchJson<'a> {
                    summary: &'a BatchSummary,
                    first_pass_yield: f64,
                    final_yield: f64,
                    units: &'a [UnitReport],
                }

                self.json(&BatchJson {
                    summary,
                    first_pass_yield: summary.first_pass_yield(),
                    final_yield: summary.final_yield(),
                    units: reports,
                })
            }
            OutputFormat::Csv => csv_rows(reports).unwrap_or_default(),
            OutputFormat::Summary => {
                let mut output = String::new();
                for report in reports {
                    output.push_str(&self.format_unit_brief(report));
                    output.push('\n');
                }
                output.push_str(&self.format_batch_brief(summary));
                output.push('\n');
                output
            }
        }
    }

    fn format_batch_table(&self, summary: &BatchSummary) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Batch Results: {} / {} ({} units, {} attempts)\n",
            summary.fixture, summary.procedure_id, summary.units, summary.attempts
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " First Pass Yield: {}   Final Yield: {}\n",
            self.rate(summary.first_pass_yield()),
            self.rate(summary.final_yield())
        ));
        output.push_str(&format!(
            " Reporting failures: {}   Duration: {}ms\n\n",
            summary.reporting_failures, summary.duration_ms
        ));

        output.push_str(" Step Pass Rates:\n");
        output.push_str(" ───────────────────────────────────────────────────────────\n");
        for (name, stats) in &summary.step_stats {
            let rate = stats.pass_rate();
            let bar_len = ((rate / 5.0) as usize).min(20);
            output.push_str(&format!(
                " {:40} {}{} {} ({}/{})\n",
                name,
                "█".repeat(bar_len),
                "░".repeat(20 - bar_len),
                self.rate(rate),
                stats.passed,
                stats.executed
            ));
        }
        output.push_str(" ───────────────────────────────────────────────────────────\n");

        let weak: Vec<_> = summary
            .weakest_steps()
            .into_iter()
            .filter(|(_, rate)| *rate < 100.0)
            .take(5)
            .collect();
        if !weak.is_empty() {
            output.push_str("\n Weakest Steps (< 100% pass rate):\n");
            for (name, rate) in weak {
                output.push_str(&format!("   - {name} ({rate:.1}%)\n"));
            }
        }

        output
    }

    fn format_batch_brief(&self, summary: &BatchSummary) -> String {
        format!(
            "{} ({}): {}/{} passed first time ({:.1}% FPY), {}/{} in the end ({:.1}%), {} reporting failure(s) in {}ms",
            summary.fixture,
            summary.procedure_id,
            summary.first_pass,
            summary.units,
            summary.first_pass_yield(),
            summary.final_pass,
            summary.units,
            summary.final_yield(),
            summary.reporting_failures,
            summary.duration_ms
        )
    }

    /// Format the fixture catalog
    pub fn format_fixtures(&self, fixtures: &[Fixture], detailed: bool) -> String {
        let mut output = String::new();

        output.push_str("\nAvailable fixtures:\n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        for fixture in fixtures {
            output.push_str(&format!(
                " {:22} {:7} {}  {} steps, {}\n",
                fixture.name,
                fixture.procedure_id,
                fixture.template.prefix(),
                fixture.sequence.len(),
                fixture.sequence.policy()
            ));
            output.push_str(&format!("   {}\n", fixture.description));

            if detailed {
                output.push_str(&format!(
                    "   sub-units: {} | retries: {}",
                    fixture.sub_units, fixture.retry.max_retries
                ));
                if let Some(pool) = &fixture.produces {
                    output.push_str(&format!(" | produces into: {pool}"));
                }
                output.push('\n');
                for step in fixture.sequence.steps() {
                    output.push_str(&format!("     - {step}\n"));
                }
            }
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// One row per executed step of every attempt
fn csv_rows(reports: &[UnitReport]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "serial_number",
        "attempt",
        "step",
        "passed",
        "value",
        "unit",
        "limit_low",
        "limit_high",
        "fault",
    ])?;

    for report in reports {
        for attempt in &report.attempts {
            for record in attempt.result.records() {
                writer.write_record(csv_record(&report.identity.serial_number, attempt, record))?;
            }
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn csv_record(serial: &str, attempt: &Attempt, record: &StepRecord) -> [String; 9] {
    let outcome = &record.outcome;
    [
        serial.to_string(),
        attempt.number.to_string(),
        record.definition.name.clone(),
        outcome.passed.to_string(),
        outcome
            .measured_value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default(),
        outcome.unit.clone().unwrap_or_default(),
        outcome.limit_low.map(|l| l.to_string()).unwrap_or_default(),
        outcome.limit_high.map(|l| l.to_string()).unwrap_or_default(),
        outcome.fault.clone().unwrap_or_default(),
    ]
}
