//! Reporting submission record
//!
//! The shape the test-management service expects for one run of one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{MeasuredValue, SequenceResult, StepRecord, SubUnit, UnitIdentity};

/// Which duration goes into a submitted step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationMode {
    /// Wall-clock time the step actually took
    Measured,
    /// The step's declared duration; simulated steps finish instantly
    #[default]
    Declared,
}

impl DurationMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "measured" => Some(DurationMode::Measured),
            "declared" | "expected" => Some(DurationMode::Declared),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitUnderTest {
    pub part_number: String,
    pub revision: String,
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
}

impl From<&UnitIdentity> for UnitUnderTest {
    fn from(identity: &UnitIdentity) -> Self {
        Self {
            part_number: identity.part_number.clone(),
            revision: identity.revision.clone(),
            serial_number: identity.serial_number.clone(),
            batch_number: identity.batch_number.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepSubmission {
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso_duration")]
    pub duration: Duration,
    pub step_passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_value: Option<MeasuredValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_high: Option<f64>,
}

impl StepSubmission {
    pub fn from_record(record: &StepRecord, mode: DurationMode) -> Self {
        let duration = match mode {
            DurationMode::Measured => record.duration,
            DurationMode::Declared => record.definition.expected_duration,
        };

        Self {
            name: record.definition.name.clone(),
            started_at: record.started_at,
            duration,
            step_passed: record.outcome.passed,
            measurement_unit: record.outcome.unit.clone(),
            measurement_value: record.outcome.measured_value.clone(),
            limit_low: record.outcome.limit_low,
            limit_high: record.outcome.limit_high,
        }
    }
}

/// One run of one unit as sent to the reporting service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSubmission {
    pub procedure_id: String,
    pub unit_under_test: UnitUnderTest,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_units: Vec<SubUnit>,
    pub run_passed: bool,
    pub steps: Vec<StepSubmission>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub report_variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PathBuf>,
}

impl RunSubmission {
    /// Package a finished run; step attachments are lifted to the run
    pub fn from_result(
        procedure_id: impl Into<String>,
        identity: &UnitIdentity,
        result: &SequenceResult,
        mode: DurationMode,
    ) -> Self {
        let mut attachments = Vec::new();
        for path in result.records().iter().filter_map(|r| r.outcome.attachment.as_ref()) {
            if !attachments.contains(path) {
                attachments.push(path.clone());
            }
        }

        Self {
            procedure_id: procedure_id.into(),
            unit_under_test: UnitUnderTest::from(identity),
            sub_units: identity.sub_units.clone(),
            run_passed: result.overall_passed(),
            steps: result
                .records()
                .iter()
                .map(|r| StepSubmission::from_record(r, mode))
                .collect(),
            report_variables: BTreeMap::new(),
            attachments,
        }
    }

    pub fn with_report_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.report_variables.extend(variables);
        self
    }

    pub fn with_attachments(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        for path in paths {
            if !self.attachments.contains(&path) {
                self.attachments.push(path);
            }
        }
        self
    }

    pub fn serial_number(&self) -> &str {
        &self.unit_under_test.serial_number
    }
}

/// ISO-8601 durations (`PT3S`, `PT1M12.5S`), microsecond resolution
pub mod iso_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn format(duration: &Duration) -> String {
        let micros = duration.subsec_micros();
        if micros == 0 {
            format!("PT{}S", duration.as_secs())
        } else if micros % 1000 == 0 {
            format!("PT{}.{:03}S", duration.as_secs(), micros / 1000)
        } else {
            format!("PT{}.{:06}S", duration.as_secs(), micros)
        }
    }

    pub fn parse(s: &str) -> Option<Duration> {
        let mut rest = s.strip_prefix("PT")?;
        if rest.is_empty() {
            return None;
        }

        let mut secs = 0f64;
        for (unit, factor) in [('H', 3600.0), ('M', 60.0), ('S', 1.0)] {
            if let Some(pos) = rest.find(unit) {
                let value: f64 = rest[..pos].parse().ok()?;
                if !value.is_finite() || value < 0.0 {
                    return None;
                }
                secs += value * factor;
                rest = &rest[pos + 1..];
            }
        }

        if !rest.is_empty() {
            return None;
        }

        let duration = Duration::try_from_secs_f64(secs).ok()?;
        let micros = (duration.as_nanos() + 500) / 1000;
        let secs = u64::try_from(micros / 1_000_000).ok()?;
        Some(Duration::new(secs, (micros % 1_000_000) as u32 * 1000))
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 duration: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbortPolicy, Limits, StepDefinition, StepOutcome};

    fn identity() -> UnitIdentity {
        UnitIdentity {
            part_number: "00109".to_string(),
            revision: "A".to_string(),
            batch_number: Some("1024".to_string()),
            serial_number: "00109A4J01234".to_string(),
            sub_units: Vec::new(),
        }
    }

    fn result() -> SequenceResult {
        let voltage = StepDefinition::numeric("voltage", "V", Limits::range(11.5, 12.5), 3);
        let outcome = voltage
            .kind
            .evaluate(crate::models::Reading::Number(12.1))
            .unwrap();
        SequenceResult::new(
            "motor",
            AbortPolicy::AbortOnFirstFailure,
            3,
            vec![
                StepRecord {
                    definition: StepDefinition::boolean("visual_inspection", 8),
                    outcome: StepOutcome::flag(true).with_attachment(Some("connector.png".into())),
                    started_at: Utc::now(),
                    duration: Duration::from_millis(2),
                },
                StepRecord {
                    definition: voltage,
                    outcome,
                    started_at: Utc::now(),
                    duration: Duration::from_millis(3),
                },
            ],
        )
    }

    #[test]
    fn test_submission_shape() {
        let submission =
            RunSubmission::from_result("FVT1", &identity(), &result(), DurationMode::Declared);
        let json = serde_json::to_value(&submission).unwrap();

        assert_eq!(json["procedure_id"], "FVT1");
        assert_eq!(json["unit_under_test"]["serial_number"], "00109A4J01234");
        assert_eq!(json["unit_under_test"]["batch_number"], "1024");
        assert_eq!(json["run_passed"], true);
        assert!(json.get("sub_units").is_none());
        assert!(json.get("report_variables").is_none());

        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["name"], "visual_inspection");
        assert_eq!(steps[0]["duration"], "PT8S");
        assert!(steps[0].get("measurement_value").is_none());
        assert_eq!(steps[1]["measurement_value"], 12.1);
        assert_eq!(steps[1]["measurement_unit"], "V");
        assert_eq!(steps[1]["limit_low"], 11.5);

        assert_eq!(json["attachments"][0], "connector.png");
    }

    #[test]
    fn test_measured_duration_mode() {
        let submission =
            RunSubmission::from_result("FVT1", &identity(), &result(), DurationMode::Measured);
        assert_eq!(submission.steps[1].duration, Duration::from_millis(3));
    }

    #[test]
    fn test_sub_units_and_variables() {
        let identity = identity().with_sub_units(vec![SubUnit::new("00375A4J34856")]);
        let mut variables = BTreeMap::new();
        variables.insert("report_date".to_string(), "18.10.2026".to_string());

        let submission = RunSubmission::from_result("FVT3", &identity, &result(), DurationMode::Declared)
            .with_report_variables(variables)
            .with_attachments(vec![PathBuf::from("connector.png"), PathBuf::from("extra.pdf")]);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["sub_units"][0]["serial_number"], "00375A4J34856");
        assert_eq!(json["report_variables"]["report_date"], "18.10.2026");
        assert_eq!(submission.attachments.len(), 2);
    }

    #[test]
    fn test_submission_json_is_readable_back() {
        let submission =
            RunSubmission::from_result("FVT1", &identity(), &result(), DurationMode::Declared);
        let json = serde_json::to_string(&submission).unwrap();
        let parsed: RunSubmission = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, submission);
    }

    #[test]
    fn test_measured_durations_survive_round_trip() {
        let record = StepRecord {
            definition: StepDefinition::boolean("power_on", 1),
            outcome: StepOutcome::flag(true),
            started_at: Utc::now(),
            duration: Duration::from_micros(250),
        };
        let result = SequenceResult::new("power", AbortPolicy::RunAll, 1, vec![record]);
        let submission =
            RunSubmission::from_result("FVT197", &identity(), &result, DurationMode::Measured);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["steps"][0]["duration"], "PT0.000250S");

        let parsed: RunSubmission = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.steps[0].duration, Duration::from_micros(250));
        assert_eq!(parsed, submission);
    }

    #[test]
    fn test_iso_duration_rejects_out_of_range_values() {
        assert_eq!(iso_duration::parse("PTinfS"), None);
        assert_eq!(iso_duration::parse("PTNaNS"), None);
        assert_eq!(iso_duration::parse("PT1e300S"), None);
        assert_eq!(iso_duration::parse("PT-1S"), None);

        let err = serde_json::from_str::<StepSubmission>(
            r#"{"name":"a","started_at":"2026-10-18T08:00:00Z","duration":"PTinfS","step_passed":true}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_iso_duration() {
        assert_eq!(iso_duration::format(&Duration::from_secs(15)), "PT15S");
        assert_eq!(iso_duration::format(&Duration::from_millis(1500)), "PT1.500S");
        assert_eq!(iso_duration::format(&Duration::from_micros(2_000_250)), "PT2.000250S");
        assert_eq!(iso_duration::parse("PT2.000250S"), Some(Duration::from_micros(2_000_250)));
        assert_eq!(iso_duration::parse("PT1M12.5S"), Some(Duration::from_millis(72_500)));
        assert_eq!(iso_duration::parse("PT2H"), Some(Duration::from_secs(7200)));
        assert_eq!(iso_duration::parse("PT"), None);
        assert_eq!(iso_duration::parse("P1D"), None);
        assert_eq!(iso_duration::parse("PT5X"), None);
    }
}
