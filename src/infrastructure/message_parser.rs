// Classification and decoding of framed protocol lines
use crate::domain::telemetry::{SampleBatch, StatusMessage};
use crate::error::TelemetryError;

const ANALOG_BATCH_MARKER: &str = "\"type\":\"analog_values\"";
const STATUS_MARKER: &str = "\"status\"";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Samples(SampleBatch),
    Status(StatusMessage),
    /// A JSON object carrying neither known marker
    Unrecognized,
    /// Not a JSON object at all (boot banners, calibration printouts)
    Noise,
}

/// Classify one trimmed line. Decode failures come back as `ParseFailure`
/// for the caller to log and drop.
pub fn parse_line(line: &str) -> Result<InboundMessage, TelemetryError> {
    if !(line.starts_with('{') && line.ends_with('}')) {
        return Ok(InboundMessage::Noise);
    }

    if line.contains(ANALOG_BATCH_MARKER) {
        let batch = serde_json::from_str::<SampleBatch>(line)
            .map_err(|e| TelemetryError::ParseFailure(format!("analog batch: {}", e)))?;
        return Ok(InboundMessage::Samples(batch));
    }

    if line.contains(STATUS_MARKER) {
        let status = serde_json::from_str::<StatusMessage>(line)
            .map_err(|e| TelemetryError::ParseFailure(format!("status: {}", e)))?;
        return Ok(InboundMessage::Status(status));
    }

    Ok(InboundMessage::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::KeyReading;

    #[test]
    fn test_parse_analog_batch() {
        let line = r#"{"type":"analog_values","timestamp":42,"keys":[{"id":0,"ad":512,"pressed":true},{"id":3,"ad":7,"pressed":false}]}"#;
        let expected = SampleBatch::new(
            42,
            vec![KeyReading::new(0, 512, true), KeyReading::new(3, 7, false)],
        );
        assert_eq!(parse_line(line).unwrap(), InboundMessage::Samples(expected));
    }

    #[test]
    fn test_parse_empty_batch() {
        let line = r#"{"type":"analog_values","timestamp":9,"keys":[]}"#;
        match parse_line(line).unwrap() {
            InboundMessage::Samples(batch) => assert!(batch.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_line(r#"{"status":"started"}"#).unwrap(),
            InboundMessage::Status(StatusMessage::new("started"))
        );
    }

    #[test]
    fn test_noise_and_unrecognized() {
        assert_eq!(parse_line("ScanRate:").unwrap(), InboundMessage::Noise);
        assert_eq!(parse_line("(key:0)topDead_AD:412").unwrap(), InboundMessage::Noise);
        assert_eq!(parse_line(r#"{"hello":1}"#).unwrap(), InboundMessage::Unrecognized);
    }

    #[test]
    fn test_malformed_lines_are_parse_failures() {
        let truncated = r#"{"type":"analog_values","timestamp":1,"keys":[{"id":1,"ad":}]}"#;
        assert!(matches!(parse_line(truncated), Err(TelemetryError::ParseFailure(_))));

        let wrong_type = r#"{"status":12}"#;
        assert!(matches!(parse_line(wrong_type), Err(TelemetryError::ParseFailure(_))));
    }
}
