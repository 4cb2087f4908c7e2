//! Line decoders: one text line from the serial link in, one reading out.
//!
//! The three decoders differ in strictness on purpose. Temperature firmware
//! has shipped several output formats, so [`TemperatureDecoder`] walks an
//! ordered list of [`TemperatureStrategy`] candidates. Angle and frequency
//! lines carry a fixed tag and anything that does not match it exactly is
//! dropped.
//!
//! A line that yields no reading is `None`, never an error.

/// Degree-Celsius marker emitted by the temperature firmware.
pub const CELSIUS_MARKER: &str = "°C";

/// Tag that prefixes every servo angle line.
pub const ANGLE_TAG: &str = "ANGLE:";

/// Keyword that precedes a frequency reading.
pub const FREQUENCY_KEYWORD: &str = "Frequency:";

/// Highest servo angle accepted, in degrees.
pub const MAX_ANGLE: u8 = 180;

/// Converts a trimmed text line into a typed reading.
pub trait LineDecoder {
    type Output: Copy + std::fmt::Debug;

    /// `None` means the line carries no reading and should be skipped.
    fn decode(&self, line: &str) -> Option<Self::Output>;

    /// The reading as stored in a series. Precision past 2^53 is lost here,
    /// not in `decode`.
    fn to_value(reading: Self::Output) -> f64;
}

// ---------------- Temperature ----------------

/// Candidate parsing strategies for temperature lines, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureStrategy {
    /// `"Temp: 23.5°C"`: number taken from the text before the marker
    MarkerDelimited,
    /// `"23.5"`: the whole line is a number
    PureNumeric,
    /// `"t=23.5 ok"`: first signed decimal found anywhere in the line
    EmbeddedNumber,
}

impl TemperatureStrategy {
    pub const PRIORITY: [TemperatureStrategy; 3] = [
        TemperatureStrategy::MarkerDelimited,
        TemperatureStrategy::PureNumeric,
        TemperatureStrategy::EmbeddedNumber,
    ];

    pub fn apply(self, line: &str) -> Option<f64> {
        match self {
            TemperatureStrategy::MarkerDelimited => marker_delimited(line),
            TemperatureStrategy::PureNumeric => pure_numeric(line),
            TemperatureStrategy::EmbeddedNumber => embedded_number(line),
        }
    }
}

impl std::fmt::Display for TemperatureStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemperatureStrategy::MarkerDelimited => write!(f, "marker-delimited"),
            TemperatureStrategy::PureNumeric => write!(f, "pure-numeric"),
            TemperatureStrategy::EmbeddedNumber => write!(f, "embedded-number"),
        }
    }
}

fn marker_delimited(line: &str) -> Option<f64> {
    let idx = line.find(CELSIUS_MARKER)?;

    // keep digits and dots; a minus only counts before the first kept char
    let mut number = String::new();
    for c in line[..idx].chars() {
        if c.is_ascii_digit() || c == '.' || (c == '-' && number.is_empty()) {
            number.push(c);
        }
    }
    if number.is_empty() {
        return None;
    }
    number.parse().ok()
}

fn pure_numeric(line: &str) -> Option<f64> {
    let only_numeric = line.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if !only_numeric || !line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    line.parse().ok()
}

/// First match of `-?\d+(\.\d+)?`.
fn embedded_number(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let first_digit = bytes.iter().position(u8::is_ascii_digit)?;

    let start = if first_digit > 0 && bytes[first_digit - 1] == b'-' {
        first_digit - 1
    } else {
        first_digit
    };

    let mut end = first_digit;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    line[start..end].parse().ok()
}

/// Tolerant temperature decoder, in degrees Celsius.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureDecoder;

impl TemperatureDecoder {
    /// Like [`LineDecoder::decode`], also reporting which strategy matched.
    pub fn decode_with_strategy(&self, line: &str) -> Option<(f64, TemperatureStrategy)> {
        let line = line.trim();
        TemperatureStrategy::PRIORITY
            .iter()
            .find_map(|s| s.apply(line).map(|v| (v, *s)))
    }
}

impl LineDecoder for TemperatureDecoder {
    type Output = f64;

    fn decode(&self, line: &str) -> Option<f64> {
        self.decode_with_strategy(line).map(|(v, _)| v)
    }

    fn to_value(reading: f64) -> f64 {
        reading
    }
}

// ---------------- Servo angle ----------------

/// Strict `ANGLE:<0-180>` decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngleDecoder;

impl LineDecoder for AngleDecoder {
    type Output = u8;

    fn decode(&self, line: &str) -> Option<u8> {
        let digits = line.trim().strip_prefix(ANGLE_TAG)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // overflow means out of range too
        let angle: u16 = digits.parse().ok()?;
        if angle > MAX_ANGLE as u16 {
            return None;
        }
        Some(angle as u8)
    }

    fn to_value(reading: u8) -> f64 {
        f64::from(reading)
    }
}

// ---------------- Frequency ----------------

/// Finds `Frequency:<ws>*<integer><ws>*Hz` anywhere in the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyDecoder;

impl LineDecoder for FrequencyDecoder {
    type Output = u64;

    fn decode(&self, line: &str) -> Option<u64> {
        line.match_indices(FREQUENCY_KEYWORD).find_map(|(idx, _)| {
            let rest = line[idx + FREQUENCY_KEYWORD.len()..].trim_start();
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len == 0 {
                return None;
            }
            let (digits, tail) = rest.split_at(digits_len);
            if !tail.trim_start().starts_with("Hz") {
                return None;
            }
            digits.parse().ok()
        })
    }

    fn to_value(reading: u64) -> f64 {
        reading as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn marker_lines_decode_to_their_value() {
        for (line, want) in [("23.5°C", 23.5), ("-1.0°C", -1.0), ("Temp: 21.25 °C", 21.25), ("0°C", 0.0)] {
            let got = TemperatureDecoder.decode(line).unwrap();
            assert!(close(got, want), "{line}: {got} != {want}");
        }
    }

    #[test]
    fn marker_strategy_ignores_text_after_the_marker() {
        let (v, s) = TemperatureDecoder.decode_with_strategy("T=19.5°C (ch 2)").unwrap();
        assert!(close(v, 19.5));
        assert_eq!(s, TemperatureStrategy::MarkerDelimited);
    }

    #[test]
    fn marker_strategy_keeps_only_a_leading_minus() {
        assert_eq!(TemperatureStrategy::MarkerDelimited.apply("a-b-3.5°C"), Some(-3.5));
        assert_eq!(TemperatureStrategy::MarkerDelimited.apply("°C"), None);
        assert_eq!(TemperatureStrategy::MarkerDelimited.apply("23.5"), None);
    }

    #[test]
    fn pure_numeric_lines() {
        let (v, s) = TemperatureDecoder.decode_with_strategy("24.1").unwrap();
        assert!(close(v, 24.1));
        assert_eq!(s, TemperatureStrategy::PureNumeric);
        assert_eq!(TemperatureStrategy::PureNumeric.apply("-7"), Some(-7.0));
        assert_eq!(TemperatureStrategy::PureNumeric.apply("-."), None);
        assert_eq!(TemperatureStrategy::PureNumeric.apply("12a"), None);
    }

    #[test]
    fn embedded_number_takes_the_first_match() {
        assert_eq!(TemperatureStrategy::EmbeddedNumber.apply("t=22.75 avg=30"), Some(22.75));
        assert_eq!(TemperatureStrategy::EmbeddedNumber.apply("delta -4.5 K"), Some(-4.5));
        assert_eq!(TemperatureStrategy::EmbeddedNumber.apply("x-y 12."), Some(12.0));
        assert_eq!(TemperatureStrategy::EmbeddedNumber.apply("no digits"), None);
    }

    #[test]
    fn malformed_numbers_fall_through_to_later_strategies() {
        let (v, s) = TemperatureDecoder.decode_with_strategy("1.2.3").unwrap();
        assert!(close(v, 1.2));
        assert_eq!(s, TemperatureStrategy::EmbeddedNumber);
    }

    #[test]
    fn lines_without_digits_decode_to_nothing() {
        for line in ["", "garbage", "°C", "ANGLE:", "Frequency: Hz", "--- . ---"] {
            assert_eq!(TemperatureDecoder.decode(line), None, "{line}");
            assert_eq!(AngleDecoder.decode(line), None, "{line}");
            assert_eq!(FrequencyDecoder.decode(line), None, "{line}");
        }
    }

    #[test]
    fn angle_accepts_the_full_range() {
        for n in 0..=180u8 {
            assert_eq!(AngleDecoder.decode(&format!("ANGLE:{n}")), Some(n));
        }
    }

    #[test]
    fn angle_rejects_out_of_range_and_junk() {
        for line in ["ANGLE:181", "ANGLE:999999", "ANGLE:-5", "ANGLE:90.5", "ANGLE:90x", "angle:90", "X ANGLE:90", "ANGLE: 90"] {
            assert_eq!(AngleDecoder.decode(line), None, "{line}");
        }
    }

    #[test]
    fn frequency_is_found_inside_the_line() {
        assert_eq!(FrequencyDecoder.decode("Frequency: 1000 Hz"), Some(1000));
        assert_eq!(FrequencyDecoder.decode("CH1 Frequency:50Hz"), Some(50));
        assert_eq!(FrequencyDecoder.decode("Frequency:   0   Hz, duty 50%"), Some(0));
    }

    #[test]
    fn frequency_requires_keyword_and_unit() {
        assert_eq!(FrequencyDecoder.decode("frequency: 10 Hz"), None);
        assert_eq!(FrequencyDecoder.decode("Frequency: 10 kHz"), None);
        assert_eq!(FrequencyDecoder.decode("Frequency: -10 Hz"), None);
        assert_eq!(FrequencyDecoder.decode("Frequency: 10"), None);
    }

    #[test]
    fn frequency_skips_a_bad_first_occurrence() {
        assert_eq!(FrequencyDecoder.decode("Frequency: n/a Frequency: 42 Hz"), Some(42));
    }

    #[test]
    fn frequency_above_32_bits_is_kept_exactly() {
        assert_eq!(FrequencyDecoder.decode("Frequency: 5000000000 Hz"), Some(5_000_000_000));
        let line = format!("Frequency: {} Hz", u32::MAX as u64 + 1);
        assert_eq!(FrequencyDecoder.decode(&line), Some(4_294_967_296));
        assert_eq!(FrequencyDecoder::to_value(5_000_000_000), 5.0e9);
    }

    #[test]
    fn frequency_at_the_64_bit_limit() {
        let max = format!("Frequency: {} Hz", u64::MAX);
        assert_eq!(FrequencyDecoder.decode(&max), Some(u64::MAX));
        // one past u64::MAX has no representation
        assert_eq!(FrequencyDecoder.decode("Frequency: 18446744073709551616 Hz"), None);
    }
}
