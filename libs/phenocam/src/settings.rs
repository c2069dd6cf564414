//! Camera settings record
//!
//! `settings.txt` on the camera is line-oriented: each line holds one value
//! and its meaning is fixed by position. That layout is kept for
//! compatibility with cameras already in the field, but no code indexes it
//! by line number. [`SettingsField`] is the single schema table mapping
//! names to lines, and [`CameraSettings`] is the named record built from it.
//!
//! The last line carries a schema version; files written before the version
//! line existed are read as version 1.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SettingsError;
use crate::schedule::ScheduleWindow;
use crate::servers::Network;

/// Current settings schema version
pub const SETTINGS_VERSION: u32 = 1;

pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 22;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;

/// One line of `settings.txt`, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    SiteName,
    UtcOffset,
    Timezone,
    StartHour,
    EndHour,
    IntervalMinutes,
    RedGain,
    GreenGain,
    BlueGain,
    Brightness,
    Sharpness,
    Hue,
    Contrast,
    Saturation,
    Backlight,
    Network,
    FixedSchedule,
    Version,
}

impl SettingsField {
    /// Every field in file order
    pub const ALL: [SettingsField; 18] = [
        Self::SiteName,
        Self::UtcOffset,
        Self::Timezone,
        Self::StartHour,
        Self::EndHour,
        Self::IntervalMinutes,
        Self::RedGain,
        Self::GreenGain,
        Self::BlueGain,
        Self::Brightness,
        Self::Sharpness,
        Self::Hue,
        Self::Contrast,
        Self::Saturation,
        Self::Backlight,
        Self::Network,
        Self::FixedSchedule,
        Self::Version,
    ];

    /// 1-based line number of this field
    pub fn line(self) -> usize {
        Self::ALL
            .iter()
            .position(|f| *f == self)
            .map_or(0, |idx| idx + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SiteName => "site_name",
            Self::UtcOffset => "utc_offset",
            Self::Timezone => "timezone",
            Self::StartHour => "start_hour",
            Self::EndHour => "end_hour",
            Self::IntervalMinutes => "interval_minutes",
            Self::RedGain => "red_gain",
            Self::GreenGain => "green_gain",
            Self::BlueGain => "blue_gain",
            Self::Brightness => "brightness",
            Self::Sharpness => "sharpness",
            Self::Hue => "hue",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Backlight => "backlight",
            Self::Network => "network",
            Self::FixedSchedule => "fixed_schedule",
            Self::Version => "version",
        }
    }

    /// Fields that older files may omit, with the value to assume
    fn legacy_default(self) -> Option<&'static str> {
        match self {
            Self::FixedSchedule => Some("FALSE"),
            Self::Version => Some("1"),
            _ => None,
        }
    }
}

/// Offset from UTC in whole minutes, written like `+1`, `-5` or `+5:30`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset {
    minutes: i32,
}

impl UtcOffset {
    pub fn from_minutes(minutes: i32) -> Result<Self, SettingsError> {
        if !(-12 * 60..=14 * 60).contains(&minutes) {
            return Err(SettingsError::InvalidOffset(minutes.to_string()));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(self) -> i32 {
        self.minutes
    }

    /// Human-readable zone label, e.g. `UTC+1`
    pub fn timezone_label(self) -> String {
        if self.minutes == 0 {
            "UTC".to_string()
        } else {
            format!("UTC{self}")
        }
    }

    /// POSIX `TZ` string; POSIX counts hours west of Greenwich, so the sign flips
    pub fn posix_tz(self) -> String {
        if self.minutes == 0 {
            return "UTC0".to_string();
        }
        let inverted = Self {
            minutes: -self.minutes,
        };
        format!("UTC{inverted}")
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.unsigned_abs();
        let (hours, minutes) = (abs / 60, abs % 60);
        if minutes == 0 {
            write!(f, "{sign}{hours}")
        } else {
            write!(f, "{sign}{hours}:{minutes:02}")
        }
    }
}

impl FromStr for UtcOffset {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SettingsError::InvalidOffset(s.to_string());
        let trimmed = s.trim();
        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            Some(_) => (1, trimmed),
            None => return Err(invalid()),
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(invalid());
        }
        Self::from_minutes(sign * (hours * 60 + minutes)).map_err(|_| invalid())
    }
}

/// Per-channel colour gains applied by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorGains {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Default for ColorGains {
    fn default() -> Self {
        Self {
            red: 300,
            green: 300,
            blue: 300,
        }
    }
}

/// Image adjustment sliders of the camera's admin page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAdjustments {
    pub brightness: u16,
    pub sharpness: u16,
    pub hue: u16,
    pub contrast: u16,
    pub saturation: u16,
    pub backlight: u16,
}

impl Default for ImageAdjustments {
    fn default() -> Self {
        Self {
            brightness: 128,
            sharpness: 128,
            hue: 128,
            contrast: 128,
            saturation: 100,
            backlight: 0,
        }
    }
}

/// Everything the camera needs to know about its site and schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub site_name: String,
    pub utc_offset: UtcOffset,
    pub start_hour: u8,
    pub end_hour: u8,
    pub interval_minutes: u8,
    pub gains: ColorGains,
    pub adjustments: ImageAdjustments,
    pub network: Network,
    pub fixed_schedule: bool,
}

impl CameraSettings {
    /// Build and validate settings from operator input
    pub fn new(
        site_name: &str,
        utc_offset: UtcOffset,
        start_hour: u32,
        end_hour: u32,
        interval_minutes: u32,
        network: Network,
        fixed_schedule: bool,
    ) -> Result<Self, SettingsError> {
        validate_site_name(site_name)?;
        let window = ScheduleWindow::new(start_hour, end_hour, interval_minutes)?;
        Ok(Self {
            site_name: site_name.to_string(),
            utc_offset,
            start_hour: window.start_hour(),
            end_hour: window.end_hour(),
            interval_minutes: window.interval(),
            gains: ColorGains::default(),
            adjustments: ImageAdjustments::default(),
            network,
            fixed_schedule,
        })
    }

    /// Validated capture window
    pub fn window(&self) -> Result<ScheduleWindow, SettingsError> {
        Ok(ScheduleWindow::new(
            u32::from(self.start_hour),
            u32::from(self.end_hour),
            u32::from(self.interval_minutes),
        )?)
    }

    pub fn timezone_label(&self) -> String {
        self.utc_offset.timezone_label()
    }

    /// Value of one field as written to `settings.txt`
    pub fn value(&self, field: SettingsField) -> String {
        match field {
            SettingsField::SiteName => self.site_name.clone(),
            SettingsField::UtcOffset => self.utc_offset.to_string(),
            SettingsField::Timezone => self.timezone_label(),
            SettingsField::StartHour => self.start_hour.to_string(),
            SettingsField::EndHour => self.end_hour.to_string(),
            SettingsField::IntervalMinutes => self.interval_minutes.to_string(),
            SettingsField::RedGain => self.gains.red.to_string(),
            SettingsField::GreenGain => self.gains.green.to_string(),
            SettingsField::BlueGain => self.gains.blue.to_string(),
            SettingsField::Brightness => self.adjustments.brightness.to_string(),
            SettingsField::Sharpness => self.adjustments.sharpness.to_string(),
            SettingsField::Hue => self.adjustments.hue.to_string(),
            SettingsField::Contrast => self.adjustments.contrast.to_string(),
            SettingsField::Saturation => self.adjustments.saturation.to_string(),
            SettingsField::Backlight => self.adjustments.backlight.to_string(),
            SettingsField::Network => self.network.to_string(),
            SettingsField::FixedSchedule => String::from(if self.fixed_schedule {
                "TRUE"
            } else {
                "FALSE"
            }),
            SettingsField::Version => SETTINGS_VERSION.to_string(),
        }
    }

    /// Render `settings.txt`, one field per line in schema order
    pub fn to_file_contents(&self) -> String {
        SettingsField::ALL
            .iter()
            .map(|field| self.value(*field) + "\n")
            .collect()
    }

    /// Parse `settings.txt`
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let map = SettingsMap::parse(content)?;

        let version: u32 = map.parse_field(SettingsField::Version)?;
        if version > SETTINGS_VERSION {
            return Err(SettingsError::UnsupportedVersion(version));
        }

        let site_name = map.get(SettingsField::SiteName).to_string();
        validate_site_name(&site_name)?;

        let start_hour: u32 = map.parse_field(SettingsField::StartHour)?;
        let end_hour: u32 = map.parse_field(SettingsField::EndHour)?;
        let interval: u32 = map.parse_field(SettingsField::IntervalMinutes)?;
        let window = ScheduleWindow::new(start_hour, end_hour, interval)?;

        Ok(Self {
            site_name,
            utc_offset: map.get(SettingsField::UtcOffset).parse()?,
            start_hour: window.start_hour(),
            end_hour: window.end_hour(),
            interval_minutes: window.interval(),
            gains: ColorGains {
                red: map.parse_field(SettingsField::RedGain)?,
                green: map.parse_field(SettingsField::GreenGain)?,
                blue: map.parse_field(SettingsField::BlueGain)?,
            },
            adjustments: ImageAdjustments {
                brightness: map.parse_field(SettingsField::Brightness)?,
                sharpness: map.parse_field(SettingsField::Sharpness)?,
                hue: map.parse_field(SettingsField::Hue)?,
                contrast: map.parse_field(SettingsField::Contrast)?,
                saturation: map.parse_field(SettingsField::Saturation)?,
                backlight: map.parse_field(SettingsField::Backlight)?,
            },
            network: map.get(SettingsField::Network).parse()?,
            fixed_schedule: parse_flag(map.get(SettingsField::FixedSchedule)),
        })
    }
}

/// `settings.txt` viewed as a field → value map
struct SettingsMap<'a> {
    values: HashMap<SettingsField, &'a str>,
}

impl<'a> SettingsMap<'a> {
    fn parse(content: &'a str) -> Result<Self, SettingsError> {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        let mut values = HashMap::new();
        for field in SettingsField::ALL {
            let value = match lines.get(field.line() - 1) {
                Some(line) if !line.is_empty() => *line,
                _ => field
                    .legacy_default()
                    .ok_or(SettingsError::MissingField {
                        line: field.line(),
                        field: field.name(),
                    })?,
            };
            values.insert(field, value);
        }
        Ok(Self { values })
    }

    fn get(&self, field: SettingsField) -> &'a str {
        self.values.get(&field).copied().unwrap_or_default()
    }

    fn parse_field<T: FromStr>(&self, field: SettingsField) -> Result<T, SettingsError> {
        let raw = self.get(field);
        raw.parse().map_err(|_| SettingsError::InvalidValue {
            field: field.name(),
            value: raw.to_string(),
        })
    }
}

/// Interpret a `TRUE`/`FALSE` style flag; anything unrecognised is false
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// Site names end up in file names and remote paths
pub fn validate_site_name(name: &str) -> Result<(), SettingsError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SettingsError::InvalidSiteName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CameraSettings {
        CameraSettings::new(
            "mycam",
            "+1".parse().unwrap(),
            9,
            22,
            30,
            Network::Phenocam,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_field_lines_are_stable() {
        assert_eq!(SettingsField::SiteName.line(), 1);
        assert_eq!(SettingsField::UtcOffset.line(), 2);
        assert_eq!(SettingsField::Timezone.line(), 3);
        assert_eq!(SettingsField::StartHour.line(), 4);
        assert_eq!(SettingsField::EndHour.line(), 5);
        assert_eq!(SettingsField::IntervalMinutes.line(), 6);
        assert_eq!(SettingsField::Network.line(), 16);
        assert_eq!(SettingsField::Version.line(), 18);
    }

    #[test]
    fn test_file_layout_matches_install_scenario() {
        let content = sample().to_file_contents();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), SettingsField::ALL.len());
        assert_eq!(lines[0], "mycam");
        assert_eq!(lines[1], "+1");
        assert_eq!(lines[2], "UTC+1");
        assert_eq!(lines[3], "9");
        assert_eq!(lines[4], "22");
        assert_eq!(lines[5], "30");
        assert_eq!(lines[15], "phenocam");
    }

    #[test]
    fn test_round_trip_reproduces_operator_fields() {
        let settings = sample();
        let parsed = CameraSettings::parse(&settings.to_file_contents()).unwrap();
        assert_eq!(parsed, settings);
        assert_eq!(parsed.site_name, "mycam");
        assert_eq!(parsed.utc_offset.to_string(), "+1");
        assert_eq!(parsed.start_hour, 9);
        assert_eq!(parsed.end_hour, 22);
        assert_eq!(parsed.interval_minutes, 30);
    }

    #[test]
    fn test_legacy_file_without_trailing_fields() {
        let content = sample().to_file_contents();
        let legacy: String = content.lines().take(16).map(|l| format!("{l}\n")).collect();
        let parsed = CameraSettings::parse(&legacy).unwrap();
        assert!(!parsed.fixed_schedule);
    }

    #[test]
    fn test_missing_required_field() {
        let err = CameraSettings::parse("mycam\n+1\nUTC+1\n9\n").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::MissingField {
                line: 5,
                field: "end_hour"
            }
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut lines: Vec<String> = sample()
            .to_file_contents()
            .lines()
            .map(String::from)
            .collect();
        *lines.last_mut().unwrap() = "9".to_string();
        let err = CameraSettings::parse(&lines.join("\n")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedVersion(9)));
    }

    #[test]
    fn test_invalid_number_reports_field() {
        let content = sample().to_file_contents().replace("\n30\n", "\nthirty\n");
        let err = CameraSettings::parse(&content).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                field: "interval_minutes",
                ..
            }
        ));
    }

    #[test]
    fn test_utc_offset_parsing() {
        assert_eq!("+1".parse::<UtcOffset>().unwrap().minutes(), 60);
        assert_eq!("-5".parse::<UtcOffset>().unwrap().minutes(), -300);
        assert_eq!("+5:30".parse::<UtcOffset>().unwrap().minutes(), 330);
        assert_eq!("0".parse::<UtcOffset>().unwrap().minutes(), 0);
        assert!("+15".parse::<UtcOffset>().is_err());
        assert!("+1:75".parse::<UtcOffset>().is_err());
        assert!("abc".parse::<UtcOffset>().is_err());
        assert!("".parse::<UtcOffset>().is_err());
    }

    #[test]
    fn test_utc_offset_rejects_huge_hours() {
        for input in ["1073741825", "99999999", "-2147483647", "+35791395:00"] {
            assert!(
                matches!(
                    input.parse::<UtcOffset>(),
                    Err(SettingsError::InvalidOffset(_))
                ),
                "{input}"
            );
        }
        let content = sample()
            .to_file_contents()
            .replacen("\n+1\n", "\n1073741825\n", 1);
        assert!(CameraSettings::parse(&content).is_err());
    }

    #[test]
    fn test_utc_offset_labels() {
        let offset: UtcOffset = "-5".parse().unwrap();
        assert_eq!(offset.to_string(), "-5");
        assert_eq!(offset.timezone_label(), "UTC-5");
        assert_eq!(offset.posix_tz(), "UTC+5");
        let half: UtcOffset = "+5:30".parse().unwrap();
        assert_eq!(half.to_string(), "+5:30");
        assert_eq!(UtcOffset::from_minutes(0).unwrap().timezone_label(), "UTC");
    }

    #[test]
    fn test_site_name_validation() {
        assert!(validate_site_name("harvard_2").is_ok());
        assert!(validate_site_name("").is_err());
        assert!(validate_site_name("my cam").is_err());
        assert!(validate_site_name("../etc").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("FALSE"));
        assert!(!parse_flag(""));
    }
}
