//! Jittered cron schedule generation
//!
//! A camera captures every `interval` minutes between a start and end hour.
//! To keep a fleet of cameras on one network from uploading in the same
//! instant, the minute list is shifted by a per-install random offset (the
//! jitter). Cameras taking part in synchronized experiments use a fixed
//! schedule, which forces the jitter to zero.

use rand::Rng;

use crate::error::ScheduleError;
use crate::paths::AGENT_PATH;

/// Last minute of an hour; minute values never exceed it
const LAST_MINUTE: u32 = 59;

/// Daily IP-address report, agent subcommand appended
pub const IP_REPORT_CRON: &str = "59 11 * * *";

/// Daily maintenance reboot
pub const REBOOT_CRON_LINE: &str = "0 0 * * * /sbin/reboot";

/// Validated capture window and interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    start_hour: u8,
    end_hour: u8,
    interval: u8,
}

impl ScheduleWindow {
    pub fn new(start_hour: u32, end_hour: u32, interval: u32) -> Result<Self, ScheduleError> {
        if interval == 0 || interval > LAST_MINUTE {
            return Err(ScheduleError::InvalidInterval(interval));
        }
        for hour in [start_hour, end_hour] {
            if hour > 23 {
                return Err(ScheduleError::InvalidHour(hour));
            }
        }
        // Bounds were checked above, so the narrowing casts are lossless
        #[allow(clippy::cast_possible_truncation)]
        let (start_hour, end_hour, interval) = (start_hour as u8, end_hour as u8, interval as u8);
        if start_hour > end_hour {
            return Err(ScheduleError::InvertedWindow {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            start_hour,
            end_hour,
            interval,
        })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub fn interval(&self) -> u8 {
        self.interval
    }
}

/// Number of additional repetitions after minute `jitter` within one hour
pub fn repetitions(interval: u8) -> u32 {
    LAST_MINUTE / u32::from(interval)
}

/// Largest jitter that still fits every repetition inside the hour
///
/// Always below `interval`, so the jitter stays within `[0, interval)`.
pub fn max_jitter(interval: u8) -> u8 {
    // 59 % interval < interval <= 59
    #[allow(clippy::cast_possible_truncation)]
    let max = (LAST_MINUTE % u32::from(interval)) as u8;
    max
}

/// Draw a jitter uniformly from `[0, max_jitter(interval)]`
pub fn draw_jitter<R: Rng + ?Sized>(interval: u8, rng: &mut R) -> u8 {
    rng.random_range(0..=max_jitter(interval))
}

/// Minute-of-hour values `k * interval + jitter`, dropping anything past 59
pub fn minute_list(interval: u8, jitter: u8) -> Vec<u8> {
    let interval = u32::from(interval);
    let jitter = u32::from(jitter);
    (0..=LAST_MINUTE / interval)
        .map(|k| k * interval + jitter)
        .filter(|minute| *minute <= LAST_MINUTE)
        // filtered to <= 59 above
        .map(|minute| u8::try_from(minute).unwrap_or(u8::MAX))
        .collect()
}

/// A concrete capture schedule: window plus the jitter chosen for this install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    window: ScheduleWindow,
    jitter: u8,
}

impl Schedule {
    /// Generate a schedule, drawing a fresh jitter unless `fixed` is set
    pub fn generate(window: ScheduleWindow, fixed: bool) -> Self {
        let jitter = if fixed {
            0
        } else {
            draw_jitter(window.interval, &mut rand::rng())
        };
        log::debug!(
            "Generated schedule: interval {}m, jitter {}m (fixed: {fixed})",
            window.interval,
            jitter
        );
        Self { window, jitter }
    }

    /// Build a schedule with a known jitter (reduced modulo the interval)
    pub fn with_jitter(window: ScheduleWindow, jitter: u8) -> Self {
        Self {
            window,
            jitter: jitter % window.interval,
        }
    }

    pub fn window(&self) -> ScheduleWindow {
        self.window
    }

    pub fn jitter(&self) -> u8 {
        self.jitter
    }

    pub fn minutes(&self) -> Vec<u8> {
        minute_list(self.window.interval, self.jitter)
    }

    /// Crontab minute field, e.g. `3,33`
    pub fn minute_field(&self) -> String {
        self.minutes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Crontab hour field, e.g. `9-22`
    pub fn hour_field(&self) -> String {
        if self.window.start_hour == self.window.end_hour {
            self.window.start_hour.to_string()
        } else {
            format!("{}-{}", self.window.start_hour, self.window.end_hour)
        }
    }

    /// Cron line that triggers one capture/upload cycle
    pub fn capture_line(&self, agent: &str) -> String {
        format!(
            "{} {} * * * {agent} upload",
            self.minute_field(),
            self.hour_field()
        )
    }

    /// Root crontab: capture/upload cycle plus the daily maintenance reboot
    pub fn root_crontab(&self) -> String {
        format!("{}\n{REBOOT_CRON_LINE}\n", self.capture_line(AGENT_PATH))
    }
}

/// Admin crontab: daily IP report
pub fn admin_crontab() -> String {
    format!("{IP_REPORT_CRON} {AGENT_PATH} report-ip\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_window_validation() {
        assert!(ScheduleWindow::new(9, 22, 30).is_ok());
        assert_eq!(
            ScheduleWindow::new(9, 22, 0),
            Err(ScheduleError::InvalidInterval(0))
        );
        assert_eq!(
            ScheduleWindow::new(9, 22, 60),
            Err(ScheduleError::InvalidInterval(60))
        );
        assert_eq!(
            ScheduleWindow::new(9, 24, 30),
            Err(ScheduleError::InvalidHour(24))
        );
        assert_eq!(
            ScheduleWindow::new(22, 9, 30),
            Err(ScheduleError::InvertedWindow { start: 22, end: 9 })
        );
    }

    #[test]
    fn test_minute_list_half_hourly() {
        assert_eq!(minute_list(30, 3), vec![3, 33]);
        assert_eq!(minute_list(30, 0), vec![0, 30]);
        assert_eq!(minute_list(30, 29), vec![29, 59]);
    }

    #[test]
    fn test_minute_list_drops_values_past_the_hour() {
        // 6 + 8 * 7 = 62 falls outside the hour
        assert_eq!(minute_list(7, 6), vec![6, 13, 20, 27, 34, 41, 48, 55]);
    }

    #[test]
    fn test_minute_list_every_minute() {
        let minutes = minute_list(1, 0);
        assert_eq!(minutes.len(), 60);
        assert_eq!(minutes.first(), Some(&0));
        assert_eq!(minutes.last(), Some(&59));
    }

    #[test]
    fn test_max_jitter_is_below_interval() {
        for interval in 1..=59u8 {
            assert!(max_jitter(interval) < interval);
        }
        assert_eq!(max_jitter(30), 29);
        assert_eq!(max_jitter(7), 3);
        assert_eq!(max_jitter(59), 0);
    }

    #[test]
    fn test_fixed_schedule_has_no_jitter() {
        let window = ScheduleWindow::new(9, 22, 15).unwrap();
        let schedule = Schedule::generate(window, true);
        assert_eq!(schedule.jitter(), 0);
        assert_eq!(schedule.minute_field(), "0,15,30,45");
    }

    #[test]
    fn test_draw_jitter_is_reproducible_with_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(draw_jitter(30, &mut a), draw_jitter(30, &mut b));
    }

    #[test]
    fn test_capture_line() {
        let window = ScheduleWindow::new(9, 22, 30).unwrap();
        let schedule = Schedule::with_jitter(window, 3);
        assert_eq!(
            schedule.capture_line("/bin/agent"),
            "3,33 9-22 * * * /bin/agent upload"
        );
    }

    #[test]
    fn test_single_hour_window() {
        let window = ScheduleWindow::new(12, 12, 20).unwrap();
        let schedule = Schedule::with_jitter(window, 45);
        assert_eq!(schedule.jitter(), 5);
        assert_eq!(schedule.hour_field(), "12");
    }

    #[test]
    fn test_root_crontab_carries_capture_and_reboot() {
        let window = ScheduleWindow::new(9, 22, 30).unwrap();
        let crontab = Schedule::with_jitter(window, 3).root_crontab();
        let lines: Vec<&str> = crontab.lines().collect();
        assert_eq!(
            lines,
            vec![
                "3,33 9-22 * * * /mnt/cfg1/scripts/phenocam-agent upload",
                REBOOT_CRON_LINE,
            ]
        );
    }

    #[test]
    fn test_admin_crontab_only_reports_ip() {
        let crontab = admin_crontab();
        assert_eq!(crontab.lines().count(), 1);
        assert!(crontab.starts_with(IP_REPORT_CRON));
        assert!(crontab.trim_end().ends_with("report-ip"));
        assert!(!crontab.contains(" upload"));
    }
}
