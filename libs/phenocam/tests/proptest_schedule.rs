//! Property-based tests for schedule generation and settings round-trips
//!
//! These check, for every valid interval, that the minute list:
//! 1. Has exactly floor(59/I)+1 entries
//! 2. Keeps every entry within the hour
//! 3. Keeps every entry congruent to the jitter modulo the interval

use phenocam_lib::schedule::{Schedule, ScheduleWindow, draw_jitter, max_jitter, minute_list};
use phenocam_lib::settings::{CameraSettings, UtcOffset};
use phenocam_lib::Network;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn assert_minute_list(interval: u8, jitter: u8) {
    let minutes = minute_list(interval, jitter);
    assert_eq!(
        minutes.len(),
        usize::from(59 / interval) + 1,
        "interval {interval}, jitter {jitter}: {minutes:?}"
    );
    for minute in &minutes {
        assert!(*minute <= 59);
        assert_eq!(minute % interval, jitter % interval);
    }
    assert!(minutes.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn every_interval_with_every_allowed_jitter() {
    for interval in 1..=59u8 {
        for jitter in 0..=max_jitter(interval) {
            assert_minute_list(interval, jitter);
        }
    }
}

proptest! {
    #[test]
    fn drawn_jitter_keeps_full_repetition_count(interval in 1u8..=59, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let jitter = draw_jitter(interval, &mut rng);
        prop_assert!(jitter < interval);
        assert_minute_list(interval, jitter);
    }

    #[test]
    fn generated_schedule_is_well_formed(
        interval in 1u32..=59,
        start in 0u32..=23,
        span in 0u32..=23,
        fixed in any::<bool>(),
    ) {
        let end = (start + span).min(23);
        let window = ScheduleWindow::new(start, end, interval).unwrap();
        let schedule = Schedule::generate(window, fixed);
        if fixed {
            prop_assert_eq!(schedule.jitter(), 0);
        }
        let field = schedule.minute_field();
        let count = field.split(',').count();
        prop_assert_eq!(count, (59 / interval) as usize + 1);
        let line = schedule.capture_line("/agent");
        prop_assert!(line.starts_with(&field));
        prop_assert!(line.ends_with("/agent upload"));
    }

    #[test]
    fn settings_round_trip(
        name in "[A-Za-z0-9_-]{1,24}",
        offset_minutes in -720i32..=840,
        start in 0u32..=23,
        span in 0u32..=23,
        interval in 1u32..=59,
        icos in any::<bool>(),
        fixed in any::<bool>(),
    ) {
        let end = (start + span).min(23);
        let network = if icos { Network::Icos } else { Network::Phenocam };
        let offset = UtcOffset::from_minutes(offset_minutes).unwrap();
        let settings = CameraSettings::new(&name, offset, start, end, interval, network, fixed).unwrap();

        let parsed = CameraSettings::parse(&settings.to_file_contents()).unwrap();
        prop_assert_eq!(&parsed.site_name, &name);
        prop_assert_eq!(parsed.utc_offset, offset);
        prop_assert_eq!(u32::from(parsed.start_hour), start);
        prop_assert_eq!(u32::from(parsed.end_hour), end);
        prop_assert_eq!(u32::from(parsed.interval_minutes), interval);
        prop_assert_eq!(parsed, settings);
    }

    #[test]
    fn settings_parse_never_panics(content in "\\PC{0,400}") {
        let _ = CameraSettings::parse(&content);
    }
}
