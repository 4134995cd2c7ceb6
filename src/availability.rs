use chrono::{DateTime, NaiveTime, TimeZone};

/// When a sensor reports a value. Outside its availability the sensor is `unavailable` and its
/// data source is not polled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Availability {
    #[default]
    Always,
    /// Local wall-clock window; `start > stop` wraps past midnight.
    Window { start: NaiveTime, stop: NaiveTime },
    /// Sun above the horizon at the given position.
    Daylight { latitude: f64, longitude: f64 },
}

impl Availability {
    pub fn is_available<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match *self {
            Availability::Always => true,
            Availability::Window { start, stop } => {
                window_contains(start, stop, now.naive_local().time())
            }
            Availability::Daylight {
                latitude,
                longitude,
            } => sun::pos(now.timestamp_millis(), latitude, longitude).altitude > 0.0,
        }
    }
}

fn window_contains(start: NaiveTime, stop: NaiveTime, time: NaiveTime) -> bool {
    if start <= stop {
        start <= time && time <= stop
    } else {
        time >= start || time <= stop
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, hour, minute, 0).unwrap()
    }

    #[test]
    fn always_available() {
        assert_eq!(Availability::Always, Availability::default());
        assert!(Availability::Always.is_available(&at(3, 0)));
    }

    #[test]
    fn daytime_window() {
        let window = Availability::Window {
            start: hm(6, 30),
            stop: hm(20, 0),
        };
        assert!(!window.is_available(&at(6, 29)));
        assert!(window.is_available(&at(6, 30)));
        assert!(window.is_available(&at(12, 0)));
        assert!(window.is_available(&at(20, 0)));
        assert!(!window.is_available(&at(20, 1)));
    }

    #[test]
    fn window_across_midnight() {
        let window = Availability::Window {
            start: hm(22, 0),
            stop: hm(2, 0),
        };
        assert!(window.is_available(&at(23, 0)));
        assert!(window.is_available(&at(1, 0)));
        assert!(!window.is_available(&at(12, 0)));
    }

    #[test]
    fn daylight_at_equator() {
        let daylight = Availability::Daylight {
            latitude: 0.0,
            longitude: 0.0,
        };
        assert!(daylight.is_available(&at(12, 0)));
        assert!(!daylight.is_available(&at(0, 0)));
    }
}
