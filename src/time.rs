// Local wall-clock time, using libc to avoid pulling in a calendar crate.  Rotation boundaries are
// local midnight and the local top of the hour, so everything here is in terms of the calendar
// components that localtime_r() produces for the current zone.
//
// NOTE: localtime_r() is not required to initialize time zone information, but glibc and musl both
// do so on first use.  A TZ change while the process is running is not observed.

use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(test)]
use std::cell::Cell;
#[cfg(test)]
use std::rc::Rc;

// Calendar components of a local instant.  Month and day are 1-based, as people write them.

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct LocalTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl LocalTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> LocalTime {
        LocalTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    // Start of the local calendar day containing this instant.
    pub fn start_of_day(&self) -> LocalTime {
        LocalTime::new(self.year, self.month, self.day, 0, 0, 0)
    }

    // Start of the local calendar hour containing this instant.
    pub fn start_of_hour(&self) -> LocalTime {
        LocalTime::new(self.year, self.month, self.day, self.hour, 0, 0)
    }

    pub fn same_day(&self, other: &LocalTime) -> bool {
        self.start_of_day() == other.start_of_day()
    }

    pub fn same_hour(&self, other: &LocalTime) -> bool {
        self.start_of_hour() == other.start_of_hour()
    }

    // yyyymmdd
    pub fn date_stamp(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    // yyyymmdd_hh
    pub fn hour_stamp(&self) -> String {
        format!("{}_{:02}", self.date_stamp(), self.hour)
    }

    fn from_tm(tm: &libc::tm) -> LocalTime {
        LocalTime {
            year: tm.tm_year + 1900,
            month: (tm.tm_mon + 1) as u32,
            day: tm.tm_mday as u32,
            hour: tm.tm_hour as u32,
            minute: tm.tm_min as u32,
            second: tm.tm_sec as u32,
        }
    }
}

pub fn unix_now() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs(),
        // A clock before 1970 is broken beyond our ability to care; treat it as the epoch.
        Err(_) => 0,
    }
}

// Convert a UNIX timestamp to local calendar components.
//
//   localtime_r(&t, timebuf)
//
// localtime_r() fails only if the year overflows an int, which does not happen for timestamps taken
// from the system clock.  Should it happen anyway we fall back to UTC rather than stopping the
// aggregator.

pub fn local_time_of(t: u64) -> LocalTime {
    let mut timebuf = libc::tm {
        tm_sec: 0,
        tm_min: 0,
        tm_hour: 0,
        tm_mday: 0,
        tm_mon: 0,
        tm_year: 0,
        tm_wday: 0,
        tm_yday: 0,
        tm_isdst: 0,
        tm_gmtoff: 0,
        tm_zone: std::ptr::null(),
    };
    let secs = t as libc::time_t;
    let ok = unsafe { !libc::localtime_r(&secs, &mut timebuf).is_null() };
    if ok {
        LocalTime::from_tm(&timebuf)
    } else {
        log::warn!("localtime_r failed for {t}, using UTC");
        utc_time_of(t)
    }
}

pub fn now_local() -> LocalTime {
    local_time_of(unix_now())
}

// UTC calendar components computed by hand, iterating up from 1970.

pub fn utc_time_of(t: u64) -> LocalTime {
    const SECONDS_PER_MINUTE: u64 = 60;
    const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
    const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

    let mut days = t / SECONDS_PER_DAY;
    let mut year = 1970;
    loop {
        let n = if is_leap_year(year) { 366 } else { 365 };
        if days < n {
            break;
        }
        days -= n;
        year += 1;
    }

    let days_per_month = [
        31,
        if is_leap_year(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 0;
    while days >= days_per_month[month] {
        days -= days_per_month[month];
        month += 1;
    }

    let seconds_remaining = t % SECONDS_PER_DAY;
    LocalTime {
        year: year as i32,
        month: month as u32 + 1,
        day: days as u32 + 1,
        hour: (seconds_remaining / SECONDS_PER_HOUR) as u32,
        minute: (seconds_remaining / SECONDS_PER_MINUTE % SECONDS_PER_MINUTE) as u32,
        second: (seconds_remaining % SECONDS_PER_MINUTE) as u32,
    }
}

fn is_leap_year(year: u64) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

// Where the receive loop gets "now" from.  Tests drive a manual clock so that rotation can be
// exercised without waiting for the wall clock to cross a boundary.

#[derive(Clone, Debug)]
pub enum Clock {
    System,
    #[cfg(test)]
    Manual(Rc<Cell<LocalTime>>),
}

impl Clock {
    pub fn now(&self) -> LocalTime {
        match self {
            Clock::System => now_local(),
            #[cfg(test)]
            Clock::Manual(t) => t.get(),
        }
    }
}

#[test]
pub fn test_utc_time_of() {
    // 08/18/2016 @ 2:41:16am (UTC)
    assert!(utc_time_of(1471488076) == LocalTime::new(2016, 8, 18, 2, 41, 16));
    assert!(utc_time_of(0) == LocalTime::new(1970, 1, 1, 0, 0, 0));
    // `date -u +%s-%FT%T` => 1740568588-2025-02-26T11:16:28
    assert!(utc_time_of(1740568588) == LocalTime::new(2025, 2, 26, 11, 16, 28));
    // Leap day
    assert!(utc_time_of(1709208000) == LocalTime::new(2024, 2, 29, 12, 0, 0));
    assert!(utc_time_of(1735689599) == LocalTime::new(2024, 12, 31, 23, 59, 59));
}

#[test]
pub fn test_local_time_is_sane() {
    let t = now_local();
    assert!(t.year >= 2024);
    assert!((1..=12).contains(&t.month));
    assert!((1..=31).contains(&t.day));
    assert!(t.hour < 24 && t.minute < 60 && t.second <= 60);
}

#[test]
pub fn test_stamps() {
    let t = LocalTime::new(2024, 3, 15, 14, 7, 9);
    assert!(t.date_stamp() == "20240315");
    assert!(t.hour_stamp() == "20240315_14");
    let t = LocalTime::new(2024, 11, 5, 3, 0, 0);
    assert!(t.date_stamp() == "20241105");
    assert!(t.hour_stamp() == "20241105_03");
}

#[test]
pub fn test_truncation() {
    let a = LocalTime::new(2024, 3, 15, 13, 59, 59);
    let b = LocalTime::new(2024, 3, 15, 14, 0, 1);
    let c = LocalTime::new(2024, 3, 16, 0, 0, 0);
    assert!(a.start_of_hour() == LocalTime::new(2024, 3, 15, 13, 0, 0));
    assert!(a.start_of_day() == LocalTime::new(2024, 3, 15, 0, 0, 0));
    assert!(a.same_day(&b));
    assert!(!a.same_hour(&b));
    assert!(!b.same_day(&c));
    // Same hour-of-day on different days is a different hour.
    let d = LocalTime::new(2024, 3, 16, 13, 30, 0);
    assert!(!a.same_hour(&d));
}
