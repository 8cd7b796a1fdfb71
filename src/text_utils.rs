use std::ops::Index;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::journal::locale::Locale;

const EXCERPT_CHARS: usize = 150;
const CHARS_PER_MINUTE: usize = 1000;

const MONTHS_EN: [&str; 12] = ["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];

fn to_int<T: std::str::FromStr>(num_str: &str, date_str: &str) -> Result<T, String> {
    match num_str.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => Err(format!("Error parsing {} from the date {}", num_str, date_str)),
    }
}

pub fn parse_date_time(buf: &str) -> Result<NaiveDateTime, String> {
    lazy_static! {
        static ref DATE_TIME_REGEX: Regex = Regex::new(
            r#"(\d{4})-(\d{0,2})-(\d{0,2})(?: (\d{0,2}):(\d{0,2}):(\d{0,2})(\.\d{0,3})?)?"#
        ).unwrap();
    }
    let Some(caps) = DATE_TIME_REGEX.captures(buf) else {
        return Err(format!("Unable to parse date time {}", buf));
    };

    let to_i32 = |num_str: &str| to_int::<i32>(num_str, buf);
    let to_u32 = |num_str: &str| to_int::<u32>(num_str, buf);
    let opt_u32 = |idx: usize| caps.get(idx).map_or(Ok(0), |m| to_u32(m.as_str()));

    // We are using the regex approach to make it more flexible
    let y: i32 = to_i32(caps.index(1))?;
    let m: u32 = to_u32(caps.index(2))?;
    let d: u32 = to_u32(caps.index(3))?;
    let h: u32 = opt_u32(4)?;
    let mn: u32 = opt_u32(5)?;
    let s: u32 = opt_u32(6)?;

    let date = NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| format!("Invalid date {}", buf))?;
    let time = NaiveTime::from_hms_opt(h, mn, s)
        .ok_or_else(|| format!("Invalid time {}", buf))?;

    Ok(NaiveDateTime::new(date, time))
}

/// `JAN 2024` in English, `1月 2024` in Chinese.
pub fn format_month_year(date_time: &DateTime<Utc>, locale: Locale) -> String {
    let month = date_time.month();
    let year = date_time.year();
    match locale {
        Locale::En => format!("{} {}", MONTHS_EN[(month - 1) as usize], year),
        Locale::Zh => format!("{}月 {}", month, year),
    }
}

/// First 150 characters of the body with HTML tags removed.
pub fn excerpt(content: &str) -> String {
    lazy_static! {
        static ref TAG_REGEX: Regex = Regex::new(r"<[^>]+>").unwrap();
    }
    let plain = TAG_REGEX.replace_all(content, "");
    let mut chars = plain.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Reading time in minutes, counted the way browsers measure string length.
pub fn reading_minutes(content: &str) -> u32 {
    let units = content.encode_utf16().count();
    units.div_ceil(CHARS_PER_MINUTE) as u32
}
