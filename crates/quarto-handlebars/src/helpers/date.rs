/*
 * date.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Date helpers: `date.now`, `date.parse`, `date.format`, `date.fromNow`.
//!
//! Dates travel between helpers as epoch milliseconds, so
//! `{{date.format (date.parse published) format="%DATE%"}}` works without
//! any intermediate string format.

use super::HelperArgs;
use crate::error::TemplateResult;
use crate::request::Request;
use crate::value::TemplateValue;
use chrono::{
    DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt::Display;
use tracing::debug;

static FORMAT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"%([A-Z]+)%").unwrap());

const DEFAULT_FORMAT: &str = "%DATETIME%";
const DEFAULT_RELATIVE_STYLE: &str = "long 1";
const TIMEZONE_COOKIE: &str = "timezone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateHelper {
    Now,
    Parse,
    Format,
    FromNow,
}

impl DateHelper {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "date.now" => DateHelper::Now,
            "date.parse" => DateHelper::Parse,
            "date.format" => DateHelper::Format,
            "date.fromNow" => DateHelper::FromNow,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DateHelper::Now => "date.now",
            DateHelper::Parse => "date.parse",
            DateHelper::Format => "date.format",
            DateHelper::FromNow => "date.fromNow",
        }
    }

    /// Run the helper. Unparseable input yields `null`, which renders empty.
    pub fn call(self, args: &HelperArgs<'_>) -> TemplateResult<TemplateValue> {
        let now = now_millis();
        let value = match self {
            DateHelper::Now => Some(TemplateValue::from(now)),
            DateHelper::Parse => args
                .param(0)
                .and_then(parse_epoch_millis)
                .map(TemplateValue::from),
            DateHelper::Format => {
                let millis = match args.param(0) {
                    None | Some(TemplateValue::Null) => Some(now),
                    Some(value) => parse_epoch_millis(value),
                };
                let format = args.hash_str("format").unwrap_or(DEFAULT_FORMAT);
                let zone = resolve_zone(args.hash_str("timezone"), args.request);
                millis
                    .and_then(|ms| format_millis(ms, format, &zone))
                    .map(TemplateValue::from)
            }
            DateHelper::FromNow => {
                let style = RelativeStyle::parse(
                    args.hash_str("format").unwrap_or(DEFAULT_RELATIVE_STYLE),
                );
                args.param(0)
                    .and_then(parse_epoch_millis)
                    .and_then(|ms| ms.checked_sub(now))
                    .map(|delta| TemplateValue::from(relative_time(delta, style)))
            }
        };
        Ok(value.unwrap_or(TemplateValue::Null))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Interpret a value as epoch milliseconds.
///
/// Numbers and numeric strings are taken as milliseconds. Other strings may
/// be RFC 3339, RFC 2822, an ISO date-time without offset (UTC) or a bare
/// `YYYY-MM-DD` (UTC midnight). Numbers outside the representable date
/// range yield `None`.
pub fn parse_epoch_millis(value: &TemplateValue) -> Option<i64> {
    if let Some(n) = value.as_number() {
        let millis = n as i64;
        return DateTime::from_timestamp_millis(millis).map(|_| millis);
    }
    let text = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp_millis());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Time zone a date is rendered in.
#[derive(Debug, Clone, PartialEq)]
pub enum Zone {
    /// The server's local zone.
    Server,
    Utc,
    Named(Tz),
}

/// Pick the zone for a `timezone=` argument.
///
/// Absent or `server` means server-local. `browser`, `client`, `user` and
/// `view` read the zone from the request's `timezone` cookie, falling back
/// to server-local. Anything else is an IANA name; unknown names fall back
/// to UTC.
pub fn resolve_zone(name: Option<&str>, request: &dyn Request) -> Zone {
    match name.map(str::trim) {
        None | Some("") | Some("server") => Zone::Server,
        Some("browser" | "client" | "user" | "view") => request
            .cookie(TIMEZONE_COOKIE)
            .and_then(|tz| tz.parse::<Tz>().ok())
            .map_or(Zone::Server, Zone::Named),
        Some(other) => match other.parse::<Tz>() {
            Ok(tz) => Zone::Named(tz),
            Err(_) => {
                debug!(timezone = other, "unknown time zone, using UTC");
                Zone::Utc
            }
        },
    }
}

/// Render epoch milliseconds with `%TOKEN%` placeholders.
///
/// Returns `None` when the timestamp is out of range.
pub fn format_millis(millis: i64, format: &str, zone: &Zone) -> Option<String> {
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(match zone {
        Zone::Server => render_tokens(&utc.with_timezone(&Local), format),
        Zone::Utc => render_tokens(&utc, format),
        Zone::Named(tz) => render_tokens(&utc.with_timezone(tz), format),
    })
}

fn render_tokens<Z>(dt: &DateTime<Z>, format: &str) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    FORMAT_TOKEN
        .replace_all(format, |caps: &Captures<'_>| {
            let pattern = match &caps[1] {
                "DATE" => "%Y-%m-%d",
                "TIME" => "%H:%M:%S",
                "DATETIME" => "%Y-%m-%d %H:%M:%S",
                "Y" => "%Y",
                "M" => "%m",
                "D" => "%d",
                "H" => "%H",
                "MIN" => "%M",
                "SEC" => "%S",
                "ISO" => return dt.to_rfc3339_opts(SecondsFormat::Millis, true),
                "MS" => return format!("{:03}", dt.timestamp_subsec_millis()),
                _ => return caps[0].to_string(),
            };
            dt.format(pattern).to_string()
        })
        .into_owned()
}

/// `date.fromNow` output style: `long|short N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeStyle {
    pub short: bool,
    /// Number of units shown, 1 to 3.
    pub units: usize,
}

impl RelativeStyle {
    /// Parse `"short 2"`, `"long"`, etc. Unrecognized parts use the defaults.
    pub fn parse(raw: &str) -> Self {
        let mut words = raw.split_whitespace();
        let short = words.next() == Some("short");
        let units = words
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, 3);
        Self { short, units }
    }
}

const UNITS: [(u64, &str, &str); 7] = [
    (31_536_000, "year", "y"),
    (2_592_000, "month", "mo"),
    (604_800, "week", "w"),
    (86_400, "day", "d"),
    (3_600, "hour", "h"),
    (60, "minute", "m"),
    (1, "second", "s"),
];

/// Describe an offset from now. Positive `delta_ms` is in the future.
pub fn relative_time(delta_ms: i64, style: RelativeStyle) -> String {
    let future = delta_ms > 0;
    let mut remaining = delta_ms.unsigned_abs().saturating_add(500) / 1000;
    if remaining == 0 {
        return if future { "in a moment" } else { "just now" }.to_string();
    }

    let mut parts = Vec::new();
    for (seconds, long, short) in UNITS {
        let count = remaining / seconds;
        remaining %= seconds;
        if count == 0 {
            continue;
        }
        parts.push(if style.short {
            format!("{count}{short}")
        } else if count == 1 {
            format!("1 {long}")
        } else {
            format!("{count} {long}s")
        });
        if parts.len() == style.units {
            break;
        }
    }

    let text = parts.join(if style.short { " " } else { ", " });
    if future {
        format!("in {text}")
    } else {
        format!("{text} ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::StaticRequest;
    use crate::value::ValueMap;
    use pretty_assertions::assert_eq;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;

    fn s(text: &str) -> TemplateValue {
        TemplateValue::from(text)
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            parse_epoch_millis(&s("2024-01-15T10:30:00.250Z")),
            Some(1_705_314_600_250)
        );
        assert_eq!(
            parse_epoch_millis(&s("2024-01-15T12:30:00+02:00")),
            Some(1_705_314_600_000)
        );
        assert_eq!(
            parse_epoch_millis(&s("2024-01-15T10:30:00")),
            Some(1_705_314_600_000)
        );
        assert_eq!(parse_epoch_millis(&s("2024-01-15")), Some(1_705_276_800_000));
        assert_eq!(
            parse_epoch_millis(&s("Mon, 15 Jan 2024 10:30:00 +0000")),
            Some(1_705_314_600_000)
        );
        assert_eq!(parse_epoch_millis(&s("1705314600000")), Some(1_705_314_600_000));
        assert_eq!(
            parse_epoch_millis(&TemplateValue::Number(42.0)),
            Some(42)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_epoch_millis(&s("not a date")), None);
        assert_eq!(parse_epoch_millis(&s("2024-13-45")), None);
        assert_eq!(parse_epoch_millis(&TemplateValue::Null), None);
        assert_eq!(parse_epoch_millis(&TemplateValue::Bool(true)), None);
    }

    #[test]
    fn test_iso_round_trip() {
        let millis = parse_epoch_millis(&s("2024-06-01T08:15:30.123Z")).unwrap();
        let iso = format_millis(millis, "%ISO%", &Zone::Utc).unwrap();
        assert_eq!(iso, "2024-06-01T08:15:30.123Z");
        assert_eq!(parse_epoch_millis(&s(&iso)), Some(millis));
    }

    #[test]
    fn test_format_tokens() {
        let millis = 1_705_314_600_250;
        assert_eq!(
            format_millis(millis, "%DATE% %TIME%", &Zone::Utc).unwrap(),
            "2024-01-15 10:30:00"
        );
        assert_eq!(
            format_millis(millis, "%D%/%M%/%Y% %H%h%MIN%m%SEC%s.%MS%", &Zone::Utc).unwrap(),
            "15/01/2024 10h30m00s.250"
        );
        assert_eq!(
            format_millis(millis, "%UNKNOWN% %DATETIME%", &Zone::Utc).unwrap(),
            "%UNKNOWN% 2024-01-15 10:30:00"
        );
    }

    #[test]
    fn test_named_zone() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        assert_eq!(
            format_millis(1_705_314_600_000, "%ISO%", &Zone::Named(tz)).unwrap(),
            "2024-01-15T19:30:00.000+09:00"
        );
    }

    #[test]
    fn test_resolve_zone() {
        let request = StaticRequest::new().with_cookie("timezone", "Europe/Paris");
        let paris: Tz = "Europe/Paris".parse().unwrap();

        assert_eq!(resolve_zone(None, &request), Zone::Server);
        assert_eq!(resolve_zone(Some("server"), &request), Zone::Server);
        assert_eq!(resolve_zone(Some("browser"), &request), Zone::Named(paris));
        assert_eq!(resolve_zone(Some("view"), &request), Zone::Named(paris));
        assert_eq!(resolve_zone(Some("Invalid/Zone"), &request), Zone::Utc);
        assert_eq!(
            resolve_zone(Some("user"), &StaticRequest::new()),
            Zone::Server
        );
        let bad_cookie = StaticRequest::new().with_cookie("timezone", "Mars/Olympus");
        assert_eq!(resolve_zone(Some("client"), &bad_cookie), Zone::Server);
    }

    #[test]
    fn test_invalid_zone_formats_as_utc() {
        let request = StaticRequest::new();
        let hash = ValueMap::from([
            ("format".to_string(), s("%ISO%")),
            ("timezone".to_string(), s("Invalid/Zone")),
        ]);
        let params = [s("2024-01-15T10:30:00Z")];
        let args = HelperArgs {
            params: &params,
            hash: &hash,
            request: &request,
        };
        assert_eq!(
            DateHelper::Format.call(&args).unwrap(),
            s("2024-01-15T10:30:00.000Z")
        );
    }

    #[test]
    fn test_relative_style_parse() {
        assert_eq!(
            RelativeStyle::parse("short 2"),
            RelativeStyle { short: true, units: 2 }
        );
        assert_eq!(
            RelativeStyle::parse("long"),
            RelativeStyle { short: false, units: 1 }
        );
        assert_eq!(RelativeStyle::parse("short 9").units, 3);
        assert_eq!(RelativeStyle::parse("short 0").units, 1);
    }

    #[test]
    fn test_relative_time() {
        let short2 = RelativeStyle::parse("short 2");
        let long2 = RelativeStyle::parse("long 2");
        assert_eq!(relative_time(2 * DAY + 5 * HOUR, short2), "in 2d 5h");
        assert_eq!(relative_time(-(2 * DAY + 5 * HOUR), short2), "2d 5h ago");
        assert_eq!(relative_time(2 * DAY + 5 * HOUR, long2), "in 2 days, 5 hours");
        assert_eq!(relative_time(-HOUR, long2), "1 hour ago");
        assert_eq!(
            relative_time(400 * DAY, RelativeStyle::parse("long 1")),
            "in 1 year"
        );
        assert_eq!(relative_time(2 * DAY + 90_000, short2), "in 2d 1m");
    }

    #[test]
    fn test_relative_time_under_a_second() {
        let style = RelativeStyle::parse("long 1");
        assert_eq!(relative_time(0, style), "just now");
        assert_eq!(relative_time(-499, style), "just now");
        assert_eq!(relative_time(400, style), "in a moment");
        assert_eq!(relative_time(-999, style), "1 second ago");
    }

    #[test]
    fn test_relative_time_rounds_to_nearest_second() {
        let short2 = RelativeStyle::parse("short 2");
        assert_eq!(relative_time(2 * DAY + 5 * HOUR - 3, short2), "in 2d 5h");
        assert_eq!(relative_time(-(2 * DAY + 5 * HOUR - 3), short2), "2d 5h ago");
    }

    #[test]
    fn test_out_of_range_numbers_are_invalid() {
        assert_eq!(parse_epoch_millis(&s("-99999999999999999999")), None);
        assert_eq!(parse_epoch_millis(&s("99999999999999999999")), None);
        assert_eq!(parse_epoch_millis(&TemplateValue::Number(-1e300)), None);
        assert!(relative_time(i64::MIN, RelativeStyle::parse("short 1")).ends_with(" ago"));

        let request = StaticRequest::new();
        let hash = ValueMap::new();
        for value in ["-99999999999999999999", "99999999999999999999"] {
            let params = [s(value)];
            let args = HelperArgs {
                params: &params,
                hash: &hash,
                request: &request,
            };
            for helper in [DateHelper::Parse, DateHelper::Format, DateHelper::FromNow] {
                assert_eq!(helper.call(&args).unwrap(), TemplateValue::Null, "{value}");
            }
        }
    }

    #[test]
    fn test_now_is_current_epoch_millis() {
        let request = StaticRequest::new();
        let hash = ValueMap::new();
        let args = HelperArgs {
            params: &[],
            hash: &hash,
            request: &request,
        };
        let before = Utc::now().timestamp_millis();
        let value = DateHelper::Now.call(&args).unwrap();
        let after = Utc::now().timestamp_millis();
        let millis = value.as_number().unwrap() as i64;
        assert!(before <= millis && millis <= after, "{millis}");
        assert_eq!(value.render(), millis.to_string());
    }

    #[test]
    fn test_from_now_short_two_units() {
        let request = StaticRequest::new();
        let target = now_millis() + 2 * DAY + 5 * HOUR;
        let hash = ValueMap::from([("format".to_string(), s("short 2"))]);
        let params = [TemplateValue::from(target)];
        let args = HelperArgs {
            params: &params,
            hash: &hash,
            request: &request,
        };
        let rendered = DateHelper::FromNow.call(&args).unwrap().render();
        let pattern = Regex::new(r"^in \d+d \d+h$").unwrap();
        assert!(pattern.is_match(&rendered), "{rendered}");
    }

    #[test]
    fn test_invalid_input_renders_empty() {
        let request = StaticRequest::new();
        let hash = ValueMap::new();
        let params = [s("garbage")];
        let args = HelperArgs {
            params: &params,
            hash: &hash,
            request: &request,
        };
        for helper in [DateHelper::Parse, DateHelper::Format, DateHelper::FromNow] {
            assert_eq!(helper.call(&args).unwrap(), TemplateValue::Null);
        }
    }
}
