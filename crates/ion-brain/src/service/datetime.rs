//! Date/time resolution for reminders.
//!
//! Turns an ISO-ish or Portuguese natural-language date expression plus a
//! recurrence into a concrete future timestamp. All arithmetic is on unix
//! seconds; timezone handling is a fixed hour offset.

/// Reminders must land at least this far in the future.
pub const MIN_LEAD_SECS: i64 = 15 * 60;

/// A resolved reminder timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// Unix seconds, UTC.
    pub ts: i64,
    /// Whether the expression carried an explicit time of day.
    pub explicit_time: bool,
}

// ─── Civil date arithmetic ───────────────────────────────────────────

/// Convert a count of days since Unix epoch to (year, month, day).
pub fn unix_days_to_date(days: i64) -> (i64, i64, i64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as i64, d as i64)
}

/// Convert (year, month, day) to days since Unix epoch.
pub fn date_to_unix_days(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let m = month;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day - 1;
    let doe = yoe as i64 * 365 + yoe as i64 / 4 - yoe as i64 / 100 + doy;
    era * 146097 + doe - 719468
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

// ─── Formatting ──────────────────────────────────────────────────────

/// Format a unix timestamp as "YYYY-MM-DDTHH:MM:SS" in the given timezone.
pub fn format_iso_local(ts: i64, tz_offset: i32) -> String {
    let local = ts + (tz_offset as i64) * 3600;
    let days = local.div_euclid(86400);
    let tod = local.rem_euclid(86400);
    let (y, m, d) = unix_days_to_date(days);
    let h = tod / 3600;
    let min = (tod % 3600) / 60;
    let s = tod % 60;
    format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:{s:02}")
}

/// Format a unix timestamp as "YYYY-MM-DD" in the given timezone.
pub fn format_date_local(ts: i64, tz_offset: i32) -> String {
    let local = ts + (tz_offset as i64) * 3600;
    let (y, m, d) = unix_days_to_date(local.div_euclid(86400));
    format!("{y:04}-{m:02}-{d:02}")
}

/// Format the current date+time plus a UTC offset label, for prompts.
pub fn format_now_with_tz(now: i64, tz_offset: i32) -> (String, String) {
    let local = now + (tz_offset as i64) * 3600;
    let days = local.div_euclid(86400);
    let tod = local.rem_euclid(86400);
    let (y, m, d) = unix_days_to_date(days);
    let h = tod / 3600;
    let min = (tod % 3600) / 60;

    let datetime = format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}");
    let tz_label = if tz_offset >= 0 {
        format!("+{:02}:00", tz_offset)
    } else {
        format!("-{:02}:00", tz_offset.unsigned_abs())
    };

    (datetime, tz_label)
}

// ─── Parsing ─────────────────────────────────────────────────────────

/// Parse "YYYY-MM-DD", "YYYY-MM-DDTHH:MM[:SS]" or "YYYY-MM-DD HH:MM[:SS]"
/// as a local timestamp, returned in UTC.
fn parse_iso(expr: &str, tz_offset: i32) -> Option<ResolvedDate> {
    let offset_secs = (tz_offset as i64) * 3600;
    let expr = expr.trim();

    let (date_part, time_part) = match expr.split_once(['T', ' ']) {
        Some((d, t)) => (d, Some(t)),
        None => (expr, None),
    };

    let date_fields: Vec<&str> = date_part.split('-').collect();
    if date_fields.len() != 3 {
        return None;
    }
    let year: i64 = date_fields[0].parse().ok()?;
    let month: i64 = date_fields[1].parse().ok()?;
    let day: i64 = date_fields[2].parse().ok()?;
    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
        return None;
    }

    let (hour, minute, explicit_time) = match time_part {
        Some(t) => {
            let time_fields: Vec<&str> = t.split(':').collect();
            if time_fields.len() < 2 {
                return None;
            }
            let h: i64 = time_fields[0].parse().ok()?;
            let m: i64 = time_fields[1].parse().ok()?;
            if h > 23 || m > 59 {
                return None;
            }
            (h, m, true)
        }
        None => (9, 0, false),
    };

    let local = date_to_unix_days(year, month, day) * 86400 + hour * 3600 + minute * 60;
    Some(ResolvedDate {
        ts: local - offset_secs,
        explicit_time,
    })
}

/// Day offset from Portuguese relative-day keywords.
fn extract_relative_day(lower: &str) -> Option<i64> {
    if lower.contains("amanhã") || lower.contains("amanha") {
        Some(1)
    } else if lower.contains("ontem") {
        Some(-1)
    } else if lower.contains("hoje") {
        Some(0)
    } else {
        None
    }
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | ';' | '(' | ')'))
}

/// Time of day from Portuguese phrases: "meio dia", "meia noite",
/// "15h", "15h30", "15:30", "às 15".
fn extract_time_of_day(lower: &str) -> Option<(i64, i64)> {
    if lower.contains("meio dia") || lower.contains("meio-dia") {
        return Some((12, 0));
    }
    if lower.contains("meia noite") || lower.contains("meia-noite") {
        return Some((0, 0));
    }

    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for (i, raw) in tokens.iter().enumerate() {
        let token = strip_punctuation(raw);

        // "15:30"
        if let Some((h, m)) = token.split_once(':') {
            if let (Ok(h), Ok(m)) = (h.parse::<i64>(), m.parse::<i64>()) {
                if h <= 23 && m <= 59 {
                    return Some((h, m));
                }
            }
        }

        // "15h" / "15h30"
        if let Some(rest) = token.strip_suffix('h').map(|t| (t, "0")).or_else(|| {
            token
                .find('h')
                .map(|pos| (&token[..pos], &token[pos + 1..]))
        }) {
            let (h_str, m_str) = rest;
            if let (Ok(h), Ok(m)) = (h_str.parse::<i64>(), m_str.parse::<i64>()) {
                if !h_str.is_empty() && h <= 23 && m <= 59 {
                    return Some((h, m));
                }
            }
        }

        // "às 15" / "as 15"
        if (token == "às" || token == "as") && i + 1 < tokens.len() {
            let next = strip_punctuation(tokens[i + 1]);
            if let Ok(h) = next.parse::<i64>() {
                if h <= 23 {
                    return Some((h, 0));
                }
            }
        }
    }

    None
}

/// Resolve a Portuguese relative expression against the local "now".
fn parse_relative(expr: &str, now: i64, tz_offset: i32) -> Option<ResolvedDate> {
    let lower = expr.to_lowercase();
    let day_delta = extract_relative_day(&lower);
    let time = extract_time_of_day(&lower);

    if day_delta.is_none() && time.is_none() {
        return None;
    }

    let offset_secs = (tz_offset as i64) * 3600;
    let local_now = now + offset_secs;
    let base_days = local_now.div_euclid(86400) + day_delta.unwrap_or(0);

    let (hour, minute, explicit_time) = match time {
        Some((h, m)) => (h, m, true),
        None => (9, 0, false),
    };

    let local = base_days * 86400 + hour * 3600 + minute * 60;
    Some(ResolvedDate {
        ts: local - offset_secs,
        explicit_time,
    })
}

// ─── Roll-forward ────────────────────────────────────────────────────

/// Advance a local timestamp by one calendar month, clamping the day.
fn add_month_local(ts: i64, tz_offset: i32) -> i64 {
    let offset_secs = (tz_offset as i64) * 3600;
    let local = ts + offset_secs;
    let days = local.div_euclid(86400);
    let tod = local.rem_euclid(86400);
    let (mut y, mut m, d) = unix_days_to_date(days);
    m += 1;
    if m > 12 {
        m = 1;
        y += 1;
    }
    let d = d.min(days_in_month(y, m));
    date_to_unix_days(y, m, d) * 86400 + tod - offset_secs
}

/// Push `ts` forward by the recurrence period until it is at least
/// `now + MIN_LEAD_SECS`. Fixed-size periods jump in one step; the monthly
/// advance is a bounded loop.
pub fn advance_until_future(mut ts: i64, recorrencia: &str, now: i64, tz_offset: i32) -> i64 {
    let min_ts = now + MIN_LEAD_SECS;
    if ts >= min_ts {
        return ts;
    }

    match recorrencia {
        "Semanal" => {
            let period = 7 * 86400;
            let deficit = min_ts - ts;
            ts + ((deficit + period - 1) / period) * period
        }
        "Mensal" => {
            for _ in 0..600 {
                ts = add_month_local(ts, tz_offset);
                if ts >= min_ts {
                    return ts;
                }
            }
            ts
        }
        // "Diario" and "Unico" both snap to the same time on a later day.
        _ => {
            let period = 86400;
            let deficit = min_ts - ts;
            ts + ((deficit + period - 1) / period) * period
        }
    }
}

/// Resolve a date expression plus recurrence into a future timestamp.
///
/// Tries ISO parsing first, then Portuguese relative phrases. Returns
/// `None` when nothing usable can be extracted — the caller reports an
/// explicit error instead of defaulting to an unintended time.
pub fn resolve_reminder_time(
    expr: &str,
    recorrencia: &str,
    now: i64,
    tz_offset: i32,
) -> Option<ResolvedDate> {
    let parsed = parse_iso(expr, tz_offset).or_else(|| parse_relative(expr, now, tz_offset))?;
    Some(ResolvedDate {
        ts: advance_until_future(parsed.ts, recorrencia, now, tz_offset),
        explicit_time: parsed.explicit_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TZ: i32 = -3;

    /// Local wall-clock time to UTC unix seconds.
    fn local_ts(y: i64, m: i64, d: i64, h: i64, min: i64) -> i64 {
        date_to_unix_days(y, m, d) * 86400 + h * 3600 + min * 60 - (TZ as i64) * 3600
    }

    #[test]
    fn test_civil_date_roundtrip() {
        for &(y, m, d) in &[(1970, 1, 1), (2000, 2, 29), (2026, 8, 7), (2026, 12, 31)] {
            let days = date_to_unix_days(y, m, d);
            assert_eq!(unix_days_to_date(days), (y, m, d));
        }
    }

    #[test]
    fn test_format_iso_local() {
        let ts = local_ts(2026, 8, 7, 15, 30);
        assert_eq!(format_iso_local(ts, TZ), "2026-08-07T15:30:00");
        assert_eq!(format_date_local(ts, TZ), "2026-08-07");
    }

    #[test]
    fn test_parse_iso_variants() {
        let now = local_ts(2026, 8, 1, 10, 0);
        for expr in ["2026-08-07T15:30", "2026-08-07 15:30", "2026-08-07T15:30:00"] {
            let resolved = resolve_reminder_time(expr, "Unico", now, TZ).unwrap();
            assert_eq!(resolved.ts, local_ts(2026, 8, 7, 15, 30), "expr: {expr}");
            assert!(resolved.explicit_time);
        }

        let date_only = resolve_reminder_time("2026-08-07", "Unico", now, TZ).unwrap();
        assert!(!date_only.explicit_time);
    }

    #[test]
    fn test_amanha_as_15h() {
        // Current time "hoje 20h" → "amanhã às 15h" resolves to tomorrow 15:00.
        let now = local_ts(2026, 8, 7, 20, 0);
        let resolved = resolve_reminder_time("amanhã às 15h", "Unico", now, TZ).unwrap();
        assert_eq!(resolved.ts, local_ts(2026, 8, 8, 15, 0));
        assert!(resolved.explicit_time);
    }

    #[test]
    fn test_time_of_day_phrases() {
        let now = local_ts(2026, 8, 7, 8, 0);
        let cases = [
            ("hoje ao meio dia", (12, 0)),
            ("hoje às 15:45", (15, 45)),
            ("hoje 18h30", (18, 30)),
            ("amanhã à meia noite", (0, 0)),
        ];
        for (expr, (h, m)) in cases {
            let resolved = resolve_reminder_time(expr, "Unico", now, TZ).unwrap();
            let local = resolved.ts + (TZ as i64) * 3600;
            let tod = local.rem_euclid(86400);
            assert_eq!((tod / 3600, (tod % 3600) / 60), (h, m), "expr: {expr}");
        }
    }

    #[test]
    fn test_past_time_rolls_to_next_day_for_unico() {
        // "às 15h" at 20h has already passed → same hour next day.
        let now = local_ts(2026, 8, 7, 20, 0);
        let resolved = resolve_reminder_time("às 15h", "Unico", now, TZ).unwrap();
        assert_eq!(resolved.ts, local_ts(2026, 8, 8, 15, 0));
    }

    #[test]
    fn test_min_lead_is_enforced() {
        // 15:00 is only 10 minutes ahead of 14:50 → pushed a day forward.
        let now = local_ts(2026, 8, 7, 14, 50);
        let resolved = resolve_reminder_time("hoje às 15h", "Unico", now, TZ).unwrap();
        assert!(resolved.ts >= now + MIN_LEAD_SECS);
        assert_eq!(resolved.ts, local_ts(2026, 8, 8, 15, 0));
    }

    #[test]
    fn test_ontem_never_resolves_to_past() {
        let now = local_ts(2026, 8, 7, 10, 0);
        for rec in ["Unico", "Diario", "Semanal", "Mensal"] {
            let resolved = resolve_reminder_time("ontem às 9h", rec, now, TZ).unwrap();
            assert!(resolved.ts >= now + MIN_LEAD_SECS, "recorrencia: {rec}");
        }
    }

    #[test]
    fn test_weekly_advance_keeps_weekday() {
        let now = local_ts(2026, 8, 7, 10, 0);
        let resolved = resolve_reminder_time("2026-07-01T09:00", "Semanal", now, TZ).unwrap();
        assert!(resolved.ts >= now + MIN_LEAD_SECS);
        let weeks = (resolved.ts - local_ts(2026, 7, 1, 9, 0)) % (7 * 86400);
        assert_eq!(weeks, 0);
    }

    #[test]
    fn test_monthly_advance_clamps_day() {
        // Jan 31 + 1 month → Feb 28 (2026 is not a leap year).
        let ts = local_ts(2026, 1, 31, 9, 0);
        let advanced = add_month_local(ts, TZ);
        assert_eq!(format_iso_local(advanced, TZ), "2026-02-28T09:00:00");
    }

    #[test]
    fn test_distant_past_terminates_quickly() {
        // A years-old date still resolves in bounded time, same time of day.
        let now = local_ts(2026, 8, 7, 10, 0);
        let resolved = resolve_reminder_time("2020-01-01T07:30", "Diario", now, TZ).unwrap();
        assert!(resolved.ts >= now + MIN_LEAD_SECS);
        assert_eq!((resolved.ts - local_ts(2020, 1, 1, 7, 30)) % 86400, 0);
    }

    #[test]
    fn test_unparseable_returns_none() {
        let now = local_ts(2026, 8, 7, 10, 0);
        assert!(resolve_reminder_time("qualquer hora dessas", "Unico", now, TZ).is_none());
        assert!(resolve_reminder_time("", "Unico", now, TZ).is_none());
    }

    #[test]
    fn test_invalid_iso_rejected() {
        let now = local_ts(2026, 8, 7, 10, 0);
        assert!(resolve_reminder_time("2026-02-30T10:00", "Unico", now, TZ).is_none());
        assert!(resolve_reminder_time("2026-13-01", "Unico", now, TZ).is_none());
    }
}
