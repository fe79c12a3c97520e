use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Days,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;

use crate::calendar::parse_compact;
use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "DOCKET_TIMEZONE";

/// Timezone used to decide which
/// calendar day "today" is. `None`
/// means the system local zone.
pub fn resolve_timezone(
  cfg: &Config
) -> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return Some(tz);
  }

  cfg.get("timezone").and_then(|raw| {
    parse_timezone(&raw, "config")
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(
  tz: Option<Tz>,
  now: DateTime<Utc>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(&tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local)
        .date_naive()
    }
  }
}

/// Resolves an as-of expression
/// relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_as_of(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  let shifted = |days: i64| {
    let step = Days::new(days.unsigned_abs());
    let moved = if days < 0 {
      today.checked_sub_days(step)
    } else {
      today.checked_add_days(step)
    };
    moved.ok_or_else(|| {
      anyhow!(
        "date out of range: {input}"
      )
    })
  };

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => return shifted(1),
    | "yesterday" => return shifted(-1),
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(date) =
    parse_compact(token)
  {
    return Ok(date);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input} (supported: today, \
     tomorrow, yesterday, weekday \
     names, YYYYMMDD, YYYY-MM-DD)"
  ))
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// The next `target` strictly after
/// `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday();
  let target_idx =
    target.num_days_from_monday();
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(
      u64::from(delta)
    ))
    .unwrap_or(from)
}
