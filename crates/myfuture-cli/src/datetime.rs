use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  Local,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "MYFUTURE_TIMEZONE";

/// Zone used to read and print
/// wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
  Local,
  Named(Tz)
}

impl Zone {
  /// `MYFUTURE_TIMEZONE` wins over the
  /// `timezone` config key. Unknown
  /// ids are logged and ignored.
  pub fn resolve(cfg: &Config) -> Self {
    let candidates = [
      std::env::var(TIMEZONE_ENV_VAR)
        .ok()
        .map(|raw| {
          (raw, TIMEZONE_ENV_VAR)
        }),
      cfg.get("timezone").map(|raw| {
        (raw, "config:timezone")
      })
    ];

    for (raw, source) in
      candidates.into_iter().flatten()
    {
      let trimmed = raw.trim();
      if trimmed.is_empty() {
        continue;
      }
      match trimmed.parse::<Tz>() {
        | Ok(tz) => {
          tracing::info!(
            source,
            timezone = %trimmed,
            "configured timezone"
          );
          return Zone::Named(tz);
        }
        | Err(err) => {
          tracing::error!(
            source,
            timezone = %trimmed,
            error = %err,
            "failed to parse timezone id"
          );
        }
      }
    }

    Zone::Local
  }

  pub fn format(
    self,
    dt: DateTime<Utc>,
    fmt: &str
  ) -> String {
    match self {
      | Zone::Local => dt
        .with_timezone(&Local)
        .format(fmt)
        .to_string(),
      | Zone::Named(tz) => dt
        .with_timezone(&tz)
        .format(fmt)
        .to_string()
    }
  }

  pub fn today(
    self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Zone::Local => now
        .with_timezone(&Local)
        .date_naive(),
      | Zone::Named(tz) => now
        .with_timezone(&tz)
        .date_naive()
    }
  }

  /// Interprets a wall-clock time in
  /// this zone. Ambiguous times pick
  /// the earlier instant.
  pub fn localize(
    self,
    naive: NaiveDateTime
  ) -> anyhow::Result<DateTime<Utc>> {
    match self {
      | Zone::Local => {
        pick_earliest(
          Local.from_local_datetime(
            &naive
          ),
          naive
        )
      }
      | Zone::Named(tz) => {
        pick_earliest(
          tz.from_local_datetime(
            &naive
          ),
          naive
        )
      }
    }
  }
}

fn pick_earliest<T: TimeZone>(
  result: LocalResult<DateTime<T>>,
  naive: NaiveDateTime
) -> anyhow::Result<DateTime<Utc>> {
  match result {
    | LocalResult::Single(dt) => {
      Ok(dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        %naive,
        "ambiguous local datetime; using earliest"
      );
      let first = first.with_timezone(&Utc);
      let second =
        second.with_timezone(&Utc);
      Ok(first.min(second))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local time {naive} does not \
         exist in the configured \
         timezone"
      ))
    }
  }
}

/// Parses a due-date argument.
///
/// `none`, `clear` and the empty
/// string clear the date. Dates without
/// a time resolve to midnight in
/// `zone`.
#[tracing::instrument(
  skip(now, zone),
  fields(input = input)
)]
pub fn parse_due_expr(
  input: &str,
  now: DateTime<Utc>,
  zone: Zone
) -> anyhow::Result<Option<DateTime<Utc>>>
{
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "" | "none" | "clear" => {
      return Ok(None);
    }
    | "now" => return Ok(Some(now)),
    | "today" => {
      return midnight(
        zone.today(now),
        zone
      )
      .map(Some);
    }
    | "tomorrow" => {
      let date = zone
        .today(now)
        .succ_opt()
        .ok_or_else(|| {
          anyhow!(
            "no date after today"
          )
        })?;
      return midnight(date, zone)
        .map(Some);
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?:\+|in\s+)(?P<num>\d+)\s*(?P<unit>m|mins?|minutes?|h|hrs?|hours?|d|days?|w|weeks?)$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let duration = match &caps["unit"]
    {
      | "m" | "min" | "mins"
      | "minute" | "minutes" => {
        Duration::try_minutes(num)
      }
      | "h" | "hr" | "hrs" | "hour"
      | "hours" => Duration::try_hours(num),
      | "d" | "day" | "days" => {
        Duration::try_days(num)
      }
      | "w" | "week" | "weeks" => {
        Duration::try_weeks(num)
      }
      | unit => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset too large: \
         {token}"
      )
    })?;

    return now
      .checked_add_signed(duration)
      .map(Some)
      .ok_or_else(|| {
        anyhow!(
          "due date out of range: \
           {token}"
        )
      });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(Some(
      dt.with_timezone(&Utc)
    ));
  }

  for fmt in [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S"
  ] {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return zone
        .localize(naive)
        .map(Some);
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return midnight(date, zone)
      .map(Some);
  }

  Err(anyhow!(
    "unrecognized due date '{token}' \
     (try YYYY-MM-DD, \"YYYY-MM-DD \
     HH:MM\", today, tomorrow, +2h, \
     +3d or none)"
  ))
}

fn midnight(
  date: NaiveDate,
  zone: Zone
) -> anyhow::Result<DateTime<Utc>> {
  let naive = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct midnight"
      )
    })?;
  zone.localize(naive)
}
