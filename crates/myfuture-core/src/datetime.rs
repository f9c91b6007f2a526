use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  TimeZone,
  Utc
};

pub const DUE_SOON_WINDOW_HOURS: i64 =
  24;

#[must_use]
pub fn due_soon_window() -> Duration {
  Duration::hours(
    DUE_SOON_WINDOW_HOURS
  )
}

/// Formats an instant the way the
/// persisted snapshot stores due dates:
/// RFC 3339, UTC, millisecond precision.
#[must_use]
pub fn format_iso(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

/// Lenient parse of a stored due date.
///
/// Accepts RFC 3339 with any offset, a
/// naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) and a bare date
/// (midnight UTC). Empty input is `None`.
#[must_use]
pub fn parse_iso(
  raw: &str
) -> Option<DateTime<Utc>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(
      trimmed
    )
  {
    return Some(
      dt.with_timezone(&Utc)
    );
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        trimmed, fmt
      )
    {
      return Some(
        Utc.from_utc_datetime(&naive)
      );
    }
  }

  NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  )
  .ok()
  .and_then(|date| {
    date.and_hms_opt(0, 0, 0)
  })
  .map(|naive| {
    Utc.from_utc_datetime(&naive)
  })
}

#[must_use]
pub fn from_millis(
  millis: i64
) -> Option<DateTime<Utc>> {
  DateTime::<Utc>::from_timestamp_millis(
    millis
  )
}

pub mod iso_date_serde {
  pub mod option {
    use chrono::{
      DateTime,
      Utc
    };
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    use crate::datetime::{
      format_iso,
      from_millis,
      parse_iso
    };

    pub fn serialize<S>(
      dt: &Option<DateTime<Utc>>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(value) => {
          serializer.serialize_str(
            &format_iso(*value)
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDue {
      Text(String),
      Millis(i64)
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<DateTime<Utc>>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let raw =
        Option::<RawDue>::deserialize(
          deserializer
        )?;
      let parsed = match raw {
        | Some(RawDue::Text(text)) => {
          let parsed = parse_iso(&text);
          if parsed.is_none()
            && !text.trim().is_empty()
          {
            tracing::warn!(
              raw = %text,
              "dropping unparsable due date"
            );
          }
          parsed
        }
        | Some(RawDue::Millis(millis)) => {
          from_millis(millis)
        }
        | None => None
      };
      Ok(parsed)
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    format_iso,
    parse_iso
  };

  #[test]
  fn iso_format_matches_browser_shape()
  {
    let dt = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 9, 30, 0
      )
      .unwrap();
    assert_eq!(
      format_iso(dt),
      "2026-10-18T09:30:00.000Z"
    );
  }

  #[test]
  fn parse_accepts_offsets_and_bare_dates()
  {
    let expected = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 7, 30, 0
      )
      .unwrap();
    assert_eq!(
      parse_iso(
        "2026-10-18T09:30:00+02:00"
      ),
      Some(expected)
    );
    assert_eq!(
      parse_iso("2026-10-18T07:30:00"),
      Some(expected)
    );
    assert_eq!(
      parse_iso("2026-10-18"),
      Some(
        Utc
          .with_ymd_and_hms(
            2026, 10, 18, 0, 0, 0
          )
          .unwrap()
      )
    );
    assert_eq!(parse_iso("  "), None);
    assert_eq!(
      parse_iso("next tuesday"),
      None
    );
  }
}
