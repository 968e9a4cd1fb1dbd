use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use regex::Regex;

const COMPACT_FORMAT: &str =
  "%Y%m%dT%H%M%SZ";

/// Midnight UTC of the day containing
/// `now`.
#[must_use]
pub fn start_of_day(
  now: DateTime<Utc>
) -> DateTime<Utc> {
  midnight(now.date_naive())
}

fn midnight(
  date: NaiveDate
) -> DateTime<Utc> {
  DateTime::<Utc>::from_naive_utc_and_offset(
    date.and_time(
      chrono::NaiveTime::MIN
    ),
    Utc
  )
}

/// Whether a parsed expression named an
/// instant or a whole UTC day.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Granularity {
  Instant,
  Day
}

/// Parses a date expression used by
/// the `--due-from` / `--due-to`
/// flags. Day-granular forms resolve
/// to midnight UTC.
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  parse_with_granularity(input, now)
    .map(|(at, _)| at)
}

/// Like [`parse_date_expr`], but a
/// day-granular form resolves to the
/// last instant of that day, so it can
/// close an inclusive range.
pub fn parse_date_end(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let (at, granularity) =
    parse_with_granularity(input, now)?;
  match granularity {
    | Granularity::Instant => Ok(at),
    | Granularity::Day => {
      at.checked_add_signed(
        Duration::days(1)
          - Duration::nanoseconds(1)
      )
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {}",
          input.trim()
        )
      })
    }
  }
}

pub fn parse_with_granularity(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<(
  DateTime<Utc>,
  Granularity
)> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let out_of_range = || {
    anyhow!(
      "date offset out of range: \
       {token}"
    )
  };

  let day_offset = match lower.as_str()
  {
    | "now" => {
      return Ok((
        now,
        Granularity::Instant
      ));
    }
    | "today" => Some(0),
    | "tomorrow" => Some(1),
    | "yesterday" => Some(-1),
    | "" => {
      return Err(anyhow!(
        "empty date expression"
      ));
    }
    | _ => None
  };
  if let Some(days) = day_offset {
    let day = start_of_day(now)
      .checked_add_signed(
        Duration::days(days)
      )
      .ok_or_else(out_of_range)?;
    return Ok((day, Granularity::Day));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)\s*(?P<unit>[hdw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let amount: i64 = caps["num"]
      .parse()
      .with_context(|| {
        format!(
          "invalid offset in date \
           expression: {token}"
        )
      })?;
    let step = match &caps["unit"] {
      | "h" => Duration::try_hours(amount),
      | "d" => Duration::try_days(amount),
      | _ => Duration::try_weeks(amount)
    }
    .ok_or_else(out_of_range)?;
    let shifted = if &caps["sign"] == "-"
    {
      now.checked_sub_signed(step)
    } else {
      now.checked_add_signed(step)
    };
    return shifted
      .map(|at| {
        (at, Granularity::Instant)
      })
      .ok_or_else(out_of_range);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok((
      dt.with_timezone(&Utc),
      Granularity::Instant
    ));
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      COMPACT_FORMAT
    )
  {
    return Ok((
      DateTime::<Utc>::from_naive_utc_and_offset(
        ndt, Utc
      ),
      Granularity::Instant
    ));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok((
      midnight(date),
      Granularity::Day
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {token}"
  ))
}

/// Serializes as RFC 3339; accepts RFC
/// 3339, the compact
/// `YYYYMMDDTHHMMSSZ` form and bare
/// `YYYY-MM-DD` dates on input.
pub mod flexible_date_serde {
  use chrono::{
    DateTime,
    NaiveDate,
    NaiveDateTime,
    SecondsFormat,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.to_rfc3339_opts(
        SecondsFormat::AutoSi,
        true
      )
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse_stored(&raw)
      .map_err(serde::de::Error::custom)
  }

  pub(crate) fn parse_stored(
    raw: &str
  ) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) =
      DateTime::parse_from_rfc3339(raw)
    {
      return Ok(
        dt.with_timezone(&Utc)
      );
    }
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        raw,
        super::COMPACT_FORMAT
      )
    {
      return Ok(
        DateTime::<Utc>::from_naive_utc_and_offset(
          ndt, Utc
        )
      );
    }
    NaiveDate::parse_from_str(
      raw, "%Y-%m-%d"
    )
    .map(super::midnight)
    .map_err(|err| {
      format!(
        "invalid timestamp '{raw}': \
         {err}"
      )
    })
  }

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

    pub fn serialize<S>(
      dt: &Option<DateTime<Utc>>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
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
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      match opt {
        | Some(raw)
          if !raw.trim().is_empty() =>
        {
          super::parse_stored(&raw)
            .map(Some)
            .map_err(
              serde::de::Error::custom
            )
        }
        | _ => Ok(None)
      }
    }
  }
}
