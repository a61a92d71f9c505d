use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use duckdb::types::{TimeUnit, Value};
use serde_json::{Number, Value as Json};

// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converts a DuckDB cell into the JSON scalar handed to callers.
pub fn to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(v) => Json::from(v),
        Value::SmallInt(v) => Json::from(v),
        Value::Int(v) => Json::from(v),
        Value::BigInt(v) => Json::from(v),
        Value::HugeInt(v) => match i64::try_from(v) {
            Ok(small) => Json::from(small),
            Err(_) => float(v as f64),
        },
        Value::UTinyInt(v) => Json::from(v),
        Value::USmallInt(v) => Json::from(v),
        Value::UInt(v) => Json::from(v),
        Value::UBigInt(v) => Json::from(v),
        Value::Float(v) => float(f64::from(v)),
        Value::Double(v) => float(v),
        Value::Decimal(d) => match d.to_string().parse::<f64>() {
            Ok(v) => float(v),
            Err(_) => Json::String(d.to_string()),
        },
        Value::Text(s) => Json::String(s),
        Value::Enum(s) => Json::String(s),
        Value::Blob(bytes) => Json::String(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
        Value::Date32(days) => date(days),
        Value::Timestamp(unit, v) => timestamp(unit, v),
        Value::Time64(unit, v) => time(unit, v),
        Value::Interval {
            months,
            days,
            nanos,
        } => Json::String(interval(months, days, nanos)),
        Value::List(items) | Value::Array(items) => {
            Json::Array(items.into_iter().map(to_json).collect())
        }
        Value::Struct(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, v)| (name.clone(), to_json(v.clone())))
                .collect(),
        ),
        // JSON keys are strings, so non-text map keys use their JSON rendering
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match to_json(k.clone()) {
                        Json::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, to_json(v.clone()))
                })
                .collect(),
        ),
        Value::Union(inner) => to_json(*inner),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 || n == -1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Renders like DuckDB does: `1 year 2 months 3 days 04:05:06`.
fn interval(months: i32, days: i32, nanos: i64) -> String {
    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        parts.push(plural(years.into(), "year"));
    }
    if months != 0 {
        parts.push(plural(months.into(), "month"));
    }
    if days != 0 {
        parts.push(plural(days.into(), "day"));
    }
    if nanos != 0 || parts.is_empty() {
        let sign = if nanos < 0 { "-" } else { "" };
        let micros = (nanos / 1_000).unsigned_abs();
        let (secs, frac) = (micros / 1_000_000, micros % 1_000_000);
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs % 3600 / 60,
            secs % 60
        );
        if frac != 0 {
            clock.push_str(&format!(".{:06}", frac));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

fn float(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

fn to_micros(unit: TimeUnit, v: i64) -> i64 {
    match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    }
}

fn date(days: i32) -> Json {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| Json::from(days))
}

fn timestamp(unit: TimeUnit, v: i64) -> Json {
    DateTime::from_timestamp_micros(to_micros(unit, v))
        .map(|ts| Json::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        .unwrap_or_else(|| Json::from(v))
}

fn time(unit: TimeUnit, v: i64) -> Json {
    let micros = to_micros(unit, v);
    let secs = micros.div_euclid(1_000_000);
    let nanos = micros.rem_euclid(1_000_000) * 1_000;
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos as u32))
        .map(|t| Json::String(t.format("%H:%M:%S%.f").to_string()))
        .unwrap_or_else(|| Json::from(v))
}
