//! Retry counter header handling

use lapin::types::{AMQPValue, FieldTable};

/// Header carrying the number of manual republishes
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";

/// Read the retry counter, defaulting to 0 when absent or unreadable
///
/// Publishers in other languages pick whatever integer width fits the
/// value, so every integer type is accepted. Floats are truncated and
/// numeric strings are accepted too; negative values count as 0.
pub fn read_attempt_count(headers: &FieldTable) -> u32 {
    let Some(value) = headers.inner().get(RETRY_COUNT_HEADER) else {
        return 0;
    };

    let count: i64 = match value {
        AMQPValue::ShortShortInt(v) => i64::from(*v),
        AMQPValue::ShortShortUInt(v) => i64::from(*v),
        AMQPValue::ShortInt(v) => i64::from(*v),
        AMQPValue::ShortUInt(v) => i64::from(*v),
        AMQPValue::LongInt(v) => i64::from(*v),
        AMQPValue::LongUInt(v) => i64::from(*v),
        AMQPValue::LongLongInt(v) => *v,
        AMQPValue::Float(v) => float_count(f64::from(*v)),
        AMQPValue::Double(v) => float_count(*v),
        AMQPValue::ShortString(s) => s.as_str().trim().parse().unwrap_or(0),
        AMQPValue::LongString(s) => String::from_utf8_lossy(s.as_bytes())
            .trim()
            .parse()
            .unwrap_or(0),
        _ => 0,
    };

    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn float_count(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

/// Return `headers` with the retry counter set to `count`
pub fn with_attempt_count(mut headers: FieldTable, count: u32) -> FieldTable {
    let value = i32::try_from(count)
        .map(AMQPValue::LongInt)
        .unwrap_or(AMQPValue::LongLongInt(i64::from(count)));
    headers.insert(RETRY_COUNT_HEADER.into(), value);
    headers
}
