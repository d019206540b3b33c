use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::metadata::ColumnMetadata;
use crate::protocol::primitive::*;
use crate::value::{Date, Datetime, TimeValue, Value};

/// Decode one text-protocol row into `out`, which is cleared first.
///
/// Every field is a length-encoded string, except that a leading `0xFB` byte
/// denotes SQL NULL. The packet must be fully consumed.
pub fn decode_text_row<'a>(
    payload: &'a [u8],
    meta: &[ColumnMetadata],
    out: &mut Vec<Value<'a>>,
) -> Result<()> {
    out.clear();
    let mut data = payload;
    for column in meta {
        if data.first() == Some(&LENENC_NULL) {
            data = &data[1..];
            out.push(Value::Null);
        } else {
            let (field, rest) = read_string_lenenc(data)?;
            data = rest;
            out.push(decode_text_field(field, column)?);
        }
    }
    check_extra_bytes(data)
}

/// Parse a single text field against the column's derived type.
pub fn decode_text_field<'a>(bytes: &'a [u8], meta: &ColumnMetadata) -> Result<Value<'a>> {
    match meta.column_type() {
        ColumnType::Tinyint
        | ColumnType::Smallint
        | ColumnType::Mediumint
        | ColumnType::Int
        | ColumnType::Bigint => {
            if meta.is_unsigned() {
                Ok(Value::UInt(parse_u64_ascii(bytes)?))
            } else {
                Ok(Value::Int(parse_i64_ascii(bytes)?))
            }
        }
        ColumnType::Year => Ok(Value::UInt(parse_u64_ascii(bytes)?)),
        ColumnType::Float => {
            let parsed: f32 = parse_float(bytes)?;
            Ok(Value::Float(parsed))
        }
        ColumnType::Double => {
            let parsed: f64 = parse_float(bytes)?;
            Ok(Value::Double(parsed))
        }
        ColumnType::Date => parse_text_date(bytes),
        ColumnType::Datetime | ColumnType::Timestamp => {
            parse_text_datetime(bytes, meta.decimals())
        }
        ColumnType::Time => parse_text_time(bytes, meta.decimals()),
        // bit, decimal, enum, set, json, geometry and all string variants
        // pass through as opaque bytes
        _ => Ok(Value::Bytes(bytes)),
    }
}

fn ascii_digits(bytes: &[u8]) -> Result<u64> {
    // zerofill columns pad with leading zeros, so only overflow bounds the
    // digit count
    if bytes.is_empty() {
        return Err(Error::ProtocolValueError);
    }
    let mut value: u64 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(Error::ProtocolValueError);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((byte - b'0') as u64))
            .ok_or(Error::ProtocolValueError)?;
    }
    Ok(value)
}

fn parse_u64_ascii(bytes: &[u8]) -> Result<u64> {
    // unsigned columns never produce a minus sign
    ascii_digits(bytes)
}

fn parse_i64_ascii(bytes: &[u8]) -> Result<i64> {
    if let Some(rest) = bytes.strip_prefix(b"-") {
        let magnitude = ascii_digits(rest)?;
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(Error::ProtocolValueError);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        let magnitude = ascii_digits(bytes)?;
        i64::try_from(magnitude).map_err(|_| Error::ProtocolValueError)
    }
}

trait FiniteFloat: std::str::FromStr {
    fn is_finite_value(&self) -> bool;
}

impl FiniteFloat for f32 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl FiniteFloat for f64 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

fn parse_float<T: FiniteFloat>(bytes: &[u8]) -> Result<T> {
    let text = simdutf8::basic::from_utf8(bytes).map_err(|_| Error::ProtocolValueError)?;
    let parsed: T = text.parse().map_err(|_| Error::ProtocolValueError)?;
    // the server never emits inf/nan in standards-compliant mode
    if !parsed.is_finite_value() {
        return Err(Error::ProtocolValueError);
    }
    Ok(parsed)
}

fn fixed_digits(bytes: &[u8]) -> Result<u32> {
    let mut value = 0u32;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(Error::ProtocolValueError);
        }
        value = value * 10 + (byte - b'0') as u32;
    }
    Ok(value)
}

/// Parse the zero-padded `YYYY-MM-DD` core and return the raw components.
fn parse_date_components(bytes: &[u8]) -> Result<(u32, u32, u32)> {
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(Error::ProtocolValueError);
    }
    let year = fixed_digits(&bytes[0..4])?;
    let month = fixed_digits(&bytes[5..7])?;
    let day = fixed_digits(&bytes[8..10])?;
    Ok((year, month, day))
}

fn parse_text_date(bytes: &[u8]) -> Result<Value<'static>> {
    let (year, month, day) = parse_date_components(bytes)?;
    // zero or out-of-calendar components surface as NULL, not as an error
    match Date::new(year as u16, month as u8, day as u8) {
        Ok(date) => Ok(Value::Date(date)),
        Err(_) => Ok(Value::Null),
    }
}

/// Parse `.ffffff` with exactly `decimals` digits, scaled to microseconds.
fn parse_fraction(bytes: &[u8], decimals: u8) -> Result<u32> {
    let decimals = decimals.min(6) as usize;
    if decimals == 0 {
        return if bytes.is_empty() {
            Ok(0)
        } else {
            Err(Error::ProtocolValueError)
        };
    }
    if bytes.len() != decimals + 1 || bytes[0] != b'.' {
        return Err(Error::ProtocolValueError);
    }
    let digits = fixed_digits(&bytes[1..])?;
    Ok(digits * 10u32.pow(6 - decimals as u32))
}

fn parse_text_datetime(bytes: &[u8], decimals: u8) -> Result<Value<'static>> {
    if bytes.len() < 19 || bytes[10] != b' ' || bytes[13] != b':' || bytes[16] != b':' {
        return Err(Error::ProtocolValueError);
    }
    let (year, month, day) = parse_date_components(&bytes[..10])?;
    let hour = fixed_digits(&bytes[11..13])?;
    let minute = fixed_digits(&bytes[14..16])?;
    let second = fixed_digits(&bytes[17..19])?;
    let microsecond = parse_fraction(&bytes[19..], decimals)?;

    let date = match Date::new(year as u16, month as u8, day as u8) {
        Ok(date) => date,
        Err(_) => return Ok(Value::Null),
    };
    match Datetime::new(date, hour as u8, minute as u8, second as u8, microsecond) {
        Ok(datetime) => Ok(Value::Datetime(datetime)),
        Err(_) => Ok(Value::Null),
    }
}

fn parse_text_time(bytes: &[u8], decimals: u8) -> Result<Value<'static>> {
    let (negative, rest) = match bytes.strip_prefix(b"-") {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };

    let colon = rest
        .iter()
        .position(|&b| b == b':')
        .ok_or(Error::ProtocolValueError)?;
    if colon == 0 || colon > 3 || rest.len() < colon + 6 {
        return Err(Error::ProtocolValueError);
    }
    let hours = fixed_digits(&rest[..colon])?;
    if rest[colon + 3] != b':' {
        return Err(Error::ProtocolValueError);
    }
    let minutes = fixed_digits(&rest[colon + 1..colon + 3])?;
    let seconds = fixed_digits(&rest[colon + 4..colon + 6])?;
    let microsecond = parse_fraction(&rest[colon + 6..], decimals)?;

    if hours > 838 || minutes > 59 || seconds > 59 {
        return Err(Error::ProtocolValueError);
    }

    let magnitude = (hours as i64 * 3600 + minutes as i64 * 60 + seconds as i64) * 1_000_000
        + microsecond as i64;
    let micros = if negative { -magnitude } else { magnitude };
    Ok(Value::Time(TimeValue::from_microseconds(micros)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ProtocolFieldType};
    use crate::testutil::meta;

    fn int_meta(unsigned: bool) -> ColumnMetadata {
        let flags = if unsigned {
            ColumnFlags::UNSIGNED_FLAG
        } else {
            ColumnFlags::empty()
        };
        meta(ProtocolFieldType::Longlong, flags, 63, 0)
    }

    #[test]
    fn integers() {
        let signed = int_meta(false);
        assert_eq!(decode_text_field(b"0", &signed).unwrap(), Value::Int(0));
        assert_eq!(decode_text_field(b"-42", &signed).unwrap(), Value::Int(-42));
        assert_eq!(
            decode_text_field(b"9223372036854775807", &signed).unwrap(),
            Value::Int(i64::MAX)
        );
        assert_eq!(
            decode_text_field(b"-9223372036854775808", &signed).unwrap(),
            Value::Int(i64::MIN)
        );
        assert!(decode_text_field(b"9223372036854775808", &signed).is_err());
        assert!(decode_text_field(b"", &signed).is_err());
        assert!(decode_text_field(b"1x", &signed).is_err());

        let unsigned = int_meta(true);
        assert_eq!(
            decode_text_field(b"18446744073709551615", &unsigned).unwrap(),
            Value::UInt(u64::MAX)
        );
        // unsigned columns reject a minus sign
        assert!(decode_text_field(b"-1", &unsigned).is_err());
        assert!(decode_text_field(b"18446744073709551616", &unsigned).is_err());
    }

    #[test]
    fn year_is_unsigned() {
        let year = meta(
            ProtocolFieldType::Year,
            ColumnFlags::UNSIGNED_FLAG,
            63,
            0,
        );
        assert_eq!(decode_text_field(b"2024", &year).unwrap(), Value::UInt(2024));
    }

    #[test]
    fn floats_strict() {
        let float = meta(ProtocolFieldType::Float, ColumnFlags::empty(), 63, 31);
        assert_eq!(
            decode_text_field(b"-1.5", &float).unwrap(),
            Value::Float(-1.5)
        );
        assert!(decode_text_field(b"inf", &float).is_err());
        assert!(decode_text_field(b"nan", &float).is_err());
        assert!(decode_text_field(b"1e999", &float).is_err());
        assert!(decode_text_field(b"abc", &float).is_err());

        let double = meta(ProtocolFieldType::Double, ColumnFlags::empty(), 63, 31);
        assert_eq!(
            decode_text_field(b"2.25e2", &double).unwrap(),
            Value::Double(225.0)
        );
    }

    #[test]
    fn dates() {
        let date = meta(ProtocolFieldType::Date, ColumnFlags::empty(), 63, 0);
        assert_eq!(
            decode_text_field(b"2024-02-29", &date).unwrap(),
            Value::Date(Date::new(2024, 2, 29).unwrap())
        );
        // zero components surface as NULL
        assert_eq!(decode_text_field(b"0000-00-00", &date).unwrap(), Value::Null);
        assert_eq!(decode_text_field(b"2024-00-10", &date).unwrap(), Value::Null);
        assert_eq!(decode_text_field(b"2023-02-29", &date).unwrap(), Value::Null);
        // format violations are protocol errors
        assert!(decode_text_field(b"2024-2-29", &date).is_err());
        assert!(decode_text_field(b"2024-02-29 ", &date).is_err());
        assert!(decode_text_field(b"2024/02/29", &date).is_err());
    }

    #[test]
    fn datetimes() {
        let dt0 = meta(ProtocolFieldType::Datetime, ColumnFlags::empty(), 63, 0);
        assert_eq!(
            decode_text_field(b"2024-12-25 15:30:45", &dt0).unwrap(),
            Value::Datetime(
                Datetime::new(Date::new(2024, 12, 25).unwrap(), 15, 30, 45, 0).unwrap()
            )
        );
        // trailing garbage and wrong fraction width rejected
        assert!(decode_text_field(b"2024-12-25 15:30:45 ", &dt0).is_err());
        assert!(decode_text_field(b"2024-12-25 15:30:45.1", &dt0).is_err());

        let dt3 = meta(ProtocolFieldType::Datetime, ColumnFlags::empty(), 63, 3);
        assert_eq!(
            decode_text_field(b"2024-12-25 15:30:45.120", &dt3).unwrap(),
            Value::Datetime(
                Datetime::new(Date::new(2024, 12, 25).unwrap(), 15, 30, 45, 120_000).unwrap()
            )
        );
        assert!(decode_text_field(b"2024-12-25 15:30:45.1200", &dt3).is_err());
        assert!(decode_text_field(b"2024-12-25 15:30:45", &dt3).is_err());

        // zero or out-of-range components surface as NULL
        assert_eq!(
            decode_text_field(b"0000-00-00 00:00:00", &dt0).unwrap(),
            Value::Null
        );
        assert_eq!(
            decode_text_field(b"2024-12-00 10:00:00", &dt0).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn times() {
        let t0 = meta(ProtocolFieldType::Time, ColumnFlags::empty(), 63, 0);
        assert_eq!(
            decode_text_field(b"00:00:00", &t0).unwrap(),
            Value::Time(TimeValue::from_microseconds(0).unwrap())
        );
        assert_eq!(
            decode_text_field(b"-838:59:59", &t0).unwrap(),
            Value::Time(TimeValue::from_microseconds(-3_020_399_000_000).unwrap())
        );
        assert!(decode_text_field(b"839:00:00", &t0).is_err());
        assert!(decode_text_field(b"10:60:00", &t0).is_err());
        assert!(decode_text_field(b"10:00:60", &t0).is_err());
        assert!(decode_text_field(b"10:00", &t0).is_err());

        let t6 = meta(ProtocolFieldType::Time, ColumnFlags::empty(), 63, 6);
        assert_eq!(
            decode_text_field(b"1:02:03.000456", &t6).unwrap(),
            Value::Time(TimeValue::from_microseconds(3_723_000_456).unwrap())
        );
        assert!(decode_text_field(b"1:02:03", &t6).is_err());
    }

    #[test]
    fn opaque_passthrough() {
        let decimal = meta(ProtocolFieldType::Newdecimal, ColumnFlags::empty(), 63, 2);
        assert_eq!(
            decode_text_field(b"3.14", &decimal).unwrap(),
            Value::Bytes(b"3.14")
        );
        let json = meta(ProtocolFieldType::Json, ColumnFlags::empty(), 63, 0);
        assert_eq!(
            decode_text_field(b"[1,2]", &json).unwrap(),
            Value::Bytes(b"[1,2]")
        );
    }

    #[test]
    fn row_decoding() {
        let columns = [
            int_meta(false),
            meta(ProtocolFieldType::VarString, ColumnFlags::empty(), 33, 0),
        ];
        let mut payload = Vec::new();
        write_string_lenenc(&mut payload, "123");
        payload.push(LENENC_NULL);

        let mut out = Vec::new();
        decode_text_row(&payload, &columns, &mut out).unwrap();
        assert_eq!(out, vec![Value::Int(123), Value::Null]);
    }

    #[test]
    fn row_with_extra_bytes_rejected() {
        let columns = [int_meta(false)];
        let mut payload = Vec::new();
        write_string_lenenc(&mut payload, "1");
        payload.push(0x00);

        let mut out = Vec::new();
        assert!(matches!(
            decode_text_row(&payload, &columns, &mut out),
            Err(Error::ExtraBytes)
        ));
    }

    #[test]
    fn truncated_row_rejected() {
        let columns = [int_meta(false), int_meta(false)];
        let mut payload = Vec::new();
        write_string_lenenc(&mut payload, "1");

        let mut out = Vec::new();
        assert!(matches!(
            decode_text_row(&payload, &columns, &mut out),
            Err(Error::IncompleteMessage)
        ));
    }
}
