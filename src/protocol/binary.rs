use crate::constant::ProtocolFieldType;
use crate::error::{Error, Result};
use crate::metadata::ColumnMetadata;
use crate::protocol::primitive::*;
use crate::value::{Date, Datetime, TimeValue, Value};

/// Flag bit in an execute type pair marking the parameter as unsigned.
const PARAM_UNSIGNED_FLAG: u8 = 0x80;

/// Number of bytes in the null bitmap of a binary resultset row: the bitmap
/// is offset by two bit positions.
pub fn row_null_bitmap_len(num_columns: usize) -> usize {
    (num_columns + 7 + 2) / 8
}

fn is_row_null(bitmap: &[u8], index: usize) -> bool {
    let bit = index + 2;
    bitmap[bit / 8] & (1 << (bit % 8)) != 0
}

/// Decode one binary-protocol row into `out`, which is cleared first.
///
/// The packet is a `0x00` header byte, the null bitmap, then packed values
/// for every non-null column in order.
pub fn decode_binary_row<'a>(
    payload: &'a [u8],
    meta: &[ColumnMetadata],
    out: &mut Vec<Value<'a>>,
) -> Result<()> {
    out.clear();
    let (header, data) = read_int_1(payload)?;
    if header != 0x00 {
        return Err(Error::ProtocolValueError);
    }

    let (bitmap, mut data) = read_string_fix(data, row_null_bitmap_len(meta.len()))?;
    for (index, column) in meta.iter().enumerate() {
        if is_row_null(bitmap, index) {
            out.push(Value::Null);
        } else {
            let (value, rest) = decode_binary_field(data, column)?;
            data = rest;
            out.push(value);
        }
    }
    check_extra_bytes(data)
}

/// Truncate a microsecond count to the column's declared fractional-second
/// precision.
fn clamp_micros(micros: u32, decimals: u8) -> u32 {
    let step = 10u32.pow(6 - decimals.min(6) as u32);
    micros - micros % step
}

/// Decode a single packed value per the column's protocol field type.
pub fn decode_binary_field<'a>(
    data: &'a [u8],
    meta: &ColumnMetadata,
) -> Result<(Value<'a>, &'a [u8])> {
    use ProtocolFieldType as P;

    let unsigned = meta.is_unsigned();
    match meta.protocol_type() {
        P::Null => Ok((Value::Null, data)),

        P::Tiny => {
            let (val, rest) = read_int_1(data)?;
            let value = if unsigned {
                Value::UInt(val as u64)
            } else {
                Value::Int(val as i8 as i64)
            };
            Ok((value, rest))
        }
        P::Short | P::Year => {
            let (val, rest) = read_int_2(data)?;
            let value = if unsigned {
                Value::UInt(val as u64)
            } else {
                Value::Int(val as i16 as i64)
            };
            Ok((value, rest))
        }
        P::Int24 | P::Long => {
            let (val, rest) = read_int_4(data)?;
            let value = if unsigned {
                Value::UInt(val as u64)
            } else {
                Value::Int(val as i32 as i64)
            };
            Ok((value, rest))
        }
        P::Longlong => {
            let (val, rest) = read_int_8(data)?;
            let value = if unsigned {
                Value::UInt(val)
            } else {
                Value::Int(val as i64)
            };
            Ok((value, rest))
        }

        P::Float => {
            let (val, rest) = read_int_4(data)?;
            Ok((Value::Float(f32::from_bits(val)), rest))
        }
        P::Double => {
            let (val, rest) = read_int_8(data)?;
            Ok((Value::Double(f64::from_bits(val)), rest))
        }

        P::Date | P::Newdate => decode_binary_date(data),
        P::Datetime | P::Datetime2 | P::Timestamp | P::Timestamp2 => {
            decode_binary_datetime(data, meta.decimals())
        }
        P::Time | P::Time2 => decode_binary_time(data, meta.decimals()),

        // all string-like types are length-encoded byte sequences
        P::Decimal
        | P::Newdecimal
        | P::Varchar
        | P::VarString
        | P::String
        | P::Enum
        | P::Set
        | P::TinyBlob
        | P::MediumBlob
        | P::LongBlob
        | P::Blob
        | P::Bit
        | P::Json
        | P::Geometry
        | P::TypedArray => {
            let (bytes, rest) = read_string_lenenc(data)?;
            Ok((Value::Bytes(bytes), rest))
        }
    }
}

struct RawDatetime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    microsecond: u32,
}

/// Read the length-prefixed compact temporal packing: 0, 4, 7 or 11 bytes of
/// increasing precision. Absent trailing components are zero.
fn read_compact_datetime(data: &[u8]) -> Result<(RawDatetime, &[u8])> {
    let (len, data) = read_int_1(data)?;
    let mut raw = RawDatetime {
        year: 0,
        month: 0,
        day: 0,
        hour: 0,
        minute: 0,
        second: 0,
        microsecond: 0,
    };
    match len {
        0 => Ok((raw, data)),
        4 | 7 | 11 => {
            let (year, rest) = read_int_2(data)?;
            let (month, rest) = read_int_1(rest)?;
            let (day, mut rest) = read_int_1(rest)?;
            raw.year = year;
            raw.month = month;
            raw.day = day;
            if len >= 7 {
                let (hour, r) = read_int_1(rest)?;
                let (minute, r) = read_int_1(r)?;
                let (second, r) = read_int_1(r)?;
                raw.hour = hour;
                raw.minute = minute;
                raw.second = second;
                rest = r;
            }
            if len == 11 {
                let (microsecond, r) = read_int_4(rest)?;
                raw.microsecond = microsecond;
                rest = r;
            }
            Ok((raw, rest))
        }
        _ => Err(Error::ProtocolValueError),
    }
}

fn decode_binary_date(data: &[u8]) -> Result<(Value<'static>, &[u8])> {
    let (len, _) = read_int_1(data)?;
    if len != 0 && len != 4 {
        return Err(Error::ProtocolValueError);
    }
    let (raw, rest) = read_compact_datetime(data)?;
    let value = match Date::new(raw.year, raw.month, raw.day) {
        Ok(date) => Value::Date(date),
        // zero or otherwise invalid components surface as NULL
        Err(_) => Value::Null,
    };
    Ok((value, rest))
}

fn decode_binary_datetime(data: &[u8], decimals: u8) -> Result<(Value<'static>, &[u8])> {
    let (raw, rest) = read_compact_datetime(data)?;
    let date = match Date::new(raw.year, raw.month, raw.day) {
        Ok(date) => date,
        Err(_) => return Ok((Value::Null, rest)),
    };
    let micros = clamp_micros(raw.microsecond, decimals);
    let value = match Datetime::new(date, raw.hour, raw.minute, raw.second, micros) {
        Ok(datetime) => Value::Datetime(datetime),
        Err(_) => Value::Null,
    };
    Ok((value, rest))
}

fn decode_binary_time(data: &[u8], decimals: u8) -> Result<(Value<'static>, &[u8])> {
    let (len, data) = read_int_1(data)?;
    match len {
        0 => Ok((
            Value::Time(TimeValue::from_microseconds(0)?),
            data,
        )),
        8 | 12 => {
            let (negative, rest) = read_int_1(data)?;
            let (days, rest) = read_int_4(rest)?;
            let (hour, rest) = read_int_1(rest)?;
            let (minute, rest) = read_int_1(rest)?;
            let (second, mut rest) = read_int_1(rest)?;
            let mut microsecond = 0;
            if len == 12 {
                let (micros, r) = read_int_4(rest)?;
                microsecond = micros;
                rest = r;
            }
            if hour > 23 {
                return Err(Error::ProtocolValueError);
            }
            let time = TimeValue::from_parts(
                negative == 1,
                days,
                hour,
                minute,
                second,
                clamp_micros(microsecond, decimals),
            )?;
            Ok((Value::Time(time), rest))
        }
        _ => Err(Error::ProtocolValueError),
    }
}

// ============================================================================
// Parameter serialization (COM_STMT_EXECUTE)
// ============================================================================

/// Write the parameter null bitmap: `⌈N/8⌉` bytes, no bit offset.
pub fn write_param_null_bitmap(out: &mut Vec<u8>, params: &[Value<'_>]) {
    let start = out.len();
    out.resize(start + (params.len() + 7) / 8, 0);
    for (index, param) in params.iter().enumerate() {
        if param.is_null() {
            out[start + index / 8] |= 1 << (index % 8);
        }
    }
}

/// Write the `(type, unsigned)` pair for one parameter.
pub fn write_param_type(out: &mut Vec<u8>, param: &Value<'_>) {
    let (ty, flag) = match param {
        Value::Null => (ProtocolFieldType::Null, 0),
        Value::Int(_) => (ProtocolFieldType::Longlong, 0),
        Value::UInt(_) => (ProtocolFieldType::Longlong, PARAM_UNSIGNED_FLAG),
        Value::Bytes(_) => (ProtocolFieldType::String, 0),
        Value::Float(_) => (ProtocolFieldType::Float, 0),
        Value::Double(_) => (ProtocolFieldType::Double, 0),
        Value::Date(_) => (ProtocolFieldType::Date, 0),
        Value::Datetime(_) => (ProtocolFieldType::Datetime, 0),
        Value::Time(_) => (ProtocolFieldType::Time, 0),
    };
    write_int_1(out, ty as u8);
    write_int_1(out, flag);
}

/// Write the packed value of one non-null parameter. Null parameters are
/// carried by the bitmap alone and write nothing here.
pub fn write_param_value(out: &mut Vec<u8>, param: &Value<'_>) {
    match param {
        Value::Null => {}
        Value::Int(v) => write_int_8(out, *v as u64),
        Value::UInt(v) => write_int_8(out, *v),
        Value::Bytes(v) => write_bytes_lenenc(out, v),
        Value::Float(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
        Value::Double(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
        Value::Date(date) => {
            write_int_1(out, 4);
            write_int_2(out, date.year());
            write_int_1(out, date.month());
            write_int_1(out, date.day());
        }
        Value::Datetime(dt) => {
            write_int_1(out, 11);
            write_int_2(out, dt.date().year());
            write_int_1(out, dt.date().month());
            write_int_1(out, dt.date().day());
            write_int_1(out, dt.hour());
            write_int_1(out, dt.minute());
            write_int_1(out, dt.second());
            write_int_4(out, dt.microsecond());
        }
        Value::Time(time) => {
            let (negative, hours, minutes, seconds, micros) = time.to_parts();
            write_int_1(out, 12);
            write_int_1(out, negative as u8);
            write_int_4(out, hours / 24);
            write_int_1(out, (hours % 24) as u8);
            write_int_1(out, minutes);
            write_int_1(out, seconds);
            write_int_4(out, micros);
        }
    }
}
