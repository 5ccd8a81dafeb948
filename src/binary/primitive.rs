use nom::{
    combinator::map,
    error::{ErrorKind, ParseError},
    IResult, Offset,
};

use crate::error::{Error, FormatReason};

/// A 32-bit LEB128 value never needs more than five bytes.
const MAX_VARINT_LEN: usize = 5;

/// Parser error. `input` is the slice at the failing position, so the
/// absolute offset can be recovered from the buffer it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fault<'a> {
    pub input: &'a [u8],
    pub kind: FaultKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FaultKind {
    Truncated,
    Format(FormatReason),
}

impl<'a> ParseError<&'a [u8]> for Fault<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        let kind = match kind {
            ErrorKind::Eof | ErrorKind::Complete => FaultKind::Truncated,
            _ => FaultKind::Format(FormatReason::Malformed(kind.description().to_owned())),
        };
        Fault { input, kind }
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

pub(crate) type PResult<'a, T> = IResult<&'a [u8], T, Fault<'a>>;

/// Resolves a parser failure against the buffer `whole` the input was cut from.
pub(crate) fn locate<'a>(err: nom::Err<Fault<'a>>, whole: &'a [u8]) -> Error {
    match err {
        nom::Err::Error(fault) | nom::Err::Failure(fault) => {
            let offset = whole.offset(fault.input);
            match fault.kind {
                FaultKind::Truncated => Error::Truncated { offset },
                FaultKind::Format(reason) => Error::Format { offset, reason },
            }
        }
        nom::Err::Incomplete(_) => Error::Truncated { offset: whole.len() },
    }
}

pub(crate) fn fail<T>(input: &[u8], reason: FormatReason) -> PResult<T> {
    Err(nom::Err::Failure(Fault { input, kind: FaultKind::Format(reason) }))
}

/// Points at the first byte past the end of `input`, i.e. the missing one.
pub(crate) fn truncated<T>(input: &[u8]) -> PResult<T> {
    Err(nom::Err::Failure(Fault { input: &input[input.len()..], kind: FaultKind::Truncated }))
}

pub(crate) fn byte(input: &[u8]) -> PResult<u8> {
    match input.split_first() {
        Some((&b, rest)) => Ok((rest, b)),
        None => truncated(input),
    }
}

pub(crate) fn bytes<'a>(n: usize) -> impl Fn(&'a [u8]) -> PResult<'a, &'a [u8]> {
    move |input: &'a [u8]| {
        if input.len() < n {
            return truncated(input);
        }
        let (head, rest) = input.split_at(n);
        Ok((rest, head))
    }
}

pub(crate) fn var_u32(input: &[u8]) -> PResult<u32> {
    let mut value = 0u32;

    for (i, &b) in input.iter().enumerate().take(MAX_VARINT_LEN) {
        // the last byte may only carry the top 4 bits and no continuation
        if i == MAX_VARINT_LEN - 1 && b > 0x0f {
            return fail(input, FormatReason::VarintOverflow);
        }

        value |= u32::from(b & 0x7f) << (7 * i);

        if b & 0x80 == 0 {
            return Ok((&input[i + 1..], value));
        }
    }

    truncated(input)
}

/// Zigzag reconstruction: bit 0 of the magnitude is the sign.
pub(crate) fn var_i32(input: &[u8]) -> PResult<i32> {
    map(var_u32, |u| {
        let v = (u >> 1) as i32;
        if u & 1 != 0 { !v } else { v }
    })(input)
}

/// Raw extent of one LEB128 number of any width.
pub(crate) fn leb128_extent(input: &[u8]) -> PResult<&[u8]> {
    match input.iter().position(|b| b & 0x80 == 0) {
        Some(last) => {
            let (head, rest) = input.split_at(last + 1);
            Ok((rest, head))
        }
        None => truncated(input),
    }
}

pub(crate) fn blob(input: &[u8]) -> PResult<&[u8]> {
    let (input, len) = var_u32(input)?;
    bytes(len as usize)(input)
}

pub(crate) fn string(input: &[u8]) -> PResult<String> {
    let (rest, raw) = blob(input)?;

    match std::str::from_utf8(raw) {
        Ok(s) => Ok((rest, s.to_owned())),
        Err(err) => fail(&raw[err.valid_up_to()..], FormatReason::Utf8),
    }
}

fn run<'a, T>(
    input: &'a [u8],
    parser: impl FnOnce(&'a [u8]) -> PResult<'a, T>,
) -> Result<(T, usize), Error> {
    let (rest, value) = parser(input).map_err(|err| locate(err, input))?;
    Ok((value, input.len() - rest.len()))
}

/// Reads an unsigned LEB128 `u32`, returning the value and the bytes consumed.
pub fn read_unsigned_varint(input: &[u8]) -> Result<(u32, usize), Error> {
    run(input, var_u32)
}

/// Reads a signed varint. The sign is carried in bit 0 of the decoded
/// magnitude (zigzag), not by two's-complement sign extension.
pub fn read_signed_varint(input: &[u8]) -> Result<(i32, usize), Error> {
    run(input, var_i32)
}

/// Reads a varint length prefix followed by that many bytes of UTF-8.
pub fn read_string(input: &[u8]) -> Result<(String, usize), Error> {
    run(input, string)
}

#[cfg(test)]
mod primitive_tests {
    use anyhow::Result;

    use super::{read_signed_varint, read_string, read_unsigned_varint};
    use crate::error::{Error, FormatReason};

    #[test]
    fn decode_unsigned_varints() -> Result<()> {
        assert_eq!((0, 1), read_unsigned_varint(&[0x00])?);
        assert_eq!((624485, 3), read_unsigned_varint(&[0xE5, 0x8E, 0x26])?);
        assert_eq!((127, 1), read_unsigned_varint(&[0x7f, 0xff])?);
        assert_eq!((128, 2), read_unsigned_varint(&[0x80, 0x01])?);
        assert_eq!((u32::MAX, 5), read_unsigned_varint(&[0xff, 0xff, 0xff, 0xff, 0x0f])?);
        // padded zero
        assert_eq!((0, 5), read_unsigned_varint(&[0x80, 0x80, 0x80, 0x80, 0x00])?);
        Ok(())
    }

    #[test]
    fn unsigned_varint_overflow() {
        let err = read_unsigned_varint(&[0xff, 0xff, 0xff, 0xff, 0x1f]).unwrap_err();
        assert!(matches!(err, Error::Format { offset: 0, reason: FormatReason::VarintOverflow }));

        let err = read_unsigned_varint(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Format { reason: FormatReason::VarintOverflow, .. }));
    }

    #[test]
    fn unsigned_varint_truncated() {
        let err = read_unsigned_varint(&[]).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 0 }));

        let err = read_unsigned_varint(&[0xE5, 0x8E]).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 2 }));
    }

    #[test]
    fn decode_signed_varints() -> Result<()> {
        assert_eq!((0, 1), read_signed_varint(&[0x00])?);
        assert_eq!((-1, 1), read_signed_varint(&[0x01])?);
        assert_eq!((1, 1), read_signed_varint(&[0x02])?);
        assert_eq!((-2, 1), read_signed_varint(&[0x03])?);
        assert_eq!((i32::MAX, 5), read_signed_varint(&[0xfe, 0xff, 0xff, 0xff, 0x0f])?);
        assert_eq!((i32::MIN, 5), read_signed_varint(&[0xff, 0xff, 0xff, 0xff, 0x0f])?);
        Ok(())
    }

    #[test]
    fn decode_strings() -> Result<()> {
        assert_eq!(("add".to_string(), 4), read_string(&[0x03, 0x61, 0x64, 0x64, 0xff])?);
        assert_eq!((String::new(), 1), read_string(&[0x00])?);
        Ok(())
    }

    #[test]
    fn string_errors() {
        let err = read_string(&[0x05, 0x61, 0x62]).unwrap_err();
        assert!(matches!(err, Error::Truncated { offset: 3 }));

        let err = read_string(&[0x02, 0x61, 0xff]).unwrap_err();
        assert!(matches!(err, Error::Format { offset: 2, reason: FormatReason::Utf8 }));
    }
}
