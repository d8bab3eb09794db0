//! Standalone base64 decoder used when the native engine rejects an inline
//! payload. Accepts the standard and URL-safe alphabets in the same input,
//! requires padding to a multiple of four characters.

use thiserror::Error;

const INVALID: u8 = 0xff;

const TABLE: [u8; 256] = {
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < alphabet.len() {
        table[alphabet[i] as usize] = i as u8;
        i += 1;
    }
    table[b'-' as usize] = 62;
    table[b'_' as usize] = 63;
    table
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("length {0} is not a multiple of 4")]
    Length(usize),
    #[error("invalid character {byte:#04x} at {index}")]
    InvalidByte { index: usize, byte: u8 },
    #[error("misplaced padding at {0}")]
    Padding(usize),
}

/// Decode `input`. One trailing `=` yields two bytes from the last group,
/// two yield one.
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if input.len() % 4 != 0 {
        return Err(DecodeError::Length(input.len()));
    }
    let payload = memchr::memchr(b'=', input).unwrap_or(input.len());
    let padding = input.len() - payload;
    if padding > 2 || input[payload..].iter().any(|&byte| byte != b'=') {
        return Err(DecodeError::Padding(payload));
    }

    let value = |index: usize| {
        let byte = input[index];
        match TABLE[byte as usize] {
            INVALID => Err(DecodeError::InvalidByte { index, byte }),
            value => Ok(value as u32),
        }
    };

    let full = payload - payload % 4;
    let mut output = Vec::with_capacity(full / 4 * 3 + 2);
    for i in (0..full).step_by(4) {
        let group = value(i)? << 18 | value(i + 1)? << 12 | value(i + 2)? << 6 | value(i + 3)?;
        output.extend_from_slice(&[(group >> 16) as u8, (group >> 8) as u8, group as u8]);
    }
    match padding {
        1 => {
            let group = value(full)? << 10 | value(full + 1)? << 4 | value(full + 2)? >> 2;
            output.extend_from_slice(&[(group >> 8) as u8, group as u8]);
        }
        2 => {
            let group = value(full)? << 2 | value(full + 1)? >> 4;
            output.push(group as u8);
        }
        _ => {}
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use ::base64::{
        engine::general_purpose::{STANDARD, URL_SAFE},
        Engine,
    };
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn padding_lengths() {
        assert_eq!(decode(b"").unwrap(), b"");
        assert_eq!(decode(b"aGk=").unwrap(), b"hi");
        assert_eq!(decode(b"aA==").unwrap(), b"h");
        assert_eq!(decode(b"aGk/").unwrap(), [0x68, 0x69, 0x3f]);
    }

    #[test]
    fn url_safe_alphabet() {
        assert_eq!(decode(b"-_-_").unwrap(), decode(b"+/+/").unwrap());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(decode(b"aGk"), Err(DecodeError::Length(3)));
        assert_eq!(decode(b"a==="), Err(DecodeError::Padding(1)));
        assert_eq!(decode(b"aG=k"), Err(DecodeError::Padding(2)));
        assert_eq!(
            decode(b"aG!k"),
            Err(DecodeError::InvalidByte {
                index: 2,
                byte:  b'!',
            })
        );
        assert!(matches!(
            decode(b"aGk\n"),
            Err(DecodeError::InvalidByte { index: 3, .. })
        ));
    }

    proptest! {
        #[test]
        fn matches_native_engine(data in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode(STANDARD.encode(&data).as_bytes()).unwrap(), data.clone());
            prop_assert_eq!(decode(URL_SAFE.encode(&data).as_bytes()).unwrap(), data);
        }
    }
}
