//! Encoding of base 32.
//!
//! The base 32 encoding is defined in [RFC 4648]. It is essentially a
//! case-insensitive version of base 64 which is necessary when encoding
//! binary data in domain names. The RFC defines two separate encodings,
//! called *base32* and *base32hex*. BDXL host names use the former with its
//! upper-case alphabet; the latter is provided for zones that want the
//! order-preserving variant known from NSEC3.
//!
//! Only encoding is implemented. Both alphabets can be written with or
//! without the trailing `=` padding that fills the output up to a multiple
//! of eight characters.
//!
//! [RFC 4648]: https://tools.ietf.org/html/rfc4648

use core::fmt;

//------------ Alphabet ------------------------------------------------------

/// The alphabet used for encoding.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Alphabet {
    /// The *base32* alphabet, `A` to `Z` followed by `2` to `7`.
    Standard,

    /// The *base32hex* alphabet, `0` to `9` followed by `A` to `V`.
    Hex,
}

impl Alphabet {
    fn symbols(self) -> &'static [char; 32] {
        match self {
            Alphabet::Standard => &ENCODE_ALPHABET,
            Alphabet::Hex => &ENCODE_HEX_ALPHABET,
        }
    }
}

//------------ Convenience Functions -----------------------------------------

/// Encodes binary data in base 32 and writes it into a format stream.
///
/// If `padding` is `true`, the output is filled up with `=` to a multiple
/// of eight characters.
pub fn display<B, W>(
    bytes: &B,
    alphabet: Alphabet,
    padding: bool,
    f: &mut W,
) -> fmt::Result
where
    B: AsRef<[u8]> + ?Sized,
    W: fmt::Write,
{
    let symbols = alphabet.symbols();
    let ch = |i: u8| symbols[usize::from(i)];

    for chunk in bytes.as_ref().chunks(5) {
        f.write_char(ch(chunk[0] >> 3))?; // 0
        if chunk.len() == 1 {
            f.write_char(ch((chunk[0] & 0x07) << 2))?; // 1
            return write_padding(f, padding, 6);
        }
        f.write_char(ch((chunk[0] & 0x07) << 2 | chunk[1] >> 6))?; // 1
        f.write_char(ch((chunk[1] & 0x3F) >> 1))?; // 2
        if chunk.len() == 2 {
            f.write_char(ch((chunk[1] & 0x01) << 4))?; // 3
            return write_padding(f, padding, 4);
        }
        f.write_char(ch((chunk[1] & 0x01) << 4 | chunk[2] >> 4))?; // 3
        if chunk.len() == 3 {
            f.write_char(ch((chunk[2] & 0x0F) << 1))?; // 4
            return write_padding(f, padding, 3);
        }
        f.write_char(ch((chunk[2] & 0x0F) << 1 | chunk[3] >> 7))?; // 4
        f.write_char(ch((chunk[3] & 0x7F) >> 2))?; // 5
        if chunk.len() == 4 {
            f.write_char(ch((chunk[3] & 0x03) << 3))?; // 6
            return write_padding(f, padding, 1);
        }
        f.write_char(ch((chunk[3] & 0x03) << 3 | chunk[4] >> 5))?; // 6
        f.write_char(ch(chunk[4] & 0x1F))?; // 7
    }
    Ok(())
}

fn write_padding<W: fmt::Write>(
    f: &mut W,
    padding: bool,
    count: usize,
) -> fmt::Result {
    if padding {
        for _ in 0..count {
            f.write_char(PADDING)?;
        }
    }
    Ok(())
}

/// Encodes binary data in padded *base32* and returns it as a string.
pub fn encode_string<B: AsRef<[u8]> + ?Sized>(bytes: &B) -> String {
    encode_string_with(bytes, Alphabet::Standard, true)
}

/// Encodes binary data in padded *base32hex* and returns it as a string.
pub fn encode_string_hex<B: AsRef<[u8]> + ?Sized>(bytes: &B) -> String {
    encode_string_with(bytes, Alphabet::Hex, true)
}

/// Encodes binary data with the given alphabet and padding rule.
pub fn encode_string_with<B: AsRef<[u8]> + ?Sized>(
    bytes: &B,
    alphabet: Alphabet,
    padding: bool,
) -> String {
    let mut res = String::with_capacity((bytes.as_ref().len() / 5 + 1) * 8);
    // Writing into a string cannot fail.
    let _ = display(bytes, alphabet, padding, &mut res);
    res
}

//------------ Constants -----------------------------------------------------

/// The padding character.
pub const PADDING: char = '=';

/// The alphabet used for encoding *base32.*
const ENCODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', // 0x00 .. 0x07
    'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', // 0x08 .. 0x0F
    'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', // 0x10 .. 0x17
    'Y', 'Z', '2', '3', '4', '5', '6', '7', // 0x18 .. 0x1F
];

/// The alphabet used for encoding *base32hex.*
const ENCODE_HEX_ALPHABET: [char; 32] = [
    '0', '1', '2', '3', '4', '5', '6', '7', // 0x00 .. 0x07
    '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', // 0x08 .. 0x0F
    'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', // 0x10 .. 0x17
    'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', // 0x18 .. 0x1F
];

//============ Test ==========================================================
