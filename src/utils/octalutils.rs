//! Fixed-width field codecs for header records.
//!
//! Numeric fields are zero-padded octal text with one trailing NUL, so a field
//! of `n` bytes holds `n - 1` digits. String fields are NUL-padded and may fill
//! the whole field with no terminator.

/// Largest value representable in an octal field `width` bytes wide.
pub fn octal_max(width: usize) -> u64 {
    let digits = width.saturating_sub(1) as u32;
    if digits >= 21 {
        return u64::MAX;
    }
    8u64.pow(digits) - 1
}

/// Writes `value` as `width - 1` octal digits plus a NUL. Returns `None`
/// and leaves `dst` untouched when the value does not fit.
pub fn put_octal(dst: &mut [u8], value: u64) -> Option<()> {
    if dst.is_empty() || value > octal_max(dst.len()) {
        return None;
    }

    let digits = dst.len() - 1;
    let text = format!("{:0digits$o}", value, digits = digits);
    dst[..digits].copy_from_slice(text.as_bytes());
    dst[digits] = 0;
    Some(())
}

/// Parses an octal field. Leading spaces are skipped, and the number ends at
/// the first NUL or space. An empty field reads as zero.
pub fn parse_octal(src: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut bytes = src.iter().skip_while(|&&b| b == b' ');

    for &b in bytes.by_ref() {
        match b {
            b'0'..=b'7' => {
                value = value.checked_mul(8)?.checked_add(u64::from(b - b'0'))?;
            }
            0 | b' ' => break,
            _ => return None,
        }
    }

    // anything after the terminator must be padding
    if bytes.all(|&b| b == 0 || b == b' ') {
        Some(value)
    } else {
        None
    }
}

/// Copies `s` into a NUL-padded field. `None` if it is longer than the field.
pub fn put_str(dst: &mut [u8], s: &[u8]) -> Option<()> {
    if s.len() > dst.len() {
        return None;
    }

    dst[..s.len()].copy_from_slice(s);
    dst[s.len()..].fill(0);
    Some(())
}

/// The bytes of a NUL-padded field up to the first NUL.
pub fn get_str(src: &[u8]) -> &[u8] {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    &src[..end]
}
