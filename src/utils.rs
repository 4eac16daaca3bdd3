/// Formats bytes as uppercase hexadecimal pairs separated by spaces.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    let mut rendered = String::with_capacity(bytes.len().saturating_mul(3));
    for (index, value) in bytes.iter().enumerate() {
        if index > 0 {
            rendered.push(' ');
        }
        let high = value >> 4;
        let low = value & 0x0F;
        rendered.push(nibble_to_hex(high));
        rendered.push(nibble_to_hex(low));
    }
    rendered
}

/// Formats at most `max_bytes` bytes, keeping the last byte visible.
///
/// Dumps run to tens of kilobytes, so long payloads collapse to their head,
/// the trailing delimiter, and a byte count.
pub(crate) fn format_hex_preview(bytes: &[u8], max_bytes: usize) -> String {
    if bytes.len() <= max_bytes || max_bytes < 2 {
        return format_hex(bytes);
    }

    let head = format_hex(&bytes[..max_bytes - 1]);
    let tail = format_hex(&bytes[bytes.len() - 1..]);
    format!("{head} ... {tail} ({} bytes)", bytes.len())
}

fn nibble_to_hex(value: u8) -> char {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    HEX[value as usize] as char
}
