//! Device name enumeration decoding.

/// Decode a NUL-segmented device name buffer.
///
/// The buffer holds NUL-terminated name segments, terminated by an
/// additional NUL: two consecutive NUL bytes end the sequence. A buffer
/// that starts with two NULs (or is empty) decodes to no names.
pub fn decode_device_names(buffer: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut segment = Vec::new();

    for (i, &byte) in buffer.iter().enumerate() {
        if byte != 0 {
            segment.push(byte);
            continue;
        }

        if segment.is_empty() {
            break;
        }
        names.push(String::from_utf8_lossy(&segment).into_owned());
        segment.clear();

        if buffer.get(i + 1) == Some(&0) {
            break;
        }
    }

    names
}

/// Encode device names as a NUL-segmented buffer.
///
/// Inverse of [`decode_device_names`]; used by backends to present their
/// enumeration in the wire shape.
pub fn encode_device_names<S: AsRef<str>>(names: &[S]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for name in names {
        buffer.extend_from_slice(name.as_ref().as_bytes());
        buffer.push(0);
    }
    buffer.push(0);
    buffer
}
