//! URL encoding for device ids in REST paths.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded in a device-id path segment.
const DEVICE_ID_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Percent-encode a device id for use as a URL path segment.
#[must_use]
pub fn encode_device_id(device_id: &str) -> String {
    utf8_percent_encode(device_id, DEVICE_ID_ESCAPE).to_string()
}
