//! Age header grammar
//!
//! ```text
//! age-encryption.org/v1
//! -> X25519 <base64 ephemeral public key>
//! <base64 encrypted file key, wrapped at 64 columns>
//! --- <base64 mac>
//! ```
//!
//! All base64 is standard alphabet without padding.

use crate::keys::EncryptedFileKey;
use crate::{Error, Result, MAC_LENGTH, X25519_KEY_LENGTH};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

/// First header line
pub const VERSION_LINE: &str = "age-encryption.org/v1";

/// Width stanza bodies are wrapped at
pub const STANZA_WRAPPED_BODY_LENGTH: usize = 64;

const STANZA_LINE_PREFIX: &str = "->";
const MAC_LINE_PREFIX: &str = "---";
const X25519_STANZA_TYPE: &str = "X25519";
const X25519_STANZA_ARGUMENTS: usize = 2;
const SCRYPT_STANZA_TYPE: &str = "scrypt";
const BASE64_PADDING: char = '=';

/// X25519 recipient stanza
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X25519Stanza {
    /// Sender's ephemeral X25519 public key
    pub ephemeral_public_key: [u8; X25519_KEY_LENGTH],
    /// File key sealed under the stanza wrap key
    pub encrypted_file_key: EncryptedFileKey,
}

/// Parsed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The single recipient stanza
    pub stanza: X25519Stanza,
    /// Header MAC
    pub mac: [u8; MAC_LENGTH],
}

impl X25519Stanza {
    /// Header text up to and including the `---` that precedes the MAC
    pub fn header_without_mac(&self) -> String {
        let mut header = format!(
            "{}\n{} {} {}\n",
            VERSION_LINE,
            STANZA_LINE_PREFIX,
            X25519_STANZA_TYPE,
            STANDARD_NO_PAD.encode(self.ephemeral_public_key)
        );
        let body = STANDARD_NO_PAD.encode(self.encrypted_file_key);
        for start in (0..body.len()).step_by(STANZA_WRAPPED_BODY_LENGTH) {
            let end = (start + STANZA_WRAPPED_BODY_LENGTH).min(body.len());
            header.push_str(&body[start..end]);
            header.push('\n');
        }
        if body.len() % STANZA_WRAPPED_BODY_LENGTH == 0 {
            header.push('\n');
        }
        header.push_str(MAC_LINE_PREFIX);
        header
    }
}

/// Append the MAC to a header produced by [`X25519Stanza::header_without_mac`]
pub fn complete_header(mut header: String, mac: &[u8; MAC_LENGTH]) -> String {
    header.push(' ');
    header.push_str(&STANDARD_NO_PAD.encode(mac));
    header.push('\n');
    header
}

/// Split an age file into its header and binary payload
pub fn parse(age_file: &[u8]) -> Result<(Header, &[u8])> {
    let end_of_header = find_end_of_header(age_file).ok_or_else(Error::invalid_file)?;
    if !age_file[..end_of_header]
        .iter()
        .all(|&byte| is_printable(byte) || byte == b'\n')
    {
        return Err(Error::invalid_file());
    }
    let header =
        std::str::from_utf8(&age_file[..=end_of_header]).map_err(|_| Error::invalid_file())?;
    let payload = &age_file[end_of_header + 1..];

    if !header.starts_with(&format!("{}\n{} ", VERSION_LINE, STANZA_LINE_PREFIX)) {
        return Err(Error::invalid_file());
    }

    let stanza_prefix = format!("{} ", STANZA_LINE_PREFIX);
    let mut stanzas = Vec::new();
    let mut start_of_line = VERSION_LINE.len() + 1;
    while header[start_of_line..].starts_with(&stanza_prefix) {
        let end_of_line = line_end(header, start_of_line)?;
        let arguments: Vec<&str> = header[start_of_line + stanza_prefix.len()..end_of_line]
            .split(' ')
            .collect();
        if arguments[0] == SCRYPT_STANZA_TYPE {
            return Err(Error::invalid_file());
        }

        let mut body = String::new();
        start_of_line = end_of_line + 1;
        loop {
            let end_of_line = line_end(header, start_of_line)?;
            let line = &header[start_of_line..end_of_line];
            if line.len() > STANZA_WRAPPED_BODY_LENGTH {
                return Err(Error::invalid_file());
            }
            body.push_str(line);
            start_of_line = end_of_line + 1;
            if line.len() < STANZA_WRAPPED_BODY_LENGTH {
                break;
            }
        }
        if body.ends_with(BASE64_PADDING) {
            return Err(Error::invalid_file());
        }

        if arguments.len() == X25519_STANZA_ARGUMENTS && arguments[0] == X25519_STANZA_TYPE {
            match decode_x25519_stanza(arguments[1], &body) {
                Some(stanza) => stanzas.push(stanza),
                None => tracing::debug!("Skipping malformed X25519 stanza"),
            }
        } else {
            tracing::debug!(stanza_type = arguments[0], "Skipping unknown stanza");
        }
    }

    let mac_prefix = format!("{} ", MAC_LINE_PREFIX);
    if !header[start_of_line..].starts_with(&mac_prefix) {
        return Err(Error::invalid_file());
    }
    let end_of_line = line_end(header, start_of_line)?;
    if end_of_line + 1 != header.len() {
        return Err(Error::invalid_file());
    }
    let encoded_mac = &header[start_of_line + mac_prefix.len()..end_of_line];
    if encoded_mac.ends_with(BASE64_PADDING) || !is_base64(encoded_mac) {
        return Err(Error::invalid_file());
    }
    let mac: [u8; MAC_LENGTH] = STANDARD_NO_PAD
        .decode(encoded_mac)
        .map_err(|_| Error::invalid_file())?
        .try_into()
        .map_err(|_| Error::invalid_file())?;

    if stanzas.len() != 1 {
        return Err(Error::InvalidParameters("Invalid number of stanzas".to_string()));
    }
    let stanza = stanzas.remove(0);
    Ok((Header { stanza, mac }, payload))
}

/// Index of the newline ending the MAC line
fn find_end_of_header(age_file: &[u8]) -> Option<usize> {
    let marker = format!("\n{} ", MAC_LINE_PREFIX);
    let start = age_file
        .windows(marker.len())
        .position(|window| window == marker.as_bytes())?;
    let after_marker = start + marker.len();
    age_file[after_marker..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map(|offset| after_marker + offset)
}

fn line_end(header: &str, start_of_line: usize) -> Result<usize> {
    header[start_of_line..]
        .find('\n')
        .map(|offset| start_of_line + offset)
        .ok_or_else(Error::invalid_file)
}

/// Malformed X25519 stanzas are skipped rather than rejected
fn decode_x25519_stanza(encoded_public_key: &str, body: &str) -> Option<X25519Stanza> {
    if encoded_public_key.ends_with(BASE64_PADDING)
        || !is_base64(encoded_public_key)
        || !is_base64(body)
    {
        return None;
    }
    let ephemeral_public_key = STANDARD_NO_PAD.decode(encoded_public_key).ok()?.try_into().ok()?;
    let encrypted_file_key = STANDARD_NO_PAD.decode(body).ok()?.try_into().ok()?;
    Some(X25519Stanza {
        ephemeral_public_key,
        encrypted_file_key,
    })
}

fn is_base64(encoded: &str) -> bool {
    !encoded.is_empty()
        && encoded
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/')
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stanza() -> X25519Stanza {
        X25519Stanza {
            ephemeral_public_key: [0x11; 32],
            encrypted_file_key: [0x22; 32],
        }
    }

    fn age_file(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut file = header.as_bytes().to_vec();
        file.extend_from_slice(payload);
        file
    }

    #[test]
    fn test_header_text() {
        let header = complete_header(stanza().header_without_mac(), &[0x33; 32]);
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], "age-encryption.org/v1");
        assert_eq!(lines[1], format!("-> X25519 {}", STANDARD_NO_PAD.encode([0x11; 32])));
        assert_eq!(lines[2], STANDARD_NO_PAD.encode([0x22; 32]));
        assert_eq!(lines[3], format!("--- {}", STANDARD_NO_PAD.encode([0x33; 32])));
        assert!(!header.contains('='));
    }

    #[test]
    fn test_body_wraps_into_a_single_short_line() {
        let header = stanza().header_without_mac();
        let body = STANDARD_NO_PAD.encode([0x22; 32]);
        assert!(body.len() < STANZA_WRAPPED_BODY_LENGTH);
        assert!(header.ends_with(&format!("\n{}\n{}", body, MAC_LINE_PREFIX)));
        assert_eq!(header.lines().count(), 4);
    }

    #[test]
    fn test_parse_splits_payload() {
        let header = complete_header(stanza().header_without_mac(), &[0x33; 32]);
        let file = age_file(&header, &[0xff, 0x00, b'\n', 0x80]);
        let (parsed, payload) = parse(&file).unwrap();
        assert_eq!(parsed.stanza, stanza());
        assert_eq!(parsed.mac, [0x33; 32]);
        assert_eq!(payload, &[0xff, 0x00, b'\n', 0x80]);
    }

    #[test]
    fn test_unknown_and_malformed_stanzas_are_skipped() {
        let good = stanza().header_without_mac();
        let extra = "-> ssh-ed25519 abc\nYWJj\n";
        let header = good.replacen("\n-> ", &format!("\n{}-> ", extra), 1);
        let file = complete_header(header, &[0x33; 32]);
        assert!(parse(file.as_bytes()).is_ok());

        let wrong_length = "-> X25519 YWJj\nYWJj\n";
        let header = good.replacen("\n-> ", &format!("\n{}-> ", wrong_length), 1);
        let file = complete_header(header, &[0x33; 32]);
        assert!(parse(file.as_bytes()).is_ok());
    }

    #[test]
    fn test_rejects_overlong_body_line() {
        let header = format!(
            "{}\n-> X25519 {}\n{}\n---",
            VERSION_LINE,
            STANDARD_NO_PAD.encode([0x11; 32]),
            "A".repeat(65)
        );
        let file = complete_header(header, &[0x33; 32]);
        assert!(matches!(parse(file.as_bytes()), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_rejects_missing_or_trailing_mac_line() {
        let header = stanza().header_without_mac();
        assert!(parse(header.as_bytes()).is_err());

        let mut file = complete_header(header, &[0x33; 32]).into_bytes();
        file.truncate(file.len() - 1);
        assert!(parse(&file).is_err());
    }

    #[test]
    fn test_rejects_short_mac() {
        let header = stanza().header_without_mac();
        let file = format!("{} {}\n", header, STANDARD_NO_PAD.encode([0x33; 31]));
        assert!(parse(file.as_bytes()).is_err());
    }
}
