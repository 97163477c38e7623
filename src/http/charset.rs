//! Body charsets
//!
//! Header text is always Latin-1. Bodies start out as Latin-1 too and switch
//! to UTF-8 when a response's `Content-Type` carries a recognized
//! `charset=` alias. The selected charset lives on the client session, not
//! in any global.

/// Canonical body charsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Latin1,
    Utf8,
}

impl Charset {
    /// Map a `charset=` value onto a canonical charset
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "iso-8859-1" | "latin-1" | "latin1" => Some(Charset::Latin1),
            "utf" | "utf8" | "utf-8" => Some(Charset::Utf8),
            _ => None,
        }
    }

    /// Extract the `charset=` parameter of a `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .and_then(|(_, value)| Self::from_alias(value))
    }

    /// Switch to the charset named by `content_type`.
    ///
    /// Unrecognized or missing aliases leave the current charset alone.
    pub fn update_from_content_type(&mut self, content_type: &str) {
        if let Some(charset) = Self::from_content_type(content_type) {
            *self = charset;
        }
    }

    /// Decode bytes into text
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Encode text into bytes; characters Latin-1 cannot hold become `?`
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Charset::Utf8 => text.as_bytes().to_vec(),
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Latin1 => "latin-1",
            Charset::Utf8 => "utf-8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_fold() {
        assert_eq!(Charset::from_alias("ISO-8859-1"), Some(Charset::Latin1));
        assert_eq!(Charset::from_alias("utf8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_alias("\"UTF-8\""), Some(Charset::Utf8));
        assert_eq!(Charset::from_alias("shift_jis"), None);
    }

    #[test]
    fn test_content_type_parameter() {
        assert_eq!(
            Charset::from_content_type("text/html; charset=UTF-8"),
            Some(Charset::Utf8)
        );
        assert_eq!(
            Charset::from_content_type("text/html;Charset=iso-8859-1;q=1"),
            Some(Charset::Latin1)
        );
        assert_eq!(Charset::from_content_type("text/html"), None);
    }

    #[test]
    fn test_unknown_alias_is_a_no_op() {
        let mut charset = Charset::Utf8;
        charset.update_from_content_type("text/html; charset=koi8-r");
        assert_eq!(charset, Charset::Utf8);

        charset.update_from_content_type("text/html; charset=latin-1");
        assert_eq!(charset, Charset::Latin1);
    }

    #[test]
    fn test_decode() {
        let bytes = "café".as_bytes();
        assert_eq!(Charset::Utf8.decode(bytes), "café");
        assert_eq!(Charset::Latin1.decode(bytes), "cafÃ©");
        assert_eq!(Charset::Latin1.decode(&[0x63, 0xE9]), "cé");
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(Charset::Latin1.encode("cé€"), vec![0x63, 0xE9, b'?']);
    }
}
