/// Stand-in for `\n` on surfaces that strip or mangle literal line breaks.
pub const NEWLINE_SENTINEL: &str = "<br>";

/// Reversible line-break substitution. A disabled codec passes text through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewlineCodec {
    enabled: bool,
}

impl NewlineCodec {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Outgoing text: every `\n` becomes the sentinel. `\r` is left alone.
    pub fn encode(&self, text: &str) -> String {
        if self.enabled {
            text.replace('\n', NEWLINE_SENTINEL)
        } else {
            text.to_string()
        }
    }

    /// Incoming text: every sentinel becomes `\n`.
    pub fn decode(&self, text: &str) -> String {
        if self.enabled {
            text.replace(NEWLINE_SENTINEL, "\n")
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_round_trip_byte_for_byte() {
        let codec = NewlineCodec::new(true);
        for text in ["one\ntwo", "\n\nlead", "trail\n", "crlf\r\nline", "\n"] {
            let encoded = codec.encode(text);
            assert!(!encoded.contains('\n'));
            assert_eq!(codec.decode(&encoded), text);
        }
    }

    #[test]
    fn text_without_breaks_is_untouched_both_ways() {
        let codec = NewlineCodec::new(true);
        let text = "Save file as…";
        assert_eq!(codec.encode(text), text);
        assert_eq!(codec.decode(text), text);
        assert_eq!(codec.encode(&codec.decode(text)), text);
    }

    #[test]
    fn disabled_codec_is_identity() {
        let codec = NewlineCodec::new(false);
        assert_eq!(codec.encode("a\nb"), "a\nb");
        assert_eq!(codec.decode("a<br>b"), "a<br>b");
    }

    #[test]
    fn translated_sentinels_become_line_breaks() {
        let codec = NewlineCodec::new(true);
        assert_eq!(codec.decode("Bonjour<br>le monde"), "Bonjour\nle monde");
    }
}
