//! TwiML reply envelope for the inbound SMS webhook.

/// Content type of a TwiML reply.
pub const CONTENT_TYPE: &str = "application/xml";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Wrap `text` as a single reply message. Empty text yields an empty
/// `<Response>`, which sends nothing back to the sender.
pub fn message_response(text: &str) -> String {
    if text.trim().is_empty() {
        return empty_response();
    }
    format!("{XML_DECL}<Response><Message>{}</Message></Response>", escape_xml(text))
}

pub fn empty_response() -> String {
    format!("{XML_DECL}<Response></Response>")
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_text_in_message() {
        assert_eq!(
            message_response("Hi there"),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>Hi there</Message></Response>"#
        );
    }

    #[test]
    fn escapes_markup() {
        let xml = message_response("5 < 6 & \"quotes\"");
        assert!(xml.contains("5 &lt; 6 &amp; &quot;quotes&quot;"));
        assert!(!xml.contains("5 < 6"));
    }

    #[test]
    fn empty_text_sends_nothing() {
        assert_eq!(message_response("  "), empty_response());
        assert!(!empty_response().contains("<Message>"));
    }
}
