//! Phone directory parsing.
//!
//! The directory is a free-form document with one `Name: phone` (or
//! `Name - phone`) entry per line.

use textpilot_core::Contact;
use tracing::debug;

const SEPARATORS: [char; 4] = [':', '-', '\u{2013}', '\u{2014}'];
const HEADER_WORDS: [&str; 3] = ["phone directory", "contacts", "numbers"];

/// Parse every recognisable entry. Lines that do not look like an entry are skipped.
pub fn parse_phone_directory(text: &str) -> Vec<Contact> {
    let contacts: Vec<Contact> = text.lines().filter_map(parse_line).collect();
    debug!(count = contacts.len(), "Parsed phone directory");
    contacts
}

fn parse_line(line: &str) -> Option<Contact> {
    let line = line.trim();
    if line.is_empty()
        || line.starts_with('#')
        || line.starts_with("---")
        || HEADER_WORDS.contains(&line.to_lowercase().as_str())
    {
        return None;
    }

    let split = line.find(SEPARATORS)?;
    let name = line[..split].trim();
    let sep_len = line[split..].chars().next().map(char::len_utf8).unwrap_or(1);
    let phone_raw = line[split + sep_len..].trim();

    if name.chars().count() < 2 || !phone_raw.chars().any(|c| c.is_ascii_digit()) {
        debug!(line, "Skipping unparseable directory line");
        return None;
    }

    Some(Contact::new(name, normalize_phone(phone_raw)))
}

/// Normalise to E.164 where the shape is recognisable; otherwise keep the raw text.
pub fn normalize_phone(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    let all_digits = !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit());

    if cleaned.starts_with('1') && cleaned.len() == 11 {
        format!("+{cleaned}")
    } else if cleaned.len() == 10 && all_digits {
        format!("+1{cleaned}")
    } else if cleaned.starts_with('+') {
        cleaned
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_layouts() {
        let text = "\
Phone Directory
# Family
Ryan: (203) 583-9125
Alex - 1 555 123 4567
---
Sam: +44 20 7946 0958
";
        let contacts = parse_phone_directory(text);
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name, "Ryan");
        assert_eq!(contacts[0].phone, "+12035839125");
        assert_eq!(contacts[1].phone, "+15551234567");
        assert_eq!(contacts[2].phone, "+442079460958");
    }

    #[test]
    fn skips_short_names_and_digitless_values() {
        let contacts = parse_phone_directory("J: 5551234567\nAlex: unknown\nNo separator here");
        assert!(contacts.is_empty());
    }

    #[test]
    fn en_dash_separator() {
        let contacts = parse_phone_directory("Coach \u{2013} 555.123.4567");
        assert_eq!(contacts[0].name, "Coach");
        assert_eq!(contacts[0].phone, "+15551234567");
    }

    #[test]
    fn unrecognised_numbers_kept_raw() {
        assert_eq!(normalize_phone("ext 12"), "ext 12");
        assert_eq!(normalize_phone("555-1234"), "555-1234");
    }
}
