//! Contacts and name resolution.

use serde::{Deserialize, Serialize};

/// A person the agent is allowed to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    /// E.164, e.g. `+12035839125`
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Outcome of resolving a human name against the contact book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactMatch {
    Found(Contact),
    NotFound,
    /// More than one contact matched; carries every candidate name.
    Ambiguous(Vec<String>),
}

/// The known contact set. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBook {
    contacts: Vec<Contact>,
}

impl ContactBook {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// The contacts compiled into the binary.
    pub fn builtin() -> Self {
        Self::new(vec![
            Contact::new("Ryan", "+12035839125").with_notes("Owner/Primary contact"),
        ])
    }

    /// Add contacts whose phone number is not already known.
    pub fn merge(&mut self, other: impl IntoIterator<Item = Contact>) {
        for contact in other {
            if !self.contains_phone(&contact.phone) {
                self.contacts.push(contact);
            }
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contains_phone(&self, phone: &str) -> bool {
        self.find_by_phone(phone).is_some()
    }

    pub fn find_by_phone(&self, phone: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.phone == phone)
    }

    /// Case-insensitive substring match on the contact name.
    ///
    /// An exact (case-insensitive) full-name match wins outright, so "Ryan"
    /// stays addressable next to "Ryan Smith". Otherwise zero substring
    /// matches is `NotFound`, one is `Found`, several is `Ambiguous`.
    pub fn resolve(&self, name: &str) -> ContactMatch {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return ContactMatch::NotFound;
        }

        if let Some(exact) = self.contacts.iter().find(|c| c.name.to_lowercase() == needle) {
            return ContactMatch::Found(exact.clone());
        }

        let matches: Vec<&Contact> = self
            .contacts
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect();

        match matches.as_slice() {
            [] => ContactMatch::NotFound,
            [only] => ContactMatch::Found((*only).clone()),
            many => ContactMatch::Ambiguous(many.iter().map(|c| c.name.clone()).collect()),
        }
    }

    /// `Available contacts:` followed by one `  - Name: phone` line per contact, sorted by name.
    pub fn describe(&self) -> String {
        if self.contacts.is_empty() {
            return "No contacts available. Please check the phone directory document.".into();
        }
        let mut sorted: Vec<&Contact> = self.contacts.iter().collect();
        sorted.sort_by_key(|c| c.name.to_lowercase());
        let lines: Vec<String> = sorted
            .iter()
            .map(|c| format!("  - {}: {}", c.name, c.phone))
            .collect();
        format!("Available contacts:\n{}", lines.join("\n"))
    }
}
