//! In-memory contact collection.

use async_trait::async_trait;
use gatehouse_authz::{AuthzResult, EntityStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Resource kind of the contact collection.
pub const CONTACT_KIND: &str = "contact";

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Principal that created the contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Contact {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            owner: None,
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
}

/// Body of an update request. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Contacts kept in insertion order behind a lock.
#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: RwLock<Vec<Contact>>,
}

impl ContactStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
        }
    }

    /// Store holding the two demo contacts.
    pub fn seeded() -> Self {
        Self::new(vec![
            Contact::new("contact-1", "John Smith", "john@acme.com"),
            Contact::new("contact-2", "Sarah Jane", "sarah@acme.com"),
        ])
    }

    pub fn get(&self, id: &str) -> Option<Contact> {
        self.contacts.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn all(&self) -> Vec<Contact> {
        self.contacts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.contacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.read().is_empty()
    }

    /// Insert a new contact with a fresh id.
    pub fn insert(&self, new: NewContact, owner: Option<String>) -> Contact {
        let contact = Contact {
            id: format!("contact-{}", uuid::Uuid::new_v4()),
            name: new.name,
            email: new.email,
            owner,
        };
        self.contacts.write().push(contact.clone());
        contact
    }

    /// Apply `patch` to contact `id`. `None` if it no longer exists.
    pub fn update(&self, id: &str, patch: ContactPatch) -> Option<Contact> {
        let mut contacts = self.contacts.write();
        let contact = contacts.iter_mut().find(|c| c.id == id)?;
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(email) = patch.email {
            contact.email = email;
        }
        Some(contact.clone())
    }

    /// Remove contact `id`, returning it.
    pub fn remove(&self, id: &str) -> Option<Contact> {
        let mut contacts = self.contacts.write();
        let index = contacts.iter().position(|c| c.id == id)?;
        Some(contacts.remove(index))
    }
}

#[async_trait]
impl EntityStore<Contact> for ContactStore {
    async fn find_one(&self, id: &str) -> AuthzResult<Option<Contact>> {
        Ok(self.get(id))
    }

    async fn find_all(&self) -> AuthzResult<Vec<Contact>> {
        Ok(self.all())
    }
}
