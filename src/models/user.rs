use serde::{Deserialize, Serialize};

/// A user document as stored in the `users` collection.
///
/// The password is kept exactly as submitted; this layer does no hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Fields a user update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(password) = self.password {
            user.password = password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> User {
        User {
            id: 1,
            name: "Jane".into(),
            email: "jane@example.com".into(),
            phone: "123".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn serializes_identifier_as_underscore_id() {
        let value = serde_json::to_value(jane()).unwrap();

        assert_eq!(value["_id"], 1);
        assert_eq!(value["email"], "jane@example.com");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn omitted_fields_are_left_unchanged() {
        let mut user = jane();
        UserChanges {
            name: Some("Janet".into()),
            ..Default::default()
        }
        .apply(&mut user);

        assert_eq!(user.name, "Janet");
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.phone, "123");
        assert_eq!(user.password, "pw");
    }
}
