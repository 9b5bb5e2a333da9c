//! Flat-file user store.
//!
//! File layout:
//! ```json
//! { "users": [ { "email": "...", "name": "...", "role": "student", "password_hash": "..." } ] }
//! ```
//!
//! The file is re-read on every call so edits made by another writer are
//! picked up without a restart. Writes replace the whole document.

use super::user::User;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("failed to access user store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed user store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("user '{0}' already exists")]
    Duplicate(String),
}

pub type Result<T> = std::result::Result<T, UserStoreError>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<User>,
}

/// JSON-file backed user store.
#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every user from disk. A missing file reads as an empty store.
    pub fn load(&self) -> Result<Vec<User>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(UserStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: UsersFile =
            serde_json::from_str(&raw).map_err(|source| UserStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(file.users)
    }

    /// Replace the whole document with `users`.
    pub fn save(&self, users: &[User]) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.write_unlocked(users)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.load()?.into_iter().find(|u| u.email == email))
    }

    /// Rewrite the stored hash for `email`. Returns `false` if no such user.
    pub fn set_password_hash(&self, email: &str, password_hash: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut users = self.load()?;
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_owned();
        self.write_unlocked(&users)?;
        Ok(true)
    }

    /// Append a new user. Fails with [`UserStoreError::Duplicate`] if the
    /// email is taken.
    pub fn insert(&self, user: User) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut users = self.load()?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserStoreError::Duplicate(user.email));
        }
        users.push(user);
        self.write_unlocked(&users)
    }

    // Write to a sibling temp file, then rename over the target.
    fn write_unlocked(&self, users: &[User]) -> Result<()> {
        let io_err = |source| UserStoreError::Io {
            path: self.path.clone(),
            source,
        };
        let doc = UsersFile {
            users: users.to_vec(),
        };
        let mut body = serde_json::to_string_pretty(&doc).map_err(|source| {
            UserStoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        body.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use tempfile::TempDir;

    fn user(email: &str, role: Role) -> User {
        User {
            email: email.into(),
            name: email.split('@').next().unwrap_or_default().into(),
            role,
            password_hash: "pbkdf2-sha256$1$00$00".into(),
        }
    }

    fn test_store() -> (TempDir, UserStore) {
        let tmp = TempDir::new().unwrap();
        let store = UserStore::new(tmp.path().join("users.json"));
        (tmp, store)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_tmp, store) = test_store();
        assert!(store.load().unwrap().is_empty());
        assert!(store.find_by_email("x@mergington.edu").unwrap().is_none());
    }

    #[test]
    fn save_and_find() {
        let (_tmp, store) = test_store();
        store
            .save(&[
                user("emma@mergington.edu", Role::Student),
                user("principal@mergington.edu", Role::Administrator),
            ])
            .unwrap();

        let found = store.find_by_email("principal@mergington.edu").unwrap();
        assert_eq!(found.unwrap().role, Role::Administrator);
        assert!(store.find_by_email("ghost@mergington.edu").unwrap().is_none());
    }

    #[test]
    fn file_format_matches_users_document() {
        let (_tmp, store) = test_store();
        store.save(&[user("emma@mergington.edu", Role::Student)]).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["users"][0]["email"], "emma@mergington.edu");
        assert_eq!(doc["users"][0]["role"], "student");
        assert!(doc["users"][0]["password_hash"].is_string());
        assert!(raw.contains("\n  \"users\""));
    }

    #[test]
    fn rereads_external_edits() {
        let (_tmp, store) = test_store();
        store.save(&[user("emma@mergington.edu", Role::Student)]).unwrap();

        std::fs::write(
            store.path(),
            r#"{"users":[{"email":"new@mergington.edu","name":"New","role":"teacher","password_hash":"x"}]}"#,
        )
        .unwrap();

        assert!(store.find_by_email("emma@mergington.edu").unwrap().is_none());
        let new = store.find_by_email("new@mergington.edu").unwrap().unwrap();
        assert_eq!(new.role, Role::Teacher);
    }

    #[test]
    fn set_password_hash_rewrites_only_target() {
        let (_tmp, store) = test_store();
        store
            .save(&[
                user("emma@mergington.edu", Role::Student),
                user("liam@mergington.edu", Role::Student),
            ])
            .unwrap();

        assert!(store
            .set_password_hash("emma@mergington.edu", "new-hash")
            .unwrap());

        let users = store.load().unwrap();
        assert_eq!(users[0].password_hash, "new-hash");
        assert_eq!(users[1].password_hash, "pbkdf2-sha256$1$00$00");
    }

    #[test]
    fn set_password_hash_unknown_email() {
        let (_tmp, store) = test_store();
        store.save(&[user("emma@mergington.edu", Role::Student)]).unwrap();
        assert!(!store.set_password_hash("ghost@mergington.edu", "h").unwrap());
    }

    #[test]
    fn insert_rejects_duplicate_email() {
        let (_tmp, store) = test_store();
        store.insert(user("emma@mergington.edu", Role::Student)).unwrap();

        let err = store
            .insert(user("emma@mergington.edu", Role::Teacher))
            .unwrap_err();
        assert!(matches!(err, UserStoreError::Duplicate(_)));
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (_tmp, store) = test_store();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            UserStoreError::Parse { .. }
        ));
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.path(),
            r#"{"users":[{"email":"a@b","name":"A","role":"janitor","password_hash":"x"}]}"#,
        )
        .unwrap();
        assert!(store.load().is_err());
    }
}
