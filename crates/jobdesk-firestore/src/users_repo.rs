//! Typed repository for user accounts.
//!
//! Email uniqueness is enforced at the storage layer: each account insert is
//! an atomic batch of the user document plus a guard document keyed by the
//! normalized email, both with exists=false preconditions. Two concurrent
//! registrations for the same email cannot both commit.

use std::collections::HashMap;

use metrics::counter;
use tracing::info;

use jobdesk_models::{normalize_email, User, UserId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    string_value, CollectionSelector, Document, FieldFilter, Filter, Order, StructuredQuery, Write,
};

const USERS: &str = "users";
const EMAIL_GUARDS: &str = "user_emails";

/// Result of attempting to insert a new account.
#[derive(Debug)]
pub enum CreateUserOutcome {
    Created,
    EmailTaken,
}

/// The two inserts claiming an account: the user document and the email
/// guard document, both failing if their target already exists.
fn account_writes(
    user_doc_name: String,
    guard_doc_name: String,
    user: &User,
) -> FirestoreResult<[Write; 2]> {
    let user_doc = Document::from_model(user)?;

    let mut guard_fields = HashMap::new();
    guard_fields.insert("userId".to_string(), string_value(user.id.as_str()));

    Ok([
        Write::insert(user_doc_name, user_doc.fields.unwrap_or_default()),
        Write::insert(guard_doc_name, guard_fields),
    ])
}

/// Repository for user documents.
#[derive(Clone)]
pub struct UsersRepo {
    client: FirestoreClient,
}

impl UsersRepo {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Insert a new account, atomically claiming its email.
    pub async fn create(&self, user: &User) -> FirestoreResult<CreateUserOutcome> {
        let writes = account_writes(
            self.client.full_document_name(USERS, user.id.as_str()),
            self.client.full_document_name(EMAIL_GUARDS, &user.email),
            user,
        )?;

        match self.client.batch_write(writes.into()).await {
            Ok(_) => {
                info!(user_id = %user.id, role = %user.role.as_str(), "registered user");
                counter!("users_registered_total", "role" => user.role.as_str().to_string())
                    .increment(1);
                Ok(CreateUserOutcome::Created)
            }
            Err(FirestoreError::AlreadyExists(_)) | Err(FirestoreError::PreconditionFailed(_)) => {
                Ok(CreateUserOutcome::EmailTaken)
            }
            Err(e) => Err(e),
        }
    }

    /// Insert several accounts in one atomic batch, claiming every email.
    ///
    /// Any taken email fails the whole batch; no account is written. The
    /// caller rejects intra-batch duplicates first, since two guard writes
    /// for the same document would also fail the batch.
    pub async fn create_batch(&self, users: &[User]) -> FirestoreResult<CreateUserOutcome> {
        let mut writes = Vec::with_capacity(users.len() * 2);
        for user in users {
            writes.extend(account_writes(
                self.client.full_document_name(USERS, user.id.as_str()),
                self.client.full_document_name(EMAIL_GUARDS, &user.email),
                user,
            )?);
        }

        match self.client.batch_write(writes).await {
            Ok(_) => {
                info!(count = users.len(), "registered users");
                for user in users {
                    counter!("users_registered_total", "role" => user.role.as_str().to_string())
                        .increment(1);
                }
                Ok(CreateUserOutcome::Created)
            }
            Err(FirestoreError::AlreadyExists(_)) | Err(FirestoreError::PreconditionFailed(_)) => {
                Ok(CreateUserOutcome::EmailTaken)
            }
            Err(e) => Err(e),
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &UserId) -> FirestoreResult<Option<User>> {
        match self.client.get_document(USERS, id.as_str()).await? {
            Some(doc) => Ok(Some(doc.into_model()?)),
            None => Ok(None),
        }
    }

    /// Look up a user by email. Emails are stored normalized.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<User>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: USERS.to_string(),
            }],
            filter: Filter::and(vec![FieldFilter::equal(
                "email",
                string_value(normalize_email(email)),
            )]),
            order_by: None,
            limit: Some(1),
        };

        let docs = self.client.run_query(query).await?;
        match docs.first() {
            Some(doc) => Ok(Some(doc.into_model()?)),
            None => Ok(None),
        }
    }

    /// List all users, newest first.
    pub async fn list(&self) -> FirestoreResult<Vec<User>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: USERS.to_string(),
            }],
            filter: None,
            order_by: Some(vec![Order::descending("createdAt")]),
            limit: None,
        };

        let docs = self.client.run_query(query).await?;
        docs.iter().map(|d| d.into_model()).collect()
    }

    /// Persist a profile change. The caller has already merged and validated
    /// the new profile against the user's role.
    pub async fn update_profile(&self, user: &User) -> FirestoreResult<()> {
        let doc = Document::from_model(user)?;
        let mut fields = doc.fields.unwrap_or_default();
        fields.retain(|k, _| k == "profile" || k == "updatedAt");

        self.client
            .patch_document(
                USERS,
                user.id.as_str(),
                fields,
                Some(vec!["profile".to_string(), "updatedAt".to_string()]),
                None,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use jobdesk_models::{Profile, Role, StudentProfile};

    fn sample_user(email: &str) -> User {
        User::new(
            email,
            "argon2-hash".to_string(),
            Role::Student,
            Profile::Student(StudentProfile {
                name: "Dana".to_string(),
                skills: vec![],
                resume_url: None,
            }),
        )
    }

    #[test]
    fn test_account_writes_guard_both_documents() {
        let user = sample_user("dana@example.com");
        let [user_write, guard_write] = account_writes(
            "projects/p/databases/(default)/documents/users/u1".into(),
            "projects/p/databases/(default)/documents/user_emails/dana@example.com".into(),
            &user,
        )
        .unwrap();

        assert_eq!(user_write.current_document.as_ref().unwrap().exists, Some(false));
        assert_eq!(guard_write.current_document.as_ref().unwrap().exists, Some(false));

        let user_fields = user_write.update.as_ref().unwrap().fields.as_ref().unwrap();
        assert!(user_fields.contains_key("email"));
        assert!(user_fields.contains_key("passwordHash"));

        let guard_fields = guard_write.update.as_ref().unwrap().fields.as_ref().unwrap();
        assert!(matches!(
            guard_fields.get("userId"),
            Some(Value::StringValue(id)) if id == user.id.as_str()
        ));
    }
}
