//! The authentication engine.
//!
//! [`AuthService`] runs the user operations (register, login, authenticate,
//! logout, update) against a shared [`Store`] on behalf of a *caller*: a
//! system account whose salt signs the request envelope.
//!
//! Every operation follows the same shape:
//!
//! 1. check the request head (fields and replay window) and its signature
//! 2. decode the JSON body into the operation's payload
//! 3. fetch, mutate and persist the user
//! 4. release per-request storage resources, whatever happened above
//! 5. answer with a response envelope signed with the caller's salt
//!
//! Operations never return `Err`; failures become a response carrying the
//! error's status code and message and an empty body. Password hashing is
//! CPU-bound and runs on tokio's blocking pool.

mod options;
mod requests;

pub use options::{Permissions, ServiceOptions, UpdateField};
pub use requests::{LoginRequest, NewUser, RegisterRequest, TokenRequest, UpdateRequest};

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::task::JoinError;

use crate::clock::{Clock, SystemClock};
use crate::crypt::{CryptError, EncryptDriver};
use crate::envelope::{EnvelopeError, Head, Package, Request, Response, ResponseHead};
use crate::storage::{StorageError, Store};
use crate::user::{User, UserError, UserReturn, generate_token};
use crate::{Error, Result};

const OK_MESSAGE: &str = "OK";

/// The operations a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    Authenticate,
    Logout,
    Update,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Register,
        Operation::Login,
        Operation::Authenticate,
        Operation::Logout,
        Operation::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::Authenticate => "authenticate",
            Operation::Logout => "logout",
            Operation::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

/// A successful operation's answer.
struct Outcome {
    message: String,
    user: UserReturn,
}

impl Outcome {
    fn user(user: &User, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user: UserReturn::from(user),
        }
    }
}

fn worker_error(err: JoinError) -> Error {
    CryptError::HashFailed {
        reason: format!("hashing worker failed: {err}"),
    }
    .into()
}

/// Runs user operations against a store.
///
/// Cheap to share: wrap it in an `Arc` and call it from many tasks at once.
pub struct AuthService {
    crypt: Arc<dyn EncryptDriver>,
    clock: Arc<dyn Clock>,
    options: ServiceOptions,
}

impl AuthService {
    pub fn new(crypt: Arc<dyn EncryptDriver>, options: ServiceOptions) -> Self {
        Self::with_clock(crypt, Arc::new(SystemClock), options)
    }

    pub fn with_clock(
        crypt: Arc<dyn EncryptDriver>,
        clock: Arc<dyn Clock>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            crypt,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Name of the encryption driver in use.
    pub fn crypt_name(&self) -> String {
        self.crypt.id()
    }

    /// Resolve the caller, then run `operation` for it.
    ///
    /// A request from anyone but an active system account is answered with an
    /// unsigned error response.
    pub async fn dispatch(&self, store: &Store, operation: Operation, request: Request) -> Response {
        let sequence = request.head.sequence;
        let caller = match self.resolve_caller(store, &request.head).await {
            Ok(caller) => caller,
            Err(err) => {
                tracing::warn!(
                    operation = %operation,
                    domain = %request.head.domain,
                    id = %request.head.id,
                    error = %err,
                    "Rejected caller"
                );
                self.release(store).await;
                return self.respond(None, operation, sequence, Err(err));
            }
        };

        match operation {
            Operation::Register => self.register(store, &caller, request).await,
            Operation::Login => self.login(store, &caller, request).await,
            Operation::Authenticate => self.authenticate(store, &caller, request).await,
            Operation::Logout => self.logout(store, &caller, request).await,
            Operation::Update => {
                self.update(store, &caller, request, &self.options.permissions)
                    .await
            }
        }
    }

    /// The system account named by the head: `Id` is its login name in `Domain`.
    pub async fn resolve_caller(&self, store: &Store, head: &Head) -> Result<User> {
        if head.domain.is_empty() || head.id.is_empty() {
            return Err(EnvelopeError::InvalidHeader.into());
        }
        let caller = match store.fetch_user_by_login(&head.domain, &head.id).await {
            Ok(caller) => caller,
            Err(err) if err.is_not_found() => return Err(UserError::CallerNotPermitted.into()),
            Err(err) => return Err(err),
        };
        if !caller.is_system() || !caller.is_active() || caller.is_deleted() {
            return Err(UserError::CallerNotPermitted.into());
        }
        Ok(caller)
    }

    pub async fn register(&self, store: &Store, caller: &User, request: Request) -> Response {
        let sequence = request.head.sequence;
        let result = self
            .released(store, self.register_user(store, caller, request))
            .await;
        self.respond(Some(caller), Operation::Register, sequence, result)
    }

    pub async fn login(&self, store: &Store, caller: &User, request: Request) -> Response {
        let sequence = request.head.sequence;
        let result = self
            .released(store, self.login_user(store, caller, request))
            .await;
        self.respond(Some(caller), Operation::Login, sequence, result)
    }

    /// Check a session token and slide its idle timeout.
    pub async fn authenticate(&self, store: &Store, caller: &User, request: Request) -> Response {
        let sequence = request.head.sequence;
        let result = self
            .released(store, self.authenticate_user(store, caller, request))
            .await;
        self.respond(Some(caller), Operation::Authenticate, sequence, result)
    }

    pub async fn logout(&self, store: &Store, caller: &User, request: Request) -> Response {
        let sequence = request.head.sequence;
        let result = self
            .released(store, self.logout_user(store, caller, request))
            .await;
        self.respond(Some(caller), Operation::Logout, sequence, result)
    }

    /// Change the fields in the request that `permissions` allows.
    pub async fn update(
        &self,
        store: &Store,
        caller: &User,
        request: Request,
        permissions: &Permissions,
    ) -> Response {
        let sequence = request.head.sequence;
        let result = self
            .released(store, self.update_user(store, caller, request, permissions))
            .await;
        self.respond(Some(caller), Operation::Update, sequence, result)
    }

    /// Create an account directly, bypassing the envelope.
    ///
    /// This is how system accounts are bootstrapped.
    pub async fn add_user(&self, store: &Store, new_user: NewUser, is_system: bool) -> Result<User> {
        self.released(store, self.insert_user(store, new_user, is_system))
            .await
    }

    async fn release(&self, store: &Store) {
        if let Err(err) = store.release().await {
            tracing::warn!(error = %err, "Failed to release store resources");
        }
    }

    async fn released<T>(&self, store: &Store, work: impl Future<Output = Result<T>>) -> Result<T> {
        let result = work.await;
        self.release(store).await;
        result
    }

    fn respond(
        &self,
        caller: Option<&User>,
        operation: Operation,
        sequence: u64,
        result: Result<Outcome>,
    ) -> Response {
        let mut head = ResponseHead::new(sequence, self.clock.now());
        let result = result
            .and_then(|outcome| Ok((serde_json::to_string(&outcome.user)?, outcome.message)));
        let body = match result {
            Ok((body, message)) => {
                head.message = message;
                body
            }
            Err(err) => {
                head.code = err.status_code();
                head.message = err.to_string();
                if head.code >= 500 {
                    tracing::error!(operation = %operation, error = %err, "Operation failed");
                } else {
                    tracing::debug!(operation = %operation, code = head.code, error = %err, "Operation refused");
                }
                String::new()
            }
        };

        let mut response = Package::new(head, body);
        if let Some(caller) = caller {
            response.set_secret(caller.salt());
            if let Err(err) = response.sign() {
                tracing::error!(operation = %operation, error = %err, "Failed to sign response");
            }
        }
        response
    }

    /// Check head and signature, then decode the body.
    fn open_request<T: DeserializeOwned>(&self, caller: &User, mut request: Request) -> Result<T> {
        request.head.check_with(self.clock.as_ref())?;
        request.set_secret(caller.salt());
        if !request.good_signature() {
            return Err(EnvelopeError::InvalidSignature.into());
        }
        Ok(request.body_json()?)
    }

    async fn hash_password(&self, clear: String, user_salt: String) -> Result<String> {
        let crypt = Arc::clone(&self.crypt);
        tokio::task::spawn_blocking(move || crypt.encrypt_password(&clear, &user_salt))
            .await
            .map_err(worker_error)?
    }

    async fn verify_password(&self, user: &User, clear: String) -> Result<bool> {
        let crypt = Arc::clone(&self.crypt);
        let hash = user.password_hash().to_string();
        let user_salt = user.salt().to_string();
        tokio::task::spawn_blocking(move || crypt.compare_passwords(&hash, &clear, &user_salt))
            .await
            .map_err(worker_error)
    }

    async fn insert_user(&self, store: &Store, new_user: NewUser, is_system: bool) -> Result<User> {
        let mut user = User::new(self.clock.now());
        user.set_domain(&new_user.domain)?;
        user.set_login_name(&new_user.login)?;
        user.set_name(&new_user.name)?;
        user.set_email(&new_user.email)?;
        User::validate_password(&new_user.password)?;

        let hash = self
            .hash_password(new_user.password, user.salt().to_string())
            .await?;
        user.set_password_hash(hash);
        user.set_system(is_system);
        store.user_insert(&user).await?;
        tracing::info!(
            guid = user.guid(),
            domain = user.domain(),
            login = user.login_name(),
            is_system,
            "Added user"
        );
        Ok(user)
    }

    /// The logged-in user holding `token`, within the caller's domain.
    async fn session_user(&self, store: &Store, caller: &User, token: &str) -> Result<User> {
        if token.is_empty() {
            return Err(EnvelopeError::InvalidBody {
                reason: "Token is required".into(),
            }
            .into());
        }
        let user = store.fetch_user_by_token(token).await?;
        if user.domain() != caller.domain() {
            return Err(StorageError::NotFound.into());
        }
        if user.is_deleted() || !user.is_active() {
            return Err(UserError::Inactive.into());
        }
        Ok(user)
    }

    async fn register_user(&self, store: &Store, caller: &User, request: Request) -> Result<Outcome> {
        let req: RegisterRequest = self.open_request(caller, request)?;
        let user = self
            .insert_user(store, NewUser::from_register(caller.domain(), req), false)
            .await?;
        Ok(Outcome::user(&user, OK_MESSAGE))
    }

    async fn login_user(&self, store: &Store, caller: &User, request: Request) -> Result<Outcome> {
        let req: LoginRequest = self.open_request(caller, request)?;
        // Unknown users and wrong passwords get the same answer.
        let mut user = match store.fetch_user_by_login(caller.domain(), &req.login).await {
            Ok(user) => user,
            Err(err) if err.is_not_found() => return Err(UserError::InvalidCredentials.into()),
            Err(err) => return Err(err),
        };

        if let Some(threshold) = self.options.lockout_threshold
            && user.fail_count() >= threshold
        {
            tracing::warn!(
                guid = %user.guid(),
                fail_count = user.fail_count(),
                "Login refused for locked account"
            );
            return Err(UserError::Locked {
                fail_count: user.fail_count(),
            }
            .into());
        }

        let now = self.clock.now();
        if !self.verify_password(&user, req.password).await? {
            user.record_failed_login(now);
            store.user_update(&user).await?;
            tracing::info!(
                guid = user.guid(),
                fail_count = user.fail_count(),
                "Failed login"
            );
            return Err(UserError::InvalidCredentials.into());
        }
        if user.is_deleted() || !user.is_active() {
            return Err(UserError::Inactive.into());
        }
        if user.is_logged_in() && !user.session_expired(now) {
            return Err(UserError::AlreadyLoggedIn.into());
        }

        user.record_login(
            generate_token(),
            now,
            self.options.session_timeout,
            self.options.max_session,
        )?;
        store.user_update(&user).await?;
        tracing::info!(guid = user.guid(), domain = user.domain(), "User logged in");
        Ok(Outcome::user(&user, OK_MESSAGE))
    }

    async fn authenticate_user(
        &self,
        store: &Store,
        caller: &User,
        request: Request,
    ) -> Result<Outcome> {
        let req: TokenRequest = self.open_request(caller, request)?;
        let mut user = self.session_user(store, caller, &req.token).await?;
        let now = self.clock.now();
        if user.session_expired(now) {
            return Err(UserError::SessionExpired.into());
        }
        user.record_authentication(now, self.options.session_timeout)?;
        store.user_update(&user).await?;
        Ok(Outcome::user(&user, OK_MESSAGE))
    }

    async fn logout_user(&self, store: &Store, caller: &User, request: Request) -> Result<Outcome> {
        let req: TokenRequest = self.open_request(caller, request)?;
        let mut user = self.session_user(store, caller, &req.token).await?;
        user.record_logout(self.clock.now());
        store.user_update(&user).await?;
        tracing::info!(guid = user.guid(), domain = user.domain(), "User logged out");
        Ok(Outcome::user(&user, OK_MESSAGE))
    }

    async fn update_user(
        &self,
        store: &Store,
        caller: &User,
        request: Request,
        permissions: &Permissions,
    ) -> Result<Outcome> {
        if permissions.is_empty() {
            return Err(UserError::UpdatesDisabled.into());
        }
        let req: UpdateRequest = self.open_request(caller, request)?;
        let mut user = self.session_user(store, caller, &req.token).await?;
        let now = self.clock.now();
        if user.session_expired(now) {
            return Err(UserError::SessionExpired.into());
        }

        let mut updated = Vec::new();
        if !req.login.is_empty() && permissions.allows(UpdateField::Login) {
            user.set_login_name(&req.login)?;
            updated.push(UpdateField::Login);
        }
        if !req.name.is_empty() && permissions.allows(UpdateField::Name) {
            user.set_name(&req.name)?;
            updated.push(UpdateField::Name);
        }
        if !req.email.is_empty() && permissions.allows(UpdateField::Email) {
            user.set_email(&req.email)?;
            updated.push(UpdateField::Email);
        }
        let wants_password = !req.old_password.is_empty() || !req.new_password.is_empty();
        if wants_password && permissions.allows(UpdateField::Password) {
            if req.old_password.is_empty() || req.new_password.is_empty() {
                return Err(UserError::InvalidPassword {
                    reason: "both old and new password are required".into(),
                }
                .into());
            }
            User::validate_password(&req.new_password)?;
            if !self.verify_password(&user, req.old_password).await? {
                return Err(UserError::InvalidCredentials.into());
            }
            let hash = self
                .hash_password(req.new_password, user.salt().to_string())
                .await?;
            user.set_password_hash(hash);
            updated.push(UpdateField::Password);
        }

        if updated.is_empty() {
            return Err(UserError::NoFieldsUpdated.into());
        }
        user.touch(now);
        store.user_update(&user).await?;

        let labels: Vec<&str> = updated.iter().map(UpdateField::label).collect();
        tracing::info!(guid = user.guid(), fields = ?labels, "Updated user");
        Ok(Outcome::user(
            &user,
            format!("Fields updated: {}", labels.join(", ")),
        ))
    }
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("crypt", &self.crypt.id())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
