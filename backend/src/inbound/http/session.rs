//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Provides a thin wrapper around Actix sessions so handlers only deal with
//! domain-friendly operations such as persisting a user id or a toast.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "authenticated_user_id";
pub(crate) const TOAST_KEY: &str = "toast";
pub(crate) const CSRF_KEY: &str = "csrf_token";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), Error> {
        self.0.insert(key, value).map_err(Error::internal_from)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.0.get::<T>(key).map_err(Error::internal_from)
    }

    /// Read and remove `key` in one step.
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let value = self.get(key)?;
        if value.is_some() {
            self.0.remove(key);
        }
        Ok(value)
    }

    pub fn remove(&self, key: &str) {
        self.0.remove(key);
    }

    /// Issue a new session token, keeping state. The previous token stops
    /// resolving once the response is written.
    pub fn renew_token(&self) {
        self.0.renew();
    }

    /// Persist the authenticated user's id in the session.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.put(USER_ID_KEY, user_id.as_ref())
    }

    /// Fetch the current user id from the session, if present.
    ///
    /// A malformed stored id is logged and treated as absent.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        match self.get::<String>(USER_ID_KEY)? {
            Some(raw) => match UserId::new(raw) {
                Ok(id) => Ok(Some(id)),
                Err(error) => {
                    tracing::warn!(%error, "invalid user id in session");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn forget_user(&self) {
        self.remove(USER_ID_KEY);
    }

    pub fn put_toast(&self, message: &str) -> Result<(), Error> {
        self.put(TOAST_KEY, message)
    }

    /// One-shot toast for the next rendered page; empty when unset.
    pub fn pop_toast(&self) -> Result<String, Error> {
        Ok(self.pop::<String>(TOAST_KEY)?.unwrap_or_default())
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
