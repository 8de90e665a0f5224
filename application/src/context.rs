//! [`Context`]-related definitions.

use std::sync::{
    atomic::{self, AtomicU16},
    Arc,
};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use secrecy::{ExposeSecret as _, SecretString};
use tokio::sync::OnceCell;

use crate::{define_error, AsError as _, Error, JuniperResponse, Service};

/// Application context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`Admins`] allowed to modify data.
    admins: Arc<Admins>,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Whether the HTTP request is made by one of the [`Admins`].
    is_admin: OnceCell<bool>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Checks whether the current HTTP request is made by one of the
    /// [`Admins`].
    ///
    /// # Errors
    ///
    /// Errors if the provided `Authorization` header is malformed.
    pub async fn is_admin(&self) -> Result<bool, Error> {
        self.is_admin
            .get_or_try_init(|| async {
                let res = self
                    .parts
                    .clone()
                    .extract::<TypedHeader<Authorization<Basic>>>()
                    .await;
                match res {
                    Ok(TypedHeader(Authorization(basic))) => {
                        let is_admin = self
                            .admins
                            .authorize(basic.username(), basic.password());
                        if !is_admin {
                            tracing::debug!(
                                username = basic.username(),
                                "not an admin",
                            );
                        }
                        Ok(is_admin)
                    }
                    Err(e) if e.is_missing() => Ok(false),
                    Err(e) => Err(e.into_error()),
                }
            })
            .await
            .copied()
            .map_err(self.error())
    }

    /// Ensures the current HTTP request is made by one of the [`Admins`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the provided `Authorization` header is malformed;
    /// - the provided credentials don't belong to any of the [`Admins`].
    pub async fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin().await? {
            Ok(())
        } else {
            Err(PrivilegeError::Admin.into()).map_err(self.error())
        }
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let missing = |ext: &str| JuniperResponse {
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                Error::internal(&format!("missing `{ext}` extension"))
                    .into_field_error(),
            )),
        };

        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| missing("Service"))?;
        let admins = parts
            .extensions
            .get::<Arc<Admins>>()
            .cloned()
            .ok_or_else(|| missing("Admins"))?;

        Ok(Self {
            service,
            admins,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            is_admin: OnceCell::new(),
        })
    }
}

/// Credentials of administrators.
#[derive(Clone, Debug, Default)]
pub struct Admins {
    /// Usernames of administrators.
    usernames: Vec<String>,

    /// Password shared by administrators, if any is required.
    password: Option<SecretString>,
}

impl Admins {
    /// Creates new [`Admins`] out of the provided credentials.
    ///
    /// Any password is accepted if `password` is [`None`].
    #[must_use]
    pub fn new(usernames: Vec<String>, password: Option<SecretString>) -> Self {
        Self {
            usernames,
            password,
        }
    }

    /// Indicates whether there are no administrators at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }

    /// Checks whether the provided credentials belong to an administrator.
    #[must_use]
    pub fn authorize(&self, username: &str, password: &str) -> bool {
        self.usernames.iter().any(|u| u == username)
            && self
                .password
                .as_ref()
                .map_or(true, |p| p.expose_secret() == password)
    }
}

define_error! {
    enum PrivilegeError {
        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Only administrators can do this"]
        Admin,
    }
}
