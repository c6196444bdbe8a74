/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::sys::SysInfo;
use jsonwebtoken::{decode, DecodingKey, Header, Validation};
use rocket::http::{CookieJar, Status};
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::State;

/// Name of the private cookie carrying the session token.
pub const SESSION_COOKIE: &str = "jwt";
// One month
pub const COOKIE_DURATION: i64 = 2592000;

/// Claims of a session token; `sub` is the user id of the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: usize,
}

impl Claims {
    #[cfg(test)]
    pub(crate) fn for_user(user_id: &str) -> Claims {
        let expires = chrono::Utc::now() + chrono::Duration::seconds(COOKIE_DURATION);
        Claims {
            sub: user_id.to_owned(),
            exp: usize::try_from(expires.timestamp()).unwrap_or(usize::MAX),
        }
    }

    #[cfg(test)]
    pub(crate) fn put(&self, key: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(
            &Header::default(),
            self,
            &jsonwebtoken::EncodingKey::from_secret(key),
        )
    }

    pub fn interpret(key: &[u8], token: &str) -> Result<(Claims, Header), String> {
        let validation = Validation::default();
        match decode::<Claims>(token, &DecodingKey::from_secret(key), &validation) {
            Ok(c) => Ok((c.claims, c.header)),
            Err(err) => Err(err.to_string()),
        }
    }

    pub(crate) fn from_private_cookie(
        cookies: &CookieJar<'_>,
        config: &SysInfo,
    ) -> Result<(Claims, Header), crate::Error> {
        let cookie = cookies
            .get_private(SESSION_COOKIE)
            .ok_or(crate::Error::Unauthenticated {})?;
        Claims::interpret(config.settings.cookie_key.as_bytes(), cookie.value())
            .map_err(|_| crate::Error::Unauthenticated {})
    }
}

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Principal {
    type Error = crate::Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<SysInfo>>().await {
            Outcome::Success(config) => config,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    crate::Error::Internal {},
                ))
            }
        };
        match Claims::from_private_cookie(req.cookies(), config) {
            Ok((claims, _)) if !claims.sub.is_empty() => Outcome::Success(Principal {
                user_id: claims.sub,
            }),
            Ok(_) => Outcome::Error((Status::Unauthorized, crate::Error::Unauthenticated {})),
            Err(e) => Outcome::Error((Status::Unauthorized, e)),
        }
    }
}
