use std::io::Read;
use std::sync::Arc;

use iron::headers::{ContentType, Cookie, SetCookie};
use iron::mime::{Mime, SubLevel, TopLevel};
use iron::{status, AfterMiddleware, Handler, IronResult, Request, Response};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::database::PostStore;
use crate::error::ValidationError;
use crate::model::Post;

pub const NAME_COOKIE: &str = "name";
pub const NAME_COOKIE_MAX_AGE_SECS: u32 = 3600;
pub const MAX_NAME_CHARS: usize = 64;
pub const MAX_TEXT_CHARS: usize = 1000;

/// Match a `Result` into its inner value or
/// return `500 Internal Server Error` with a generic body, logging the cause.
/// The second variant returns the provided status with the error message instead.
macro_rules! try_handler {
    ( $e:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => {
                error!("request failed: {}", e);
                return Ok(Response::with((
                    status::InternalServerError,
                    error_body("internal server error"),
                )));
            }
        }
    };
    ( $e:expr, $error:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => return Ok(Response::with(($error, error_body(&e.to_string())))),
        }
    };
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

pub struct Handlers {
    pub feed: FeedHandler,
    pub sign: SignHandler,
}

impl Handlers {
    pub fn new(store: PostStore) -> Handlers {
        let store = Arc::new(store);
        Handlers {
            feed: FeedHandler::new(store.clone()),
            sign: SignHandler::new(store),
        }
    }
}

#[derive(Serialize)]
struct Feed<'a> {
    name: &'a str,
    posts: &'a [Post],
}

pub struct FeedHandler {
    store: Arc<PostStore>,
}

impl FeedHandler {
    fn new(store: Arc<PostStore>) -> FeedHandler {
        FeedHandler { store: store }
    }
}

impl Handler for FeedHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let name = req
            .headers
            .get::<Cookie>()
            .and_then(|cookies| name_from_cookies(&cookies.0))
            .unwrap_or_default();

        let posts = try_handler!(self.store.recent());
        let payload = try_handler!(serde_json::to_string(&Feed {
            name: &name,
            posts: &posts,
        }));
        Ok(Response::with((status::Ok, payload)))
    }
}

/// Body of a guestbook submission, before validation.
#[derive(Debug, Deserialize)]
pub struct Submission {
    pub name: String,
    pub text: String,
}

impl Submission {
    /// Decodes an `application/x-www-form-urlencoded` body, as sent by an HTML form.
    pub fn from_form(body: &str) -> Result<Submission, ValidationError> {
        let mut name = None;
        let mut text = None;

        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(&value.replace('+', " "))
                .map_err(|_| ValidationError::MalformedForm)?
                .into_owned();
            match key {
                "name" => name = Some(value),
                "text" => text = Some(value),
                _ => {}
            }
        }

        Ok(Submission {
            name: name.ok_or(ValidationError::MissingField("name"))?,
            text: text.ok_or(ValidationError::MissingField("text"))?,
        })
    }

    pub fn into_post(self) -> Result<Post, ValidationError> {
        let name = self.name.trim();
        let text = self.text.trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong { max: MAX_NAME_CHARS });
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(ValidationError::TextTooLong { max: MAX_TEXT_CHARS });
        }

        Ok(Post::new(name, text))
    }
}

pub struct SignHandler {
    store: Arc<PostStore>,
}

impl SignHandler {
    fn new(store: Arc<PostStore>) -> SignHandler {
        SignHandler { store: store }
    }
}

impl Handler for SignHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let mut payload = String::new();
        try_handler!(req.body.read_to_string(&mut payload), status::BadRequest);

        let submission = if is_form(req) {
            try_handler!(Submission::from_form(&payload), status::BadRequest)
        } else {
            try_handler!(serde_json::from_str::<Submission>(&payload), status::BadRequest)
        };
        let post = try_handler!(submission.into_post(), status::BadRequest);

        try_handler!(self.store.save(post.clone()));
        info!("{} signed the guestbook", post.name());

        let body = try_handler!(serde_json::to_string(&post));
        let mut res = Response::with((status::Created, body));
        res.headers.set(SetCookie(vec![name_cookie(post.name())]));
        Ok(res)
    }
}

fn is_form(req: &Request) -> bool {
    match req.headers.get::<ContentType>() {
        Some(&ContentType(Mime(TopLevel::Application, SubLevel::WwwFormUrlEncoded, _))) => true,
        _ => false,
    }
}

/// `Set-Cookie` value remembering the poster's name for the next visit.
pub fn name_cookie(name: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        NAME_COOKIE,
        urlencoding::encode(name),
        NAME_COOKIE_MAX_AGE_SECS
    )
}

/// Finds the `name` cookie among the request's cookie pairs.
pub fn name_from_cookies(cookies: &[String]) -> Option<String> {
    cookies
        .iter()
        .flat_map(|cookie| cookie.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == NAME_COOKIE)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

pub struct JsonAfterMiddleware;

impl AfterMiddleware for JsonAfterMiddleware {
    fn after(&self, _: &mut Request, mut res: Response) -> IronResult<Response> {
        res.headers.set(ContentType::json());
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, text: &str) -> Submission {
        Submission {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn submission_is_trimmed() {
        let post = submission("  alice ", "\thi\n").into_post().unwrap();
        assert_eq!(post.name(), "alice");
        assert_eq!(post.text(), "hi");
        assert!(post.created_at().is_some());
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            submission("   ", "hi").into_post().unwrap_err(),
            ValidationError::EmptyName
        );
        assert_eq!(
            submission("bob", "").into_post().unwrap_err(),
            ValidationError::EmptyText
        );
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let long_name = "n".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(
            submission(&long_name, "hi").into_post().unwrap_err(),
            ValidationError::NameTooLong { max: MAX_NAME_CHARS }
        );

        let long_text = "é".repeat(MAX_TEXT_CHARS + 1);
        assert_eq!(
            submission("bob", &long_text).into_post().unwrap_err(),
            ValidationError::TextTooLong { max: MAX_TEXT_CHARS }
        );

        let exact = "é".repeat(MAX_TEXT_CHARS);
        assert!(submission("bob", &exact).into_post().is_ok());
    }

    #[test]
    fn form_body_is_decoded() {
        let submission = Submission::from_form("name=Zo%C3%AB&text=hello+there%21&_csrf=x").unwrap();
        assert_eq!(submission.name, "Zoë");
        assert_eq!(submission.text, "hello there!");
    }

    #[test]
    fn form_body_with_empty_value_reaches_validation() {
        let submission = Submission::from_form("name=&text=hi").unwrap();
        assert_eq!(submission.into_post().unwrap_err(), ValidationError::EmptyName);
    }

    #[test]
    fn form_body_requires_both_fields() {
        assert_eq!(
            Submission::from_form("name=alice").unwrap_err(),
            ValidationError::MissingField("text")
        );
        assert_eq!(
            Submission::from_form("").unwrap_err(),
            ValidationError::MissingField("name")
        );
        assert_eq!(
            Submission::from_form("name=%FF&text=hi").unwrap_err(),
            ValidationError::MalformedForm
        );
    }

    #[test]
    fn submission_rejects_missing_fields() {
        assert!(serde_json::from_str::<Submission>(r#"{"name":"alice"}"#).is_err());
    }

    #[test]
    fn name_cookie_round_trips_through_header() {
        let header = name_cookie("Zoë; admin=1");
        assert!(header.starts_with("name=Zo%C3%AB%3B%20admin%3D1;"));
        assert!(header.contains("HttpOnly"));
        assert!(header.ends_with("Max-Age=3600"));

        let pair = header.split(';').next().unwrap().to_string();
        assert_eq!(
            name_from_cookies(&[pair]),
            Some("Zoë; admin=1".to_string())
        );
    }

    #[test]
    fn name_cookie_is_found_among_others() {
        let cookies = vec!["session=abc".to_string(), "theme=dark; name=carol".to_string()];
        assert_eq!(name_from_cookies(&cookies), Some("carol".to_string()));
        assert_eq!(name_from_cookies(&["nickname=x".to_string()]), None);
    }

    #[test]
    fn error_body_is_json() {
        let body: serde_json::Value = serde_json::from_str(&error_body("nope")).unwrap();
        assert_eq!(body["error"], "nope");
    }
}
