use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub enum Error {
    /// Connection refused, DNS failure or request timeout.
    NetworkError(String),
    /// Inverter answered with a non-200 status.
    HttpStatusError(u16, String),
    /// Body is not JSON or lacks the expected nested object.
    ParseError(String),
    /// Fronius `Head.Status.Code` other than 0.
    ApiError(u64, String),
    ConfigError(String),
    FormatError,
    InternalError,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::NetworkError(s) | Error::HttpStatusError(_, s) => {
                let error = format!("<html><body><h3>502 Bad Gateway</h3>Error while reading inverter API: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::BadGateway)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                Response::build()
                    .status(Status::InternalServerError)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
        }
    }
}
