//! Failure reporting for interaction handlers.
//!
//! Handlers return `anyhow::Result`; [`classify`] turns a failure into the
//! short ephemeral text the requester sees, and [`log_failure`] logs it at a
//! level that matches its cause. Expected problems (bad input, no session,
//! unknown name) are not logged as errors.

use std::fmt::Display;

use embed_core::{truncate_error, Error as CoreError};
use embed_types::limits::ERROR_PREVIEW_LEN;
use embed_types::ValidationError;
use serenity::http::HttpError;
use tracing::{debug, error, warn};

/// What a failed interaction tells the requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The requester can fix this; reply, log at debug.
    User(String),
    /// Something broke on our side; reply with a truncated detail and log.
    Unexpected(String),
}

impl Failure {
    pub fn message(&self) -> &str {
        match self {
            Failure::User(msg) | Failure::Unexpected(msg) => msg,
        }
    }
}

pub fn classify(err: &anyhow::Error) -> Failure {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return if core.is_user_facing() {
            Failure::User(core.user_message())
        } else {
            Failure::Unexpected(core.user_message())
        };
    }
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        return Failure::User(validation.to_string());
    }
    Failure::Unexpected(unexpected_message(err))
}

/// `"An error occurred: <detail>"` with the detail cut to the preview length.
pub fn unexpected_message(detail: &impl Display) -> String {
    format!(
        "An error occurred: {}",
        truncate_error(&detail.to_string(), ERROR_PREVIEW_LEN)
    )
}

/// Reply text when posting a document to a channel fails.
pub fn send_failed_message(detail: &impl Display) -> String {
    format!(
        "Send failed: {}",
        truncate_error(&detail.to_string(), ERROR_PREVIEW_LEN)
    )
}

pub fn log_failure(context: &str, err: &anyhow::Error, failure: &Failure) {
    match failure {
        Failure::User(msg) => debug!("{}: rejected: {}", context, msg),
        Failure::Unexpected(_) => match err.downcast_ref::<serenity::Error>() {
            Some(serenity_err) => log_serenity_error(context, serenity_err),
            None => error!("{}: {:#}", context, err),
        },
    }
}

/// Log a serenity error at the level its cause deserves: rate limits and
/// network hiccups warn, rejected requests error.
pub fn log_serenity_error(context: &str, err: &serenity::Error) {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            let status = resp.status_code.as_u16();
            if status == 429 {
                warn!("{}: rate limited by Discord", context);
            } else {
                error!(
                    "{} (HTTP {} / code {}): {}",
                    context, status, resp.error.code, resp.error.message
                );
            }
        }
        serenity::Error::Http(http_err) => {
            warn!("{}: network-level HTTP error: {}", context, http_err);
        }
        _ => warn!("{}: {}", context, err),
    }
}
