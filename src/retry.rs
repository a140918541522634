use reqwest::cookie::CookieStore;
use tokio_util::sync::CancellationToken;

use crate::{
    request::build_request, LogSink, RequestOptions, RequestsError, Response, Result, Transport,
};

/// Result of a retry run: the last response (absent when the final attempt
/// failed), the last error, and how many round trips were issued.
#[derive(Debug)]
pub struct RetryOutcome {
    pub response: Response,
    pub error: Option<RequestsError>,
    pub attempts: usize,
}

impl RetryOutcome {
    pub fn into_result(self) -> Result<Response> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response),
        }
    }
}

/// Executes `options` with up to `options.retry` immediate retries.
///
/// A fresh request is built for every attempt. Build failures abort the run
/// before any round trip. Any response, whatever its status, ends the run;
/// only errors for which [`RequestsError::is_retryable`] holds are retried.
/// Each retry is announced through `log` with the error that caused it.
///
/// `jar` supplies stored cookies for requests that also carry explicit ones.
pub async fn execute_with_retry(
    transport: &dyn Transport,
    options: &RequestOptions,
    jar: Option<&dyn CookieStore>,
    cancel: Option<&CancellationToken>,
    log: &dyn LogSink,
) -> Result<RetryOutcome> {
    let mut last_error: Option<RequestsError> = None;
    let mut attempts = 0usize;

    for attempt in 0..=options.retry {
        let request = build_request(options, jar)?;

        if let Some(err) = &last_error {
            log.log(format_args!("retry[{}/{}], err={}", attempt, options.retry, err));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            attempt,
            "sending request"
        );

        attempts += 1;
        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                result = transport.round_trip(request) => result,
                () = token.cancelled() => Err(RequestsError::Cancelled),
            },
            None => transport.round_trip(request).await,
        };

        match result {
            Ok(response) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = %response.status(), attempts, "request completed");

                return Ok(RetryOutcome {
                    response: Response::from(response),
                    error: None,
                    attempts,
                });
            }
            Err(err) if err.is_retryable() => last_error = Some(err),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, attempts, "request failed, not retryable");

                return Ok(RetryOutcome {
                    response: Response::absent(),
                    error: Some(err),
                    attempts,
                });
            }
        }
    }

    #[cfg(feature = "tracing")]
    if let Some(err) = &last_error {
        tracing::debug!(error = %err, attempts, "request failed, attempts exhausted");
    }

    Ok(RetryOutcome {
        response: Response::absent(),
        error: last_error,
        attempts,
    })
}
