//! A thin HTTP round-trip helper on top of [`reqwest`] that splits transport
//! failures from structured API error payloads and traces both directions.

use {
    hyper::StatusCode,
    serde::de::DeserializeOwned,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP {0}: {1:?}")]
    Status(StatusCode, String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response body {1:?}: {0}")]
    Decode(serde_json::Error, String),
}

/// An error that occurred during an API round-trip: either the transport
/// failed, or the remote returned a well-formed error payload.
#[derive(Debug, thiserror::Error)]
pub enum RoundtripError<E> {
    #[error(transparent)]
    Http(Error),
    #[error("API error")]
    Api(E),
}

/// Executes an HTTP request, deserializing the response body as `T` on
/// success and as the API error type `E` otherwise.
pub async fn roundtrip<T, E>(request: reqwest::RequestBuilder) -> Result<T, RoundtripError<E>>
where
    T: DeserializeOwned + std::fmt::Debug,
    E: DeserializeOwned,
{
    let (client, request) = request.build_split();
    let request = request.map_err(Error::from).map_err(RoundtripError::Http)?;
    tracing::trace!(url = %request.url(), "sending request");

    let response = client
        .execute(request)
        .await
        .map_err(Error::from)
        .map_err(RoundtripError::Http)?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(Error::from)
        .map_err(RoundtripError::Http)?;
    tracing::trace!(%status, %body, "received response");

    if let Ok(value) = serde_json::from_str::<T>(&body) {
        return Ok(value);
    }
    if let Ok(err) = serde_json::from_str::<E>(&body) {
        return Err(RoundtripError::Api(err));
    }
    if !status.is_success() {
        return Err(RoundtripError::Http(Error::Status(status, body)));
    }
    Err(RoundtripError::Http(Error::Decode(
        serde_json::from_str::<T>(&body).unwrap_err(),
        body,
    )))
}
