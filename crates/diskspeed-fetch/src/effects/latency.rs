use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::{Clock, Stopwatch};
use crate::effects::http::{ApiRequest, HttpClient};
use crate::error::{Error, Result};

/// Round-trip time of one request to `url`.
///
/// Tries `HEAD` first. Servers that refuse the method get a `GET`, timed from
/// a fresh start so the rejected `HEAD` does not count.
pub async fn probe_latency<C: HttpClient>(
    client: &C,
    clock: Arc<dyn Clock>,
    url: &str,
) -> Result<Duration> {
    let mut stopwatch = Stopwatch::start(clock);
    let head = client
        .send(ApiRequest::head(url))
        .await
        .map_err(Error::network)?;
    if head.is_success() {
        return Ok(stopwatch.elapsed());
    }
    if !method_refused(head.status) {
        return Err(Error::status(head.status, None));
    }

    debug!(status = head.status, "HEAD refused, retrying ping with GET");
    stopwatch.restart();
    let get = client
        .send(ApiRequest::get(url))
        .await
        .map_err(Error::network)?;
    if get.is_success() {
        Ok(stopwatch.elapsed())
    } else {
        Err(Error::status(get.status, None))
    }
}

fn method_refused(status: u16) -> bool {
    matches!(status, 405 | 501)
}
