use std::collections::VecDeque;

use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;

use crate::ApiRequest;
use crate::ApiResponse;
use crate::ApiTransport;
use crate::TransportError;
use crate::WatchFrame;
use crate::WatchFrameStream;

enum ScriptedWatch {
    /// One stream incarnation delivering these frames, then closing.
    Stream(Vec<Result<WatchFrame, TransportError>>),
    /// Establishment itself fails.
    EstablishError(TransportError),
}

/// An [`ApiTransport`] fed from pre-scripted watch streams and responses,
/// recording every request and watch-open it sees.
///
/// Each `open_watch_stream` call consumes one scripted stream; once the
/// scripts run out, opens return a stream that never yields, so supervisors
/// park instead of spinning through reconnects.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<ScriptedWatch>>,
    responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    watch_opens: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one stream incarnation.
    pub fn push_stream(
        &self,
        frames: Vec<Result<WatchFrame, TransportError>>,
    ) {
        self.scripts.lock().push_back(ScriptedWatch::Stream(frames));
    }

    /// Queue one failing watch establishment.
    pub fn push_establish_error(
        &self,
        error: TransportError,
    ) {
        self.scripts.lock().push_back(ScriptedWatch::EstablishError(error));
    }

    /// Queue one response for the next `request` call. Without a queued
    /// response, `request` answers 200 echoing the request body.
    pub fn push_response(
        &self,
        response: Result<ApiResponse, TransportError>,
    ) {
        self.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn watch_opens(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.watch_opens.lock().clone()
    }
}

#[async_trait::async_trait]
impl ApiTransport for ScriptedTransport {
    async fn request(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let echo = request.body.clone().unwrap_or(Value::Null);
        self.requests.lock().push(request);
        match self.responses.lock().pop_front() {
            Some(response) => response,
            None => Ok(ApiResponse {
                status: 200,
                body: echo,
            }),
        }
    }

    async fn open_watch_stream(
        &self,
        path: String,
        params: Vec<(String, String)>,
    ) -> Result<WatchFrameStream, TransportError> {
        self.watch_opens.lock().push((path, params));
        match self.scripts.lock().pop_front() {
            Some(ScriptedWatch::Stream(frames)) => Ok(stream::iter(frames).boxed()),
            Some(ScriptedWatch::EstablishError(error)) => Err(error),
            None => Ok(stream::pending().boxed()),
        }
    }
}
