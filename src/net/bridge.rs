//! Message passing to the background summarization worker.
//!
//! The controller never blocks on the network: requests go out over a
//! channel, a worker thread performs the round trip, and replies are picked
//! up with `try_recv` on the next pump.

use std::sync::mpsc;
use std::thread;

use super::summarize::{SummarizeError, SummaryClient};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub conversation: Option<String>,
    pub entry_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReply {
    pub conversation: Option<String>,
    pub entry_id: String,
    /// The summary, or the worker's error message.
    pub result: Result<String, String>,
}

pub trait SummaryChannel {
    fn send(&mut self, request: SummaryRequest) -> Result<(), SummarizeError>;

    fn try_recv(&mut self) -> Option<SummaryReply>;
}

/// Used when no proxy is configured; every request is refused up front.
#[derive(Debug, Default)]
pub struct NoSummarizer;

impl SummaryChannel for NoSummarizer {
    fn send(&mut self, _request: SummaryRequest) -> Result<(), SummarizeError> {
        Err(SummarizeError::Unavailable("no summarization endpoint configured".into()))
    }

    fn try_recv(&mut self) -> Option<SummaryReply> {
        None
    }
}

pub struct BackgroundBridge {
    requests: Option<mpsc::Sender<SummaryRequest>>,
    replies: mpsc::Receiver<SummaryReply>,
    worker: Option<thread::JoinHandle<()>>,
}

impl BackgroundBridge {
    pub fn spawn(client: SummaryClient) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<SummaryRequest>();
        let (reply_tx, reply_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            log::debug!("summarize worker up ({})", client.endpoint());
            for request in req_rx {
                let result = client.summarize(&request.text).map_err(|e| e.to_string());
                let reply = SummaryReply {
                    conversation: request.conversation,
                    entry_id: request.entry_id,
                    result,
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            log::debug!("summarize worker down");
        });

        Self {
            requests: Some(req_tx),
            replies: reply_rx,
            worker: Some(worker),
        }
    }

    /// Block until the next reply arrives. Used by one-shot callers.
    pub fn recv(&mut self) -> Option<SummaryReply> {
        self.replies.recv().ok()
    }
}

impl SummaryChannel for BackgroundBridge {
    fn send(&mut self, request: SummaryRequest) -> Result<(), SummarizeError> {
        let tx = self
            .requests
            .as_ref()
            .ok_or_else(|| SummarizeError::Unavailable("worker shut down".into()))?;
        tx.send(request)
            .map_err(|_| SummarizeError::Unavailable("worker exited".into()))
    }

    fn try_recv(&mut self) -> Option<SummaryReply> {
        self.replies.try_recv().ok()
    }
}

impl Drop for BackgroundBridge {
    fn drop(&mut self) {
        // closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
