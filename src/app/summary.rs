//! AI labels: one entry at a time goes out to the background worker, and the
//! reply becomes the entry's custom label.

use crate::engine::state::Interaction;
use crate::net::bridge::{SummaryReply, SummaryRequest};

use super::Navigator;

impl Navigator {
    /// Ask the worker for a label for `entry_id`. Returns false when the
    /// request never left (unknown entry, panel busy, worker unavailable).
    pub fn summarize_entry(&mut self, entry_id: &str) -> bool {
        if self.state.interaction != Interaction::Idle {
            log::debug!("summarize refused: {:?} in progress", self.state.interaction);
            return false;
        }
        let Some(entry) = self.outline.get(entry_id) else {
            return false;
        };
        let text = self
            .scanner
            .conversation_text(&self.doc, entry, self.config.summary_input_max_chars);

        self.state.interaction = Interaction::Summarizing(entry_id.to_string());
        self.render();

        let request = SummaryRequest {
            conversation: self.labels.conversation().map(str::to_string),
            entry_id: entry_id.to_string(),
            text,
        };
        if let Err(e) = self.summarizer.send(request) {
            log::warn!("summarize {} failed: {}", entry_id, e);
            self.state.interaction = Interaction::Idle;
            self.render();
            return false;
        }
        true
    }

    /// Apply every reply the worker has delivered so far.
    pub(crate) fn poll_summaries(&mut self) {
        while let Some(reply) = self.summarizer.try_recv() {
            self.apply_summary(reply);
        }
    }

    fn apply_summary(&mut self, reply: SummaryReply) {
        if self.state.summarizing_entry_id() == Some(reply.entry_id.as_str()) {
            self.state.interaction = Interaction::Idle;
        }
        match reply.result {
            Ok(summary) if reply.conversation.as_deref() == self.labels.conversation() => {
                let label = self
                    .labels
                    .assign(&reply.entry_id, &summary, self.config.rename_max_len);
                log::info!("AI label for {}: {:?}", reply.entry_id, label);
                self.persist_label(None, &reply.entry_id, label.as_deref());
            }
            Ok(summary) => {
                // the user navigated away while the request was out
                if let Some(conversation) = reply.conversation.as_deref() {
                    self.persist_label(Some(conversation), &reply.entry_id, Some(&summary));
                }
            }
            Err(message) => log::warn!("summarize {} failed: {}", reply.entry_id, message),
        }
        self.refresh_or_render();
    }
}
