//! Stage events and callbacks for observability.

use std::sync::Arc;

use super::StageKind;

/// Events emitted while a stage runs.
#[derive(Debug, Clone)]
pub enum StageEvent {
    /// The stage was invoked
    Started { stage: StageKind },
    /// About to call the reasoning service
    Request {
        stage: StageKind,
        model: String,
        prompt_chars: usize,
    },
    /// The service replied
    Response { stage: StageKind, content: String },
    /// The reply was coerced into the stage's schema
    Validated { stage: StageKind },
    /// The stage failed
    Error { stage: StageKind, message: String },
}

impl StageEvent {
    pub fn stage(&self) -> StageKind {
        match self {
            StageEvent::Started { stage }
            | StageEvent::Request { stage, .. }
            | StageEvent::Response { stage, .. }
            | StageEvent::Validated { stage }
            | StageEvent::Error { stage, .. } => *stage,
        }
    }
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&StageEvent) + Send + Sync>;

/// Storage for stage callbacks
#[derive(Default, Clone)]
pub struct StageCallbacks {
    pub on_request: Option<EventCallback>,
    pub on_response: Option<EventCallback>,
    pub on_error: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
}

impl StageCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &StageEvent) {
        let specific = match event {
            StageEvent::Request { .. } => self.on_request.as_ref(),
            StageEvent::Response { .. } => self.on_response.as_ref(),
            StageEvent::Error { .. } => self.on_error.as_ref(),
            StageEvent::Started { .. } | StageEvent::Validated { .. } => None,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }

    /// Set a catch-all callback.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&StageEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(f));
        self
    }
}

/// Callbacks that log every stage event through `tracing`.
pub fn verbose_callbacks() -> StageCallbacks {
    StageCallbacks {
        on_request: Some(Arc::new(|e: &StageEvent| {
            if let StageEvent::Request {
                stage,
                model,
                prompt_chars,
            } = e
            {
                tracing::info!(%stage, %model, prompt_chars, "Calling reasoning service");
            }
        })),
        on_response: Some(Arc::new(|e: &StageEvent| {
            if let StageEvent::Response { stage, content } = e {
                let preview: String = content.chars().take(100).collect();
                let suffix = if content.chars().count() > 100 { "..." } else { "" };
                tracing::info!(
                    %stage,
                    "Response: {}{}",
                    preview.replace('\n', "\\n"),
                    suffix
                );
            }
        })),
        on_error: Some(Arc::new(|e: &StageEvent| {
            if let StageEvent::Error { stage, message } = e {
                tracing::error!(%stage, "{}", message);
            }
        })),
        on_event: Some(Arc::new(|e: &StageEvent| {
            tracing::debug!(stage = %e.stage(), event = ?e, "Stage event");
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_calls_specific_and_catch_all() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let specific = seen.clone();
        let all = seen.clone();

        let callbacks = StageCallbacks {
            on_error: Some(Arc::new(move |_: &StageEvent| {
                specific.lock().unwrap().push("error".into())
            })),
            ..Default::default()
        }
        .on_event(move |e| all.lock().unwrap().push(format!("any:{}", e.stage())));

        callbacks.emit(&StageEvent::Started {
            stage: StageKind::Market,
        });
        callbacks.emit(&StageEvent::Error {
            stage: StageKind::Writer,
            message: "boom".into(),
        });

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["any:market", "error", "any:writer"]
        );
    }
}
