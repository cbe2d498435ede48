//! Effect runner for [`OtpFlow`].

use std::collections::VecDeque;

use serde_json::json;

use super::flow::{FlowEffect, FlowEvent, OtpFlow};
use crate::api::AuthApi;
use crate::debug_log::DebugLog;
use crate::session::SessionStore;

/// Executes flow effects against the backend and the session store.
///
/// Each `dispatch` handles one user action: it feeds the event to the flow and
/// keeps performing effects until the flow settles. At most one backend call
/// is in flight at any time.
pub struct Authenticator<'a> {
    api: &'a AuthApi,
    store: &'a mut SessionStore,
    debug_log: Option<&'a mut DebugLog>,
}

impl<'a> Authenticator<'a> {
    pub fn new(api: &'a AuthApi, store: &'a mut SessionStore) -> Self {
        Self {
            api,
            store,
            debug_log: None,
        }
    }

    /// Records phase transitions in `log`.
    #[must_use]
    pub fn with_debug_log(mut self, log: &'a mut DebugLog) -> Self {
        self.debug_log = Some(log);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &*self.store
    }

    pub async fn dispatch(&mut self, flow: &mut OtpFlow, event: FlowEvent) {
        let mut queue: VecDeque<FlowEffect> = self.step(flow, event).into();

        while let Some(effect) = queue.pop_front() {
            if let Some(next) = self.perform(effect).await {
                queue.extend(self.step(flow, next));
            }
        }
    }

    fn step(&mut self, flow: &mut OtpFlow, event: FlowEvent) -> Vec<FlowEffect> {
        let before = flow.phase();
        let effects = flow.update(event);
        let after = flow.phase();

        if before != after {
            tracing::debug!(from = %before, to = %after, mode = %flow.mode(), "auth phase change");
            if let Some(log) = self.debug_log.as_deref_mut() {
                log.append(
                    format!("auth: {before} -> {after}"),
                    Some(json!({
                        "mode": flow.mode().to_string(),
                        "error": flow.error_message(),
                    })),
                );
            }
        }
        effects
    }

    async fn perform(&mut self, effect: FlowEffect) -> Option<FlowEvent> {
        match effect {
            FlowEffect::Initiate(request) => {
                let result = self.api.initiate(&request).await.map(|_| ());
                Some(FlowEvent::Initiated(result))
            }
            FlowEffect::Verify { mode, otp_code } => {
                let result = self.api.verify(mode, &otp_code).await;
                Some(FlowEvent::Verified(result))
            }
            FlowEffect::SetSession { user, tokens } => {
                self.store.set_auth(user, tokens);
                None
            }
        }
    }
}
