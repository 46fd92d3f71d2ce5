//! A wizard session backed by the remote inspection service.
//!
//! [`InspectionSession`] wraps a [`WizardController`] with debounced
//! autosave and live cost requests. Requests run on spawned tasks; their
//! outcomes come back over a channel and are applied only when they are
//! still current:
//!
//! * the response belongs to the most recently issued ticket, and
//! * no local edit happened after the request was built.
//!
//! Anything else is dropped. A failed save puts its fields back in the
//! pending set and waits for the next edit before retrying.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiError, CalculateCostRequest, CompletionSummary, InspectionApi};
use crate::calculations::PricingEngine;
use crate::models::{CostBreakdown, InspectionRecord, InspectionStatus};
use crate::wizard::{
    Debouncer, InspectionUpdate, PendingChanges, SaveSequencer, SaveTicket, StepId, WizardConfig,
    WizardController, WizardError,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unsaved changes in: {}", .0.iter().map(StepId::as_str).collect::<Vec<_>>().join(", "))]
    UnsavedChanges(Vec<StepId>),
}

/// Counters describing how request outcomes were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub saves_applied: u64,
    pub estimates_applied: u64,
    pub stale_dropped: u64,
    pub failures: u64,
}

type SectionResult = (StepId, PendingChanges, Result<InspectionRecord, ApiError>);

enum Outcome {
    Saved {
        ticket: SaveTicket,
        sections: Vec<SectionResult>,
    },
    Estimated {
        ticket: SaveTicket,
        result: Result<Option<CostBreakdown>, ApiError>,
    },
}

async fn with_timeout<T>(
    timeout: Duration,
    request: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| ApiError::Timeout(timeout))?
}

pub struct InspectionSession {
    api: Arc<dyn InspectionApi>,
    controller: WizardController,
    debouncer: Debouncer,
    saves: SaveSequencer,
    estimates: SaveSequencer,
    timeout: Duration,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
    in_flight: usize,
    stats: SessionStats,
}

impl InspectionSession {
    /// Loads the draft for `id`, starting the inspection if it is still
    /// scheduled.
    pub async fn open(
        api: Arc<dyn InspectionApi>,
        id: &str,
        engine: PricingEngine,
        config: WizardConfig,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let mut record = with_timeout(timeout, api.load_draft(id)).await?;

        if record.status == InspectionStatus::Scheduled {
            let started = with_timeout(timeout, api.start(id, Utc::now())).await?;
            info!(inspection_id = id, job_number = %started.job_number, "inspection started");
            record = started.inspection;
        }

        let controller = WizardController::new(record, engine, config)?;
        Ok(Self::with_controller(api, controller, timeout))
    }

    /// Wraps an already-built controller.
    pub fn with_controller(
        api: Arc<dyn InspectionApi>,
        controller: WizardController,
        timeout: Duration,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(controller.config().autosave_debounce);

        Self {
            api,
            controller,
            debouncer,
            saves: SaveSequencer::new(),
            estimates: SaveSequencer::new(),
            timeout,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
            stats: SessionStats::default(),
        }
    }

    pub fn controller(&self) -> &WizardController {
        &self.controller
    }

    /// Navigation goes straight to the controller; it never touches the
    /// network.
    pub fn controller_mut(&mut self) -> &mut WizardController {
        &mut self.controller
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Applies an edit and re-arms the autosave deadline.
    pub fn apply(
        &mut self,
        update: InspectionUpdate,
    ) -> Result<(), SessionError> {
        self.process_responses();
        self.controller.apply(update)?;
        self.debouncer.touch(Instant::now());
        Ok(())
    }

    /// Saves if the debounce deadline has passed.
    pub fn flush_if_due(
        &mut self,
        now: Instant,
    ) -> bool {
        if !self.debouncer.is_due(now) {
            return false;
        }
        self.flush();
        true
    }

    /// Sends every pending section now.
    pub fn flush(&mut self) {
        self.debouncer.disarm();
        let pending = self.controller.take_pending();
        if pending.is_empty() {
            return;
        }

        let ticket = self.saves.issue(self.controller.generation());
        let record = self.controller.record();
        let mut requests = Vec::with_capacity(pending.len());
        for (section, fields) in pending {
            let payload = record.section_payload(fields.iter().copied());
            requests.push((section, PendingChanges::from([(section, fields)]), payload));
        }

        let api = Arc::clone(&self.api);
        let id = record.id.clone();
        let timeout = self.timeout;
        let tx = self.outcome_tx.clone();
        self.in_flight += 1;

        debug!(inspection_id = %id, seq = ticket.seq, sections = requests.len(), "autosave");
        tokio::spawn(async move {
            let mut sections = Vec::with_capacity(requests.len());
            for (section, changes, payload) in requests {
                let result = match payload {
                    Ok(fields) => {
                        with_timeout(timeout, api.save_section(&id, section, fields)).await
                    }
                    Err(err) => Err(ApiError::Decode(err.to_string())),
                };
                sections.push((section, changes, result));
            }
            let _ = tx.send(Outcome::Saved { ticket, sections });
        });
    }

    /// Asks the service to price the current data.
    pub fn request_estimate(&mut self) {
        let ticket = self.estimates.issue(self.controller.generation());
        let request = CalculateCostRequest::from_record(self.controller.record());

        let api = Arc::clone(&self.api);
        let id = self.controller.record().id.clone();
        let timeout = self.timeout;
        let tx = self.outcome_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = with_timeout(timeout, api.calculate_cost(&id, &request)).await;
            let _ = tx.send(Outcome::Estimated { ticket, result });
        });
    }

    /// Applies every outcome that has already arrived.
    pub fn process_responses(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.handle(outcome);
        }
    }

    /// Waits until every in-flight request has reported back.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcome_rx.recv().await {
                Some(outcome) => self.handle(outcome),
                None => break,
            }
        }
    }

    /// Sleeps until the autosave deadline, saves, and waits for the result.
    pub async fn tick(&mut self) {
        if let Some(deadline) = self.debouncer.deadline() {
            tokio::time::sleep_until(deadline).await;
            self.flush_if_due(Instant::now());
        }
        self.settle().await;
    }

    fn is_fresh(
        &self,
        ticket: SaveTicket,
        sequencer: &SaveSequencer,
    ) -> bool {
        sequencer.is_latest(ticket) && ticket.generation == self.controller.generation()
    }

    fn handle(
        &mut self,
        outcome: Outcome,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            Outcome::Saved { ticket, sections } => self.handle_saved(ticket, sections),
            Outcome::Estimated { ticket, result } => self.handle_estimated(ticket, result),
        }
    }

    fn handle_saved(
        &mut self,
        ticket: SaveTicket,
        sections: Vec<SectionResult>,
    ) {
        let mut echo = None;
        for (section, changes, result) in sections {
            match result {
                Ok(record) => echo = Some(record),
                Err(err) => {
                    self.stats.failures += 1;
                    warn!(
                        inspection_id = %self.controller.record().id,
                        %section,
                        error = %err,
                        "autosave failed, retrying after next edit"
                    );
                    self.controller.restore_pending(changes);
                    // A deadline armed by a later edit still has to fire.
                    if ticket.generation == self.controller.generation() {
                        self.debouncer.disarm();
                    }
                }
            }
        }

        let Some(server) = echo else {
            return;
        };
        if self.is_fresh(ticket, &self.saves) && !self.controller.has_pending() {
            self.controller.merge_server_record(&server);
            self.stats.saves_applied += 1;
        } else {
            self.stats.stale_dropped += 1;
            debug!(seq = ticket.seq, "dropping stale autosave response");
        }
    }

    fn handle_estimated(
        &mut self,
        ticket: SaveTicket,
        result: Result<Option<CostBreakdown>, ApiError>,
    ) {
        match result {
            Ok(breakdown) if self.is_fresh(ticket, &self.estimates) => {
                self.controller.set_breakdown(breakdown);
                self.stats.estimates_applied += 1;
            }
            Ok(_) => {
                self.stats.stale_dropped += 1;
                debug!(seq = ticket.seq, "dropping stale cost estimate");
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(error = %err, "live cost calculation failed, keeping local estimate");
            }
        }
    }

    /// Validates the whole form, saves outstanding edits and completes the
    /// inspection remotely.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Wizard`] when required fields are missing.
    /// * [`SessionError::UnsavedChanges`] when a final save failed.
    /// * [`SessionError::Api`] when the service rejects the completion.
    pub async fn complete(&mut self) -> Result<CompletionSummary, SessionError> {
        let request = self.controller.begin_completion()?;

        self.flush();
        self.settle().await;
        if self.controller.has_pending() {
            let sections = self.controller.take_pending();
            let unsaved: Vec<StepId> = sections.keys().copied().collect();
            self.controller.restore_pending(sections);
            return Err(SessionError::UnsavedChanges(unsaved));
        }

        let summary =
            with_timeout(self.timeout, self.api.complete(&request.inspection_id)).await?;
        self.controller.mark_completed(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::api::InMemoryInspectionApi;
    use crate::calculations::PricingPolicy;
    use crate::models::{AreaAssessment, DwellingType, MouldLocation, PropertyOccupation};

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn ready_record(id: &str) -> InspectionRecord {
        InspectionRecord {
            address: Some("3 Test Ave".to_string()),
            inspector_id: Some("tech-1".to_string()),
            property_occupation: Some(PropertyOccupation::OwnerOccupied),
            dwelling_type: Some(DwellingType::House),
            areas: vec![AreaAssessment {
                mould_visibility: vec![MouldLocation::Ceiling],
                temperature: Some(dec!(20)),
                humidity: Some(dec!(60)),
                ..AreaAssessment::new("Bathroom", 120, 0)
            }],
            outdoor_temperature: Some(dec!(14)),
            outdoor_humidity: Some(dec!(72)),
            front_door_photo: Some("door.jpg".to_string()),
            front_house_photo: Some("house.jpg".to_string()),
            mailbox_photo: Some("mailbox.jpg".to_string()),
            street_photo: Some("street.jpg".to_string()),
            work_procedure: Some("Surface treatment".to_string()),
            ..InspectionRecord::new(id)
        }
    }

    async fn open_session(record: InspectionRecord) -> (Arc<InMemoryInspectionApi>, InspectionSession) {
        init_test_tracing();
        let api = Arc::new(InMemoryInspectionApi::standard());
        let id = record.id.clone();
        api.insert(record).await;

        let session = InspectionSession::open(
            api.clone(),
            &id,
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
            TIMEOUT,
        )
        .await
        .unwrap();
        (api, session)
    }

    // =========================================================================
    // Open tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn open_starts_scheduled_inspection() {
        let (api, session) = open_session(InspectionRecord::new("insp-1")).await;

        let record = session.controller().record();
        assert_eq!(record.status, InspectionStatus::InProgress);
        assert!(record.job_number.as_deref().is_some_and(|n| n.starts_with("MRC-")));
        assert_eq!(
            api.get("insp-1").await.map(|r| r.status),
            Some(InspectionStatus::InProgress)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_draft_with_zero_drying_days() {
        let record = InspectionRecord {
            drying_days: Some(0),
            ..ready_record("insp-1")
        };

        let (_api, session) = open_session(record).await;

        assert_eq!(
            session.controller().breakdown().map(|b| b.total_cost),
            Some(dec!(673.20))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_unknown_inspection_fails() {
        let api: Arc<dyn InspectionApi> = Arc::new(InMemoryInspectionApi::standard());

        let result = InspectionSession::open(
            api,
            "missing",
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
            TIMEOUT,
        )
        .await;

        assert!(matches!(
            result,
            Err(SessionError::Api(ApiError::NotFound(_)))
        ));
    }

    // =========================================================================
    // Autosave tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn autosave_waits_for_quiet_period() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;
        let start = Instant::now();

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();

        assert!(!session.flush_if_due(start + Duration::from_millis(1999)));
        assert!(session.flush_if_due(start + Duration::from_secs(2)));
        session.settle().await;

        assert_eq!(
            api.saved_sections().await,
            vec![(StepId::Header, vec!["address".to_string()])]
        );
        assert_eq!(session.stats().saves_applied, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_are_saved_together() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        session
            .apply(InspectionUpdate::Inspector(Some("tech-9".to_string())))
            .unwrap();
        session.tick().await;

        assert_eq!(
            api.saved_sections().await,
            vec![(
                StepId::Header,
                vec!["address".to_string(), "inspectorId".to_string()]
            )]
        );
        assert_eq!(
            api.get("insp-1").await.and_then(|r| r.inspector_id),
            Some("tech-9".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn response_after_newer_edit_is_dropped() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;
        api.set_latency(Duration::from_millis(500)).await;

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();
        session.flush();
        session
            .apply(InspectionUpdate::Address(Some("2 Second St".to_string())))
            .unwrap();
        session.settle().await;

        assert_eq!(session.stats().stale_dropped, 1);
        assert_eq!(session.stats().saves_applied, 0);
        assert_eq!(
            session.controller().record().address.as_deref(),
            Some("2 Second St")
        );
        assert!(session.controller().has_pending());

        session.tick().await;
        assert_eq!(session.stats().saves_applied, 1);
        assert_eq!(
            api.get("insp-1").await.and_then(|r| r.address),
            Some("2 Second St".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_retried_after_next_edit() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;
        api.fail_next_saves(1);

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();
        session.tick().await;

        assert_eq!(session.stats().failures, 1);
        assert!(session.controller().has_pending());
        assert_eq!(session.autosave_deadline(), None);

        session
            .apply(InspectionUpdate::AttentionTo(Some("Property manager".to_string())))
            .unwrap();
        session.tick().await;

        assert_eq!(
            api.saved_sections().await,
            vec![(
                StepId::Header,
                vec!["address".to_string(), "attentionTo".to_string()]
            )]
        );
        assert!(!session.controller().has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_failed_save_keeps_its_deadline() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;
        api.set_latency(Duration::from_millis(500)).await;
        api.fail_next_saves(1);

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();
        session.flush();
        session
            .apply(InspectionUpdate::Address(Some("2 Second St".to_string())))
            .unwrap();
        session.settle().await;

        assert_eq!(session.stats().failures, 1);
        assert!(session.autosave_deadline().is_some());

        session.tick().await;

        assert_eq!(
            api.get("insp-1").await.and_then(|r| r.address),
            Some("2 Second St".to_string())
        );
        assert_eq!(session.stats().saves_applied, 1);
        assert!(!session.controller().has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_save_times_out() {
        let (api, mut session) = open_session(InspectionRecord::new("insp-1")).await;
        api.set_latency(Duration::from_secs(30)).await;

        session
            .apply(InspectionUpdate::Address(Some("1 First St".to_string())))
            .unwrap();
        session.tick().await;

        assert_eq!(session.stats().failures, 1);
        assert!(session.controller().has_pending());
    }

    // =========================================================================
    // Estimate tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn only_latest_estimate_is_applied() {
        let (api, mut session) = open_session(ready_record("insp-1")).await;
        api.set_latency(Duration::from_millis(100)).await;

        session.request_estimate();
        session.request_estimate();
        session.settle().await;

        assert_eq!(session.stats().estimates_applied, 1);
        assert_eq!(session.stats().stale_dropped, 1);
        assert_eq!(
            session.controller().breakdown().map(|b| b.total_cost),
            Some(dec!(673.20))
        );
    }

    // =========================================================================
    // Completion tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn complete_saves_then_completes() {
        let (api, mut session) = open_session(ready_record("insp-1")).await;
        session
            .apply(InspectionUpdate::CauseOfMould(Some("Leaking shower".to_string())))
            .unwrap();

        let summary = session.complete().await.unwrap();

        assert_eq!(summary.total_cost, dec!(673.20));
        assert!(session.controller().is_completed());
        let stored = api.get("insp-1").await.unwrap();
        assert_eq!(stored.status, InspectionStatus::Completed);
        assert_eq!(stored.cause_of_mould.as_deref(), Some("Leaking shower"));
    }

    #[tokio::test(start_paused = true)]
    async fn complete_reports_missing_fields() {
        let (_api, mut session) = open_session(InspectionRecord::new("insp-1")).await;

        let result = session.complete().await;

        assert!(matches!(
            result,
            Err(SessionError::Wizard(WizardError::NotReadyToComplete { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn complete_refuses_when_final_save_fails() {
        let (api, mut session) = open_session(ready_record("insp-1")).await;
        session
            .apply(InspectionUpdate::ParkingOptions(Some("Driveway".to_string())))
            .unwrap();
        api.fail_next_saves(1);

        let result = session.complete().await;

        assert!(matches!(
            result,
            Err(SessionError::UnsavedChanges(ref sections)) if sections == &vec![StepId::Summary]
        ));
        assert!(!session.controller().is_completed());
    }
}
