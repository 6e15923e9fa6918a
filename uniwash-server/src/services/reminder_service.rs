use std::sync::Arc;
use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::repositories::{ReminderCandidate, ReservationRepository};
use crate::services::{
    Clock, SmsGateway, SmsRequest, TURN_OFF_REMINDER_TEMPLATE_ID, TURN_ON_REMINDER_TEMPLATE_ID,
    send_with_deadline, truncate_to_minute,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderJob {
    /// Reservations starting in one to two hours.
    TurnOn,
    /// Running reservations ending within twenty minutes.
    TurnOff,
}

impl ReminderJob {
    fn template_id(&self) -> u32 {
        match self {
            ReminderJob::TurnOn => TURN_ON_REMINDER_TEMPLATE_ID,
            ReminderJob::TurnOff => TURN_OFF_REMINDER_TEMPLATE_ID,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ReminderJob::TurnOn => "turn-on",
            ReminderJob::TurnOff => "turn-off",
        }
    }
}

/// Outcome of a single job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub scanned: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ReminderService {
    reservation_repository: Arc<ReservationRepository>,
    gateway: Arc<dyn SmsGateway>,
    clock: Arc<dyn Clock>,
    provider: String,
    sms_timeout: Duration,
    offset: UtcOffset,
    production: bool,
    batch_size: u32,
}

impl ReminderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reservation_repository: Arc<ReservationRepository>,
        gateway: Arc<dyn SmsGateway>,
        clock: Arc<dyn Clock>,
        provider: String,
        sms_timeout: Duration,
        offset: UtcOffset,
        production: bool,
        batch_size: u32,
    ) -> Self {
        Self {
            reservation_repository,
            gateway,
            clock,
            provider,
            sms_timeout,
            offset,
            production,
            batch_size,
        }
    }

    pub async fn run(&self, job: ReminderJob) -> ReminderReport {
        match job {
            ReminderJob::TurnOn => self.run_turn_on().await,
            ReminderJob::TurnOff => self.run_turn_off().await,
        }
    }

    /// Reminds users whose slot starts within `[now + 60m, now + 120m]`.
    pub async fn run_turn_on(&self) -> ReminderReport {
        let now = truncate_to_minute(self.clock.now());
        let from = now + time::Duration::minutes(60);
        let to = now + time::Duration::minutes(120);

        let candidates = self
            .reservation_repository
            .find_turn_on_candidates(from, to, self.batch_size as i64)
            .await;

        self.deliver(ReminderJob::TurnOn, candidates).await
    }

    /// Reminds users whose running slot ends within `[now - 40m, now + 20m]`.
    pub async fn run_turn_off(&self) -> ReminderReport {
        let now = truncate_to_minute(self.clock.now());
        let to = now + time::Duration::minutes(20);
        let from = to - time::Duration::minutes(60);

        let candidates = self
            .reservation_repository
            .find_turn_off_candidates(from, to, self.batch_size as i64)
            .await;

        self.deliver(ReminderJob::TurnOff, candidates).await
    }

    async fn deliver(
        &self,
        job: ReminderJob,
        candidates: Result<Vec<ReminderCandidate>, sqlx::Error>,
    ) -> ReminderReport {
        let mut report = ReminderReport::default();

        let candidates = match candidates {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(job = job.name(), "failed to load reminder candidates: {}", e);
                return report;
            }
        };
        report.scanned = candidates.len();

        for candidate in candidates {
            if !self.production {
                tracing::info!(
                    job = job.name(),
                    reservation_id = candidate.id,
                    "non-production mode: reminder not sent"
                );
                report.skipped += 1;
                continue;
            }

            let request = SmsRequest::new(
                &self.provider,
                job.template_id(),
                self.params(job, &candidate),
                &candidate.mobile,
            );

            match send_with_deadline(self.gateway.as_ref(), request, self.sms_timeout).await {
                Ok(receipt) => {
                    let marked = match job {
                        ReminderJob::TurnOn => self.reservation_repository.mark_on_reminder_sent(candidate.id).await,
                        ReminderJob::TurnOff => self.reservation_repository.mark_off_reminder_sent(candidate.id).await,
                    };
                    if let Err(e) = marked {
                        tracing::warn!(job = job.name(), reservation_id = candidate.id, "failed to flag reminder: {}", e);
                    }

                    tracing::debug!(
                        job = job.name(),
                        reservation_id = candidate.id,
                        reference_id = %receipt.reference_id,
                        "reminder sent"
                    );
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(job = job.name(), reservation_id = candidate.id, "reminder sms failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                job = job.name(),
                scanned = report.scanned,
                sent = report.sent,
                skipped = report.skipped,
                failed = report.failed,
                "reminder run finished"
            );
        }

        report
    }

    fn params(&self, job: ReminderJob, candidate: &ReminderCandidate) -> Vec<String> {
        let instant = match job {
            ReminderJob::TurnOn => candidate.start_at,
            ReminderJob::TurnOff => candidate.end_at,
        };

        vec![candidate.sku.clone(), local_clock(instant, self.offset)]
    }
}

fn local_clock(instant: OffsetDateTime, offset: UtcOffset) -> String {
    let local = instant.to_offset(offset);

    format!("{:02}:{:02}", local.hour(), local.minute())
}

/// Owns the ticker tasks and the worker that runs reminder jobs.
pub struct ReminderScheduler {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn start(service: Arc<ReminderService>, turn_on_every: Duration, turn_off_every: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (job_tx, job_rx) = mpsc::channel(2);

        let tasks = vec![
            tokio::spawn(tick(ReminderJob::TurnOn, turn_on_every, job_tx.clone(), shutdown_rx.clone())),
            tokio::spawn(tick(ReminderJob::TurnOff, turn_off_every, job_tx, shutdown_rx.clone())),
            tokio::spawn(work(service, job_rx, shutdown_rx)),
        ];

        tracing::info!(?turn_on_every, ?turn_off_every, "reminder scheduler started");

        Self { shutdown_tx, tasks }
    }

    /// Stops the tickers and waits for the job in progress to finish. Queued
    /// jobs that have not started are dropped.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("reminder task ended abnormally: {}", e);
            }
        }

        tracing::info!("reminder scheduler stopped");
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn tick(
    job: ReminderJob,
    every: Duration,
    job_tx: mpsc::Sender<ReminderJob>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = interval.tick() => {
                if let Err(mpsc::error::TrySendError::Closed(_)) = job_tx.try_send(job) {
                    break;
                }
            }
        }
    }
}

async fn work(service: Arc<ReminderService>, job_rx: mpsc::Receiver<ReminderJob>, shutdown_rx: watch::Receiver<bool>) {
    drain_jobs(job_rx, shutdown_rx, |job| {
        let service = service.clone();
        async move {
            service.run(job).await;
        }
    })
    .await
}

/// Runs jobs one at a time until shutdown or until both tickers are gone.
async fn drain_jobs<F, Fut>(
    mut job_rx: mpsc::Receiver<ReminderJob>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut run: F,
) where
    F: FnMut(ReminderJob) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            job = job_rx.recv() => match job {
                Some(job) => run(job).await,
                None => break,
            },
        }
    }
}
