use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use churnlens_client::{AnalysisService, fetch_rows};
use churnlens_config::ChurnlensConfig;
use churnlens_core::{
    AnalysisRequest, AnalysisRun, AnalysisSession, AnalysisTicket, HotspotRow, Id, SessionPatch,
    StatusTone,
};
use churnlens_session::SessionStore;
use churnlens_tracker::{RunLifecycleTracker, RunPhase, RunSnapshot};
use serde::Serialize;

use crate::cli::{AnalyzeArgs, Commands, ReportArgs, SessionAction, SizeMapArgs, StatusArgs};
use crate::report::{build_all_reports, build_report, panel_error_message};
use crate::sizemap_view::{cell_at, size_map_layout, size_map_view};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOutput {
    ticket: AnalysisTicket,
    session: AnalysisSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<RunSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    run: AnalysisRun,
    tone: StatusTone,
    error: Option<String>,
}

/// Executes one command against a service and a session.
pub struct App {
    config: ChurnlensConfig,
    service: Arc<dyn AnalysisService>,
    session: SessionStore,
}

impl App {
    pub fn new(
        config: ChurnlensConfig,
        service: Arc<dyn AnalysisService>,
        session: SessionStore,
    ) -> Self {
        Self {
            config,
            service,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn execute(&self, command: Commands, out: &mut dyn Write) -> Result<()> {
        match command {
            Commands::Analyze(args) => self.analyze(&args, out).await,
            Commands::Status(args) => self.status(&args, out).await,
            Commands::Session { action } => self.session_command(action, out),
            Commands::Report(args) => self.report(&args, out).await,
            Commands::Sizemap(args) => self.sizemap(&args, out).await,
        }
    }

    async fn analyze(&self, args: &AnalyzeArgs, out: &mut dyn Write) -> Result<()> {
        let repository_url = args.repository_url.trim().to_owned();
        if repository_url.is_empty() {
            bail!("repository URL must not be empty");
        }
        let branch = args
            .branch
            .as_deref()
            .map(str::trim)
            .filter(|branch| !branch.is_empty())
            .map(str::to_owned);

        let request = AnalysisRequest {
            repository_url: repository_url.clone(),
            branch: branch.clone(),
            max_commits: args.max_commits,
        };
        let ticket = self
            .service
            .request_analysis(&request)
            .await
            .with_context(|| format!("failed to request analysis of {repository_url}"))?;

        let patch = SessionPatch::new()
            .repository_id(Some(ticket.repository_id.clone()))
            .run_id(Some(ticket.run_id.clone()))
            .repository_url(Some(repository_url))
            .branch(branch);
        let session = self
            .session
            .update(&patch)
            .context("failed to record the analysis in the session")?;
        tracing::debug!(
            run_id = %ticket.run_id,
            repository_id = %ticket.repository_id,
            "analysis recorded in session"
        );

        if !args.wait {
            return write_json(
                out,
                &AnalyzeOutput {
                    ticket,
                    session,
                    run: None,
                },
            );
        }

        let tracker = self.tracker();
        tracker.track(Some(ticket.run_id.clone()));
        let snapshot = tracker.wait_for_terminal().await;
        let failure = failure_of(&snapshot);
        write_json(
            out,
            &AnalyzeOutput {
                ticket,
                session,
                run: Some(snapshot),
            },
        )?;

        match failure {
            Some(message) => Err(anyhow!("analysis run failed: {message}")),
            None => Ok(()),
        }
    }

    async fn status(&self, args: &StatusArgs, out: &mut dyn Write) -> Result<()> {
        let run_id = match args.run_id.as_deref() {
            Some(run_id) => Id::new(run_id),
            None => self
                .session
                .load()
                .active_run_id()
                .cloned()
                .context("no active analysis run; start one with `churnlens analyze <url>`")?,
        };

        if args.follow {
            return self.follow(run_id, out).await;
        }

        let run = self
            .service
            .fetch_run(&run_id)
            .await
            .with_context(|| format!("failed to fetch run {run_id}"))?;
        let output = StatusOutput {
            tone: StatusTone::from_status(Some(run.status)),
            error: run.failure_message(),
            run,
        };
        write_json(out, &output)
    }

    /// Prints one compact JSON line per published snapshot until the run is
    /// terminal.
    async fn follow(&self, run_id: Id, out: &mut dyn Write) -> Result<()> {
        let tracker = self.tracker();
        let mut snapshots = tracker.subscribe();
        tracker.track(Some(run_id));

        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            write_json_line(out, &snapshot)?;
            if snapshot.run_id.is_none() || snapshot.is_terminal() {
                return match failure_of(&snapshot) {
                    Some(message) => Err(anyhow!("analysis run failed: {message}")),
                    None => Ok(()),
                };
            }
            snapshots
                .changed()
                .await
                .context("run tracker stopped before the run finished")?;
        }
    }

    fn session_command(&self, action: SessionAction, out: &mut dyn Write) -> Result<()> {
        match action {
            SessionAction::Show => write_json(out, &self.session.load()),
            SessionAction::Clear => {
                self.session
                    .clear()
                    .context("failed to clear the session")?;
                write_json(out, &self.session.load())
            }
        }
    }

    async fn report(&self, args: &ReportArgs, out: &mut dyn Write) -> Result<()> {
        let repository_id = self.selected_repository()?;

        match args.kind {
            Some(kind) => {
                let view = build_report(self.service.as_ref(), &repository_id, kind, args.limit)
                    .await
                    .context(panel_error_message(kind))?;
                write_json(out, &view)
            }
            None => {
                let panels =
                    build_all_reports(self.service.as_ref(), &repository_id, args.limit).await;
                write_json(out, &panels)
            }
        }
    }

    async fn sizemap(&self, args: &SizeMapArgs, out: &mut dyn Write) -> Result<()> {
        let repository_id = self.selected_repository()?;
        let hotspots = fetch_rows::<HotspotRow>(self.service.as_ref(), &repository_id)
            .await
            .context("unable to load hotspots data")?;

        let config = &self.config.sizemap;
        let layout = size_map_layout(&hotspots.rows, args.metric, args.width, args.height, config);

        match args.at {
            Some(point) => write_json(out, &cell_at(&layout, point.x, point.y, config)),
            None => write_json(
                out,
                &size_map_view(&layout, args.metric, args.width, args.height, config),
            ),
        }
    }

    fn selected_repository(&self) -> Result<Id> {
        self.session
            .load()
            .repository_id
            .context("no repository selected; start one with `churnlens analyze <url>`")
    }

    fn tracker(&self) -> RunLifecycleTracker {
        RunLifecycleTracker::from_config(Arc::clone(&self.service), &self.config.polling)
    }
}

fn failure_of(snapshot: &RunSnapshot) -> Option<String> {
    (snapshot.phase == RunPhase::Failed).then(|| {
        snapshot
            .error
            .clone()
            .unwrap_or_else(|| churnlens_core::FAILED_RUN_FALLBACK_MESSAGE.to_owned())
    })
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

fn write_json_line<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    out.flush().context("failed to flush output")
}
