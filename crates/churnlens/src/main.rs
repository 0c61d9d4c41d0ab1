use std::sync::Arc;

use anyhow::{Context, Result};
use churnlens::App;
use churnlens::cli::{Cli, parse_cli};
use churnlens::logging::init_tracing;
use churnlens_client::HttpAnalysisService;
use churnlens_config::{config_path, ensure_workspace_config, session_dir, validate_config};
use churnlens_session::{FileKeyValueStore, SessionStore};

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format, cli.verbose)?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        eprintln!(
            "churnlens config warning [{}]: {}",
            warning.code, warning.message
        );
    }

    let service = HttpAnalysisService::from_config(&config.service)
        .context("failed to configure the analysis service client")?;
    let sessions = session_dir(&workspace);
    let backend = FileKeyValueStore::open(&sessions)
        .with_context(|| format!("failed to open session store at {}", sessions.display()))?;
    let session = SessionStore::new(Arc::new(backend), config.session.key.clone())
        .context("failed to watch the session store")?;
    tracing::debug!(
        workspace = %workspace.display(),
        service = %service.base_url(),
        "workspace ready"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let app = App::new(config, Arc::new(service), session);
    let mut out = std::io::stdout().lock();
    runtime.block_on(app.execute(cli.command, &mut out))
}
