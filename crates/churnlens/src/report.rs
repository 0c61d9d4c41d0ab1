use churnlens_client::{AnalysisService, ClientError, fetch_rows};
use churnlens_core::{
    CommitRow, ComplexityRow, DatasetKind, FragilityRow, HotspotRow, Id, OwnershipRow,
    QualityFinding, TimelineBucket,
};
use churnlens_metrics::{
    BusFactorReport, CategoryShare, ComplexityReport, ContributorCoverage,
    DEFAULT_BUS_FACTOR_THRESHOLD, FileFindings, FragilityReport, ScoredHotspot, SeverityCount,
    TimelineTotals, bus_factor, category_distribution, complexity_report, contributor_coverage,
    findings_by_file, fragility_report, score_hotspots, severity_counts, timeline_totals,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Derived view of one dataset, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportView {
    Hotspots {
        summary: Map<String, Value>,
        hotspots: Vec<ScoredHotspot>,
    },
    Fragility {
        summary: Map<String, Value>,
        report: FragilityReport,
    },
    Complexity {
        summary: Map<String, Value>,
        report: ComplexityReport,
    },
    Ownership {
        summary: Map<String, Value>,
        bus_factor: BusFactorReport,
        contributors: Vec<ContributorCoverage>,
    },
    Quality {
        summary: Map<String, Value>,
        severities: Vec<SeverityCount>,
        files: Vec<FileFindings>,
    },
    Commits {
        summary: Map<String, Value>,
        total: usize,
        categories: Vec<CategoryShare>,
    },
    Timeline {
        summary: Map<String, Value>,
        totals: TimelineTotals,
        buckets: Vec<TimelineBucket>,
    },
}

/// One dataset's outcome when every dataset is loaded together. A failed
/// fetch only blanks its own panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPanel {
    pub dataset: DatasetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ReportView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn panel_error_message(kind: DatasetKind) -> String {
    format!("unable to load {} data", kind.as_str())
}

pub async fn build_report(
    service: &dyn AnalysisService,
    repository_id: &Id,
    kind: DatasetKind,
    limit: Option<usize>,
) -> Result<ReportView, ClientError> {
    let view = match kind {
        DatasetKind::Hotspots => {
            let dataset = fetch_rows::<HotspotRow>(service, repository_id).await?;
            ReportView::Hotspots {
                hotspots: score_hotspots(&dataset.rows, limit),
                summary: dataset.summary,
            }
        }
        DatasetKind::Fragility => {
            let dataset = fetch_rows::<FragilityRow>(service, repository_id).await?;
            ReportView::Fragility {
                report: fragility_report(&dataset.rows, limit),
                summary: dataset.summary,
            }
        }
        DatasetKind::Complexity => {
            let dataset = fetch_rows::<ComplexityRow>(service, repository_id).await?;
            ReportView::Complexity {
                report: complexity_report(&dataset.rows, limit),
                summary: dataset.summary,
            }
        }
        DatasetKind::Ownership => {
            let dataset = fetch_rows::<OwnershipRow>(service, repository_id).await?;
            ReportView::Ownership {
                bus_factor: bus_factor(&dataset.rows, DEFAULT_BUS_FACTOR_THRESHOLD),
                contributors: contributor_coverage(&dataset.rows, limit),
                summary: dataset.summary,
            }
        }
        DatasetKind::Quality => {
            let dataset = fetch_rows::<QualityFinding>(service, repository_id).await?;
            ReportView::Quality {
                severities: severity_counts(&dataset.rows),
                files: findings_by_file(&dataset.rows, limit),
                summary: dataset.summary,
            }
        }
        DatasetKind::Commits => {
            let dataset = fetch_rows::<CommitRow>(service, repository_id).await?;
            ReportView::Commits {
                total: dataset.rows.len(),
                categories: category_distribution(&dataset.rows),
                summary: dataset.summary,
            }
        }
        DatasetKind::Timeline => {
            let dataset = fetch_rows::<TimelineBucket>(service, repository_id).await?;
            ReportView::Timeline {
                totals: timeline_totals(&dataset.rows),
                buckets: dataset.rows,
                summary: dataset.summary,
            }
        }
    };

    Ok(view)
}

/// Loads every dataset concurrently.
pub async fn build_all_reports(
    service: &dyn AnalysisService,
    repository_id: &Id,
    limit: Option<usize>,
) -> Vec<ReportPanel> {
    let (hotspots, fragility, complexity, ownership, quality, commits, timeline) = tokio::join!(
        build_report(service, repository_id, DatasetKind::Hotspots, limit),
        build_report(service, repository_id, DatasetKind::Fragility, limit),
        build_report(service, repository_id, DatasetKind::Complexity, limit),
        build_report(service, repository_id, DatasetKind::Ownership, limit),
        build_report(service, repository_id, DatasetKind::Quality, limit),
        build_report(service, repository_id, DatasetKind::Commits, limit),
        build_report(service, repository_id, DatasetKind::Timeline, limit),
    );

    [
        (DatasetKind::Hotspots, hotspots),
        (DatasetKind::Fragility, fragility),
        (DatasetKind::Complexity, complexity),
        (DatasetKind::Ownership, ownership),
        (DatasetKind::Quality, quality),
        (DatasetKind::Commits, commits),
        (DatasetKind::Timeline, timeline),
    ]
    .into_iter()
    .map(|(kind, result)| match result {
        Ok(view) => ReportPanel {
            dataset: kind,
            view: Some(view),
            error: None,
        },
        Err(err) => {
            tracing::warn!(
                repository_id = %repository_id,
                kind = kind.as_str(),
                error = %err,
                "dataset unavailable"
            );
            ReportPanel {
                dataset: kind,
                view: None,
                error: Some(panel_error_message(kind)),
            }
        }
    })
    .collect()
}
