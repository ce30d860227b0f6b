//! Choice of the run a script report request is served from.

use std::cmp::Ordering;

use rr_models::run::Run;

/// What a report request for a script should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The latest run already has a report.
    Cached { run: Run, report_url: String },
    /// Generate a report for this existing run.
    Existing(Run),
    /// The script never ran; a new run is needed.
    CreateNew,
}

/// Newest start first. Equal start times are ordered by id, newest id first.
fn newest_first(a: &Run, b: &Run) -> Ordering {
    b.started_at
        .cmp(&a.started_at)
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_newest_first(runs: &mut [Run]) {
    runs.sort_by(newest_first);
}

/// Pick the target of a report request among a script's runs.
pub fn select_target(mut runs: Vec<Run>) -> Selection {
    sort_newest_first(&mut runs);

    let Some(latest) = runs.first() else {
        return Selection::CreateNew;
    };
    if let Some(report_url) = latest.report_url.as_ref().filter(|url| !url.is_empty()) {
        return Selection::Cached {
            report_url: report_url.clone(),
            run: latest.clone(),
        };
    }

    match runs.into_iter().find(|run| !run.has_report()) {
        Some(run) => Selection::Existing(run),
        None => Selection::CreateNew,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use rr_models::run::RunStatus;
    use uuid::Uuid;

    use super::*;

    fn run(started_at: DateTime<Utc>, report_url: Option<&str>) -> Run {
        Run {
            id: Uuid::new_v4(),
            script_id: Uuid::nil(),
            project_id: Uuid::nil(),
            status: RunStatus::Passed,
            started_at,
            completed_at: None,
            report_url: report_url.map(String::from),
        }
    }

    #[test]
    fn no_runs_needs_a_new_run() {
        assert_eq!(select_target(Vec::new()), Selection::CreateNew);
    }

    #[test]
    fn latest_run_with_report_is_reused() {
        let now = Utc::now();
        let older = run(now - Duration::hours(1), None);
        let latest = run(now, Some("/reports/latest/index.html"));

        match select_target(vec![older, latest.clone()]) {
            Selection::Cached { run, report_url } => {
                assert_eq!(run.id, latest.id);
                assert_eq!(report_url, "/reports/latest/index.html");
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn latest_unreported_run_is_targeted() {
        let now = Utc::now();
        let reported = run(now - Duration::hours(2), Some("/reports/old/index.html"));
        let unreported_old = run(now - Duration::hours(1), None);
        let unreported_latest = run(now, None);

        let selection = select_target(vec![
            unreported_old,
            reported,
            unreported_latest.clone(),
        ]);
        assert_eq!(selection, Selection::Existing(unreported_latest));
    }

    #[test]
    fn empty_report_url_counts_as_no_report() {
        let latest = run(Utc::now(), Some(""));
        assert_eq!(
            select_target(vec![latest.clone()]),
            Selection::Existing(latest)
        );
    }

    #[test]
    fn equal_start_times_order_by_id() {
        let now = Utc::now();
        let mut runs = vec![run(now, None), run(now, None), run(now, None)];
        sort_newest_first(&mut runs);
        assert!(runs.windows(2).all(|pair| pair[0].id > pair[1].id));

        let expected = runs[0].clone();
        runs.reverse();
        assert_eq!(select_target(runs), Selection::Existing(expected));
    }
}
