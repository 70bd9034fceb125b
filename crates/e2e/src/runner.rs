//! Suite runner that filters, orders and executes case descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

use cmdparity_common::{CommandOutput, IssueTracker, RemoteExecutor, Settings};

use crate::case::CaseDescriptor;
use crate::error::{E2eError, E2eResult};
use crate::help::HelpParser;
use crate::walker::LiveWalker;

/// Everything a case body may use, borrowed for the duration of a run
#[derive(Clone, Copy)]
pub struct SuiteContext<'a> {
    pub settings: &'a Settings,
    pub executor: &'a dyn RemoteExecutor,
    pub issues: &'a dyn IssueTracker,
    pub parser: &'a dyn HelpParser,
}

impl<'a> SuiteContext<'a> {
    pub fn new(
        settings: &'a Settings,
        executor: &'a dyn RemoteExecutor,
        issues: &'a dyn IssueTracker,
        parser: &'a dyn HelpParser,
    ) -> Self {
        Self {
            settings,
            executor,
            issues,
            parser,
        }
    }

    pub fn walker(&self) -> LiveWalker<'a> {
        LiveWalker::new(self.executor, self.parser, &self.settings.hammer.program)
    }

    /// Run `<program> <args>` on the server
    pub fn hammer(&self, args: &str) -> E2eResult<CommandOutput> {
        let command = format!("{} {}", self.settings.hammer.program, args);
        Ok(self.executor.run(&command)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: String,
    pub outcome: CaseOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Failure message or skip reason
    pub message: Option<String>,
}

/// Result of running a set of cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub deselected: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

pub struct SuiteRunner<'a> {
    ctx: SuiteContext<'a>,
    cases: Vec<CaseDescriptor>,
    output_dir: PathBuf,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(ctx: SuiteContext<'a>, cases: Vec<CaseDescriptor>) -> Self {
        let output_dir = ctx.settings.results_dir();
        Self {
            ctx,
            cases,
            output_dir,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn cases(&self) -> &[CaseDescriptor] {
        &self.cases
    }

    /// Run every registered case
    pub fn run_all(&self) -> SuiteResult {
        self.run_cases(&self.cases)
    }

    /// Run cases carrying `tag`
    pub fn run_tagged(&self, tag: &str) -> SuiteResult {
        let filtered: Vec<CaseDescriptor> = self
            .cases
            .iter()
            .filter(|c| c.has_tag(tag))
            .copied()
            .collect();
        self.run_cases(&filtered)
    }

    /// Run a single case by id
    pub fn run_case(&self, id: &str) -> E2eResult<SuiteResult> {
        let case = self
            .cases
            .iter()
            .find(|c| c.id == id)
            .copied()
            .ok_or_else(|| E2eError::CaseNotFound(id.to_string()))?;
        Ok(self.run_cases(&[case]))
    }

    /// Run `cases` in order
    pub fn run_cases(&self, cases: &[CaseDescriptor]) -> SuiteResult {
        let start = Instant::now();
        let started_at = Utc::now();

        let mut selected = Vec::new();
        let mut deselected = 0;
        for case in cases {
            match case.deselect {
                Some(reason) => {
                    info!("Deselected {}: {}", case.id, reason);
                    deselected += 1;
                }
                None => selected.push(case),
            }
        }

        info!("Running {} case(s)...", selected.len());

        let mut passed_ids = HashSet::new();
        let mut results = Vec::new();
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);

        for case in selected {
            let result = self.run_one(case, &passed_ids);
            match result.outcome {
                CaseOutcome::Passed => {
                    passed += 1;
                    passed_ids.insert(case.id);
                    info!("✓ {} ({} ms)", result.id, result.duration_ms);
                }
                CaseOutcome::Failed => {
                    failed += 1;
                    error!(
                        "✗ {} - {}",
                        result.id,
                        result.message.as_deref().unwrap_or("unknown error")
                    );
                }
                CaseOutcome::Skipped => {
                    skipped += 1;
                    warn!(
                        "- {} skipped: {}",
                        result.id,
                        result.message.as_deref().unwrap_or("no reason given")
                    );
                }
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Suite results: {} passed, {} failed, {} skipped, {} deselected ({} ms)",
            passed, failed, skipped, deselected, duration_ms
        );

        SuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped,
            deselected,
            started_at,
            duration_ms,
            results,
        }
    }

    fn run_one(&self, case: &CaseDescriptor, passed: &HashSet<&str>) -> CaseResult {
        let span = info_span!("case", id = case.id);
        let _enter = span.enter();
        info!("Started case");

        let start = Instant::now();
        let started_at = Utc::now();

        let (outcome, message) = match self.skip_reason(case, passed) {
            Ok(Some(reason)) => (CaseOutcome::Skipped, Some(reason)),
            Ok(None) => match (case.run)(&self.ctx) {
                Ok(()) => (CaseOutcome::Passed, None),
                Err(e) => (CaseOutcome::Failed, Some(e.to_string())),
            },
            Err(e) => (CaseOutcome::Failed, Some(e.to_string())),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(outcome = ?outcome, duration_ms, "Finished case");

        CaseResult {
            id: case.id.to_string(),
            outcome,
            started_at,
            duration_ms,
            message,
        }
    }

    fn skip_reason(&self, case: &CaseDescriptor, passed: &HashSet<&str>) -> E2eResult<Option<String>> {
        if let Some(missing) = case.dependencies.iter().find(|d| !passed.contains(**d)) {
            return Ok(Some(format!("dependency {} did not pass", missing)));
        }
        match case.skip {
            Some(condition) => condition.evaluate(&self.ctx),
            None => Ok(None),
        }
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::SkipCondition;
    use crate::help::HammerHelpParser;
    use cmdparity_common::{ReplayExecutor, StaticIssueTracker};

    fn pass(_: &SuiteContext<'_>) -> E2eResult<()> {
        Ok(())
    }

    fn fail(_: &SuiteContext<'_>) -> E2eResult<()> {
        Err(E2eError::AssertionFailed("boom".to_string()))
    }

    fn case(id: &'static str, run: crate::case::CaseFn) -> CaseDescriptor {
        CaseDescriptor {
            id,
            description: "",
            tags: &["tier1"],
            dependencies: &[],
            skip: None,
            deselect: None,
            run,
        }
    }

    struct Fixture {
        settings: Settings,
        executor: ReplayExecutor,
        issues: StaticIssueTracker,
        parser: HammerHelpParser,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                settings: Settings::default(),
                executor: ReplayExecutor::new(),
                issues: StaticIssueTracker::new(["BZ:1"]),
                parser: HammerHelpParser::new(),
            }
        }

        fn ctx(&self) -> SuiteContext<'_> {
            SuiteContext::new(&self.settings, &self.executor, &self.issues, &self.parser)
        }
    }

    #[test]
    fn test_counts_and_messages() {
        let fixture = Fixture::new();
        let runner = SuiteRunner::new(fixture.ctx(), vec![case("a", pass), case("b", fail)]);
        let result = runner.run_all();

        assert_eq!((result.total, result.passed, result.failed), (2, 1, 1));
        assert!(!result.success());
        assert_eq!(result.results[1].message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failed_dependency_skips_dependent() {
        let fixture = Fixture::new();
        let mut dependent = case("c", pass);
        dependent.dependencies = &["b"];
        let runner = SuiteRunner::new(
            fixture.ctx(),
            vec![case("b", fail), dependent],
        );
        let result = runner.run_all();

        assert_eq!(result.results[1].outcome, CaseOutcome::Skipped);
        assert_eq!(
            result.results[1].message.as_deref(),
            Some("dependency b did not pass")
        );
    }

    #[test]
    fn test_deselected_cases_do_not_run() {
        let fixture = Fixture::new();
        let mut gone = case("gone", fail);
        gone.deselect = Some("not applicable to this release");
        let runner = SuiteRunner::new(fixture.ctx(), vec![gone, case("a", pass)]);
        let result = runner.run_all();

        assert_eq!(result.deselected, 1);
        assert_eq!(result.total, 1);
        assert!(result.success());
    }

    #[test]
    fn test_skip_conditions() {
        let fixture = Fixture::new();
        let mut needs_server = case("needs_server", fail);
        needs_server.skip = Some(SkipCondition::SettingMissing("server"));
        let mut blocked = case("blocked", fail);
        blocked.skip = Some(SkipCondition::IssueOpen("BZ:1"));
        let mut unblocked = case("unblocked", pass);
        unblocked.skip = Some(SkipCondition::IssueOpen("BZ:2"));

        let runner = SuiteRunner::new(fixture.ctx(), vec![needs_server, blocked, unblocked]);
        let result = runner.run_all();

        assert_eq!(result.skipped, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.results[1].message.as_deref(), Some("BZ:1 is open"));
    }

    #[test]
    fn test_unknown_section_fails_the_case() {
        let fixture = Fixture::new();
        let mut bad = case("bad", pass);
        bad.skip = Some(SkipCondition::SettingMissing("nonexistent"));
        let result = SuiteRunner::new(fixture.ctx(), vec![bad]).run_all();
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn test_tag_and_id_filters() {
        let fixture = Fixture::new();
        let mut other = case("other", fail);
        other.tags = &["tier3"];
        let runner = SuiteRunner::new(fixture.ctx(), vec![case("a", pass), other]);

        assert_eq!(runner.run_tagged("tier1").total, 1);
        assert_eq!(runner.run_case("other").unwrap().failed, 1);
        assert!(matches!(runner.run_case("missing"), Err(E2eError::CaseNotFound(_))));
    }

    #[test]
    fn test_write_results() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let runner = SuiteRunner::new(fixture.ctx(), vec![case("a", pass)]).with_output_dir(dir.path());
        let result = runner.run_all();

        let path = runner.write_results(&result).unwrap();
        assert_eq!(path, dir.path().join("test-results.json"));

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["passed"], 1);
        assert_eq!(written["results"][0]["outcome"], "passed");
    }

    #[test]
    fn test_context_runs_program() {
        let mut fixture = Fixture::new();
        fixture.executor = ReplayExecutor::new().with_stdout("hammer ping", "ok\n");
        let ctx = fixture.ctx();
        assert_eq!(ctx.hammer("ping").unwrap().stdout, "ok\n");
    }
}
