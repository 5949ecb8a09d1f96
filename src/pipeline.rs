// src/pipeline.rs
//! Run orchestration
//!
//! A [`Pipeline`] walks a [`SessionPlan`]: it scaffolds the output tree,
//! locates and opens each session's container once, turns every region into
//! a region CSV, and finally merges the session's region CSVs. Failures are
//! contained at the narrowest [`FailureScope`] and recorded in the returned
//! [`RunSummary`]; the run itself never aborts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::{merge_session_csv, region_csv_name, write_region_csv, MergeReport, RegionWriteReport};
use crate::config::PipelineConfig;
use crate::container::{default_opener, Container, ContainerOpener};
use crate::error::{FailureScope, IntoPipelineError, PipelineError, PipelineErrorBuilder, PipelineResult};
use crate::labels::{align_labels, decode_labels};
use crate::metadata::SessionPlan;
use crate::processing::driver::{extract_region_features, ExtractionParams};
use crate::processing::features::{BycycleExtractor, CycleFeatureExtractor};
use crate::processing::filters::{FirFilter, SignalFilter};
use crate::report::{Reporter, Scope, TracingReporter};
use crate::trials::load_trials;
use crate::utils::{format_elapsed, Clock, SystemClock};

/// Input and output roots of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub csv_root: PathBuf,
    pub preprocessed_root: PathBuf,
}

impl RunPaths {
    pub fn new(csv_root: impl Into<PathBuf>, preprocessed_root: impl Into<PathBuf>) -> Self {
        Self {
            csv_root: csv_root.into(),
            preprocessed_root: preprocessed_root.into(),
        }
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.csv_root.join(session_id)
    }

    pub fn region_dir(&self, session_id: &str, region: &str) -> PathBuf {
        self.session_dir(session_id).join(region)
    }
}

/// What happened to one region
#[derive(Debug)]
pub struct RegionOutcome {
    pub region: String,
    pub result: PipelineResult<RegionWriteReport>,
}

impl RegionOutcome {
    pub fn is_written(&self) -> bool {
        self.result.is_ok()
    }
}

/// What happened to one session
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: String,
    /// Container the session was read from
    pub input: Option<PathBuf>,
    pub regions: Vec<RegionOutcome>,
    pub merge: Option<MergeReport>,
    /// Set when the session was skipped as a whole
    pub error: Option<PipelineError>,
}

impl SessionOutcome {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            input: None,
            regions: Vec::new(),
            merge: None,
            error: None,
        }
    }

    fn skipped(session_id: &str, error: PipelineError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(session_id)
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a full run
#[derive(Debug)]
pub struct RunSummary {
    pub sessions: Vec<SessionOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn regions_written(&self) -> usize {
        self.sessions
            .iter()
            .flat_map(|s| &s.regions)
            .filter(|r| r.is_written())
            .count()
    }

    pub fn sessions_skipped(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_skipped()).count()
    }

    pub fn merged_files(&self) -> Vec<&Path> {
        self.sessions
            .iter()
            .filter_map(|s| s.merge.as_ref())
            .map(|m| m.merged_path.as_path())
            .collect()
    }

    pub fn session(&self, session_id: &str) -> Option<&SessionOutcome> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }
}

/// Builder for [`Pipeline`]; every collaborator has a production default
pub struct PipelineBuilder {
    config: PipelineConfig,
    paths: RunPaths,
    opener: Option<Box<dyn ContainerOpener>>,
    filter: Option<Box<dyn SignalFilter>>,
    extractor: Option<Box<dyn CycleFeatureExtractor>>,
    reporter: Option<Arc<dyn Reporter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig, paths: RunPaths) -> Self {
        Self {
            config,
            paths,
            opener: None,
            filter: None,
            extractor: None,
            reporter: None,
            clock: None,
        }
    }

    pub fn opener(mut self, opener: Box<dyn ContainerOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn filter(mut self, filter: Box<dyn SignalFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn extractor(mut self, extractor: Box<dyn CycleFeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            params: ExtractionParams::from_config(&self.config.processing),
            config: self.config,
            paths: self.paths,
            opener: self.opener.unwrap_or_else(default_opener),
            filter: self.filter.unwrap_or_else(|| Box::new(FirFilter::default())),
            extractor: self.extractor.unwrap_or_else(|| Box::new(BycycleExtractor::default())),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}

/// Runs a [`SessionPlan`] end to end
pub struct Pipeline {
    config: PipelineConfig,
    params: ExtractionParams,
    paths: RunPaths,
    opener: Box<dyn ContainerOpener>,
    filter: Box<dyn SignalFilter>,
    extractor: Box<dyn CycleFeatureExtractor>,
    reporter: Arc<dyn Reporter>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn run(&self, plan: &SessionPlan) -> RunSummary {
        let started = Instant::now();
        let reporter = self.reporter.as_ref();
        reporter.info(
            &Scope::root(),
            format!(
                "Processing {} sessions over {} regions",
                plan.session_ids.len(),
                plan.regions.len()
            ),
        );

        // Every session directory exists before any session is processed
        let scaffolded: Vec<PipelineResult<()>> = plan
            .session_ids
            .iter()
            .map(|session_id| self.scaffold_session(session_id))
            .collect();

        let sessions = plan
            .session_ids
            .iter()
            .zip(scaffolded)
            .map(|(session_id, scaffold)| match scaffold {
                Ok(()) => self.process_session(session_id, &plan.regions),
                Err(err) => SessionOutcome::skipped(session_id, err),
            })
            .collect();

        let elapsed = started.elapsed();
        reporter.info(&Scope::root(), format!("Processing finished in {}", format_elapsed(elapsed)));
        RunSummary { sessions, elapsed }
    }

    fn scaffold_session(&self, session_id: &str) -> PipelineResult<()> {
        let dir = self.paths.session_dir(session_id);
        let scope = Scope::session(session_id);
        fs::create_dir_all(&dir)
            .pipeline_err("scaffold", "create_session_dir")
            .inspect_err(|err| self.reporter.error(&scope, format!("Failed to create {}: {}", dir.display(), err)))?;
        self.reporter.debug(&scope, format!("Session directory ready: {}", dir.display()));
        Ok(())
    }

    fn process_session(&self, session_id: &str, regions: &[String]) -> SessionOutcome {
        let reporter = self.reporter.as_ref();
        let scope = Scope::session(session_id);
        reporter.info(&scope, "Processing session".to_string());

        for region in regions {
            let dir = self.paths.region_dir(session_id, region);
            match fs::create_dir_all(&dir) {
                Ok(()) => reporter.info(&scope, format!("Created directory for region: {}", dir.display())),
                Err(err) => reporter.error(&scope, format!("Failed to create directory {}: {}", dir.display(), err)),
            }
        }

        let (input, container) = match self.open_session(session_id, &scope) {
            Ok(opened) => opened,
            Err(err) => {
                reporter.error(&scope, format!("Skipping session: {}", err));
                return SessionOutcome::skipped(session_id, err);
            }
        };

        let mut outcome = SessionOutcome::new(session_id);
        outcome.input = Some(input);

        for region in regions {
            let region_scope = scope.with_region(region);
            let result = self.process_region(container.as_ref(), session_id, region, &region_scope);
            if let Err(err) = &result {
                reporter.error(&region_scope, format!("Skipping region: {}", err));
            }
            outcome.regions.push(RegionOutcome {
                region: region.clone(),
                result,
            });
        }

        let session_dir = self.paths.session_dir(session_id);
        match merge_session_csv(
            &session_dir,
            session_id,
            &self.config.layout.feature_tag,
            self.clock.as_ref(),
            reporter,
            &scope,
        ) {
            Ok(merge) => outcome.merge = merge,
            Err(err) => reporter.error(&scope, format!("Failed to merge region CSVs: {}", err)),
        }

        outcome
    }

    /// Locate the session's input file and open it, checking the data group
    fn open_session(&self, session_id: &str, scope: &Scope) -> PipelineResult<(PathBuf, Box<dyn Container>)> {
        let input = self.locate_input(session_id)?;
        self.reporter.info(scope, format!("Found LFP data: {}", input.display()));

        let container = self.opener.open(&input).map_err(|source| {
            PipelineErrorBuilder::new("pipeline", "open_container")
                .info("session", session_id)
                .container(FailureScope::Session, source)
        })?;
        self.reporter.debug(scope, format!("Opened {}", container.describe()));

        let group = &self.config.layout.data_group;
        if !container.has_group(group) {
            return Err(PipelineErrorBuilder::new("pipeline", "open_container")
                .info("session", session_id)
                .missing_input(
                    FailureScope::Session,
                    format!("'{}' group not found in {}", group, input.display()),
                ));
        }
        Ok((input, container))
    }

    /// First file, in name order, starting with the session id and ending with the input suffix
    fn locate_input(&self, session_id: &str) -> PipelineResult<PathBuf> {
        let root = &self.paths.preprocessed_root;
        let suffix = &self.config.layout.input_suffix;
        let missing = || {
            PipelineErrorBuilder::new("pipeline", "locate_input")
                .info("session", session_id)
                .info("root", root.display())
                .missing_input(
                    FailureScope::Session,
                    format!("No file found for session '{}' ending with '{}'", session_id, suffix),
                )
        };

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                self.reporter.error(
                    &Scope::session(session_id),
                    format!("Cannot list {}: {}", root.display(), err),
                );
                return Err(missing());
            }
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.starts_with(session_id) && name.ends_with(suffix.as_str())
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();
        self.reporter.debug(
            &Scope::session(session_id),
            format!("Found {} files matching the input pattern", matches.len()),
        );

        matches.into_iter().next().ok_or_else(missing)
    }

    fn process_region(
        &self,
        container: &dyn Container,
        session_id: &str,
        region: &str,
        scope: &Scope,
    ) -> PipelineResult<RegionWriteReport> {
        let reporter = self.reporter.as_ref();
        let layout = &self.config.layout;
        let group = layout.data_group.as_str();
        let errors = |operation: &str| {
            PipelineErrorBuilder::new("region", operation)
                .info("session", session_id)
                .info("region", region)
        };
        reporter.info(scope, "Processing region".to_string());

        let labels_key = layout.labels_key(region);
        let signal_key = layout.signal_key(region);
        for key in [&labels_key, &signal_key, &layout.time_key] {
            if !container.has_member(group, key) {
                return Err(errors("lookup").missing_input(
                    FailureScope::Region,
                    format!("'{}' not found in '{}'", key, group),
                ));
            }
        }

        let as_region_error = |operation: &str| {
            let builder = errors(operation);
            move |source| builder.container(FailureScope::Region, source)
        };

        let label_refs = container.cell_array(group, &labels_key).map_err(as_region_error("labels"))?;
        let labels = decode_labels(container, &label_refs, reporter, scope).map_err(as_region_error("labels"))?;
        reporter.info(scope, format!("Channel labels: {:?}", labels));

        let signal_refs = container.cell_array(group, &signal_key).map_err(as_region_error("signal"))?;
        let time_refs = container.cell_array(group, &layout.time_key).map_err(as_region_error("time"))?;
        let trials = load_trials(
            container,
            &signal_refs,
            &time_refs,
            self.config.processing.time_window,
            reporter,
            scope,
        )
        .map_err(as_region_error("trials"))?;

        let Some(first) = trials.first() else {
            return Err(errors("trials").no_data(FailureScope::Region, "No valid trials"));
        };
        let channel_count = first.n_channels();
        reporter.info(scope, format!("{} valid trials, {} channels", trials.len(), channel_count));
        let labels = align_labels(labels, channel_count, reporter, scope);

        let pairs = extract_region_features(
            &trials,
            channel_count,
            &self.params,
            self.filter.as_ref(),
            self.extractor.as_ref(),
            reporter,
            scope,
        );

        let file_name = region_csv_name(session_id, region, &layout.feature_tag, &self.clock.timestamp());
        let path = self.paths.region_dir(session_id, region).join(file_name);
        let report = write_region_csv(&path, &pairs, &labels, reporter, scope)?;
        Ok(report)
    }
}
