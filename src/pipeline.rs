//! Import pipeline
//!
//! Drives one extract through every stage, strictly in order:
//!
//! ```text
//! Idle -> HeaderDetection -> RowIngestion -> WriteDerivedTables
//!      -> LoadPropertyAndAttributeTables -> ResolveAttributeReferences
//!      -> LoadPersonTable -> ResolvePersonProvenance
//!      -> WriteLeaseDependentTables -> LoadLeaseDependentTables -> Done
//! ```
//!
//! Any `Err` moves the run to `FatalError` and no report is produced. An
//! extract without data rows goes from `RowIngestion` straight to `Done`.

use crate::config::ImportConfig;
use crate::dedup::DedupAggregator;
use crate::error::{ConfigError, ImportError, ImportResult};
use crate::extract::{detect_headers, Extract, HeaderDetection, SourceRow, SupplementalContacts};
use crate::ingest::{data_rows, RowIngestor, NO_DATA_ROWS};
use crate::loader::{AttributeDirectory, AttributeQuery, BulkLoader, PersonDirectory};
use crate::provenance::{
    DuplicatePersonResolver, ErrorTranslator, PersonResolution, ProvenanceIndex, Translation,
};
use crate::report::{ConditionLog, ImportReport, ReportAssembler};
use crate::run::RunContext;
use crate::storage::WorkingStorage;
use chrono::NaiveDate;
use import_types::{Condition, EntityKind, Ordinal};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const ATTRIBUTE_REF_FAILED: &str = "Unable to insert custom attribute";

// ============================================================================
// STAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    HeaderDetection,
    RowIngestion,
    WriteDerivedTables,
    LoadPropertyAndAttributeTables,
    ResolveAttributeReferences,
    LoadPersonTable,
    ResolvePersonProvenance,
    WriteLeaseDependentTables,
    LoadLeaseDependentTables,
    Done,
    FatalError,
}

impl Stage {
    /// Successor on the normal path
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        Some(match self {
            Idle => HeaderDetection,
            HeaderDetection => RowIngestion,
            RowIngestion => WriteDerivedTables,
            WriteDerivedTables => LoadPropertyAndAttributeTables,
            LoadPropertyAndAttributeTables => ResolveAttributeReferences,
            ResolveAttributeReferences => LoadPersonTable,
            LoadPersonTable => ResolvePersonProvenance,
            ResolvePersonProvenance => WriteLeaseDependentTables,
            WriteLeaseDependentTables => LoadLeaseDependentTables,
            LoadLeaseDependentTables => Done,
            Done | FatalError => return None,
        })
    }

    pub fn can_advance(self, to: Stage) -> bool {
        match to {
            Stage::FatalError => !matches!(self, Stage::Done | Stage::FatalError),
            Stage::Done if self == Stage::RowIngestion => true,
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Current stage plus the path taken so far
#[derive(Debug, Clone)]
pub struct StageTracker {
    token: Uuid,
    history: Vec<Stage>,
}

impl StageTracker {
    fn new(token: Uuid) -> Self {
        Self {
            token,
            history: vec![Stage::Idle],
        }
    }

    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Idle)
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    fn advance(&mut self, to: Stage) {
        let from = self.current();
        debug_assert!(from.can_advance(to), "illegal transition {from} -> {to}");
        tracing::info!(run = %self.token.simple(), %from, %to, "stage transition");
        self.history.push(to);
    }
}

// ============================================================================
// REQUEST / OUTCOME
// ============================================================================

/// One extract to import
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub extract: Extract,
    pub supplemental: Option<Extract>,
    /// Caller-supplied field values (business unit and the like)
    pub supplied: BTreeMap<String, String>,
    pub run_date: NaiveDate,
    /// Parent directory of the per-run working storage namespace
    pub working_root: PathBuf,
    pub retain_tables: bool,
    pub token: Option<Uuid>,
}

impl ImportRequest {
    pub fn new(extract: Extract, run_date: NaiveDate, working_root: impl Into<PathBuf>) -> Self {
        Self {
            extract,
            supplemental: None,
            supplied: BTreeMap::new(),
            run_date,
            working_root: working_root.into(),
            retain_tables: false,
            token: None,
        }
    }

    pub fn with_supplemental(mut self, extract: Extract) -> Self {
        self.supplemental = Some(extract);
        self
    }

    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.supplied.insert(field.into(), value.into());
        self
    }

    pub fn retain_tables(mut self, retain: bool) -> Self {
        self.retain_tables = retain;
        self
    }

    pub fn with_token(mut self, token: Uuid) -> Self {
        self.token = Some(token);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub token: Uuid,
    pub report: ImportReport,
    pub stages: Vec<Stage>,
    /// Namespace directory when tables were retained
    pub retained: Option<PathBuf>,
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Clone)]
pub struct ImportPipeline {
    config: Arc<ImportConfig>,
    loader: Arc<dyn BulkLoader>,
    people: Arc<dyn PersonDirectory>,
    attributes: Arc<dyn AttributeDirectory>,
}

/// Immutable inputs of one run
struct RunInputs<'r> {
    run: RunContext,
    detection: HeaderDetection,
    supplemental: Option<SupplementalContacts>,
    extract: &'r Extract,
}

/// Mutable state threaded through the stages of one run
struct RunState<'s> {
    aggregator: DedupAggregator,
    provenance: ProvenanceIndex,
    log: ConditionLog,
    person_refs: BTreeMap<Ordinal, String>,
    /// (possible, imported) per kind
    counts: BTreeMap<EntityKind, (usize, usize)>,
    stages: &'s mut StageTracker,
}

impl ImportPipeline {
    pub fn new(
        config: Arc<ImportConfig>,
        loader: Arc<dyn BulkLoader>,
        people: Arc<dyn PersonDirectory>,
        attributes: Arc<dyn AttributeDirectory>,
    ) -> Self {
        Self {
            config,
            loader,
            people,
            attributes,
        }
    }

    /// Import one extract
    pub async fn run(&self, request: ImportRequest) -> ImportResult<ImportOutcome> {
        let token = request.token.unwrap_or_else(Uuid::new_v4);
        let mut stages = StageTracker::new(token);
        let result = self.run_stages(&request, token, &mut stages).await;
        if let Err(err) = &result {
            stages.advance(Stage::FatalError);
            tracing::error!(run = %token.simple(), error = %err, "import aborted");
        }
        result
    }

    async fn run_stages(
        &self,
        request: &ImportRequest,
        token: Uuid,
        stages: &mut StageTracker,
    ) -> ImportResult<ImportOutcome> {
        let config = self.config.as_ref();

        stages.advance(Stage::HeaderDetection);
        let detection = detect_headers(request.extract.rows(), &config.headers)?;
        let supplemental = match (&request.supplemental, &config.supplemental) {
            (Some(extract), Some(sup_config)) => Some(SupplementalContacts::build(extract, sup_config)?),
            _ => None,
        };
        let inputs = RunInputs {
            run: RunContext::with_token(config, token, request.run_date, request.supplied.clone()),
            detection,
            supplemental,
            extract: &request.extract,
        };
        let mut state = RunState {
            aggregator: DedupAggregator::new(config)?,
            provenance: ProvenanceIndex::new(),
            log: ConditionLog::new(),
            person_refs: BTreeMap::new(),
            counts: BTreeMap::new(),
            stages,
        };

        state.stages.advance(Stage::RowIngestion);
        let rows = data_rows(inputs.extract, &inputs.detection);
        if rows.is_empty() {
            tracing::warn!("extract has no data rows");
            state.log.add_general(NO_DATA_ROWS);
            state.stages.advance(Stage::Done);
            return Ok(self.finish(&inputs, state, None));
        }
        let ingestor = RowIngestor::new(config, &inputs.run, inputs.supplemental.as_ref(), &rows);
        ingestor.ingest_primary(&rows, &mut state.aggregator, &mut state.provenance, &mut state.log)?;
        tracing::info!(rows = rows.len(), "primary ingestion complete");

        state.stages.advance(Stage::WriteDerivedTables);
        let mut storage = WorkingStorage::create(&request.working_root, inputs.run.token)?;
        let result = self
            .load_all(&inputs, &mut state, &ingestor, &rows, &mut storage)
            .await;
        match result {
            Ok(()) => {
                let retained = storage.finish(request.retain_tables)?;
                state.stages.advance(Stage::Done);
                Ok(self.finish(&inputs, state, retained))
            }
            Err(err) => {
                if !request.retain_tables {
                    if let Err(cleanup) = storage.finish(false) {
                        tracing::warn!(error = %cleanup, "working storage cleanup failed");
                    }
                }
                Err(err)
            }
        }
    }

    async fn load_all(
        &self,
        inputs: &RunInputs<'_>,
        state: &mut RunState<'_>,
        ingestor: &RowIngestor<'_>,
        rows: &[SourceRow<'_>],
        storage: &mut WorkingStorage,
    ) -> ImportResult<()> {
        for kind in [EntityKind::RentableType, EntityKind::CustomAttribute, EntityKind::Person] {
            self.write(state, storage, kind)?;
        }

        state.stages.advance(Stage::LoadPropertyAndAttributeTables);
        for kind in [EntityKind::CustomAttribute, EntityKind::RentableType] {
            self.load(inputs, state, storage, kind).await?;
        }

        state.stages.advance(Stage::ResolveAttributeReferences);
        self.resolve_attribute_refs(state).await;

        state.stages.advance(Stage::LoadPersonTable);
        self.load(inputs, state, storage, EntityKind::Person).await?;

        state.stages.advance(Stage::ResolvePersonProvenance);
        self.resolve_person_notes(inputs, state).await?;

        state.stages.advance(Stage::WriteLeaseDependentTables);
        ingestor.ingest_lease_dependent(
            rows,
            &state.person_refs,
            &mut state.aggregator,
            &mut state.provenance,
            &mut state.log,
        )?;
        for kind in [EntityKind::Rentable, EntityKind::RentalAgreement] {
            self.write(state, storage, kind)?;
        }

        state.stages.advance(Stage::LoadLeaseDependentTables);
        for kind in [EntityKind::Rentable, EntityKind::RentalAgreement] {
            self.load(inputs, state, storage, kind).await?;
        }

        for kind in EntityKind::ALL {
            if kind == EntityKind::CustomAttributeRef {
                continue;
            }
            let imported = self
                .loader
                .imported_count(kind)
                .await
                .map_err(|source| ImportError::Loader { kind, source })?;
            state.counts.entry(kind).or_default().1 = imported;
        }
        Ok(())
    }

    fn write(
        &self,
        state: &mut RunState<'_>,
        storage: &mut WorkingStorage,
        kind: EntityKind,
    ) -> ImportResult<()> {
        let table = state
            .aggregator
            .table(kind)
            .ok_or(ConfigError::MissingSchema(kind))?;
        storage.write_table(table)?;
        state.provenance.seal(kind);
        state.counts.entry(kind).or_default().0 = table.len();
        Ok(())
    }

    async fn load(
        &self,
        inputs: &RunInputs<'_>,
        state: &mut RunState<'_>,
        storage: &WorkingStorage,
        kind: EntityKind,
    ) -> ImportResult<()> {
        if state.aggregator.table(kind).map_or(true, |t| t.is_empty()) {
            tracing::debug!(%kind, "empty table not loaded");
            return Ok(());
        }
        let path = storage.path(kind)?;
        let errors = self
            .loader
            .load(kind, path)
            .await
            .map_err(|source| ImportError::Loader { kind, source })?;
        tracing::info!(%kind, errors = errors.len(), "table loaded");

        let translations = ErrorTranslator::new(&self.config, &state.provenance).translate_all(kind, &errors)?;
        let resolver = DuplicatePersonResolver::new(&self.config, self.people.as_ref());
        for translation in translations {
            match translation {
                Translation::Skipped => {}
                Translation::Row { source, condition } => state.log.add(source, condition),
                Translation::DuplicatePerson { source, token } => {
                    let cells = inputs
                        .extract
                        .row(source)
                        .ok_or(ImportError::ProvenanceMiss { kind, line: token.line })?;
                    let row = SourceRow::new(source, cells, &inputs.detection.headers);
                    match resolver.resolve(&row).await {
                        PersonResolution::Resolved(person_ref) => {
                            state.person_refs.insert(source, person_ref);
                        }
                        PersonResolution::Failed(condition) => state.log.add(source, condition),
                    }
                }
            }
        }
        Ok(())
    }

    async fn resolve_attribute_refs(&self, state: &mut RunState<'_>) {
        let config = self.config.as_ref();
        let failed = || Condition::error(EntityKind::CustomAttributeRef, ATTRIBUTE_REF_FAILED);
        let mut attempted = 0;
        let mut present = 0;

        let candidates: Vec<_> = state.aggregator.attribute_refs().cloned().collect();
        for candidate in candidates {
            let rentable_type = match self.attributes.rentable_type_id(&candidate.style).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!(style = %candidate.style, "rentable type not found");
                    state.log.add(candidate.source, failed());
                    continue;
                }
                Err(err) => {
                    tracing::warn!(style = %candidate.style, error = %err, "rentable type lookup failed");
                    state.log.add(candidate.source, failed());
                    continue;
                }
            };

            for attr in &config.custom_attributes {
                let Some((_, value)) = candidate.values.iter().find(|(name, _)| *name == attr.name) else {
                    continue;
                };
                let query = AttributeQuery {
                    value_type: &attr.value_type,
                    name: &attr.name,
                    value,
                    units: &attr.units,
                };
                let attribute = match self.attributes.custom_attribute_id(&query).await {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        tracing::warn!(style = %candidate.style, attribute = %attr.name, "custom attribute not found");
                        state.log.add(candidate.source, failed());
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            style = %candidate.style,
                            attribute = %attr.name,
                            error = %err,
                            "custom attribute lookup failed"
                        );
                        state.log.add(candidate.source, failed());
                        continue;
                    }
                };
                attempted += 1;

                match self.attributes.reference_exists(rentable_type, attribute).await {
                    Ok(true) => {
                        tracing::info!(style = %candidate.style, attribute = %attr.name, "reference already exists");
                        present += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(style = %candidate.style, error = %err, "reference lookup failed");
                        state.log.add(candidate.source, failed());
                        continue;
                    }
                }

                match self.attributes.insert_reference(rentable_type, attribute).await {
                    Ok(()) => present += 1,
                    Err(err) => {
                        tracing::warn!(style = %candidate.style, error = %err, "reference insert failed");
                        state.log.add(candidate.source, failed());
                    }
                }
            }
        }
        state.counts.insert(EntityKind::CustomAttributeRef, (attempted, present));
    }

    async fn resolve_person_notes(
        &self,
        inputs: &RunInputs<'_>,
        state: &mut RunState<'_>,
    ) -> ImportResult<()> {
        let prefix = inputs.run.note_tag_prefix();
        let matches = self
            .people
            .find_by_note(&prefix)
            .await
            .map_err(ImportError::Directory)?;
        let resolver = DuplicatePersonResolver::new(&self.config, self.people.as_ref());
        for person in matches {
            match inputs.run.ordinal_from_note(&person.note) {
                Some(source) => {
                    state.person_refs.insert(source, resolver.person_ref(person.id));
                }
                None => tracing::warn!(id = person.id, "person note without row ordinal"),
            }
        }
        tracing::debug!(refs = state.person_refs.len(), "person references resolved");
        Ok(())
    }

    fn finish(
        &self,
        inputs: &RunInputs<'_>,
        state: RunState<'_>,
        retained: Option<PathBuf>,
    ) -> ImportOutcome {
        tracing::debug!(conditions = %state.log, "collected conditions");
        let report = ReportAssembler::new(state.provenance.labels()).assemble(state.log, &state.counts);
        tracing::info!(success = report.is_success(), "import finished");
        ImportOutcome {
            token: inputs.run.token,
            report,
            stages: state.stages.history().to_vec(),
            retained,
        }
    }
}
