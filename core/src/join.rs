//! Join orchestration.
//!
//! [`Joiner::join`] folds its inputs left to right. Each step merges one
//! incoming document into an owned accumulator:
//!
//! 1. optional always-on namespace prefixing of the incoming schemas;
//! 2. path and webhook collisions are decided (entries move later);
//! 3. schema collisions are resolved, renames are rewritten on the affected
//!    side, then schemas move into the accumulator;
//! 4. paths and webhooks move, already carrying the rewritten references;
//! 5. other reusable components;
//! 6. array-valued fields and tag de-duplication.
//!
//! After the fold the semantic deduplicator and the post-merge hook run, and
//! statistics are computed.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collision::{
    Action, CollisionRecord, CollisionReport, Diagnostics, Resolution, action, unique_name,
};
use crate::config::{CollisionCategory, CollisionStrategy, JoinConfig};
use crate::dedup::deduplicate;
use crate::equivalence::{Comparator, SchemaResolver};
use crate::error::{HookStage, JoinError, Result};
use crate::graph::{Lineage, ReferenceGraph};
use crate::parsed::{DocumentFormat, ParsedDocument, source_name};
use crate::rewrite::{RenameMap, rename_container_entry, rewrite_document};
use crate::schema::Map;
use crate::source_map::{SourceLocation, SourceMap, describe_location};
use crate::template::{RenameContext, RenameTemplate};
use crate::types::{Document, SpecFamily, Tag};

/// Error type returned by hooks.
pub type HookError = Box<dyn Error + Send + Sync>;

/// A caller-supplied document transformation run before or after merging.
///
/// Closures `Fn(Document) -> Result<Document, HookError>` implement it.
pub trait DocumentHook {
    fn apply(&self, document: Document) -> std::result::Result<Document, HookError>;
}

impl<F> DocumentHook for F
where
    F: Fn(Document) -> std::result::Result<Document, HookError>,
{
    fn apply(&self, document: Document) -> std::result::Result<Document, HookError> {
        self(document)
    }
}

/// Counts describing a merged document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStatistics {
    pub documents: usize,
    pub paths: usize,
    pub operations: usize,
    pub webhooks: usize,
    pub schemas: usize,
    pub other_components: usize,
    pub tags: usize,
    pub servers: usize,
    pub security_requirements: usize,
}

impl JoinStatistics {
    fn of(document: &Document, family: SpecFamily, documents: usize) -> Self {
        Self {
            documents,
            paths: document.paths.len(),
            operations: document.operation_count(),
            webhooks: document.webhooks.len(),
            schemas: document.schemas(family).len(),
            other_components: document.other_component_count(family),
            tags: document.tags.len(),
            servers: document.servers.len(),
            security_requirements: document.security.len(),
        }
    }
}

/// Outcome of a successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub document: Document,
    /// Version of the first input.
    pub version: String,
    /// Format of the first input.
    pub format: DocumentFormat,
    pub warnings: Vec<String>,
    pub collision_count: usize,
    pub statistics: JoinStatistics,
    /// Present when [`JoinConfig::collision_report`] is set.
    pub collision_report: Option<CollisionReport>,
}

impl JoinResult {
    /// Re-packages the merged document as an input for another join.
    pub fn into_parsed(self, source: impl Into<String>) -> ParsedDocument {
        let mut parsed = ParsedDocument::new(source, self.document).with_format(self.format);
        parsed.version = self.version;
        parsed
    }
}

/// Joins documents with a fixed configuration.
///
/// The rename template is compiled once, in [`Joiner::new`].
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let users = Document::openapi("3.0.3")
///     .with_path("/users", PathItem::default().with_operation(
///         Method::Get,
///         Operation::default().with_response("200", Response::json(
///             "ok", Schema::reference("#/components/schemas/User"))),
///     ))
///     .with_schema("User", Schema::typed("object"));
/// let orders = Document::openapi("3.0.3")
///     .with_path("/orders", PathItem::default().with_operation(
///         Method::Get,
///         Operation::default().with_response("200", Response::json(
///             "ok", Schema::reference("#/components/schemas/User"))),
///     ))
///     .with_schema("User", Schema::typed("object")
///         .with_property("id", Schema::typed("string")));
///
/// let config = JoinConfig::default()
///     .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight)
///     .with_rename_template("{PrimaryResource | pascalCase}{Name}")
///     .with_operation_context(PrimaryOperationPolicy::FirstEncountered);
///
/// let joiner = Joiner::new(config).unwrap();
/// let result = joiner.join(vec![
///     ParsedDocument::new("users.yaml", users),
///     ParsedDocument::new("orders.yaml", orders),
/// ]).unwrap();
///
/// assert_eq!(result.collision_count, 1);
/// assert!(result.document.components.schemas.contains_key("OrdersUser"));
/// ```
pub struct Joiner {
    config: JoinConfig,
    template: RenameTemplate,
    pre_merge: Option<Box<dyn DocumentHook + Send + Sync>>,
    post_merge: Option<Box<dyn DocumentHook + Send + Sync>>,
}

impl fmt::Debug for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Joiner")
            .field("config", &self.config)
            .field("pre_merge", &self.pre_merge.is_some())
            .field("post_merge", &self.post_merge.is_some())
            .finish()
    }
}

impl Joiner {
    /// Validates `config` and compiles its rename template.
    pub fn new(config: JoinConfig) -> Result<Self> {
        config.validate().map_err(JoinError::InvalidConfig)?;
        let template = RenameTemplate::parse(&config.rename_template)?;
        if template.uses_operation_context() && !config.operation_context {
            warn!(
                template = %template,
                "Rename template reads operation fields but operation_context is off; they render empty"
            );
        }
        Ok(Self {
            config,
            template,
            pre_merge: None,
            post_merge: None,
        })
    }

    /// Runs `hook` on every input before merging.
    pub fn with_pre_merge_hook(mut self, hook: impl DocumentHook + Send + Sync + 'static) -> Self {
        self.pre_merge = Some(Box::new(hook));
        self
    }

    /// Runs `hook` on the merged document.
    pub fn with_post_merge_hook(mut self, hook: impl DocumentHook + Send + Sync + 'static) -> Self {
        self.post_merge = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Joins `documents` in order.
    pub fn join(&self, documents: Vec<ParsedDocument>) -> Result<JoinResult> {
        if documents.len() < 2 {
            return Err(JoinError::NotEnoughDocuments(documents.len()));
        }
        let count = documents.len();

        let mut inputs = Vec::with_capacity(count);
        let mut bodies = Vec::with_capacity(count);
        for parsed in documents {
            let ParsedDocument {
                source,
                format,
                version,
                document,
                source_map,
            } = parsed;
            let document = match &self.pre_merge {
                Some(hook) => hook.apply(document).map_err(|err| JoinError::Hook {
                    stage: HookStage::PreMerge,
                    document: source.clone(),
                    message: err.to_string(),
                })?,
                None => document,
            };
            inputs.push(Input {
                source,
                format,
                version,
                source_map,
            });
            bodies.push(document);
        }

        let mut diagnostics = Diagnostics::default();
        let family = check_families(&inputs, &bodies, &mut diagnostics)?;
        info!(documents = count, family = %family, "Joining documents");

        let run = Run {
            config: &self.config,
            template: &self.template,
            family,
            inputs: &inputs,
        };

        let mut bodies = bodies.into_iter().enumerate();
        let Some((_, first)) = bodies.next() else {
            return Err(JoinError::NotEnoughDocuments(0));
        };
        let seed = run.seed(first, diagnostics);
        let mut accumulator =
            bodies.try_fold(seed, |accumulator, (index, incoming)| {
                run.merge(accumulator, index, incoming)
            })?;

        if self.config.semantic_deduplication {
            for consolidation in deduplicate(&mut accumulator.document, family) {
                accumulator.diagnostics.warn(format!(
                    "consolidated {} duplicate schema definition(s) into '{}': {}",
                    consolidation.duplicates.len(),
                    consolidation.canonical,
                    consolidation.duplicates.join(", ")
                ));
            }
        }

        let Accumulator {
            mut document,
            diagnostics,
            ..
        } = accumulator;

        if let Some(hook) = &self.post_merge {
            document = hook.apply(document).map_err(|err| JoinError::Hook {
                stage: HookStage::PostMerge,
                document: "joined document".to_string(),
                message: err.to_string(),
            })?;
        }

        let statistics = JoinStatistics::of(&document, family, count);
        info!(
            paths = statistics.paths,
            schemas = statistics.schemas,
            collisions = diagnostics.collision_count,
            warnings = diagnostics.warnings.len(),
            "Join complete"
        );

        let first = &inputs[0];
        Ok(JoinResult {
            document,
            version: first.version.clone(),
            format: first.format,
            warnings: diagnostics.warnings,
            collision_count: diagnostics.collision_count,
            statistics,
            collision_report: self.config.collision_report.then(|| CollisionReport {
                records: diagnostics.records,
            }),
        })
    }
}

/// Joins `documents` with `config`; shorthand for [`Joiner::new`] followed by
/// [`Joiner::join`].
pub fn join(documents: Vec<ParsedDocument>, config: JoinConfig) -> Result<JoinResult> {
    Joiner::new(config)?.join(documents)
}

/// Identity of one input, kept after its document moves into the fold.
#[derive(Debug)]
struct Input {
    source: String,
    format: DocumentFormat,
    version: String,
    source_map: Option<SourceMap>,
}

fn check_families(
    inputs: &[Input],
    documents: &[Document],
    diagnostics: &mut Diagnostics,
) -> Result<SpecFamily> {
    let mut expected: Option<(SpecFamily, usize)> = None;
    for (index, (input, document)) in inputs.iter().zip(documents).enumerate() {
        let Some(family) = document.family() else {
            return Err(JoinError::UnsupportedDocument {
                document: input.source.clone(),
                reason: "expected exactly one of 'swagger: 2.x' or 'openapi: 3.x'".to_string(),
            });
        };
        match expected {
            None => expected = Some((family, index)),
            Some((first_family, first)) if first_family != family => {
                return Err(JoinError::VersionMismatch {
                    left: inputs[first].source.clone(),
                    left_version: documents[first].version().to_string(),
                    right: input.source.clone(),
                    right_version: document.version().to_string(),
                });
            }
            Some((_, first)) => {
                let first_version = documents[first].version();
                if minor_version(first_version) != minor_version(document.version()) {
                    diagnostics.warn(format!(
                        "{} is version {} but {} is version {}; the result keeps {}",
                        input.source,
                        document.version(),
                        inputs[first].source,
                        first_version,
                        first_version
                    ));
                }
            }
        }
    }
    expected
        .map(|(family, _)| family)
        .ok_or(JoinError::NotEnoughDocuments(0))
}

/// `major.minor` part of a version string.
fn minor_version(version: &str) -> &str {
    match version.match_indices('.').nth(1) {
        Some((end, _)) => &version[..end],
        None => version,
    }
}

/// Which side of a collision survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Owned fold state: the merged document so far, where each of its entries
/// came from, and the diagnostics gathered.
#[derive(Debug)]
struct Accumulator {
    document: Document,
    /// Structural path of an entry to the index of the input it came from.
    origins: HashMap<String, usize>,
    diagnostics: Diagnostics,
}

/// One colliding entry.
struct Clash<'n> {
    category: CollisionCategory,
    name: &'n str,
    /// Structural path, used for source-map lookups.
    path: String,
    left: usize,
    right: usize,
}

/// Per-join context shared by every fold step.
struct Run<'j> {
    config: &'j JoinConfig,
    template: &'j RenameTemplate,
    family: SpecFamily,
    inputs: &'j [Input],
}

impl Run<'_> {
    fn seed(&self, mut document: Document, mut diagnostics: Diagnostics) -> Accumulator {
        self.apply_prefix(&mut document, 0, &mut diagnostics);
        let mut origins = HashMap::new();
        for path in structural_paths(&document, self.family) {
            origins.insert(path, 0);
        }
        Accumulator {
            document,
            origins,
            diagnostics,
        }
    }

    fn merge(&self, mut acc: Accumulator, index: usize, mut incoming: Document) -> Result<Accumulator> {
        debug!(source = %self.inputs[index].source, index, "Merging document");
        self.apply_prefix(&mut incoming, index, &mut acc.diagnostics);

        let mut path_plan = HashMap::new();
        for (table, left, right) in [
            ("paths", &acc.document.paths, &incoming.paths),
            ("webhooks", &acc.document.webhooks, &incoming.webhooks),
        ] {
            for (name, item) in right {
                let Some(existing) = left.get(name) else {
                    continue;
                };
                let path = format!("{table}.{name}");
                let clash = self.clash(&acc.origins, CollisionCategory::Path, name, path, index);
                let side = self
                    .resolve_plain(&mut acc.diagnostics, &clash, existing, item)?
                    .unwrap_or(Side::Left);
                path_plan.insert(clash.path, side);
            }
        }

        self.merge_schemas(&mut acc, index, &mut incoming)?;

        let incoming_paths = std::mem::take(&mut incoming.paths);
        move_entries(&mut acc, "paths", |doc| &mut doc.paths, incoming_paths, &path_plan, index);
        let incoming_webhooks = std::mem::take(&mut incoming.webhooks);
        move_entries(&mut acc, "webhooks", |doc| &mut doc.webhooks, incoming_webhooks, &path_plan, index);

        self.merge_components(&mut acc, index, &mut incoming)?;
        self.merge_top_level(&mut acc.document, incoming);
        Ok(acc)
    }

    fn merge_schemas(&self, acc: &mut Accumulator, index: usize, incoming: &mut Document) -> Result<()> {
        let family = self.family;
        let container_path = family.schema_container_path();
        let mut left_renames = RenameMap::new(family);
        let mut right_renames = RenameMap::new(family);
        let mut keep_right: HashSet<String> = HashSet::new();
        let mut drop_right: HashSet<String> = HashSet::new();
        let mut assigned: HashSet<String> = HashSet::new();
        let mut right_graph: Option<ReferenceGraph> = None;
        let mut left_graph: Option<ReferenceGraph> = None;

        let left_schemas = acc.document.schemas(family);
        let right_schemas = incoming.schemas(family);
        for (name, right) in right_schemas {
            let Some(left) = left_schemas.get(name) else {
                continue;
            };
            if left == right {
                debug!(schema = %name, "Identical schema in both documents");
                drop_right.insert(name.clone());
                continue;
            }

            let clash = self.clash(
                &acc.origins,
                CollisionCategory::Schema,
                name,
                format!("{container_path}.{name}"),
                index,
            );
            let strategy = self.config.strategy_for(CollisionCategory::Schema);
            let taken = |candidate: &str| {
                left_schemas.contains_key(candidate)
                    || right_schemas.contains_key(candidate)
                    || assigned.contains(candidate)
            };

            let (resolution, new_name, degraded) = match action(CollisionCategory::Schema, strategy) {
                Action::Fail => return Err(self.collision_error(&clash, strategy)),
                Action::KeepLeft { degraded } => {
                    drop_right.insert(name.clone());
                    (Resolution::KeptLeft, None, degraded)
                }
                Action::KeepRight { degraded } => {
                    keep_right.insert(name.clone());
                    (Resolution::KeptRight, None, degraded)
                }
                Action::RenameRight => {
                    let lineage = self.lineage(&mut right_graph, incoming, name, true);
                    let new = self.new_name(&clash, clash.right, lineage.as_ref(), &mut acc.diagnostics, &taken);
                    right_renames.insert(name, &new);
                    (Resolution::RenamedRight, Some(new), false)
                }
                Action::RenameLeft => {
                    let traced = self.config.trace_both_sides;
                    let lineage = self.lineage(&mut left_graph, &acc.document, name, traced);
                    let new = self.new_name(&clash, clash.left, lineage.as_ref(), &mut acc.diagnostics, &taken);
                    left_renames.insert(name, &new);
                    (Resolution::RenamedLeft, Some(new), false)
                }
                Action::CompareEquivalent => {
                    let comparator = Comparator::new(
                        self.config.equivalence_mode,
                        SchemaResolver::new(left_schemas, family),
                        SchemaResolver::new(right_schemas, family),
                    );
                    if !comparator.equivalent(left, right) {
                        return Err(JoinError::NotEquivalent {
                            category: clash.category,
                            name: name.clone(),
                            left: self.describe(clash.left, &clash.path),
                            right: self.describe(clash.right, &clash.path),
                            mode: self.config.equivalence_mode,
                        });
                    }
                    drop_right.insert(name.clone());
                    (Resolution::Deduplicated, None, false)
                }
            };
            if let Some(new) = &new_name {
                assigned.insert(new.clone());
            }
            self.record(&mut acc.diagnostics, &clash, strategy, resolution, new_name, degraded);
        }

        if !left_renames.is_empty() {
            rewrite_document(&mut acc.document, &left_renames);
            let container = acc.document.schemas_mut(family);
            for (old, new) in left_renames.iter() {
                rename_container_entry(container, old, new);
                if let Some(origin) = acc.origins.remove(&format!("{container_path}.{old}")) {
                    acc.origins.insert(format!("{container_path}.{new}"), origin);
                }
            }
        }
        if !right_renames.is_empty() {
            rewrite_document(incoming, &right_renames);
            let container = incoming.schemas_mut(family);
            for (old, new) in right_renames.iter() {
                rename_container_entry(container, old, new);
            }
        }

        let incoming_schemas = std::mem::take(incoming.schemas_mut(family));
        let container = acc.document.schemas_mut(family);
        for (name, schema) in incoming_schemas {
            if drop_right.contains(&name) {
                continue;
            }
            if container.contains_key(&name) && !keep_right.contains(&name) {
                continue;
            }
            acc.origins.insert(format!("{container_path}.{name}"), index);
            container.insert(name, schema);
        }
        Ok(())
    }

    fn merge_components(&self, acc: &mut Accumulator, index: usize, incoming: &mut Document) -> Result<()> {
        let Accumulator {
            document,
            origins,
            diagnostics,
        } = acc;
        let mut step = TableMerge {
            run: self,
            origins,
            diagnostics,
            index,
        };

        match self.family {
            SpecFamily::Flat => {
                step.merge("parameters", &mut document.parameters, std::mem::take(&mut incoming.parameters))?;
                step.merge("responses", &mut document.responses, std::mem::take(&mut incoming.responses))?;
                step.merge(
                    "securityDefinitions",
                    &mut document.security_definitions,
                    std::mem::take(&mut incoming.security_definitions),
                )?;
            }
            SpecFamily::Namespaced => {
                let left = &mut document.components;
                let right = &mut incoming.components;
                step.merge("components.responses", &mut left.responses, std::mem::take(&mut right.responses))?;
                step.merge("components.parameters", &mut left.parameters, std::mem::take(&mut right.parameters))?;
                step.merge("components.examples", &mut left.examples, std::mem::take(&mut right.examples))?;
                step.merge(
                    "components.requestBodies",
                    &mut left.request_bodies,
                    std::mem::take(&mut right.request_bodies),
                )?;
                step.merge("components.headers", &mut left.headers, std::mem::take(&mut right.headers))?;
                step.merge(
                    "components.securitySchemes",
                    &mut left.security_schemes,
                    std::mem::take(&mut right.security_schemes),
                )?;
                step.merge("components.links", &mut left.links, std::mem::take(&mut right.links))?;
                step.merge("components.callbacks", &mut left.callbacks, std::mem::take(&mut right.callbacks))?;
                step.merge("components.pathItems", &mut left.path_items, std::mem::take(&mut right.path_items))?;
                for (key, value) in std::mem::take(&mut right.extensions) {
                    left.extensions.entry(key).or_insert(value);
                }
            }
        }
        Ok(())
    }

    /// Arrays, connection details and extensions.
    fn merge_top_level(&self, left: &mut Document, mut right: Document) {
        if self.config.merge_arrays {
            append_unique(&mut left.servers, right.servers);
            append_unique(&mut left.security, right.security);
            append_unique(&mut left.schemes, right.schemes);
            append_unique(&mut left.consumes, right.consumes);
            append_unique(&mut left.produces, right.produces);
            left.tags.append(&mut right.tags);
        }
        if self.config.deduplicate_tags {
            dedupe_tags(&mut left.tags);
        }
        if left.host.is_none() {
            left.host = right.host;
        }
        if left.base_path.is_none() {
            left.base_path = right.base_path;
        }
        for (key, value) in right.extensions {
            left.extensions.entry(key).or_insert(value);
        }
    }

    /// Renames every schema of a prefixed source when prefixes are always on.
    fn apply_prefix(&self, document: &mut Document, index: usize, diagnostics: &mut Diagnostics) {
        if !self.config.always_apply_prefix {
            return;
        }
        let source = &self.inputs[index].source;
        let Some(prefix) = self.config.prefix_for(source) else {
            return;
        };

        let mut renames = RenameMap::new(self.family);
        let mut assigned: HashSet<String> = HashSet::new();
        let container = document.schemas(self.family);
        for name in container.keys() {
            let new = unique_name(&format!("{prefix}_{name}"), name, |candidate| {
                container.contains_key(candidate) || assigned.contains(candidate)
            });
            diagnostics.warn(format!("prefixed schema '{name}' from {source} as '{new}'"));
            renames.insert(name, &new);
            assigned.insert(new);
        }

        rewrite_document(document, &renames);
        let container = document.schemas_mut(self.family);
        for (old, new) in renames.iter() {
            rename_container_entry(container, old, new);
        }
    }

    /// Lineage of `name` in `document`, when tracing applies.
    fn lineage(
        &self,
        graph: &mut Option<ReferenceGraph>,
        document: &Document,
        name: &str,
        traced: bool,
    ) -> Option<Lineage> {
        if !self.config.operation_context || !traced {
            return None;
        }
        let graph = graph.get_or_insert_with(|| ReferenceGraph::build(document, self.family));
        let lineage = graph.lineage(name);
        (!lineage.is_empty()).then(|| lineage.clone())
    }

    /// Name for the losing side of a schema rename.
    fn new_name(
        &self,
        clash: &Clash<'_>,
        loser: usize,
        lineage: Option<&Lineage>,
        diagnostics: &mut Diagnostics,
        taken: &dyn Fn(&str) -> bool,
    ) -> String {
        let source = &self.inputs[loser].source;
        let base = match self.config.prefix_for(source) {
            Some(prefix) => format!("{prefix}_{}", clash.name),
            None => {
                let mut context = RenameContext::new(clash.name, &source_name(source), loser);
                match lineage {
                    Some(lineage) => {
                        context = context.with_lineage(lineage, self.config.primary_operation_policy);
                        debug!(
                            schema = %clash.name,
                            path = %context.path,
                            method = %context.method,
                            "Selected primary operation"
                        );
                    }
                    None if self.config.operation_context => diagnostics.warn(format!(
                        "renamed schema '{}' from {source} without operation context",
                        clash.name
                    )),
                    None => {}
                }
                self.template.render(&context)
            }
        };
        unique_name(&base, clash.name, taken)
    }

    fn clash<'n>(
        &self,
        origins: &HashMap<String, usize>,
        category: CollisionCategory,
        name: &'n str,
        path: String,
        index: usize,
    ) -> Clash<'n> {
        let left = origins.get(&path).copied().unwrap_or(0);
        Clash {
            category,
            name,
            path,
            left,
            right: index,
        }
    }

    /// Decides a collision between two non-schema entries.
    ///
    /// Returns `None` when both are identical, which is not a collision.
    fn resolve_plain<T: PartialEq>(
        &self,
        diagnostics: &mut Diagnostics,
        clash: &Clash<'_>,
        left: &T,
        right: &T,
    ) -> Result<Option<Side>> {
        if left == right {
            debug!(category = %clash.category, name = %clash.name, "Identical entry in both documents");
            return Ok(None);
        }
        let strategy = self.config.strategy_for(clash.category);
        let (side, resolution, degraded) = match action(clash.category, strategy) {
            Action::Fail => return Err(self.collision_error(clash, strategy)),
            Action::KeepLeft { degraded } => (Side::Left, Resolution::KeptLeft, degraded),
            Action::KeepRight { degraded } => (Side::Right, Resolution::KeptRight, degraded),
            // Renames are schema-only; action() never yields them for other categories.
            Action::RenameLeft => (Side::Right, Resolution::KeptRight, true),
            Action::RenameRight => (Side::Left, Resolution::KeptLeft, true),
            Action::CompareEquivalent => {
                return Err(JoinError::NotEquivalent {
                    category: clash.category,
                    name: clash.name.to_string(),
                    left: self.describe(clash.left, &clash.path),
                    right: self.describe(clash.right, &clash.path),
                    mode: self.config.equivalence_mode,
                });
            }
        };
        self.record(diagnostics, clash, strategy, resolution, None, degraded);
        Ok(Some(side))
    }

    fn record(
        &self,
        diagnostics: &mut Diagnostics,
        clash: &Clash<'_>,
        strategy: CollisionStrategy,
        resolution: Resolution,
        new_name: Option<String>,
        degraded: bool,
    ) {
        let record = CollisionRecord {
            category: clash.category,
            name: clash.name.to_string(),
            left_source: self.inputs[clash.left].source.clone(),
            right_source: self.inputs[clash.right].source.clone(),
            strategy,
            resolution,
            new_name,
            left_location: self.location(clash.left, &clash.path),
            right_location: self.location(clash.right, &clash.path),
        };
        diagnostics.collision(
            record,
            &self.describe(clash.left, &clash.path),
            &self.describe(clash.right, &clash.path),
            degraded,
        );
    }

    fn collision_error(&self, clash: &Clash<'_>, strategy: CollisionStrategy) -> JoinError {
        JoinError::Collision {
            category: clash.category,
            name: clash.name.to_string(),
            left: self.describe(clash.left, &clash.path),
            right: self.describe(clash.right, &clash.path),
            strategy,
        }
    }

    fn describe(&self, input: usize, path: &str) -> String {
        let input = &self.inputs[input];
        describe_location(&input.source, input.source_map.as_ref(), path)
    }

    fn location(&self, input: usize, path: &str) -> Option<SourceLocation> {
        self.inputs[input]
            .source_map
            .as_ref()
            .and_then(|map| map.get(path))
    }
}

/// Merges one component table of the incoming document.
struct TableMerge<'r, 'j> {
    run: &'r Run<'j>,
    origins: &'r mut HashMap<String, usize>,
    diagnostics: &'r mut Diagnostics,
    index: usize,
}

impl TableMerge<'_, '_> {
    fn merge<T: PartialEq>(&mut self, table: &str, left: &mut Map<T>, right: Map<T>) -> Result<()> {
        for (name, value) in right {
            let path = format!("{table}.{name}");
            let Some(existing) = left.get(&name) else {
                self.origins.insert(path, self.index);
                left.insert(name, value);
                continue;
            };
            let clash = self.run.clash(
                self.origins,
                CollisionCategory::Component,
                &name,
                path,
                self.index,
            );
            if self.run.resolve_plain(self.diagnostics, &clash, existing, &value)? == Some(Side::Right) {
                self.origins.insert(clash.path, self.index);
                left.insert(name.clone(), value);
            }
        }
        Ok(())
    }
}

/// Moves path items (or webhooks) into the accumulator following `plan`.
fn move_entries<T>(
    acc: &mut Accumulator,
    table: &str,
    select: impl Fn(&mut Document) -> &mut Map<T>,
    incoming: Map<T>,
    plan: &HashMap<String, Side>,
    index: usize,
) {
    let target = select(&mut acc.document);
    for (name, value) in incoming {
        let path = format!("{table}.{name}");
        match plan.get(&path) {
            Some(Side::Left) => {}
            Some(Side::Right) | None => {
                acc.origins.insert(path, index);
                target.insert(name, value);
            }
        }
    }
}

/// Structural paths of every mergeable entry of `document`.
fn structural_paths(document: &Document, family: SpecFamily) -> Vec<String> {
    fn keyed<'a, V>(table: &'a str, map: &'a Map<V>) -> impl Iterator<Item = String> + 'a {
        map.keys().map(move |name| format!("{table}.{name}"))
    }

    let mut paths: Vec<String> = keyed("paths", &document.paths)
        .chain(keyed("webhooks", &document.webhooks))
        .chain(keyed(family.schema_container_path(), document.schemas(family)))
        .collect();
    match family {
        SpecFamily::Flat => {
            paths.extend(keyed("parameters", &document.parameters));
            paths.extend(keyed("responses", &document.responses));
            paths.extend(keyed("securityDefinitions", &document.security_definitions));
        }
        SpecFamily::Namespaced => {
            let components = &document.components;
            paths.extend(keyed("components.responses", &components.responses));
            paths.extend(keyed("components.parameters", &components.parameters));
            paths.extend(keyed("components.examples", &components.examples));
            paths.extend(keyed("components.requestBodies", &components.request_bodies));
            paths.extend(keyed("components.headers", &components.headers));
            paths.extend(keyed("components.securitySchemes", &components.security_schemes));
            paths.extend(keyed("components.links", &components.links));
            paths.extend(keyed("components.callbacks", &components.callbacks));
            paths.extend(keyed("components.pathItems", &components.path_items));
        }
    }
    paths
}

fn append_unique<T: PartialEq>(left: &mut Vec<T>, right: Vec<T>) {
    for item in right {
        if !left.contains(&item) {
            left.push(item);
        }
    }
}

fn dedupe_tags(tags: &mut Vec<Tag>) {
    let mut seen = HashSet::new();
    tags.retain(|tag| seen.insert(tag.name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::types::{Method, Operation, PathItem, Response, Server};

    fn doc(schema: Schema) -> Document {
        Document::openapi("3.0.3").with_schema("User", schema)
    }

    fn parsed(source: &str, document: Document) -> ParsedDocument {
        ParsedDocument::new(source, document)
    }

    #[test]
    fn test_requires_two_documents() {
        let err = join(vec![parsed("a", doc(Schema::typed("object")))], JoinConfig::default())
            .unwrap_err();
        assert!(matches!(err, JoinError::NotEnoughDocuments(1)));
    }

    #[test]
    fn test_mixed_families_are_rejected() {
        let err = join(
            vec![
                parsed("a.json", Document::swagger()),
                parsed("b.json", Document::openapi("3.0.0")),
            ],
            JoinConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            JoinError::VersionMismatch { ref left, ref right, .. } if left == "a.json" && right == "b.json"
        ));
    }

    #[test]
    fn test_document_without_version_is_unsupported() {
        let err = join(
            vec![parsed("a.json", Document::openapi("3.0.0")), parsed("b.json", Document::default())],
            JoinConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, JoinError::UnsupportedDocument { ref document, .. } if document == "b.json"));
    }

    #[test]
    fn test_invalid_template_fails_at_construction() {
        let config = JoinConfig::default().with_rename_template("{Name");
        assert!(matches!(Joiner::new(config), Err(JoinError::Template(_))));
    }

    #[test]
    fn test_minor_version_difference_warns() {
        let result = join(
            vec![parsed("a", Document::openapi("3.0.3")), parsed("b", Document::openapi("3.1.0"))],
            JoinConfig::default(),
        )
        .unwrap();
        assert_eq!(result.version, "3.0.3");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("3.1.0"));
        assert_eq!(minor_version("3.0.3"), "3.0");
        assert_eq!(minor_version("2.0"), "2.0");
    }

    #[test]
    fn test_identical_schemas_are_not_collisions() {
        let result = join(
            vec![
                parsed("a", doc(Schema::typed("object"))),
                parsed("b", doc(Schema::typed("object"))),
            ],
            JoinConfig::default(),
        )
        .unwrap();
        assert_eq!(result.collision_count, 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_accept_right_replaces_schema_in_place() {
        let left = doc(Schema::typed("object")).with_schema("Other", Schema::typed("string"));
        let config = JoinConfig::default().with_default_strategy(CollisionStrategy::AcceptRight);
        let result = join(
            vec![parsed("a", left), parsed("b", doc(Schema::typed("integer")))],
            config,
        )
        .unwrap();
        let names: Vec<&str> = result.document.components.schemas.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["User", "Other"]);
        assert_eq!(result.document.components.schemas["User"], Schema::typed("integer"));
        assert_eq!(result.collision_count, 1);
    }

    #[test]
    fn test_fail_on_paths_keeps_left_schema() {
        let config = JoinConfig::default().with_default_strategy(CollisionStrategy::FailOnPaths);
        let result = join(
            vec![parsed("a", doc(Schema::typed("object"))), parsed("b", doc(Schema::typed("string")))],
            config,
        )
        .unwrap();
        assert_eq!(result.document.components.schemas["User"], Schema::typed("object"));
        assert_eq!(result.collision_count, 1);
    }

    #[test]
    fn test_rename_right_on_paths_degrades_to_keep_left() {
        let item = |status: &str| {
            PathItem::default().with_operation(
                Method::Get,
                Operation::default().with_response(status, Response::default()),
            )
        };
        let config = JoinConfig::default().with_default_strategy(CollisionStrategy::RenameRight);
        let result = join(
            vec![
                parsed("a", Document::openapi("3.0.3").with_path("/x", item("200"))),
                parsed("b", Document::openapi("3.0.3").with_path("/x", item("201"))),
            ],
            config,
        )
        .unwrap();
        assert_eq!(result.collision_count, 1);
        assert!(result.warnings[0].contains("cannot rename a path"));
        assert!(result.document.paths["/x"].get.as_ref().unwrap().responses.contains_key("200"));
    }

    #[test]
    fn test_deduplicate_equivalent_merges_when_structure_matches() {
        let config = JoinConfig::default().with_default_strategy(CollisionStrategy::DeduplicateEquivalent);
        let result = join(
            vec![
                parsed("a", doc(Schema::typed("object").with_description("left"))),
                parsed("b", doc(Schema::typed("object").with_description("right"))),
            ],
            config.clone(),
        )
        .unwrap();
        assert_eq!(result.collision_count, 1);
        assert_eq!(
            result.document.components.schemas["User"].description.as_deref(),
            Some("left")
        );

        let err = join(
            vec![parsed("a", doc(Schema::typed("object"))), parsed("b", doc(Schema::typed("string")))],
            config,
        )
        .unwrap_err();
        assert!(matches!(err, JoinError::NotEquivalent { .. }));
    }

    #[test]
    fn test_arrays_merge_and_tags_dedupe() {
        let mut left = Document::openapi("3.0.3");
        left.servers.push(Server::new("https://a.example"));
        left.tags.push(Tag::new("users"));
        let mut right = Document::openapi("3.0.3");
        right.servers.push(Server::new("https://a.example"));
        right.servers.push(Server::new("https://b.example"));
        right.tags.push(Tag::new("users"));
        right.tags.push(Tag::new("orders"));

        let result = join(
            vec![parsed("a", left.clone()), parsed("b", right.clone())],
            JoinConfig::default(),
        )
        .unwrap();
        assert_eq!(result.statistics.servers, 2);
        let tags: Vec<&str> = result.document.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["users", "orders"]);

        let mut config = JoinConfig::default();
        config.merge_arrays = false;
        let result = join(vec![parsed("a", left), parsed("b", right)], config).unwrap();
        assert_eq!(result.statistics.servers, 1);
        assert_eq!(result.statistics.tags, 1);
    }

    #[test]
    fn test_hooks_run_and_failures_are_reported() {
        let joiner = Joiner::new(JoinConfig::default())
            .unwrap()
            .with_pre_merge_hook(|mut document: Document| -> std::result::Result<Document, HookError> {
                document.info.title = "hooked".to_string();
                Ok(document)
            })
            .with_post_merge_hook(|document: Document| -> std::result::Result<Document, HookError> {
                if document.info.title == "hooked" {
                    Ok(document)
                } else {
                    Err("pre-merge hook did not run".into())
                }
            });
        let result = joiner
            .join(vec![parsed("a", Document::openapi("3.0.3")), parsed("b", Document::openapi("3.0.3"))])
            .unwrap();
        assert_eq!(result.document.info.title, "hooked");

        let failing = Joiner::new(JoinConfig::default())
            .unwrap()
            .with_pre_merge_hook(|_: Document| -> std::result::Result<Document, HookError> {
                Err("boom".into())
            });
        let err = failing
            .join(vec![parsed("a", Document::openapi("3.0.3")), parsed("b", Document::openapi("3.0.3"))])
            .unwrap_err();
        assert!(matches!(
            err,
            JoinError::Hook { stage: HookStage::PreMerge, ref message, .. } if message == "boom"
        ));
    }

    #[test]
    fn test_into_parsed_round_trips_identity() {
        let result = join(
            vec![
                parsed("a", Document::openapi("3.0.3")).with_format(DocumentFormat::Yaml),
                parsed("b", Document::openapi("3.0.3")),
            ],
            JoinConfig::default(),
        )
        .unwrap();
        let again = result.into_parsed("joined.yaml");
        assert_eq!(again.source, "joined.yaml");
        assert_eq!(again.format, DocumentFormat::Yaml);
        assert_eq!(again.version, "3.0.3");
    }
}
