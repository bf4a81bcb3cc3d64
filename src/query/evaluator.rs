//! Query evaluation driver.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::{Config, EvaluatorConfig, OptimizerConfig};
use crate::pkb::Pkb;

use super::ast::Query;
use super::errors::QueryError;
use super::handler::ClauseHandler;
use super::optimizer::Optimizer;
use super::profile;
use super::projector::{QueryOutput, ResultProjector};
use super::result_table::ResultTable;

/// Evaluates validated queries against one populated PKB.
///
/// The PKB is only read; any number of evaluators may share it.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator<'p> {
    pkb: &'p Pkb,
    optimizer: OptimizerConfig,
    evaluator: EvaluatorConfig,
}

impl<'p> Evaluator<'p> {
    /// Creates an evaluator. `config.profiling.enabled` switches the
    /// process-wide counters on.
    pub fn new(pkb: &'p Pkb, config: &Config) -> Self {
        if config.profiling.enabled {
            profile::set_enabled(true);
        }
        Self {
            pkb,
            optimizer: config.optimizer,
            evaluator: config.evaluator,
        }
    }

    /// Validates and evaluates `query`.
    pub fn evaluate(&self, query: &Query) -> Result<QueryOutput, QueryError> {
        query.validate()?;
        let handler = ClauseHandler::new(self.pkb);
        let groups = Optimizer::new(self.optimizer).optimize(query);
        let selected: FxHashSet<&str> = query
            .selected()
            .iter()
            .map(|elem| elem.declaration().synonym.as_str())
            .collect();

        let mut tables = Vec::with_capacity(groups.len());
        for group in &groups {
            if !group.has_synonyms() {
                if !handler.handle_no_syn_group(group) {
                    debug!(group = group.id(), "query.evaluator.constant_group_failed");
                    return Ok(QueryOutput::failed(&query.result));
                }
                continue;
            }
            let table = handler.handle_group(group);
            if !table.has_result() {
                debug!(group = group.id(), "query.evaluator.group_empty");
                return Ok(QueryOutput::failed(&query.result));
            }
            if self.evaluator.prune_unselected_groups
                && !group.synonyms().iter().any(|syn| selected.contains(syn))
            {
                debug!(group = group.id(), rows = table.len(), "query.evaluator.group_pruned");
                continue;
            }
            tables.push(table);
        }

        let mut result = tables
            .into_iter()
            .fold(ResultTable::identity(), ResultTable::join);
        for elem in query.selected() {
            let decl = elem.declaration();
            if !result.has_column(&decl.synonym) {
                result = result.join(handler.get_all(decl));
            }
        }

        let output = ResultProjector::new(self.pkb).project(query, &result);
        debug!(
            groups = groups.len(),
            clauses = query.clause_count(),
            rows = output.len(),
            "query.evaluator.done"
        );
        Ok(output)
    }
}
