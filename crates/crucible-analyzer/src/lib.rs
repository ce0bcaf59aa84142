//! Semantic & Mutation Analyzer (spec §4.4): one traversal per module
//! collecting symbol lifetimes, container mutation, and free
//! identifiers referenced inside `eval`/`exec` literals.

pub mod complexity;
pub mod eval_refs;
pub mod lifetime;
pub mod mutation;

pub use complexity::{
    calculate_cognitive, calculate_cyclomatic, calculate_max_nesting, count_statements,
};
pub use eval_refs::{find_eval_sites, EvalSite};
pub use lifetime::{analyze_lifetimes, LifetimeInfo, LifetimeReport};
pub use mutation::{analyze_mutations, MutationReport, MUTATING_METHODS};

use anyhow::Result;
use crucible_core::ast::{Module, StmtKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    pub name: String,
    #[serde(skip)]
    pub lifetimes: LifetimeReport,
    pub mutated_locals: Vec<String>,
    #[serde(skip)]
    pub eval_sites: Vec<EvalSite>,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleAnalysis {
    pub functions: Vec<FunctionAnalysis>,
}

pub struct SemanticAnalyzer;

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, module: &Module) -> Result<ModuleAnalysis> {
        let mut functions = Vec::new();
        for stmt in &module.body {
            if let StmtKind::FunctionDef { name, body, .. } = &stmt.kind {
                let lifetimes = analyze_lifetimes(body);
                let mutation = analyze_mutations(body);
                let eval_sites = find_eval_sites(body);
                functions.push(FunctionAnalysis {
                    name: name.clone(),
                    cyclomatic_complexity: calculate_cyclomatic(body),
                    cognitive_complexity: calculate_cognitive(body),
                    mutated_locals: mutation.mutated.into_iter().collect(),
                    eval_sites,
                    lifetimes,
                });
            }
        }
        Ok(ModuleAnalysis { functions })
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::parser::Parser;

    #[test]
    fn analyzes_every_function_in_a_module() {
        let module = Parser::parse(
            "def f(x):\n    items = []\n    items.append(x)\n    return items\n",
        )
        .unwrap();
        let analyzer = SemanticAnalyzer::new();
        let report = analyzer.analyze(&module).unwrap();
        assert_eq!(report.functions.len(), 1);
        assert!(report.functions[0].mutated_locals.contains(&"items".to_string()));
    }

    #[test]
    fn empty_module_analyzes_to_no_functions() {
        let module = Parser::parse("x = 1\n").unwrap();
        let analyzer = SemanticAnalyzer::new();
        let report = analyzer.analyze(&module).unwrap();
        assert!(report.functions.is_empty());
    }
}
