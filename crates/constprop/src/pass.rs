//! # Pass Driver
//!
//! Runs analysis and transform on methods: [`ConstantPropagationPass`]
//! builds the analyzer chain and the initial environment for each method,
//! solves the fixpoint and applies the transform.
//!
//! Methods are independent; [`ConstantPropagationPass::run_on_methods`]
//! processes them in parallel, sharing only the read-only whole-program
//! state.

use dexopt_ir::{FieldRef, IrCode};
use rayon::prelude::*;

use crate::analyzer::InstructionAnalyzer;
use crate::config::ConstantPropagationConfig;
use crate::domain::ConstantDomain;
use crate::environment::ConstantEnvironment;
use crate::error::ConstPropResult;
use crate::fixpoint::FixpointIterator;
use crate::lattice::MeetSemiLattice;
use crate::transform::{Stats, Transform};
use crate::whole_program::{ArgumentDomain, WholeProgramState};

/// A pass over the code of one method
pub trait CodePass {
    /// Runs the pass; returns true if the code was modified
    fn run(&mut self, method: &mut Method) -> ConstPropResult<bool>;

    /// Returns the name of this pass for debugging
    fn name(&self) -> &'static str;
}

/// A static field of the class declaring a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticField {
    pub field: FieldRef,
    /// Value stored in the class definition, if any
    pub encoded_value: Option<i64>,
}

impl StaticField {
    pub const fn new(field: FieldRef, encoded_value: Option<i64>) -> Self {
        Self {
            field,
            encoded_value,
        }
    }
}

/// A method together with what the pass knows about its context
#[derive(Debug, Clone)]
pub struct Method {
    /// Descriptor of the declaring class, e.g. `LFoo;`
    pub class: String,
    pub name: String,
    pub code: IrCode,
    /// Values of the parameters over all call sites
    pub args: ArgumentDomain,
    /// Static fields of the declaring class; only consulted for `<clinit>`
    pub static_fields: Vec<StaticField>,
}

impl Method {
    pub fn new(class: &str, name: &str, code: IrCode) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            code,
            args: ArgumentDomain::top(),
            static_fields: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: ArgumentDomain) -> Self {
        self.args = args;
        self
    }

    pub fn with_static_fields(mut self, static_fields: Vec<StaticField>) -> Self {
        self.static_fields = static_fields;
        self
    }

    /// Returns true for the static initializer of the class
    pub fn is_clinit(&self) -> bool {
        self.name == "<clinit>"
    }

    /// `LFoo;.bar`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

/// State at the entry of `method`
///
/// Parameters take their value from the method's argument domain, in
/// `load-param*` order. In a static initializer the fields of the class
/// start at their encoded value: 0 when there is none, the encoded value for
/// primitives, unknown for objects.
pub fn initial_environment(method: &Method) -> ConstantEnvironment {
    let mut env = ConstantEnvironment::top();
    let code = &method.code;

    let params = code
        .block_insns(code.entry_block())
        .map(|(_, insn)| insn)
        .filter(|insn| insn.opcode.is_load_param());
    for (idx, insn) in params.enumerate() {
        let Some(dest) = insn.dest else {
            continue;
        };
        let value = method.args.get(idx);
        // No known call site: analyze as if called with anything
        let value = if value.is_bottom() {
            ConstantDomain::Top
        } else {
            value
        };
        env.set(dest, value);
    }

    if method.is_clinit() {
        for static_field in &method.static_fields {
            let value = match static_field.encoded_value {
                None => ConstantDomain::Constant(0),
                Some(k) if static_field.field.is_primitive() => ConstantDomain::Constant(k),
                Some(_) => ConstantDomain::Top,
            };
            env.set_field(&static_field.field, value);
        }
    }

    env
}

/// Constant propagation, redundant static store and dead branch elimination
pub struct ConstantPropagationPass<'w> {
    config: ConstantPropagationConfig,
    whole_program: &'w dyn WholeProgramState,
    /// Totals over every `CodePass::run` call
    stats: Stats,
}

impl<'w> ConstantPropagationPass<'w> {
    pub fn new(
        config: ConstantPropagationConfig,
        whole_program: &'w dyn WholeProgramState,
    ) -> Self {
        Self {
            config,
            whole_program,
            stats: Stats::default(),
        }
    }

    pub const fn config(&self) -> &ConstantPropagationConfig {
        &self.config
    }

    /// Totals accumulated by [`CodePass::run`]
    pub const fn stats(&self) -> Stats {
        self.stats
    }

    /// Optimizes a single method
    pub fn run_on_method(&self, method: &mut Method) -> ConstPropResult<Stats> {
        let name = method.full_name();
        self.optimize(method)
            .map_err(|err| err.in_method(&name))
            .inspect(|stats| log::debug!("{name}: {stats}"))
    }

    fn optimize(&self, method: &mut Method) -> ConstPropResult<Stats> {
        if self.config.verify_code {
            method.code.validate()?;
        }

        let class_under_init = method.is_clinit().then_some(method.class.as_str());
        let analyzer = InstructionAnalyzer::standard(class_under_init, self.whole_program);
        let mut fp = FixpointIterator::new(analyzer);
        fp.run(&method.code, initial_environment(method));

        let stats = Transform::new(self.config).apply(&fp, self.whole_program, &mut method.code)?;

        if self.config.verify_code {
            method.code.validate()?;
        }
        Ok(stats)
    }

    /// Optimizes every method in parallel and sums the statistics
    ///
    /// Stops at the first method that fails; methods already processed keep
    /// their changes.
    pub fn run_on_methods(&self, methods: &mut [Method]) -> ConstPropResult<Stats> {
        let stats = methods
            .par_iter_mut()
            .map(|method| self.run_on_method(method))
            .try_reduce(Stats::default, |a, b| Ok(a + b))?;
        log::debug!("constant propagation over {} methods: {stats}", methods.len());
        Ok(stats)
    }
}

impl CodePass for ConstantPropagationPass<'_> {
    fn run(&mut self, method: &mut Method) -> ConstPropResult<bool> {
        let stats = self.run_on_method(method)?;
        self.stats += stats;
        Ok(stats.changed())
    }

    fn name(&self) -> &'static str {
        "ConstantPropagation"
    }
}
