use crate::{
    llm, primitives, Env, EvalError, LlmConfig, LlmError, LlmHost, OfflineLlm, PrimImpl,
    Primitive, ToolRegistry, Tools, Value,
};
use log::{debug, trace, warn};
use smol_str::SmolStr;
use std::collections::HashMap;
use sysf_core::{DataDeclaration, Declaration, LlmFunction, Module, Term, TermDeclaration};

type Result<T> = std::result::Result<T, EvalError>;

/// Call-by-value interpreter over core terms.
///
/// Global values are filled in declaration order. A name is registered as a
/// placeholder before its body is evaluated, so a body may mention itself
/// under a binder.
pub struct Evaluator {
    globals: HashMap<SmolStr, Option<Value>>,
    primitives: HashMap<SmolStr, Primitive>,
    /// Primitives declared with `prim-op`, with their arity.
    declared_primitives: HashMap<SmolStr, usize>,
    constructor_arities: HashMap<SmolStr, usize>,
    data_types: HashMap<SmolStr, DataDeclaration>,
    /// Keyed by primitive name (`llm.<name>`).
    llm_functions: HashMap<SmolStr, LlmFunction>,
    tools: Box<dyn ToolRegistry>,
    llm: Box<dyn LlmHost>,
    llm_config: LlmConfig,
}

impl Evaluator {
    pub fn new(module: &Module) -> Self {
        let primitives = primitives::builtins()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        let declared_primitives = module
            .declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::PrimOp { name, ty } => {
                    let (_, body) = ty.split_foralls();
                    Some((name.clone(), body.split_arrows().0.len()))
                }
                _ => None,
            })
            .collect();
        let constructor_arities = module
            .constructor_types
            .keys()
            .filter_map(|name| Some((name.clone(), module.constructor_arity(name)?)))
            .collect();
        let llm_functions = module
            .llm_functions
            .values()
            .map(|f| (f.primitive_name(), f.clone()))
            .collect();

        Self {
            globals: HashMap::new(),
            primitives,
            declared_primitives,
            constructor_arities,
            data_types: module.data_types.clone(),
            llm_functions,
            tools: Box::new(Tools::new()),
            llm: Box::new(OfflineLlm),
            llm_config: LlmConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: impl ToolRegistry + 'static) -> Self {
        self.tools = Box::new(tools);
        self
    }

    pub fn with_llm(mut self, host: impl LlmHost + 'static) -> Self {
        self.llm = Box::new(host);
        self
    }

    pub fn with_llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = config;
        self
    }

    /// Provide an implementation for a primitive, typically one declared with
    /// `prim-op`. Replaces any existing implementation of the same name.
    pub fn register_primitive(
        &mut self,
        name: impl Into<SmolStr>,
        arity: usize,
        run: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) {
        let prim = Primitive::native(name, arity, run);
        self.primitives.insert(prim.name.clone(), prim);
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name).and_then(Option::as_ref)
    }

    // ── Programs ──────────────────────────────────────────────────

    /// Evaluate every term declaration in order and return the values.
    pub fn evaluate_program(&mut self, module: &Module) -> Result<HashMap<SmolStr, Value>> {
        let mut values = HashMap::new();
        for decl in module.term_declarations() {
            let value = self.evaluate_declaration(decl)?;
            values.insert(decl.name.clone(), value);
        }
        Ok(values)
    }

    /// Evaluate one declaration's body and publish its value as a global.
    pub fn evaluate_declaration(&mut self, decl: &TermDeclaration) -> Result<Value> {
        self.globals.insert(decl.name.clone(), None);
        let value = self.evaluate(&decl.body, &Env::default())?;
        debug!("{} = {}", decl.name, value);
        self.globals.insert(decl.name.clone(), Some(value.clone()));
        Ok(value)
    }

    // ── Terms ─────────────────────────────────────────────────────

    pub fn evaluate(&self, term: &Term, env: &Env) -> Result<Value> {
        match term {
            Term::Var(index) => env
                .get(*index)
                .cloned()
                .ok_or_else(|| EvalError::runtime(format!("unbound variable #{}", index))),

            Term::Global(name) => match self.globals.get(name) {
                Some(Some(value)) => Ok(value.clone()),
                Some(None) => Err(EvalError::runtime(format!(
                    "{} is used before its definition is evaluated",
                    name
                ))),
                None => Err(EvalError::runtime(format!("undefined global: {}", name))),
            },

            Term::Abs { body, .. } => Ok(Value::Closure {
                env: env.clone(),
                body: body.clone(),
            }),

            Term::App(func, arg) => {
                let func = self.evaluate(func, env)?;
                let arg = self.evaluate(arg, env)?;
                self.apply(func, arg)
            }

            Term::TAbs { body, .. } => Ok(Value::TypeClosure {
                env: env.clone(),
                body: body.clone(),
            }),

            // Types are erased. Constructors and primitives are already
            // polymorphic at runtime.
            Term::TApp(func, _) => match self.evaluate(func, env)? {
                Value::TypeClosure { env, body } => self.evaluate(&body, &env),
                value @ (Value::Constructor { .. } | Value::PrimOp(_) | Value::PrimOpPartial(..)) => {
                    Ok(value)
                }
                other => Err(EvalError::runtime(format!(
                    "cannot apply a type argument to {}",
                    other
                ))),
            },

            Term::Constructor(name, args) => {
                let arity = *self
                    .constructor_arities
                    .get(name)
                    .ok_or_else(|| EvalError::runtime(format!("undefined constructor: {}", name)))?;
                if args.len() > arity {
                    return Err(constructor_arity_error(name, arity, args.len()));
                }
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Constructor {
                    name: name.clone(),
                    arity,
                    args,
                })
            }

            Term::Case(scrutinee, branches) => {
                let value = self.evaluate(scrutinee, env)?;
                let (name, args) = match &value {
                    Value::Constructor { name, arity, args } if args.len() == *arity => {
                        (name, args)
                    }
                    other => {
                        return Err(EvalError::runtime(format!(
                            "cannot match on {}",
                            other
                        )))
                    }
                };
                let branch = branches
                    .iter()
                    .find(|b| &b.pattern.constructor == name)
                    .ok_or_else(|| EvalError::runtime(format!("no branch matches {}", value)))?;
                if branch.pattern.vars.len() != args.len() {
                    return Err(EvalError::runtime(format!(
                        "pattern {} binds {} variables but the value has {} fields",
                        name,
                        branch.pattern.vars.len(),
                        args.len()
                    )));
                }
                // Bound last-first so the first pattern variable is index 0.
                let env = args
                    .iter()
                    .rev()
                    .fold(env.clone(), |acc, arg| acc.cons(arg.clone()));
                self.evaluate(&branch.body, &env)
            }

            Term::Let { value, body, .. } => {
                let value = self.evaluate(value, env)?;
                self.evaluate(body, &env.cons(value))
            }

            Term::IntLit(n) => Ok(Value::Int(*n)),
            Term::StringLit(s) => Ok(Value::String(s.clone())),

            Term::PrimOp(name) => {
                let prim = self.primitive(name)?;
                if prim.arity == 0 {
                    self.run_primitive(&prim, Vec::new())
                } else {
                    Ok(Value::PrimOp(prim))
                }
            }

            Term::ToolCall(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, env))
                    .collect::<Result<Vec<_>>>()?;
                trace!("tool {} with {} arguments", name, args.len());
                Ok(self.tools.execute(name, &args)?)
            }
        }
    }

    fn primitive(&self, name: &SmolStr) -> Result<Primitive> {
        if let Some(prim) = self.primitives.get(name) {
            return Ok(prim.clone());
        }
        if self.llm_functions.contains_key(name) {
            return Ok(Primitive::llm(name.clone()));
        }
        if self.declared_primitives.contains_key(name) {
            return Err(EvalError::runtime(format!(
                "primitive {} has no implementation",
                name
            )));
        }
        Err(EvalError::runtime(format!("undefined primitive: {}", name)))
    }

    pub fn apply(&self, func: Value, arg: Value) -> Result<Value> {
        match func {
            Value::Closure { env, body } => self.evaluate(&body, &env.cons(arg)),
            Value::PrimOp(prim) => self.run_primitive(&prim, vec![arg]),
            Value::PrimOpPartial(prim, mut args) => {
                args.push(arg);
                self.run_primitive(&prim, args)
            }
            Value::Constructor {
                name,
                arity,
                mut args,
            } => {
                if args.len() >= arity {
                    return Err(constructor_arity_error(&name, arity, args.len() + 1));
                }
                args.push(arg);
                Ok(Value::Constructor { name, arity, args })
            }
            other => Err(EvalError::runtime(format!("cannot apply {}", other))),
        }
    }

    /// Run `prim` once it has all its arguments; until then keep collecting.
    fn run_primitive(&self, prim: &Primitive, args: Vec<Value>) -> Result<Value> {
        if args.len() < prim.arity {
            return Ok(Value::PrimOpPartial(prim.clone(), args));
        }
        match &prim.imp {
            PrimImpl::Native(run) => run(&args),
            PrimImpl::Llm => {
                let input = args
                    .into_iter()
                    .next()
                    .ok_or_else(|| EvalError::runtime(format!("{} needs an argument", prim.name)))?;
                self.apply_llm(&prim.name, input)
            }
        }
    }

    // ── LLM functions ─────────────────────────────────────────────

    /// The only place an error is swallowed: any [`LlmError`] turns the call
    /// into the identity on `input`.
    fn apply_llm(&self, name: &SmolStr, input: Value) -> Result<Value> {
        let function = self
            .llm_functions
            .get(name)
            .ok_or_else(|| EvalError::runtime(format!("no LLM function registered for {}", name)))?;
        match self.call_llm(function, &input) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("{} falls back to its input: {}", function.name, e);
                Ok(input)
            }
        }
    }

    fn call_llm(&self, function: &LlmFunction, input: &Value) -> std::result::Result<Value, LlmError> {
        let prompt = llm::craft_prompt(function, input)?;
        let model = function.model.as_deref().unwrap_or(&self.llm_config.model);
        let temperature = function.temperature.unwrap_or(self.llm_config.temperature);
        debug!(
            "calling {} for {} at temperature {}",
            model, function.name, temperature
        );
        let response = self.llm.call(model, temperature, &prompt)?;
        llm::parse_response(&response, &function.return_type, &self.data_types)
    }
}

fn constructor_arity_error(name: &str, arity: usize, given: usize) -> EvalError {
    EvalError::runtime(format!(
        "constructor {} expects {} arguments, got {}",
        name, arity, given
    ))
}
