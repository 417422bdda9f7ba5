//! The script executor.
//!
//! A `ScriptExecutor` owns one rhai engine and one global scope. Modules are
//! object maps living in that scope (or returned by a script-level
//! `require(global, name)` function); their methods are function pointers
//! invoked with the global receiver as the first argument.
//!
//! The engine is built without rhai's `sync` feature, so an executor can
//! never leave the thread that created it. Use [`crate::ScriptThread`] to
//! drive one from elsewhere.

use rhai::{AST, CallFnOptions, Dynamic, Engine, FnPtr, Map as ScriptMap, Scope};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use trellis_api::Value;

use crate::console::{self, ConsoleSink};
use crate::error::ExecutorError;
use crate::marshal::{from_structured, to_structured};

/// Session counter shared by every executor in the process.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

const REQUIRE: &str = "require";

/// Engine limits applied at initialization. Zero means unlimited where rhai
/// allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 0,
        }
    }
}

impl ExecutorConfig {
    fn apply(&self, engine: &mut Engine) {
        engine.set_max_operations(self.max_operations);
        engine.set_max_call_levels(self.max_call_levels);
        engine.set_max_expr_depths(self.max_expr_depth, self.max_expr_depth);
        engine.set_max_string_size(self.max_string_size);
    }
}

/// The receiver passed as argument 0 of every module call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Global {
    session: u64,
}

struct Runtime {
    engine: Engine,
    scope: Scope<'static>,
    /// Every function defined by scripts run so far.
    library: AST,
}

enum RuntimeState {
    Uninitialized,
    Ready(Box<Runtime>),
    Disposed,
}

pub struct ScriptExecutor {
    state: RuntimeState,
    config: ExecutorConfig,
    sink: Arc<dyn ConsoleSink>,
    source_context: u64,
    session: u64,
}

fn ready(state: &mut RuntimeState) -> Result<&mut Runtime, ExecutorError> {
    match state {
        RuntimeState::Ready(runtime) => Ok(runtime),
        RuntimeState::Uninitialized => Err(ExecutorError::NotInitialized),
        RuntimeState::Disposed => Err(ExecutorError::Disposed),
    }
}

fn invocation(target: impl Into<String>, reason: impl Into<String>) -> ExecutorError {
    ExecutorError::Invocation {
        target: target.into(),
        reason: reason.into(),
    }
}

impl ScriptExecutor {
    pub fn new(config: ExecutorConfig, sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            state: RuntimeState::Uninitialized,
            config,
            sink,
            source_context: 0,
            session: SESSION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Creates the engine, installs the console and the global type.
    pub fn initialize(&mut self) -> Result<(), ExecutorError> {
        match self.state {
            RuntimeState::Ready(_) => return Err(ExecutorError::AlreadyInitialized),
            RuntimeState::Disposed => return Err(ExecutorError::Disposed),
            RuntimeState::Uninitialized => {}
        }

        let mut engine = Engine::new();
        self.config.apply(&mut engine);
        engine
            .register_type_with_name::<Global>("Global")
            .register_get("session", |global: &mut Global| global.session as rhai::INT);
        console::install(&mut engine, Arc::clone(&self.sink));

        self.state = RuntimeState::Ready(Box::new(Runtime {
            engine,
            scope: Scope::new(),
            library: AST::empty(),
        }));
        tracing::debug!(session = self.session, "script executor initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RuntimeState::Ready(_))
    }

    pub fn session_id(&self) -> u64 {
        self.session
    }

    /// Calls `module_name.method_name(global, args...)` and marshals the result.
    pub fn call(
        &mut self,
        module_name: &str,
        method_name: &str,
        args: &[Value],
    ) -> Result<Value, ExecutorError> {
        let global = Dynamic::from(Global {
            session: self.session,
        });
        let runtime = ready(&mut self.state)?;
        let target = format!("{}.{}", module_name, method_name);

        let module = runtime.resolve_module(module_name, &global)?;
        let method = module
            .get(method_name)
            .ok_or_else(|| invocation(&target, "no such method"))?
            .flatten_clone();
        let type_name = method.type_name();
        let method = method
            .try_cast::<FnPtr>()
            .ok_or_else(|| invocation(&target, format!("`{}` is not a function", type_name)))?;

        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(global);
        call_args.extend(args.iter().map(from_structured));

        tracing::trace!(function = %target, argc = call_args.len(), "calling script function");
        let result = method.call::<Dynamic>(&runtime.engine, &runtime.library, call_args)?;
        Ok(to_structured(&result)?)
    }

    /// Compiles and runs `source` against the global scope. Each run gets a
    /// fresh source name; functions it defines stay callable afterwards.
    pub fn run_script(&mut self, source: &str) -> Result<(), ExecutorError> {
        let runtime = ready(&mut self.state)?;
        self.source_context += 1;
        let source_name = format!("script-{}", self.source_context);

        let mut ast = runtime.engine.compile_with_scope(&runtime.scope, source)?;
        ast.set_source(source_name.as_str());
        runtime.engine.run_ast_with_scope(&mut runtime.scope, &ast)?;
        runtime.library = runtime.library.merge(&ast.clone_functions_only());

        tracing::debug!(source = %source_name, bytes = source.len(), "script evaluated");
        Ok(())
    }

    /// Reads a global; an absent global reads as `Null`.
    pub fn get_global(&mut self, name: &str) -> Result<Value, ExecutorError> {
        let runtime = ready(&mut self.state)?;
        match runtime.scope.get(name) {
            Some(value) => Ok(to_structured(value)?),
            None => Ok(Value::Null),
        }
    }

    pub fn set_global(&mut self, name: &str, value: &Value) -> Result<(), ExecutorError> {
        let runtime = ready(&mut self.state)?;
        if runtime.scope.is_constant(name) == Some(true) {
            return Err(ExecutorError::Script {
                message: format!("cannot assign to constant `{}`", name),
            });
        }
        runtime.scope.set_or_push(name, from_structured(value));
        Ok(())
    }

    /// Exposes a native function to scripts as `name(value)`.
    ///
    /// The single argument is marshaled before `callback` sees it; an `Err`
    /// becomes a script runtime error at the call site.
    pub fn register_host_function<F>(
        &mut self,
        name: &str,
        callback: F,
    ) -> Result<(), ExecutorError>
    where
        F: Fn(Value) -> Result<(), String> + 'static,
    {
        let runtime = ready(&mut self.state)?;
        runtime
            .engine
            .register_fn(name, move |value: Dynamic| -> Result<(), Box<rhai::EvalAltResult>> {
                let value = to_structured(&value).map_err(|e| e.to_string())?;
                callback(value).map_err(Into::into)
            });
        tracing::debug!(name, "host function registered");
        Ok(())
    }

    /// Releases the engine. Every later call fails with `Disposed`.
    pub fn dispose(&mut self) {
        if let RuntimeState::Ready(_) = self.state {
            tracing::debug!(session = self.session, "script executor disposed");
        }
        self.state = RuntimeState::Disposed;
    }
}

impl Runtime {
    fn resolve_module(&mut self, name: &str, global: &Dynamic) -> Result<ScriptMap, ExecutorError> {
        let existing = self
            .scope
            .get(name)
            .and_then(|value| value.read_lock::<ScriptMap>().map(|map| (*map).clone()));
        if let Some(module) = existing {
            return Ok(module);
        }

        let resolved = self.require(name, global)?;
        let type_name = resolved.type_name();
        resolved.flatten().try_cast::<ScriptMap>().ok_or_else(|| {
            invocation(
                name,
                format!("module resolved to `{}`, not an object map", type_name),
            )
        })
    }

    /// Resolution goes through `require` every time; nothing is cached here.
    fn require(&mut self, name: &str, global: &Dynamic) -> Result<Dynamic, ExecutorError> {
        let args = vec![global.clone(), Dynamic::from(name.to_string())];

        let scoped = self
            .scope
            .get(REQUIRE)
            .and_then(|value| value.flatten_clone().try_cast::<FnPtr>());
        if let Some(require) = scoped {
            return Ok(require.call::<Dynamic>(&self.engine, &self.library, args)?);
        }

        let defined = self
            .library
            .iter_functions()
            .any(|f| f.name == REQUIRE && f.params.len() == 2);
        if defined {
            let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
            return Ok(self.engine.call_fn_with_options::<Dynamic>(
                options,
                &mut self.scope,
                &self.library,
                REQUIRE,
                args,
            )?);
        }

        Err(invocation(
            name,
            "no such global module and no `require` function to resolve it",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleLevel;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        lines: Mutex<Vec<(ConsoleLevel, String)>>,
    }

    impl ConsoleSink for CaptureSink {
        fn write(&self, level: ConsoleLevel, message: &str) -> std::io::Result<()> {
            self.lines.lock().unwrap().push((level, message.to_string()));
            Ok(())
        }
    }

    struct FailingSink;

    impl ConsoleSink for FailingSink {
        fn write(&self, _level: ConsoleLevel, _message: &str) -> std::io::Result<()> {
            Err(std::io::Error::other("sink closed"))
        }
    }

    fn executor() -> ScriptExecutor {
        let mut exec =
            ScriptExecutor::new(ExecutorConfig::default(), Arc::new(CaptureSink::default()));
        exec.initialize().unwrap();
        exec
    }

    fn executor_with_sink(sink: Arc<dyn ConsoleSink>) -> ScriptExecutor {
        let mut exec = ScriptExecutor::new(ExecutorConfig::default(), sink);
        exec.initialize().unwrap();
        exec
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut exec =
            ScriptExecutor::new(ExecutorConfig::default(), Arc::new(CaptureSink::default()));
        assert_eq!(exec.run_script("1"), Err(ExecutorError::NotInitialized));

        exec.initialize().unwrap();
        assert_eq!(exec.initialize(), Err(ExecutorError::AlreadyInitialized));

        exec.dispose();
        assert!(!exec.is_ready());
        assert_eq!(exec.run_script("1"), Err(ExecutorError::Disposed));
        assert_eq!(exec.get_global("x"), Err(ExecutorError::Disposed));
        assert_eq!(exec.initialize(), Err(ExecutorError::Disposed));
    }

    #[test]
    fn test_sessions_are_distinct() {
        let a = executor();
        let b = executor();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_call_passes_global_receiver_first() {
        let mut exec = executor();
        exec.run_script(
            r#"
            let Recorder = #{
                record: |g, a, b| [type_of(g), g.session, a, b],
            };
            "#,
        )
        .unwrap();

        let result = exec
            .call("Recorder", "record", &[Value::from(1i64), Value::from("x")])
            .unwrap();
        assert_eq!(
            result,
            Value::from(vec![
                Value::from("Global"),
                Value::from(exec.session_id() as i64),
                Value::from(1i64),
                Value::from("x"),
            ])
        );
    }

    #[test]
    fn test_call_with_zero_args_still_passes_receiver() {
        let mut exec = executor();
        exec.run_script("let M = #{ ping: |g| \"pong\" };").unwrap();
        assert_eq!(exec.call("M", "ping", &[]).unwrap(), Value::from("pong"));
    }

    #[test]
    fn test_wrong_arity_is_script_error() {
        let mut exec = executor();
        exec.run_script("let M = #{ one: |g, a| a };").unwrap();
        let err = exec.call("M", "one", &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Script { .. }), "{err:?}");
    }

    #[test]
    fn test_missing_method_and_non_function() {
        let mut exec = executor();
        exec.run_script("let M = #{ value: 5 };").unwrap();

        let err = exec.call("M", "absent", &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Invocation { .. }));

        let err = exec.call("M", "value", &[]).unwrap_err();
        match err {
            ExecutorError::Invocation { target, reason } => {
                assert_eq!(target, "M.value");
                assert!(reason.contains("not a function"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_module_without_require() {
        let mut exec = executor();
        let err = exec.call("Nowhere", "go", &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Invocation { .. }));
    }

    #[test]
    fn test_require_fallback_runs_every_call() {
        let mut exec = executor();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        exec.register_host_function("note", move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        })
        .unwrap();

        exec.run_script(
            r#"
            fn require(g, name) {
                note(name);
                if name == "Echo" {
                    #{ echo: |g, x| x }
                } else {
                    ()
                }
            }
            "#,
        )
        .unwrap();

        for _ in 0..2 {
            let out = exec.call("Echo", "echo", &[Value::from(7i64)]).unwrap();
            assert_eq!(out, Value::from(7i64));
        }
        assert_eq!(count.get(), 2);

        let err = exec.call("Other", "echo", &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Invocation { .. }));
    }

    #[test]
    fn test_require_from_scope_function_pointer() {
        let mut exec = executor();
        exec.run_script(
            r#"
            let require = |g, name| #{ who: |g| name };
            "#,
        )
        .unwrap();
        let out = exec.call("Anything", "who", &[]).unwrap();
        assert_eq!(out, Value::from("Anything"));
    }

    #[test]
    fn test_script_error_message() {
        let mut exec = executor();
        let err = exec.run_script("let x = ;").unwrap_err();
        assert!(matches!(err, ExecutorError::Script { .. }));

        let err = exec.run_script("throw \"boom\";").unwrap_err();
        match err {
            ExecutorError::Script { message } => assert!(message.contains("boom"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_functions_survive_between_scripts() {
        let mut exec = executor();
        exec.run_script("fn double(x) { x * 2 }").unwrap();
        exec.run_script("let M = #{ run: |g, x| double(x) };").unwrap();
        assert_eq!(
            exec.call("M", "run", &[Value::from(21i64)]).unwrap(),
            Value::from(42i64)
        );
    }

    #[test]
    fn test_globals() {
        let mut exec = executor();
        assert_eq!(exec.get_global("missing").unwrap(), Value::Null);

        exec.set_global("config", &Value::from_iter([("debug", true)]))
            .unwrap();
        exec.run_script("let flag = config.debug;").unwrap();
        assert_eq!(exec.get_global("flag").unwrap(), Value::Bool(true));

        exec.run_script("const LOCKED = 1;").unwrap();
        assert!(exec.set_global("LOCKED", &Value::from(2i64)).is_err());
    }

    #[test]
    fn test_result_with_function_fails_to_marshal() {
        let mut exec = executor();
        exec.run_script("let M = #{ leak: |g| |x| x };").unwrap();
        let err = exec.call("M", "leak", &[]).unwrap_err();
        assert!(matches!(err, ExecutorError::Marshal(_)));
    }

    #[test]
    fn test_host_function_error_propagates() {
        let mut exec = executor();
        exec.register_host_function("reject", |_| Err("nope".to_string()))
            .unwrap();
        let err = exec.run_script("reject(1);").unwrap_err();
        match err {
            ExecutorError::Script { message } => assert!(message.contains("nope"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_console_forwards_formatted_lines() {
        let sink = Arc::new(CaptureSink::default());
        let mut exec = executor_with_sink(sink.clone());
        exec.run_script(
            r#"
            console.log("a", 1, [true], #{ k: () }, |x| x);
            fn warn_later() { console.warn("inside"); }
            warn_later();
            console.error();
            "#,
        )
        .unwrap();

        let lines = sink.lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                (ConsoleLevel::Log, "\"a\" 1 [true] {\"k\":null} function".to_string()),
                (ConsoleLevel::Warn, "\"inside\"".to_string()),
                (ConsoleLevel::Error, String::new()),
            ]
        );
    }

    #[test]
    fn test_console_accepts_many_arguments() {
        let sink = Arc::new(CaptureSink::default());
        let mut exec = executor_with_sink(sink.clone());
        let args: Vec<String> = (1..=crate::console::MAX_CONSOLE_ARGS)
            .map(|n| n.to_string())
            .collect();
        exec.run_script(&format!(
            "console.log(1, 2, 3, 4, 5, 6, 7, 8, 9); console.warn({});",
            args.join(", ")
        ))
        .unwrap();

        let lines = sink.lines.lock().unwrap();
        assert_eq!(lines[0].1, "1 2 3 4 5 6 7 8 9");
        assert_eq!(lines[1], (ConsoleLevel::Warn, args.join(" ")));
    }

    #[test]
    fn test_console_sink_failure_does_not_abort_script() {
        let mut exec = executor_with_sink(Arc::new(FailingSink));
        exec.run_script("console.log(1); let done = true;").unwrap();
        assert_eq!(exec.get_global("done").unwrap(), Value::Bool(true));
    }
}
