/// Per-execution environment construction
///
/// **Isolation Rules:**
/// - A new `Engine` is built for every execution and dropped afterwards
/// - Only allow-listed packages are registered (no time, no debugging, no modules)
/// - `eval`, `import` and `export` are disabled symbols
/// - `sleep` from the core package is overridden with an erroring version
/// - Each denied host name resolves to an `unavailable` value, and calling
///   it as a function raises an error
/// - `console` and `print`/`debug` write into a buffer owned by this
///   environment, never to the host's stdout
/// - Operation budget and wall-clock deadline abort the script
use crate::config::SandboxConfig;
use crate::convert::{dynamic_to_json, json_to_dynamic};
use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicFnPackage, BasicIteratorPackage, BasicMapPackage,
    BasicMathPackage, BasicStringPackage, LanguageCorePackage, LogicPackage, MoreStringPackage,
    Package,
};
use rhai::{Dynamic, Engine, EvalAltResult, NativeCallContext, FLOAT, INT};
use std::any::TypeId;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Type name reported by `type_of()` for a shadowed host capability
pub const UNAVAILABLE_TYPE: &str = "unavailable";

/// How often, in operations, the wall-clock deadline is checked
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Symbols disabled at the language level
const DISABLED_SYMBOLS: &[&str] = &["eval", "import", "export"];

/// Package functions that block the host thread outside the operation budget
const BLOCKING_FUNCTIONS: &[&str] = &["sleep"];

/// Most arguments a single `console.*` call accepts
pub const MAX_CONSOLE_ARGS: usize = 10;

/// Ordered log lines captured from one execution
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// The learner-facing `console` object
#[derive(Debug, Clone)]
pub struct Console {
    logs: LogBuffer,
}

impl Console {
    fn emit(&self, prefix: &str, args: &[Dynamic]) {
        let text = args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.logs.push(format!("{}{}", prefix, text));
    }
}

/// The learner-facing `JSON` object
#[derive(Debug, Clone, Copy)]
pub struct JsonApi;

/// Value bound to every denied host name
#[derive(Debug, Clone)]
pub struct Unavailable;

/// A freshly built, single-use execution environment
pub struct Environment {
    pub engine: Engine,
    pub logs: LogBuffer,
}

impl Environment {
    /// Build a new environment; the deadline clock starts now
    pub fn new(config: &SandboxConfig) -> Self {
        let logs = LogBuffer::default();
        let mut engine = Engine::new_raw();

        register_packages(&mut engine);
        apply_limits(&mut engine, config);

        for &symbol in DISABLED_SYMBOLS {
            engine.disable_symbol(symbol);
        }

        register_console(&mut engine, &logs);
        register_json(&mut engine);
        register_blocking_overrides(&mut engine);
        register_denials(&mut engine, &config.denied_globals);
        bind_globals(&mut engine, &logs, &config.denied_globals);

        Self { engine, logs }
    }
}

fn register_packages(engine: &mut Engine) {
    LanguageCorePackage::new().register_into_engine(engine);
    ArithmeticPackage::new().register_into_engine(engine);
    LogicPackage::new().register_into_engine(engine);
    BasicStringPackage::new().register_into_engine(engine);
    MoreStringPackage::new().register_into_engine(engine);
    BasicIteratorPackage::new().register_into_engine(engine);
    BasicFnPackage::new().register_into_engine(engine);
    BasicMathPackage::new().register_into_engine(engine);
    BasicArrayPackage::new().register_into_engine(engine);
    BasicMapPackage::new().register_into_engine(engine);
}

fn apply_limits(engine: &mut Engine, config: &SandboxConfig) {
    engine.set_max_operations(config.max_operations);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);

    let deadline = Instant::now() + config.execution_timeout;
    engine.on_progress(move |operations| {
        if operations % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            Some(Dynamic::from("execution timed out"))
        } else {
            None
        }
    });
}

fn register_console(engine: &mut Engine, logs: &LogBuffer) {
    let print_logs = logs.clone();
    engine.on_print(move |text| print_logs.push(text.to_string()));

    let debug_logs = logs.clone();
    engine.on_debug(move |text, _source, _pos| debug_logs.push(text.to_string()));

    engine.register_type_with_name::<Console>("Console");

    // One raw overload per arity; the resolved `console` is read-only, so the
    // receiver is only ever read
    for (method, prefix) in [("log", ""), ("warn", "WARN: "), ("error", "ERROR: ")] {
        for arity in 0..=MAX_CONSOLE_ARGS {
            let mut arg_types = vec![TypeId::of::<Console>()];
            arg_types.resize(arity + 1, TypeId::of::<Dynamic>());

            engine.register_raw_fn(
                method,
                arg_types,
                move |_ctx: NativeCallContext, args: &mut [&mut Dynamic]| -> Result<(), Box<EvalAltResult>> {
                    let (receiver, rest) = match args.split_first() {
                        Some(split) => split,
                        None => return Ok(()),
                    };
                    let console = receiver
                        .read_lock::<Console>()
                        .map(|c| c.clone())
                        .ok_or_else(|| Box::<EvalAltResult>::from("console receiver is not a Console"))?;
                    let values: Vec<Dynamic> = rest.iter().map(|a| (**a).clone()).collect();
                    console.emit(prefix, &values);
                    Ok(())
                },
            );
        }
    }
}

fn register_json(engine: &mut Engine) {
    engine.register_type_with_name::<JsonApi>("JSON");

    engine.register_fn(
        "stringify",
        |ctx: NativeCallContext, _: JsonApi, value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let json = dynamic_to_json(&value)
                .map_err(|e| e.for_script(ctx.engine()).to_string())?;
            serde_json::to_string(&json).map_err(|e| e.to_string().into())
        },
    );

    engine.register_fn(
        "parse",
        |_: JsonApi, text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| format!("JSON.parse: {}", e))?;
            Ok(json_to_dynamic(&json))
        },
    );
}

fn denied_error(name: &str) -> Box<EvalAltResult> {
    format!("{} is not available in the sandbox", name).into()
}

fn register_blocking_overrides(engine: &mut Engine) {
    // Engine-registered functions are found before package functions
    for &name in BLOCKING_FUNCTIONS {
        engine.register_fn(name, move |_: INT| -> Result<(), Box<EvalAltResult>> {
            Err(denied_error(name))
        });
        engine.register_fn(name, move |_: FLOAT| -> Result<(), Box<EvalAltResult>> {
            Err(denied_error(name))
        });
    }
}

fn register_denials(engine: &mut Engine, denied: &[String]) {
    engine.register_type_with_name::<Unavailable>(UNAVAILABLE_TYPE);

    for name in denied {
        let n0 = name.clone();
        engine.register_fn(name.as_str(), move || -> Result<Dynamic, Box<EvalAltResult>> {
            Err(denied_error(&n0))
        });
        let n1 = name.clone();
        engine.register_fn(
            name.as_str(),
            move |_: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> { Err(denied_error(&n1)) },
        );
        let n2 = name.clone();
        engine.register_fn(
            name.as_str(),
            move |_: Dynamic, _: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                Err(denied_error(&n2))
            },
        );
        let n3 = name.clone();
        engine.register_fn(
            name.as_str(),
            move |_: Dynamic, _: Dynamic, _: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                Err(denied_error(&n3))
            },
        );
    }
}

/// Resolve `console`, `JSON` and every denied name before normal variable
/// lookup. The resolver also runs inside script functions, which otherwise
/// cannot see anything outside their own parameters.
#[allow(deprecated)]
fn bind_globals(engine: &mut Engine, logs: &LogBuffer, denied: &[String]) {
    let console = Console { logs: logs.clone() };
    let denied: Vec<String> = denied.to_vec();

    engine.on_var(move |name, _index, _context| match name {
        "console" => Ok(Some(Dynamic::from(console.clone()))),
        "JSON" => Ok(Some(Dynamic::from(JsonApi))),
        _ if denied.iter().any(|d| d == name) => Ok(Some(Dynamic::from(Unavailable))),
        _ => Ok(None),
    });
}
