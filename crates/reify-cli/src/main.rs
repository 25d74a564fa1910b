use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reify_config::ReifyConfig;
use reify_types::{
    concretize, format_declared, format_descriptor, parse_declared_type, ClassEnv, ClassRegistry,
    ConcreteType, Resolver, TypeDescriptor, TypeScope,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reify",
    version,
    about = "Resolve the runtime types of generic class fields"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a class manifest, then list its classes
    Check(CheckArgs),
    /// Resolve every field of a class under a binding of its type parameters
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to a `reify.toml` (defaults to discovery from the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    common: ConfigArgs,
}

#[derive(Args)]
struct ResolveArgs {
    /// Class name (fully qualified, `java.lang` simple name, or unique simple name)
    class: String,
    /// Actual type argument, one per type parameter, e.g. `--arg 'List<String>'`
    #[arg(long = "arg", value_name = "TYPE")]
    args: Vec<String>,
    #[command(flatten)]
    common: ConfigArgs,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Check(args) => {
            let (config, path) = load_config(&args.common)?;
            let registry = match config.build_registry() {
                Ok(registry) => registry,
                Err(err) => return report_failure(error_chain(&err), args.common.json),
            };

            let report = CheckReport {
                config: path,
                classes: config
                    .classes
                    .iter()
                    .filter_map(|class| registry.lookup_class(&class.name))
                    .filter_map(|id| registry.class(id))
                    .map(|class| ClassSummary {
                        name: class.name().to_owned(),
                        type_params: class.type_params().to_vec(),
                        fields: class
                            .fields()
                            .iter()
                            .map(|field| FieldSummary {
                                name: field.name().to_owned(),
                                declared: format_declared(&registry, field.declared_type()),
                            })
                            .collect(),
                    })
                    .collect(),
            };
            print_check(&report, args.common.json)?;
            Ok(0)
        }
        Command::Resolve(args) => {
            let (config, _) = load_config(&args.common)?;
            let registry = match config.build_registry() {
                Ok(registry) => registry,
                Err(err) => return report_failure(error_chain(&err), args.common.json),
            };

            let Some(class) = registry.lookup_class(&args.class) else {
                let message = format!("unknown class `{}`", args.class);
                return report_failure(message, args.common.json);
            };
            let type_args = args
                .args
                .iter()
                .map(|text| parse_type_argument(&registry, text))
                .collect::<Result<Vec<_>>>()?;

            let resolver = match Resolver::new(&registry, class, type_args) {
                Ok(resolver) => resolver,
                Err(err) => return report_failure(error_chain(&err), args.common.json),
            };
            tracing::debug!(target: "reify.cli", resolver = ?resolver, "resolving class fields");

            let report = resolve_report(&registry, &resolver);
            let exit = if report.fields.iter().any(|field| field.error.is_some()) {
                1
            } else {
                0
            };
            print_resolve(&report, args.common.json)?;
            Ok(exit)
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<(ReifyConfig, Option<PathBuf>)> {
    let (config, path) = match &args.config {
        Some(path) => {
            let config = ReifyConfig::load_from_path(path)?;
            (config, Some(path.clone()))
        }
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            reify_config::load_for_workspace(&cwd)?
        }
    };
    reify_config::init_tracing(&config.logging);
    Ok((config, path))
}

/// Parse a command-line type argument, which must be a concrete reference type.
fn parse_type_argument(registry: &ClassRegistry, text: &str) -> Result<TypeDescriptor> {
    let declared = parse_declared_type(registry, &TypeScope::empty(), text)
        .with_context(|| format!("invalid type argument `{text}`"))?;
    let ty = concretize(registry, &declared)
        .with_context(|| format!("invalid type argument `{text}`"))?;
    if ty.is_primitive() {
        bail!("invalid type argument `{text}`: primitive types cannot be type arguments");
    }
    Ok(ty)
}

fn resolve_report(registry: &ClassRegistry, resolver: &Resolver<'_>) -> ResolveReport {
    let fields = resolver
        .declared_fields()
        .iter()
        .map(|field| {
            let declared = format_declared(registry, field.declared_type());
            match resolver.resolve_type(field) {
                Ok(ty) => ResolvedField {
                    name: field.name().to_owned(),
                    declared,
                    resolved: Some(format_descriptor(registry, &ty)),
                    descriptor: Some(TypeNode::new(registry, &ty)),
                    error: None,
                },
                Err(err) => ResolvedField {
                    name: field.name().to_owned(),
                    declared,
                    resolved: None,
                    descriptor: None,
                    error: Some(err.to_string()),
                },
            }
        })
        .collect();

    let ty = resolver.get_type();
    ResolveReport {
        class: resolver.class_def().name().to_owned(),
        display: format_descriptor(registry, &ty),
        ty: TypeNode::new(registry, &ty),
        fields,
    }
}

#[derive(Serialize)]
struct CheckReport {
    config: Option<PathBuf>,
    classes: Vec<ClassSummary>,
}

#[derive(Serialize)]
struct ClassSummary {
    name: String,
    type_params: Vec<String>,
    fields: Vec<FieldSummary>,
}

#[derive(Serialize)]
struct FieldSummary {
    name: String,
    declared: String,
}

#[derive(Serialize)]
struct ResolveReport {
    class: String,
    #[serde(rename = "type")]
    ty: TypeNode,
    display: String,
    fields: Vec<ResolvedField>,
}

#[derive(Serialize)]
struct ResolvedField {
    name: String,
    declared: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptor: Option<TypeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Name-based mirror of a [`TypeDescriptor`] for JSON output.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TypeNode {
    Primitive {
        name: &'static str,
    },
    Class {
        name: String,
    },
    Parameterized {
        raw_type: String,
        type_arguments: Vec<TypeNode>,
    },
    Array {
        component_type: Box<TypeNode>,
    },
}

impl TypeNode {
    fn new(env: &dyn ClassEnv, ty: &TypeDescriptor) -> Self {
        let name = |id| env.class_name(id).unwrap_or("<unknown>").to_owned();
        match ty {
            TypeDescriptor::Concrete(ConcreteType::Primitive(prim)) => TypeNode::Primitive {
                name: prim.keyword(),
            },
            TypeDescriptor::Concrete(ConcreteType::Class(id)) => TypeNode::Class { name: name(*id) },
            TypeDescriptor::Parameterized(p) => TypeNode::Parameterized {
                raw_type: name(p.raw_type),
                type_arguments: p
                    .type_arguments
                    .iter()
                    .map(|arg| TypeNode::new(env, arg))
                    .collect(),
            },
            TypeDescriptor::Array(a) => TypeNode::Array {
                component_type: Box::new(TypeNode::new(env, &a.component_type)),
            },
        }
    }
}

#[derive(Serialize)]
struct FailureEnvelope {
    ok: bool,
    error: String,
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        // `#[error(transparent)]` wrappers repeat their source's message.
        let cause_message = cause.to_string();
        if !message.ends_with(&cause_message) {
            message = format!("{message}: {cause_message}");
        }
        source = cause.source();
    }
    message
}

/// Print a validation or resolution failure and return the matching exit code.
fn report_failure(message: String, json: bool) -> Result<i32> {
    if json {
        let out = serde_json::to_string_pretty(&FailureEnvelope {
            ok: false,
            error: message,
        })?;
        println!("{out}");
    } else {
        eprintln!("error: {message}");
    }
    Ok(1)
}

fn print_check(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match &report.config {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: (none)"),
    }
    for class in &report.classes {
        if class.type_params.is_empty() {
            println!("class {}", class.name);
        } else {
            println!("class {}<{}>", class.name, class.type_params.join(", "));
        }
        for field in &class.fields {
            println!("  {}: {}", field.name, field.declared);
        }
    }
    println!("ok: {} classes", report.classes.len());
    Ok(())
}

fn print_resolve(report: &ResolveReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", report.display);
    for field in &report.fields {
        match (&field.resolved, &field.error) {
            (Some(resolved), _) => println!("  {}: {} => {}", field.name, field.declared, resolved),
            (None, Some(error)) => {
                println!("  {}: {} => error: {}", field.name, field.declared, error)
            }
            (None, None) => {}
        }
    }
    Ok(())
}
