mod fill;

use clap::{Parser, Subcommand, ValueEnum};
use intake_spec::{
    CompiledForm, DescriptorSource, FileSource, FormValues, Locale, RenderMode, ValidationResult,
    build_render_payload, compile, descriptor_schema, load_descriptors, render_json_ui,
    render_text, values_schema,
};
use serde_json::Value;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fill::{FillOutcome, FillPresenter, run_fill};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOCALE_ENV: &str = "INTAKE_FORMS_LOCALE";
const FALLBACK_ENV: &str = "INTAKE_FORMS_FALLBACK";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Dynamic intake form CLI",
    long_about = "Compiles field descriptors into validation rulesets, renders forms and validates answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct FieldsArgs {
    /// JSON file with the field descriptors (array or `{ "fields": [...] }`).
    #[arg(long, value_name = "FIELDS")]
    fields: PathBuf,
    /// Static descriptor file used once if FIELDS cannot be loaded (defaults to INTAKE_FORMS_FALLBACK).
    #[arg(long, value_name = "FALLBACK")]
    fallback: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the render list and the compiled ruleset.
    Compile {
        #[command(flatten)]
        source: FieldsArgs,
    },
    /// Validate a values file against the compiled ruleset.
    Validate {
        #[command(flatten)]
        source: FieldsArgs,
        /// JSON object with the current form values.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Active locale (primary/alternate; defaults to INTAKE_FORMS_LOCALE).
        #[arg(long)]
        locale: Option<Locale>,
    },
    /// Render the grouped form with current values and inline errors.
    Render {
        #[command(flatten)]
        source: FieldsArgs,
        /// Optional JSON object with the current values; defaults are used otherwise.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long)]
        locale: Option<Locale>,
        #[arg(long, value_enum, default_value_t = RenderFormat::Text)]
        format: RenderFormat,
        /// Keep disabled fields visible.
        #[arg(long)]
        admin: bool,
    },
    /// Print the descriptor JSON Schema, or the values schema of a form.
    Schema {
        #[arg(long, value_name = "FIELDS")]
        fields: Option<PathBuf>,
        #[arg(long)]
        locale: Option<Locale>,
    },
    /// Fill a form interactively on stdin.
    Fill {
        #[command(flatten)]
        source: FieldsArgs,
        /// Record used to prefill the form.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long)]
        locale: Option<Locale>,
        /// Where to write the submitted values (stdout when omitted).
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Compile { source } => run_compile(source),
        Command::Validate {
            source,
            values,
            locale,
        } => run_validate(source, values, locale),
        Command::Render {
            source,
            values,
            locale,
            format,
            admin,
        } => run_render(source, values, locale, format, admin),
        Command::Schema { fields, locale } => run_schema(fields, locale),
        Command::Fill {
            source,
            values,
            locale,
            out,
        } => run_fill_command(source, values, locale, out),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "intake_spec=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_form(args: &FieldsArgs) -> CliResult<CompiledForm> {
    let primary = FileSource::new(&args.fields);
    let fallback = resolve_fallback(args.fallback.clone()).map(FileSource::new);
    let records = load_descriptors(
        &primary,
        fallback.as_ref().map(|source| source as &dyn DescriptorSource),
    )?;
    Ok(compile(&records))
}

fn resolve_fallback(fallback: Option<PathBuf>) -> Option<PathBuf> {
    fallback
        .or_else(|| env::var_os(FALLBACK_ENV).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty())
}

fn resolve_locale(locale: Option<Locale>) -> CliResult<Locale> {
    match locale {
        Some(locale) => Ok(locale),
        None => match env::var(LOCALE_ENV) {
            Ok(value) if !value.trim().is_empty() => Ok(value.parse::<Locale>()?),
            _ => Ok(Locale::default()),
        },
    }
}

fn read_values(path: &Path) -> CliResult<Value> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    if !value.is_object() {
        return Err(format!("values file {} must contain a JSON object", path.display()).into());
    }
    Ok(value)
}

fn run_compile(source: FieldsArgs) -> CliResult<()> {
    let form = load_form(&source)?;
    println!("{}", serde_json::to_string_pretty(&form)?);
    Ok(())
}

fn run_validate(
    source: FieldsArgs,
    values_path: PathBuf,
    locale: Option<Locale>,
) -> CliResult<()> {
    let form = load_form(&source)?;
    let locale = resolve_locale(locale)?;
    let values = FormValues::from_value(&read_values(&values_path)?);

    let result = form.evaluate(&values, locale);
    println!(
        "Validation result: {}",
        if result.is_valid() { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.is_valid() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    let errors = result.errors();
    if errors.is_empty() {
        return;
    }
    println!("Errors:");
    for report in result.fields.iter() {
        if let Some(message) = report.outcome.message() {
            println!("  {} - {}", report.name, message);
        }
    }
}

fn run_render(
    source: FieldsArgs,
    values_path: Option<PathBuf>,
    locale: Option<Locale>,
    format: RenderFormat,
    admin: bool,
) -> CliResult<()> {
    let form = load_form(&source)?;
    let locale = resolve_locale(locale)?;
    let values = match values_path {
        Some(path) => FormValues::from_record(&read_values(&path)?, &form.fields),
        None => form.default_values(),
    };
    let mode = if admin {
        RenderMode::Admin
    } else {
        RenderMode::Patient
    };

    let payload = build_render_payload(&form, &values, locale, mode);
    match format {
        RenderFormat::Text => println!("{}", render_text(&payload)),
        RenderFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&render_json_ui(&payload))?
        ),
    }
    Ok(())
}

fn run_schema(fields: Option<PathBuf>, locale: Option<Locale>) -> CliResult<()> {
    let schema = match fields {
        Some(path) => {
            let form = load_form(&FieldsArgs {
                fields: path,
                fallback: None,
            })?;
            values_schema(&form, resolve_locale(locale)?)
        }
        None => descriptor_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_fill_command(
    source: FieldsArgs,
    values_path: Option<PathBuf>,
    locale: Option<Locale>,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let form = load_form(&source)?;
    let locale = resolve_locale(locale)?;
    let initial = match values_path {
        Some(path) => FormValues::from_record(&read_values(&path)?, &form.fields),
        None => form.default_values(),
    };

    let outcome = {
        let mut presenter = FillPresenter::new(io::stdin().lock(), io::stdout().lock(), locale);
        run_fill(&form, initial, &mut presenter)?
    };
    let submitted = match outcome {
        FillOutcome::Submitted(values) => values,
        FillOutcome::Aborted => return Err("fill aborted by user".into()),
    };

    let pretty = serde_json::to_string_pretty(&submitted)?;
    match out {
        Some(path) => {
            fs::write(&path, pretty)?;
            println!("Saved answers to {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use fill::{PromptContext, collect_prompts, parse_answer};
    use intake_spec::{FieldType, compile_from_str};
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    const USER_INFO: &str = include_str!("../../intake-spec/tests/fixtures/user_info.json");

    fn user_form() -> CompiledForm {
        compile_from_str(USER_INFO).expect("fixture compiles")
    }

    fn fill_with(input: &[&str]) -> (FillOutcome, String) {
        let form = user_form();
        let stdin = format!("{}\n", input.join("\n"));
        let mut output = Vec::new();
        let outcome = {
            let mut presenter =
                FillPresenter::new(Cursor::new(stdin.into_bytes()), &mut output, Locale::Primary);
            run_fill(&form, form.default_values(), &mut presenter).expect("fill runs")
        };
        (outcome, String::from_utf8(output).expect("utf8 output"))
    }

    fn prompt(kind: FieldType, options: &[&str]) -> PromptContext {
        PromptContext {
            name: "field".into(),
            label: "Field".into(),
            section: None,
            kind: Some(kind),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }

    #[test]
    fn parse_answer_boolean_accepts_yes() {
        let question = prompt(FieldType::Checkbox, &[]);
        assert_eq!(parse_answer(&question, "yes").unwrap(), Value::Bool(true));
        assert_eq!(parse_answer(&question, "-").unwrap(), Value::Bool(false));
        assert!(parse_answer(&question, "maybe").is_err());
    }

    #[test]
    fn parse_answer_number_keeps_integers() {
        let question = prompt(FieldType::Number, &[]);
        assert_eq!(parse_answer(&question, "72").unwrap(), json!(72));
        assert_eq!(parse_answer(&question, "72.5").unwrap(), json!(72.5));
        assert!(parse_answer(&question, "heavy").is_err());
    }

    #[test]
    fn parse_answer_select_checks_options() {
        let question = prompt(FieldType::Select, &["Female", "Male", "Other"]);
        assert_eq!(parse_answer(&question, "other").unwrap(), json!("Other"));
        let err = parse_answer(&question, "unknown").unwrap_err();
        assert_eq!(err.user_message, "Choose one of: Female, Male, Other.");
    }

    #[test]
    fn prompts_follow_sections_and_skip_disabled_fields() {
        let names = collect_prompts(&user_form(), Locale::Primary)
            .into_iter()
            .map(|prompt| prompt.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "fullName",
                "email",
                "birthDate",
                "noPhone",
                "phone",
                "gender",
                "nickname"
            ]
        );
    }

    #[test]
    fn fill_submits_when_gate_exempts_phone() {
        let (outcome, output) = fill_with(&[
            "Ana",
            "ana@example.com",
            "1990-01-01",
            "yes",
            "",
            "",
            "",
        ]);
        let values = match outcome {
            FillOutcome::Submitted(values) => values,
            other => panic!("expected submission, got {:?}", other),
        };
        assert_eq!(values["fullName"], "Ana");
        assert_eq!(values["noPhone"], true);
        assert!(output.contains("[Datos personales]"));
        assert!(output.contains("1/7 Nombre completo *"));
    }

    #[test]
    fn fill_reprompts_only_invalid_fields() {
        let (outcome, output) = fill_with(&[
            "Ana",
            "not-an-email",
            "1990-01-01",
            "no",
            "123456789",
            "Otro",
            "",
            "ana@example.com",
        ]);
        assert!(matches!(outcome, FillOutcome::Submitted(_)));
        assert!(output.contains("email - Correo inválido"));
        assert!(output.contains("1/1 Correo * [not-an-email]"));
    }

    #[test]
    fn fill_cancel_restores_starting_values() {
        let (outcome, output) = fill_with(&[
            "Ana",
            "cancel",
            "Bea",
            "bea@example.com",
            "2000-02-02",
            "y",
            "",
            "",
            "",
        ]);
        let values = match outcome {
            FillOutcome::Submitted(values) => values,
            other => panic!("expected submission, got {:?}", other),
        };
        assert_eq!(values["fullName"], "Bea");
        assert!(output.contains("Changes discarded."));
    }

    #[test]
    fn fill_aborts_on_exit_or_end_of_input() {
        let (outcome, _) = fill_with(&["Ana", "exit"]);
        assert!(matches!(outcome, FillOutcome::Aborted));
        let (outcome, _) = fill_with(&["Ana"]);
        assert!(matches!(outcome, FillOutcome::Aborted));
    }

    #[test]
    fn resolve_fallback_ignores_empty_paths() {
        assert_eq!(resolve_fallback(Some(PathBuf::new())), None);
        assert_eq!(
            resolve_fallback(Some(PathBuf::from("static/fields.json"))),
            Some(PathBuf::from("static/fields.json"))
        );
    }

    #[test]
    fn validate_command_reports_errors_in_requested_locale()
    -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let fields = workspace.child("fields.json");
        fields.write_str(USER_INFO)?;
        let values = workspace.child("values.json");
        values.write_str(
            r#"{ "fullName": "Ana", "email": "", "noPhone": true, "birthDate": "1990-01-01" }"#,
        )?;

        let output = Command::cargo_bin("intake-forms")?
            .arg("validate")
            .arg("--fields")
            .arg(fields.path())
            .arg("--values")
            .arg(values.path())
            .arg("--locale")
            .arg("en")
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        let stdout = String::from_utf8(output)?;
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("email - Email is required"));
        assert!(!stdout.contains("phone -"));
        Ok(())
    }

    #[test]
    fn validate_command_reads_locale_from_environment() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let fields = workspace.child("fields.json");
        fields.write_str(USER_INFO)?;
        let values = workspace.child("values.json");
        values.write_str(
            r#"{
                "fullName": "Ana",
                "email": "ana@example.com",
                "phone": "123456789",
                "birthDate": "1990-01-01"
            }"#,
        )?;

        let output = Command::cargo_bin("intake-forms")?
            .env(LOCALE_ENV, "alternate")
            .arg("validate")
            .arg("--fields")
            .arg(fields.path())
            .arg("--values")
            .arg(values.path())
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        assert!(String::from_utf8(output)?.contains("phone - 10 to 12 digits"));
        Ok(())
    }

    #[test]
    fn compile_command_uses_fallback_when_primary_is_missing()
    -> Result<(), Box<dyn std::error::Error>> {
        let temp = TempDir::new()?;
        let fallback = temp.path().join("static-fields.json");
        fs::write(&fallback, USER_INFO)?;

        let output = Command::cargo_bin("intake-forms")?
            .env_remove(FALLBACK_ENV)
            .arg("compile")
            .arg("--fields")
            .arg(temp.path().join("missing.json"))
            .arg("--fallback")
            .arg(&fallback)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let compiled: Value = serde_json::from_slice(&output)?;
        assert_eq!(compiled["fields"][0]["name"], "fullName");
        assert_eq!(compiled["rules"].as_array().map(Vec::len), Some(6));
        Ok(())
    }

    #[test]
    fn compile_command_fails_without_any_source() -> Result<(), Box<dyn std::error::Error>> {
        let temp = TempDir::new()?;
        Command::cargo_bin("intake-forms")?
            .env_remove(FALLBACK_ENV)
            .arg("compile")
            .arg("--fields")
            .arg(temp.path().join("missing.json"))
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn render_command_admin_json_includes_disabled_fields()
    -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let fields = workspace.child("fields.json");
        fields.write_str(USER_INFO)?;

        let output = Command::cargo_bin("intake-forms")?
            .arg("render")
            .arg("--fields")
            .arg(fields.path())
            .arg("--format")
            .arg("json")
            .arg("--admin")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let ui: Value = serde_json::from_slice(&output)?;
        let names = ui["sections"]
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|section| section["fields"].as_array().cloned().unwrap_or_default())
            .filter_map(|field| field["name"].as_str().map(String::from))
            .collect::<Vec<_>>();
        assert!(names.iter().any(|name| name == "legacyCode"));
        Ok(())
    }

    #[test]
    fn schema_command_prints_descriptor_schema() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("intake-forms")?
            .arg("schema")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let schema: Value = serde_json::from_slice(&output)?;
        assert!(schema["properties"].get("checkboxName").is_some());
        Ok(())
    }

    #[test]
    fn fill_command_writes_submitted_values() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let fields = workspace.child("fields.json");
        fields.write_str(USER_INFO)?;
        let out = workspace.child("answers.json");
        let answers = [
            "Full Name",
            "someone@example.com",
            "1985-07-21",
            "n",
            "+34123456789",
            "female",
            "",
        ];

        Command::cargo_bin("intake-forms")?
            .arg("fill")
            .arg("--fields")
            .arg(fields.path())
            .arg("--locale")
            .arg("en")
            .arg("--out")
            .arg(out.path())
            .write_stdin(format!("{}\n", answers.join("\n")))
            .assert()
            .success();

        let saved: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
        assert_eq!(saved["gender"], "Female");
        assert_eq!(saved["noPhone"], false);
        Ok(())
    }
}
