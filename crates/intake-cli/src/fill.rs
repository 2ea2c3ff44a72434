use std::io::{BufRead, Write};

use intake_spec::{
    CompiledForm, FieldDescriptor, FieldType, FormSession, FormValues, Locale, RenderMode,
    SectionItem, ValidationResult, group_fields,
};
use serde_json::{Number, Value};

type FillResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How an interactive fill session ended.
#[derive(Debug)]
pub enum FillOutcome {
    /// The form passed validation; holds the submitted values object.
    Submitted(Value),
    /// The user typed `exit` or input ended.
    Aborted,
}

/// Context used to format a single prompt.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub name: String,
    pub label: String,
    pub section: Option<String>,
    pub kind: Option<FieldType>,
    pub options: Vec<String>,
}

impl PromptContext {
    fn new(
        field: &FieldDescriptor,
        section: Option<&str>,
        prefix: Option<&str>,
        locale: Locale,
    ) -> Self {
        let label = match prefix {
            Some(prefix) => format!("{} / {}", prefix, field.label_in(locale)),
            None => field.label_in(locale).to_string(),
        };
        Self {
            name: field.name.clone(),
            label,
            section: section.map(String::from),
            kind: field.kind.clone(),
            options: field.options_in(locale),
        }
    }

    fn hint(&self) -> Option<String> {
        match &self.kind {
            Some(kind) if kind.is_boolean() => Some("(yes/no)".to_string()),
            Some(FieldType::Number) => Some("(number)".to_string()),
            Some(FieldType::Date) => Some("(YYYY-MM-DD)".to_string()),
            Some(FieldType::Select) if !self.options.is_empty() => {
                Some(format!("({})", self.options.join("/")))
            }
            _ => None,
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
}

impl AnswerParseError {
    fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
        }
    }
}

/// Reads answers and prints prompts, errors and notices.
pub struct FillPresenter<R, W> {
    reader: R,
    writer: W,
    locale: Locale,
    current_section: Option<String>,
}

impl<R: BufRead, W: Write> FillPresenter<R, W> {
    pub fn new(reader: R, writer: W, locale: Locale) -> Self {
        Self {
            reader,
            writer,
            locale,
            current_section: None,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn show_prompt(
        &mut self,
        prompt: &PromptContext,
        position: (usize, usize),
        required: bool,
        current: Option<&Value>,
    ) -> FillResult<()> {
        if prompt.section.is_some() && prompt.section != self.current_section {
            writeln!(self.writer, "[{}]", prompt.section.as_deref().unwrap_or_default())?;
        }
        self.current_section = prompt.section.clone();

        let mut line = format!("{}/{} {}", position.0, position.1, prompt.label);
        if required {
            line.push_str(" *");
        }
        if let Some(hint) = prompt.hint() {
            line.push(' ');
            line.push_str(&hint);
        }
        if let Some(current) = current.filter(|value| !FormValues::value_is_empty(value)) {
            line.push_str(&format!(" [{}]", display_value(current)));
        }
        writeln!(self.writer, "{}", line)?;
        write!(self.writer, "> ")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Next trimmed input line, or `None` once input is exhausted.
    fn read_answer(&mut self) -> FillResult<Option<String>> {
        let mut input = String::new();
        if self.reader.read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    fn show_parse_error(&mut self, error: &AnswerParseError) -> FillResult<()> {
        writeln!(self.writer, "Invalid answer: {}", error.user_message)?;
        Ok(())
    }

    fn show_validation(&mut self, result: &ValidationResult) -> FillResult<()> {
        writeln!(self.writer, "Please fix the following:")?;
        for report in &result.fields {
            if let Some(message) = report.outcome.message() {
                writeln!(self.writer, "  {} - {}", report.name, message)?;
            }
        }
        self.current_section = None;
        Ok(())
    }

    fn show_notice(&mut self, notice: &str) -> FillResult<()> {
        writeln!(self.writer, "{}", notice)?;
        self.current_section = None;
        Ok(())
    }
}

/// Prompts every visible input, then re-prompts the fields that fail
/// validation until the form submits. `cancel` restores the starting values.
pub fn run_fill<R: BufRead, W: Write>(
    form: &CompiledForm,
    initial: FormValues,
    presenter: &mut FillPresenter<R, W>,
) -> FillResult<FillOutcome> {
    let locale = presenter.locale();
    let prompts = collect_prompts(form, locale);
    let everything = (0..prompts.len()).collect::<Vec<_>>();

    let mut session = FormSession::new(initial);
    session.begin_edit();
    let mut pending = everything.clone();

    loop {
        let mut restart = false;
        'fields: for (position, &index) in pending.iter().enumerate() {
            let prompt = &prompts[index];
            loop {
                let required = form
                    .ruleset
                    .effective_required(&prompt.name, session.values());
                presenter.show_prompt(
                    prompt,
                    (position + 1, pending.len()),
                    required,
                    session.values().get(&prompt.name),
                )?;
                let Some(raw) = presenter.read_answer()? else {
                    return Ok(FillOutcome::Aborted);
                };

                if raw.eq_ignore_ascii_case("exit") {
                    return Ok(FillOutcome::Aborted);
                }
                if raw.eq_ignore_ascii_case("cancel") {
                    session.cancel();
                    session.begin_edit();
                    presenter.show_notice("Changes discarded.")?;
                    restart = true;
                    break 'fields;
                }
                if raw.is_empty() {
                    break;
                }

                match parse_answer(prompt, &raw) {
                    Ok(value) => {
                        session.set(prompt.name.clone(), value);
                        break;
                    }
                    Err(err) => presenter.show_parse_error(&err)?,
                }
            }
        }

        if restart {
            pending = everything.clone();
            continue;
        }

        match session.submit(&form.ruleset, locale) {
            Ok(values) => return Ok(FillOutcome::Submitted(values)),
            Err(result) => {
                presenter.show_validation(&result)?;
                pending = everything
                    .iter()
                    .copied()
                    .filter(|index| result.error(&prompts[*index].name).is_some())
                    .collect();
                if pending.is_empty() {
                    return Err("form has invalid fields that cannot be edited here".into());
                }
            }
        }
    }
}

/// Value-holding fields in render order; checkmenu members are prefixed with their menu label.
pub fn collect_prompts(form: &CompiledForm, locale: Locale) -> Vec<PromptContext> {
    let mut prompts = Vec::new();
    for section in group_fields(&form.fields, locale, RenderMode::Patient) {
        let label = section.label.as_deref();
        for item in &section.items {
            match item {
                SectionItem::Input(field) if !field.name.is_empty() => {
                    prompts.push(PromptContext::new(field, label, None, locale));
                }
                SectionItem::Checkmenu { field, children } => {
                    let menu = field.label_in(locale);
                    prompts.extend(
                        children
                            .iter()
                            .map(|child| PromptContext::new(child, label, Some(menu), locale)),
                    );
                }
                _ => {}
            }
        }
    }
    prompts
}

/// Parses raw input for a prompt. `-` clears the field.
pub fn parse_answer(prompt: &PromptContext, raw: &str) -> Result<Value, AnswerParseError> {
    let is_boolean = prompt.kind.as_ref().is_some_and(FieldType::is_boolean);
    if raw == "-" {
        return Ok(if is_boolean {
            Value::Bool(false)
        } else {
            Value::String(String::new())
        });
    }

    if is_boolean {
        return parse_boolean(raw);
    }

    match prompt.kind {
        Some(FieldType::Number) => parse_number(raw),
        Some(FieldType::Select) if !prompt.options.is_empty() => parse_option(prompt, raw),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "si" | "sí" | "s" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new("Please enter yes or no.")),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(integer)));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| AnswerParseError::new("Please enter a number."))
}

fn parse_option(prompt: &PromptContext, raw: &str) -> Result<Value, AnswerParseError> {
    prompt
        .options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .map(|option| Value::String(option.clone()))
        .ok_or_else(|| {
            AnswerParseError::new(format!("Choose one of: {}.", prompt.options.join(", ")))
        })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
