//! med-eval - Medical transcription fidelity evaluator
//!
//! Compares a transcribed medical text against its reference text with
//! three LLM domain agents (medication, dosage, consistency) plus a
//! consensus step, and prints a Spanish-language clinical report.
//!
//! Inputs are JSON files; the free text is pulled out of the usual
//! fields (`text`, `transcript`, dialogue `turns`, ...) so exports from
//! different transcription tools work without preprocessing.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use medeval_core::Severity;
use medeval_runtime::{EvaluationPipelineBuilder, EvaluationRun, OpenAiProvider};

#[derive(Parser)]
#[command(name = "med-eval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evalúa la fidelidad de una transcripción médica", long_about = None)]
struct Cli {
    /// JSON file with the original (reference) text
    original_file: PathBuf,

    /// JSON file with the transcribed text
    transcribed_file: PathBuf,

    /// Where to write the results JSON (default: results.json next to the
    /// transcribed file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print only the final classification
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Pull the evaluable free text out of a loaded JSON document.
///
/// Accepts a bare string, the common single-field shapes, and dialogue
/// exports with a `turns` array. As a last resort concatenates every
/// string of significant length found in the document.
fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            for key in ["text", "content", "transcript", "transcription", "message"] {
                if let Some(Value::String(s)) = map.get(key) {
                    if !s.trim().is_empty() {
                        return Some(s.clone());
                    }
                }
            }
            if let Some(Value::Array(turns)) = map.get("turns") {
                let lines: Vec<String> = turns.iter().filter_map(render_turn).collect();
                if !lines.is_empty() {
                    return Some(lines.join("\n"));
                }
            }
            if let Some(nested) = map.get("data") {
                if let Some(text) = extract_text(nested) {
                    return Some(text);
                }
            }
            let strings = collect_strings(value);
            if strings.is_empty() {
                None
            } else {
                Some(strings.join("\n"))
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(extract_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        _ => None,
    }
}

/// Render one dialogue turn as `speaker: text`.
fn render_turn(turn: &Value) -> Option<String> {
    let map = turn.as_object()?;
    let text = map
        .get("text")
        .or_else(|| map.get("content"))
        .and_then(Value::as_str)?;
    match map.get("speaker").and_then(Value::as_str) {
        Some(speaker) => Some(format!("{speaker}: {text}")),
        None => Some(text.to_string()),
    }
}

/// Depth-first collection of string values long enough to be prose.
fn collect_strings(value: &Value) -> Vec<String> {
    const MIN_LEN: usize = 20;
    let mut out = Vec::new();
    match value {
        Value::String(s) if s.trim().len() >= MIN_LEN => out.push(s.clone()),
        Value::Object(map) => {
            for v in map.values() {
                out.extend(collect_strings(v));
            }
        }
        Value::Array(items) => {
            for v in items {
                out.extend(collect_strings(v));
            }
        }
        _ => {}
    }
    out
}

fn load_text(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("no se pudo leer {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} no es JSON válido", path.display()))?;
    match extract_text(&value) {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => bail!("no se encontró texto evaluable en {}", path.display()),
    }
}

fn interpretation(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "✅ La transcripción es fiel al texto original.",
        Severity::Minor => {
            "🟡 La transcripción contiene errores menores que no comprometen la seguridad del paciente."
        }
        Severity::Critical => {
            "🔴 La transcripción contiene errores graves. Requiere revisión profesional antes de su uso clínico."
        }
    }
}

fn print_report(run: &EvaluationRun, quiet: bool) {
    let severity = run
        .record
        .final_classification
        .unwrap_or(Severity::None);

    if quiet {
        println!("{severity}");
        return;
    }

    println!("{}", "=".repeat(60));
    println!("EVALUACIÓN DE TRANSCRIPCIÓN MÉDICA");
    println!("{}", "=".repeat(60));
    println!();
    println!("{}", run.record.consensus_explanation);
    println!();
    println!("{}", interpretation(severity));
    println!();
    println!(
        "Llamadas LLM: {} | Tokens: {} | {}",
        run.usage.llm_calls,
        run.usage.total_tokens,
        run.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}

fn save_results(run: &EvaluationRun, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&run.record)
        .context("no se pudo serializar el resultado")?;
    fs::write(path, json)
        .with_context(|| format!("no se pudo escribir {}", path.display()))?;
    info!(path = %path.display(), "resultados guardados");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let original = load_text(&cli.original_file)?;
    let transcribed = load_text(&cli.transcribed_file)?;
    debug!(
        original_chars = original.len(),
        transcribed_chars = transcribed.len(),
        "textos cargados"
    );

    let provider = OpenAiProvider::from_env()
        .context("configura la variable de entorno OPENAI_API_KEY")?;

    let pipeline = EvaluationPipelineBuilder::new()
        .provider(std::sync::Arc::new(provider))
        .build()?;

    let run = pipeline.run(&original, &transcribed).await?;

    let output = cli.output.unwrap_or_else(|| {
        cli.transcribed_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("results.json")
    });
    save_results(&run, &output)?;

    print_report(&run, cli.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_bare_string() {
        let v = json!("El paciente toma ibuprofeno.");
        assert_eq!(extract_text(&v).unwrap(), "El paciente toma ibuprofeno.");
    }

    #[test]
    fn extracts_common_text_fields() {
        for key in ["text", "content", "transcript", "transcription", "message"] {
            let v = json!({ key: "Texto de prueba." });
            assert_eq!(extract_text(&v).unwrap(), "Texto de prueba.");
        }
    }

    #[test]
    fn extracts_dialogue_turns_with_speakers() {
        let v = json!({
            "turns": [
                { "speaker": "Doctor", "text": "¿Toma alguna medicación?" },
                { "speaker": "Paciente", "text": "Ibuprofeno cada 8 horas." },
            ]
        });
        assert_eq!(
            extract_text(&v).unwrap(),
            "Doctor: ¿Toma alguna medicación?\nPaciente: Ibuprofeno cada 8 horas."
        );
    }

    #[test]
    fn turn_without_speaker_keeps_bare_text() {
        let v = json!({ "turns": [{ "text": "Sin hablante." }] });
        assert_eq!(extract_text(&v).unwrap(), "Sin hablante.");
    }

    #[test]
    fn descends_into_data_wrapper() {
        let v = json!({ "data": { "text": "Texto anidado." } });
        assert_eq!(extract_text(&v).unwrap(), "Texto anidado.");
    }

    #[test]
    fn falls_back_to_significant_strings() {
        let v = json!({
            "id": "abc",
            "nota": "El paciente presenta dolor abdominal desde hace dos días."
        });
        let text = extract_text(&v).unwrap();
        assert!(text.contains("dolor abdominal"));
        assert!(!text.contains("abc"));
    }

    #[test]
    fn empty_document_yields_none() {
        assert!(extract_text(&json!({ "id": 7 })).is_none());
        assert!(extract_text(&json!(null)).is_none());
    }
}
