//! CLI presentation: text and json formatters per command family.

use crate::chat::ChatReply;
use crate::patient::{PatientRecord, PatientSummary};
use crate::provider::ProviderStatus;
use crate::store::HistoryRecord;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}

pub fn format_chat_reply_text(reply: &ChatReply) -> String {
    let mut out = String::new();
    for (kind, answer) in &reply.responses {
        out.push_str(&answer.answer);
        out.push_str("\n\n");
        out.push_str(&format!(
            "-- {} ({}) in {} ms, session {}\n",
            kind.label(),
            answer.model.as_deref().unwrap_or("no model"),
            answer.response_time,
            reply.session_id
        ));
        if let Some(error) = &answer.error {
            out.push_str(&format!("-- provider error: {}\n", error));
        }
    }
    if !reply.contexts_used.is_empty() {
        out.push_str(&format!("-- context: {}\n", reply.contexts_used.join(", ")));
    }
    out.trim_end().to_string()
}

pub fn format_chat_reply_json(reply: &ChatReply) -> String {
    to_json(reply)
}

pub fn format_contexts_text(user_id: &str, contexts: &[String]) -> String {
    if contexts.is_empty() {
        return format!("No contexts stored for {}.", user_id);
    }
    let mut out = format!("Contexts for {} (newest first):\n", user_id);
    for (i, context) in contexts.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, context));
    }
    out.trim_end().to_string()
}

pub fn format_questions_text(user_id: &str, questions: &[String]) -> String {
    if questions.is_empty() {
        return format!("No previous questions for {}.", user_id);
    }
    let mut out = format!("Previous questions for {} (newest first):\n", user_id);
    for (i, question) in questions.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, question));
    }
    out.trim_end().to_string()
}

pub fn format_history_text(user_id: &str, history: Option<&HistoryRecord>) -> String {
    let Some(record) = history.filter(|r| !r.turns.is_empty()) else {
        return format!("No history found for {}.", user_id);
    };
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["When", "Provider", "Question", "Answer", "ms"]);
    for turn in &record.turns {
        table.add_row(vec![
            format_time(turn.timestamp),
            turn.provider.to_string(),
            truncate(&turn.question, 40),
            truncate(&turn.answer, 60),
            turn.response_time_ms.to_string(),
        ]);
    }
    format!("History for {} ({} turns)\n\n{}", user_id, record.turns.len(), table)
}

pub fn format_history_json(history: Option<&HistoryRecord>) -> String {
    match history {
        Some(record) => to_json(record),
        None => "null".to_string(),
    }
}

pub fn format_providers_text(statuses: &[ProviderStatus]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Provider", "Model", "Endpoint", "API key"]);
    for status in statuses {
        table.add_row(vec![
            status.kind.to_string(),
            status.model.clone(),
            status.endpoint.clone(),
            if status.api_key_set { "set" } else { "missing" }.to_string(),
        ]);
    }
    let configured = statuses.iter().filter(|s| s.api_key_set).count();
    format!("{}\n\n{} of {} provider(s) configured", table, configured, statuses.len())
}

pub fn format_providers_json(statuses: &[ProviderStatus]) -> String {
    to_json(&serde_json::json!({ "providers": statuses }))
}

pub fn format_patient_text(summary: &PatientSummary, record: &PatientRecord) -> String {
    let mut out = format!(
        "Patient {}: {} (age {})\nUpcoming appointments: {}\nCurrent medications: {}\nAccount balance: {:.2}\n",
        summary.patient_id,
        summary.name,
        summary.age,
        summary.upcoming_appointments,
        summary.current_medications,
        summary.account_balance
    );
    if !record.appointments.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Date", "Doctor", "Department", "Status"]);
        for apt in &record.appointments {
            table.add_row(vec![
                format_time(apt.date),
                apt.doctor.clone(),
                apt.department.clone(),
                format!("{:?}", apt.status).to_lowercase(),
            ]);
        }
        out.push_str(&format!("\n{}", table));
    }
    out.trim_end().to_string()
}

pub fn format_patient_json(summary: &PatientSummary) -> String {
    to_json(summary)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}
