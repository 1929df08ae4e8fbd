//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::chat::{ChatRequest, ChatService};
use crate::cli::parse::{Commands, ContextCommands, HistoryCommands, PatientCommands};
use crate::cli::presentation;
use crate::config::{CarechatConfig, ConfigLoader};
use crate::error::{ApiError, StorageError};
use crate::patient::{PatientRecord, PatientService};
use crate::provider::ProviderRegistry;
use crate::server::{self, AppState};
use crate::store::SledChatStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runtime context for CLI execution: loaded config, open store, and services.
pub struct RunContext {
    config: CarechatConfig,
    store: Arc<SledChatStore>,
    providers: Arc<ProviderRegistry>,
    chat: ChatService,
    patients: PatientService,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(config, &workspace_root)
    }

    /// Build from an already loaded config.
    pub fn from_config(config: CarechatConfig, workspace_root: &Path) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let store_path = config.storage.resolve_path(workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = Arc::new(SledChatStore::new(&store_path)?);
        info!(store = %store_path.display(), "store opened");

        let providers = Arc::new(ProviderRegistry::from_config(&config)?);
        let chat = ChatService::new(
            providers.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.limits.clone(),
        );
        let patients = PatientService::new(store.clone());

        Ok(Self {
            config,
            store,
            providers,
            chat,
            patients,
        })
    }

    pub fn config(&self) -> &CarechatConfig {
        &self.config
    }

    /// Shared state for the HTTP server.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.chat.clone(),
            self.patients.clone(),
            self.config.server.environment.clone(),
        )
    }

    /// Execute a command, returning the text to print.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Serve { bind, port } => {
                let bind = bind.clone().unwrap_or_else(|| self.config.server.bind.clone());
                let port = port.unwrap_or(self.config.server.port);
                server::serve(self.app_state(), &bind, port).await?;
                self.store.flush()?;
                Ok("Server stopped.".to_string())
            }
            Commands::Ask {
                message,
                provider,
                contexts,
                user,
                history,
                format,
            } => {
                let request = ChatRequest {
                    message: message.clone(),
                    selected_api: Some(provider.clone()),
                    contexts: contexts.clone(),
                    user_id: user.clone(),
                    session_id: None,
                    include_history: *history,
                };
                let reply = self.chat.send_message(request).await?;
                self.store.flush()?;
                Ok(match format.as_str() {
                    "json" => presentation::format_chat_reply_json(&reply),
                    _ => presentation::format_chat_reply_text(&reply),
                })
            }
            Commands::Context { command } => match command {
                ContextCommands::Show { user } => {
                    let contexts = self.chat.contexts(user)?;
                    Ok(presentation::format_contexts_text(user, &contexts))
                }
                ContextCommands::Clear { user } => {
                    let existed = self.chat.clear_contexts(user)?;
                    self.store.flush()?;
                    Ok(if existed {
                        format!("Cleared contexts for {}.", user)
                    } else {
                        format!("No contexts stored for {}.", user)
                    })
                }
            },
            Commands::History { command } => match command {
                HistoryCommands::Show { user, format } => {
                    let history = self.chat.history(user)?;
                    Ok(match format.as_str() {
                        "json" => presentation::format_history_json(history.as_ref()),
                        _ => presentation::format_history_text(user, history.as_ref()),
                    })
                }
                HistoryCommands::Questions { user } => {
                    let questions = self.chat.recent_questions(user)?;
                    Ok(presentation::format_questions_text(user, &questions))
                }
            },
            Commands::Patient { command } => match command {
                PatientCommands::Import { file } => {
                    let records = read_patient_file(file)?;
                    let count = self.patients.import(&records)?;
                    self.store.flush()?;
                    Ok(format!(
                        "Imported {} patient record(s) from {}.",
                        count,
                        file.display()
                    ))
                }
                PatientCommands::Show { id, format } => {
                    let summary = self.patients.summary(id, Utc::now())?;
                    Ok(match format.as_str() {
                        "json" => presentation::format_patient_json(&summary),
                        _ => {
                            let record = self.patients.record(id)?;
                            presentation::format_patient_text(&summary, &record)
                        }
                    })
                }
                PatientCommands::List => {
                    let ids = self.patients.list_ids()?;
                    if ids.is_empty() {
                        Ok("No patients stored.".to_string())
                    } else {
                        Ok(ids.join("\n"))
                    }
                }
            },
            Commands::Providers { format } => {
                let statuses = self.providers.list_all();
                Ok(match format.as_str() {
                    "json" => presentation::format_providers_json(&statuses),
                    _ => presentation::format_providers_text(&statuses),
                })
            }
        }
    }
}

/// Patient import file: a single record or an array of records.
pub fn read_patient_file(path: &Path) -> Result<Vec<PatientRecord>, ApiError> {
    let text = std::fs::read_to_string(path).map_err(StorageError::IoError)?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        ApiError::InvalidRequest(format!("{} is not valid JSON: {}", path.display(), e))
    })?;
    let parse_err =
        |e: serde_json::Error| ApiError::InvalidRequest(format!("Invalid patient record: {}", e));
    if value.is_array() {
        serde_json::from_value(value).map_err(parse_err)
    } else {
        Ok(vec![serde_json::from_value(value).map_err(parse_err)?])
    }
}
