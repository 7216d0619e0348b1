//! Error handling for the ASE system
//!
//! Each layer has its own thiserror enum; `AseError` composes them so callers
//! can propagate with `?` and still match on the failing layer.

use thiserror::Error;

/// Main error type for the ASE system
#[derive(Error, Debug)]
pub enum AseError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Gateway error: {0}")]
    Gateway(#[source] GatewayError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Access denied: role {role} cannot {action}")]
    Forbidden { role: String, action: String },

    #[error("Authorization {id} not found")]
    NotFound { id: String },

    #[error("Could not load {what}: {source}")]
    Load {
        what: &'static str,
        #[source]
        source: GatewayError,
    },
}

impl AseError {
    /// Wrap a gateway failure that happened while reading data for a screen.
    pub fn load(what: &'static str, source: GatewayError) -> Self {
        match source {
            GatewayError::Unauthorized { .. } => source.into(),
            source => AseError::Load { what, source },
        }
    }

    /// Message shown to the user for this failure.
    ///
    /// Fetch failures collapse to a generic message; write failures keep the
    /// backend's text.
    pub fn user_message(&self) -> String {
        match self {
            AseError::Auth(e) => e.user_message(),
            AseError::Gateway(e) => e.backend_message(),
            AseError::Validation(e) => e.user_message(),
            AseError::Config(e) => e.to_string(),
            AseError::Import(e) => e.to_string(),
            AseError::Forbidden { .. } => "Acesso negado.".to_string(),
            AseError::NotFound { .. } => "Autorização não encontrada.".to_string(),
            AseError::Load { what, .. } => format!("Não foi possível carregar {}", what),
        }
    }
}

/// A rejected access token means the session is over
impl From<GatewayError> for AseError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unauthorized { .. } => AseError::Auth(AuthError::NotAuthenticated),
            other => AseError::Gateway(other),
        }
    }
}

/// Failures reported by the hosted identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email not confirmed")]
    EmailNotConfirmed,

    #[error("identity provider unreachable: {message}")]
    Network { message: String },

    #[error("no authenticated user")]
    NotAuthenticated,

    #[error("session {session_id} expired or unknown")]
    SessionExpired { session_id: String },

    #[error("identity provider error: {message}")]
    Provider { message: String },
}

impl AuthError {
    /// Classify a raw provider message into the taxonomy.
    pub fn from_provider_message(message: &str) -> Self {
        if message.contains("Invalid login credentials") {
            AuthError::InvalidCredentials
        } else if message.contains("Email not confirmed") {
            AuthError::EmailNotConfirmed
        } else {
            AuthError::Provider {
                message: message.to_string(),
            }
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "E-mail ou senha incorretos.".to_string(),
            AuthError::EmailNotConfirmed => {
                "Por favor, confirme seu e-mail antes de fazer login.".to_string()
            }
            AuthError::Network { .. } => {
                "Erro de conexão com o servidor. Verifique sua internet ou configurações de rede."
                    .to_string()
            }
            AuthError::NotAuthenticated | AuthError::SessionExpired { .. } => {
                "Sessão expirada. Faça login novamente.".to_string()
            }
            AuthError::Provider { message } => format!("Erro ao logar: {}", message),
        }
    }
}

/// Data gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("backend request failed: {message}")]
    Network { message: String },

    #[error("backend rejected {collection} request ({status}): {message}")]
    Backend {
        collection: String,
        status: u16,
        message: String,
    },

    #[error("unexpected {collection} record shape: {message}")]
    Shape { collection: String, message: String },

    #[error("backend refused the access token for {collection}: {message}")]
    Unauthorized { collection: String, message: String },

    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: String },

    #[error("duplicate {collection} key: {key}")]
    Conflict { collection: String, key: String },

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GatewayError {
    pub fn shape(collection: &str, message: impl Into<String>) -> Self {
        GatewayError::Shape {
            collection: collection.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(collection: &str, id: impl ToString) -> Self {
        GatewayError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// The message text the backend produced, without our framing.
    pub fn backend_message(&self) -> String {
        match self {
            GatewayError::Backend { message, .. } => message.clone(),
            GatewayError::Network { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        GatewayError::Network {
            message: error.to_string(),
        }
    }
}

/// Semantic validation errors for authorization submissions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("End time {end} must be after start time {start}")]
    InvalidTimeWindow { start: String, end: String },

    #[error("Team must have at least one member before submitting for approval")]
    EmptyTeam,

    #[error("Submitting requires an authenticated requester")]
    MissingRequester,

    #[error("Authorization in status {status} can no longer be edited")]
    NotEditable { status: String },

    #[error("Unknown {kind} value '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("{} validation problems: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Portuguese text for the form
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::MissingField { field } => {
                format!("Preencha o campo {}.", field_label(field))
            }
            ValidationError::InvalidTimeWindow { start, end } => format!(
                "O horário de término ({}) deve ser posterior ao de início ({}).",
                end, start
            ),
            ValidationError::EmptyTeam => {
                "Adicione ao menos um colaborador à equipe antes de enviar para aprovação."
                    .to_string()
            }
            ValidationError::MissingRequester => {
                "Usuário não identificado. Faça login novamente.".to_string()
            }
            ValidationError::NotEditable { status } => {
                format!("ASE com status {} não pode mais ser editada.", status)
            }
            ValidationError::UnknownValue { kind, value } => {
                format!("Valor desconhecido para {}: {}", kind, value)
            }
            ValidationError::Multiple(all) => format!(
                "Corrija os {} problemas do formulário: {}",
                all.len(),
                all.iter()
                    .map(ValidationError::user_message)
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        }
    }

    /// Collapse a list of problems into a single error, if any.
    pub fn from_list(mut errors: Vec<ValidationError>) -> Result<(), ValidationError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

fn field_label(field: &str) -> &str {
    match field {
        "sector_id" => "Setor",
        "manager_id" => "Gerente",
        "discipline_id" => "Disciplina",
        "subdiscipline_id" => "Subdisciplina",
        "justification" => "Justificativa",
        other => other,
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {name}")]
    Missing { name: &'static str },

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Spreadsheet import errors
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Could not read spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet has no header row")]
    MissingHeader,
}

/// Result type alias for ASE operations
pub type AseResult<T> = Result<T, AseError>;
