use std::fmt;

#[derive(Debug, Clone)]
pub enum KurzError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
}

impl KurzError {
    /// Stable error code, used in logs and API payloads
    pub fn code(&self) -> &'static str {
        match self {
            KurzError::DatabaseConfig(_) => "E001",
            KurzError::DatabaseConnection(_) => "E002",
            KurzError::DatabaseOperation(_) => "E003",
            KurzError::Validation(_) => "E004",
            KurzError::NotFound(_) => "E005",
            KurzError::Serialization(_) => "E006",
        }
    }

    /// Human readable error category
    pub fn error_type(&self) -> &'static str {
        match self {
            KurzError::DatabaseConfig(_) => "Database Configuration Error",
            KurzError::DatabaseConnection(_) => "Database Connection Error",
            KurzError::DatabaseOperation(_) => "Database Operation Error",
            KurzError::Validation(_) => "Validation Error",
            KurzError::NotFound(_) => "Resource Not Found",
            KurzError::Serialization(_) => "Serialization Error",
        }
    }

    /// Error detail message
    pub fn message(&self) -> &str {
        match self {
            KurzError::DatabaseConfig(msg) => msg,
            KurzError::DatabaseConnection(msg) => msg,
            KurzError::DatabaseOperation(msg) => msg,
            KurzError::Validation(msg) => msg,
            KurzError::NotFound(msg) => msg,
            KurzError::Serialization(msg) => msg,
        }
    }
}

impl fmt::Display for KurzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for KurzError {}

// Convenience constructors
impl KurzError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        KurzError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        KurzError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        KurzError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        KurzError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        KurzError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        KurzError::Serialization(msg.into())
    }
}

impl From<sea_orm::DbErr> for KurzError {
    fn from(err: sea_orm::DbErr) -> Self {
        KurzError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for KurzError {
    fn from(err: std::io::Error) -> Self {
        KurzError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for KurzError {
    fn from(err: serde_json::Error) -> Self {
        KurzError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KurzError>;
