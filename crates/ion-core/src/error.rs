use std::fmt;

#[derive(Debug)]
pub enum IonError {
    Llm { provider: String, message: String },
    Http { status: u16, body: String },
    Store(String),
    Database(String),
    Config(String),
    Ingest(String),
    Audio(String),
}

impl fmt::Display for IonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm { provider, message } => write!(f, "llm error ({provider}): {message}"),
            Self::Http { status, body } => write!(f, "http error ({status}): {body}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Database(msg) => write!(f, "database error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Ingest(msg) => write!(f, "ingest error: {msg}"),
            Self::Audio(msg) => write!(f, "audio error: {msg}"),
        }
    }
}

impl std::error::Error for IonError {}

pub type Result<T> = std::result::Result<T, IonError>;

/// Map an error to the message shown to the end user.
///
/// Transport errors are classified by status code; everything else gets a
/// generic retry message so raw bodies never reach the user.
pub fn user_facing_message(err: &IonError) -> String {
    match err {
        IonError::Http { status: 401, .. } => {
            "Chave de API inválida. Verifique a configuração.".to_string()
        }
        IonError::Http { status: 429, .. } => {
            "Muitas requisições no momento. Aguarde alguns segundos e tente de novo.".to_string()
        }
        IonError::Http { status, .. } if *status >= 500 => {
            "O serviço está indisponível. Tente novamente mais tarde.".to_string()
        }
        IonError::Llm { message, .. }
            if message.contains("request failed") || message.contains("connection") =>
        {
            "Não consegui me conectar. Verifique sua internet.".to_string()
        }
        _ => "Algo deu errado. Tente novamente.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let unauthorized = IonError::Http { status: 401, body: String::new() };
        assert!(user_facing_message(&unauthorized).contains("Chave"));

        let rate_limited = IonError::Http { status: 429, body: String::new() };
        assert!(user_facing_message(&rate_limited).contains("Muitas requisições"));

        let server = IonError::Http { status: 503, body: "oops".to_string() };
        assert!(user_facing_message(&server).contains("indisponível"));
    }

    #[test]
    fn test_network_failure_message() {
        let err = IonError::Llm {
            provider: "openai".to_string(),
            message: "request failed: connection refused".to_string(),
        };
        assert!(user_facing_message(&err).contains("conectar"));
    }

    #[test]
    fn test_raw_body_never_leaks() {
        let err = IonError::Http { status: 500, body: "secret internal trace".to_string() };
        assert!(!user_facing_message(&err).contains("secret"));
    }
}
