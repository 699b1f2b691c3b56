//! Tipo de erro unificado do pool com formatação estável.
use core::fmt;
use std::collections::BTreeMap;

use serde_json::json;

use crate::amm::error_catalog::{default_locale_message, AmmErrorCode};

const CONTEXT_VALUE_MAX: usize = 256;

fn sanitize_value(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect();
    if cleaned.chars().count() > CONTEXT_VALUE_MAX {
        let mut truncated: String = cleaned.chars().take(CONTEXT_VALUE_MAX - 1).collect();
        truncated.push('…');
        truncated
    } else {
        cleaned
    }
}

fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            rendered.push(ch);
            continue;
        }
        let key: String = chars.by_ref().take_while(|c| *c != '}').collect();
        match context.get(&key) {
            Some(value) => rendered.push_str(value),
            None => {
                rendered.push('{');
                rendered.push_str(&key);
                rendered.push('}');
            }
        }
    }
    rendered
}

/// Erro do pool com contexto estruturado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmError {
    pub code: AmmErrorCode,
    pub context: BTreeMap<String, String>,
}

impl AmmError {
    /// Cria um novo erro sem contexto adicional.
    pub fn new(code: AmmErrorCode) -> Self {
        Self {
            code,
            context: BTreeMap::new(),
        }
    }

    /// Adiciona um par chave/valor ao contexto.
    pub fn with_context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        let key_string = key.into();
        if !key_string.is_empty() {
            self.context
                .insert(key_string, sanitize_value(&value.to_string()));
        }
        self
    }

    pub fn code(&self) -> AmmErrorCode {
        self.code
    }

    pub fn is(&self, code: AmmErrorCode) -> bool {
        self.code == code
    }

    fn resolved_message(&self) -> String {
        render_template(default_locale_message(self.code), &self.context)
    }

    /// Mensagem curta para UI.
    pub fn to_user_string(&self) -> String {
        format!("[{}] {}", self.code.code(), self.resolved_message())
    }

    /// Renderiza um template arbitrário usando o contexto atual.
    pub fn render_with_template(&self, template: &str) -> String {
        render_template(template, &self.context)
    }

    /// Serialização estável em JSON para logs.
    pub fn to_log_json(&self) -> String {
        json!({
            "code": self.code.code(),
            "title": self.code.title(),
            "message": self.resolved_message(),
            "context": self.context,
        })
        .to_string()
    }
}

impl From<AmmErrorCode> for AmmError {
    fn from(code: AmmErrorCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for AmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_string())
    }
}

impl std::error::Error for AmmError {}

/// Resultado padrão para operações do pool.
pub type Result<T> = std::result::Result<T, AmmError>;

#[macro_export]
macro_rules! amm_err {
  ($code:expr) => {{
    $crate::amm::error::AmmError::new($code)
  }};
  ($code:expr, $($key:ident => $value:expr),+ $(,)?) => {{
    let mut err = $crate::amm::error::AmmError::new($code);
    $(
      err = err.with_context(stringify!($key), $value);
    )+
    err
  }};
  ($code:expr, { $($key:expr => $value:expr),+ $(,)? }) => {{
    let mut err = $crate::amm::error::AmmError::new($code);
    $(
      err = err.with_context($key, $value);
    )+
    err
  }};
}

#[macro_export]
macro_rules! amm_bail {
  ($($tt:tt)*) => {
    return Err($crate::amm_err!($($tt)*))
  };
}
